pub mod id;

pub use id::{
    raw_uuids, ActionLogId, CarpoolId, DriverId, FuelRecordId, KeyHandoverId, RequestUid,
    SurveyId, VehicleId,
};
