//! Typed ID wrappers for compile-time type safety.
//!
//! Every booking entity is keyed by a UUID column; wrapping them keeps a
//! vehicle id from being passed where a request id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Macro to generate typed ID wrappers with common trait implementations.
macro_rules! typed_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

typed_id!(RequestUid, "Unique identifier for a vehicle booking request.");
typed_id!(ActionLogId, "Unique identifier for an action log entry.");
typed_id!(KeyHandoverId, "Unique identifier for a key handover appointment.");
typed_id!(VehicleId, "Unique identifier for a vehicle.");
typed_id!(DriverId, "Unique identifier for a driver.");
typed_id!(CarpoolId, "Unique identifier for a carpool.");
typed_id!(FuelRecordId, "Unique identifier for a refuel record.");
typed_id!(SurveyId, "Unique identifier for a satisfaction survey.");

/// Collects the raw UUIDs of a slice of typed ids for `= ANY($n)` binds.
pub fn raw_uuids<T>(ids: &[T]) -> Vec<Uuid>
where
    T: Copy + Into<Uuid>,
{
    ids.iter().map(|id| (*id).into()).collect()
}
