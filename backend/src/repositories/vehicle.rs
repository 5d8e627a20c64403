use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor};

use crate::models::vehicle::{Driver, Vehicle};
use crate::types::{DriverId, VehicleId};

pub async fn find_vehicle<'e, E>(executor: E, id: VehicleId) -> Result<Option<Vehicle>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Vehicle>(
        "SELECT mas_vehicle_uid, vehicle_license_plate, vehicle_dept_sap, mas_carpool_uid, \
         current_mileage, parking_place, updated_at \
         FROM mas_vehicles WHERE mas_vehicle_uid = $1 AND is_deleted = FALSE",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn find_driver<'e, E>(executor: E, id: DriverId) -> Result<Option<Driver>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Driver>(
        "SELECT mas_driver_uid, driver_emp_id, driver_name, driver_mobile_phone \
         FROM mas_drivers WHERE mas_driver_uid = $1 AND is_deleted = FALSE",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Moves the odometer forward and records where the vehicle was parked.
pub async fn record_return(
    conn: &mut PgConnection,
    id: VehicleId,
    mileage: i64,
    parking_place: &str,
    at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE mas_vehicles \
         SET current_mileage = GREATEST(current_mileage, $1), parking_place = $2, updated_at = $3 \
         WHERE mas_vehicle_uid = $4",
    )
    .bind(mileage)
    .bind(parking_place)
    .bind(at)
    .bind(id)
    .execute(conn)
    .await
    .map(|_| ())
}
