//! Refuel records and satisfaction surveys attached to a trip.

use sqlx::PgExecutor;

use crate::models::fuel::FuelRecord;
use crate::models::satisfaction_survey::SatisfactionSurvey;

pub async fn insert_fuel_record<'e, E>(executor: E, record: &FuelRecord) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO vms_trn_add_fuel \
         (trn_add_fuel_uid, trn_request_uid, mileage, liters, amount, refuel_datetime, \
         created_at, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(record.trn_add_fuel_uid)
    .bind(record.trn_request_uid)
    .bind(record.mileage)
    .bind(record.liters)
    .bind(record.amount)
    .bind(record.refuel_datetime)
    .bind(record.created_at)
    .bind(&record.created_by)
    .execute(executor)
    .await
    .map(|_| ())
}

/// Inserts a survey; returns false when the request already has one.
pub async fn insert_survey<'e, E>(
    executor: E,
    survey: &SatisfactionSurvey,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "INSERT INTO vms_trn_satisfaction_survey \
         (trn_satisfaction_survey_uid, trn_request_uid, vehicle_score, driver_score, \
         service_score, comment, created_at, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (trn_request_uid) DO NOTHING",
    )
    .bind(survey.trn_satisfaction_survey_uid)
    .bind(survey.trn_request_uid)
    .bind(survey.vehicle_score)
    .bind(survey.driver_score)
    .bind(survey.service_score)
    .bind(&survey.comment)
    .bind(survey.created_at)
    .bind(&survey.created_by)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}
