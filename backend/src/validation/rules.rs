//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Rejects strings that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Validates an employee id.
///
/// Requirements:
/// - 1-20 characters in length
/// - Only ASCII alphanumeric characters
pub fn validate_emp_id(emp_id: &str) -> Result<(), ValidationError> {
    if emp_id.is_empty() || emp_id.len() > 20 {
        return Err(ValidationError::new("emp_id_invalid_length"));
    }
    if !emp_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::new("emp_id_invalid_characters"));
    }
    Ok(())
}

/// Fuel gauge readings are percentages.
pub fn validate_fuel_level(level: i32) -> Result<(), ValidationError> {
    if !(0..=100).contains(&level) {
        return Err(ValidationError::new("fuel_level_out_of_range"));
    }
    Ok(())
}
