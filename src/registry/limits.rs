//! Field bounds enforced on every registry mutation.
//!
//! Lengths are counted in characters, not bytes.

use crate::types::RegistryError;

pub const MAX_WASTE_TYPE_LEN: usize = 50;
pub const MAX_ORIGIN_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_NOTES_LEN: usize = 500;
pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_LEN: usize = 32;
pub const MAX_ROLE_LEN: usize = 50;
pub const MAX_PERMISSIONS: usize = 5;
pub const MAX_PERMISSION_LEN: usize = 32;
pub const MAX_TERMS_LEN: usize = 500;
pub const MAX_STATUS_LEN: usize = 32;
pub const MAX_PERCENTAGE: u32 = 100;

pub fn check_len(field: &str, value: &str, max: usize) -> Result<(), RegistryError> {
    if value.chars().count() > max {
        return Err(RegistryError::InvalidParam(format!(
            "{} exceeds {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Bound both the number of entries and the length of each entry
pub fn check_list(
    field: &str,
    values: &[String],
    max_entries: usize,
    max_len: usize,
) -> Result<(), RegistryError> {
    if values.len() > max_entries {
        return Err(RegistryError::InvalidParam(format!(
            "{} holds more than {} entries",
            field, max_entries
        )));
    }
    for value in values {
        check_len(field, value, max_len)?;
    }
    Ok(())
}

pub fn check_percentage(percentage: u32) -> Result<(), RegistryError> {
    if percentage > MAX_PERCENTAGE {
        return Err(RegistryError::InvalidParam(format!(
            "percentage {} exceeds {}",
            percentage, MAX_PERCENTAGE
        )));
    }
    Ok(())
}
