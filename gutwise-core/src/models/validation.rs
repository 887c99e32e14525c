//! Validation errors for user-entered records.

use thiserror::Error;

/// Lowest accepted mood or severity rating.
pub const MIN_RATING: u8 = 1;
/// Highest accepted mood or severity rating.
pub const MAX_RATING: u8 = 5;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Please add at least one food item")]
    NoFoods,

    #[error("Food '{0}' needs a positive quantity")]
    InvalidQuantity(String),

    #[error("Food name must not be empty")]
    EmptyFoodName,

    #[error("{field} must be between 1 and 5, got {value}")]
    RatingOutOfRange { field: &'static str, value: u8 },

    #[error("Duration must be at least 1 minute")]
    InvalidDuration,
}

pub(crate) fn check_rating(field: &'static str, value: u8) -> Result<(), ValidationError> {
    if (MIN_RATING..=MAX_RATING).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::RatingOutOfRange { field, value })
    }
}
