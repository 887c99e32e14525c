use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::food::MealFood;
use super::validation::{check_rating, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PortionSize {
    Small,
    #[default]
    Medium,
    Large,
    ExtraLarge,
}

impl fmt::Display for PortionSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortionSize::Small => write!(f, "small"),
            PortionSize::Medium => write!(f, "medium"),
            PortionSize::Large => write!(f, "large"),
            PortionSize::ExtraLarge => write!(f, "extra-large"),
        }
    }
}

impl FromStr for PortionSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "small" => Ok(PortionSize::Small),
            "medium" => Ok(PortionSize::Medium),
            "large" => Ok(PortionSize::Large),
            "extra-large" | "xl" => Ok(PortionSize::ExtraLarge),
            _ => Err(format!(
                "Invalid portion '{}'. Valid options: small, medium, large, extra-large",
                s
            )),
        }
    }
}

/// A logged meal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub foods: Vec<MealFood>,
    pub portion: PortionSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// 1 (awful) to 5 (great).
    pub mood: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Meal {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            timestamp: Utc::now(),
            foods: Vec::new(),
            portion: PortionSize::default(),
            notes: None,
            mood: 3,
            location: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_foods(mut self, foods: Vec<MealFood>) -> Self {
        self.foods = foods;
        self
    }

    pub fn with_portion(mut self, portion: PortionSize) -> Self {
        self.portion = portion;
        self
    }

    pub fn with_mood(mut self, mood: u8) -> Self {
        self.mood = mood;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.foods.is_empty() {
            return Err(ValidationError::NoFoods);
        }
        for food in &self.foods {
            if food.name.trim().is_empty() {
                return Err(ValidationError::EmptyFoodName);
            }
            if !(food.quantity > 0.0) {
                return Err(ValidationError::InvalidQuantity(food.name.clone()));
            }
        }
        check_rating("mood", self.mood)
    }
}

impl fmt::Display for Meal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Meal: {} ({})",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.portion
        )?;
        writeln!(f, "{}", "=".repeat(30))?;

        for food in &self.foods {
            writeln!(f, "  - {}", food)?;
        }
        writeln!(f, "Mood: {}/5", self.mood)?;

        if let Some(location) = &self.location {
            writeln!(f, "Location: {}", location)?;
        }
        if let Some(notes) = &self.notes {
            writeln!(f, "\nNotes: {}", notes)?;
        }

        Ok(())
    }
}
