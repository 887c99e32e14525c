use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One food eaten as part of a meal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealFood {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

impl MealFood {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
        }
    }
}

impl fmt::Display for MealFood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{} {}", self.quantity, self.name)
        } else {
            write!(f, "{} {} {}", self.quantity, self.unit, self.name)
        }
    }
}

/// Parses `name`, `name:quantity` or `name:quantity:unit`.
impl FromStr for MealFood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(format!("Invalid food '{}'. Use name[:quantity[:unit]]", s));
        }

        let quantity = match parts.next() {
            Some(q) => q
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid quantity '{}' for food '{}'", q, name))?,
            None => 1.0,
        };
        let unit = parts.next().unwrap_or_default().trim();

        Ok(MealFood::new(name, quantity, unit))
    }
}
