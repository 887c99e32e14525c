mod food;
mod meal;
mod pattern;
mod preferences;
mod product;
mod recipe;
mod symptom;
mod validation;

pub use food::MealFood;
pub use meal::{Meal, PortionSize};
pub use pattern::{Pattern, PatternType};
pub use preferences::UserPreferences;
pub use product::{Product, ProductType};
pub use recipe::{Difficulty, Recipe};
pub use symptom::{Symptom, SymptomType};
pub use validation::{ValidationError, MAX_RATING, MIN_RATING};
