use clap::{Args, Subcommand};
use serde_json::{json, Map, Value};

use gutwise_core::{Meal, MealFood, PortionSize, SyncAction, SyncKind};

use super::{parse_timestamp, queue_change, OutputFormat};
use crate::config::Config;
use crate::context::AppContext;

#[derive(Args)]
pub struct MealCommand {
    #[command(subcommand)]
    pub command: MealSubcommand,
}

#[derive(Subcommand)]
pub enum MealSubcommand {
    /// Log a meal
    Log {
        /// Food eaten as name[:quantity[:unit]] (can be repeated)
        #[arg(long = "food", value_name = "FOOD", required = true)]
        foods: Vec<String>,

        /// Portion size (small, medium, large, extra-large)
        #[arg(long, short)]
        portion: Option<String>,

        /// Mood after eating, 1-5
        #[arg(long, short, default_value_t = 3)]
        mood: u8,

        /// When the meal was eaten (YYYY-MM-DD HH:MM), defaults to now
        #[arg(long)]
        at: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long)]
        location: Option<String>,
    },

    /// List logged meals, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Maximum number of meals to show
        #[arg(long, short, default_value_t = 20)]
        limit: usize,
    },

    /// Change fields of a logged meal
    Update {
        /// Meal ID
        id: String,

        #[arg(long, short)]
        portion: Option<String>,

        #[arg(long, short)]
        mood: Option<u8>,

        #[arg(long)]
        at: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long)]
        location: Option<String>,
    },

    /// Delete a logged meal
    Delete {
        /// Meal ID
        id: String,
    },
}

impl MealCommand {
    pub fn run(&self, ctx: &AppContext, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            MealSubcommand::Log {
                foods,
                portion,
                mood,
                at,
                notes,
                location,
            } => {
                let mut meal = Meal::new(&config.user_id.value).with_mood(*mood);

                let mut parsed_foods = Vec::new();
                for food in foods {
                    parsed_foods.push(food.parse::<MealFood>()?);
                }
                meal = meal.with_foods(parsed_foods);

                if let Some(p) = portion {
                    meal = meal.with_portion(p.parse::<PortionSize>()?);
                }
                if let Some(t) = at {
                    meal = meal.at(parse_timestamp(t)?);
                }
                if let Some(n) = notes {
                    meal = meal.with_notes(n);
                }
                if let Some(l) = location {
                    meal = meal.with_location(l);
                }

                meal.validate()?;

                if !ctx.domain.save_meal(&meal) {
                    return Err("Failed to save meal".into());
                }
                queue_change(ctx, SyncKind::Meal, SyncAction::Create, &meal);

                println!("Logged meal:");
                println!();
                print!("{}", meal);
                println!();
                println!("Meal ID: {}", meal.id);
                Ok(())
            }

            MealSubcommand::List { format, limit } => {
                let mut meals = ctx.domain.list_meals();
                meals.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                meals.truncate(*limit);

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&meals)?);
                    }
                    OutputFormat::Text => {
                        if meals.is_empty() {
                            println!("No meals logged yet.");
                            return Ok(());
                        }
                        for meal in &meals {
                            print_meal_row(meal);
                        }
                        println!("\nTotal: {} meal(s)", meals.len());
                    }
                }
                Ok(())
            }

            MealSubcommand::Update {
                id,
                portion,
                mood,
                at,
                notes,
                location,
            } => {
                let existing = ctx
                    .domain
                    .get_meal(id)
                    .ok_or_else(|| format!("Meal not found: {}", id))?;

                let mut updated = existing.clone();
                let mut patch = Map::new();

                if let Some(p) = portion {
                    updated.portion = p.parse()?;
                    patch.insert("portion".to_string(), json!(updated.portion));
                }
                if let Some(m) = mood {
                    updated.mood = *m;
                    patch.insert("mood".to_string(), json!(m));
                }
                if let Some(t) = at {
                    updated.timestamp = parse_timestamp(t)?;
                    patch.insert("timestamp".to_string(), json!(updated.timestamp));
                }
                if let Some(n) = notes {
                    patch.insert("notes".to_string(), json!(n));
                }
                if let Some(l) = location {
                    patch.insert("location".to_string(), json!(l));
                }

                if patch.is_empty() {
                    return Err(
                        "Nothing to update. Pass --portion, --mood, --at, --notes or --location"
                            .into(),
                    );
                }
                updated.validate()?;

                if !ctx.domain.update_meal(id, &Value::Object(patch.clone())) {
                    return Err(format!("Failed to update meal {}", id).into());
                }

                patch.insert("id".to_string(), json!(id));
                queue_change(ctx, SyncKind::Meal, SyncAction::Update, &patch);

                println!("Updated meal {}", id);
                Ok(())
            }

            MealSubcommand::Delete { id } => {
                if !ctx.domain.delete_meal(id) {
                    return Err(format!("Meal not found: {}", id).into());
                }
                queue_change(ctx, SyncKind::Meal, SyncAction::Delete, &json!({ "id": id }));

                println!("Deleted meal {}", id);
                Ok(())
            }
        }
    }

    /// Whether this subcommand changes local data.
    pub fn is_write(&self) -> bool {
        !matches!(self.command, MealSubcommand::List { .. })
    }
}

fn print_meal_row(meal: &Meal) {
    let foods: Vec<String> = meal.foods.iter().map(|f| f.name.clone()).collect();
    println!(
        "{}  {:11} mood {}/5  {}",
        meal.timestamp.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
        meal.portion,
        meal.mood,
        foods.join(", ")
    );
    println!("  ID: {}", meal.id);
}
