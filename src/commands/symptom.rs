use clap::{Args, Subcommand};
use serde_json::json;

use gutwise_core::{Symptom, SymptomType, SyncAction, SyncKind};

use super::{parse_timestamp, queue_change, OutputFormat};
use crate::config::Config;
use crate::context::AppContext;

#[derive(Args)]
pub struct SymptomCommand {
    #[command(subcommand)]
    pub command: SymptomSubcommand,
}

#[derive(Subcommand)]
pub enum SymptomSubcommand {
    /// Log a symptom episode
    Log {
        /// Symptom type (bloating, gas, stomach-pain, nausea, ...)
        #[arg(long = "type", short = 't', value_name = "TYPE")]
        symptom_type: String,

        /// Severity, 1-5
        #[arg(long, short)]
        severity: u8,

        /// Duration in minutes
        #[arg(long, short, default_value_t = 30)]
        duration: u32,

        /// Suspected trigger (can be repeated)
        #[arg(long = "trigger", value_name = "TRIGGER")]
        triggers: Vec<String>,

        /// When it started (YYYY-MM-DD HH:MM), defaults to now
        #[arg(long)]
        at: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List logged symptoms, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only show this symptom type
        #[arg(long = "type", short = 't', value_name = "TYPE")]
        symptom_type: Option<String>,

        /// Maximum number of symptoms to show
        #[arg(long, short, default_value_t = 20)]
        limit: usize,
    },

    /// Delete a logged symptom
    Delete {
        /// Symptom ID
        id: String,
    },
}

impl SymptomCommand {
    pub fn run(&self, ctx: &AppContext, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            SymptomSubcommand::Log {
                symptom_type,
                severity,
                duration,
                triggers,
                at,
                notes,
            } => {
                let parsed_type: SymptomType = symptom_type.parse()?;
                let mut symptom = Symptom::new(&config.user_id.value, parsed_type, *severity)
                    .with_duration(*duration)
                    .with_triggers(triggers.clone());

                if let Some(t) = at {
                    symptom = symptom.at(parse_timestamp(t)?);
                }
                if let Some(n) = notes {
                    symptom = symptom.with_notes(n);
                }

                symptom.validate()?;

                if !ctx.domain.save_symptom(&symptom) {
                    return Err("Failed to save symptom".into());
                }
                queue_change(ctx, SyncKind::Symptom, SyncAction::Create, &symptom);

                println!("Logged symptom:");
                println!();
                print!("{}", symptom);
                println!();
                println!("Symptom ID: {}", symptom.id);
                Ok(())
            }

            SymptomSubcommand::List {
                format,
                symptom_type,
                limit,
            } => {
                let filter = match symptom_type {
                    Some(t) => Some(t.parse::<SymptomType>()?),
                    None => None,
                };

                let mut symptoms: Vec<Symptom> = ctx
                    .domain
                    .list_symptoms()
                    .into_iter()
                    .filter(|s| filter.map_or(true, |t| s.symptom_type == t))
                    .collect();
                symptoms.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                symptoms.truncate(*limit);

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&symptoms)?);
                    }
                    OutputFormat::Text => {
                        if symptoms.is_empty() {
                            println!("No symptoms logged.");
                            return Ok(());
                        }
                        for symptom in &symptoms {
                            println!(
                                "{}  {:14} severity {}/5  {} min",
                                symptom
                                    .timestamp
                                    .with_timezone(&chrono::Local)
                                    .format("%Y-%m-%d %H:%M"),
                                symptom.symptom_type,
                                symptom.severity,
                                symptom.duration
                            );
                            if !symptom.triggers.is_empty() {
                                println!("  Triggers: {}", symptom.triggers.join(", "));
                            }
                            println!("  ID: {}", symptom.id);
                        }
                        println!("\nTotal: {} symptom(s)", symptoms.len());
                    }
                }
                Ok(())
            }

            SymptomSubcommand::Delete { id } => {
                if !ctx.domain.delete_symptom(id) {
                    return Err(format!("Symptom not found: {}", id).into());
                }
                queue_change(ctx, SyncKind::Symptom, SyncAction::Delete, &json!({ "id": id }));

                println!("Deleted symptom {}", id);
                Ok(())
            }
        }
    }

    /// Whether this subcommand changes local data.
    pub fn is_write(&self) -> bool {
        !matches!(self.command, SymptomSubcommand::List { .. })
    }
}
