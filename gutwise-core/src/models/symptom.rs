use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::validation::{check_rating, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymptomType {
    Bloating,
    Gas,
    StomachPain,
    Nausea,
    Diarrhea,
    Constipation,
    Heartburn,
    Fatigue,
    Headache,
    SkinIssues,
}

impl SymptomType {
    pub const ALL: [SymptomType; 10] = [
        SymptomType::Bloating,
        SymptomType::Gas,
        SymptomType::StomachPain,
        SymptomType::Nausea,
        SymptomType::Diarrhea,
        SymptomType::Constipation,
        SymptomType::Heartburn,
        SymptomType::Fatigue,
        SymptomType::Headache,
        SymptomType::SkinIssues,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymptomType::Bloating => "bloating",
            SymptomType::Gas => "gas",
            SymptomType::StomachPain => "stomach_pain",
            SymptomType::Nausea => "nausea",
            SymptomType::Diarrhea => "diarrhea",
            SymptomType::Constipation => "constipation",
            SymptomType::Heartburn => "heartburn",
            SymptomType::Fatigue => "fatigue",
            SymptomType::Headache => "headache",
            SymptomType::SkinIssues => "skin_issues",
        }
    }
}

impl fmt::Display for SymptomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymptomType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        SymptomType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = SymptomType::ALL.iter().map(|t| t.as_str()).collect();
                format!(
                    "Invalid symptom type '{}'. Valid options: {}",
                    s,
                    valid.join(", ")
                )
            })
    }
}

/// A logged symptom episode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Symptom {
    pub id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub symptom_type: SymptomType,
    /// 1 (mild) to 5 (severe).
    pub severity: u8,
    /// Minutes.
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<String>,
}

impl Symptom {
    pub fn new(user_id: impl Into<String>, symptom_type: SymptomType, severity: u8) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            timestamp: Utc::now(),
            symptom_type,
            severity,
            duration: 30,
            notes: None,
            triggers: Vec::new(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration = minutes;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_triggers(mut self, triggers: Vec<String>) -> Self {
        self.triggers = triggers;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.duration == 0 {
            return Err(ValidationError::InvalidDuration);
        }
        check_rating("severity", self.severity)
    }
}

impl fmt::Display for Symptom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (severity {}/5, {} min)",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.symptom_type,
            self.severity,
            self.duration
        )?;
        if !self.triggers.is_empty() {
            write!(f, " triggers: {}", self.triggers.join(", "))?;
        }
        Ok(())
    }
}
