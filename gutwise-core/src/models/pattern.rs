use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Correlation,
    Timing,
    Positive,
    Cycle,
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternType::Correlation => write!(f, "correlation"),
            PatternType::Timing => write!(f, "timing"),
            PatternType::Positive => write!(f, "positive"),
            PatternType::Cycle => write!(f, "cycle"),
        }
    }
}

/// A detected link between a trigger and a response, computed server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub trigger: String,
    pub response: String,
    /// 0.0 to 1.0.
    pub confidence: f64,
    pub occurrences: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} -> {} ({:.0}% confidence, {} occurrence{})",
            self.pattern_type,
            self.trigger,
            self.response,
            self.confidence * 100.0,
            self.occurrences,
            if self.occurrences == 1 { "" } else { "s" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_pattern_json() {
        let json = serde_json::json!({
            "id": "p1",
            "userId": "u1",
            "type": "correlation",
            "trigger": "dairy",
            "response": "bloating",
            "confidence": 0.82,
            "occurrences": 7,
            "firstSeen": "2025-01-01T00:00:00Z",
            "lastSeen": "2025-02-01T00:00:00.000Z"
        });

        let pattern: Pattern = serde_json::from_value(json).unwrap();
        assert_eq!(pattern.pattern_type, PatternType::Correlation);
        assert_eq!(
            pattern.last_seen,
            Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            pattern.to_string(),
            "[correlation] dairy -> bloating (82% confidence, 7 occurrences)"
        );
    }
}
