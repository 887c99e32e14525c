use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub notifications: bool,
    pub dark_mode: bool,
    pub language: String,
    pub timezone: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            notifications: true,
            dark_mode: false,
            language: "en".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_fills_defaults() {
        let prefs: UserPreferences = serde_json::from_str(r#"{"darkMode": true}"#).unwrap();
        assert!(prefs.dark_mode);
        assert!(prefs.notifications);
        assert_eq!(prefs.language, "en");
    }
}
