use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User settings record. Unknown keys written by other app versions are
/// kept in `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default = "default_notifications_enabled")]
    pub notifications_enabled: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_notifications_enabled() -> bool {
    true
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            language: None,
            notifications_enabled: true,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let settings: AppSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, AppSettings::default());
        assert!(settings.notifications_enabled);
    }

    #[test]
    fn unknown_keys_are_preserved() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"language":"tr","theme":"dark"}"#).unwrap();
        assert_eq!(settings.language.as_deref(), Some("tr"));
        assert_eq!(settings.extra["theme"], "dark");

        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["theme"], "dark");
        assert_eq!(json["notificationsEnabled"], true);
    }
}
