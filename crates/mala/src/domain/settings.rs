//! User-configurable settings, their storage keys, and the backup document.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Legacy running tap total key kept for backward compatibility.
pub const LEGACY_TAP_COUNT_KEY: &str = "tapCount";

/// Legacy running cycle total key kept for backward compatibility.
pub const LEGACY_JAP_COUNT_KEY: &str = "japCount";

/// Visual theme selection.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

/// Display language selection.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Hi,
    En,
    #[default]
    Both,
}

/// Mantra used for the counting practice.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MantraKind {
    #[default]
    Om,
    Gayatri,
    Mahamrityunjaya,
    Custom,
}

/// Haptic feedback strength.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VibrationPattern {
    Soft,
    #[default]
    Medium,
    Strong,
}

/// Current values for every user-configurable setting.
///
/// Each field is persisted independently under its own key in the local
/// durable store; a missing or malformed stored value falls back to the
/// field's default without affecting the other fields.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub daily_target: u32,
    pub monthly_target: u32,
    pub yearly_target: u32,
    pub sound_enabled: bool,
    pub haptics_enabled: bool,
    pub notifications_enabled: bool,
    pub reminder_time: String,
    pub sound_volume: u32,
    pub theme: Theme,
    pub language: Language,
    pub mantra_type: MantraKind,
    pub custom_mantra: String,
    pub vibration_pattern: VibrationPattern,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            daily_target: 5,
            monthly_target: 150,
            yearly_target: 1825,
            sound_enabled: true,
            haptics_enabled: true,
            notifications_enabled: false,
            reminder_time: "06:00".to_string(),
            sound_volume: 50,
            theme: Theme::Light,
            language: Language::Both,
            mantra_type: MantraKind::Om,
            custom_mantra: String::new(),
            vibration_pattern: VibrationPattern::Medium,
        }
    }
}

impl AppSettings {
    /// Returns the JSON encoding stored for one settings key.
    pub fn value_json(&self, key: SettingKey) -> Value {
        match key {
            SettingKey::DailyTarget => json!(self.daily_target),
            SettingKey::MonthlyTarget => json!(self.monthly_target),
            SettingKey::YearlyTarget => json!(self.yearly_target),
            SettingKey::SoundEnabled => json!(self.sound_enabled),
            SettingKey::HapticsEnabled => json!(self.haptics_enabled),
            SettingKey::NotificationsEnabled => json!(self.notifications_enabled),
            SettingKey::ReminderTime => json!(self.reminder_time),
            SettingKey::SoundVolume => json!(self.sound_volume),
            SettingKey::Theme => json!(self.theme),
            SettingKey::Language => json!(self.language),
            SettingKey::MantraType => json!(self.mantra_type),
            SettingKey::CustomMantra => json!(self.custom_mantra),
            SettingKey::VibrationPattern => json!(self.vibration_pattern),
        }
    }

    /// Applies one JSON-encoded value to its field after validation.
    ///
    /// # Errors
    /// Returns an error when the value is not valid JSON of the field's type;
    /// the field keeps its current value in that case.
    pub fn try_apply_value(&mut self, key: SettingKey, raw: &str) -> Result<(), String> {
        match key {
            SettingKey::DailyTarget => self.daily_target = parse_value(key, raw)?,
            SettingKey::MonthlyTarget => self.monthly_target = parse_value(key, raw)?,
            SettingKey::YearlyTarget => self.yearly_target = parse_value(key, raw)?,
            SettingKey::SoundEnabled => self.sound_enabled = parse_value(key, raw)?,
            SettingKey::HapticsEnabled => self.haptics_enabled = parse_value(key, raw)?,
            SettingKey::NotificationsEnabled => {
                self.notifications_enabled = parse_value(key, raw)?;
            }
            SettingKey::ReminderTime => self.reminder_time = parse_value(key, raw)?,
            SettingKey::SoundVolume => self.sound_volume = parse_value(key, raw)?,
            SettingKey::Theme => self.theme = parse_value(key, raw)?,
            SettingKey::Language => self.language = parse_value(key, raw)?,
            SettingKey::MantraType => self.mantra_type = parse_value(key, raw)?,
            SettingKey::CustomMantra => self.custom_mantra = parse_value(key, raw)?,
            SettingKey::VibrationPattern => self.vibration_pattern = parse_value(key, raw)?,
        }

        Ok(())
    }

    /// Applies one stored value to its field.
    ///
    /// A missing or malformed value restores the field's documented default;
    /// other fields are untouched, so one corrupt key never prevents the
    /// adjacent keys from loading.
    pub fn apply_stored_value(&mut self, key: SettingKey, stored: Option<&str>) {
        let applied = stored.is_some_and(|raw| self.try_apply_value(key, raw).is_ok());

        if !applied {
            let default_value = Self::default().value_json(key).to_string();
            let _ = self.try_apply_value(key, &default_value);
        }
    }
}

fn parse_value<T: serde::de::DeserializeOwned>(key: SettingKey, raw: &str) -> Result<T, String> {
    serde_json::from_str(raw).map_err(|err| format!("Invalid value for {}: {err}", key.as_str()))
}

/// Names of the persisted settings keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SettingKey {
    DailyTarget,
    MonthlyTarget,
    YearlyTarget,
    SoundEnabled,
    HapticsEnabled,
    NotificationsEnabled,
    ReminderTime,
    SoundVolume,
    Theme,
    Language,
    MantraType,
    CustomMantra,
    VibrationPattern,
}

impl SettingKey {
    /// Every settings key, in load order.
    pub const ALL: [Self; 13] = [
        Self::DailyTarget,
        Self::MonthlyTarget,
        Self::YearlyTarget,
        Self::SoundEnabled,
        Self::HapticsEnabled,
        Self::NotificationsEnabled,
        Self::ReminderTime,
        Self::SoundVolume,
        Self::Theme,
        Self::Language,
        Self::MantraType,
        Self::CustomMantra,
        Self::VibrationPattern,
    ];

    /// Returns the persisted key name for this setting.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DailyTarget => "dailyTarget",
            Self::MonthlyTarget => "monthlyTarget",
            Self::YearlyTarget => "yearlyTarget",
            Self::SoundEnabled => "soundEnabled",
            Self::HapticsEnabled => "hapticsEnabled",
            Self::NotificationsEnabled => "notificationsEnabled",
            Self::ReminderTime => "reminderTime",
            Self::SoundVolume => "soundVolume",
            Self::Theme => "theme",
            Self::Language => "language",
            Self::MantraType => "mantraType",
            Self::CustomMantra => "customMantra",
            Self::VibrationPattern => "vibrationPattern",
        }
    }

    /// Returns the legacy key names double-written for this setting.
    ///
    /// Earlier releases stored a few settings under different names; updates
    /// keep those aliases in sync so older builds keep reading fresh values.
    pub fn legacy_aliases(self) -> &'static [&'static str] {
        match self {
            Self::DailyTarget => &["japaDailyGoal"],
            Self::SoundEnabled => &["japaSoundEnabled"],
            Self::HapticsEnabled => &["japaVibrationEnabled"],
            _ => &[],
        }
    }
}

impl FromStr for SettingKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("Unknown setting: {s}"))
    }
}

/// Full backup document written by export and read back by import.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BackupDocument {
    pub settings: AppSettings,
    #[serde(default, rename = "tapCount", skip_serializing_if = "Option::is_none")]
    pub tap_count: Option<String>,
    #[serde(default, rename = "japCount", skip_serializing_if = "Option::is_none")]
    pub jap_count: Option<String>,
    #[serde(default, rename = "exportDate")]
    pub export_date: String,
}

/// Why an imported backup document was rejected.
///
/// Import never partially applies data: parsing fully succeeds before any
/// key is written.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("backup document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("backup document has no recognizable fields")]
    UnrecognizedFormat,
    #[error("failed to store imported data: {0}")]
    Storage(String),
}

/// Parses a backup document, rejecting unrecognizable JSON wholesale.
///
/// # Errors
/// Returns [`ImportError::Parse`] for invalid JSON and
/// [`ImportError::UnrecognizedFormat`] for JSON without a `settings` object.
pub fn parse_backup_document(raw: &str) -> Result<BackupDocument, ImportError> {
    let value: Value = serde_json::from_str(raw)?;

    let Some(object) = value.as_object() else {
        return Err(ImportError::UnrecognizedFormat);
    };
    if !object.contains_key("settings") {
        return Err(ImportError::UnrecognizedFormat);
    }

    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_documented_values() {
        // Arrange & Act
        let settings = AppSettings::default();

        // Assert
        assert_eq!(settings.daily_target, 5);
        assert_eq!(settings.monthly_target, 150);
        assert_eq!(settings.yearly_target, 1825);
        assert!(settings.sound_enabled);
        assert!(settings.haptics_enabled);
        assert!(!settings.notifications_enabled);
        assert_eq!(settings.reminder_time, "06:00");
        assert_eq!(settings.sound_volume, 50);
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.language, Language::Both);
        assert_eq!(settings.mantra_type, MantraKind::Om);
        assert_eq!(settings.custom_mantra, "");
        assert_eq!(settings.vibration_pattern, VibrationPattern::Medium);
    }

    #[test]
    fn apply_stored_value_reads_valid_json() {
        // Arrange
        let mut settings = AppSettings::default();

        // Act
        settings.apply_stored_value(SettingKey::DailyTarget, Some("16"));
        settings.apply_stored_value(SettingKey::Theme, Some("\"dark\""));

        // Assert
        assert_eq!(settings.daily_target, 16);
        assert_eq!(settings.theme, Theme::Dark);
    }

    #[test]
    fn apply_stored_value_falls_back_per_key_on_malformed_json() {
        // Arrange
        let mut settings = AppSettings::default();

        // Act
        settings.apply_stored_value(SettingKey::SoundVolume, Some("not-json"));
        settings.apply_stored_value(SettingKey::DailyTarget, Some("16"));

        // Assert
        assert_eq!(settings.sound_volume, 50);
        assert_eq!(settings.daily_target, 16);
    }

    #[test]
    fn try_apply_value_rejects_wrong_type_and_keeps_current_value() {
        // Arrange
        let mut settings = AppSettings {
            daily_target: 16,
            ..AppSettings::default()
        };

        // Act
        let result = settings.try_apply_value(SettingKey::DailyTarget, "\"sixteen\"");

        // Assert
        assert!(result.is_err());
        assert_eq!(settings.daily_target, 16);
    }

    #[test]
    fn apply_stored_value_falls_back_on_missing_value() {
        // Arrange
        let mut settings = AppSettings {
            sound_volume: 80,
            ..AppSettings::default()
        };

        // Act
        settings.apply_stored_value(SettingKey::SoundVolume, None);

        // Assert
        assert_eq!(settings.sound_volume, 50);
    }

    #[test]
    fn value_json_round_trips_through_apply_stored_value() {
        // Arrange
        let source = AppSettings {
            vibration_pattern: VibrationPattern::Strong,
            custom_mantra: "hare krishna".to_string(),
            ..AppSettings::default()
        };
        let mut restored = AppSettings::default();

        // Act
        for key in SettingKey::ALL {
            let stored = source.value_json(key).to_string();
            restored.apply_stored_value(key, Some(&stored));
        }

        // Assert
        assert_eq!(restored, source);
    }

    #[test]
    fn setting_key_parses_from_persisted_name() {
        // Arrange & Act
        let key: SettingKey = "vibrationPattern".parse().expect("failed to parse key");

        // Assert
        assert_eq!(key, SettingKey::VibrationPattern);
    }

    #[test]
    fn setting_key_rejects_unknown_name() {
        // Arrange & Act
        let result: Result<SettingKey, _> = "japsPerSecond".parse();

        // Assert
        assert!(result.is_err());
    }

    #[test]
    fn legacy_aliases_cover_goal_sound_and_haptics() {
        // Arrange & Act & Assert
        assert_eq!(SettingKey::DailyTarget.legacy_aliases(), ["japaDailyGoal"]);
        assert_eq!(SettingKey::SoundEnabled.legacy_aliases(), [
            "japaSoundEnabled"
        ]);
        assert_eq!(SettingKey::HapticsEnabled.legacy_aliases(), [
            "japaVibrationEnabled"
        ]);
        assert!(SettingKey::Theme.legacy_aliases().is_empty());
    }

    #[test]
    fn parse_backup_document_round_trips_export_shape() {
        // Arrange
        let document = BackupDocument {
            settings: AppSettings::default(),
            tap_count: Some("324".to_string()),
            jap_count: Some("3".to_string()),
            export_date: "2024-03-01T06:00:00Z".to_string(),
        };
        let raw = serde_json::to_string_pretty(&document).expect("failed to serialize backup");

        // Act
        let parsed = parse_backup_document(&raw).expect("failed to parse backup");

        // Assert
        assert_eq!(parsed, document);
    }

    #[test]
    fn parse_backup_document_rejects_json_without_settings() {
        // Arrange & Act
        let result = parse_backup_document(r#"{"tapCount": "324"}"#);

        // Assert
        assert!(matches!(result, Err(ImportError::UnrecognizedFormat)));
    }

    #[test]
    fn parse_backup_document_rejects_invalid_json() {
        // Arrange & Act
        let result = parse_backup_document("not a backup");

        // Assert
        assert!(matches!(result, Err(ImportError::Parse(_))));
    }
}
