use crate::adapters::http::ApiSettings;
use crate::core::{ScanTimings, SpeechPacing};
use crate::domain::model::Coordinates;
use crate::utils::error::{LookeyError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub api: ApiConfig,
    pub auth: Option<AuthConfig>,
    pub speech: Option<SpeechConfig>,
    pub scan: Option<ScanConfig>,
    pub location: Option<LocationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub connect_timeout_seconds: Option<u64>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// `false` speaks everything back to back.
    pub paced: Option<bool>,
    pub base_ms: Option<u64>,
    pub per_char_ms: Option<u64>,
    pub min_ms: Option<u64>,
    pub max_ms: Option<u64>,
    pub gap_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    pub max_locate_attempts: Option<usize>,
    pub immediate: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationConfig {
    pub lat: f64,
    pub lng: f64,
}

impl TomlConfig {
    /// Minimal configuration for a base URL given on the command line.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: base_url.into(),
                connect_timeout_seconds: None,
                request_timeout_seconds: None,
            },
            auth: None,
            speech: None,
            scan: None,
            location: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LookeyError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LookeyError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| LookeyError::ConfigError {
            message: format!("env pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("api.base_url", &self.api.base_url)?;

        for (field, value) in [
            ("api.connect_timeout_seconds", self.api.connect_timeout_seconds),
            ("api.request_timeout_seconds", self.api.request_timeout_seconds),
        ] {
            if let Some(seconds) = value {
                validation::validate_range(field, seconds, 1, 300)?;
            }
        }

        if let Some(attempts) = self.scan.as_ref().and_then(|s| s.max_locate_attempts) {
            validation::validate_positive_number("scan.max_locate_attempts", attempts, 1)?;
        }

        // compare after defaults are applied, one side may be unset
        let pacing = self.speech_pacing();
        if pacing.min > pacing.max {
            return Err(LookeyError::InvalidConfigValueError {
                field: "speech.min_ms".to_string(),
                value: pacing.min.as_millis().to_string(),
                reason: format!("must not exceed speech.max_ms ({})", pacing.max.as_millis()),
            });
        }

        if let Some(location) = &self.location {
            validation::validate_coordinates(location.lat, location.lng)?;
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.api.base_url
    }

    pub fn api_settings(&self) -> ApiSettings {
        let mut settings = ApiSettings::new(self.api.base_url.clone());
        if let Some(seconds) = self.api.connect_timeout_seconds {
            settings.connect_timeout = Duration::from_secs(seconds);
        }
        if let Some(seconds) = self.api.request_timeout_seconds {
            settings.request_timeout = Duration::from_secs(seconds);
        }
        settings
    }

    pub fn access_token(&self) -> Option<String> {
        resolved(self.auth.as_ref().and_then(|a| a.access_token.clone()))
    }

    pub fn refresh_token(&self) -> Option<String> {
        resolved(self.auth.as_ref().and_then(|a| a.refresh_token.clone()))
    }

    pub fn speech_pacing(&self) -> SpeechPacing {
        let Some(speech) = &self.speech else {
            return SpeechPacing::default();
        };
        if speech.paced == Some(false) {
            return SpeechPacing::immediate();
        }

        let defaults = SpeechPacing::default();
        let ms = |value: Option<u64>, fallback: Duration| value.map(Duration::from_millis).unwrap_or(fallback);
        SpeechPacing {
            base: ms(speech.base_ms, defaults.base),
            per_char: ms(speech.per_char_ms, defaults.per_char),
            min: ms(speech.min_ms, defaults.min),
            max: ms(speech.max_ms, defaults.max),
            gap: ms(speech.gap_ms, defaults.gap),
            honor_pauses: true,
        }
    }

    pub fn scan_timings(&self) -> ScanTimings {
        let scan = self.scan.clone().unwrap_or_default();
        let mut timings = if scan.immediate.unwrap_or(false) {
            ScanTimings::immediate()
        } else {
            ScanTimings::default()
        };
        if let Some(attempts) = scan.max_locate_attempts {
            timings.max_locate_attempts = attempts;
        }
        timings
    }

    pub fn location(&self) -> Option<Coordinates> {
        self.location.map(|l| Coordinates { lat: l.lat, lng: l.lng })
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

/// Drops empty values and `${VAR}` placeholders whose variable was unset.
fn resolved(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && !v.contains("${"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[api]
base_url = "https://lookey.example.com"
connect_timeout_seconds = 10

[auth]
access_token = "jwt-abc"

[speech]
base_ms = 500
gap_ms = 100

[scan]
max_locate_attempts = 4

[location]
lat = 37.5013
lng = 127.0396
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url(), "https://lookey.example.com");
        assert_eq!(config.api_settings().connect_timeout, Duration::from_secs(10));
        assert_eq!(config.api_settings().request_timeout, Duration::from_secs(30));
        assert_eq!(config.access_token().as_deref(), Some("jwt-abc"));
        assert!(config.refresh_token().is_none());

        let pacing = config.speech_pacing();
        assert_eq!(pacing.base, Duration::from_millis(500));
        assert_eq!(pacing.per_char, Duration::from_millis(110));
        assert_eq!(pacing.gap, Duration::from_millis(100));

        assert_eq!(config.scan_timings().max_locate_attempts, 4);
        assert_eq!(config.location().unwrap().lat, 37.5013);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("LOOKEY_TEST_BASE_URL", "https://test.lookey.com");

        let toml_content = r#"
[api]
base_url = "${LOOKEY_TEST_BASE_URL}"

[auth]
refresh_token = "${LOOKEY_TEST_UNSET_REFRESH}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.api.base_url, "https://test.lookey.com");
        assert!(config.refresh_token().is_none());

        std::env::remove_var("LOOKEY_TEST_BASE_URL");
    }

    #[test]
    fn test_config_validation() {
        let bad_url = TomlConfig::with_base_url("lookey.example.com");
        assert!(bad_url.validate().is_err());

        let bad_location = TomlConfig::from_toml_str(
            r#"
[api]
base_url = "https://lookey.example.com"

[location]
lat = 137.0
lng = 127.0
"#,
        )
        .unwrap();
        assert!(bad_location.validate().is_err());

        let bad_attempts = TomlConfig::from_toml_str(
            r#"
[api]
base_url = "https://lookey.example.com"

[scan]
max_locate_attempts = 0
"#,
        )
        .unwrap();
        assert!(bad_attempts.validate().is_err());
    }

    #[test]
    fn test_single_sided_speech_bounds_are_checked() {
        for section in ["min_ms = 9000", "max_ms = 1000", "min_ms = 3000\nmax_ms = 2000"] {
            let config = TomlConfig::from_toml_str(&format!(
                "[api]\nbase_url = \"https://lookey.example.com\"\n\n[speech]\n{}\n",
                section
            ))
            .unwrap();
            assert!(
                matches!(
                    config.validate(),
                    Err(LookeyError::InvalidConfigValueError { ref field, .. }) if field == "speech.min_ms"
                ),
                "accepted: {}",
                section
            );
        }

        let config = TomlConfig::from_toml_str(
            "[api]\nbase_url = \"https://lookey.example.com\"\n\n[speech]\nmin_ms = 5000\n",
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.speech_pacing().min, Duration::from_millis(5000));
    }

    #[test]
    fn test_unpaced_speech() {
        let config = TomlConfig::from_toml_str(
            r#"
[api]
base_url = "http://localhost:8080"

[speech]
paced = false

[scan]
immediate = true
"#,
        )
        .unwrap();
        assert_eq!(config.speech_pacing(), SpeechPacing::immediate());
        assert_eq!(config.scan_timings(), ScanTimings::immediate());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[api]\nbase_url = \"https://lookey.example.com\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.base_url(), "https://lookey.example.com");
        assert!(config.location().is_none());
    }

    #[test]
    fn test_missing_api_section_is_error() {
        assert!(matches!(
            TomlConfig::from_toml_str("[scan]\nimmediate = true\n"),
            Err(LookeyError::ConfigValidationError { .. })
        ));
    }
}
