use crate::config::toml_config::{AuthConfig, LocationConfig, ScanConfig, SpeechConfig, TomlConfig};
use crate::utils::error::{LookeyError, Result};
use crate::utils::validation::{self, Validate};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "lookey")]
#[command(about = "Convenience store shopping assistant client")]
pub struct CliConfig {
    #[arg(long, global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "LOOKEY_BASE_URL", global = true)]
    pub base_url: Option<String>,

    #[arg(long, env = "LOOKEY_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long, env = "LOOKEY_REFRESH_TOKEN", global = true, hide_env_values = true)]
    pub refresh_token: Option<String>,

    #[arg(long, short, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, global = true, help = "Pace speech and scan steps like the device does")]
    pub paced: bool,

    #[arg(long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Exchange a Google ID token for an API session
    Login { id_token: String },
    /// Manage the allergy list
    Allergy {
        #[command(subcommand)]
        action: AllergyCommand,
    },
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartCommand,
    },
    /// List the closest convenience stores
    Stores {
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        lng: Option<f64>,
    },
    /// Run the camera flows against image files
    Scan {
        #[command(subcommand)]
        action: ScanCommand,
    },
    /// Token utilities
    Token {
        #[command(subcommand)]
        action: TokenCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum AllergyCommand {
    List,
    Search { query: String },
    Add { allergy_list_id: i64 },
    Remove { allergy_list_id: i64 },
}

#[derive(Debug, Clone, Subcommand)]
pub enum CartCommand {
    List,
    Search { keyword: String },
    Add { product_id: i64 },
    Remove { cart_id: i64 },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ScanCommand {
    /// Shelf search on the first image
    Shelf {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[arg(long, help = "Guide to every matched cart product with the remaining images")]
        follow: bool,
    },
    /// Locate one product, one image per attempt
    Locate {
        product: String,
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Walking guidance, one analysis per image
    Guide {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum TokenCommand {
    /// Decode the stored access token
    Inspect,
}

impl CliConfig {
    /// Loads the config file, if any, and applies command line overrides.
    pub fn to_toml_config(&self) -> Result<TomlConfig> {
        let mut config = match (&self.config, &self.base_url) {
            (Some(path), _) => TomlConfig::from_file(path)?,
            (None, Some(base_url)) => TomlConfig::with_base_url(base_url.clone()),
            (None, None) => {
                return Err(LookeyError::MissingConfigError {
                    field: "api.base_url".to_string(),
                })
            }
        };

        if let Some(base_url) = &self.base_url {
            config.api.base_url = base_url.clone();
        }

        if self.token.is_some() || self.refresh_token.is_some() {
            let auth = config.auth.get_or_insert_with(AuthConfig::default);
            if let Some(token) = &self.token {
                auth.access_token = Some(token.clone());
            }
            if let Some(refresh) = &self.refresh_token {
                auth.refresh_token = Some(refresh.clone());
            }
        }

        if !self.paced {
            config.speech.get_or_insert_with(SpeechConfig::default).paced = Some(false);
            config.scan.get_or_insert_with(ScanConfig::default).immediate = Some(true);
        }

        if let Command::Stores {
            lat: Some(lat),
            lng: Some(lng),
        } = self.command
        {
            config.location = Some(LocationConfig { lat, lng });
        }

        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(base_url) = &self.base_url {
            validation::validate_url("base_url", base_url)?;
        }
        if let Some(path) = &self.config {
            validation::validate_path("config", &path.to_string_lossy())?;
        }

        match &self.command {
            Command::Login { id_token } => validation::validate_non_empty_string("id_token", id_token),
            Command::Stores { lat, lng } => match (lat, lng) {
                (Some(lat), Some(lng)) => validation::validate_coordinates(*lat, *lng),
                (None, None) => Ok(()),
                _ => Err(LookeyError::ValidationError {
                    message: "--lat and --lng must be given together".to_string(),
                }),
            },
            Command::Scan {
                action: ScanCommand::Locate { product, .. },
            } => validation::validate_non_empty_string("product", product),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliConfig {
        CliConfig::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = parse(&["lookey", "--base-url", "https://lookey.example.com", "cart", "add", "11"]);
        assert!(matches!(cli.command, Command::Cart { action: CartCommand::Add { product_id: 11 } }));
        assert_eq!(cli.output, OutputFormat::Text);

        let cli = parse(&["lookey", "scan", "locate", "포카칩", "a.jpg", "b.jpg", "--output", "json"]);
        match cli.command {
            Command::Scan {
                action: ScanCommand::Locate { product, images },
            } => {
                assert_eq!(product, "포카칩");
                assert_eq!(images.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_overrides_and_batch_timings() {
        let cli = parse(&[
            "lookey",
            "--base-url",
            "http://localhost:8080",
            "--token",
            "jwt",
            "stores",
            "--lat",
            "37.5",
            "--lng",
            "127.0",
        ]);
        assert!(cli.validate().is_ok());

        let config = cli.to_toml_config().unwrap();
        assert_eq!(config.base_url(), "http://localhost:8080");
        assert_eq!(config.access_token().as_deref(), Some("jwt"));
        assert_eq!(config.location().unwrap().lng, 127.0);
        assert_eq!(config.speech_pacing(), crate::core::SpeechPacing::immediate());
    }

    #[test]
    fn test_validation_failures() {
        let half = parse(&["lookey", "--base-url", "http://localhost", "stores", "--lat", "37.5"]);
        assert!(half.validate().is_err());

        let blank = parse(&["lookey", "--base-url", "http://localhost", "login", " "]);
        assert!(blank.validate().is_err());
    }
}
