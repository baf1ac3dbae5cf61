pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, OutputFormat};

pub use adapters::http::{ApiClient, ApiRequest, ApiSettings, AuthApi, LoginOutcome};
pub use adapters::LocalFrameSource;
pub use app::LookeySession;
pub use config::TomlConfig;
pub use core::{ScanSession, SpeechPacing, SpeechQueue};
pub use utils::error::{LookeyError, Result};
