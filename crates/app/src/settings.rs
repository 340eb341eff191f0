//! Handles settings for the application.
//!
//! Values come, in increasing priority, from built-in defaults, an optional
//! `settings.toml` in the working directory and `CASHFLOW__*` environment
//! variables (e.g. `CASHFLOW__APP__LEVEL=debug`).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Option<Database>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("CASHFLOW").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    pub fn database_url(&self) -> String {
        self.database
            .as_ref()
            .map(Database::url)
            .unwrap_or_else(|| Database::Sqlite(String::from("./cashflow.db")).url())
    }
}
