use serde::{Deserialize, Serialize};

use std::{env, fs, path::Path, str::FromStr};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    /// Postgres connection string. Notes are kept in memory when unset.
    pub database_dsn: Option<String>,
    pub max_upload_bytes: usize,
    pub request_timeout_secs: u64,
    pub grammar: GrammarConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    /// LanguageTool server base URL. The built-in rules are used when unset.
    pub languagetool_url: Option<String>,
    pub language: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            database_dsn: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            request_timeout_secs: 30,
            grammar: GrammarConfig::default(),
        }
    }
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            languagetool_url: None,
            language: "en-US".to_string(),
            timeout_secs: 10,
        }
    }
}

fn parse_env<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Failed to parse {name}: {e}").into()),
        Err(_) => Ok(None),
    }
}

fn load_from_env() -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::default();

    if let Some(port) = parse_env("PORT")? {
        config.port = port;
    }
    if let Some(max_upload_bytes) = parse_env("MAX_UPLOAD_BYTES")? {
        config.max_upload_bytes = max_upload_bytes;
    }
    if let Some(timeout) = parse_env("REQUEST_TIMEOUT_SECS")? {
        config.request_timeout_secs = timeout;
    }
    if let Some(timeout) = parse_env("LANGUAGETOOL_TIMEOUT_SECS")? {
        config.grammar.timeout_secs = timeout;
    }
    if let Ok(language) = env::var("LANGUAGETOOL_LANGUAGE") {
        config.grammar.language = language;
    }
    config.grammar.languagetool_url = env::var("LANGUAGETOOL_URL").ok();
    config.database_dsn = env::var("PG_DSN").ok();

    Ok(config)
}

fn load_from_file(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    let mut config: Config = serde_yaml::from_str(&contents)?;

    // PG_DSN wins over the file so credentials can stay out of it
    if let Ok(dsn) = env::var("PG_DSN") {
        config.database_dsn = Some(dsn);
    }

    Ok(config)
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    // Retrieve env variable
    let config_path = env::var("NOTES_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    // Try env path
    if Path::new(&config_path).exists() {
        return load_from_file(&config_path);
    }

    // Fallback to config.yaml
    if Path::new("config.yaml").exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to 'config.yaml'",
            config_path
        );
        return load_from_file("config.yaml");
    }

    // Fallback to config.example.yaml
    if Path::new("config.example.yaml").exists() {
        tracing::warn!(
            "Config file '{}' and 'config.yaml' not found, falling back to 'config.example.yaml'\
             \n This file should not be used and should be replaced with actual data",
            config_path
        );
        return load_from_file("config.example.yaml");
    }

    // Fallback to environment variables
    tracing::info!("No config file found, loading configuration from environment variables");
    load_from_env().map_err(|e| {
        format!(
            "Config file not found and environment variables are invalid. \
             Tried: '{config_path}', 'config.yaml', 'config.example.yaml', and environment variables. \
             Error: {e}"
        )
        .into()
    })
}
