use clap::{Parser, command};
use serde::{Deserialize, Serialize};

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Environment variable overriding the configured database port.
 */
pub const DB_PORT_ENV: &str = "DBPort";

/**
 * Environment variable overriding the configured database password.
 */
pub const DB_PASSWORD_ENV: &str = "DBP";

/**
 * Command-line arguments for the application.
 */
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct ApplicationArguments {
    /**
     * Path to the configuration file.
     */
    #[arg(short, long)]
    pub config_file: String,
}

/**
 * Represents the configuration for the application.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /**
     * Logging configuration for the application.
     */
    pub logging: LoggingConfig,
    /**
     * Database configuration for the application.
     */
    pub database: Database,
    /**
     * Source corpus configuration.
     */
    pub corpus: CorpusConfig,
}

impl Config {
    /**
     * Checks the parts of the configuration serde cannot.
     *
     * # Returns
     * The configuration or an `ApplicationError` of type `Initialization`.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.corpus.roots.is_empty() {
            return Err(ApplicationError::new(ErrorType::Initialization, "No cuisine roots configured".to_string()));
        }
        for root in &self.corpus.roots {
            if root.first_batch > root.last_batch {
                return Err(ApplicationError::new(
                    ErrorType::Initialization,
                    format!("Cuisine root {} has firstBatch {} after lastBatch {}", root.name, root.first_batch, root.last_batch),
                ));
            }
        }
        Ok(self)
    }
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /**
     * Whether to log the target of the log message.
     */
    pub target: bool,
    /**
     * Whether to log thread IDs .
     */
    pub thread_ids: bool,
    /**
     * Whether to log thread names.
     */
    pub thread_names: bool,
    /**
     * Whether to log line numbers.
     */
    pub line_number: bool,
    /**
     * Whether to log the log level.
     */
    pub level: bool,
    /**
     * Whether to use ANSI colors in logs.
     */
    pub ansi: bool,
    /**
     * Whether to log the source file.
     */
    pub file: bool,
    /**
     * Path to an additional log file. Nothing is written to file when absent.
     */
    pub logfile: Option<String>,
    /**
     * Additional directives for logging configuration.
     */
    pub directives: Vec<String>,
}

impl LoggingConfig {
    #[allow(dead_code)]
    pub fn default() -> Self {
        LoggingConfig {
            target: true,
            thread_ids: false,
            thread_names: false,
            line_number: false,
            level: true,
            ansi: true,
            file: false,
            logfile: Some("/tmp/findfood_loader.log".to_string()),
            directives: vec![],
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /**
     * Type of the database (e.g., `PostgreSQL`).
     */
    pub db_type: DatabaseType,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatabaseType {
    /**
     * `PostgreSQL` database type.
     */
    #[serde(rename_all = "camelCase")]
    Postgresql { host: String, port: u16, username: String, password: Option<String>, database_name: String, max_connections: u32, acquire_timeout: u64 },
}

impl DatabaseType {
    /**
     * Applies the `DBPort` and `DBP` environment overrides.
     *
     * # Arguments
     * `lookup`: Environment lookup, `std::env::var` outside of tests.
     *
     * # Returns
     * The database type with overrides applied or an `ApplicationError` if the port override is not a port number.
     */
    pub fn with_env_overrides<F>(self, lookup: F) -> Result<Self, ApplicationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            DatabaseType::Postgresql { host, port, username, password, database_name, max_connections, acquire_timeout } => {
                let port = match lookup(DB_PORT_ENV) {
                    Some(value) => value
                        .trim()
                        .parse::<u16>()
                        .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Invalid {DB_PORT_ENV} value {value}: {err}")))?,
                    None => port,
                };
                let password = lookup(DB_PASSWORD_ENV).or(password);
                Ok(DatabaseType::Postgresql { host, port, username, password, database_name, max_connections, acquire_timeout })
            }
        }
    }
}

/**
 * Represents the source corpus of scraped diner records.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusConfig {
    /**
     * Whether emoji are removed from menu item details before insert.
     */
    #[serde(default)]
    pub strip_emoji: bool,
    /**
     * Cuisine roots, processed in order.
     */
    pub roots: Vec<CuisineRoot>,
}

/**
 * One cuisine type of the corpus. Batch `n` is the directory `<path_prefix><n>`.
 */
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CuisineRoot {
    /**
     * Name used in log lines.
     */
    pub name: String,
    /**
     * Directory prefix the batch number is appended to.
     */
    pub path_prefix: String,
    /**
     * First batch number, inclusive.
     */
    pub first_batch: u32,
    /**
     * Last batch number, inclusive.
     */
    pub last_batch: u32,
}

impl CuisineRoot {
    /**
     * Directory of one batch.
     */
    pub fn batch_path(&self, batch: u32) -> String {
        format!("{}{}", self.path_prefix, batch)
    }
}
