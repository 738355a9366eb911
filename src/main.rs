mod dao;
mod model;
mod service;

use std::time::Duration;

use crate::dao::diners::DinersDao;
use crate::model::apperror::{ApplicationError, ErrorType};
use crate::model::config::{ApplicationArguments, Config, DatabaseType, LoggingConfig};
use crate::service::ingestion::IngestionService;
use crate::service::repository::PgDinerRepository;

use clap::Parser;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/**
 * Loads every configured batch of scraped diner records into the database.
 */
#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = ApplicationArguments::parse();

    let config = get_config(&args.config_file)?;

    let _log_guard = init_tracing(&config.logging).map_err(|err| std::io::Error::other(format!("Failed to initialize logging: {err}")))?;

    let db_type = config.database.db_type.clone().with_env_overrides(|key| std::env::var(key).ok())?;
    let connection_pool = get_connection_pool(db_type).await?;

    let repository = PgDinerRepository::new(DinersDao::new(), connection_pool);
    let ingestion_service = IngestionService::new(repository, config.corpus.strip_emoji);

    let result = ingestion_service.load_corpus(&config.corpus).await;

    ingestion_service.into_repository().close().await;

    match result {
        Ok(stats) => {
            tracing::info!("Loaded {} diners from {} files", stats.diners, stats.files);
            Ok(())
        }
        Err(err) => {
            tracing::error!("Load aborted: {}", err);
            Err(err.into())
        }
    }
}

/**
 * Initializes logging for the application.
 *
 * #Arguments
 * `logging`: The logging configuration.
 *
 * #Returns
 * A guard that flushes the log file when dropped, if a log file is configured.
 */
fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>, ApplicationError> {
    let mut env_filter = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();
    for directive in &logging.directives {
        let directive = directive
            .parse()
            .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Invalid logging directive {directive}: {err}")))?;
        env_filter = env_filter.add_directive(directive);
    }

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(logging.target)
        .with_thread_ids(logging.thread_ids)
        .with_thread_names(logging.thread_names)
        .with_line_number(logging.line_number)
        .with_level(logging.level)
        .with_ansi(logging.ansi)
        .with_file(logging.file);

    let (file_layer, guard) = match &logging.logfile {
        Some(logfile) => {
            let (directory, file_name) = split_logfile(logfile)?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(logging.target)
                .with_thread_ids(logging.thread_ids)
                .with_thread_names(logging.thread_names)
                .with_line_number(logging.line_number)
                .with_level(logging.level)
                .with_ansi(false)
                .with_file(logging.file);
            (Some(layer.boxed()), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to install subscriber: {err}")))?;
    Ok(guard)
}

/**
 * Splits a log file path into directory and file name.
 *
 * #Arguments
 * `logfile`: Path to the log file.
 *
 * #Returns
 * The directory, `.` for a bare file name, and the file name.
 */
fn split_logfile(logfile: &str) -> Result<(std::path::PathBuf, std::ffi::OsString), ApplicationError> {
    let path = std::path::Path::new(logfile);
    let file_name = path.file_name().ok_or_else(|| ApplicationError::new(ErrorType::Initialization, format!("Log file {logfile} has no file name")))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    Ok((directory, file_name.to_os_string()))
}

/**
 * Creates the database connection pool.
 *
 * #Arguments
 * `db_type`: The database configuration with environment overrides applied.
 *
 * #Returns
 * A `Result` containing the connection pool or an `std::io::Error` if the database is unreachable.
 */
async fn get_connection_pool(db_type: DatabaseType) -> Result<Pool<Postgres>, std::io::Error> {
    let connection_pool = match db_type {
        DatabaseType::Postgresql { host, port, username, password, database_name, max_connections, acquire_timeout } => {
            let connect_options = PgConnectOptions::new().host(&host).port(port).username(&username).database(&database_name);
            let connect_options = match password {
                Some(password) => connect_options.password(&password),
                None => connect_options,
            };
            tracing::info!("Connecting to {}:{}/{} as {}", host, port, database_name, username);
            PgPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(Duration::from_millis(acquire_timeout))
                .connect_with(connect_options)
                .await
                .map_err(|err| std::io::Error::other(format!("Failed to create database pool: {err}")))?
        }
    };
    Ok(connection_pool)
}

/**
 * Reads the configuration from the specified file.
 *
 * #Arguments
 * `config_file`: The path to the configuration file.
 *
 * #Returns
 * A `Result` containing the parsed `Config` or an `std::io::Error` if reading or parsing fails.
*/
fn get_config(config_file: &str) -> Result<Config, std::io::Error> {
    let config_str: String = std::fs::read_to_string(config_file).map_err(|err| std::io::Error::other(format!("Failed to read config file: {err}")))?;
    let config: Config = toml::from_str(&config_str).map_err(|err| std::io::Error::other(format!("Failed to parse config file: {err}")))?;
    Ok(config.validate()?)
}
