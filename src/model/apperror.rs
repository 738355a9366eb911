use std::fmt;

/**
 * Represents the type of error that can occur within the application.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorType {
    /**
     * Configuration, logging or database pool could not be set up.
     */
    Initialization,
    /**
     * Source file could not be read or is not a valid diner record.
     */
    Parse,
    /**
     * Price text is not a whole number once currency glyph and separators are removed.
     */
    MalformedPrice,
    /**
     * Shift text is not of the form HH:MM-HH:MM.
     */
    MalformedShift,
    /**
     * Record has no menu data. Informational only.
     */
    MissingMenu,
    /**
     * Write rejected by the database.
     */
    Database,
}

/**
 * Represents an error that occurs within the application.
 */
#[derive(Debug, Clone)]
pub struct ApplicationError {
    /**
     * Error type.
     */
    pub error_type: ErrorType,
    /**
     * Error message describing problem.
     */
    pub message: String,
}

impl ApplicationError {
    /**
     * Creates a new ApplicationError.
     *
     * #Arguments
     * `error_type`: The type of error.
     * `message`: A description of the error.
     */
    pub fn new(error_type: ErrorType, message: String) -> Self {
        ApplicationError { error_type, message }
    }

    /**
     * Whether the ingestion may continue with the next unit of work after this error.
     * Only database errors leave the store in an unknown state.
     */
    pub fn is_recoverable(&self) -> bool {
        self.error_type != ErrorType::Database && self.error_type != ErrorType::Initialization
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApplicationError {}

impl From<ApplicationError> for std::io::Error {
    fn from(err: ApplicationError) -> Self {
        std::io::Error::other(format!("{:?}: {}", err.error_type, err.message))
    }
}
