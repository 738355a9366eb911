use std::borrow::Cow;

use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{DinerId, DinerInputType, MenuItemInputType, TimetableInputType},
};

/**
 * SQL query to add a new diner. The database assigns the id.
 */
const ADD_DINER: &str = "INSERT INTO diners (name, address, city, district, priceMin, priceMax, website, qualityPoint, pricePoint, servicePoint, destinationPoint, spacePoint)
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                         RETURNING id";

/**
 * SQL query for the id the next diner will get.
 */
const NEXT_DINER_ID: &str = "SELECT COALESCE(MAX(id), 0) + 1 FROM diners";

/**
 * SQL query to add an opening shift.
 */
const ADD_TIMETABLE: &str = "INSERT INTO timetable (dinerID, time_start, time_close) VALUES ($1, $2, $3)";

/**
 * SQL query to add a menu item.
 */
const ADD_MENU_ITEM: &str = "INSERT INTO menu (name, price, details, dinerID) VALUES ($1, $2, $3, $4)";

/**
 * DAO for diner-related database operations.
 */
pub struct DinersDao {}

impl DinersDao {
    /**
     * Creates a new instance of `DinersDao`.
     *
     * # Returns
     * A new instance of `DinersDao`.
     */
    pub fn new() -> Self {
        DinersDao {}
    }

    /**
     * Adds a new diner to the database.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `diner_input`: The normalized diner.
     *
     * # Returns
     * The id of the inserted diner or an `ApplicationError`.
     */
    #[instrument(skip(self, transaction), fields(name = %diner_input.name))]
    pub async fn add_diner(&self, transaction: &mut PgConnection, diner_input: &DinerInputType) -> Result<DinerId, ApplicationError> {
        let span = tracing::Span::current();
        let [quality, price, service, location, ambience] = diner_input.review;
        let diner_id: (DinerId,) = sqlx::query_as(ADD_DINER)
            .bind(&diner_input.name)
            .bind(&diner_input.address)
            .bind(&diner_input.city)
            .bind(&diner_input.district)
            .bind(diner_input.price_min)
            .bind(diner_input.price_max)
            .bind(&diner_input.website)
            .bind(quality)
            .bind(price)
            .bind(service)
            .bind(location)
            .bind(ambience)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err))?;
        Ok(diner_id.0)
    }

    /**
     * Gets the id the next inserted diner will get, `1` when there are no diners.
     *
     * # Arguments
     * `connection`: The database connection.
     *
     * # Returns
     * The next diner id or an `ApplicationError`.
     */
    #[instrument(skip(self, connection))]
    pub async fn get_next_diner_id(&self, connection: &mut PgConnection) -> Result<DinerId, ApplicationError> {
        let span = tracing::Span::current();
        let next_id: (DinerId,) = sqlx::query_as(NEXT_DINER_ID)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::Database, format!("Failed to execute query to get next diner id: {err}")))?;
        Ok(next_id.0)
    }

    /**
     * Adds an opening shift for a diner.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `timetable_input`: The shift.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, transaction))]
    pub async fn add_timetable_entry(&self, transaction: &mut PgConnection, timetable_input: TimetableInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(ADD_TIMETABLE)
            .bind(timetable_input.diner_id)
            .bind(timetable_input.time_start)
            .bind(timetable_input.time_close)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err))?;
        Ok(())
    }

    /**
     * Adds a menu item for a diner.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `menu_item_input`: The menu item.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, transaction, menu_item_input), fields(diner_id = menu_item_input.diner_id))]
    pub async fn add_menu_item(&self, transaction: &mut PgConnection, menu_item_input: &MenuItemInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(ADD_MENU_ITEM)
            .bind(&menu_item_input.name)
            .bind(menu_item_input.price)
            .bind(&menu_item_input.details)
            .bind(menu_item_input.diner_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err))?;
        Ok(())
    }

    /**
     * Handles database errors and maps them to application errors.
     *
     * # Arguments
     * `error`: The sqlx error to handle.
     *
     * # Returns
     * An `ApplicationError` of type `Database` describing the failure.
     */
    fn handle_database_error(error: &sqlx::Error) -> ApplicationError {
        if let Some(db_error) = error.as_database_error() {
            tracing::debug!("Database error: {}", db_error);
            if db_error.code() == Some(Cow::Borrowed("23503")) {
                // Foreign key violation
                return ApplicationError::new(ErrorType::Database, format!("Missing parent diner: {db_error}"));
            } else if db_error.code() == Some(Cow::Borrowed("23505")) {
                // Unique violation
                return ApplicationError::new(ErrorType::Database, format!("Already exists: {db_error}"));
            } else if db_error.code() == Some(Cow::Borrowed("22001")) {
                // Value too long
                return ApplicationError::new(ErrorType::Database, format!("Value too long: {db_error}"));
            }
            tracing::error!("Unhandled database error: {}", db_error);
            return ApplicationError::new(ErrorType::Database, format!("Unhandled database error: {db_error}"));
        }
        ApplicationError::new(ErrorType::Database, format!("Failed to execute database operation: {error}"))
    }
}
