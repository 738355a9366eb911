use chrono::NaiveTime;
use sqlx::{Pool, Postgres};

use crate::{
    dao::diners::DinersDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{DinerId, DinerInputType, MenuItemInputType, TimetableInputType},
    },
};

/**
 * Write boundary of the loader. Every operation is committed on its own before it returns.
 */
#[allow(async_fn_in_trait)]
pub trait DinerRepository {
    /**
     * Persists one diner.
     *
     * # Returns
     * The identity the diner got, to be used by its menu items and timetable entries.
     */
    async fn insert_diner(&self, diner: &DinerInputType) -> Result<DinerId, ApplicationError>;

    /**
     * One greater than the highest diner identity, or `1` if there are no diners.
     */
    async fn next_diner_id(&self) -> Result<DinerId, ApplicationError>;

    /**
     * Persists one opening shift of an existing diner.
     */
    async fn insert_timetable_entry(&self, diner_id: DinerId, start: NaiveTime, end: NaiveTime) -> Result<(), ApplicationError>;

    /**
     * Persists one menu item of an existing diner.
     */
    async fn insert_menu_item(&self, name: &str, price: i64, diner_id: DinerId, details: Option<&str>) -> Result<(), ApplicationError>;
}

/**
 * `DinerRepository` on top of a `PostgreSQL` connection pool.
 */
pub struct PgDinerRepository {
    /**
     * The DAO for diner operations.
     */
    diners_dao: DinersDao,
    /**
     * Connection pool for database operations.
     */
    connection_pool: Pool<Postgres>,
}

impl PgDinerRepository {
    /**
     * Creates a new instance of `PgDinerRepository`.
     *
     * # Arguments
     * `diners_dao`: The DAO for diner operations.
     * `connection_pool`: Connection pool for database operations.
     *
     * # Returns
     * A new instance of `PgDinerRepository`.
     */
    pub fn new(diners_dao: DinersDao, connection_pool: Pool<Postgres>) -> Self {
        PgDinerRepository { diners_dao, connection_pool }
    }

    /**
     * Closes the connection pool. Waits for connections in use to be returned.
     */
    pub async fn close(self) {
        self.connection_pool.close().await;
    }
}

impl DinerRepository for PgDinerRepository {
    async fn insert_diner(&self, diner: &DinerInputType) -> Result<DinerId, ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        match self.diners_dao.add_diner(&mut transaction, diner).await {
            Ok(diner_id) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::Database, format!("Failed to commit transaction: {err}")))?;
                Ok(diner_id)
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::Database, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }

    async fn next_diner_id(&self) -> Result<DinerId, ApplicationError> {
        let mut connection = self.connection_pool.acquire().await.map_err(|err| ApplicationError::new(ErrorType::Database, format!("Failed to acquire connection: {err}")))?;
        self.diners_dao.get_next_diner_id(&mut connection).await
    }

    async fn insert_timetable_entry(&self, diner_id: DinerId, start: NaiveTime, end: NaiveTime) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let timetable_input = TimetableInputType { diner_id, time_start: start, time_close: end };
        match self.diners_dao.add_timetable_entry(&mut transaction, timetable_input).await {
            Ok(()) => transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::Database, format!("Failed to commit transaction: {err}")))?,
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::Database, format!("Failed to rollback transaction: {err}")))?;
                return Err(err);
            }
        }
        Ok(())
    }

    async fn insert_menu_item(&self, name: &str, price: i64, diner_id: DinerId, details: Option<&str>) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let menu_item_input = MenuItemInputType { diner_id, name: name.to_string(), price, details: details.map(str::to_string) };
        match self.diners_dao.add_menu_item(&mut transaction, &menu_item_input).await {
            Ok(()) => transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::Database, format!("Failed to commit transaction: {err}")))?,
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::Database, format!("Failed to rollback transaction: {err}")))?;
                return Err(err);
            }
        }
        Ok(())
    }
}

async fn begin(connection_pool: &Pool<Postgres>) -> Result<sqlx::Transaction<'static, Postgres>, ApplicationError> {
    connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::Database, format!("Failed to begin transaction: {err}")))
}
