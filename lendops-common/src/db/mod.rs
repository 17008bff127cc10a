use diesel::pg::PgConnection;
use diesel::r2d2::ConnectionManager;
use std::fmt;
use std::time::Duration;

pub mod auth;
pub mod loan;
pub mod payment_channel;
pub mod repayment;

pub type DbThreadPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

pub fn create_db_thread_pool(
    database_uri: &str,
    max_connections: u32,
    idle_timeout: Duration,
) -> Result<DbThreadPool, r2d2::Error> {
    r2d2::Pool::builder()
        .max_size(max_connections)
        .idle_timeout(Some(idle_timeout))
        .build(ConnectionManager::<PgConnection>::new(database_uri))
}

#[derive(Debug)]
pub enum DaoError {
    DbThreadPoolFailure(r2d2::Error),
    QueryFailure(diesel::result::Error),
    CannotRunQuery(&'static str),
}

impl std::error::Error for DaoError {}

impl fmt::Display for DaoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaoError::DbThreadPoolFailure(e) => {
                write!(f, "DaoError: Failed to obtain a database connection: {e}")
            }
            DaoError::QueryFailure(e) => write!(f, "DaoError: Query failed: {e}"),
            DaoError::CannotRunQuery(msg) => write!(f, "DaoError: Cannot run query: {msg}"),
        }
    }
}

impl From<r2d2::Error> for DaoError {
    fn from(e: r2d2::Error) -> Self {
        DaoError::DbThreadPoolFailure(e)
    }
}

impl From<diesel::result::Error> for DaoError {
    fn from(e: diesel::result::Error) -> Self {
        DaoError::QueryFailure(e)
    }
}
