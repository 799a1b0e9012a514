use crate::domain::credential::Credential;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

pub mod credential_repo;

pub type DbPool = Pool<Postgres>;

/// Persistence seam for credentials, so handlers can be exercised against an
/// in-memory store in tests.
#[async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    /// Inserts a new credential. Always an insert: a user connecting twice
    /// ends up with two records.
    async fn create(&self, credential: Credential) -> crate::error::Result<()>;
}

/// Initializes the database connection pool.
///
/// # Errors
/// Returns `sqlx::Error` if the connection fails.
pub async fn init_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new().max_connections(20).connect(database_url).await
}
