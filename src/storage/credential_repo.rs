use crate::domain::credential::Credential;
use crate::error::{AppError, Result};
use crate::storage::{CredentialStore, DbPool};
use async_trait::async_trait;
use sqlx::{Executor, Postgres};

#[derive(Clone, Debug, Default)]
pub struct CredentialRepository {}

impl CredentialRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {}
    }

    /// Inserts a credential row. The token payload goes into a JSONB column
    /// as-is; `created_at` is set by the database.
    pub async fn create<'e, E>(&self, executor: E, credential: &Credential) -> Result<()>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("INSERT INTO credentials (id, kind, key, user_id) VALUES ($1, $2, $3, $4)")
            .bind(credential.id)
            .bind(&credential.kind)
            .bind(&credential.key)
            .bind(credential.user_id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }
}

/// Postgres-backed credential store used by the running server.
#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: DbPool,
    repo: CredentialRepository,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool, repo: CredentialRepository::new() }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create(&self, credential: Credential) -> Result<()> {
        self.repo.create(&self.pool, &credential).await
    }
}
