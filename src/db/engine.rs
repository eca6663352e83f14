//! Connection pool built once from settings and shared by every request task.

use crate::config::Settings;
use crate::config::settings::redact_url;
use crate::db::{Dialect, Session};
use crate::error::AppError;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::time::Duration;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
const SQLITE_BUSY_TIMEOUT_MS: u32 = 5_000;

/// Shared pool plus the dialect it speaks. Clones share the same pool.
#[derive(Clone, Debug)]
pub struct Engine {
    pool: AnyPool,
    dialect: Dialect,
}

impl Engine {
    /// Build the engine from `DATABASE_URL`.
    pub fn open(settings: &Settings) -> Result<Engine, AppError> {
        Engine::connect(&settings.database_url, DEFAULT_MAX_CONNECTIONS)
    }

    /// Build a lazy pool: no connection is made until the first session is requested,
    /// so an unreachable store surfaces as [`AppError::Connection`] on first use.
    pub fn connect(database_url: &str, max_connections: u32) -> Result<Engine, AppError> {
        sqlx::any::install_default_drivers();
        let dialect = Dialect::from_url(database_url).ok_or_else(|| {
            AppError::Connection(sqlx::Error::Configuration(
                format!("unsupported database URL: {}", redact_url(database_url)).into(),
            ))
        })?;

        let mut options = AnyPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT);
        if dialect == Dialect::Sqlite {
            // Several pooled connections may touch the same file: readers do not block the writer,
            // and a busy writer is waited on instead of failing immediately.
            options = options.after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                    sqlx::query(&format!("PRAGMA busy_timeout = {}", SQLITE_BUSY_TIMEOUT_MS))
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            });
        }

        let pool = options
            .connect_lazy(database_url)
            .map_err(AppError::Connection)?;
        tracing::info!(
            url = %redact_url(database_url),
            %dialect,
            max_connections,
            "database engine created"
        );
        Ok(Engine { pool, dialect })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Check out a fresh unit of work. The connection returns to the pool when the session drops.
    pub async fn session(&self) -> Result<Session, AppError> {
        let conn = self.pool.acquire().await.map_err(AppError::Connection)?;
        Ok(Session::new(conn))
    }

    /// Round-trip `SELECT 1` through a short-lived session.
    pub async fn ping(&self) -> Result<(), AppError> {
        let mut session = self.session().await?;
        sqlx::query("SELECT 1")
            .execute(&mut *session)
            .await
            .map_err(AppError::Connection)?;
        Ok(())
    }

    /// Waits for checked-out sessions to be returned, then closes every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("database engine closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_scheme() {
        let err = Engine::connect("mysql://localhost/db", 1).unwrap_err();
        assert!(matches!(err, AppError::Connection(_)));
    }

    #[tokio::test]
    async fn sqlite_engine_pings() {
        let engine = Engine::connect("sqlite::memory:", 1).unwrap();
        assert_eq!(engine.dialect(), Dialect::Sqlite);
        engine.ping().await.unwrap();
        engine.close().await;
    }

    #[tokio::test]
    async fn construction_is_lazy_and_failure_surfaces_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        // Parent directory does not exist and mode=ro forbids creating the file.
        let url = format!(
            "sqlite://{}?mode=ro",
            dir.path().join("missing").join("db.sqlite").display()
        );
        let engine = Engine::connect(&url, 1).unwrap();
        let err = engine.session().await.unwrap_err();
        assert!(matches!(err, AppError::Connection(_)));
    }
}
