//! Migration environment: bring the store's schema in line with the registered [`Metadata`].
//!
//! Offline mode renders the full DDL script without connecting. Online mode opens one unpooled
//! connection, diffs the registry against the live schema, and applies the difference inside a
//! single transaction: either every statement lands or none does.

pub mod ddl;

use crate::config::Settings;
use crate::db::Dialect;
use crate::error::{AppError, MigrationError, ValidationErrors};
use crate::models::{Metadata, TableDef};
use sqlx::any::Any;
use sqlx::{AnyConnection, Connection, Transaction};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationMode {
    Offline,
    Online,
}

#[derive(Debug)]
pub enum MigrationOutcome {
    Script(String),
    Applied(MigrationReport),
}

/// What an online run changed. Empty when the store already matched the registry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub created_tables: Vec<String>,
    /// `(table, column)` pairs added to tables that already existed.
    pub added_columns: Vec<(String, String)>,
    pub statements: Vec<String>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

pub struct Migrator<'a> {
    metadata: &'a Metadata,
    url: String,
    dialect: Dialect,
}

impl<'a> Migrator<'a> {
    pub fn new(metadata: &'a Metadata, database_url: &str) -> Result<Self, AppError> {
        let dialect = Dialect::from_url(database_url).ok_or_else(|| {
            let mut errors = ValidationErrors::new();
            errors.push("DATABASE_URL", "unsupported connection string scheme");
            AppError::Validation(errors)
        })?;
        Ok(Migrator {
            metadata,
            url: database_url.to_string(),
            dialect,
        })
    }

    pub fn from_settings(metadata: &'a Metadata, settings: &Settings) -> Result<Self, AppError> {
        Migrator::new(metadata, &settings.database_url)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub async fn run(&self, mode: MigrationMode) -> Result<MigrationOutcome, AppError> {
        match mode {
            MigrationMode::Offline => Ok(MigrationOutcome::Script(self.render_offline())),
            MigrationMode::Online => self.run_online().await.map(MigrationOutcome::Applied),
        }
    }

    /// Statements that create every registered table from scratch, in registration order.
    pub fn offline_statements(&self) -> Vec<String> {
        self.metadata
            .tables()
            .iter()
            .flat_map(|t| ddl::create_table_statements(self.dialect, t))
            .collect()
    }

    /// SQL script for review or CI. Does not connect to the store.
    pub fn render_offline(&self) -> String {
        let mut script = format!(
            "-- splitsphere schema ({}), {} table(s)\nBEGIN;\n\n",
            self.dialect,
            self.metadata.tables().len()
        );
        for statement in self.offline_statements() {
            script.push_str(&statement);
            script.push_str(";\n\n");
        }
        script.push_str("COMMIT;\n");
        script
    }

    pub async fn run_online(&self) -> Result<MigrationReport, AppError> {
        sqlx::any::install_default_drivers();
        let mut conn = AnyConnection::connect(&self.url)
            .await
            .map_err(AppError::Connection)?;
        let report = {
            let mut tx = conn.begin().await.map_err(AppError::Connection)?;
            match self.apply(&mut tx).await {
                Ok(report) => {
                    tx.commit().await.map_err(|source| MigrationError::Statement {
                        statement: "COMMIT".into(),
                        source,
                    })?;
                    report
                }
                Err(e) => {
                    if let Err(rollback) = tx.rollback().await {
                        tracing::warn!(error = %rollback, "explicit rollback failed; connection close discards the transaction");
                    }
                    tracing::error!(error = %e, "migration rolled back");
                    return Err(e);
                }
            }
        };
        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "closing migration connection");
        }
        tracing::info!(
            created_tables = report.created_tables.len(),
            added_columns = report.added_columns.len(),
            "migration committed"
        );
        Ok(report)
    }

    async fn apply(&self, tx: &mut Transaction<'_, Any>) -> Result<MigrationReport, AppError> {
        let mut report = MigrationReport::default();
        for table in self.metadata.tables() {
            let statements = if !self.table_exists(tx, &table.name).await? {
                report.created_tables.push(table.name.clone());
                ddl::create_table_statements(self.dialect, table)
            } else {
                self.missing_column_statements(tx, table, &mut report).await?
            };
            for statement in statements {
                tracing::info!(table = %table.name, %statement, "applying");
                sqlx::query(&statement)
                    .execute(&mut **tx)
                    .await
                    .map_err(|source| MigrationError::Statement {
                        statement: statement.clone(),
                        source,
                    })?;
                report.statements.push(statement);
            }
        }
        Ok(report)
    }

    async fn missing_column_statements(
        &self,
        tx: &mut Transaction<'_, Any>,
        table: &TableDef,
        report: &mut MigrationReport,
    ) -> Result<Vec<String>, AppError> {
        let mut statements = Vec::new();
        for col in &table.columns {
            if !self.column_exists(tx, &table.name, col.name).await? {
                report.added_columns.push((table.name.clone(), col.name.to_string()));
                statements.extend(ddl::add_column_statements(self.dialect, table, col));
            }
        }
        Ok(statements)
    }

    async fn table_exists(&self, tx: &mut Transaction<'_, Any>, table: &str) -> Result<bool, AppError> {
        let sql = match self.dialect {
            Dialect::Postgres => format!(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = current_schema() AND table_name::text = {}",
                self.dialect.placeholder(1)
            ),
            Dialect::Sqlite => format!(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = {}",
                self.dialect.placeholder(1)
            ),
        };
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(table)
            .fetch_one(&mut **tx)
            .await
            .map_err(MigrationError::Introspection)?;
        Ok(count > 0)
    }

    async fn column_exists(
        &self,
        tx: &mut Transaction<'_, Any>,
        table: &str,
        column: &str,
    ) -> Result<bool, AppError> {
        let sql = match self.dialect {
            Dialect::Postgres => format!(
                "SELECT COUNT(*) FROM information_schema.columns WHERE table_schema = current_schema() AND table_name::text = {} AND column_name::text = {}",
                self.dialect.placeholder(1),
                self.dialect.placeholder(2)
            ),
            Dialect::Sqlite => format!(
                "SELECT COUNT(*) FROM pragma_table_info({}) WHERE name = {}",
                self.dialect.placeholder(1),
                self.dialect.placeholder(2)
            ),
        };
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(table)
            .bind(column)
            .fetch_one(&mut **tx)
            .await
            .map_err(MigrationError::Introspection)?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::metadata;

    #[test]
    fn offline_script_is_one_transaction() {
        let metadata = metadata();
        let migrator = Migrator::new(&metadata, "postgresql://u:p@localhost/db").unwrap();
        let script = migrator.render_offline();
        assert!(script.starts_with("-- splitsphere schema (postgres), 1 table(s)\nBEGIN;"));
        assert!(script.trim_end().ends_with("COMMIT;"));
        assert!(script.contains("CREATE TABLE \"user\""));
        assert!(script.contains("CREATE UNIQUE INDEX \"ix_user_email\""));
    }

    #[test]
    fn unregistered_entities_are_excluded() {
        let empty = Metadata::new();
        let migrator = Migrator::new(&empty, "sqlite::memory:").unwrap();
        assert!(migrator.offline_statements().is_empty());
        assert!(!migrator.render_offline().contains("CREATE TABLE"));
    }

    #[test]
    fn rejects_unknown_dialect() {
        let metadata = metadata();
        assert!(matches!(
            Migrator::new(&metadata, "mysql://localhost/db"),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn offline_mode_never_connects() {
        let metadata = metadata();
        // Nothing listens here; offline mode must still succeed.
        let migrator = Migrator::new(&metadata, "postgres://u:p@127.0.0.1:1/none").unwrap();
        match migrator.run(MigrationMode::Offline).await.unwrap() {
            MigrationOutcome::Script(sql) => assert!(sql.contains("CREATE TABLE")),
            MigrationOutcome::Applied(_) => panic!("offline mode applied changes"),
        }
    }
}
