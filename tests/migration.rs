use splitsphere::models::{ColumnDef, ColumnType, Metadata, Model, ModelBase};
use splitsphere::models::user::User;
use splitsphere::{AppError, Engine, MigrationError, MigrationMode, MigrationOutcome, Migrator};

fn sqlite_file_url(dir: &tempfile::TempDir) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join("schema.db").display())
}

async fn scalar(engine: &Engine, sql: &str) -> i64 {
    let mut session = engine.session().await.unwrap();
    sqlx::query_scalar(sql).fetch_one(&mut *session).await.unwrap()
}

async fn table_count(engine: &Engine, name: &str) -> i64 {
    scalar(
        engine,
        &format!(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '{}'",
            name
        ),
    )
    .await
}

fn user_metadata() -> Metadata {
    let mut metadata = Metadata::new();
    metadata.register::<User>().unwrap();
    metadata
}

#[tokio::test]
async fn online_creates_registered_tables_then_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let url = sqlite_file_url(&dir);
    let metadata = user_metadata();
    let migrator = Migrator::new(&metadata, &url).unwrap();

    let report = migrator.run_online().await.unwrap();
    assert_eq!(report.created_tables, ["user"]);
    assert!(report.added_columns.is_empty());
    assert_eq!(report.statements.len(), 4);

    let again = migrator.run_online().await.unwrap();
    assert!(again.is_empty());

    let engine = Engine::connect(&url, 1).unwrap();
    assert_eq!(table_count(&engine, "user").await, 1);
    assert_eq!(
        scalar(
            &engine,
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'ix_user_email'"
        )
        .await,
        1
    );
}

#[tokio::test]
async fn store_sets_timestamps_and_refreshes_updated_at() {
    let dir = tempfile::tempdir().unwrap();
    let url = sqlite_file_url(&dir);
    let metadata = user_metadata();
    Migrator::new(&metadata, &url)
        .unwrap()
        .run_online()
        .await
        .unwrap();

    let engine = Engine::connect(&url, 1).unwrap();
    let mut session = engine.session().await.unwrap();
    sqlx::query(
        "INSERT INTO \"user\" (email, hashed_password, updated_at) VALUES ('a@b.co', 'h', '2000-01-01 00:00:00')",
    )
    .execute(&mut *session)
    .await
    .unwrap();
    let defaults: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM \"user\" WHERE created_at IS NOT NULL AND is_active = 1 AND is_superuser = 0",
    )
    .fetch_one(&mut *session)
    .await
    .unwrap();
    assert_eq!(defaults, 1);

    sqlx::query("UPDATE \"user\" SET first_name = 'Ana' WHERE email = 'a@b.co'")
        .execute(&mut *session)
        .await
        .unwrap();
    let refreshed: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM \"user\" WHERE updated_at > '2000-01-01 00:00:00'",
    )
    .fetch_one(&mut *session)
    .await
    .unwrap();
    assert_eq!(refreshed, 1);
}

#[tokio::test]
async fn refresh_trigger_terminates_under_recursive_triggers() {
    let dir = tempfile::tempdir().unwrap();
    let url = sqlite_file_url(&dir);
    let metadata = user_metadata();
    Migrator::new(&metadata, &url)
        .unwrap()
        .run_online()
        .await
        .unwrap();

    let engine = Engine::connect(&url, 1).unwrap();
    let mut session = engine.session().await.unwrap();
    sqlx::query("PRAGMA recursive_triggers = ON")
        .execute(&mut *session)
        .await
        .unwrap();
    sqlx::query("INSERT INTO \"user\" (email, hashed_password) VALUES ('a@b.co', 'h')")
        .execute(&mut *session)
        .await
        .unwrap();
    sqlx::query("UPDATE \"user\" SET first_name = 'x' WHERE email = 'a@b.co'")
        .execute(&mut *session)
        .await
        .unwrap();

    // An UPDATE that assigns updated_at itself keeps that value.
    sqlx::query(
        "UPDATE \"user\" SET last_name = 'y', updated_at = '2001-02-03 04:05:06' WHERE email = 'a@b.co'",
    )
    .execute(&mut *session)
    .await
    .unwrap();
    let kept: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM \"user\" WHERE updated_at = '2001-02-03 04:05:06' AND first_name = 'x'",
    )
    .fetch_one(&mut *session)
    .await
    .unwrap();
    assert_eq!(kept, 1);
}

#[tokio::test]
async fn missing_columns_are_added_to_existing_tables() {
    let dir = tempfile::tempdir().unwrap();
    let url = sqlite_file_url(&dir);
    let engine = Engine::connect(&url, 1).unwrap();
    {
        let mut session = engine.session().await.unwrap();
        sqlx::query(
            "CREATE TABLE \"user\" (id INTEGER PRIMARY KEY, created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP, updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP, email VARCHAR NOT NULL, hashed_password VARCHAR NOT NULL)",
        )
        .execute(&mut *session)
        .await
        .unwrap();
    }

    let metadata = user_metadata();
    let report = Migrator::new(&metadata, &url)
        .unwrap()
        .run_online()
        .await
        .unwrap();
    assert!(report.created_tables.is_empty());
    let added: Vec<&str> = report.added_columns.iter().map(|(_, c)| c.as_str()).collect();
    assert_eq!(added, ["first_name", "last_name", "is_active", "is_superuser"]);
    assert_eq!(
        scalar(&engine, "SELECT COUNT(*) FROM pragma_table_info('user')").await,
        9
    );
}

struct Broken {
    base: ModelBase,
}

impl Model for Broken {
    const TYPE_NAME: &'static str = "Broken";

    // Repeats a base column, so CREATE TABLE fails.
    fn columns() -> Vec<ColumnDef> {
        vec![ColumnDef::new("id", ColumnType::Integer)]
    }

    fn base(&self) -> &ModelBase {
        &self.base
    }
}

#[tokio::test]
async fn failure_rolls_back_every_statement() {
    let dir = tempfile::tempdir().unwrap();
    let url = sqlite_file_url(&dir);
    let mut metadata = user_metadata();
    metadata.register::<Broken>().unwrap();

    let err = Migrator::new(&metadata, &url)
        .unwrap()
        .run_online()
        .await
        .unwrap_err();
    match err {
        AppError::Migration(MigrationError::Statement { statement, .. }) => {
            assert!(statement.starts_with("CREATE TABLE \"broken\""), "{}", statement);
        }
        other => panic!("unexpected error: {}", other),
    }

    let engine = Engine::connect(&url, 1).unwrap();
    assert_eq!(table_count(&engine, "user").await, 0);
    assert_eq!(table_count(&engine, "broken").await, 0);
}

#[tokio::test]
async fn unregistered_entities_are_never_migrated() {
    let dir = tempfile::tempdir().unwrap();
    let url = sqlite_file_url(&dir);
    let metadata = Metadata::new();
    let outcome = Migrator::new(&metadata, &url)
        .unwrap()
        .run(MigrationMode::Online)
        .await
        .unwrap();
    match outcome {
        MigrationOutcome::Applied(report) => assert!(report.is_empty()),
        MigrationOutcome::Script(_) => panic!("online mode rendered a script"),
    }
    let engine = Engine::connect(&url, 1).unwrap();
    assert_eq!(table_count(&engine, "user").await, 0);
}

#[tokio::test]
async fn online_against_unreachable_store_is_a_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!(
        "sqlite://{}?mode=ro",
        dir.path().join("missing").join("db.sqlite").display()
    );
    let metadata = user_metadata();
    let err = Migrator::new(&metadata, &url)
        .unwrap()
        .run_online()
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Connection(_)));
}
