//! SplitSphere API backend: settings, database wiring, declarative models, migrations and
//! the user resource schemas.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod migration;
pub mod models;
pub mod routes;
pub mod schemas;
pub mod state;

pub use app::build_app;
pub use config::Settings;
pub use db::{Dialect, Engine, Session};
pub use error::{AppError, ConfigError, FieldError, MigrationError, ValidationErrors};
pub use migration::{MigrationMode, MigrationOutcome, MigrationReport, Migrator};
pub use models::{metadata, Metadata, Model, ModelBase};
pub use state::AppState;
