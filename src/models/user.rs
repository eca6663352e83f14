use crate::models::{ColumnDef, ColumnDefault, ColumnType, Model, ModelBase};
use serde::{Deserialize, Serialize};

/// Persisted account row. Table `user`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub base: ModelBase,
    pub email: String,
    pub hashed_password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl Model for User {
    const TYPE_NAME: &'static str = "User";

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("email", ColumnType::Text).not_null().unique().index(),
            ColumnDef::new("hashed_password", ColumnType::Text).not_null(),
            ColumnDef::new("first_name", ColumnType::Text),
            ColumnDef::new("last_name", ColumnType::Text),
            ColumnDef::new("is_active", ColumnType::Boolean).default(ColumnDefault::Bool(true)),
            ColumnDef::new("is_superuser", ColumnType::Boolean).default(ColumnDefault::Bool(false)),
        ]
    }

    fn base(&self) -> &ModelBase {
        &self.base
    }
}
