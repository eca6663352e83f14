//! Declarative entity base: shared identity and timestamp columns, table-name derivation,
//! and the explicit registry of table definitions that migrations consume.

pub mod user;

use crate::error::ValidationErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    Boolean,
    /// Timezone-aware timestamp.
    Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnDefault {
    /// Store clock at insert time.
    Now,
    Bool(bool),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub index: bool,
    pub default: Option<ColumnDefault>,
    /// Store refreshes the value to its clock on every UPDATE of the row.
    pub refresh_on_update: bool,
}

impl ColumnDef {
    /// Nullable, unindexed column without default.
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        ColumnDef {
            name,
            ty,
            nullable: true,
            primary_key: false,
            unique: false,
            index: false,
            default: None,
            refresh_on_update: false,
        }
    }

    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn index(mut self) -> Self {
        self.index = true;
        self
    }

    pub const fn default(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn refresh_on_update(mut self) -> Self {
        self.refresh_on_update = true;
        self
    }
}

/// Fields every persistent entity carries. Timestamps are written by the store, never by application code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelBase {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ModelBase {
    pub fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("id", ColumnType::Integer).primary_key().index(),
            ColumnDef::new("created_at", ColumnType::Timestamp)
                .not_null()
                .default(ColumnDefault::Now),
            ColumnDef::new("updated_at", ColumnType::Timestamp)
                .not_null()
                .default(ColumnDefault::Now)
                .refresh_on_update(),
        ]
    }
}

/// A persistent entity. Implementors compose a [`ModelBase`] and list their own columns.
pub trait Model {
    /// Type name the default table name is derived from.
    const TYPE_NAME: &'static str;

    fn table_name() -> String {
        Self::TYPE_NAME.to_lowercase()
    }

    /// Columns beyond the shared base columns.
    fn columns() -> Vec<ColumnDef>;

    fn base(&self) -> &ModelBase;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDef {
    pub type_name: &'static str,
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    pub fn of<M: Model>() -> TableDef {
        let mut columns = ModelBase::columns();
        columns.extend(M::columns());
        TableDef {
            type_name: M::TYPE_NAME,
            name: M::table_name(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index_name(&self, column: &str) -> String {
        format!("ix_{}_{}", self.name, column)
    }
}

/// Registry of every table known to the process, in registration order.
/// Entities that are never registered are invisible to migrations.
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    tables: Vec<TableDef>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `M`. Registering the same type twice is a no-op; two types mapping to one table is an error.
    pub fn register<M: Model>(&mut self) -> Result<&mut Self, ValidationErrors> {
        let table = TableDef::of::<M>();
        if let Some(existing) = self.tables.iter().find(|t| t.name == table.name) {
            if existing.type_name == table.type_name {
                return Ok(self);
            }
            let mut errors = ValidationErrors::new();
            errors.push(
                table.type_name,
                format!("table '{}' is already mapped to {}", table.name, existing.type_name),
            );
            return Err(errors);
        }
        self.tables.push(table);
        Ok(self)
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    /// Table name resolved for entity type `M`, if registered.
    pub fn table_name_of<M: Model>(&self) -> Option<&str> {
        self.tables
            .iter()
            .find(|t| t.type_name == M::TYPE_NAME)
            .map(|t| t.name.as_str())
    }
}

/// Registry of this crate's entities.
pub fn metadata() -> Metadata {
    Metadata {
        tables: vec![TableDef::of::<user::User>()],
    }
}
