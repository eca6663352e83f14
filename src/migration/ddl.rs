//! DDL text for registered tables, per dialect.

use crate::db::Dialect;
use crate::models::{ColumnDef, ColumnDefault, ColumnType, TableDef};

pub(crate) fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn type_str(dialect: Dialect, ty: ColumnType) -> &'static str {
    match (dialect, ty) {
        (_, ColumnType::Integer) => "INTEGER",
        (_, ColumnType::Text) => "VARCHAR",
        (_, ColumnType::Boolean) => "BOOLEAN",
        (Dialect::Postgres, ColumnType::Timestamp) => "TIMESTAMPTZ",
        (Dialect::Sqlite, ColumnType::Timestamp) => "DATETIME",
    }
}

fn default_str(dialect: Dialect, default: ColumnDefault) -> &'static str {
    match (dialect, default) {
        (Dialect::Postgres, ColumnDefault::Now) => "now()",
        (Dialect::Sqlite, ColumnDefault::Now) => "(CURRENT_TIMESTAMP)",
        (Dialect::Postgres, ColumnDefault::Bool(true)) => "true",
        (Dialect::Postgres, ColumnDefault::Bool(false)) => "false",
        (Dialect::Sqlite, ColumnDefault::Bool(true)) => "1",
        (Dialect::Sqlite, ColumnDefault::Bool(false)) => "0",
    }
}

/// Column definition as it appears inside CREATE TABLE or after ADD COLUMN.
pub fn column_sql(dialect: Dialect, col: &ColumnDef) -> String {
    let typ = if col.primary_key && col.ty == ColumnType::Integer && dialect == Dialect::Postgres {
        "SERIAL"
    } else {
        type_str(dialect, col.ty)
    };
    let mut def = format!("{} {}", quote(col.name), typ);
    if !col.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(d) = col.default {
        def.push_str(" DEFAULT ");
        def.push_str(default_str(dialect, d));
    }
    if col.unique && !col.index {
        def.push_str(" UNIQUE");
    }
    def
}

pub fn create_table(dialect: Dialect, table: &TableDef) -> String {
    let mut defs: Vec<String> = table.columns.iter().map(|c| column_sql(dialect, c)).collect();
    let pk: Vec<String> = table
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| quote(c.name))
        .collect();
    if !pk.is_empty() {
        defs.push(format!("PRIMARY KEY ({})", pk.join(", ")));
    }
    format!(
        "CREATE TABLE {} (\n  {}\n)",
        quote(&table.name),
        defs.join(",\n  ")
    )
}

/// Index for a column declared with `index`; unique when the column is unique.
pub fn create_index(table: &TableDef, col: &ColumnDef) -> String {
    let unique = if col.unique { "UNIQUE " } else { "" };
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        unique,
        quote(&table.index_name(col.name)),
        quote(&table.name),
        quote(col.name)
    )
}

fn trigger_name(table: &TableDef, col: &ColumnDef) -> String {
    format!("trg_{}_{}", table.name, col.name)
}

fn touch_function_name(col: &ColumnDef) -> String {
    format!("splitsphere_touch_{}", col.name)
}

/// Statements that make the store refresh `col` on every UPDATE of a row in `table`, unless the
/// UPDATE itself assigns a new value to `col`.
pub fn refresh_trigger(dialect: Dialect, table: &TableDef, col: &ColumnDef) -> Vec<String> {
    match dialect {
        Dialect::Postgres => {
            let function = touch_function_name(col);
            vec![
                format!(
                    "CREATE OR REPLACE FUNCTION {f}() RETURNS trigger AS $$\nBEGIN\n  IF NEW.{c} IS NOT DISTINCT FROM OLD.{c} THEN\n    NEW.{c} := now();\n  END IF;\n  RETURN NEW;\nEND;\n$$ LANGUAGE plpgsql",
                    f = quote(&function),
                    c = quote(col.name)
                ),
                format!(
                    "CREATE TRIGGER {} BEFORE UPDATE ON {} FOR EACH ROW EXECUTE FUNCTION {}()",
                    quote(&trigger_name(table, col)),
                    quote(&table.name),
                    quote(&function)
                ),
            ]
        }
        // The inner UPDATE skips rows already at CURRENT_TIMESTAMP, so it matches nothing when
        // recursive_triggers re-enters within the same second.
        Dialect::Sqlite => {
            let pk = table
                .columns
                .iter()
                .find(|c| c.primary_key)
                .map(|c| c.name)
                .unwrap_or("rowid");
            vec![format!(
                "CREATE TRIGGER {trg} AFTER UPDATE ON {t} FOR EACH ROW WHEN NEW.{c} IS OLD.{c}\nBEGIN\n  UPDATE {t} SET {c} = CURRENT_TIMESTAMP WHERE {pk} = OLD.{pk} AND {c} IS NOT CURRENT_TIMESTAMP;\nEND",
                trg = quote(&trigger_name(table, col)),
                t = quote(&table.name),
                c = quote(col.name),
                pk = quote(pk)
            )]
        }
    }
}

/// Everything needed to bring `table` into existence: the table, its indexes and refresh triggers.
pub fn create_table_statements(dialect: Dialect, table: &TableDef) -> Vec<String> {
    let mut statements = vec![create_table(dialect, table)];
    for col in table.columns.iter().filter(|c| c.index) {
        statements.push(create_index(table, col));
    }
    for col in table.columns.iter().filter(|c| c.refresh_on_update) {
        statements.extend(refresh_trigger(dialect, table, col));
    }
    statements
}

/// Statements adding `col` to an existing `table`, with its index if declared.
pub fn add_column_statements(dialect: Dialect, table: &TableDef, col: &ColumnDef) -> Vec<String> {
    let mut statements = vec![format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote(&table.name),
        column_sql(dialect, col)
    )];
    if col.index {
        statements.push(create_index(table, col));
    }
    if col.refresh_on_update {
        statements.extend(refresh_trigger(dialect, table, col));
    }
    statements
}
