#![forbid(unsafe_code)]
//! SQL generation from the metadata emitted by `#[derive(Entity)]`.
//!
//! The mapping engine emits exactly four SQL shapes, all built here:
//! `CREATE TABLE IF NOT EXISTS`, `DROP TABLE IF EXISTS`,
//! `INSERT INTO ... VALUES (?, ...)`, and `SELECT * FROM ... WHERE <id> = ?`.
//! Placeholders are SQLite-style `?`; values are always bound positionally,
//! including the primary-key lookup.

/// Build `CREATE TABLE IF NOT EXISTS <table> (<col> <type>[ PRIMARY KEY], ...)`
/// from `E`'s persistable fields, in declaration order.
pub fn create_table<E>() -> String
where
    E: tablemap_core::Persistable,
{
    let mut columns: Vec<String> = Vec::with_capacity(E::FIELDS.len());
    for field in E::FIELDS {
        let mut column = format!("{} {}", field.column, field.sql_type);
        if field.is_id {
            column.push_str(" PRIMARY KEY");
        }
        columns.push(column);
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {table} ({cols})",
        table = E::TABLE,
        cols = columns.join(", ")
    )
}

/// Build `DROP TABLE IF EXISTS <table>`.
pub fn drop_table<E>() -> String
where
    E: tablemap_core::Persistable,
{
    format!("DROP TABLE IF EXISTS {table}", table = E::TABLE)
}

/// Build `INSERT INTO <table> (<cols>) VALUES (?, ...)` with one placeholder
/// per persistable field. The primary key is one of the columns: keys are
/// stored verbatim, never engine-generated.
pub fn insert<E>() -> String
where
    E: tablemap_core::Persistable + tablemap_core::Insertable,
{
    let cols = E::INSERT_COLUMNS;
    let placeholders: Vec<&str> = std::iter::repeat("?").take(cols.len()).collect();
    format!(
        "INSERT INTO {table} ({cols}) VALUES ({vals})",
        table = E::TABLE,
        cols = cols.join(", "),
        vals = placeholders.join(", ")
    )
}

/// Build `SELECT * FROM <table> WHERE <id-column> = ?`.
///
/// The key is a bound parameter, and the WHERE column is the same
/// case-converted identifier used in the generated DDL.
pub fn select_by_id<E>() -> String
where
    E: tablemap_core::Persistable + tablemap_core::Identifiable,
{
    format!(
        "SELECT * FROM {table} WHERE {id} = ?",
        table = E::TABLE,
        id = E::ID_COLUMN
    )
}
