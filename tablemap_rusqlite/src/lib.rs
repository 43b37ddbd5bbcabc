#![forbid(unsafe_code)]
//! Synchronous SQLite backend for the tablemap mapping engine.
//!
//! One `rusqlite` connection is opened per database and shared, behind `Rc`,
//! by every repository vended from it. All operations block the caller until
//! SQLite responds; there is no internal locking or pooling, and the types
//! are deliberately `!Send`. Concurrent use of one connection is a caller
//! obligation this layer does not arbitrate.

use std::marker::PhantomData;
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

use rusqlite::types::Value;
use rusqlite::Connection;
use tablemap_core::{
    Identifiable, Insertable, ParamValue, Persistable, RepoError, RepoResult, Repository,
    RowAdapter, RowView,
};

#[cfg(feature = "tracing")]
use tracing::info;

#[inline]
#[allow(unused_variables)]
fn obs_record(op: &str, table: &str, start: Instant, rows: usize, success: bool) {
    let elapsed = start.elapsed().as_millis() as u64;
    #[cfg(feature = "tracing")]
    {
        info!(
            table = table,
            op = op,
            rows = rows,
            elapsed_ms = elapsed,
            success = success,
            "repo op"
        );
    }
}

/// Convert a backend-agnostic parameter into a SQLite value.
fn to_sqlite_value(p: ParamValue) -> Value {
    match p {
        ParamValue::String(s) => Value::Text(s),
        ParamValue::I32(i) => Value::Integer(i64::from(i)),
        ParamValue::I64(i) => Value::Integer(i),
        ParamValue::F64(f) => Value::Real(f),
        // SQLite bools are 0/1
        ParamValue::Bool(b) => Value::Integer(i64::from(b)),
        ParamValue::Bytes(b) => Value::Blob(b),
        ParamValue::Null => Value::Null,
    }
}

/// Convert a SQLite column value into the backend-agnostic representation.
fn from_sqlite_value(v: Value) -> ParamValue {
    match v {
        Value::Null => ParamValue::Null,
        Value::Integer(i) => ParamValue::I64(i),
        Value::Real(f) => ParamValue::F64(f),
        Value::Text(s) => ParamValue::String(s),
        Value::Blob(b) => ParamValue::Bytes(b),
    }
}

/// Column-by-name view over a `rusqlite` result row, handed to generated
/// row adapters.
struct SqliteRow<'a, 'stmt>(&'a rusqlite::Row<'stmt>);

impl RowView for SqliteRow<'_, '_> {
    fn get(&self, column: &str) -> RepoResult<ParamValue> {
        let value: Value = self.0.get(column).map_err(RepoError::mapping)?;
        Ok(from_sqlite_value(value))
    }
}

/// A SQLite database holding the single shared connection.
///
/// Schema operations (the DDL side of the mapping engine) live here;
/// row-level operations go through [`SqliteRepository`] instances vended by
/// [`SqliteDatabase::repository`], all of which share this connection.
pub struct SqliteDatabase {
    conn: Rc<Connection>,
}

impl SqliteDatabase {
    /// Open (creating if needed) a database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> RepoResult<Self> {
        let conn = Connection::open(path).map_err(RepoError::backend)?;
        Ok(Self {
            conn: Rc::new(conn),
        })
    }

    /// Open a fresh in-memory database.
    pub fn open_in_memory() -> RepoResult<Self> {
        let conn = Connection::open_in_memory().map_err(RepoError::backend)?;
        Ok(Self {
            conn: Rc::new(conn),
        })
    }

    /// Create `E`'s table from its field metadata. Idempotent: the statement
    /// carries `IF NOT EXISTS`, so repeated calls are not an error.
    pub fn create_table<E: Persistable>(&self) -> RepoResult<()> {
        let start = Instant::now();
        let sql = tablemap_sql_builder::create_table::<E>();
        let result = self.conn.execute(&sql, []).map_err(RepoError::backend);
        obs_record("create_table", E::TABLE, start, 0, result.is_ok());
        result.map(|_| ())
    }

    /// Drop `E`'s table. Idempotent: succeeds even if the table never existed.
    pub fn drop_table<E: Persistable>(&self) -> RepoResult<()> {
        let start = Instant::now();
        let sql = tablemap_sql_builder::drop_table::<E>();
        let result = self.conn.execute(&sql, []).map_err(RepoError::backend);
        obs_record("drop_table", E::TABLE, start, 0, result.is_ok());
        result.map(|_| ())
    }

    /// Vend a repository for `T` sharing this database's connection.
    pub fn repository<T, A>(&self, adapter: A) -> SqliteRepository<T, A>
    where
        T: Persistable + Identifiable + Insertable,
        A: RowAdapter<T>,
    {
        SqliteRepository::new(Rc::clone(&self.conn), adapter)
    }

    /// Access the underlying connection, e.g. for ad hoc queries in tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Statement text built once per repository from `T`'s metadata.
struct RepoSql<T> {
    insert: String,
    select_by_id: String,
    _marker: PhantomData<T>,
}

impl<T> RepoSql<T>
where
    T: Persistable + Identifiable + Insertable,
{
    fn new() -> Self {
        Self {
            insert: tablemap_sql_builder::insert::<T>(),
            select_by_id: tablemap_sql_builder::select_by_id::<T>(),
            _marker: PhantomData,
        }
    }
}

/// A synchronous, `rusqlite`-backed repository for entity `T`.
///
/// What a lookup returns is decided by the adapter `A`: the entity itself for
/// plain types, or the generated lazy proxy for types with lazy-remote
/// fields.
pub struct SqliteRepository<T, A> {
    conn: Rc<Connection>,
    adapter: A,
    sql: RepoSql<T>,
}

impl<T, A> SqliteRepository<T, A>
where
    T: Persistable + Identifiable + Insertable,
    A: RowAdapter<T>,
{
    /// Creates a repository over an existing shared connection.
    pub fn new(conn: Rc<Connection>, adapter: A) -> Self {
        Self {
            conn,
            adapter,
            sql: RepoSql::new(),
        }
    }
}

impl<T, A> Repository<T> for SqliteRepository<T, A>
where
    T: Persistable + Identifiable + Insertable,
    A: RowAdapter<T>,
    T::Key: rusqlite::ToSql,
{
    type Loaded = A::Output;

    fn insert(&self, entity: &T) -> RepoResult<()> {
        let start = Instant::now();
        let values: Vec<Value> = entity
            .insert_values()
            .into_iter()
            .map(to_sqlite_value)
            .collect();
        let result = (|| {
            let mut stmt = self
                .conn
                .prepare(&self.sql.insert)
                .map_err(RepoError::backend)?;
            stmt.execute(rusqlite::params_from_iter(values))
                .map_err(RepoError::backend)
        })();
        match result {
            Ok(n) => {
                obs_record("insert", T::TABLE, start, n, true);
                Ok(())
            }
            Err(e) => {
                obs_record("insert", T::TABLE, start, 0, false);
                Err(e)
            }
        }
    }

    fn find_by_id(&self, id: &T::Key) -> RepoResult<Option<Self::Loaded>> {
        let start = Instant::now();
        let mut stmt = self
            .conn
            .prepare(&self.sql.select_by_id)
            .map_err(RepoError::backend)?;
        let mut rows = stmt
            .query(rusqlite::params![id])
            .map_err(RepoError::backend)?;

        // Only the first matching row is consumed; primary-key uniqueness is
        // the caller's obligation.
        match rows.next().map_err(RepoError::backend)? {
            Some(row) => {
                let loaded = self.adapter.from_row(&SqliteRow(row))?;
                obs_record("find_by_id", T::TABLE, start, 1, true);
                Ok(Some(loaded))
            }
            None => {
                obs_record("find_by_id", T::TABLE, start, 0, true);
                Ok(None)
            }
        }
    }
}
