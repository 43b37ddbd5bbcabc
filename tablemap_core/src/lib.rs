#![forbid(unsafe_code)]
//! Core traits for the tablemap mapping library.
//! This crate is database-agnostic and should not contain any backend-specific logic.

/// Descriptor for a single persistable field, in declaration order.
///
/// The order of `Persistable::FIELDS` is load-bearing: it drives both the
/// column order in generated DDL and the positional correspondence between
/// insert values and SQL placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    /// Storage column name (already case-converted).
    pub column: &'static str,
    /// Storage type token (e.g. `TEXT`, `INTEGER`, `BLOB`).
    pub sql_type: &'static str,
    /// Whether this field is the primary key.
    pub is_id: bool,
    /// Whether this field's stored value is a locator resolved remotely on
    /// first access rather than real content.
    pub is_lazy: bool,
}

/// Compile-time table metadata for a mappable type.
/// Implemented via `#[derive(Entity)]` in `tablemap_macros`.
pub trait Persistable {
    const TABLE: &'static str;

    /// Persistable fields in declaration order. Skipped fields do not appear.
    const FIELDS: &'static [FieldMeta];
}

/// A backend-agnostic representation of a database value.
/// This is used to pass entity field values from generated code to backend
/// adapters, and back, without making `tablemap_core` depend on a driver.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    I32(i32),
    I64(i64),
    F64(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Null,
}

/// Trait for entities that have an identifiable key.
/// Exposes the key type and column name so generated code can introspect it.
pub trait Identifiable {
    /// The type of the primary key (e.g. `i64`, `String`).
    type Key;

    /// The name of the primary key column in the database.
    const ID_COLUMN: &'static str;

    /// Returns a copy of the entity's key, if it is set.
    fn id(&self) -> Option<Self::Key>;
}

/// Trait for types whose fields can be extracted for an INSERT statement.
/// Implemented by the `#[derive(Entity)]` macro.
pub trait Insertable {
    /// The columns of an INSERT statement, in declaration order. The primary
    /// key is included: keys are stored verbatim, never engine-generated.
    const INSERT_COLUMNS: &'static [&'static str];

    /// The values corresponding to `INSERT_COLUMNS`, position for position.
    fn insert_values(&self) -> Vec<ParamValue>;
}

/// Lightweight, backend-agnostic error type for mapping operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Opaque backend error from the underlying driver or adapter.
    #[error("backend error")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Error while binding a backend row into an entity.
    #[error("mapping error")]
    Mapping {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Error while fetching remote content for a lazy field.
    #[error("fetch error")]
    Fetch {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A load was attempted on an instance whose primary key is unset.
    #[error("primary key is not set")]
    MissingKey,
}

impl RepoError {
    /// Wrap a backend/driver error.
    pub fn backend<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepoError::Backend {
            source: Box::new(e),
        }
    }

    /// Wrap a row-binding error.
    pub fn mapping<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepoError::Mapping {
            source: Box::new(e),
        }
    }

    /// Wrap a remote-fetch error.
    pub fn fetch<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepoError::Fetch {
            source: Box::new(e),
        }
    }
}

/// Convenience alias for results returned by mapping operations.
pub type RepoResult<T> = Result<T, RepoError>;

fn mismatch(expected: &str, got: &ParamValue) -> RepoError {
    RepoError::mapping(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("expected {expected}, got {got:?}"),
    ))
}

/// Conversion from a stored value back into a field value.
///
/// SQLite hands back integers as `I64`, so the integral impls accept both
/// `I32` and `I64`, and `bool` accepts any non-zero integer as true.
pub trait FromParam: Sized {
    fn from_param(value: ParamValue) -> RepoResult<Self>;
}

impl FromParam for String {
    fn from_param(value: ParamValue) -> RepoResult<Self> {
        match value {
            ParamValue::String(s) => Ok(s),
            // Locators and other text may be stored as raw bytes.
            ParamValue::Bytes(b) => String::from_utf8(b).map_err(RepoError::mapping),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl FromParam for i64 {
    fn from_param(value: ParamValue) -> RepoResult<Self> {
        match value {
            ParamValue::I64(i) => Ok(i),
            ParamValue::I32(i) => Ok(i64::from(i)),
            other => Err(mismatch("integer", &other)),
        }
    }
}

impl FromParam for i32 {
    fn from_param(value: ParamValue) -> RepoResult<Self> {
        match value {
            ParamValue::I32(i) => Ok(i),
            ParamValue::I64(i) => i32::try_from(i).map_err(RepoError::mapping),
            other => Err(mismatch("integer", &other)),
        }
    }
}

impl FromParam for f64 {
    fn from_param(value: ParamValue) -> RepoResult<Self> {
        match value {
            ParamValue::F64(f) => Ok(f),
            ParamValue::I64(i) => Ok(i as f64),
            other => Err(mismatch("real", &other)),
        }
    }
}

impl FromParam for bool {
    fn from_param(value: ParamValue) -> RepoResult<Self> {
        match value {
            ParamValue::Bool(b) => Ok(b),
            ParamValue::I64(i) => Ok(i != 0),
            ParamValue::I32(i) => Ok(i != 0),
            other => Err(mismatch("integer (bool)", &other)),
        }
    }
}

impl FromParam for Vec<u8> {
    fn from_param(value: ParamValue) -> RepoResult<Self> {
        match value {
            ParamValue::Bytes(b) => Ok(b),
            ParamValue::String(s) => Ok(s.into_bytes()),
            other => Err(mismatch("blob", &other)),
        }
    }
}

impl<T: FromParam> FromParam for Option<T> {
    fn from_param(value: ParamValue) -> RepoResult<Self> {
        match value {
            ParamValue::Null => Ok(None),
            other => T::from_param(other).map(Some),
        }
    }
}

/// Column lookup by name over a backend result row.
/// Backends implement this for their row representations so generated
/// adapters stay driver-agnostic.
pub trait RowView {
    fn get(&self, column: &str) -> RepoResult<ParamValue>;
}

/// Materializes the outcome of a row lookup for entity `T`.
///
/// `Output` is `T` itself for plain types; for types with lazy-remote fields
/// the `#[derive(Entity)]` macro generates an adapter whose output is the
/// lazy proxy, so the variant a caller holds is fixed at load time.
pub trait RowAdapter<T> {
    type Output;
    fn from_row(&self, row: &dyn RowView) -> RepoResult<Self::Output>;
}

/// The remote-content fetch collaborator: given a locator, return raw bytes.
/// Invoked by lazy proxies on first accessor call; failures surface as
/// [`RepoError::Fetch`].
pub trait RemoteFetch {
    fn fetch(&self, locator: &str) -> RepoResult<Vec<u8>>;
}

/// A minimal, synchronous repository interface for an entity `T`.
/// Concrete backends provide implementations.
pub trait Repository<T: Identifiable> {
    /// What a lookup materializes: the entity, or its lazy proxy.
    type Loaded;

    /// Append exactly one row for the entity. Duplicate primary keys surface
    /// the engine's constraint error; nothing is retried or swallowed.
    fn insert(&self, entity: &T) -> RepoResult<()>;

    /// Fetch by primary key. `Ok(None)` when no row matches.
    fn find_by_id(&self, id: &T::Key) -> RepoResult<Option<Self::Loaded>>;

    /// Fetch the row matching the supplied instance's primary key.
    /// Fails with [`RepoError::MissingKey`] when the key is unset.
    fn load(&self, entity: &T) -> RepoResult<Option<Self::Loaded>> {
        match entity.id() {
            Some(id) => self.find_by_id(&id),
            None => Err(RepoError::MissingKey),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_error_display_messages() {
        let e1 = RepoError::backend(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(format!("{}", e1), "backend error");

        let e2 = RepoError::mapping(std::io::Error::new(std::io::ErrorKind::Other, "bad row"));
        assert_eq!(format!("{}", e2), "mapping error");

        let e3 = RepoError::fetch(std::io::Error::new(std::io::ErrorKind::Other, "offline"));
        assert_eq!(format!("{}", e3), "fetch error");

        assert_eq!(format!("{}", RepoError::MissingKey), "primary key is not set");
    }

    #[test]
    fn from_param_accepts_native_values() {
        assert_eq!(
            String::from_param(ParamValue::String("s".into())).unwrap(),
            "s"
        );
        assert_eq!(i64::from_param(ParamValue::I64(64)).unwrap(), 64);
        assert_eq!(i32::from_param(ParamValue::I64(32)).unwrap(), 32);
        assert_eq!(f64::from_param(ParamValue::F64(6.5)).unwrap(), 6.5);
        assert!(bool::from_param(ParamValue::I64(1)).unwrap());
        assert!(!bool::from_param(ParamValue::I64(0)).unwrap());
        assert_eq!(
            Vec::<u8>::from_param(ParamValue::Bytes(vec![1, 2])).unwrap(),
            vec![1, 2]
        );
    }

    #[test]
    fn from_param_decodes_text_and_bytes_both_ways() {
        // Locators stored as blobs come back as valid text.
        let s = String::from_param(ParamValue::Bytes(b"http://x/img".to_vec())).unwrap();
        assert_eq!(s, "http://x/img");

        // And text columns read into byte fields keep their raw encoding.
        let b = Vec::<u8>::from_param(ParamValue::String("abc".into())).unwrap();
        assert_eq!(b, b"abc");

        let err = String::from_param(ParamValue::Bytes(vec![0xff, 0xfe])).unwrap_err();
        assert!(matches!(err, RepoError::Mapping { .. }));
    }

    #[test]
    fn from_param_option_maps_null() {
        let none: Option<String> = Option::from_param(ParamValue::Null).unwrap();
        assert_eq!(none, None);
        let some: Option<i64> = Option::from_param(ParamValue::I64(7)).unwrap();
        assert_eq!(some, Some(7));
    }

    #[test]
    fn from_param_rejects_mismatches() {
        assert!(matches!(
            i64::from_param(ParamValue::String("x".into())),
            Err(RepoError::Mapping { .. })
        ));
        assert!(matches!(
            i32::from_param(ParamValue::I64(i64::MAX)),
            Err(RepoError::Mapping { .. })
        ));
    }

    // A tiny entity, row view, and adapter to exercise trait wiring.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct MiniEntity {
        id: Option<i64>,
    }

    impl Identifiable for MiniEntity {
        type Key = i64;
        const ID_COLUMN: &'static str = "id";
        fn id(&self) -> Option<Self::Key> {
            self.id
        }
    }

    struct MiniRow(i64);
    impl RowView for MiniRow {
        fn get(&self, column: &str) -> RepoResult<ParamValue> {
            match column {
                "id" => Ok(ParamValue::I64(self.0)),
                other => Err(mismatch("known column", &ParamValue::String(other.into()))),
            }
        }
    }

    struct MiniAdapter;
    impl RowAdapter<MiniEntity> for MiniAdapter {
        type Output = MiniEntity;
        fn from_row(&self, row: &dyn RowView) -> RepoResult<MiniEntity> {
            Ok(MiniEntity {
                id: Some(i64::from_param(row.get("id")?)?),
            })
        }
    }

    #[test]
    fn row_adapter_from_row_works() {
        let ent = MiniAdapter.from_row(&MiniRow(7)).unwrap();
        assert_eq!(ent, MiniEntity { id: Some(7) });
    }

    // A one-row in-memory repository to exercise the default `load`.
    struct OneRowRepo(i64);
    impl Repository<MiniEntity> for OneRowRepo {
        type Loaded = MiniEntity;
        fn insert(&self, _entity: &MiniEntity) -> RepoResult<()> {
            Ok(())
        }
        fn find_by_id(&self, id: &i64) -> RepoResult<Option<MiniEntity>> {
            if *id == self.0 {
                Ok(Some(MiniEntity { id: Some(*id) }))
            } else {
                Ok(None)
            }
        }
    }

    #[test]
    fn default_load_reads_key_from_instance() {
        let repo = OneRowRepo(3);
        let found = repo.load(&MiniEntity { id: Some(3) }).unwrap();
        assert_eq!(found, Some(MiniEntity { id: Some(3) }));

        let absent = repo.load(&MiniEntity { id: Some(9) }).unwrap();
        assert_eq!(absent, None);

        let err = repo.load(&MiniEntity { id: None }).unwrap_err();
        assert!(matches!(err, RepoError::MissingKey));
    }
}
