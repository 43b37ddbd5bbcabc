#![forbid(unsafe_code)]
//! Facade crate for the tablemap mapping engine.
//!
//! Pulls the pieces together under one roof: the core traits and error type,
//! the `#[derive(Entity)]` macro, and (behind features) the SQL builder, the
//! bundled SQLite backend, and a blocking HTTP fetcher for lazy-remote
//! fields.
//!
//! ```ignore
//! use tablemap::{Entity, Repository, SqliteDatabase};
//!
//! #[derive(Entity, Clone, Debug)]
//! struct User {
//!     #[fetch(id)]
//!     id: String,
//!     name: String,
//! }
//!
//! let db = SqliteDatabase::open_in_memory()?;
//! db.create_table::<User>()?;
//! let repo = db.repository::<User, _>(UserRowAdapter);
//! repo.insert(&User { id: "u1".into(), name: "Alice".into() })?;
//! let found = repo.find_by_id(&"u1".to_string())?;
//! ```

pub use tablemap_core::{
    FieldMeta, FromParam, Identifiable, Insertable, ParamValue, Persistable, RemoteFetch,
    RepoError, RepoResult, Repository, RowAdapter, RowView,
};
pub use tablemap_macros::Entity;

#[cfg(feature = "sql-builder")]
pub use tablemap_sql_builder as sql;

#[cfg(feature = "sqlite-backend")]
pub use tablemap_rusqlite::{SqliteDatabase, SqliteRepository};

#[cfg(feature = "http-fetch")]
pub mod fetch {
    //! Remote fetchers usable behind lazy-field proxies.

    use tablemap_core::{RemoteFetch, RepoError, RepoResult};

    /// Fetches lazy-field payloads over HTTP with a blocking client.
    ///
    /// The locator column is treated as a URL; non-2xx statuses are fetch
    /// errors, and the response body is returned verbatim.
    pub struct HttpFetcher {
        client: reqwest::blocking::Client,
    }

    impl HttpFetcher {
        pub fn new() -> Self {
            Self {
                client: reqwest::blocking::Client::new(),
            }
        }

        /// Use a preconfigured client (timeouts, proxies, headers).
        pub fn with_client(client: reqwest::blocking::Client) -> Self {
            Self { client }
        }
    }

    impl Default for HttpFetcher {
        fn default() -> Self {
            Self::new()
        }
    }

    impl RemoteFetch for HttpFetcher {
        fn fetch(&self, locator: &str) -> RepoResult<Vec<u8>> {
            let response = self
                .client
                .get(locator)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(RepoError::fetch)?;
            let body = response.bytes().map_err(RepoError::fetch)?;
            Ok(body.to_vec())
        }
    }
}
