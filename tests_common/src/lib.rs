//! Shared test entities and collaborator doubles reusable across backends.

use std::cell::{Cell, RefCell};

use tablemap_core::{RemoteFetch, RepoError, RepoResult};
use tablemap_macros::Entity;

/// A plain entity with no lazy-remote fields: loads materialize it directly.
#[derive(Entity, Clone, Debug, PartialEq)]
pub struct User {
    #[fetch(id)]
    pub id: String,
    pub name: String,
    pub score: i64,
}

/// Key-only entity, for ordering tests with a single persistable field.
#[derive(Entity, Clone, Debug, PartialEq)]
pub struct Marker {
    #[fetch(id)]
    pub id: String,
}

/// An entity with one lazy-remote field: loads materialize its proxy.
#[derive(Entity, Clone, Debug, PartialEq)]
pub struct Document {
    #[fetch(id)]
    pub id: String,
    pub title: String,
    #[fetch(lazy)]
    pub content: Vec<u8>,
}

/// Like [`Document`] but with a nullable locator column.
#[derive(Entity, Clone, Debug, PartialEq)]
pub struct Attachment {
    #[fetch(id)]
    pub id: String,
    #[fetch(lazy)]
    pub data: Option<Vec<u8>>,
}

/// A fetch double that returns a scripted payload and counts invocations.
pub struct ScriptedFetcher {
    payload: Vec<u8>,
    calls: Cell<usize>,
    seen: RefCell<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            calls: Cell::new(0),
            seen: RefCell::new(Vec::new()),
        }
    }

    /// How many times `fetch` has been invoked.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// The locators fetched so far, in order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.borrow().clone()
    }
}

impl RemoteFetch for ScriptedFetcher {
    fn fetch(&self, locator: &str) -> RepoResult<Vec<u8>> {
        self.calls.set(self.calls.get() + 1);
        self.seen.borrow_mut().push(locator.to_string());
        Ok(self.payload.clone())
    }
}

/// A fetch double that always fails, for error-propagation tests.
pub struct FailingFetcher;

impl RemoteFetch for FailingFetcher {
    fn fetch(&self, locator: &str) -> RepoResult<Vec<u8>> {
        Err(RepoError::fetch(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("unreachable: {locator}"),
        )))
    }
}
