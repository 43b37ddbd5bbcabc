use std::rc::Rc;
use tablemap_core::{Persistable, RemoteFetch, RepoResult};
use tablemap_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
struct Asset {
    #[fetch(id)]
    id: String,
    name: String,
    #[fetch(lazy)]
    payload: Vec<u8>,
}

struct NoFetch;
impl RemoteFetch for NoFetch {
    fn fetch(&self, _locator: &str) -> RepoResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

fn main() {
    assert!(Asset::FIELDS.iter().any(|f| f.is_lazy));
    assert_eq!(Asset::FIELDS[2].sql_type, "BLOB");

    // A lazy type's adapter is constructed with the fetch collaborator.
    let _adapter = AssetRowAdapter::new(Rc::new(NoFetch));
}
