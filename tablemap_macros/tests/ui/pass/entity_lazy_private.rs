use std::rc::Rc;
use tablemap_core::{RemoteFetch, RepoResult};

struct NoFetch;
impl RemoteFetch for NoFetch {
    fn fetch(&self, _locator: &str) -> RepoResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

mod media {
    use tablemap_macros::Entity;

    // Generated companions inherit this visibility, so the adapter and
    // proxy are usable from the parent module.
    #[derive(Entity, Clone, Debug, PartialEq)]
    pub(crate) struct Clip {
        #[fetch(id)]
        pub(crate) id: String,
        #[fetch(lazy)]
        pub(crate) frames: Vec<u8>,
    }

    // A fully module-private lazy entity must expand cleanly too: its
    // companions stay private alongside it.
    #[derive(Entity, Clone, Debug, PartialEq)]
    struct Draft {
        #[fetch(id)]
        id: String,
        #[fetch(lazy)]
        body: Option<Vec<u8>>,
    }

    pub(crate) fn draft_adapter(
        fetcher: ::std::rc::Rc<dyn ::tablemap_core::RemoteFetch>,
    ) {
        let _ = DraftRowAdapter::new(fetcher);
    }
}

fn main() {
    let _adapter = media::ClipRowAdapter::new(Rc::new(NoFetch));
    media::draft_adapter(Rc::new(NoFetch));
}
