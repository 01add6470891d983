//! The catalog seam: everything the resolver and media downloader need
//! from the remote metadata service.

use std::fmt;
use std::future::Future;

use crate::error::ScrapeError;
use crate::types::GameInfo;

/// One catalog identity query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogQuery {
    /// Content hash of the ROM file (lowercase hex SHA-1)
    Hash { sha1: String },
    /// Display name plus the catalog's numeric system id
    Name { name: String, system_id: String },
}

impl CatalogQuery {
    pub fn hash(sha1: impl Into<String>) -> Self {
        CatalogQuery::Hash { sha1: sha1.into() }
    }

    pub fn name(name: impl Into<String>, system_id: impl Into<String>) -> Self {
        CatalogQuery::Name {
            name: name.into(),
            system_id: system_id.into(),
        }
    }
}

impl fmt::Display for CatalogQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogQuery::Hash { sha1 } => write!(f, "sha1 {}", sha1),
            CatalogQuery::Name { name, system_id } => {
                write!(f, "'{}' (system {})", name, system_id)
            }
        }
    }
}

/// A remote game catalog.
///
/// `lookup` returns `Ok(None)` when the catalog has no entry; transport
/// and parse failures are errors the resolver treats as a failed stage.
pub trait Catalog: Send + Sync {
    fn lookup(
        &self,
        query: &CatalogQuery,
    ) -> impl Future<Output = Result<Option<GameInfo>, ScrapeError>> + Send;

    /// Fetch a media file's bytes.
    fn download(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ScrapeError>> + Send;
}
