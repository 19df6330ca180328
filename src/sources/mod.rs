pub mod itunes;

use crate::error::RetrievalResult;
use crate::models::{ArtImage, CandidateRecord, EntityKind};

/// External music catalog used to find artwork.
///
/// Both operations are blocking and bounded by the implementation's own
/// timeouts. Callers treat every error as "this step produced nothing".
pub trait CatalogSource {
    fn name(&self) -> &str;
    /// Searches the catalog for `term`, restricted to `entity`, returning at
    /// most `limit` records.
    fn search(
        &self,
        term: &str,
        entity: EntityKind,
        limit: usize,
    ) -> RetrievalResult<Vec<CandidateRecord>>;
    /// Downloads the resource at `url` with its declared content type.
    fn fetch_bytes(&self, url: &str) -> RetrievalResult<ArtImage>;
}
