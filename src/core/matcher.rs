//! Picks the catalog entry whose artwork best fits a now-playing track.
//!
//! Queries are built from whichever of artist/title/album are present and run
//! in priority order. Every returned candidate is scored with a weight profile
//! chosen by the query kind, filtered by per-field ratio thresholds, and the
//! single highest score seen across all queries wins.

use tracing::{debug, info, warn};

use crate::config::MatchingConfig;
use crate::core::artwork::upgrade_artwork_url;
use crate::core::normalize::normalize;
use crate::core::similarity::ratio;
use crate::error::RetrievalError;
use crate::models::{ArtImage, CandidateRecord, EntityKind, QueryKind, ScoredCandidate, SearchQuery};
use crate::sources::CatalogSource;

/// Normalized query fields shared by every query of one matching attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub artist: String,
    pub title: String,
    pub album: String,
}

impl NormalizedQuery {
    pub fn new(artist: Option<&str>, title: Option<&str>, album: Option<&str>) -> Self {
        Self {
            artist: normalize(artist),
            title: normalize(title),
            album: normalize(album),
        }
    }
}

/// Builds the ordered query list.
///
/// There are two album-only branches: an early one when there is no artist
/// and albums are preferred, and a late one otherwise. Their conditions are
/// disjoint, so each call issues at most one album-only query.
pub fn build_queries(q: &NormalizedQuery, prefer_album_when_no_artist: bool) -> Vec<SearchQuery> {
    let has_artist = !q.artist.is_empty();
    let has_title = !q.title.is_empty();
    let has_album = !q.album.is_empty();

    let mut queries = Vec::new();
    if has_artist && has_title {
        queries.push(SearchQuery::new(
            format!("{} {}", q.artist, q.title),
            EntityKind::Song,
            QueryKind::ArtistTitle,
        ));
    }
    if has_artist && has_album {
        queries.push(SearchQuery::new(
            format!("{} {}", q.artist, q.album),
            EntityKind::Album,
            QueryKind::ArtistAlbum,
        ));
    }
    if !has_artist && has_album && prefer_album_when_no_artist {
        queries.push(SearchQuery::new(&q.album, EntityKind::Album, QueryKind::AlbumOnly));
    }
    if has_title {
        queries.push(SearchQuery::new(&q.title, EntityKind::Song, QueryKind::TitleOnly));
    }
    if has_album && (has_artist || !prefer_album_when_no_artist) {
        queries.push(SearchQuery::new(&q.album, EntityKind::Album, QueryKind::AlbumOnly));
    }
    queries
}

/// Per-field similarity of one candidate against the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRatios {
    pub title: f64,
    pub album: f64,
    pub artist: f64,
}

impl FieldRatios {
    pub fn weighted(&self, kind: QueryKind) -> f64 {
        match kind {
            QueryKind::ArtistTitle => 0.6 * self.title + 0.3 * self.artist + 0.1 * self.album,
            QueryKind::ArtistAlbum => 0.6 * self.album + 0.3 * self.artist + 0.1 * self.title,
            QueryKind::TitleOnly => 0.8 * self.title + 0.2 * self.album,
            QueryKind::AlbumOnly => 0.8 * self.album + 0.2 * self.title,
        }
    }
}

/// Matches track metadata to catalog artwork through a [`CatalogSource`].
///
/// Holds no state between calls; each [`Matcher::find_art`] keeps its own
/// running best.
pub struct Matcher<S> {
    source: S,
    config: MatchingConfig,
}

impl<S: CatalogSource> Matcher<S> {
    pub fn new(source: S, config: MatchingConfig) -> Self {
        Self { source, config }
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Scores `candidate` for a query of `kind`. `None` when the candidate is
    /// excluded by the artist constraint or a ratio threshold.
    pub fn score_candidate(
        &self,
        query: &NormalizedQuery,
        kind: QueryKind,
        candidate: &CandidateRecord,
    ) -> Option<f64> {
        let cand_title = normalize(candidate.scoring_title());
        let cand_album = normalize(candidate.collection_name.as_deref());
        let cand_artist = normalize(candidate.artist_name.as_deref());

        if self.config.require_artist_match
            && !query.artist.is_empty()
            && !cand_artist.is_empty()
            && !query.artist.contains(&cand_artist)
            && !cand_artist.contains(&query.artist)
        {
            debug!(candidate = %cand_artist, wanted = %query.artist, "artist mismatch, skipped");
            return None;
        }

        let ratios = FieldRatios {
            title: ratio(&query.title, &cand_title),
            album: ratio(&query.album, &cand_album),
            artist: ratio(&query.artist, &cand_artist),
        };
        let score = ratios.weighted(kind);

        if !query.title.is_empty()
            && ratios.title < self.config.min_title_ratio
            && kind != QueryKind::AlbumOnly
        {
            return None;
        }
        if !query.album.is_empty()
            && ratios.album < self.config.min_album_ratio
            && kind != QueryKind::TitleOnly
        {
            return None;
        }

        Some(score)
    }

    /// Runs every query in order and returns the highest scoring surviving
    /// candidate. Ties keep the candidate seen first.
    pub fn best_candidate(
        &self,
        artist: Option<&str>,
        title: Option<&str>,
        album: Option<&str>,
    ) -> Option<ScoredCandidate> {
        let query = NormalizedQuery::new(artist, title, album);
        let mut best: Option<ScoredCandidate> = None;

        for search in build_queries(&query, self.config.prefer_album_when_no_artist) {
            let results = match self.source.search(
                &search.term,
                search.entity,
                self.config.max_results_per_query,
            ) {
                Ok(results) => results,
                Err(e) => {
                    warn!("{} lookup failed for '{}': {}", self.source.name(), search.term, e);
                    Vec::new()
                }
            };

            for candidate in results {
                let Some(score) = self.score_candidate(&query, search.kind, &candidate) else {
                    continue;
                };
                debug!(
                    kind = %search.kind,
                    score,
                    title = candidate.scoring_title().unwrap_or_default(),
                    "candidate accepted"
                );
                if best.as_ref().map_or(true, |b| score > b.score) {
                    best = Some(ScoredCandidate { score, candidate });
                }
            }
        }

        best
    }

    /// Finds and downloads artwork for the given track. `None` means no
    /// candidate passed, or its artwork could not be fetched as an image.
    pub fn find_art(
        &self,
        artist: Option<&str>,
        title: Option<&str>,
        album: Option<&str>,
    ) -> Option<ArtImage> {
        let best = self.best_candidate(artist, title, album)?;

        match self.fetch_artwork(&best.candidate) {
            Ok(image) => {
                info!(
                    score = best.score,
                    artist = best.candidate.artist_name.as_deref().unwrap_or_default(),
                    title = best.candidate.scoring_title().unwrap_or_default(),
                    "artwork matched"
                );
                Some(image)
            }
            Err(e) => {
                warn!("Failed to download art: {}", e);
                None
            }
        }
    }

    /// Downloads the upgraded-resolution artwork of `candidate`, accepting
    /// only non-empty image responses.
    pub fn fetch_artwork(&self, candidate: &CandidateRecord) -> Result<ArtImage, RetrievalError> {
        let url = candidate
            .best_artwork_url()
            .ok_or(RetrievalError::MissingArtwork)?;
        let url = upgrade_artwork_url(url, self.config.artwork_size);

        let image = self.source.fetch_bytes(&url)?;
        if image.data.is_empty() || !image.is_image() {
            return Err(RetrievalError::NotImage {
                url,
                content_type: image.content_type,
            });
        }
        Ok(image)
    }
}
