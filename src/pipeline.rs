use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::core::matcher::Matcher;
use crate::models::TrackMetadata;
use crate::sources::CatalogSource;
use crate::state::ArtStore;

/// Playback states for which artwork is looked up.
const ACTIVE_STATES: [&str; 2] = ["playing", "paused"];

/// Turns now-playing updates into artwork on disk.
pub struct ArtUpdater<S> {
    matcher: Matcher<S>,
    store: Arc<ArtStore>,
}

impl<S: CatalogSource> ArtUpdater<S> {
    pub fn new(matcher: Matcher<S>, store: Arc<ArtStore>) -> Self {
        Self { matcher, store }
    }

    /// Looks up and stores artwork for `meta`. Returns `true` when the served
    /// image changed. Inactive playback and failed lookups keep the current
    /// image.
    pub fn update_from_meta(&self, meta: &TrackMetadata) -> Result<bool> {
        let state = meta.playback_state();
        if !ACTIVE_STATES.contains(&state.as_str()) {
            info!("State is '{}' (not playing/paused); keeping existing art.", state);
            return Ok(false);
        }

        let Some(image) = self.matcher.find_art(
            meta.artist.as_deref(),
            meta.title.as_deref(),
            meta.album.as_deref(),
        ) else {
            info!("No art found for {}", meta.summary());
            return Ok(false);
        };

        self.store.publish(meta, &image.data)?;
        info!("Updated album art: {}", meta.summary());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::config::MatchingConfig;
    use crate::error::RetrievalResult;
    use crate::models::{ArtImage, CandidateRecord, EntityKind};

    struct OneHitCatalog {
        searches: Cell<usize>,
    }

    impl CatalogSource for OneHitCatalog {
        fn name(&self) -> &str {
            "one-hit"
        }

        fn search(
            &self,
            _term: &str,
            _entity: EntityKind,
            _limit: usize,
        ) -> RetrievalResult<Vec<CandidateRecord>> {
            self.searches.set(self.searches.get() + 1);
            Ok(vec![CandidateRecord {
                track_name: Some("Absence Of You".to_string()),
                collection_name: Some("Absence Of You - Single".to_string()),
                artist_name: Some("PALESKIN".to_string()),
                artwork_url: Some("https://img/100x100bb.jpg".to_string()),
                artwork_url_small: None,
            }])
        }

        fn fetch_bytes(&self, _url: &str) -> RetrievalResult<ArtImage> {
            Ok(ArtImage {
                data: b"\xff\xd8art".to_vec(),
                content_type: "image/jpeg".to_string(),
            })
        }
    }

    fn updater(dir: &tempfile::TempDir) -> ArtUpdater<OneHitCatalog> {
        let store = Arc::new(ArtStore::open(dir.path().join("albumart.jpg")).unwrap());
        let catalog = OneHitCatalog {
            searches: Cell::new(0),
        };
        ArtUpdater::new(Matcher::new(catalog, MatchingConfig::default()), store)
    }

    fn meta(state: &str) -> TrackMetadata {
        TrackMetadata {
            state: Some(state.to_string()),
            title: Some("Absence Of You".to_string()),
            artist: Some("PALESKIN".to_string()),
            album: None,
        }
    }

    #[test]
    fn test_inactive_state_keeps_art() {
        let dir = tempfile::tempdir().unwrap();
        let updater = updater(&dir);

        assert!(!updater.update_from_meta(&meta("idle")).unwrap());
        assert!(!updater.update_from_meta(&TrackMetadata::default()).unwrap());
        assert_eq!(updater.matcher.source().searches.get(), 0);
        assert!(updater.store.snapshot().meta.is_none());
    }

    #[test]
    fn test_playing_updates_art() {
        let dir = tempfile::tempdir().unwrap();
        let updater = updater(&dir);

        assert!(updater.update_from_meta(&meta("PLAYING")).unwrap());
        assert_eq!(
            std::fs::read(dir.path().join("albumart.jpg")).unwrap(),
            b"\xff\xd8art"
        );
        let snap = updater.store.snapshot();
        assert_eq!(snap.meta.unwrap().title.as_deref(), Some("Absence Of You"));
    }

    #[test]
    fn test_paused_also_updates() {
        let dir = tempfile::tempdir().unwrap();
        let updater = updater(&dir);
        assert!(updater.update_from_meta(&meta("paused")).unwrap());
    }
}
