use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Now-playing metadata as published on the player topic. Fields that are
/// missing, `null`, or not strings decode as `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrackMetadata {
    #[serde(default, deserialize_with = "string_or_none")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub album: Option<String>,
}

fn string_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

impl TrackMetadata {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("?")
    }

    pub fn display_artist(&self) -> &str {
        self.artist.as_deref().unwrap_or("?")
    }

    pub fn display_album(&self) -> &str {
        self.album.as_deref().unwrap_or("?")
    }

    /// Lowercased playback state, empty when absent.
    pub fn playback_state(&self) -> String {
        self.state.as_deref().unwrap_or_default().to_lowercase()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} - {} ({})",
            self.display_artist(),
            self.display_title(),
            self.display_album()
        )
    }
}

/// One result row from the catalog search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateRecord {
    pub track_name: Option<String>,
    pub collection_name: Option<String>,
    pub artist_name: Option<String>,
    /// Higher resolution thumbnail (`artworkUrl100`).
    pub artwork_url: Option<String>,
    /// Lower resolution thumbnail (`artworkUrl60`).
    pub artwork_url_small: Option<String>,
}

impl CandidateRecord {
    /// Title used for scoring: the track name, or the collection name for
    /// album-entity results that carry no track.
    pub fn scoring_title(&self) -> Option<&str> {
        self.track_name
            .as_deref()
            .or(self.collection_name.as_deref())
    }

    pub fn best_artwork_url(&self) -> Option<&str> {
        [&self.artwork_url, &self.artwork_url_small]
            .into_iter()
            .filter_map(|u| u.as_deref())
            .find(|u| !u.is_empty())
    }
}

/// Catalog entity filter for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Song,
    Album,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Song => "song",
            EntityKind::Album => "album",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which metadata fields seeded a query. Selects the scoring weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    ArtistTitle,
    ArtistAlbum,
    AlbumOnly,
    TitleOnly,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::ArtistTitle => "artist_title",
            QueryKind::ArtistAlbum => "artist_album",
            QueryKind::AlbumOnly => "album_only",
            QueryKind::TitleOnly => "title_only",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    pub entity: EntityKind,
    pub kind: QueryKind,
}

impl SearchQuery {
    pub fn new(term: impl Into<String>, entity: EntityKind, kind: QueryKind) -> Self {
        Self {
            term: term.into(),
            entity,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub score: f64,
    pub candidate: CandidateRecord,
}

/// Downloaded image body together with its declared content type.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtImage {
    pub data: Vec<u8>,
    pub content_type: String,
}

impl ArtImage {
    pub fn is_image(&self) -> bool {
        self.content_type
            .trim_start()
            .to_ascii_lowercase()
            .starts_with("image/")
    }
}
