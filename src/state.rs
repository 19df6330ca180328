//! Shared record of the artwork currently being served.
//!
//! The MQTT worker is the only writer; HTTP handlers read snapshots.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::models::TrackMetadata;

/// 1x1 white JPEG, served until the first match.
pub const PLACEHOLDER_JPEG: &[u8] = b"\xff\xd8\xff\xdb\x00C\x00\x08\x06\x06\x07\x06\x05\x08\x07\x07\x07\t\t\x08\n\x0c\x14\r\x0c\x0b\x0b\x0c\x19\x12\x13\x0f\x14\x1d\x1a\x1f\x1e\x1d\x1a\x1c\x1c !,'\x1c\x1c(7),01444\x1f'9=82<.342\xff\xc0\x00\x0b\x08\x00\x01\x00\x01\x01\x01\x11\x00\xff\xc4\x00\x14\x00\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\xff\xda\x00\x08\x01\x01\x00\x00?\x00\xd2\xff\xd9";

/// Metadata of the track whose artwork is on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedMeta {
    pub state: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Serialized as fractional seconds since the epoch.
    #[serde(serialize_with = "epoch_seconds")]
    pub updated: DateTime<Utc>,
}

fn epoch_seconds<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(to_epoch(time))
}

fn to_epoch(time: &DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub meta: Option<PublishedMeta>,
    pub last_update: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Seconds since the epoch of the last update, `0.0` before the first.
    pub fn last_update_epoch(&self) -> f64 {
        self.last_update
            .as_ref()
            .map(to_epoch)
            .unwrap_or(0.0)
    }

    pub fn etag(&self) -> String {
        self.last_update
            .map(|t| t.timestamp())
            .unwrap_or(0)
            .to_string()
    }
}

/// Owner of the artwork file and of the metadata describing it.
#[derive(Debug)]
pub struct ArtStore {
    path: PathBuf,
    snapshot: Mutex<Snapshot>,
}

impl ArtStore {
    /// Creates the directory for `path` and seeds it with a placeholder image
    /// when no artwork exists yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        if !path.exists() {
            write_atomic(&path, PLACEHOLDER_JPEG)?;
        }
        Ok(Self {
            path,
            snapshot: Mutex::new(Snapshot::default()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the artwork on disk and records `meta` as its source.
    pub fn publish(&self, meta: &TrackMetadata, image: &[u8]) -> Result<Snapshot> {
        write_atomic(&self.path, image)?;

        let now = Utc::now();
        let mut snapshot = self
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        snapshot.meta = Some(PublishedMeta {
            state: meta.playback_state(),
            title: meta.title.clone(),
            artist: meta.artist.clone(),
            album: meta.album.clone(),
            updated: now,
        });
        snapshot.last_update = Some(now);
        Ok(snapshot.clone())
    }
}

/// Writes through a sibling temp file and renames it into place so readers
/// never see a partial image.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, data).with_context(|| format!("cannot write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("cannot move artwork into {}", path.display()))?;
    Ok(())
}
