use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::debug;

use crate::error::{RetrievalError, RetrievalResult};
use crate::models::{ArtImage, CandidateRecord, EntityKind};
use crate::sources::CatalogSource;

const ITUNES_SEARCH_URL: &str = "https://itunes.apple.com/search";

const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15);

/// iTunes Search API client. No authentication required.
pub struct ItunesClient {
    client: reqwest::blocking::Client,
    search_url: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ItunesResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItunesResult {
    track_name: Option<String>,
    collection_name: Option<String>,
    artist_name: Option<String>,
    artwork_url_100: Option<String>,
    artwork_url_60: Option<String>,
}

impl ItunesClient {
    pub fn new() -> RetrievalResult<Self> {
        Self::with_search_url(ITUNES_SEARCH_URL)
    }

    pub fn with_search_url(search_url: impl Into<String>) -> RetrievalResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("albumart-bridge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            search_url: search_url.into(),
        })
    }

    fn convert_result(result: ItunesResult) -> CandidateRecord {
        CandidateRecord {
            track_name: result.track_name,
            collection_name: result.collection_name,
            artist_name: result.artist_name,
            artwork_url: result.artwork_url_100,
            artwork_url_small: result.artwork_url_60,
        }
    }
}

impl CatalogSource for ItunesClient {
    fn name(&self) -> &str {
        "iTunes"
    }

    fn search(
        &self,
        term: &str,
        entity: EntityKind,
        limit: usize,
    ) -> RetrievalResult<Vec<CandidateRecord>> {
        let limit = limit.to_string();
        let resp = self
            .client
            .get(&self.search_url)
            .query(&[("term", term), ("entity", entity.as_str()), ("limit", limit.as_str())])
            .timeout(SEARCH_TIMEOUT)
            .send()?;

        if !resp.status().is_success() {
            return Err(RetrievalError::Status {
                url: resp.url().to_string(),
                status: resp.status().as_u16(),
            });
        }

        let body: SearchResponse = resp.json()?;
        debug!(term, %entity, count = body.results.len(), "catalog search");

        Ok(body
            .results
            .into_iter()
            .map(Self::convert_result)
            .collect())
    }

    fn fetch_bytes(&self, url: &str) -> RetrievalResult<ArtImage> {
        let resp = self.client.get(url).timeout(DOWNLOAD_TIMEOUT).send()?;

        if !resp.status().is_success() {
            return Err(RetrievalError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let data = resp.bytes()?.to_vec();

        Ok(ArtImage { data, content_type })
    }
}
