use async_trait::async_trait;

use crate::{
    engine::{CrawlEngine, ExtractionConfig},
    error::FetchError,
    record::{PageRequest, RawRecord},
};

/// Fetches one listing page and returns its extracted records.
///
/// An empty vector means the page had no products, which is not an error.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    fn name(&self) -> String;

    /// Opens the session shared by every fetch of the run.
    async fn acquire(&self) -> Result<(), FetchError> {
        Ok(())
    }

    async fn fetch(&self, request: &PageRequest) -> Result<Vec<RawRecord>, FetchError>;

    /// Closes the session. Called exactly once per run.
    async fn release(&self) {}
}

/// A [`PageFetcher`] backed by a [`CrawlEngine`].
pub struct EngineFetcher<E> {
    engine: E,
    config: ExtractionConfig,
}

impl<E: CrawlEngine> EngineFetcher<E> {
    pub fn new(engine: E, config: ExtractionConfig) -> Self {
        Self { engine, config }
    }
}

/// Decodes an engine payload: a JSON array of objects.
pub fn decode_payload(payload: &str) -> Result<Vec<RawRecord>, serde_json::Error> {
    serde_json::from_str(payload)
}

#[async_trait]
impl<E: CrawlEngine> PageFetcher for EngineFetcher<E> {
    fn name(&self) -> String {
        self.config.schema.name.clone()
    }

    async fn acquire(&self) -> Result<(), FetchError> {
        self.engine
            .open_session(&self.config.session_id)
            .await
            .map_err(|err| FetchError::EngineFailure {
                target: format!("session '{}'", self.config.session_id),
                reason: err.to_string(),
            })
    }

    async fn fetch(&self, request: &PageRequest) -> Result<Vec<RawRecord>, FetchError> {
        let url = &request.resolved_url;
        let outcome = self.engine.crawl(url, &self.config).await;
        if !outcome.success {
            let reason = outcome.error_message.unwrap_or_else(|| match outcome.status_code {
                Some(code) => format!("http status {code}"),
                None => "crawl reported failure".to_string(),
            });
            return Err(FetchError::EngineFailure {
                target: url.clone(),
                reason,
            });
        }

        let payload = outcome
            .extracted_content
            .ok_or_else(|| FetchError::MalformedPayload {
                target: url.clone(),
                reason: outcome
                    .error_message
                    .unwrap_or_else(|| "no extracted content".to_string()),
            })?;
        decode_payload(&payload).map_err(|err| FetchError::MalformedPayload {
            target: url.clone(),
            reason: err.to_string(),
        })
    }

    async fn release(&self) {
        self.engine.close_session(&self.config.session_id).await;
    }
}
