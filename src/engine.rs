//! The crawl engine seam.
//!
//! An engine navigates to a URL inside a named session and reports the
//! extracted content as a JSON text payload. [`HttpEngine`] is a plain HTTP
//! engine: one cookie-keeping client per session and CSS-schema extraction.

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    error::EngineError,
    extract::CompiledSchema,
    profile::{ExtractionSchema, SiteProfile},
};

/// Per-request engine settings, built once from the site profile.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub session_id: String,
    pub content_selector: String,
    pub schema: ExtractionSchema,
}

impl From<&SiteProfile> for ExtractionConfig {
    fn from(profile: &SiteProfile) -> Self {
        Self {
            session_id: profile.session_id.clone(),
            content_selector: profile.content_selector.clone(),
            schema: profile.schema.clone(),
        }
    }
}

/// What an engine reports for one crawl call.
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    pub success: bool,
    pub status_code: Option<u16>,
    pub extracted_content: Option<String>,
    pub error_message: Option<String>,
}

impl CrawlOutcome {
    pub fn extracted(status_code: u16, content: String) -> Self {
        Self {
            success: true,
            status_code: Some(status_code),
            extracted_content: Some(content),
            error_message: None,
        }
    }

    pub fn failed(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code,
            extracted_content: None,
            error_message: Some(message.into()),
        }
    }
}

#[async_trait]
pub trait CrawlEngine: Send + Sync {
    async fn open_session(&self, session_id: &str) -> Result<(), EngineError>;
    async fn crawl(&self, url: &str, config: &ExtractionConfig) -> CrawlOutcome;
    async fn close_session(&self, session_id: &str);
}

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct HttpEngineOptions {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpEngineOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Client and compiled schema of one open session. The schema is compiled
/// on the first crawl and reused for the rest of the session.
struct Session {
    client: reqwest::Client,
    schema: Option<Arc<CompiledSchema>>,
}

#[derive(Default)]
pub struct HttpEngine {
    options: HttpEngineOptions,
    sessions: Mutex<HashMap<String, Session>>,
}

impl HttpEngine {
    pub fn new(options: HttpEngineOptions) -> Self {
        Self {
            options,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.options.timeout)
            .user_agent(self.options.user_agent.as_str())
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
    }

    fn session(
        &self,
        config: &ExtractionConfig,
    ) -> Result<(reqwest::Client, Arc<CompiledSchema>), String> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| EngineError::SessionsPoisoned.to_string())?;
        let session = match sessions.entry(config.session_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                tracing::warn!(
                    session_id = config.session_id,
                    "engine: session was not opened, opening now"
                );
                let client = self.build_client().map_err(|err| err.to_string())?;
                entry.insert(Session {
                    client,
                    schema: None,
                })
            }
        };
        let schema = match &session.schema {
            Some(schema) => Arc::clone(schema),
            None => {
                let schema = CompiledSchema::compile(&config.content_selector, &config.schema)
                    .map_err(|err| err.to_string())?;
                let schema = Arc::new(schema);
                session.schema = Some(Arc::clone(&schema));
                schema
            }
        };
        Ok((session.client.clone(), schema))
    }
}

#[async_trait]
impl CrawlEngine for HttpEngine {
    async fn open_session(&self, session_id: &str) -> Result<(), EngineError> {
        let client = self.build_client()?;
        self.sessions
            .lock()
            .map_err(|_| EngineError::SessionsPoisoned)?
            .insert(
                session_id.to_string(),
                Session {
                    client,
                    schema: None,
                },
            );
        tracing::debug!(session_id, "engine: session opened");
        Ok(())
    }

    async fn crawl(&self, url: &str, config: &ExtractionConfig) -> CrawlOutcome {
        let (client, schema) = match self.session(config) {
            Ok(session) => session,
            Err(message) => return CrawlOutcome::failed(None, message),
        };

        let response = match client.get(url).send().await {
            Ok(response) => response,
            Err(err) => return CrawlOutcome::failed(None, format!("request failed: {err}")),
        };
        let status = response.status();
        if !status.is_success() {
            return CrawlOutcome::failed(Some(status.as_u16()), format!("http status {status}"));
        }
        let html = match response.text().await {
            Ok(html) => html,
            Err(err) => {
                return CrawlOutcome::failed(Some(status.as_u16()), format!("body read failed: {err}"))
            }
        };

        match serde_json::to_string(&schema.extract(&html)) {
            Ok(payload) => CrawlOutcome::extracted(status.as_u16(), payload),
            Err(err) => CrawlOutcome {
                success: true,
                status_code: Some(status.as_u16()),
                extracted_content: None,
                error_message: Some(err.to_string()),
            },
        }
    }

    async fn close_session(&self, session_id: &str) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.remove(session_id);
        }
        tracing::debug!(session_id, "engine: session closed");
    }
}
