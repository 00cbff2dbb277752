// 🔁 Pipeline Orchestrator
// clear-flag → cache → regenerate (fetch → parse → enrich → alias → rename → cache → notify)

use crate::cache::{Cache, CACHE_KEY};
use crate::cleaner::clean_link;
use crate::config::{FeedConfig, PropertyStore, CLEAR_CACHE};
use crate::enrichment::enrich;
use crate::error::{FeedError, FeedResult};
use crate::fetch::{fetch_success, Fetcher};
use crate::notify::{format_report, Notifier, RunLog, TracingNotifier};
use crate::parser::{DocumentParser, IcsParser};
use crate::record::RecordSet;
use crate::transform::{apply_aliases, apply_renames};
use std::sync::Arc;
use tracing::{info, warn};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Subject line of the regeneration report
pub const REPORT_SUBJECT: &str = "ics-feed regeneration log";

// ============================================================================
// RESPONSE
// ============================================================================

/// Where a response body came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Regenerated,
    Error,
}

/// FeedResponse - JSON body + content type, success or `{"error": ...}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedResponse {
    pub body: String,
    pub content_type: &'static str,
    pub source: ResponseSource,
}

impl FeedResponse {
    fn json(body: String, source: ResponseSource) -> Self {
        FeedResponse {
            body,
            content_type: JSON_CONTENT_TYPE,
            source,
        }
    }

    pub fn error(err: &FeedError) -> Self {
        let body = serde_json::json!({ "error": err.to_string() }).to_string();
        Self::json(body, ResponseSource::Error)
    }

    pub fn is_error(&self) -> bool {
        self.source == ResponseSource::Error
    }
}

// ============================================================================
// FEED SERVICE
// ============================================================================

/// FeedService - the single read-style entry point
///
/// Collaborators are injected; configuration is re-read from the property
/// store on every call and passed down as an immutable `FeedConfig`.
pub struct FeedService {
    properties: Arc<dyn PropertyStore>,
    cache: Arc<dyn Cache>,
    fetcher: Arc<dyn Fetcher>,
    notifier: Arc<dyn Notifier>,
    parser: Box<dyn DocumentParser>,
}

impl FeedService {
    pub fn new(
        properties: Arc<dyn PropertyStore>,
        cache: Arc<dyn Cache>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        FeedService {
            properties,
            cache,
            fetcher,
            notifier: Arc::new(TracingNotifier),
            parser: Box::new(IcsParser::new()),
        }
    }

    /// Builder: replace the notification sink
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn properties(&self) -> &dyn PropertyStore {
        &*self.properties
    }

    /// Serve the feed; never fails (errors become `{"error": ...}`)
    pub fn handle(&self) -> FeedResponse {
        let config = match self.load_config() {
            Ok(config) => config,
            Err(e) => {
                warn!("Configuration rejected: {}", e);
                return FeedResponse::error(&e);
            }
        };

        match self.serve(&config) {
            Ok(response) => response,
            Err(e) => {
                warn!("Regeneration failed: {}", e);
                FeedResponse::error(&e)
            }
        }
    }

    /// Raise the one-shot clear flag for the next call
    pub fn request_clear(&self) -> FeedResult<()> {
        self.properties.set(CLEAR_CACHE, "true")
    }

    /// Snapshot configuration; a missing source URL stops here
    pub fn load_config(&self) -> FeedResult<FeedConfig> {
        let config = FeedConfig::load(&*self.properties)?;
        config.require_url()?;
        Ok(config)
    }

    fn serve(&self, config: &FeedConfig) -> FeedResult<FeedResponse> {
        // CHECK_CLEAR_FLAG: consumed before regenerating, whatever the outcome
        let clear = self.properties.take_flag(CLEAR_CACHE).unwrap_or_else(|e| {
            warn!("Could not read {}: {}", CLEAR_CACHE, e);
            false
        });

        if clear {
            info!("Clear flag consumed; dropping cached feed");
            if let Err(e) = self.cache.remove(CACHE_KEY) {
                warn!("Cache clear failed: {}", e);
            }
        } else {
            // CHECK_CACHE
            match self.cache.get(CACHE_KEY) {
                Ok(Some(body)) => return Ok(FeedResponse::json(body, ResponseSource::Cache)),
                Ok(None) => {}
                Err(e) => warn!("Cache read failed, regenerating: {}", e),
            }
        }

        let body = self.regenerate(config)?;
        Ok(FeedResponse::json(body, ResponseSource::Regenerated))
    }

    /// REGENERATE: build the feed, write the cache, notify
    ///
    /// Only a source fetch failure (or missing URL) returns `Err`; the cache
    /// is never written in that case.
    pub fn regenerate(&self, config: &FeedConfig) -> FeedResult<String> {
        let mut log = RunLog::new(config.debug);

        let url = clean_link(config.require_url()?);
        log.note(format!("Fetching calendar from {}", url));
        let text = fetch_success(&*self.fetcher, &url)?;

        let records = self.build_records(&text, config, &mut log);
        let body = serde_json::to_string(&records)?;

        match self.cache.put(CACHE_KEY, &body, config.cache_timeout) {
            Ok(()) => log.note(format!(
                "Cached {} records for {} seconds",
                records.len(),
                config.cache_timeout.as_secs()
            )),
            Err(e) => log.failure(format!("Cache write failed: {}", e)),
        }

        if let Some(recipient) = &config.email_log {
            let report = format_report(records.len(), config.cache_timeout.as_secs(), &log);
            if let Err(e) = self.notifier.notify(recipient, REPORT_SUBJECT, &report) {
                warn!("Notification to {} failed: {}", recipient, e);
            }
        }

        info!("Regenerated feed with {} records", records.len());
        Ok(body)
    }

    /// parse → enrich → alias → rename
    pub fn build_records(&self, text: &str, config: &FeedConfig, log: &mut RunLog) -> RecordSet {
        let mut records = self.parser.parse(text);
        log.note(format!(
            "Parsed {} records (parser v{})",
            records.len(),
            self.parser.version()
        ));

        if !config.enrichment.is_empty() {
            records = enrich(
                records,
                &config.enrichment,
                self.parser.link_field(),
                &*self.fetcher,
                log,
            );
        }

        if !config.placeholders.is_empty() {
            records = apply_aliases(&records, &config.placeholders);
        }

        if !config.renames.is_empty() {
            records = apply_renames(&records, &config.renames);
        }

        records
    }
}
