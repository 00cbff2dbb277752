// ICS Feed - Core Library
// Calendar document → enriched, renamed JSON record list behind a cache

pub mod cache;
pub mod cleaner;
pub mod config;
pub mod db;
pub mod enrichment;
pub mod error;
pub mod fetch;
pub mod notify;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod transform;

// Re-export commonly used types
pub use cache::{Cache, MemoryCache, CACHE_KEY};
pub use cleaner::{clean_link, clean_optional, clean_value};
pub use config::{FeedConfig, KeyMap, MemoryPropertyStore, PropertyStore};
pub use db::{setup_database, SqliteCache, SqlitePropertyStore};
pub use enrichment::{enrich, ClassExtractor};
pub use error::{FeedError, FeedResult};
pub use fetch::{FetchResponse, Fetcher, HttpFetcher, StaticFetcher};
pub use notify::{MemoryNotifier, Notifier, RunLog, TracingNotifier};
pub use parser::{parse_document, unfold_lines, DocumentParser, IcsParser};
pub use pipeline::{FeedResponse, FeedService, ResponseSource, JSON_CONTENT_TYPE};
pub use record::{Record, RecordSet};
pub use transform::{apply_aliases, apply_renames};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
