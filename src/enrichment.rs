// 🔎 Enrichment Fetcher
// Scrapes class-marked text from each record's linked page
//
// Deliberately narrow: first match of an open tag whose class attribute
// contains the marker, then the text up to the next `<`. Not an HTML parser.

use crate::cleaner::clean_link;
use crate::config::KeyMap;
use crate::fetch::{fetch_success, Fetcher};
use crate::notify::RunLog;
use crate::record::{Record, RecordSet};
use regex::Regex;

// ============================================================================
// CLASS MARKER EXTRACTION
// ============================================================================

/// Matcher for one `output field → class marker` pair
#[derive(Debug, Clone)]
pub struct ClassExtractor {
    pub field: String,
    pub marker: String,
    pattern: Regex,
}

impl ClassExtractor {
    pub fn new(field: &str, marker: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r#"(?i)<[^>]*\bclass\s*=\s*["'][^"']*{}[^"']*["'][^>]*>([^<]*)"#,
            regex::escape(marker)
        ))?;

        Ok(ClassExtractor {
            field: field.to_string(),
            marker: marker.to_string(),
            pattern,
        })
    }

    /// Trimmed text of the first matching element, if any
    pub fn extract(&self, document: &str) -> Option<String> {
        self.pattern
            .captures(document)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    }
}

/// Build extractors for every configured pair
pub fn build_extractors(config: &KeyMap, log: &mut RunLog) -> Vec<ClassExtractor> {
    config
        .iter()
        .filter_map(|(field, marker)| match ClassExtractor::new(field, marker) {
            Ok(extractor) => Some(extractor),
            Err(e) => {
                log.failure(format!("Skipping enrichment field {}: {}", field, e));
                None
            }
        })
        .collect()
}

// ============================================================================
// PER-RECORD ENRICHMENT
// ============================================================================

/// Enrich one record in place
///
/// Fetch failure (network or non-2xx) sets every configured field to "".
/// Records without a usable link are left untouched.
pub fn enrich_record(
    record: &mut Record,
    link_field: &str,
    extractors: &[ClassExtractor],
    fetcher: &dyn Fetcher,
    log: &mut RunLog,
) {
    let link = match record.get(link_field) {
        Some(raw) => clean_link(raw),
        None => return,
    };
    if link.is_empty() {
        return;
    }

    match fetch_success(fetcher, &link) {
        Ok(document) => {
            for extractor in extractors {
                let value = extractor.extract(&document).unwrap_or_else(|| {
                    log.note(format!(
                        "No element with class '{}' at {}",
                        extractor.marker, link
                    ));
                    String::new()
                });
                record.insert(extractor.field.as_str(), value);
            }
        }
        Err(e) => {
            log.failure(format!("Enrichment skipped: {}", e));
            for extractor in extractors {
                record.insert(extractor.field.as_str(), "");
            }
        }
    }
}

/// Enrich every record, sequentially and independently
pub fn enrich(
    records: RecordSet,
    config: &KeyMap,
    link_field: &str,
    fetcher: &dyn Fetcher,
    log: &mut RunLog,
) -> RecordSet {
    let extractors = build_extractors(config, log);

    records
        .into_iter()
        .map(|mut record| {
            enrich_record(&mut record, link_field, &extractors, fetcher, log);
            record
        })
        .collect()
}
