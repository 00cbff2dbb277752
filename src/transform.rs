// 🔀 Post-Processors
// Key renames and placeholder (alias) fields, driven by config rules

use crate::config::KeyMap;
use crate::record::{Record, RecordSet};

// ============================================================================
// RENAME
// ============================================================================

/// Rename the fields of one record
///
/// Fields keep their original order. When two fields land on the same
/// name, the later value wins in the earlier position.
pub fn rename_record(record: &Record, renames: &KeyMap) -> Record {
    let mut renamed = Record::new();

    for (key, value) in record.iter() {
        let target = renames.get(key).unwrap_or(key);
        renamed.insert(target, value);
    }

    renamed
}

/// Rename every record (old name → new name)
pub fn apply_renames(records: &[Record], renames: &KeyMap) -> RecordSet {
    records
        .iter()
        .map(|record| rename_record(record, renames))
        .collect()
}

// ============================================================================
// ALIAS / PLACEHOLDER
// ============================================================================

/// Copy source fields into alias fields (new name → source name)
///
/// Additive: sources stay in place, missing sources are skipped, an
/// existing alias field is overwritten. Returns copies; inputs are untouched.
pub fn apply_aliases(records: &[Record], aliases: &KeyMap) -> RecordSet {
    records
        .iter()
        .map(|record| {
            let mut aliased = record.clone();
            for (new_key, source_key) in aliases.iter() {
                if let Some(value) = record.get(source_key) {
                    aliased.insert(new_key, value);
                }
            }
            aliased
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_rename_replaces_key() {
        let renames = KeyMap::parse("SUMMARY:title");
        let out = apply_renames(&[record(&[("SUMMARY", "A")])], &renames);

        assert_eq!(out[0].get("title"), Some("A"));
        assert!(!out[0].contains_key("SUMMARY"));
    }

    #[test]
    fn test_rename_preserves_field_order() {
        let renames = KeyMap::parse("URL:link,SUMMARY:title");
        let out = apply_renames(
            &[record(&[("SUMMARY", "A"), ("DTSTART", "1"), ("URL", "u")])],
            &renames,
        );

        assert_eq!(out[0].keys().collect::<Vec<_>>(), vec!["title", "DTSTART", "link"]);
    }

    #[test]
    fn test_rename_collision_later_wins() {
        let renames = KeyMap::parse("LOCATION:venue");
        let out = apply_renames(&[record(&[("venue", "old"), ("LOCATION", "new")])], &renames);

        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0].get("venue"), Some("new"));
    }

    #[test]
    fn test_rename_empty_config_is_identity() {
        let input = vec![record(&[("A", "1"), ("B", "2")])];
        assert_eq!(apply_renames(&input, &KeyMap::default()), input);
    }

    #[test]
    fn test_alias_is_additive() {
        let aliases = KeyMap::parse("description2:DESCRIPTION");
        let out = apply_aliases(&[record(&[("DESCRIPTION", "d")])], &aliases);

        assert_eq!(out[0].get("DESCRIPTION"), Some("d"));
        assert_eq!(out[0].get("description2"), Some("d"));
    }

    #[test]
    fn test_alias_missing_source_skipped() {
        let aliases = KeyMap::parse("image:X-IMAGE");
        let out = apply_aliases(&[record(&[("SUMMARY", "s")])], &aliases);

        assert!(!out[0].contains_key("image"));
        assert_eq!(out[0].len(), 1);
    }

    #[test]
    fn test_alias_does_not_mutate_input() {
        let input = vec![record(&[("SUMMARY", "s")])];
        let aliases = KeyMap::parse("title:SUMMARY");
        let _ = apply_aliases(&input, &aliases);

        assert_eq!(input[0].len(), 1);
    }

    #[test]
    fn test_alias_then_rename_uses_pre_rename_names() {
        let aliases = KeyMap::parse("teaser:DESCRIPTION");
        let renames = KeyMap::parse("DESCRIPTION:body");

        let aliased = apply_aliases(&[record(&[("DESCRIPTION", "d")])], &aliases);
        let out = apply_renames(&aliased, &renames);

        assert_eq!(out[0].get("body"), Some("d"));
        assert_eq!(out[0].get("teaser"), Some("d"));
        assert!(!out[0].contains_key("DESCRIPTION"));
    }
}
