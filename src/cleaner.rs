// 🧽 Value Cleaner
// Strips control, invisible-space and pictograph characters from field values

use once_cell::sync::Lazy;
use regex::Regex;

/// ASCII/Latin-1 control characters, general-punctuation spaces and the
/// ideographic space
static CONTROL_AND_SPACES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x00-\x1F\x7F-\xA0\x{2000}-\x{206F}\x{3000}]").expect("valid control regex")
});

/// Private-use area plus the emoji/pictograph planes
static SYMBOLS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x{E000}-\x{F8FF}\x{1F000}-\x{1F7FF}\x{1F900}-\x{1F9FF}\x{1FA70}-\x{1FAFF}]")
        .expect("valid symbol regex")
});

/// Clean a field value
///
/// Two removal passes (controls/spaces, then symbols) followed by a trim.
/// Idempotent: cleaning a clean string returns it unchanged.
pub fn clean_value(value: &str) -> String {
    let pass1 = CONTROL_AND_SPACES.replace_all(value, "");
    let pass2 = SYMBOLS.replace_all(&pass1, "");
    pass2.trim().to_string()
}

/// Clean a link value
///
/// Like `clean_value`, then drops all remaining whitespace; a URL folded
/// across lines keeps the fold space, which would otherwise break it.
pub fn clean_link(value: &str) -> String {
    clean_value(value).split_whitespace().collect()
}

/// Clean a possibly-absent value; absent yields an empty string
pub fn clean_optional(value: Option<&str>) -> String {
    value.map(clean_value).unwrap_or_default()
}
