//! Field metadata grammar: `column:<name>;default:<value>;comment:<text>;skip;serializer:<name>`.

use std::collections::BTreeMap;

/// Separator between `key[:value]` pairs.
pub const PAIR_SEPARATOR: char = ';';
/// Separator between a key and its value.
pub const VALUE_SEPARATOR: char = ':';

/// Parse a tag into `key -> value`; bare keys map to `None`.
///
/// Keys are trimmed and lower-cased, values are trimmed and keep any further `:`.
/// Empty segments are ignored, and a repeated key keeps its last value.
pub fn parse_tag(tag: &str) -> BTreeMap<String, Option<String>> {
    let mut settings = BTreeMap::new();
    for pair in tag.split(PAIR_SEPARATOR) {
        let (key, value) = match pair.split_once(VALUE_SEPARATOR) {
            Some((k, v)) => (k, Some(v.trim().to_string())),
            None => (pair, None),
        };
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        settings.insert(key, value);
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_flags_and_case() {
        let s = parse_tag(" Column:user_name ; default:0;SKIP;;comment:a:b");
        assert_eq!(s.get("column"), Some(&Some("user_name".to_string())));
        assert_eq!(s.get("default"), Some(&Some("0".to_string())));
        assert_eq!(s.get("skip"), Some(&None));
        assert_eq!(s.get("comment"), Some(&Some("a:b".to_string())));
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn empty_tag_has_no_settings() {
        assert!(parse_tag("").is_empty());
        assert!(parse_tag(" ; ;").is_empty());
    }
}
