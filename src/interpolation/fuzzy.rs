//! Case and dash insensitive key matching
//!
//! `Output-Dir`, `output_dir` and `OUTPUT_DIR` all name the same key.

use indexmap::IndexMap;

/// Canonical form of a key: lowercase with dashes folded to underscores
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c == '-' { '_' } else { c })
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn keys_match(a: &str, b: &str) -> bool {
    normalize_key(a) == normalize_key(b)
}

/// Look up `key` in `map`, preferring an exact match
pub fn fuzzy_get<'a, V>(map: &'a IndexMap<String, V>, key: &str) -> Option<&'a V> {
    if let Some(value) = map.get(key) {
        return Some(value);
    }
    map.iter()
        .find(|(candidate, _)| keys_match(candidate, key))
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Output-Dir"), "output_dir");
        assert_eq!(normalize_key("OUTPUT_DIR"), "output_dir");
        assert_eq!(normalize_key("plain"), "plain");
    }

    #[test]
    fn test_keys_match() {
        assert!(keys_match("split-files", "SPLIT_FILES"));
        assert!(!keys_match("split", "splits"));
    }

    #[test]
    fn test_fuzzy_get_prefers_exact_key() {
        let mut map = IndexMap::new();
        map.insert("output".to_string(), 1);
        map.insert("OUTPUT".to_string(), 2);

        assert_eq!(fuzzy_get(&map, "OUTPUT"), Some(&2));
        assert_eq!(fuzzy_get(&map, "Output"), Some(&1));
        assert_eq!(fuzzy_get(&map, "missing"), None);
    }
}
