//! Pattern matching of console answers.

use regex::bytes::Regex;

/// One occurrence of the expected pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchItem {
    /// The whole matched text.
    pub whole: Vec<u8>,

    /// Capture groups 1..n, `None` where a group did not participate.
    pub groups: Vec<Option<Vec<u8>>>,
}

impl MatchItem {
    /// The value a caller usually wants: the single capture group if the
    /// pattern has exactly one, otherwise the whole match.
    pub fn value(&self) -> &[u8] {
        match self.groups.as_slice() {
            [group] => group.as_deref().unwrap_or_default(),
            _ => &self.whole,
        }
    }
}

/// Every non-overlapping occurrence of a pattern, in order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSet {
    items: Vec<MatchItem>,
}

impl MatchSet {
    /// Build a match set, or `None` if there were no occurrences.
    pub fn from_items(items: Vec<MatchItem>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Self { items })
        }
    }

    /// First occurrence.
    pub fn first(&self) -> &MatchItem {
        &self.items[0]
    }

    /// Number of occurrences.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the occurrences.
    pub fn iter(&self) -> impl Iterator<Item = &MatchItem> {
        self.items.iter()
    }

    /// Values of every occurrence (see [`MatchItem::value`]), lossily decoded.
    pub fn values_lossy(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|m| String::from_utf8_lossy(m.value()).into_owned())
            .collect()
    }
}

/// Trait for answer matching - regex by default, extensible for custom parsers.
pub trait ResponseMatcher: Send + Sync {
    /// Collect every occurrence in `data`, or `None` if there is none.
    fn match_set(&self, data: &[u8]) -> Option<MatchSet>;

    /// Check if the data contains an occurrence.
    fn is_match(&self, data: &[u8]) -> bool {
        self.match_set(data).is_some()
    }
}

/// Regex-based answer matcher (the default implementation).
impl ResponseMatcher for Regex {
    fn match_set(&self, data: &[u8]) -> Option<MatchSet> {
        let items = self
            .captures_iter(data)
            .map(|caps| {
                let whole = caps.get(0).map(|m| m.as_bytes().to_vec()).unwrap_or_default();
                let groups = caps
                    .iter()
                    .skip(1)
                    .map(|g| g.map(|m| m.as_bytes().to_vec()))
                    .collect();
                MatchItem { whole, groups }
            })
            .collect();
        MatchSet::from_items(items)
    }

    fn is_match(&self, data: &[u8]) -> bool {
        Regex::is_match(self, data)
    }
}

/// Compile an expected-answer pattern.
///
/// Unlike prompt patterns, answers are searched anywhere in the
/// accumulated output, so no anchor is added.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_is_none() {
        let pattern = compile_pattern(r"PONG").unwrap();
        assert!(pattern.match_set(b"PIN").is_none());
        assert!(!ResponseMatcher::is_match(&pattern, b"PIN"));
    }

    #[test]
    fn test_whole_matches_without_groups() {
        let pattern = compile_pattern(r"uImage-\d+").unwrap();
        let set = pattern
            .match_set(b"uImage-1\r\nuImage-22\r\n=> ")
            .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.values_lossy(), vec!["uImage-1", "uImage-22"]);
    }

    #[test]
    fn test_single_group_value() {
        let pattern = compile_pattern(r"version (\d+\.\d+)").unwrap();
        let set = pattern.match_set(b"U-Boot version 2018.03 ready").unwrap();
        assert_eq!(set.first().value(), b"2018.03");
        assert_eq!(set.first().whole, b"version 2018.03");
    }

    #[test]
    fn test_multiple_groups_value_is_whole() {
        let pattern = compile_pattern(r"(\w+)=(\w+)?").unwrap();
        let set = pattern.match_set(b"bootdelay=").unwrap();
        assert_eq!(set.first().value(), b"bootdelay=");
        assert_eq!(set.first().groups, vec![Some(b"bootdelay".to_vec()), None]);
    }
}
