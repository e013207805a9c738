use wildmatch::WildMatch;

/// Configured set of Wi-Fi network names.
///
/// Entries are matched with `*`/`?` wildcards; a plain name only matches
/// itself.
#[derive(Debug, Clone, Default)]
pub struct SsidList {
    patterns: Vec<String>,
}

impl SsidList {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check if an SSID is a member of the list
    pub fn contains(&self, ssid: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| WildMatch::new(pattern).matches(ssid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssid_matching() {
        // Empty list matches nothing
        let list = SsidList::new(vec![]);
        assert!(!list.contains("Tech"));

        // Exact names
        let list = SsidList::new(vec!["Tech".to_string(), "MyWifi".to_string()]);
        assert!(list.contains("Tech"));
        assert!(list.contains("MyWifi"));
        assert!(!list.contains("tech"));
        assert!(!list.contains("Tech-5G"));

        // Wildcards
        let list = SsidList::new(vec!["Home-*".to_string()]);
        assert!(list.contains("Home-5G"));
        assert!(!list.contains("Office"));
    }
}
