//! Glob matching for pattern-based invalidation.

use regex::Regex;

/// A compiled key glob where `*` matches any run of characters (including none).
///
/// Every other character matches itself. The same glob string is sent to the
/// distributed tier, whose native pattern syntax agrees with this one for keys
/// that contain no `?`, `[` or `\`.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    regex: Regex,
}

impl KeyPattern {
    pub fn new(glob: &str) -> Result<Self, regex::Error> {
        let body = glob
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("(?s)^{body}$"))?;

        Ok(Self { regex })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_wildcard() {
        let pattern = KeyPattern::new("stand:high-value:*").unwrap();
        assert!(pattern.matches("stand:high-value:100.00"));
        assert!(pattern.matches("stand:high-value:"));
        assert!(!pattern.matches("stand:all"));
        assert!(!pattern.matches("xstand:high-value:1"));
    }

    #[test]
    fn test_inner_wildcard() {
        let pattern = KeyPattern::new("stand:*:species").unwrap();
        assert!(pattern.matches("stand:statistics:species"));
        assert!(!pattern.matches("stand:statistics:species:extra"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let pattern = KeyPattern::new("stand:nearby:116.4000*").unwrap();
        assert!(pattern.matches("stand:nearby:116.4000:39.9000:45000"));
        assert!(!pattern.matches("stand:nearby:116x4000:39.9000:45000"));

        let pattern = KeyPattern::new("a+b(c)").unwrap();
        assert!(pattern.matches("a+b(c)"));
        assert!(!pattern.matches("aab(c)"));
    }

    #[test]
    fn test_no_wildcard_is_exact() {
        let pattern = KeyPattern::new("stand:all").unwrap();
        assert!(pattern.matches("stand:all"));
        assert!(!pattern.matches("stand:all:1"));
    }
}
