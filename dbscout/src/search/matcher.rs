use caseless::default_case_fold_str;

/// Literal substring matcher for one query.
///
/// Case-insensitive matching compares Unicode case folds, so "STRASSE" finds "straße". The
/// needle is folded once up front; ASCII records are compared in place without allocating.
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    query: String,
    needle: String,
    case_sensitive: bool,
}

impl QueryMatcher {
    /// Creates a matcher for `query`; the query is matched literally, no pattern syntax
    pub fn new(query: &str, case_sensitive: bool) -> Self {
        let needle = if case_sensitive {
            query.to_string()
        } else {
            default_case_fold_str(query)
        };

        Self {
            query: query.to_string(),
            needle,
            case_sensitive,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Whether `text` contains the query
    pub fn is_match(&self, text: &str) -> bool {
        if self.case_sensitive {
            return text.contains(self.needle.as_str());
        }
        if self.needle.is_empty() {
            return true;
        }

        if text.is_ascii() {
            if !self.needle.is_ascii() {
                // ASCII never folds into non-ASCII
                return false;
            }
            let needle = self.needle.as_bytes();
            return text
                .as_bytes()
                .windows(needle.len())
                .any(|window| window.eq_ignore_ascii_case(needle));
        }

        default_case_fold_str(text).contains(self.needle.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_ascii() {
        let matcher = QueryMatcher::new("John", false);
        assert!(matcher.is_match("john smith"));
        assert!(matcher.is_match("JOHNNY"));
        assert!(!matcher.is_match("jon"));
        assert!(!matcher.is_match("Jo"));
    }

    #[test]
    fn test_case_sensitive() {
        let matcher = QueryMatcher::new("John", true);
        assert!(matcher.is_match("John Smith"));
        assert!(!matcher.is_match("john smith"));
        assert!(matcher.is_case_sensitive());
    }

    #[test]
    fn test_unicode_case_folding() {
        let matcher = QueryMatcher::new("STRASSE", false);
        assert!(matcher.is_match("Hauptstraße 5"));

        let matcher = QueryMatcher::new("ÄÖÜ", false);
        assert!(matcher.is_match("umlaut äöü here"));
        assert!(!matcher.is_match("plain ascii"));
    }

    #[test]
    fn test_query_is_literal() {
        let matcher = QueryMatcher::new("a.c", false);
        assert!(matcher.is_match("a.c"));
        assert!(!matcher.is_match("abc"));

        let matcher = QueryMatcher::new("(1, 'x')", false);
        assert!(matcher.is_match("VALUES (1, 'X');"));
        assert_eq!(matcher.query(), "(1, 'x')");
    }

    #[test]
    fn test_empty_text() {
        let matcher = QueryMatcher::new("alpha", false);
        assert!(!matcher.is_match(""));
    }
}
