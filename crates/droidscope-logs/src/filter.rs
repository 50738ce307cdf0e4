use regex::{Regex, RegexBuilder};

use droidscope_types::{LogLevel, LogRecord};

/// How the pattern is matched against a record's text
#[derive(Clone)]
enum Matcher {
    /// Empty pattern, matches everything
    Any,
    Substring(String),
    /// Stored lowercased
    SubstringCaseInsensitive(String),
    Regex(Regex),
}

/// Pane filter over log records.
///
/// The pattern is tested against the message (which carries the logcat tag)
/// and the resolved process name.
#[derive(Clone)]
pub struct KeywordFilter {
    matcher: Matcher,

    /// Original pattern string
    pattern: String,

    /// Minimum severity (None = all)
    min_level: Option<LogLevel>,

    /// Whether to invert the text match
    invert: bool,
}

impl KeywordFilter {
    /// Plain substring filter
    pub fn keyword(keyword: &str) -> Self {
        let matcher = if keyword.is_empty() {
            Matcher::Any
        } else {
            Matcher::Substring(keyword.to_string())
        };
        Self::with_matcher(matcher, keyword)
    }

    /// Case-insensitive substring filter
    pub fn keyword_case_insensitive(keyword: &str) -> Self {
        let matcher = if keyword.is_empty() {
            Matcher::Any
        } else {
            Matcher::SubstringCaseInsensitive(keyword.to_lowercase())
        };
        Self::with_matcher(matcher, keyword)
    }

    /// Regular expression filter
    pub fn regex(pattern: &str, case_insensitive: bool) -> Result<Self, regex::Error> {
        let matcher = if pattern.is_empty() {
            Matcher::Any
        } else {
            Matcher::Regex(
                RegexBuilder::new(pattern)
                    .case_insensitive(case_insensitive)
                    .build()?,
            )
        };
        Ok(Self::with_matcher(matcher, pattern))
    }

    fn with_matcher(matcher: Matcher, pattern: &str) -> Self {
        Self {
            matcher,
            pattern: pattern.to_string(),
            min_level: None,
            invert: false,
        }
    }

    /// Only pass records at or above this severity
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    /// Invert the text match
    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    /// Check if a record matches this filter
    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(min) = self.min_level
            && record.severity().rank() < min.rank()
        {
            return false;
        }

        let text_match = self.is_match(&record.message)
            || record
                .process_name
                .as_deref()
                .is_some_and(|name| self.is_match(name));

        if self.invert { !text_match } else { text_match }
    }

    fn is_match(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::Any => true,
            Matcher::Substring(k) => text.contains(k.as_str()),
            Matcher::SubstringCaseInsensitive(k) => text.to_lowercase().contains(k.as_str()),
            Matcher::Regex(re) => re.is_match(text),
        }
    }

    /// Find all match positions in a string (for highlighting)
    pub fn find_matches(&self, text: &str) -> Vec<(usize, usize)> {
        match &self.matcher {
            Matcher::Any => Vec::new(),
            Matcher::Substring(k) => text
                .match_indices(k.as_str())
                .map(|(start, m)| (start, start + m.len()))
                .collect(),
            // Lowercasing can change byte lengths, so only ASCII offsets are reliable
            Matcher::SubstringCaseInsensitive(k) if text.is_ascii() => text
                .to_ascii_lowercase()
                .match_indices(k.as_str())
                .map(|(start, m)| (start, start + m.len()))
                .collect(),
            Matcher::SubstringCaseInsensitive(_) => Vec::new(),
            Matcher::Regex(re) => re.find_iter(text).map(|m| (m.start(), m.end())).collect(),
        }
    }

    /// Get the original pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check if filter is empty (matches everything)
    pub fn is_empty(&self) -> bool {
        matches!(self.matcher, Matcher::Any) && self.min_level.is_none() && !self.invert
    }
}

impl std::fmt::Debug for KeywordFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordFilter")
            .field("pattern", &self.pattern)
            .field("min_level", &self.min_level)
            .field("invert", &self.invert)
            .finish()
    }
}
