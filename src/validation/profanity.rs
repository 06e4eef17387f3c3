use regex::{Regex, RegexBuilder};
use tracing::warn;

const CENSOR: &str = "****";

/// Profanity classification and censoring.
pub trait ProfanityFilter: Send + Sync {
    fn contains_profanity(&self, text: &str) -> bool;
    fn censor(&self, text: &str) -> String;
}

/// Whole-word, case-insensitive filter over a word list. Multi-word entries
/// ("shut up") match across any run of whitespace.
#[derive(Debug, Clone, Default)]
pub struct WordListFilter {
    matcher: Option<Regex>,
}

impl WordListFilter {
    pub fn new<S: AsRef<str>>(words: &[S]) -> Self {
        let mut words: Vec<&str> = words
            .iter()
            .map(|w| w.as_ref().trim())
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return Self::default();
        }
        // Longest first so overlapping entries censor the full phrase.
        words.sort_by(|a, b| b.len().cmp(&a.len()));
        words.dedup();

        let alternation = words
            .iter()
            .map(|w| {
                w.split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s+")
            })
            .collect::<Vec<_>>()
            .join("|");

        match RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
            .case_insensitive(true)
            .build()
        {
            Ok(re) => Self { matcher: Some(re) },
            Err(e) => {
                warn!("Could not build profanity matcher: {}", e);
                Self::default()
            }
        }
    }
}

impl ProfanityFilter for WordListFilter {
    fn contains_profanity(&self, text: &str) -> bool {
        self.matcher.as_ref().is_some_and(|re| re.is_match(text))
    }

    fn censor(&self, text: &str) -> String {
        match &self.matcher {
            Some(re) => re.replace_all(text, CENSOR).into_owned(),
            None => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_whole_words_only() {
        let filter = WordListFilter::new(&["hell", "hit"]);
        assert!(filter.contains_profanity("What the HELL"));
        assert!(!filter.contains_profanity("Hello there"));
        assert!(!filter.contains_profanity("This is white"));
    }

    #[test]
    fn censors_each_match() {
        let filter = WordListFilter::new(&["stupid", "shut up"]);
        assert_eq!(
            filter.censor("Shut   up, that was stupid and STUPID"),
            "****, that was **** and ****"
        );
    }

    #[test]
    fn empty_list_never_flags() {
        let filter = WordListFilter::new::<&str>(&[]);
        assert!(!filter.contains_profanity("anything at all"));
        assert_eq!(filter.censor("unchanged"), "unchanged");
    }
}
