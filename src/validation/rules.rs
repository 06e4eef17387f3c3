use crate::model::ValidationRules;
use crate::store::{DocumentStore, CONFIG_METADATA, VALIDATION_RULES_DOC};
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Reads the current rule set. Rules are fetched on every call; a missing,
/// unreadable or malformed document degrades to an empty rule set.
pub async fn load_rules(store: &dyn DocumentStore) -> ValidationRules {
    let doc = match store.get(CONFIG_METADATA, VALIDATION_RULES_DOC).await {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            warn!("validation_rules document missing, validating with empty rule set");
            return ValidationRules::default();
        }
        Err(e) => {
            warn!("Failed to read validation rules: {}", e);
            return ValidationRules::default();
        }
    };

    serde_json::from_value(doc).unwrap_or_else(|e| {
        warn!("Malformed validation_rules document: {}", e);
        ValidationRules::default()
    })
}

/// Compiles blame patterns case-insensitively, in order. Invalid patterns are dropped.
pub fn compile_blame_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match RegexBuilder::new(p).case_insensitive(true).build() {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Skipping invalid blame pattern {:?}: {}", p, e);
                None
            }
        })
        .collect()
}
