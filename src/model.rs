use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body accepted by every `/ai/*` endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

/// Primary output of an AI operation: a single rewritten sentence or a word list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AiResult {
    Text(String),
    List(Vec<String>),
}

impl AiResult {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AiResult::Text(s) => Some(s),
            AiResult::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AiResult::List(items) => Some(items),
            AiResult::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    pub result: AiResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<String>>,
    pub is_offensive: bool,
    #[serde(default)]
    pub from_cache: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationRequest {
    #[serde(default)]
    pub text: String,
}

/// Result of running the validation pipeline. Success is `is_valid == true` with no other fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub censored_text: Option<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
            suggestion: None,
            censored_text: None,
        }
    }

    pub fn invalid(reason: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
            suggestion: Some(suggestion.into()),
            censored_text: None,
        }
    }

    pub fn with_censored(mut self, censored: String) -> Self {
        self.censored_text = Some(censored);
        self
    }
}

/// `config_metadata/validation_rules`. Every field defaults to empty so a partial
/// document still yields a usable (more permissive) rule set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(default)]
    pub blame_patterns: Vec<String>,
    #[serde(default)]
    pub pseudo_feelings: Vec<String>,
    #[serde(default)]
    pub violent_words: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabularyCategory {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub words: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VocabularyDocument {
    #[serde(default)]
    pub categories: Vec<VocabularyCategory>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    pub feelings: Vec<VocabularyCategory>,
    pub needs: Vec<VocabularyCategory>,
}

/// `promo_codes/{code}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoCode {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub duration_days: i64,
    #[serde(default)]
    pub max_uses: u64,
    #[serde(default)]
    pub used_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedeemRequest {
    #[serde(default)]
    pub user_id: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PremiumStatus {
    pub user_id: String,
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
}
