//! Rule-based statement validation.
//!
//! Stages run in the order given and stop at the first failure:
//! profanity, then blame patterns, then pseudo-feelings.

pub mod profanity;
pub mod rules;

use crate::model::{ValidationOutcome, ValidationRules};
use profanity::{ProfanityFilter, WordListFilter};
use regex::Regex;
use tracing::debug;

pub const REASON_UNSAFE: &str = "Language unsafe.";
pub const REASON_BLAME: &str = "Blame language detected.";
pub const REASON_PSEUDO_FEELING: &str = "Pseudo-feeling detected.";

pub const UNSAFE_SUGGESTION: &str =
    "Let's try expressing this without harsh or hurtful words. What did you actually see or hear?";
pub const BLAME_SUGGESTION: &str =
    "Try describing only what you observed, without judging the other person. For example: \"When I saw the dishes in the sink...\"";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Profanity,
    Blame,
    PseudoFeeling,
}

/// Stages checked for an observation statement.
pub const OBSERVATION_STAGES: &[Stage] = &[Stage::Profanity, Stage::Blame];
/// Stages checked for a feelings statement.
pub const FEELING_STAGES: &[Stage] = &[Stage::Profanity, Stage::PseudoFeeling];

pub struct Pipeline {
    profanity: Box<dyn ProfanityFilter>,
    blame_patterns: Vec<Regex>,
    pseudo_feelings: Vec<String>,
}

impl Pipeline {
    /// Uses the rule set's `violent_words` as the profanity word list.
    pub fn from_rules(rules: &ValidationRules) -> Self {
        Self::with_filter(rules, Box::new(WordListFilter::new(&rules.violent_words)))
    }

    pub fn with_filter(rules: &ValidationRules, profanity: Box<dyn ProfanityFilter>) -> Self {
        Self {
            profanity,
            blame_patterns: rules::compile_blame_patterns(&rules.blame_patterns),
            pseudo_feelings: rules
                .pseudo_feelings
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn run(&self, text: &str, stages: &[Stage]) -> ValidationOutcome {
        for stage in stages {
            let outcome = match stage {
                Stage::Profanity => self.check_profanity(text),
                Stage::Blame => self.check_blame(text),
                Stage::PseudoFeeling => self.check_pseudo_feelings(text),
            };
            if let Some(outcome) = outcome {
                debug!("Validation failed at {:?} stage", stage);
                return outcome;
            }
        }
        ValidationOutcome::valid()
    }

    fn check_profanity(&self, text: &str) -> Option<ValidationOutcome> {
        if !self.profanity.contains_profanity(text) {
            return None;
        }
        Some(
            ValidationOutcome::invalid(REASON_UNSAFE, UNSAFE_SUGGESTION)
                .with_censored(self.profanity.censor(text)),
        )
    }

    fn check_blame(&self, text: &str) -> Option<ValidationOutcome> {
        self.blame_patterns
            .iter()
            .any(|re| re.is_match(text))
            .then(|| ValidationOutcome::invalid(REASON_BLAME, BLAME_SUGGESTION))
    }

    fn check_pseudo_feelings(&self, text: &str) -> Option<ValidationOutcome> {
        let lowered = text.to_lowercase();
        let word = self.pseudo_feelings.iter().find(|w| lowered.contains(w.as_str()))?;
        Some(ValidationOutcome::invalid(
            REASON_PSEUDO_FEELING,
            pseudo_feeling_suggestion(word),
        ))
    }
}

fn pseudo_feeling_suggestion(word: &str) -> String {
    format!(
        "\"{}\" describes what you think someone did to you rather than how you feel. \
         Try naming the feeling underneath, such as hurt, sad, lonely, or frustrated.",
        word
    )
}
