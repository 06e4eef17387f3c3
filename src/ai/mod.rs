//! AI-backed coaching operations.
//!
//! Every operation goes through the same path: cache lookup, rate limit,
//! prompt, model call, parse, cache write. Cache hits do not spend
//! rate-limit tokens.

pub mod parse;
pub mod prompts;

use crate::cache::ResponseCache;
use crate::error::ApiError;
use crate::model::{AiRequest, AiResponse, AiResult};
use crate::provider::stats::ProviderStats;
use crate::provider::TextModel;
use crate::ratelimit::{Decision, RateLimiter};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    NeutralizeObservation,
    RefineRequest,
    SuggestFeelings,
    SuggestNeeds,
    GenerateReflection,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::NeutralizeObservation => "neutralize-observation",
            Operation::RefineRequest => "refine-request",
            Operation::SuggestFeelings => "suggest-feelings",
            Operation::SuggestNeeds => "suggest-needs",
            Operation::GenerateReflection => "generate-reflection",
        }
    }
}

pub struct Orchestrator {
    model: Arc<dyn TextModel>,
    cache: ResponseCache,
    limiter: Arc<RateLimiter>,
    stats: Arc<ProviderStats>,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn TextModel>,
        cache: ResponseCache,
        limiter: Arc<RateLimiter>,
        stats: Arc<ProviderStats>,
    ) -> Self {
        Self {
            model,
            cache,
            limiter,
            stats,
        }
    }

    pub fn stats(&self) -> &ProviderStats {
        &self.stats
    }

    /// `req.user_id` must already be the authenticated uid.
    pub async fn run(&self, op: Operation, req: &AiRequest) -> Result<AiResponse, ApiError> {
        let text = req.text.as_deref().map(str::trim).unwrap_or_default();
        let has_context = req.context.as_ref().is_some_and(has_content);
        if text.is_empty() && !(op == Operation::GenerateReflection && has_context) {
            return Err(ApiError::BadRequest("text is required".into()));
        }

        let context_json = req
            .context
            .as_ref()
            .map(|c| c.to_string())
            .unwrap_or_default();
        let key = [req.user_id.as_str(), op.as_str(), text, context_json.as_str()];

        if let Some(mut cached) = self.cache.get(&key).await {
            info!("Cache hit for {} (user {})", op.as_str(), req.user_id);
            cached.from_cache = true;
            return Ok(cached);
        }

        if let Decision::Denied { retry_after_secs } = self.limiter.check(&req.user_id) {
            warn!(
                "Rate limit exceeded for user {} on {}, retry in {}s",
                req.user_id,
                op.as_str(),
                retry_after_secs
            );
            return Err(ApiError::RateLimited {
                retry_after: retry_after_secs,
            });
        }

        let prompt = prompts::compose(op, text, req.context.as_ref());
        let call_start = Instant::now();
        let output = match self.model.generate(&prompt).await {
            Ok(output) => {
                self.stats.record_success(call_start.elapsed());
                output
            }
            Err(e) => {
                self.stats.record_failure();
                error!(
                    "Model call failed for {} after {:?}: {:#}",
                    op.as_str(),
                    call_start.elapsed(),
                    e
                );
                return Err(ApiError::Model(format!("{:#}", e)));
            }
        };

        let response = interpret(op, text, &output);
        self.cache.put(&key, response.clone()).await;

        info!(
            "{} processed in {:?} (offensive: {})",
            op.as_str(),
            call_start.elapsed(),
            response.is_offensive
        );
        Ok(response)
    }
}

/// Null, empty strings, empty objects and empty arrays carry nothing to reflect on.
fn has_content(context: &Value) -> bool {
    match context {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Turns raw model output into the operation's response shape.
pub fn interpret(op: Operation, original: &str, output: &str) -> AiResponse {
    match op {
        Operation::NeutralizeObservation | Operation::RefineRequest => {
            let is_offensive = parse::parse_judgment(output);
            let alternatives = if is_offensive {
                parse::parse_alternatives(output)
            } else {
                Vec::new()
            };
            match alternatives.first() {
                Some(first) => AiResponse {
                    result: AiResult::Text(first.clone()),
                    alternatives: Some(alternatives.clone()),
                    is_offensive,
                    from_cache: false,
                },
                None => AiResponse {
                    result: AiResult::Text(original.to_string()),
                    alternatives: None,
                    is_offensive,
                    from_cache: false,
                },
            }
        }
        Operation::SuggestFeelings | Operation::SuggestNeeds => AiResponse {
            result: AiResult::List(parse::parse_list(output, MAX_SUGGESTIONS)),
            alternatives: None,
            is_offensive: false,
            from_cache: false,
        },
        Operation::GenerateReflection => AiResponse {
            result: AiResult::Text(output.trim().to_string()),
            alternatives: None,
            is_offensive: false,
            from_cache: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CannedModel {
        reply: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextModel for CannedModel {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .map(str::to_string)
                .ok_or_else(|| anyhow!("quota exhausted"))
        }
    }

    fn orchestrator(reply: Option<&'static str>) -> (Orchestrator, Arc<CannedModel>) {
        let model = Arc::new(CannedModel {
            reply,
            calls: AtomicUsize::new(0),
        });
        let orch = Orchestrator::new(
            model.clone(),
            ResponseCache::new(100, Duration::from_secs(600)),
            Arc::new(RateLimiter::new(5, Duration::from_secs(60))),
            Arc::new(ProviderStats::new()),
        );
        (orch, model)
    }

    fn request(user: &str, text: &str) -> AiRequest {
        AiRequest {
            user_id: user.to_string(),
            text: Some(text.to_string()),
            context: None,
        }
    }

    #[test]
    fn offensive_observation_uses_first_alternative() {
        let resp = interpret(
            Operation::NeutralizeObservation,
            "You are lazy",
            "Judgment: Yes\nAlternatives: When I saw the dishes, When I noticed the mess",
        );
        assert!(resp.is_offensive);
        assert_eq!(resp.result, AiResult::Text("When I saw the dishes".into()));
        assert_eq!(resp.alternatives.map(|a| a.len()), Some(2));
    }

    #[test]
    fn clean_observation_echoes_input() {
        let resp = interpret(
            Operation::NeutralizeObservation,
            "The dishes are in the sink",
            "Judgment: No",
        );
        assert!(!resp.is_offensive);
        assert_eq!(resp.result, AiResult::Text("The dishes are in the sink".into()));
        assert!(resp.alternatives.is_none());
    }

    #[test]
    fn feelings_are_a_list() {
        let resp = interpret(Operation::SuggestFeelings, "I shouted", "angry, frustrated, tired");
        assert_eq!(
            resp.result.as_list(),
            Some(&["angry".to_string(), "frustrated".to_string(), "tired".to_string()][..])
        );
    }

    #[tokio::test]
    async fn second_identical_call_is_served_from_cache() {
        let (orch, model) = orchestrator(Some("Judgment: Yes\nAlternatives: A, B, C, D"));
        let req = request("u1", "You never help");

        let first = orch.run(Operation::NeutralizeObservation, &req).await.unwrap();
        let second = orch.run(Operation::NeutralizeObservation, &req).await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.result, second.result);
        assert_eq!(second.alternatives.as_ref().map(Vec::len), Some(3));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_is_scoped_per_user_and_operation() {
        let (orch, model) = orchestrator(Some("calm, relieved"));
        orch.run(Operation::SuggestFeelings, &request("u1", "x")).await.unwrap();
        orch.run(Operation::SuggestFeelings, &request("u2", "x")).await.unwrap();
        orch.run(Operation::SuggestNeeds, &request("u1", "x")).await.unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn sixth_model_call_is_rate_limited() {
        let (orch, _) = orchestrator(Some("Judgment: No"));
        for i in 0..5 {
            orch.run(Operation::NeutralizeObservation, &request("u1", &format!("text {}", i)))
                .await
                .unwrap();
        }
        let err = orch
            .run(Operation::NeutralizeObservation, &request("u1", "text 5"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::RateLimited { retry_after } if retry_after > 0));

        // Already-cached input is still served.
        let cached = orch
            .run(Operation::NeutralizeObservation, &request("u1", "text 0"))
            .await
            .unwrap();
        assert!(cached.from_cache);
    }

    #[tokio::test]
    async fn model_failure_is_reported_and_not_cached() {
        let (orch, model) = orchestrator(None);
        let req = request("u1", "You always forget");
        let err = orch.run(Operation::RefineRequest, &req).await.unwrap_err();
        assert!(matches!(&err, ApiError::Model(msg) if msg.contains("quota exhausted")));
        assert!(orch.run(Operation::RefineRequest, &req).await.is_err());
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
        assert_eq!(orch.stats().snapshot().errors, 2);
    }

    #[tokio::test]
    async fn empty_text_is_rejected_unless_reflecting_on_context() {
        let (orch, model) = orchestrator(Some("It sounds like you need rest."));
        let err = orch
            .run(Operation::SuggestFeelings, &request("u1", "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let req = AiRequest {
            user_id: "u1".into(),
            text: None,
            context: Some(serde_json::json!({ "need": "rest" })),
        };
        let resp = orch.run(Operation::GenerateReflection, &req).await.unwrap();
        assert_eq!(resp.result.as_text(), Some("It sounds like you need rest."));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_context_does_not_stand_in_for_text() {
        let (orch, model) = orchestrator(Some("It sounds like you need rest."));
        for context in [serde_json::json!({}), serde_json::json!([]), serde_json::json!("  ")] {
            let req = AiRequest {
                user_id: "u1".into(),
                text: None,
                context: Some(context),
            };
            let err = orch.run(Operation::GenerateReflection, &req).await.unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)));
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }
}
