use crate::ai::{Operation, Orchestrator};
use crate::auth::{self, Authenticator, StaticTokenVerifier};
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::{
    AiRequest, AiResponse, PremiumStatus, RedeemRequest, ValidationOutcome, ValidationRequest,
    Vocabulary, VocabularyDocument,
};
use crate::provider::stats::ProviderStats;
use crate::provider::{GeminiProvider, TextModel};
use crate::ratelimit::RateLimiter;
use crate::store::{
    DocumentStore, MemoryStore, SharedStore, CONFIG_METADATA, TEMPLATES_DOC, VOCABULARY,
};
use crate::validation::{rules, Pipeline, Stage, FEELING_STAGES, OBSERVATION_STAGES};
use axum::{
    extract::{Json, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub const SERVICE_NAME: &str = "Peacekeeper API v0.1";

pub struct AppState {
    pub store: SharedStore,
    pub orchestrator: Orchestrator,
    pub auth: Authenticator,
    pub enforce_premium: bool,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store: SharedStore = match &config.seed_path {
            Some(path) => Arc::new(MemoryStore::from_seed_file(path)?),
            None => Arc::new(MemoryStore::bundled()?),
        };
        let model = Arc::new(GeminiProvider::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            config.gemini_base_url.clone(),
            config.model_timeout,
        ));
        Ok(Self::with_parts(config, store, model))
    }

    /// Wires the state around externally supplied collaborators.
    pub fn with_parts(config: &Config, store: SharedStore, model: Arc<dyn TextModel>) -> Self {
        let orchestrator = Orchestrator::new(
            model,
            ResponseCache::new(config.cache_max_entries, config.cache_ttl),
            Arc::new(RateLimiter::new(
                config.rate_limit_capacity,
                config.rate_limit_refill,
            )),
            Arc::new(ProviderStats::new()),
        );
        let auth = Authenticator::new(
            Box::new(StaticTokenVerifier::new(config.auth_tokens.clone())),
            config.auth_disabled,
        );
        Self {
            store,
            orchestrator,
            auth,
            enforce_premium: config.enforce_premium,
        }
    }
}

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/content/vocabulary", get(handle_vocabulary))
        .route("/content/templates", get(handle_templates))
        .route("/validate/observation", post(handle_validate_observation))
        .route("/validate/feelings", post(handle_validate_feelings))
        .route("/ai/neutralize-observation", post(handle_neutralize_observation))
        .route("/ai/refine-request", post(handle_refine_request))
        .route("/ai/suggest-feelings", post(handle_suggest_feelings))
        .route("/ai/suggest-needs", post(handle_suggest_needs))
        .route("/ai/generate-reflection", post(handle_generate_reflection))
        .route("/premium/status", get(handle_premium_status))
        .route("/premium/redeem", post(handle_redeem))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_root(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "online",
        "service": SERVICE_NAME,
        "model": state.orchestrator.stats().snapshot(),
    }))
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn handle_vocabulary(State(state): State<Arc<AppState>>) -> Result<Json<Vocabulary>, ApiError> {
    let feelings = load_vocabulary(state.store.as_ref(), "feelings").await?;
    let needs = load_vocabulary(state.store.as_ref(), "needs").await?;
    Ok(Json(Vocabulary {
        feelings: feelings.categories,
        needs: needs.categories,
    }))
}

async fn load_vocabulary(store: &dyn DocumentStore, id: &str) -> Result<VocabularyDocument, ApiError> {
    let Some(doc) = store.get(VOCABULARY, id).await? else {
        warn!("Vocabulary document {} missing", id);
        return Ok(VocabularyDocument::default());
    };
    Ok(serde_json::from_value(doc).unwrap_or_else(|e| {
        warn!("Malformed vocabulary document {}: {}", id, e);
        VocabularyDocument::default()
    }))
}

async fn handle_templates(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let templates = state.store.get(CONFIG_METADATA, TEMPLATES_DOC).await?;
    Ok(Json(templates.unwrap_or_else(|| json!({}))))
}

async fn handle_validate_observation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidationRequest>,
) -> Json<ValidationOutcome> {
    Json(validate(&state, &req.text, OBSERVATION_STAGES).await)
}

async fn handle_validate_feelings(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidationRequest>,
) -> Json<ValidationOutcome> {
    Json(validate(&state, &req.text, FEELING_STAGES).await)
}

async fn validate(state: &AppState, text: &str, stages: &[Stage]) -> ValidationOutcome {
    let rules = rules::load_rules(state.store.as_ref()).await;
    Pipeline::from_rules(&rules).run(text, stages)
}

async fn handle_neutralize_observation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AiRequest>,
) -> Result<Json<AiResponse>, ApiError> {
    run_ai(&state, &headers, req, Operation::NeutralizeObservation).await
}

async fn handle_refine_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AiRequest>,
) -> Result<Json<AiResponse>, ApiError> {
    run_ai(&state, &headers, req, Operation::RefineRequest).await
}

async fn handle_suggest_feelings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AiRequest>,
) -> Result<Json<AiResponse>, ApiError> {
    run_ai(&state, &headers, req, Operation::SuggestFeelings).await
}

async fn handle_suggest_needs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AiRequest>,
) -> Result<Json<AiResponse>, ApiError> {
    run_ai(&state, &headers, req, Operation::SuggestNeeds).await
}

async fn handle_generate_reflection(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AiRequest>,
) -> Result<Json<AiResponse>, ApiError> {
    run_ai(&state, &headers, req, Operation::GenerateReflection).await
}

async fn run_ai(
    state: &AppState,
    headers: &HeaderMap,
    mut req: AiRequest,
    op: Operation,
) -> Result<Json<AiResponse>, ApiError> {
    req.user_id = state.auth.authenticate(headers, &req.user_id).await?;
    auth::check_premium(state.store.as_ref(), &req.user_id, state.enforce_premium).await?;
    let resp = state.orchestrator.run(op, &req).await?;
    Ok(Json(resp))
}

#[derive(Debug, Default, Deserialize)]
struct UserQuery {
    #[serde(default)]
    user_id: String,
}

async fn handle_premium_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<UserQuery>,
) -> Result<Json<PremiumStatus>, ApiError> {
    let uid = state.auth.authenticate(&headers, &query.user_id).await?;
    let status = auth::premium_status(state.store.as_ref(), &uid, chrono::Utc::now()).await?;
    Ok(Json(status))
}

async fn handle_redeem(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RedeemRequest>,
) -> Result<Json<PremiumStatus>, ApiError> {
    let uid = state.auth.authenticate(&headers, &req.user_id).await?;
    let status = auth::redeem_promo(state.store.as_ref(), &uid, &req.code, chrono::Utc::now()).await?;
    info!("Premium active for {} until {:?}", uid, status.premium_until);
    Ok(Json(status))
}
