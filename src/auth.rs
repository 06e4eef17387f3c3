//! Caller identity and premium entitlement.

use crate::error::ApiError;
use crate::model::{PremiumStatus, PromoCode};
use crate::store::{DocumentStore, StoreError, PROMO_CODES, USERS};
use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::{info, warn};

pub const NOT_AUTHENTICATED: &str = "Not authenticated";
pub const INVALID_TOKEN: &str = "Invalid or expired authentication token";
pub const PREMIUM_REQUIRED: &str = "Premium subscription required";

/// Verifies an ID token and returns the uid it was issued to.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> anyhow::Result<String>;
}

/// Fixed token -> uid table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> anyhow::Result<String> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown token"))
    }
}

pub struct Authenticator {
    verifier: Box<dyn TokenVerifier>,
    disabled: bool,
}

impl Authenticator {
    pub fn new(verifier: Box<dyn TokenVerifier>, disabled: bool) -> Self {
        if disabled {
            warn!("Authentication is disabled; request bodies are trusted for user_id");
        }
        Self { verifier, disabled }
    }

    /// Resolves the caller's uid. A verified uid always replaces the body's `user_id`.
    pub async fn authenticate(&self, headers: &HeaderMap, claimed: &str) -> Result<String, ApiError> {
        if self.disabled {
            if claimed.trim().is_empty() {
                return Err(ApiError::BadRequest("user_id is required".into()));
            }
            return Ok(claimed.to_string());
        }

        let token = bearer_token(headers)
            .ok_or_else(|| ApiError::Unauthorized(NOT_AUTHENTICATED.into()))?;

        let uid = self.verifier.verify(token).await.map_err(|e| {
            warn!("Token verification failed: {}", e);
            ApiError::Unauthorized(INVALID_TOKEN.into())
        })?;

        if !claimed.is_empty() && claimed != uid {
            warn!("Body user_id {:?} overridden by token uid {:?}", claimed, uid);
        }
        Ok(uid)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

pub async fn premium_status(
    store: &dyn DocumentStore,
    uid: &str,
    now: DateTime<Utc>,
) -> Result<PremiumStatus, ApiError> {
    let premium_until = store
        .get(USERS, uid)
        .await?
        .as_ref()
        .and_then(|doc| doc.get("premium_until"))
        .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v.clone()).ok());

    Ok(PremiumStatus {
        user_id: uid.to_string(),
        is_premium: premium_until.is_some_and(|until| until > now),
        premium_until,
    })
}

/// Non-premium callers are rejected only when `enforce` is set; otherwise they are logged and let through.
pub async fn check_premium(
    store: &dyn DocumentStore,
    uid: &str,
    enforce: bool,
) -> Result<(), ApiError> {
    let status = premium_status(store, uid, Utc::now()).await?;
    if status.is_premium {
        return Ok(());
    }
    if enforce {
        return Err(ApiError::Forbidden(PREMIUM_REQUIRED.into()));
    }
    info!("User {} has no active premium; access allowed", uid);
    Ok(())
}

/// Applies a promo code: extends premium from `max(now, premium_until)` and counts the use.
pub async fn redeem_promo(
    store: &dyn DocumentStore,
    uid: &str,
    code: &str,
    now: DateTime<Utc>,
) -> Result<PremiumStatus, ApiError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ApiError::BadRequest("code is required".into()));
    }

    let doc = store
        .get(PROMO_CODES, code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Promo code not found".into()))?;
    let mut promo: PromoCode = serde_json::from_value(doc.clone())
        .map_err(|_| ApiError::BadRequest("Promo code is invalid".into()))?;

    if !promo.is_active {
        return Err(ApiError::BadRequest("Promo code is no longer active".into()));
    }
    if promo.used_count >= promo.max_uses {
        return Err(ApiError::BadRequest("Promo code has reached its usage limit".into()));
    }

    let mut user = match store.get(USERS, uid).await? {
        None => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            warn!("User document {} is not an object; promo {} not applied", uid, code);
            return Err(StoreError::Malformed(format!("{}/{}", USERS, uid)).into());
        }
    };

    let current = premium_status(store, uid, now).await?;
    let base = current.premium_until.filter(|until| *until > now).unwrap_or(now);
    let until = Duration::try_days(promo.duration_days.max(0))
        .and_then(|extension| base.checked_add_signed(extension))
        .ok_or_else(|| {
            warn!("Promo {} duration of {} days is out of range", code, promo.duration_days);
            ApiError::BadRequest("Promo code is invalid".into())
        })?;

    promo.used_count += 1;
    store.set(PROMO_CODES, code, merge(doc, &promo)).await?;

    user.insert("premium_until".into(), json!(until));
    user.insert("last_promo_code".into(), json!(code));
    store.set(USERS, uid, Value::Object(user)).await?;

    info!("User {} redeemed {} until {}", uid, code, until);
    Ok(PremiumStatus {
        user_id: uid.to_string(),
        is_premium: true,
        premium_until: Some(until),
    })
}

/// Keeps fields of the stored document that `PromoCode` does not model.
fn merge(mut doc: Value, promo: &PromoCode) -> Value {
    if let (Value::Object(map), Ok(Value::Object(update))) = (&mut doc, serde_json::to_value(promo)) {
        map.extend(update);
    }
    doc
}
