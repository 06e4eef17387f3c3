//! Document store seam.
//!
//! The service only ever addresses documents by `(collection, id)`. The bundled
//! [`MemoryStore`] keeps every document in an immutable map that is swapped
//! atomically on write, so readers never block writers.

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub const VOCABULARY: &str = "nvc_vocabulary";
pub const CONFIG_METADATA: &str = "config_metadata";
pub const USERS: &str = "users";
pub const PROMO_CODES: &str = "promo_codes";

pub const VALIDATION_RULES_DOC: &str = "validation_rules";
pub const TEMPLATES_DOC: &str = "templates";

const BUNDLED_SEED: &str = include_str!("../../data/seed.json");

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid seed data: {0}")]
    Seed(String),
    #[error("malformed document {0}")]
    Malformed(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct MemoryStore {
    docs: ArcSwap<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from `{ "<collection>": { "<id>": <document> } }`.
    pub fn from_seed(seed: &Value) -> Result<Self, StoreError> {
        let collections = seed
            .as_object()
            .ok_or_else(|| StoreError::Seed("top level must be an object".into()))?;

        let mut docs = HashMap::new();
        for (collection, entries) in collections {
            let entries = entries.as_object().ok_or_else(|| {
                StoreError::Seed(format!("collection '{}' must be an object", collection))
            })?;
            for (id, doc) in entries {
                docs.insert(doc_key(collection, id), doc.clone());
            }
        }

        info!("Seeded document store with {} documents", docs.len());
        Ok(Self {
            docs: ArcSwap::from_pointee(docs),
        })
    }

    pub fn bundled() -> Result<Self, StoreError> {
        let seed: Value =
            serde_json::from_str(BUNDLED_SEED).map_err(|e| StoreError::Seed(e.to_string()))?;
        Self::from_seed(&seed)
    }

    pub fn from_seed_file(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Seed(format!("{}: {}", path.display(), e)))?;
        let seed: Value = serde_json::from_str(&raw).map_err(|e| StoreError::Seed(e.to_string()))?;
        Self::from_seed(&seed)
    }

    pub fn len(&self) -> usize {
        self.docs.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.docs.load().get(&doc_key(collection, id)).cloned())
    }

    async fn set(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError> {
        let key = doc_key(collection, id);
        self.docs.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(key.clone(), doc.clone());
            next
        });
        Ok(())
    }
}

fn doc_key(collection: &str, id: &str) -> String {
    format!("{}/{}", collection, id)
}

pub type SharedStore = Arc<dyn DocumentStore>;
