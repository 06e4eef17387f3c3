use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub model_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_max_entries: u64,
    pub rate_limit_capacity: u32,
    pub rate_limit_refill: Duration,
    /// Bearer token -> uid.
    pub auth_tokens: HashMap<String, String>,
    pub auth_disabled: bool,
    pub enforce_premium: bool,
    pub seed_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080),
            gemini_api_key: String::new(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model_timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(600),
            cache_max_entries: 10_000,
            rate_limit_capacity: 5,
            rate_limit_refill: Duration::from_secs(60),
            auth_tokens: HashMap::new(),
            auth_disabled: false,
            enforce_premium: false,
            seed_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = env_parse("HOST", defaults.bind_addr.ip());
        let port = env_parse("PORT", defaults.bind_addr.port());

        Self {
            bind_addr: SocketAddr::new(host, port),
            gemini_api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            model_timeout: Duration::from_secs(env_parse("MODEL_TIMEOUT_SECS", 30)),
            cache_ttl: Duration::from_secs(env_parse("CACHE_TTL_SECS", 600)),
            cache_max_entries: env_parse("CACHE_MAX_ENTRIES", defaults.cache_max_entries),
            rate_limit_capacity: env_parse("RATE_LIMIT_CAPACITY", defaults.rate_limit_capacity),
            rate_limit_refill: Duration::from_secs(env_parse("RATE_LIMIT_REFILL_SECS", 60)),
            auth_tokens: std::env::var("AUTH_TOKENS")
                .map(|raw| parse_token_map(&raw))
                .unwrap_or_default(),
            auth_disabled: env_parse("AUTH_DISABLED", false),
            enforce_premium: env_parse("ENFORCE_PREMIUM", false),
            seed_path: std::env::var("SEED_PATH").ok().map(PathBuf::from),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Parses `token=uid,token2=uid2`. Entries without `=` or with an empty side are skipped.
pub fn parse_token_map(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (token, uid) = pair.split_once('=')?;
            let (token, uid) = (token.trim(), uid.trim());
            if token.is_empty() || uid.is_empty() {
                None
            } else {
                Some((token.to_string(), uid.to_string()))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_map_skips_malformed_pairs() {
        let map = parse_token_map("abc=alice, def = bob ,broken,=nobody,ghi=");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("abc").map(String::as_str), Some("alice"));
        assert_eq!(map.get("def").map(String::as_str), Some("bob"));
    }

    #[test]
    fn defaults_match_service_limits() {
        let cfg = Config::default();
        assert_eq!(cfg.cache_ttl, Duration::from_secs(600));
        assert_eq!(cfg.rate_limit_capacity, 5);
        assert_eq!(cfg.rate_limit_refill, Duration::from_secs(60));
        assert!(!cfg.enforce_premium);
    }
}
