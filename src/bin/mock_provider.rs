//! Stand-in for the Gemini `generateContent` endpoint.
//!
//! Usage: `mock_provider [port] [latency_ms] [error_rate]`

use axum::{extract::State, routing::post, Json, Router};
use rand::Rng;
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Clone)]
struct ServerConfig {
    latency_ms: u64,
    error_rate: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let port = args.get(1).map_or(Ok(3001), |s| s.parse::<u16>())?;
    let latency_ms = args.get(2).map_or(Ok(300), |s| s.parse::<u64>())?;
    let error_rate = args.get(3).map_or(Ok(0.0), |s| s.parse::<f64>())?;

    let config = ServerConfig { latency_ms, error_rate };

    let app = Router::new()
        .route("/v1beta/models/:model_action", post(handler))
        .with_state(config);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!(
        "Mock Gemini running on localhost:{}. Latency: {}ms, Error Rate: {}",
        port, latency_ms, error_rate
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handler(
    State(config): State<ServerConfig>,
    Json(req): Json<Value>,
) -> (axum::http::StatusCode, Json<Value>) {
    let (jitter, fail) = {
        let mut rng = rand::thread_rng();
        let fail = config.error_rate > 0.0 && rng.gen_bool(config.error_rate.min(1.0));
        (rng.gen_range(0..=50), fail)
    };
    sleep(Duration::from_millis(config.latency_ms + jitter)).await;

    if fail {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": {"code": 500, "message": "simulated failure"}})),
        );
    }

    let prompt = req["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default();

    (
        axum::http::StatusCode::OK,
        Json(serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": canned_reply(prompt) }]
                },
                "finishReason": "STOP"
            }]
        })),
    )
}

fn canned_reply(prompt: &str) -> &'static str {
    let lowered = prompt.to_lowercase();
    if lowered.contains("observation:") {
        if ["always", "never", "lazy", "should"].iter().any(|w| lowered.contains(w)) {
            "Judgment: Yes\nAlternatives: When I saw the dishes in the sink this morning, When I came home and noticed the laundry on the floor, When the trash was not taken out on Tuesday"
        } else {
            "Judgment: No"
        }
    } else if lowered.contains("request:") {
        "Judgment: Yes\nAlternatives:\n1. Would you be willing to wash your dishes before bed?\n2. Would you be willing to tell me when you will be late?"
    } else if lowered.contains("feeling words") {
        "frustrated, tired, worried, disappointed"
    } else if lowered.contains("needs only") {
        "rest, support, consideration, order"
    } else {
        "It sounds like you felt frustrated when you came home to the dishes, because rest and shared care matter to you."
    }
}
