//! Spins up the mock model and the API, then bursts AI requests at it and
//! reports how many were served fresh, from cache, or rate limited.
//!
//! Assumes binaries are already built by a previous `cargo build`.

use std::process::{Child, Command};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::task;

// Helper to kill children on exit
struct ProcessGuard(Child);
impl Drop for ProcessGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
    }
}

#[derive(Default)]
struct Tally {
    fresh: AtomicUsize,
    cached: AtomicUsize,
    limited: AtomicUsize,
    errors: AtomicUsize,
}

const USERS: usize = 10;
const REQUESTS_PER_USER: usize = 8;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Starting Simulation...");

    let _model = ProcessGuard(
        Command::new("./target/debug/mock_provider")
            .args(["3001", "50", "0.05"])
            .spawn()?,
    );
    println!("Mock model started on 3001. Waiting 2s...");
    thread::sleep(Duration::from_secs(2));

    let _api = ProcessGuard(
        Command::new("./target/debug/peacekeeper-api")
            .env("PORT", "8080")
            .env("HOST", "127.0.0.1")
            .env("GEMINI_BASE_URL", "http://127.0.0.1:3001/v1beta")
            .env("GEMINI_API_KEY", "simulation")
            .env("AUTH_DISABLED", "true")
            .spawn()?,
    );
    println!("API started on 8080. Waiting 3s...");
    thread::sleep(Duration::from_secs(3));

    println!(
        "Starting Load Test ({} users x {} requests)...",
        USERS, REQUESTS_PER_USER
    );

    let client = reqwest::Client::new();
    let tally = Arc::new(Tally::default());
    let start_time = Instant::now();

    let mut tasks = Vec::new();
    for user in 0..USERS {
        for i in 0..REQUESTS_PER_USER {
            let client = client.clone();
            let tally = tally.clone();

            // Every other request repeats an earlier text so the cache gets hits.
            let text = if i % 2 == 0 {
                "You always leave the dishes".to_string()
            } else {
                format!("You never call me back ({})", i)
            };
            let body = serde_json::json!({ "user_id": format!("sim-user-{}", user), "text": text });

            tasks.push(task::spawn(async move {
                let resp = client
                    .post("http://127.0.0.1:8080/ai/neutralize-observation")
                    .json(&body)
                    .send()
                    .await;
                match resp {
                    Ok(resp) if resp.status().is_success() => {
                        let json: serde_json::Value = resp.json().await.unwrap_or_default();
                        if json["from_cache"].as_bool().unwrap_or(false) {
                            tally.cached.fetch_add(1, Ordering::Relaxed);
                        } else {
                            tally.fresh.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                        tally.limited.fetch_add(1, Ordering::Relaxed);
                    }
                    _ => {
                        tally.errors.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }));
        }
    }

    for t in tasks {
        let _ = t.await;
    }

    let duration = start_time.elapsed();
    let total = USERS * REQUESTS_PER_USER;

    println!("--- Results ---");
    println!("Total Requests: {}", total);
    println!("Fresh: {}", tally.fresh.load(Ordering::Relaxed));
    println!("From cache: {}", tally.cached.load(Ordering::Relaxed));
    println!("Rate limited: {}", tally.limited.load(Ordering::Relaxed));
    println!("Errors: {}", tally.errors.load(Ordering::Relaxed));
    println!("Total Time: {:?}", duration);
    println!("RPS: {:.2}", total as f64 / duration.as_secs_f64());

    println!("Simulation finished. Stopping servers in 2s.");
    thread::sleep(Duration::from_secs(2));
    Ok(())
}
