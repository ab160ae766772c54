//! # Bridge Demo Driver
//!
//! Purpose: Exercise the full mediation surface end to end against the
//! in-memory backend: subscriptions, pattern subscriptions, pipelines, and
//! a watched transaction, printing the push events as they arrive.
//!
//! Usage: `demo [config.json]` — the optional argument points at a JSON
//! `ClientConfig`.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use bkv_backend::MemoryBackend;
use bkv_client::{BridgeClient, ClientConfig, PushEvent};

fn load_config() -> Result<ClientConfig> {
    match env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing config file {path}"))
        }
        None => Ok(ClientConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = load_config()?;
    let backend = Arc::new(MemoryBackend::new());
    let client = BridgeClient::with_config(backend, config);
    client.connect().await?;

    let mut events = client.events();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                PushEvent::Message { channel, payload } => {
                    println!("message  {channel}: {}", String::from_utf8_lossy(&payload));
                }
                PushEvent::PMessage {
                    pattern,
                    channel,
                    payload,
                } => {
                    println!(
                        "pmessage {pattern} -> {channel}: {}",
                        String::from_utf8_lossy(&payload)
                    );
                }
                other => println!("event    {other:?}"),
            }
        }
    });

    let count = client.subscribe(&["news.local"]).await;
    println!("exact subscriptions: {count}");
    let count = client.psubscribe(&["news.*"]).await;
    println!("pattern subscriptions: {count}");

    client.publish("news.local", "hello from the bridge").await?;
    client.publish("news.sports", "pattern-only delivery").await?;

    let results = client
        .pipeline()
        .set("a", "1")
        .set("b", "2")
        .get("a")
        .exec()
        .await?;
    println!("pipeline results: {results:?}");

    let mut tx = client.multi();
    tx.watch(&["counter"]).await?;
    let outcome = tx
        .set("counter", "0")
        .incr("counter")
        .incr("counter")
        .get("counter")
        .exec()
        .await?;
    match outcome {
        Some(results) => println!("transaction committed: {results:?}"),
        None => println!("transaction aborted"),
    }

    // Give the poll workers a moment to drain before tearing down.
    tokio::time::sleep(Duration::from_millis(300)).await;
    client.disconnect().await?;
    printer.abort();
    Ok(())
}
