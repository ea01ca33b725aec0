use std::sync::Arc;

use dotenv::dotenv;
use log::{error, info};
use tokio::sync::watch;

use solpulse_ingest::events::Topic;
use solpulse_ingest::publish::{run_heartbeat, Broadcaster, MemoryStore, PipelineStatus};
use solpulse_ingest::{EventStore, IngestConfig, StreamSupervisor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = IngestConfig::load_from_env();
    info!(
        "starting SolPulse ingestion: upstream={} start_block={}",
        config.api_url, config.start_block
    );

    let store = MemoryStore::new();
    let broadcaster = Broadcaster::new();
    let status = PipelineStatus::new(config.start_block);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Periodic liveness heartbeat, independent of block arrival.
    tokio::spawn(run_heartbeat(
        Arc::clone(&broadcaster),
        Arc::clone(&status),
        config.heartbeat_interval,
        shutdown_rx.clone(),
    ));

    // Console consumers, one per topic. The real subscribers are the API
    // layer's websocket sessions; these make a headless run observable.
    for topic in [Topic::DexSwaps, Topic::WhaleAlerts, Topic::NetworkHealth] {
        let (_id, mut rx) = broadcaster.subscribe(topic).await;
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                info!("[{}] {}", topic.as_str(), summarize(&event));
            }
        });
    }
    let (_hb_id, mut heartbeat_rx) = broadcaster.subscribe_heartbeat().await;
    tokio::spawn(async move {
        while let Some(hb) = heartbeat_rx.recv().await {
            info!("[heartbeat] connected={} cursor={}", hb.connected, hb.cursor);
        }
    });

    let supervisor = StreamSupervisor::new(
        config,
        Arc::clone(&store) as Arc<dyn EventStore>,
        Arc::clone(&broadcaster),
        Arc::clone(&status),
    )?;
    let ingestion = tokio::spawn(supervisor.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    if shutdown_tx.send(true).is_err() {
        error!("ingestion task already gone");
    }
    ingestion.await?;

    Ok(())
}

fn summarize(event: &solpulse_ingest::DomainEvent) -> String {
    use solpulse_ingest::DomainEvent::*;
    match event {
        Swap(e) => format!(
            "{} {} {:.4} {} -> {:.4} {} (${:.2}{}) by {}",
            e.dex,
            e.transaction_id,
            e.amount_in,
            e.token_in,
            e.amount_out,
            e.token_out,
            e.volume_usd,
            if e.is_estimate { ", est" } else { "" },
            e.trader
        ),
        WhaleTransfer(e) => format!(
            "{} {} {:.2} SOL (${:.2}) account {}",
            e.transaction_id, e.change, e.amount_sol, e.value_usd, e.account
        ),
        NetworkHealth(e) => format!("slot {} {}", e.slot, e.status),
    }
}
