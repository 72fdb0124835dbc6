//! Runs both lanes in-process and pushes the jobs given on the command line.
//!
//! ```bash
//! RUST_LOG=info dog-lanes small:5 small:25 large:25
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dog_lanes::prelude::*;

fn parse_job(arg: &str) -> Result<(TaskKind, TaskPayload)> {
    let (lane, n) = arg
        .split_once(':')
        .with_context(|| format!("expected <lane>:<n>, got {arg}"))?;

    let lane: Lane = lane.parse().map_err(anyhow::Error::msg)?;
    let n: i64 = n.parse().with_context(|| format!("invalid n in {arg}"))?;

    Ok((TaskKind::for_lane(lane), TaskPayload::new(n)))
}

async fn wait_for(store: &MemoryJobStore, id: &JobId) -> Result<JobRecord> {
    loop {
        let job = store.get_job(id).await?;
        if job.status == JobStatus::Completed {
            return Ok(job);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let jobs = std::env::args()
        .skip(1)
        .map(|arg| parse_job(&arg))
        .collect::<Result<Vec<_>>>()?;
    if jobs.is_empty() {
        bail!("usage: dog-lanes <small|large>:<n> ...");
    }

    let config = LanesConfig::from_env();
    let store = Arc::new(MemoryJobStore::new());
    let broker = MemoryBroker::connect(&config.broker);

    let dispatcher = Dispatcher::with_config(store.clone(), broker.clone(), config);
    let pool = dispatcher.start();

    let mut submitted = Vec::with_capacity(jobs.len());
    for (kind, payload) in jobs {
        let id = dispatcher.submit_new(kind, &payload).await?;
        submitted.push((kind, payload, id));
    }

    for (kind, payload, id) in &submitted {
        match tokio::time::timeout(Duration::from_secs(10), wait_for(&store, id)).await {
            Ok(Ok(job)) => println!(
                "{} n={} -> {}",
                kind,
                payload.n,
                job.result.as_deref().unwrap_or("")
            ),
            Ok(Err(e)) => println!("{} n={} -> error: {}", kind, payload.n, e),
            Err(_) => {
                let status = store.get_job(id).await.map(|job| job.status)?;
                println!("{} n={} -> not completed ({})", kind, payload.n, status);
            }
        }
    }

    pool.shutdown().await?;
    broker.disconnect().await;
    Ok(())
}
