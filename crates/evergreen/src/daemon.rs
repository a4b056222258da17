//! Daemon command running the periodic due-queue processor loop.

use std::sync::Arc;
use std::time::Duration;

use miette::Result;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{info, warn};

use evergreen_engine::{CadencePolicy, DueQueueProcessor, EngineConfig, PostCloner};
use evergreen_store::{
    MemoryPostStore, PostStore, PublishFn, QueueStore, TokioPublishScheduler,
};

/// Run the daemon until ctrl-c.
pub async fn run(owner: &str, tick_interval_secs: u64, cadence: CadencePolicy) -> Result<()> {
    let config = EngineConfig {
        cadence,
        tick_interval: Duration::from_secs(tick_interval_secs),
    };

    let queues = Arc::new(QueueStore::new());
    let posts: Arc<dyn PostStore> = Arc::new(MemoryPostStore::new());

    // The publisher collaborator: platform HTTP lives behind this
    // callback in a real deployment.
    let publish: PublishFn = Arc::new(|post_id, platform| {
        Box::pin(async move {
            info!(%post_id, %platform, "publish invoked");
            Ok(())
        })
    });
    let scheduler = Arc::new(TokioPublishScheduler::new(publish));

    let cloner = PostCloner::new(Arc::clone(&posts), scheduler);
    let processor = DueQueueProcessor::new(Arc::clone(&queues), cloner, config.clone());

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "failed to listen for ctrl-c");
            return;
        }
        info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    info!(
        owner,
        tick_interval_secs,
        cadence = ?config.cadence,
        "daemon starting"
    );

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let summary = processor.run_once().await;
        for failure in &summary.failures {
            warn!(queue_id = %failure.queue_id, error = %failure.error, "queue failed");
        }

        tokio::select! {
            _ = shutdown_rx.changed() => {}
            _ = sleep(config.tick_interval) => {}
        }
    }

    info!("daemon shut down gracefully");
    Ok(())
}
