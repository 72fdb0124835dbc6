use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn, error, debug, instrument};

use crate::{
    LaneResult, LaneError, JobId, Lane, TaskKind, TaskPayload, DispatchMessage, Delivery,
    ConsumerTag,
    broker::Broker,
    codec::{MessageCodec, json::JsonCodec},
    config::LanesConfig,
    observability::LaneMetrics,
    runner::JobRunner,
    store::JobStore,
};

/// Handle for managing worker lifecycle
pub struct WorkerHandle {
    lane: Lane,
    consumer: ConsumerTag,
    shutdown_tx: oneshot::Sender<()>,
    join_handle: JoinHandle<LaneResult<()>>,
}

impl WorkerHandle {
    pub fn lane(&self) -> Lane {
        self.lane
    }

    pub fn consumer(&self) -> &ConsumerTag {
        &self.consumer
    }

    /// Gracefully shutdown the worker; a job in progress is finished first
    pub async fn shutdown(self) -> LaneResult<()> {
        let _ = self.shutdown_tx.send(());
        self.join_handle.await.map_err(|e| LaneError::Internal(format!("Worker join error: {}", e)))?
    }

    /// Kill the worker and its current job without letting it ack, as if its
    /// process died. Returns once the worker task has ended.
    pub async fn abort(self) -> ConsumerTag {
        self.join_handle.abort();
        if let Err(e) = self.join_handle.await {
            if !e.is_cancelled() {
                warn!("Worker {} ended abnormally: {}", self.consumer, e);
            }
        }
        self.consumer
    }
}

/// Every worker started for both lanes
pub struct LanePool {
    workers: Vec<WorkerHandle>,
}

impl LanePool {
    /// Number of workers serving a lane
    pub fn workers(&self, lane: Lane) -> usize {
        self.workers.iter().filter(|w| w.lane == lane).count()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Stop every worker and wait for them to finish
    pub async fn shutdown(self) -> LaneResult<()> {
        let results = futures::future::join_all(self.workers.into_iter().map(WorkerHandle::shutdown)).await;
        results.into_iter().collect()
    }
}

/// Routes jobs onto the small and large lanes and runs their worker pools
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn JobStore>,
    broker: Arc<dyn Broker>,
    codec: Arc<dyn MessageCodec>,
    metrics: Arc<LaneMetrics>,
    config: LanesConfig,
}

impl Dispatcher {
    /// Create a dispatcher with default configuration
    pub fn new(store: Arc<dyn JobStore>, broker: Arc<dyn Broker>) -> Self {
        Self::with_config(store, broker, LanesConfig::default())
    }

    /// Create dispatcher with custom configuration
    pub fn with_config(store: Arc<dyn JobStore>, broker: Arc<dyn Broker>, config: LanesConfig) -> Self {
        Self {
            store,
            broker,
            codec: Arc::new(JsonCodec),
            metrics: Arc::new(LaneMetrics::new()),
            config,
        }
    }

    /// Publish an existing job onto the lane its task kind is routed to
    #[instrument(skip(self), fields(lane = %kind.lane()))]
    pub async fn submit(&self, kind: TaskKind, job_id: JobId) -> LaneResult<()> {
        let lane = kind.lane();
        let message = DispatchMessage::new(kind, job_id);
        let body = self.codec.encode(&message)?;

        self.broker.publish(lane.queue_name(), body).await?;
        self.metrics.increment_dispatched(lane);

        info!("Dispatched job {} to {} lane", message.job_id, lane);
        Ok(())
    }

    /// Record a new job in the store and publish it
    pub async fn submit_new(&self, kind: TaskKind, payload: &TaskPayload) -> LaneResult<JobId> {
        let record = self.store.create_job(payload.to_json()?).await?;
        self.submit(kind, record.id.clone()).await?;
        Ok(record.id)
    }

    /// Start one worker pulling from a lane's queue
    pub fn spawn_worker(&self, lane: Lane) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let consumer = ConsumerTag::new(lane.queue_name());
        let settings = self.config.lane(lane);

        let worker = Worker {
            lane,
            consumer: consumer.clone(),
            runner: JobRunner::new(self.store.clone(), lane).with_small_cap(settings.cap),
            broker: self.broker.clone(),
            codec: self.codec.clone(),
            metrics: self.metrics.clone(),
            shutdown_rx: Some(shutdown_rx),
        };

        let join_handle = tokio::spawn(async move {
            worker.run().await
        });

        debug!("Started worker {} for {} lane ({} codec)", consumer, lane, self.codec.codec_id());

        WorkerHandle {
            lane,
            consumer,
            shutdown_tx,
            join_handle,
        }
    }

    /// Start the configured number of workers for both lanes
    pub fn start(&self) -> LanePool {
        let mut workers = Vec::new();
        for lane in Lane::all() {
            let concurrency = self.config.lane(*lane).concurrency;
            for _ in 0..concurrency {
                workers.push(self.spawn_worker(*lane));
            }
            info!("Started {} workers for {} lane", concurrency, lane);
        }
        LanePool { workers }
    }

    /// Kill a worker and hand its unacked deliveries to the rest of the lane
    pub async fn recover(&self, worker: WorkerHandle) -> LaneResult<usize> {
        let consumer = worker.abort().await;
        let requeued = self.broker.recover(&consumer).await?;
        if requeued > 0 {
            warn!("Worker {} lost, requeued {} deliveries", consumer, requeued);
        }
        Ok(requeued)
    }

    /// Get job store
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Get broker handle
    pub fn broker(&self) -> &Arc<dyn Broker> {
        &self.broker
    }

    /// Get lane metrics
    pub fn metrics(&self) -> &LaneMetrics {
        &self.metrics
    }

    /// Get configuration
    pub fn config(&self) -> &LanesConfig {
        &self.config
    }
}

/// Worker bound to one lane's queue
struct Worker {
    lane: Lane,
    consumer: ConsumerTag,
    runner: JobRunner,
    broker: Arc<dyn Broker>,
    codec: Arc<dyn MessageCodec>,
    metrics: Arc<LaneMetrics>,
    shutdown_rx: Option<oneshot::Receiver<()>>,
}

impl Worker {
    /// Run the worker loop
    #[instrument(skip(self), fields(lane = %self.lane, consumer = %self.consumer))]
    async fn run(mut self) -> LaneResult<()> {
        let mut shutdown_rx = self.shutdown_rx.take().ok_or(LaneError::WorkerShutdown)?;
        let queue = self.lane.queue_name();

        info!("Worker started for queue: {}", queue);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown_rx => {
                    info!("Worker shutdown requested");
                    break;
                }

                delivery = self.broker.consume(queue, &self.consumer) => {
                    match delivery {
                        Ok(delivery) => self.process(delivery).await,
                        Err(LaneError::Disconnected) => {
                            info!("Broker disconnected, worker exiting");
                            break;
                        }
                        Err(e) => {
                            error!("Error consuming from {}: {}", queue, e);
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }

        info!("Worker stopped");
        Ok(())
    }

    /// Handle one delivery: run the job, then ack, drop or requeue it
    async fn process(&self, delivery: Delivery) {
        let message = match self.codec.decode(&delivery.body) {
            Ok(message) => message,
            Err(e) => {
                error!("Dropping undecodable message {}: {}", delivery.tag, e);
                self.metrics.increment_failed(self.lane);
                self.settle(self.broker.reject(delivery.tag, false).await);
                return;
            }
        };

        if message.lane() != self.lane {
            warn!("Task {} routed to {} arrived on {} lane", message.task, message.lane(), self.lane);
        }
        if delivery.redelivered {
            debug!("Job {} redelivered, replaying", message.job_id);
        }

        let started = Instant::now();
        let outcome = AssertUnwindSafe(self.runner.run(&message.job_id))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(_)) => {
                self.metrics.increment_completed(self.lane, started.elapsed());
                self.settle(self.broker.ack(delivery.tag).await);
            }

            Ok(Err(e)) if !e.is_retryable() => {
                self.metrics.increment_failed(self.lane);
                error!("Job {} failed permanently: {}", message.job_id, e);
                self.settle(self.broker.ack(delivery.tag).await);
            }

            Ok(Err(e)) => {
                self.metrics.increment_requeued(self.lane);
                warn!("Job {} failed, requeueing: {}", message.job_id, e);
                self.settle(self.broker.reject(delivery.tag, true).await);
            }

            // The run panicked; treat it like a lost worker
            Err(_) => {
                self.metrics.increment_requeued(self.lane);
                error!("Job {} panicked, requeueing", message.job_id);
                self.settle(self.broker.reject(delivery.tag, true).await);
            }
        }
    }

    fn settle(&self, result: LaneResult<()>) {
        if let Err(e) = result {
            warn!("Could not settle delivery: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BrokerConfig, JobStatus};
    use crate::broker::memory::MemoryBroker;
    use crate::store::memory::MemoryJobStore;

    fn dispatcher() -> (Dispatcher, Arc<MemoryJobStore>, Arc<MemoryBroker>) {
        let store = Arc::new(MemoryJobStore::new());
        let broker = MemoryBroker::connect(&BrokerConfig::default());
        let dispatcher = Dispatcher::new(store.clone(), broker.clone());
        (dispatcher, store, broker)
    }

    #[tokio::test]
    async fn test_submit_routes_by_task_kind() {
        let (dispatcher, _store, broker) = dispatcher();

        dispatcher.submit(TaskKind::SmallTask, JobId::from("a")).await.unwrap();
        dispatcher.submit(TaskKind::LargeTask, JobId::from("b")).await.unwrap();
        dispatcher.submit(TaskKind::LargeTask, JobId::from("c")).await.unwrap();

        assert_eq!(broker.pending("small"), 1);
        assert_eq!(broker.pending("large"), 2);
        assert_eq!(dispatcher.metrics().snapshot(Lane::Large).dispatched, 2);
    }

    #[tokio::test]
    async fn test_submit_new_creates_job() {
        let (dispatcher, store, broker) = dispatcher();

        let id = dispatcher
            .submit_new(TaskKind::SmallTask, &TaskPayload::new(5))
            .await
            .unwrap();

        let record = store.get_job(&id).await.unwrap();
        assert_eq!(record.status, JobStatus::Created);
        assert_eq!(record.task, r#"{"n":5}"#);
        assert_eq!(broker.pending("small"), 1);
    }

    #[tokio::test]
    async fn test_start_uses_configured_concurrency() {
        let store = Arc::new(MemoryJobStore::new());
        let broker = MemoryBroker::connect(&BrokerConfig::default());
        let mut config = LanesConfig::default();
        config.small.concurrency = 3;
        config.large.concurrency = 2;

        let dispatcher = Dispatcher::with_config(store, broker, config);
        let pool = dispatcher.start();

        assert_eq!(pool.workers(Lane::Small), 3);
        assert_eq!(pool.workers(Lane::Large), 2);
        assert_eq!(pool.len(), 5);

        pool.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_worker_exits_on_disconnect() {
        let (dispatcher, _store, broker) = dispatcher();
        let worker = dispatcher.spawn_worker(Lane::Small);

        broker.disconnect().await;

        let stopped = tokio::time::timeout(Duration::from_secs(2), worker.join_handle).await;
        assert!(matches!(stopped, Ok(Ok(Ok(())))));
    }

    #[tokio::test]
    async fn test_recover_idle_worker_requeues_nothing() {
        let (dispatcher, _store, _broker) = dispatcher();
        let worker = dispatcher.spawn_worker(Lane::Large);

        assert_eq!(dispatcher.recover(worker).await.unwrap(), 0);
    }
}
