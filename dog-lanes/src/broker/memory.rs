use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tracing::{debug, info, warn};

use crate::{
    LaneResult, LaneError, ConsumerTag, Delivery, DeliveryTag,
    broker::{Broker, BrokerConfig},
};

/// Message waiting on a queue
#[derive(Debug, Clone)]
struct Pending {
    body: Vec<u8>,
    redelivered: bool,
}

/// Message handed to a consumer and not yet acked
#[derive(Debug, Clone)]
struct InFlight {
    queue: String,
    consumer: ConsumerTag,
    body: Vec<u8>,
}

#[derive(Default)]
struct BrokerState {
    queues: HashMap<String, VecDeque<Pending>>,
    notifiers: HashMap<String, Arc<Notify>>,
    in_flight: HashMap<DeliveryTag, InFlight>,
    next_tag: u64,
}

impl BrokerState {
    fn notifier(&mut self, queue: &str) -> Arc<Notify> {
        self.notifiers
            .entry(queue.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    /// Put an in-flight message back at the head of its queue
    fn requeue(&mut self, in_flight: InFlight) {
        let notify = self.notifier(&in_flight.queue);
        self.queues
            .entry(in_flight.queue)
            .or_default()
            .push_front(Pending {
                body: in_flight.body,
                redelivered: true,
            });
        notify.notify_one();
    }
}

/// In-process broker for testing and development
pub struct MemoryBroker {
    config: BrokerConfig,
    state: Mutex<BrokerState>,
    closed: watch::Sender<bool>,
}

impl MemoryBroker {
    /// Open a connection handle
    pub fn connect(config: &BrokerConfig) -> Arc<Self> {
        let (closed, _) = watch::channel(false);
        info!(url = %config.url(), "broker connected");

        Arc::new(Self {
            config: config.clone(),
            state: Mutex::new(BrokerState::default()),
            closed,
        })
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Messages waiting on a queue
    pub fn pending(&self, queue: &str) -> usize {
        self.state.lock().queues.get(queue).map_or(0, VecDeque::len)
    }

    /// Deliveries handed out and not yet acked or rejected
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    fn ensure_connected(&self) -> LaneResult<()> {
        if *self.closed.borrow() {
            return Err(LaneError::Disconnected);
        }
        Ok(())
    }

    /// Pop the next message for a consumer, if any
    fn try_take(&self, queue: &str, consumer: &ConsumerTag) -> Option<Delivery> {
        let mut state = self.state.lock();
        let pending = state.queues.get_mut(queue)?.pop_front()?;

        state.next_tag += 1;
        let tag = DeliveryTag(state.next_tag);
        state.in_flight.insert(tag, InFlight {
            queue: queue.to_string(),
            consumer: consumer.clone(),
            body: pending.body.clone(),
        });

        // Hand the wakeup on so idle consumers pick up the rest
        if state.queues.get(queue).is_some_and(|q| !q.is_empty()) {
            state.notifier(queue).notify_one();
        }

        Some(Delivery {
            tag,
            queue: queue.to_string(),
            body: pending.body,
            redelivered: pending.redelivered,
        })
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, queue: &str, body: Vec<u8>) -> LaneResult<()> {
        self.ensure_connected()?;

        let mut state = self.state.lock();
        let notify = state.notifier(queue);
        state
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(Pending { body, redelivered: false });
        notify.notify_one();

        debug!(queue, "message published");
        Ok(())
    }

    async fn consume(&self, queue: &str, consumer: &ConsumerTag) -> LaneResult<Delivery> {
        let mut closed = self.closed.subscribe();
        let notify = self.state.lock().notifier(queue);

        loop {
            if *closed.borrow_and_update() {
                return Err(LaneError::Disconnected);
            }

            if let Some(delivery) = self.try_take(queue, consumer) {
                debug!(queue, consumer = %consumer, tag = %delivery.tag, "message delivered");
                return Ok(delivery);
            }

            tokio::select! {
                _ = notify.notified() => {}
                changed = closed.changed() => {
                    if changed.is_err() {
                        return Err(LaneError::Disconnected);
                    }
                }
            }
        }
    }

    async fn ack(&self, tag: DeliveryTag) -> LaneResult<()> {
        self.ensure_connected()?;
        self.state
            .lock()
            .in_flight
            .remove(&tag)
            .map(|_| ())
            .ok_or(LaneError::UnknownDelivery(tag))
    }

    async fn reject(&self, tag: DeliveryTag, requeue: bool) -> LaneResult<()> {
        self.ensure_connected()?;

        let mut state = self.state.lock();
        let in_flight = state
            .in_flight
            .remove(&tag)
            .ok_or(LaneError::UnknownDelivery(tag))?;

        if requeue {
            debug!(queue = %in_flight.queue, tag = %tag, "delivery rejected, requeueing");
            state.requeue(in_flight);
        } else {
            warn!(queue = %in_flight.queue, tag = %tag, "delivery rejected and dropped");
        }
        Ok(())
    }

    async fn recover(&self, consumer: &ConsumerTag) -> LaneResult<usize> {
        self.ensure_connected()?;

        let mut state = self.state.lock();
        let mut tags: Vec<DeliveryTag> = state
            .in_flight
            .iter()
            .filter(|(_, in_flight)| &in_flight.consumer == consumer)
            .map(|(tag, _)| *tag)
            .collect();

        // Newest first, so the oldest delivery ends up at the head of the queue
        tags.sort_unstable_by(|a, b| b.cmp(a));

        for tag in &tags {
            if let Some(in_flight) = state.in_flight.remove(tag) {
                state.requeue(in_flight);
            }
        }

        if !tags.is_empty() {
            warn!(consumer = %consumer, requeued = tags.len(), "recovered deliveries of lost consumer");
        }
        Ok(tags.len())
    }

    async fn disconnect(&self) {
        if self.closed.send_replace(true) {
            return;
        }

        // Unacked messages go back to their queues, as on a closed AMQP channel
        let mut state = self.state.lock();
        let mut in_flight: Vec<(DeliveryTag, InFlight)> = state.in_flight.drain().collect();
        in_flight.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        for (_, message) in in_flight {
            state.requeue(message);
        }

        info!(url = %self.config.url(), "broker disconnected");
    }

    fn is_connected(&self) -> bool {
        !*self.closed.borrow()
    }
}
