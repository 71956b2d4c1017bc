// src/queue/nats.rs
//! NATS JetStream task queue.
//!
//! Tasks live on a work-queue stream and are consumed through one durable pull
//! consumer shared by every worker, with explicit acks. A message that is not
//! acked within `ack_wait`, or that is nak'ed, is redelivered up to
//! `max_deliver` times.

use anyhow::Result;
use async_nats::jetstream::{
    self,
    consumer::{pull, AckPolicy, Consumer},
    stream::{Config as StreamConfig, RetentionPolicy, StorageType},
    AckKind,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{decode_task, Acknowledger, Delivery, TaskQueue};
use crate::core::config_manager::BrokerConfig;
use crate::types::ScrapeTask;

/// How long one pull request waits on the server for a message
const PULL_EXPIRES: Duration = Duration::from_secs(5);

pub struct NatsTaskQueue {
    jetstream: jetstream::Context,
    consumer: Consumer<pull::Config>,
    subject: String,
}

impl NatsTaskQueue {
    pub async fn connect(config: &BrokerConfig) -> Result<Self> {
        info!("Connecting to task broker at {}", config.url);

        let client = async_nats::connect(&config.url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to NATS at {}: {}", config.url, e))?;
        let jetstream = jetstream::new(client);

        let stream = jetstream
            .get_or_create_stream(StreamConfig {
                name: config.stream.clone(),
                subjects: vec![config.subject.clone()],
                retention: RetentionPolicy::WorkQueue,
                storage: StorageType::File,
                ..Default::default()
            })
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create stream {}: {}", config.stream, e))?;

        let consumer = stream
            .get_or_create_consumer(
                &config.consumer,
                pull::Config {
                    durable_name: Some(config.consumer.clone()),
                    filter_subject: config.subject.clone(),
                    ack_policy: AckPolicy::Explicit,
                    ack_wait: Duration::from_secs(config.ack_wait_secs),
                    max_deliver: config.max_deliver,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| {
                anyhow::anyhow!("Failed to create consumer {}: {}", config.consumer, e)
            })?;

        debug!(
            "Task queue ready: stream={}, subject={}, consumer={}",
            config.stream, config.subject, config.consumer
        );

        Ok(Self {
            jetstream,
            consumer,
            subject: config.subject.clone(),
        })
    }
}

#[async_trait]
impl TaskQueue for NatsTaskQueue {
    async fn submit(&self, task: &ScrapeTask) -> Result<()> {
        let payload = serde_json::to_vec(task)?;

        self.jetstream
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to publish task '{}': {}", task.term, e))?
            .await
            .map_err(|e| anyhow::anyhow!("Broker did not confirm task '{}': {}", task.term, e))?;

        Ok(())
    }

    async fn receive(&self) -> Result<Option<Delivery>> {
        let mut batch = self
            .consumer
            .batch()
            .max_messages(1)
            .expires(PULL_EXPIRES)
            .messages()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to pull from task queue: {}", e))?;

        let message = match batch.next().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => anyhow::bail!("Failed to receive task: {}", e),
            None => return Ok(None),
        };

        let attempt = message
            .info()
            .map(|info| info.delivered.max(1) as u64)
            .unwrap_or(1);

        match decode_task(&message.payload) {
            Ok(task) => Ok(Some(Delivery::new(
                task,
                attempt,
                Box::new(NatsAck { message }),
            ))),
            Err(e) => {
                // Poison message: terminate so it is never redelivered
                warn!("Dropping undecodable task message: {}", e);
                message
                    .ack_with(AckKind::Term)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to terminate message: {}", e))?;
                Ok(None)
            }
        }
    }
}

struct NatsAck {
    message: jetstream::Message,
}

#[async_trait]
impl Acknowledger for NatsAck {
    async fn ack(&self) -> Result<()> {
        self.message
            .ack()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to ack message: {}", e))
    }

    async fn retry(&self) -> Result<()> {
        self.message
            .ack_with(AckKind::Nak(None))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to nak message: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_error_handling() {
        let config = BrokerConfig {
            url: "nats://127.0.0.1:1".to_string(),
            ..Default::default()
        };

        match NatsTaskQueue::connect(&config).await {
            Ok(_) => panic!("Should fail to connect to a closed port"),
            Err(e) => assert!(e.to_string().contains("Failed to connect to NATS")),
        }
    }
}
