use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use ledger_core::{AppError, Result};
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::ClientBuilder;
use rskafka::record::Record;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::types::{PaymentEventPayload, TransactionEventPayload};

#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub brokers: Vec<String>,
    pub compression: CompressionType,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub enum CompressionType {
    #[default]
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl From<CompressionType> for Compression {
    fn from(ct: CompressionType) -> Self {
        match ct {
            CompressionType::None => Compression::NoCompression,
            CompressionType::Gzip => Compression::Gzip,
            CompressionType::Snappy => Compression::Snappy,
            CompressionType::Lz4 => Compression::Lz4,
            CompressionType::Zstd => Compression::Zstd,
        }
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            compression: CompressionType::default(),
            retry_count: 3,
            retry_delay_ms: 100,
        }
    }
}

/// Publishes `TRANSACTION_*` and `PAYMENT_*` events to their two topics
/// (§6 "Event Publisher", §6.3). A persistent publish failure is logged
/// and swallowed rather than propagated: the saga step that triggered the
/// event has already durably committed its own state change, and must
/// never be rolled back just because the event bus is unavailable.
pub struct EventPublisher {
    config: ProducerConfig,
    partition_clients: Arc<RwLock<BTreeMap<String, Arc<PartitionClient>>>>,
    client: Option<Arc<rskafka::client::Client>>,
}

impl EventPublisher {
    pub fn new(config: ProducerConfig) -> Self {
        Self {
            config,
            partition_clients: Arc::new(RwLock::new(BTreeMap::new())),
            client: None,
        }
    }

    pub async fn connect(&mut self) -> Result<()> {
        let client = ClientBuilder::new(self.config.brokers.clone())
            .build()
            .await
            .map_err(|e| AppError::Internal(anyhow!("failed to connect to Kafka: {e}")))?;

        self.client = Some(Arc::new(client));
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    async fn get_partition_client(&self, topic: &str) -> Result<Arc<PartitionClient>> {
        {
            let clients = self.partition_clients.read().await;
            if let Some(client) = clients.get(topic) {
                return Ok(client.clone());
            }
        }

        let kafka_client = self
            .client
            .as_ref()
            .ok_or_else(|| AppError::Internal(anyhow!("Kafka client not connected")))?;

        let partition_client = kafka_client
            .partition_client(topic.to_string(), 0, UnknownTopicHandling::Retry)
            .await
            .map_err(|e| AppError::Internal(anyhow!("failed to get partition client: {e}")))?;

        let client = Arc::new(partition_client);
        let mut clients = self.partition_clients.write().await;
        clients.insert(topic.to_string(), client.clone());
        Ok(client)
    }

    async fn send<T: Serialize>(&self, topic: &str, key: &str, payload: &T) -> Result<()> {
        let partition_client = self.get_partition_client(topic).await?;
        let value = serde_json::to_vec(payload)
            .map_err(|e| AppError::Internal(anyhow!("failed to serialize event: {e}")))?;

        let record = Record {
            key: Some(key.as_bytes().to_vec()),
            value: Some(value),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };

        let mut last_error = None;
        for attempt in 0..=self.config.retry_count {
            if attempt > 0 {
                warn!(topic, attempt, "retrying event publish");
                tokio::time::sleep(Duration::from_millis(
                    self.config.retry_delay_ms * attempt as u64,
                ))
                .await;
            }

            match partition_client
                .produce(vec![record.clone()], self.config.compression.into())
                .await
            {
                Ok(offsets) => {
                    debug!(topic, offset = ?offsets.first(), "event published");
                    return Ok(());
                }
                Err(e) => {
                    error!(topic, error = %e, "event publish attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(AppError::Internal(anyhow!(
            "failed to publish to {topic} after {} retries: {last_error:?}",
            self.config.retry_count
        )))
    }

    /// Publishes a transaction event. Never returns an error to the caller:
    /// a failure is logged and the saga continues, since the transaction
    /// record itself is already the durable source of truth.
    pub async fn publish_transaction_event(&self, payload: &TransactionEventPayload) {
        let topic = TransactionEventPayload::topic();
        match self.send(topic, &payload.partition_key(), payload).await {
            Ok(()) => crate::observability::get_metrics()
                .record_event_published(event_type_str(&payload.event_type)),
            Err(err) => error!(
                transaction_id = %payload.transaction_id,
                %err,
                "giving up on transaction event after exhausting retries"
            ),
        }
    }

    /// Publishes a payment event. Same best-effort contract as
    /// [`Self::publish_transaction_event`].
    pub async fn publish_payment_event(&self, payload: &PaymentEventPayload) {
        let topic = PaymentEventPayload::topic();
        match self.send(topic, &payload.partition_key(), payload).await {
            Ok(()) => crate::observability::get_metrics()
                .record_event_published(payment_event_type_str(&payload.event_type)),
            Err(err) => error!(
                payment_id = %payload.payment_id,
                %err,
                "giving up on payment event after exhausting retries"
            ),
        }
    }
}

fn event_type_str(event_type: &super::types::TransactionEventType) -> &'static str {
    match event_type {
        super::types::TransactionEventType::TransactionCreated => "TRANSACTION_CREATED",
        super::types::TransactionEventType::TransactionCompleted => "TRANSACTION_COMPLETED",
        super::types::TransactionEventType::TransactionFailed => "TRANSACTION_FAILED",
    }
}

fn payment_event_type_str(event_type: &super::types::PaymentEventType) -> &'static str {
    match event_type {
        super::types::PaymentEventType::PaymentInitiated => "PAYMENT_INITIATED",
        super::types::PaymentEventType::PaymentProcessing => "PAYMENT_PROCESSING",
        super::types::PaymentEventType::PaymentCompleted => "PAYMENT_COMPLETED",
        super::types::PaymentEventType::PaymentFailed => "PAYMENT_FAILED",
        super::types::PaymentEventType::PaymentCancelled => "PAYMENT_CANCELLED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_config_default_matches_three_retries() {
        let config = ProducerConfig::default();
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.brokers, vec!["localhost:9092".to_string()]);
    }

    #[test]
    fn compression_conversion_round_trips() {
        assert!(matches!(
            Compression::from(CompressionType::None),
            Compression::NoCompression
        ));
        assert!(matches!(
            Compression::from(CompressionType::Zstd),
            Compression::Zstd
        ));
    }

    #[test]
    fn publisher_starts_disconnected() {
        let publisher = EventPublisher::new(ProducerConfig::default());
        assert!(!publisher.is_connected());
    }
}
