//! Input driver: a consumer-group subscription to a partitioned message bus.
//!
//! Grounded on `kafka_start`/`kafka_stop`/`kafka_handle`/`kafka_rebalance` in
//! `input_kafka.c`. One simplification from the original's separate global/topic
//! `rd_kafka_conf_t`/`rd_kafka_topic_conf_t`: the `rdkafka` crate exposes a single flat
//! `ClientConfig` and lets librdkafka route topic-level keys (`auto.offset.reset` and
//! similar) internally, so this driver applies every option — global and per-topic alike
//! — to the same config object, in the order given, letting later entries win (matching
//! `thuykaka-rust-common`'s example `ClientConfig` usage).

use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer, ConsumerContext};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::ClientContext;
use tracing::{debug, error, info, trace};

use crate::driver::{DriverOptions, InputContext, InputDriver};
use crate::error::DriverError;

const DEFAULT_TOPIC: &str = "logs";
const POLL_TIMEOUT: Duration = Duration::from_millis(300);

/// Logs rebalance events; partition assign/revoke itself is handled by the crate's
/// default `ConsumerContext::rebalance` implementation (assign on `Assign`, unassign on
/// `Revoke` or any other/error event — matching the original's "unknown events revoke").
struct RebalanceLogger;

impl ClientContext for RebalanceLogger {}

impl ConsumerContext for RebalanceLogger {
    fn pre_rebalance(&self, _consumer: &BaseConsumer<Self>, rebalance: &rdkafka::consumer::Rebalance<'_>) {
        info!(?rebalance, "kafka_rebalance: consumer group rebalanced");
    }
}

pub struct KafkaInput {
    options: DriverOptions,
    consumer: Option<BaseConsumer<RebalanceLogger>>,
}

impl KafkaInput {
    pub fn new(options: DriverOptions) -> Self {
        KafkaInput {
            options,
            consumer: None,
        }
    }

    fn build_consumer(&self) -> Result<(BaseConsumer<RebalanceLogger>, String), DriverError> {
        let mut config = ClientConfig::new();
        config
            .set("offset.store.method", "broker")
            .set("enable.partition.eof", "true");

        let mut topic: Option<&str> = None;
        for opt in &self.options {
            if opt.key.eq_ignore_ascii_case("topic") {
                topic = Some(opt.value.as_str());
                debug!(topic = %opt.value, "kafka_start: setting topic");
                continue;
            }
            debug!(key = %opt.key, value = %opt.value, "kafka_start: applying option");
            config.set(&opt.key, &opt.value);
        }

        let topic = topic.unwrap_or(DEFAULT_TOPIC).to_string();

        let consumer: BaseConsumer<RebalanceLogger> = config
            .create_with_context(RebalanceLogger)
            .map_err(|e| DriverError::Kafka {
                context: "kafka_start: cannot create consumer",
                source: e,
            })?;

        Ok((consumer, topic))
    }
}

impl InputDriver for KafkaInput {
    fn start(&mut self, ctx: &mut InputContext<'_>) -> Result<(), DriverError> {
        trace!("kafka_start: enter");

        let (consumer, topic) = self.build_consumer()?;
        consumer
            .subscribe(&[&topic])
            .map_err(|e| DriverError::Kafka {
                context: "kafka_start: cannot subscribe",
                source: e,
            })?;
        self.consumer = Some(consumer);

        trace!("kafka_start: polling messages");
        while ctx.running() {
            let consumer = self
                .consumer
                .as_ref()
                .expect("consumer was just assigned above");
            match consumer.poll(POLL_TIMEOUT) {
                None => continue,
                Some(Err(KafkaError::PartitionEOF(partition))) => {
                    debug!(partition, "kafka_handle: reached end of partition");
                }
                Some(Err(e)) => {
                    error!(error = %e, "kafka_handle: kafka error");
                }
                Some(Ok(msg)) => {
                    ctx.emit(msg.payload().unwrap_or(&[]));
                }
            }
        }

        if let Some(consumer) = &self.consumer {
            consumer.unsubscribe();
        }
        info!("kafka_start: stopped subscription");
        trace!("kafka_start: success");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        trace!("kafka_stop: enter");
        // Dropping the consumer runs librdkafka's close/destroy sequence; the crate has
        // no separate "wait up to 1s for destroy" knob to mirror explicitly.
        self.consumer = None;
        trace!("kafka_stop: success");
        Ok(())
    }
}
