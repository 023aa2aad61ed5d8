//! Dumps messages from a topic as they arrive, one line per message — the operator's
//! quick way to see what a configured `kafka` input would actually consume.

use clap::Args;
use miette::IntoDiagnostic;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;
use tracing::{debug, warn};

#[derive(Debug, Args)]
pub struct Opts {
    /// Kafka bootstrap servers, e.g. "localhost:9092".
    #[clap(long)]
    broker: String,

    /// Kafka consumer group to join. A fresh group name gets its own read position.
    #[clap(long = "group", default_value = "unklogd-diagnostics")]
    consumer_group: String,

    /// The topic to consume from.
    #[clap(long, default_value = "logs")]
    topic: String,
}

pub(crate) async fn run(opts: Opts) -> miette::Result<()> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &opts.broker)
        .set("group.id", &opts.consumer_group)
        .set("enable.partition.eof", "false")
        .set("session.timeout.ms", "6000")
        .set("enable.auto.commit", "false")
        .create()
        .into_diagnostic()?;

    consumer.subscribe(&[&opts.topic]).into_diagnostic()?;

    loop {
        match consumer.recv().await {
            Err(e) => warn!("kafka error: {e}"),
            Ok(msg) => {
                debug!(
                    partition = msg.partition(),
                    offset = msg.offset(),
                    "received message"
                );
                match msg.payload() {
                    Some(payload) => match std::str::from_utf8(payload) {
                        Ok(text) => println!("{text}"),
                        Err(_) => println!("{payload:?}"),
                    },
                    None => println!("<empty payload>"),
                }
            }
        }
    }
}
