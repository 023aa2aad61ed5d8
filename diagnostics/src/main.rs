mod kafka_tail;
mod metrics_tail;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(author, version = digital_muon_common::version!(), about)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Dumps messages from a topic as they arrive.
    #[clap(name = "kafka-tail")]
    KafkaTail(kafka_tail::Opts),

    /// Polls a running daemon's metrics endpoint and prints each snapshot.
    #[clap(name = "metrics-tail")]
    MetricsTail(metrics_tail::Opts),
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::KafkaTail(opts) => kafka_tail::run(opts).await,
        Commands::MetricsTail(opts) => metrics_tail::run(opts).await,
    }
}
