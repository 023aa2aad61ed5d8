//! Polls a running daemon's metrics endpoint on an interval and prints each snapshot.
//!
//! The metrics server (§4.5) serves its current snapshot as plain text to any connection
//! and then closes it — there is nothing to subscribe to, so "tailing" here just means
//! reconnecting on a fixed interval and printing what comes back.

use std::time::Duration;

use clap::Args;
use miette::IntoDiagnostic;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Args)]
pub struct Opts {
    /// Address of a running daemon's metrics endpoint, e.g. "localhost:6789".
    #[clap(long, default_value = "localhost:6789")]
    addr: String,

    /// Seconds between polls. The daemon only refreshes its snapshot every 5s, so
    /// polling faster than that just reprints the same numbers.
    #[clap(long, default_value_t = 5)]
    interval: u64,

    /// Poll once and exit, instead of polling forever.
    #[clap(long)]
    once: bool,
}

pub(crate) async fn run(opts: Opts) -> miette::Result<()> {
    loop {
        match fetch_snapshot(&opts.addr).await {
            Ok(text) => print!("{text}"),
            Err(e) => warn!("metrics-tail: could not reach {}: {e}", opts.addr),
        }

        if opts.once {
            return Ok(());
        }
        sleep(Duration::from_secs(opts.interval)).await;
    }
}

async fn fetch_snapshot(addr: &str) -> miette::Result<String> {
    let mut stream = TcpStream::connect(addr).await.into_diagnostic()?;
    let mut buf = String::new();
    stream.read_to_string(&mut buf).await.into_diagnostic()?;
    Ok(buf)
}
