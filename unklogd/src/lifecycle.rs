//! C10 — the lifecycle coordinator: config-driven construction, start order,
//! signal-triggered shutdown, and the main-thread reactor loop.
//!
//! Grounded on `daemon_init`/`daemon_run`/`daemon_shutdown` in `daemon.c`. The original
//! drives a `libuv` event loop with a timer and signal sources; this implementation rolls
//! its own minimal blocking reactor (§9) over the same three sources: a 5s tick, a
//! `ctrlc`-installed flag for SIGINT/SIGTERM/SIGHUP, and a non-blocking metrics TCP
//! accept poll.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use digital_muon_common::logging::LogHandle;
use tracing::{debug, info, trace, warn};

use crate::cli::Cli;
use crate::config::{self, Config};
use crate::dispatch::{DispatchTarget, Dispatcher};
use crate::driver::{InputDriver, OutputDriver};
use crate::drivers::elasticsearch::ElasticsearchOutput;
use crate::drivers::exec::ExecOutput;
use crate::drivers::kafka::KafkaInput;
use crate::error::{DaemonError, ErrorCodeLocation};
use crate::input_worker::{stop_input, InputWorker};
use crate::metrics::collector::{Collector, InputSnapshotSource, OutputSnapshotSource};
use crate::metrics::counter::Counter;
use crate::metrics::meter::Meter;
use crate::metrics::server::MetricsServer;
use crate::output_worker::{stop_output, OutputQueue, OutputWorker};

const TICK_INTERVAL: Duration = Duration::from_secs(5);
const REACTOR_POLL_INTERVAL: Duration = Duration::from_millis(50);
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

struct RunningInput {
    name: String,
    run_flag: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

struct RunningOutput {
    name: String,
    run_flag: Arc<AtomicBool>,
    queue: Arc<OutputQueue>,
    handle: thread::JoinHandle<()>,
}

fn build_input_driver(kind: &str, options: crate::driver::DriverOptions) -> Box<dyn InputDriver> {
    match kind {
        "kafka" => Box::new(KafkaInput::new(options)),
        other => unreachable!("config guarantees only known input kinds reach here: {other}"),
    }
}

fn build_output_driver(kind: &str, options: crate::driver::DriverOptions, cmdline: String) -> Box<dyn OutputDriver> {
    match kind {
        "elasticsearch" => Box::new(ElasticsearchOutput::new(options)),
        "exec" => Box::new(ExecOutput::new(cmdline)),
        other => unreachable!("config guarantees only known output kinds reach here: {other}"),
    }
}

/// Runs the daemon end to end: parse config, (in validate mode) print and exit, or
/// construct drivers, start workers, run the reactor until a signal fires, then shut
/// down. Mirrors `main`'s body in `daemon.c` from `config_parse` onward.
pub fn run(cli: &Cli, log_handle: &LogHandle) -> Result<(), DaemonError> {
    info!(config = %cli.config.display(), "main: parsing configuration");
    let config = config::parse(&cli.config)?;

    let cli_overrides_log = cli.level.is_some() || cli.log_file.is_some();
    if !cli_overrides_log {
        if let Some((level, sink)) = &config.log {
            log_handle.reconfigure(*level, sink)?;
        }
    }

    if cli.validate_only {
        println!("configuration is valid");
        return Ok(());
    }

    info!("main: starting workload");
    run_workload(config)
}

fn run_workload(config: Config) -> Result<(), DaemonError> {
    let global_count = Arc::new(Counter::new());

    let mut outputs = Vec::with_capacity(config.outputs.len());
    let mut output_snapshot_sources = Vec::with_capacity(config.outputs.len());
    let mut dispatch_targets = Vec::with_capacity(config.outputs.len());

    for (i, directive) in config.outputs.into_iter().enumerate() {
        let name = format!("{}-{i}", directive.kind);
        let mut driver = build_output_driver(&directive.kind, directive.options, directive.cmdline);

        driver.start().map_err(|source| DaemonError::DriverStart {
            name: name.clone(),
            location: ErrorCodeLocation::LifecycleStart,
            source,
        })?;

        let run_flag = Arc::new(AtomicBool::new(true));
        let queue = Arc::new(OutputQueue::new());
        let count = Arc::new(Counter::new());
        let errors = Arc::new(Counter::new());
        let meter = Arc::new(Meter::new());

        dispatch_targets.push(DispatchTarget {
            name: name.clone(),
            queue: queue.clone(),
        });
        output_snapshot_sources.push(OutputSnapshotSource {
            name: name.clone(),
            count: count.clone(),
            errors: errors.clone(),
            meter: meter.clone(),
        });

        let worker = OutputWorker {
            name: name.clone(),
            queue: queue.clone(),
            run_flag: run_flag.clone(),
            count,
            errors,
            meter,
            driver,
        };
        let handle = thread::Builder::new()
            .name(format!("output-{name}"))
            .spawn(move || worker.run())
            .expect("failed to spawn output worker thread");

        outputs.push(RunningOutput {
            name,
            run_flag,
            queue,
            handle,
        });
    }

    let dispatcher = Arc::new(Dispatcher::new(dispatch_targets, global_count.clone()));

    let mut inputs = Vec::with_capacity(config.inputs.len());
    let mut input_snapshot_sources = Vec::with_capacity(config.inputs.len());

    for (i, directive) in config.inputs.into_iter().enumerate() {
        let name = format!("{}-{i}", directive.kind);
        let driver = build_input_driver(&directive.kind, directive.options);

        let run_flag = Arc::new(AtomicBool::new(true));
        let count = Arc::new(Counter::new());

        input_snapshot_sources.push(InputSnapshotSource {
            name: name.clone(),
            count: count.clone(),
        });

        let worker = InputWorker {
            name: name.clone(),
            run_flag: run_flag.clone(),
            count,
            dispatcher: dispatcher.clone(),
            driver,
        };
        let handle = thread::Builder::new()
            .name(format!("input-{name}"))
            .spawn(move || worker.run())
            .expect("failed to spawn input worker thread");

        inputs.push(RunningInput {
            name,
            run_flag,
            handle,
        });
    }

    let collector = Collector::new(global_count, input_snapshot_sources, output_snapshot_sources);

    let metrics_server = match &config.stats {
        Some((host, port)) => {
            let addr = format!("{host}:{port}");
            info!(%addr, "config_apply_stats: setting up statistics");
            Some(
                MetricsServer::bind(&addr, collector.snapshot_handle()).map_err(|source| {
                    DaemonError::MetricsBind {
                        addr: addr.clone(),
                        source,
                    }
                })?,
            )
        }
        None => None,
    };

    let shutdown_requested = Arc::new(AtomicBool::new(false));
    let signal_flag = shutdown_requested.clone();
    ctrlc::set_handler(move || {
        signal_flag.store(true, Ordering::SeqCst);
    })?;

    let mut last_tick = Instant::now();
    collector.tick();

    while !shutdown_requested.load(Ordering::SeqCst) {
        if let Some(server) = &metrics_server {
            server.poll_once();
        }

        if last_tick.elapsed() >= TICK_INTERVAL {
            collector.tick();
            last_tick = Instant::now();
        }

        thread::sleep(REACTOR_POLL_INTERVAL);
    }

    shutdown(inputs, outputs)
}

fn shutdown(inputs: Vec<RunningInput>, outputs: Vec<RunningOutput>) -> Result<(), DaemonError> {
    warn!("daemon_shutdown: stopping all inputs");
    for input in &inputs {
        stop_input(&input.run_flag);
    }
    for input in inputs {
        join_with_timeout(&input.name, input.handle, JOIN_TIMEOUT);
    }

    warn!("daemon_shutdown: stopping all outputs");
    for output in &outputs {
        stop_output(&output.run_flag, &output.queue);
    }
    for output in outputs {
        join_with_timeout(&output.name, output.handle, JOIN_TIMEOUT);
    }

    debug!("daemon_shutdown: stopping event loop");
    Ok(())
}

/// Waits for `handle` to finish, up to `timeout`, without blocking process exit
/// indefinitely if it doesn't (§4.6: joins are attempted, not guaranteed).
fn join_with_timeout(name: &str, handle: thread::JoinHandle<()>, timeout: Duration) {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = handle.join();
        let _ = tx.send(());
    });

    if rx.recv_timeout(timeout).is_err() {
        warn!(worker = %name, "daemon_shutdown: join timed out, proceeding with shutdown");
    } else {
        trace!(worker = %name, "daemon_shutdown: joined");
    }
}
