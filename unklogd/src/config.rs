//! C11 — the config file grammar.
//!
//! Grounded on `config_parse`/`config_parse_line`/`config_apply*` in `config.c`. Parsing
//! is split from driver construction (§12): this module only produces a [`Config`] value,
//! a validated in-memory description of what the operator asked for. The lifecycle
//! coordinator (`lifecycle.rs`) is what turns a `Config` into live driver instances, so
//! `-n` validation mode can run everything in this module without touching a socket or
//! spawning a thread.

use std::fs;
use std::path::Path;

use digital_muon_common::logging::{LogLevel, LogSink};
use tracing::trace;

use crate::driver::{DriverOption, DriverOptions};
use crate::error::{DaemonError, ErrorCodeLocation};

/// Config grammar caps a line at 10 whitespace-separated tokens (`config.c`'s `MAX_ARGS`).
const MAX_TOKENS: usize = 10;

const DEFAULT_STATS_HOST: &str = "localhost";
const DEFAULT_STATS_PORT: u16 = 6789;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDirective {
    pub kind: String,
    pub options: DriverOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirective {
    pub kind: String,
    pub options: DriverOptions,
    /// The line's tokens after `output <kind>`, rejoined with single spaces — the
    /// exec driver's shell command line (§6).
    pub cmdline: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub inputs: Vec<InputDirective>,
    pub outputs: Vec<OutputDirective>,
    pub log: Option<(LogLevel, LogSink)>,
    pub stats: Option<(String, u16)>,
}

/// Strips a `#`-to-end-of-line comment, matching `line[strcspn(line, "#")] = '\0'`.
fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(before, _)| before)
}

fn parse_options(tokens: &[&str]) -> DriverOptions {
    tokens
        .iter()
        .map(|token| match token.split_once('=') {
            Some((key, value)) => DriverOption::new(key, value),
            None => DriverOption::new(*token, ""),
        })
        .collect()
}

pub fn parse(path: &Path) -> Result<Config, DaemonError> {
    let text = fs::read_to_string(path).map_err(|source| DaemonError::ConfigOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let mut config = Config::default();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() > MAX_TOKENS {
            return Err(DaemonError::ConfigTooManyTokens {
                line: line_no,
                text: line.to_string(),
            });
        }

        // Slice-pattern destructuring rather than `tokens[0]`/`tokens[1..]`: every
        // non-blank line has at least one token, but this way that invariant doesn't
        // need to be re-proved to `clippy::indexing_slicing` (denied below).
        let (directive_tok, rest) = match tokens.as_slice() {
            [directive_tok, rest @ ..] => (*directive_tok, rest),
            [] => continue,
        };
        let directive = directive_tok.to_ascii_lowercase();

        match directive.as_str() {
            "input" => {
                let (kind_tok, opt_toks) = match rest {
                    [kind_tok, opt_toks @ ..] => (*kind_tok, opt_toks),
                    [] => {
                        return Err(DaemonError::ConfigMissingArguments {
                            line: line_no,
                            directive,
                            required: 1,
                            location: ErrorCodeLocation::ConfigApplyInput,
                        });
                    }
                };
                let kind = kind_tok.to_ascii_lowercase();
                if kind != "kafka" {
                    return Err(DaemonError::ConfigUnsupportedInput {
                        line: line_no,
                        kind,
                    });
                }
                let options = parse_options(opt_toks);
                trace!(line = line_no, %kind, "config_apply_input");
                config.inputs.push(InputDirective { kind, options });
            }
            "output" => {
                let (kind_tok, opt_toks) = match rest {
                    [kind_tok, opt_toks @ ..] => (*kind_tok, opt_toks),
                    [] => {
                        return Err(DaemonError::ConfigMissingArguments {
                            line: line_no,
                            directive,
                            required: 1,
                            location: ErrorCodeLocation::ConfigApplyOutput,
                        });
                    }
                };
                let kind = kind_tok.to_ascii_lowercase();
                if kind != "elasticsearch" && kind != "exec" {
                    return Err(DaemonError::ConfigUnsupportedOutput {
                        line: line_no,
                        kind,
                    });
                }
                let options = parse_options(opt_toks);
                let cmdline = opt_toks.join(" ");
                trace!(line = line_no, %kind, %cmdline, "config_apply_output");
                config.outputs.push(OutputDirective {
                    kind,
                    options,
                    cmdline,
                });
            }
            "log" => {
                let (level_tok, sink_tok) = match rest {
                    [level_tok, sink_tok, ..] => (*level_tok, *sink_tok),
                    _ => {
                        return Err(DaemonError::ConfigMissingArguments {
                            line: line_no,
                            directive,
                            required: 2,
                            location: ErrorCodeLocation::ConfigApplyLog,
                        });
                    }
                };
                let level = digital_muon_common::logging::parse_level(level_tok).ok_or_else(
                    || DaemonError::ConfigInvalidLogLevel {
                        line: line_no,
                        level: level_tok.to_string(),
                    },
                )?;
                let sink = LogSink::parse(sink_tok);
                config.log = Some((level, sink));
            }
            "stats" => {
                let host = rest.first().map_or(DEFAULT_STATS_HOST, |h| h).to_string();
                let port = match rest.get(1) {
                    Some(raw) => {
                        raw.parse::<u16>()
                            .map_err(|source| DaemonError::ConfigInvalidStatsPort {
                                line: line_no,
                                port: raw.to_string(),
                                source,
                            })?
                    }
                    None => DEFAULT_STATS_PORT,
                };
                config.stats = Some((host, port));
            }
            other => {
                return Err(DaemonError::ConfigUnknownDirective {
                    line: line_no,
                    directive: other.to_string(),
                    location: ErrorCodeLocation::ConfigParseLine,
                });
            }
        }
    }

    trace!(
        inputs = config.inputs.len(),
        outputs = config.outputs.len(),
        "config_parse: parsed config"
    );
    Ok(config)
}
