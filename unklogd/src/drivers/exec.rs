//! Output driver: an arbitrary child-process pipe.
//!
//! Grounded on `exec_start`/`exec_payload`/`exec_stop` in `output_exec.c`. The original
//! spawns via `popen`/`pclose`, which hands a whole shell pipeline back as a `FILE *`;
//! this implementation spawns `sh -c <cmdline>` directly with a piped stdin, writing one
//! line per payload and respawning the child if a write ever fails.

use std::io::Write;
use std::process::{Child, Command, Stdio};

use tracing::trace;

use crate::driver::OutputDriver;
use crate::error::DriverError;

pub struct ExecOutput {
    cmdline: String,
    child: Option<Child>,
}

impl ExecOutput {
    pub fn new(cmdline: String) -> Self {
        ExecOutput {
            cmdline,
            child: None,
        }
    }

    fn spawn(&self) -> Result<Child, DriverError> {
        Command::new("sh")
            .arg("-c")
            .arg(&self.cmdline)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|source| DriverError::Io {
                context: "exec_start: cannot open stream",
                source,
            })
    }
}

impl OutputDriver for ExecOutput {
    fn start(&mut self) -> Result<(), DriverError> {
        trace!("exec_start: enter");
        self.child = Some(self.spawn()?);
        trace!("exec_start: success");
        Ok(())
    }

    fn payload(&mut self, _message_type: &str, bytes: &[u8]) -> Result<(), DriverError> {
        trace!("exec_payload: enter");

        if self.child.is_none() {
            self.child = Some(self.spawn()?);
        }

        let write_failed = {
            let child = self.child.as_mut().expect("child was just assigned above");
            let stdin = child
                .stdin
                .as_mut()
                .expect("child was spawned with a piped stdin");
            stdin.write_all(bytes).and_then(|()| stdin.write_all(b"\n")).is_err()
        };

        if write_failed {
            if let Some(mut child) = self.child.take() {
                drop(child.stdin.take());
                let _ = child.wait();
            }
        }

        trace!("exec_payload: success");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        trace!("exec_stop: enter");
        if let Some(mut child) = self.child.take() {
            drop(child.stdin.take());
        }
        trace!("exec_stop: success");
        Ok(())
    }
}
