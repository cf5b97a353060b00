//! Runtime access through a docker-compatible command line client.

use crate::error::{Result, SaveError};
use crate::metadata::ImageInspect;
use log::{debug, info, warn};
use std::io::{self, Read};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

pub(crate) struct CommandRuntime {
    program: &'static str,
}

impl CommandRuntime {
    pub(crate) fn new(program: &'static str) -> Self {
        Self { program }
    }

    pub(crate) fn program(&self) -> &'static str {
        self.program
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }

    /// Checks that the client binary can be executed at all.
    pub(crate) fn check_available(&self) -> Result<()> {
        let output = Command::new(self.program)
            .arg("--version")
            .output()
            .map_err(|e| SaveError::Runtime {
                command: self.describe(&["--version"]),
                message: format!("{}. Is {} installed?", e, self.program),
            })?;

        if !output.status.success() {
            return Err(SaveError::Runtime {
                command: self.describe(&["--version"]),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn inspect(&self, image: &str) -> Result<ImageInspect> {
        let args = ["image", "inspect", image];
        debug!("Running {}", self.describe(&args));

        let output = Command::new(self.program)
            .args(args)
            .output()
            .map_err(|e| SaveError::Runtime {
                command: self.describe(&args),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if error.to_lowercase().contains("no such") {
                return Err(SaveError::NotFound(image.to_string()));
            }
            return Err(SaveError::Runtime {
                command: self.describe(&args),
                message: error,
            });
        }

        let inspects: Vec<ImageInspect> =
            serde_json::from_slice(&output.stdout).map_err(|e| SaveError::Runtime {
                command: self.describe(&args),
                message: format!("unexpected output: {}", e),
            })?;
        inspects
            .into_iter()
            .next()
            .ok_or_else(|| SaveError::NotFound(image.to_string()))
    }

    /// Starts `<program> save IMAGE...` and returns its stdout as a stream.
    pub(crate) fn save(&self, images: &[String]) -> Result<ExportStream> {
        let mut args = vec!["save"];
        args.extend(images.iter().map(String::as_str));
        info!("Running {}", self.describe(&args));

        let mut command = Command::new(self.program);
        command.args(&args);
        ExportStream::spawn(command, self.describe(&args))
    }
}

/// Stderr kept from a `save` command for its error message.
const STDERR_LIMIT: usize = 16 * 1024;

/// Reads `stderr` to the end on its own thread, keeping the last
/// [`STDERR_LIMIT`] bytes.
fn drain_stderr(mut stderr: ChildStderr) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut kept = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match stderr.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    kept.extend_from_slice(&buf[..n]);
                    if kept.len() > STDERR_LIMIT {
                        kept.drain(..kept.len() - STDERR_LIMIT);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Could not read runtime stderr: {}", e);
                    break;
                }
            }
        }
        String::from_utf8_lossy(&kept).into_owned()
    })
}

/// Stdout of a running `save` command.
///
/// Reaching EOF waits for the process; a non-zero exit turns into a read
/// error carrying the tail of the command's stderr.
pub struct ExportStream {
    command: String,
    child: Option<Child>,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
}

impl ExportStream {
    fn spawn(mut command: Command, description: String) -> Result<Self> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SaveError::Runtime {
                command: description.clone(),
                message: e.to_string(),
            })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            if let Err(e) = child.kill() {
                warn!("Could not stop {}: {}", description, e);
            }
            return Err(SaveError::Runtime {
                command: description,
                message: "failed to capture output".to_string(),
            });
        };

        Ok(ExportStream {
            command: description,
            child: Some(child),
            stdout,
            stderr: Some(drain_stderr(stderr)),
        })
    }

    fn stderr_message(&mut self) -> String {
        match self.stderr.take().map(JoinHandle::join) {
            Some(Ok(message)) => message,
            Some(Err(_)) => {
                warn!("Reading stderr of {} panicked", self.command);
                String::new()
            }
            None => String::new(),
        }
    }
}

impl Read for ExportStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.stdout.read(buf)?;
        if n > 0 || buf.is_empty() {
            return Ok(n);
        }

        if let Some(mut child) = self.child.take() {
            let status = child.wait()?;
            if !status.success() {
                let message = self.stderr_message();
                return Err(io::Error::other(format!(
                    "{} failed ({}): {}",
                    self.command,
                    status,
                    message.trim()
                )));
            }
        }
        Ok(0)
    }
}

impl Drop for ExportStream {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
