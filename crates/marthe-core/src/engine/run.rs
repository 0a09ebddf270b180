//! Running the MARTHE executable.
//!
//! The simulator is a console program started in the model directory with
//! the `.rma` file as its argument. Its output is streamed line by line
//! while it runs, then scanned: MARTHE reports its own outcome in prose,
//! so a run counts as successful when the output announces a normal
//! termination, whatever the exit code says.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::core::models::model::MartheModel;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};

/// How the simulator is invoked.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Executable name resolved on PATH, or a direct path to it.
    pub exe_name: String,
    /// `.rma` file handed to the simulator; defaults to the model's own,
    /// relative to the model directory.
    pub rma_file: Option<PathBuf>,
    /// Keep the output out of the progress stream.
    pub silent: bool,
    /// Arguments appended after the `.rma` file.
    pub extra_args: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            exe_name: "marthe".to_string(),
            rma_file: None,
            silent: false,
            extra_args: Vec::new(),
        }
    }
}

/// The outcome of one simulator run.
///
/// A run that finished without announcing a normal termination is still a
/// report, not an error; callers decide what a failed simulation means.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Whether the output announced a normal termination.
    pub success: bool,
    /// Every output line, stdout and stderr merged in arrival order.
    pub lines: Vec<String>,
    /// The lines mentioning a failure or error.
    pub failed_lines: Vec<String>,
    pub elapsed: Duration,
}

/// Resolves an executable name the way a shell would: names with a path
/// separator are taken as they are, bare names are searched on PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if name.contains(std::path::MAIN_SEPARATOR) {
        return is_executable(direct).then(|| direct.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Runs the simulator on the model and captures its output.
///
/// Each line is stamped with the elapsed time and forwarded as a
/// [`Progress::ModelOutput`] event unless the configuration is silent.
///
/// # Errors
///
/// Fails when the executable cannot be found or started, or when the
/// output streams break down. A simulation that ran to completion but did
/// not terminate normally is reported through [`RunReport::success`].
pub fn run_model(
    model: &MartheModel,
    config: &RunConfig,
    reporter: &ProgressReporter,
) -> Result<RunReport, EngineError> {
    let exe = find_executable(&config.exe_name).ok_or_else(|| EngineError::ExeNotFound {
        name: config.exe_name.clone(),
    })?;
    let rma = config
        .rma_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.rma", model.name())));

    debug!(
        "Starting '{}' on '{}' in '{}'",
        exe.display(),
        rma.display(),
        model.dir().display()
    );
    let start = Instant::now();
    let mut child = Command::new(&exe)
        .arg(&rma)
        .args(&config.extra_args)
        .current_dir(model.dir())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| EngineError::Spawn {
            name: config.exe_name.clone(),
            source,
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| EngineError::Internal("child stdout was not piped".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| EngineError::Internal("child stderr was not piped".to_string()))?;

    let (sender, receiver) = mpsc::channel();
    let readers = [
        spawn_line_reader(stdout, sender.clone()),
        spawn_line_reader(stderr, sender),
    ];

    let mut lines = Vec::new();
    for line in receiver {
        if !config.silent {
            let stamped = format!("(elapsed:{:.0}s) --> {}", start.elapsed().as_secs_f64(), line);
            reporter.report(Progress::ModelOutput(stamped));
        }
        lines.push(line);
    }
    for reader in readers {
        reader
            .join()
            .map_err(|_| EngineError::Internal("output reader thread panicked".to_string()))?;
    }
    let status = child.wait()?;
    let elapsed = start.elapsed();

    let success = lines
        .iter()
        .any(|line| line.to_lowercase().contains("normal termination"));
    let failed_lines: Vec<String> = lines
        .iter()
        .filter(|line| {
            let lower = line.to_lowercase();
            lower.contains("fail") || lower.contains("error")
        })
        .cloned()
        .collect();
    debug!(
        "Simulator exited with {} after {:.1}s ({} lines, success: {})",
        status,
        elapsed.as_secs_f64(),
        lines.len(),
        success
    );
    Ok(RunReport {
        success,
        lines,
        failed_lines,
        elapsed,
    })
}

fn spawn_line_reader<R>(stream: R, sender: mpsc::Sender<String>) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            let Ok(line) = line else { break };
            if sender.send(line).is_err() {
                break;
            }
        }
    })
}
