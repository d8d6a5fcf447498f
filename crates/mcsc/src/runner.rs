//! Running the solver as a child process on a background thread.
//!
//! The child is spawned on the caller's thread, so a missing interpreter is
//! reported immediately. Waiting for it happens on a dedicated thread that
//! delivers a single [`RunResult`] over a channel and, if one was given,
//! invokes a completion callback first. There is no cancellation: once
//! started, the solver runs until it exits.

use std::{
    ffi::OsString,
    fmt,
    fs::File,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::mpsc::{self, Receiver, TryRecvError},
    thread::{self, JoinHandle},
};

use crate::McscError;

/// Outcome delivered once the solver process has exited.
pub type RunResult = Result<RunOutcome, McscError>;

/// Completion callback; runs on the solver thread, not the caller's.
pub type CompletionCallback = Box<dyn FnOnce(&RunResult) + Send + 'static>;

/// Where a child's stdout or stderr goes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputSink {
    /// Share the parent's stream.
    #[default]
    Inherit,
    /// Discard.
    Null,
    /// Capture into a file, created or truncated at spawn time.
    File(PathBuf),
}

impl OutputSink {
    fn stdio(&self) -> std::io::Result<Stdio> {
        Ok(match self {
            Self::Inherit => Stdio::inherit(),
            Self::Null => Stdio::null(),
            Self::File(path) => Stdio::from(File::create(path)?),
        })
    }

    fn path(&self) -> Option<PathBuf> {
        match self {
            Self::File(path) => Some(path.clone()),
            _ => None,
        }
    }
}

/// A fully specified solver invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverCommand {
    program: PathBuf,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl SolverCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// `octave gocal.m --config=<cfg>`, run from the solver directory.
    pub fn octave(octave: &Path, mcsc_dir: &Path, cfg: &Path) -> Self {
        let mut config_arg = OsString::from("--config=");
        config_arg.push(cfg);
        Self::new(octave)
            .arg("gocal.m")
            .arg(config_arg)
            .current_dir(mcsc_dir)
    }

    /// `matlab -nodesktop -nosplash -r "cd('<dir>'); gocal_func('<cfg>'); exit"`.
    pub fn matlab(matlab: &Path, mcsc_dir: &Path, cfg: &Path) -> Self {
        let script = format!(
            "cd('{}'); gocal_func('{}'); exit",
            mcsc_dir.display(),
            cfg.display()
        );
        Self::new(matlab)
            .arg("-nodesktop")
            .arg("-nosplash")
            .arg("-r")
            .arg(script)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

impl fmt::Display for SolverCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for a in &self.args {
            write!(f, " {:?}", a)?;
        }
        if let Some(cwd) = &self.cwd {
            write!(f, " (in {})", cwd.display())?;
        }
        Ok(())
    }
}

/// What is known once the solver has exited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    pub result_dir: PathBuf,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Treat a non-zero exit as an error.
    ///
    /// The runner only guarantees the solver ran to completion; this is
    /// where callers decide that it also has to have succeeded.
    pub fn check(self) -> Result<Self, McscError> {
        if self.success() {
            Ok(self)
        } else {
            Err(McscError::ProcessExit {
                code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// Handle to a running (or finished) solver.
#[derive(Debug)]
pub struct SolverHandle {
    pid: u32,
    result_dir: PathBuf,
    done: Receiver<RunResult>,
    finished: Option<RunResult>,
    worker: Option<JoinHandle<()>>,
}

impl SolverHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn result_dir(&self) -> &Path {
        &self.result_dir
    }

    /// Poll for completion without blocking.
    pub fn try_outcome(&mut self) -> Option<&RunResult> {
        if self.finished.is_none() {
            match self.done.try_recv() {
                Ok(result) => self.finished = Some(result),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => self.finished = Some(Err(McscError::WorkerLost)),
            }
        }
        self.finished.as_ref()
    }

    /// Block until the solver exits.
    pub fn wait(mut self) -> RunResult {
        let result = match self.finished.take() {
            Some(result) => result,
            None => self.done.recv().unwrap_or(Err(McscError::WorkerLost)),
        };
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("solver completion callback panicked");
            }
        }
        result
    }
}

/// Start `command` and return immediately.
pub fn spawn(
    command: &SolverCommand,
    result_dir: impl Into<PathBuf>,
    stdout: OutputSink,
    stderr: OutputSink,
) -> Result<SolverHandle, McscError> {
    spawn_inner(command, result_dir.into(), stdout, stderr, None)
}

/// Start `command`; `on_complete` is invoked exactly once, on the solver
/// thread, after the process exits.
pub fn spawn_with_callback<F>(
    command: &SolverCommand,
    result_dir: impl Into<PathBuf>,
    stdout: OutputSink,
    stderr: OutputSink,
    on_complete: F,
) -> Result<SolverHandle, McscError>
where
    F: FnOnce(&RunResult) + Send + 'static,
{
    spawn_inner(
        command,
        result_dir.into(),
        stdout,
        stderr,
        Some(Box::new(on_complete)),
    )
}

fn spawn_inner(
    command: &SolverCommand,
    result_dir: PathBuf,
    stdout: OutputSink,
    stderr: OutputSink,
    on_complete: Option<CompletionCallback>,
) -> Result<SolverHandle, McscError> {
    log::debug!("running cmd {command}");

    let mut child = command
        .to_command()
        .stdin(Stdio::null())
        .stdout(stdout.stdio()?)
        .stderr(stderr.stdio()?)
        .spawn()?;
    let pid = child.id();

    let (tx, rx) = mpsc::channel();
    let outcome_dir = result_dir.clone();
    let (stdout_path, stderr_path) = (stdout.path(), stderr.path());

    let worker = thread::Builder::new()
        .name("mcsc-solver".to_string())
        .spawn(move || {
            let result = child
                .wait()
                .map(|status| RunOutcome {
                    result_dir: outcome_dir,
                    exit_code: status.code(),
                    stdout: stdout_path,
                    stderr: stderr_path,
                })
                .map_err(McscError::from);

            match &result {
                Ok(outcome) => log::info!(
                    "solver (pid {pid}) finished with exit code {:?}",
                    outcome.exit_code
                ),
                Err(err) => log::warn!("waiting for solver (pid {pid}) failed: {err}"),
            }

            if let Some(cb) = on_complete {
                cb(&result);
            }
            // The handle may already be gone in fire-and-forget use.
            let _ = tx.send(result);
        })?;

    Ok(SolverHandle {
        pid,
        result_dir,
        done: rx,
        finished: None,
        worker: Some(worker),
    })
}
