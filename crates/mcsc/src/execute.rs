//! Preparing a result directory and launching the solver on it.

use std::{
    fs,
    path::{Path, PathBuf},
};

use mcsc_core::{
    rad_file_name, CameraOrder, CAMERA_ORDER_FILE, CONFIG_FILE, INPUT_FILES, STDERR_FILE,
    STDOUT_FILE,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    runner, McscError, MultiCamSelfCal, OutputSink, RunResult, SolverCommand, SolverHandle,
};

/// How [`MultiCamSelfCal::execute`] sets up a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Result directory; `<out_dir>/result` when unset.
    pub dest: Option<PathBuf>,
    /// Capture solver output into `STDOUT`/`STDERR` in the result directory
    /// instead of inheriting the parent's streams.
    pub silent: bool,
    /// Copy the input files into the result directory. When false they are
    /// only checked for presence in the working directory.
    pub copy_files: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dest: None,
            silent: true,
            copy_files: true,
        }
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl MultiCamSelfCal {
    /// Resolve and populate the result directory for a run.
    pub fn prepare_result_dir(&self, opts: &ExecuteOptions) -> Result<PathBuf, McscError> {
        let dest = match &opts.dest {
            Some(dest) => std::path::absolute(dest)?,
            None => self.out_dir.join("result"),
        };
        fs::create_dir_all(&dest)?;

        let in_place = same_dir(&dest, &self.out_dir);
        for name in INPUT_FILES {
            let src = self.out_dir.join(name);
            if !src.is_file() {
                return Err(McscError::MissingFile(src));
            }
            if opts.copy_files && !in_place {
                fs::copy(&src, dest.join(name))?;
            }
        }

        if opts.copy_files && !in_place {
            for rad in self.rad_files()? {
                if let Some(name) = rad.file_name() {
                    fs::copy(&rad, dest.join(name))?;
                }
            }
        }
        Ok(dest)
    }

    /// `.rad` files that belong to the cameras in `camera_order.txt`.
    fn rad_files(&self) -> Result<Vec<PathBuf>, McscError> {
        let order = CameraOrder::parse(&fs::read_to_string(self.out_dir.join(CAMERA_ORDER_FILE))?);
        Ok((0..order.len())
            .map(|i| self.out_dir.join(rad_file_name(&self.settings.basename, i)))
            .filter(|path| path.is_file())
            .collect())
    }

    /// The invocation for a config file, according to `settings.use_matlab`.
    pub fn solver_command(&self, cfg: &Path) -> SolverCommand {
        let s = &self.settings;
        if s.use_matlab {
            SolverCommand::matlab(&s.matlab, &s.mcsc_dir, cfg)
        } else {
            SolverCommand::octave(&s.octave, &s.mcsc_dir, cfg)
        }
    }

    fn launch(
        &self,
        opts: &ExecuteOptions,
        on_complete: Option<runner::CompletionCallback>,
    ) -> Result<SolverHandle, McscError> {
        let dest = self.prepare_result_dir(opts)?;

        let (stdout, stderr) = if opts.silent {
            (
                OutputSink::File(dest.join(STDOUT_FILE)),
                OutputSink::File(dest.join(STDERR_FILE)),
            )
        } else {
            (OutputSink::Inherit, OutputSink::Inherit)
        };

        log::info!("running mcsc (result dir: {})", dest.display());

        let cfg = dest.join(CONFIG_FILE);
        let command = self.solver_command(&cfg);
        match on_complete {
            Some(cb) => runner::spawn_with_callback(&command, dest, stdout, stderr, cb),
            None => runner::spawn(&command, dest, stdout, stderr),
        }
    }

    /// Start the solver and return without waiting.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self)))]
    pub fn execute(&self, opts: &ExecuteOptions) -> Result<SolverHandle, McscError> {
        self.launch(opts, None)
    }

    /// Start the solver and wait for it to exit.
    ///
    /// A non-zero exit code is reported in the outcome, not as an error.
    pub fn execute_blocking(&self, opts: &ExecuteOptions) -> RunResult {
        self.execute(opts)?.wait()
    }

    /// Start the solver; `on_complete` runs once on the solver thread after
    /// it exits.
    pub fn execute_with_callback<F>(
        &self,
        opts: &ExecuteOptions,
        on_complete: F,
    ) -> Result<SolverHandle, McscError>
    where
        F: FnOnce(&RunResult) + Send + 'static,
    {
        self.launch(opts, Some(Box::new(on_complete)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::McscSettings;

    fn calibrator(dir: &Path) -> MultiCamSelfCal {
        MultiCamSelfCal::new(McscSettings::with_out_dir(dir)).expect("new")
    }

    fn touch_inputs(dir: &Path) {
        for name in INPUT_FILES {
            fs::write(dir.join(name), name).expect("write input");
        }
    }

    #[test]
    fn copies_inputs_and_rad_files_into_default_result_dir() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cal = calibrator(tmp.path());
        touch_inputs(cal.out_dir());
        fs::write(cal.out_dir().join("cam1.rad"), "K11 = 1").expect("rad");
        fs::write(cal.out_dir().join("notes.txt"), "x").expect("other");

        let dest = cal
            .prepare_result_dir(&ExecuteOptions::default())
            .expect("prepare");
        assert_eq!(dest, cal.out_dir().join("result"));
        for name in INPUT_FILES {
            assert_eq!(fs::read_to_string(dest.join(name)).expect("copied"), name);
        }
        assert!(dest.join("cam1.rad").is_file());
        assert!(!dest.join("notes.txt").exists());
    }

    #[test]
    fn copies_only_rad_files_of_ordered_cameras() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cal = calibrator(tmp.path());
        touch_inputs(cal.out_dir());
        fs::write(cal.out_dir().join("camera_order.txt"), "left\n").expect("order");
        for name in ["cam1.rad", "cam7.rad", "camera_left_backup.rad"] {
            fs::write(cal.out_dir().join(name), name).expect("rad");
        }

        let dest = cal
            .prepare_result_dir(&ExecuteOptions::default())
            .expect("prepare");
        assert_eq!(fs::read_to_string(dest.join("cam1.rad")).expect("cam1"), "cam1.rad");
        assert!(!dest.join("cam7.rad").exists());
        assert!(!dest.join("camera_left_backup.rad").exists());
    }

    #[test]
    fn validation_only_reports_missing_input() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cal = calibrator(tmp.path());
        touch_inputs(cal.out_dir());
        fs::remove_file(cal.out_dir().join("Res.dat")).expect("remove");

        let opts = ExecuteOptions {
            copy_files: false,
            ..ExecuteOptions::default()
        };
        match cal.prepare_result_dir(&opts) {
            Err(McscError::MissingFile(path)) => assert!(path.ends_with("Res.dat")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn validation_only_does_not_copy() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cal = calibrator(tmp.path());
        touch_inputs(cal.out_dir());

        let dest = tmp.path().join("elsewhere");
        let opts = ExecuteOptions {
            dest: Some(dest.clone()),
            copy_files: false,
            ..ExecuteOptions::default()
        };
        cal.prepare_result_dir(&opts).expect("prepare");
        assert!(dest.is_dir());
        assert!(!dest.join("IdMat.dat").exists());
    }

    #[test]
    fn picks_invocation_form_from_settings() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut settings = McscSettings::with_out_dir(tmp.path());
        let cfg = Path::new("/r/multicamselfcal.cfg");

        let octave = MultiCamSelfCal::new(settings.clone()).expect("new");
        assert_eq!(octave.solver_command(cfg).program(), Path::new("/usr/bin/octave"));

        settings.use_matlab = true;
        let matlab = MultiCamSelfCal::new(settings).expect("new");
        let cmd = matlab.solver_command(cfg);
        assert_eq!(cmd.program(), Path::new("/opt/matlab/R2011a/bin/matlab"));
        assert!(cmd.cwd().is_none());
    }
}
