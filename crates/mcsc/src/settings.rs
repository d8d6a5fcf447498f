//! JSON settings for a calibrator instance.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::McscError;

/// Where the solver lives and how to name its files.
///
/// Every field has a default, so a settings file only needs the values that
/// differ on a given machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct McscSettings {
    /// Working directory for the protocol files. A fresh temporary
    /// directory is used when unset.
    pub out_dir: Option<PathBuf>,
    /// Prefix of the per-camera `.rad` files.
    pub basename: String,
    /// Subsampling stride passed to the solver as `Use-Nth-Frame`.
    pub use_nth_frame: u32,
    /// Directory containing `gocal.m`.
    pub mcsc_dir: PathBuf,
    pub octave: PathBuf,
    pub matlab: PathBuf,
    /// Run through MATLAB instead of Octave.
    pub use_matlab: bool,
}

impl Default for McscSettings {
    fn default() -> Self {
        Self {
            out_dir: None,
            basename: "cam".to_string(),
            use_nth_frame: 1,
            mcsc_dir: PathBuf::from("/opt/multicamselfcal/MultiCamSelfCal/"),
            octave: PathBuf::from("/usr/bin/octave"),
            matlab: PathBuf::from("/opt/matlab/R2011a/bin/matlab"),
            use_matlab: false,
        }
    }
}

impl McscSettings {
    /// Default settings writing into `out_dir`.
    pub fn with_out_dir(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: Some(out_dir.into()),
            ..Self::default()
        }
    }

    /// Load settings from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, McscError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write these settings to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), McscError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Location of the solver entry script.
    pub fn gocal_path(&self) -> PathBuf {
        self.mcsc_dir.join("gocal.m")
    }
}
