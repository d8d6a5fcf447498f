//! Per-camera intrinsic calibration inputs and their `.rad` materialization.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::McscError;

/// Converts a vendor intrinsic calibration into the solver's `.rad` format.
///
/// The conversion itself lives outside this crate. Any
/// `Fn(&Path, &Path) -> io::Result<()>` closure can be used as a converter.
pub trait RadConverter: Send + Sync {
    /// Read the calibration at `src` and write a `.rad` file to `dest`.
    fn convert(&self, src: &Path, dest: &Path) -> io::Result<()>;
}

impl<F> RadConverter for F
where
    F: Fn(&Path, &Path) -> io::Result<()> + Send + Sync,
{
    fn convert(&self, src: &Path, dest: &Path) -> io::Result<()> {
        self(src, dest)
    }
}

/// An intrinsic calibration file, classified by format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CalibrationSource {
    /// Already in the solver's `.rad` format; copied as is.
    Rad(PathBuf),
    /// ROS `camera_info` YAML; needs a [`RadConverter`].
    RosYaml(PathBuf),
}

impl CalibrationSource {
    /// Classify `path` by extension.
    ///
    /// Only `.rad` and `.yaml` are accepted. The file is not touched here.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, McscError> {
        let path = path.into();
        match path.extension().and_then(|e| e.to_str()) {
            Some("rad") => Ok(Self::Rad(path)),
            Some("yaml") => Ok(Self::RosYaml(path)),
            _ => Err(McscError::UnsupportedFormat(path)),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Rad(p) | Self::RosYaml(p) => p,
        }
    }

    /// Produce the `.rad` file at `dest`.
    pub fn materialize(
        &self,
        dest: &Path,
        converter: Option<&dyn RadConverter>,
    ) -> Result<(), McscError> {
        let src = self.path();
        if !src.is_file() {
            return Err(McscError::MissingFile(src.to_path_buf()));
        }
        match self {
            Self::Rad(_) => {
                fs::copy(src, dest)?;
            }
            Self::RosYaml(_) => {
                let converter = converter.ok_or_else(|| McscError::NoConverter(src.to_path_buf()))?;
                converter
                    .convert(src, dest)
                    .map_err(|source| McscError::Convert {
                        src: src.to_path_buf(),
                        source,
                    })?;
            }
        }
        log::debug!("wrote {} from {}", dest.display(), src.display());
        Ok(())
    }
}
