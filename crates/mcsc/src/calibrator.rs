use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use crate::{McscError, McscSettings, RadConverter};

/// Owns one calibration working directory and the settings used to fill it
/// and to run the solver against it.
///
/// A calibrator is meant for a single run at a time: nothing locks the
/// working directory, so concurrent runs need distinct `out_dir`s.
pub struct MultiCamSelfCal {
    pub(crate) settings: McscSettings,
    pub(crate) out_dir: PathBuf,
    pub(crate) converter: Option<Box<dyn RadConverter>>,
}

impl MultiCamSelfCal {
    /// Create the working directory (or a temporary one when
    /// `settings.out_dir` is unset).
    pub fn new(settings: McscSettings) -> Result<Self, McscError> {
        let out_dir = match &settings.out_dir {
            Some(dir) => {
                let dir = std::path::absolute(dir)?;
                fs::create_dir_all(&dir)?;
                dir
            }
            None => tempfile::Builder::new()
                .prefix("MultiCamSelfCal")
                .tempdir()?
                .keep(),
        };

        let gocal = settings.gocal_path();
        if !gocal.is_file() {
            log::warn!("could not find MultiCamSelfCal gocal.m in {}", settings.mcsc_dir.display());
        }

        Ok(Self {
            settings,
            out_dir,
            converter: None,
        })
    }

    /// Install the converter used for vendor (`.yaml`) calibrations.
    pub fn with_converter(mut self, converter: impl RadConverter + 'static) -> Self {
        self.converter = Some(Box::new(converter));
        self
    }

    #[inline]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    #[inline]
    pub fn settings(&self) -> &McscSettings {
        &self.settings
    }

    #[inline]
    pub fn basename(&self) -> &str {
        &self.settings.basename
    }

    pub(crate) fn converter(&self) -> Option<&dyn RadConverter> {
        self.converter.as_deref()
    }
}

impl fmt::Debug for MultiCamSelfCal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiCamSelfCal")
            .field("settings", &self.settings)
            .field("out_dir", &self.out_dir)
            .field("converter", &self.converter.is_some())
            .finish()
    }
}
