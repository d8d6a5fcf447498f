//! Writing the solver's input directory.
//!
//! All matrix files are generated in a single pass over a [`CameraOrder`], so
//! row `i` of `Res.dat` and `IdMat.dat`, rows `3i..3i+3` of `points.dat` and
//! `<basename>{i+1}.rad` always describe the same camera.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use mcsc_core::{
    rad_file_name, save_matrix, write_matrix, CameraOrder, McscConfig, CAMERA_ORDER_FILE,
    CONFIG_FILE, ID_MAT_FILE, POINTS_FILE, RES_FILE,
};
use nalgebra::{DMatrix, RowVector2};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{CalibrationSource, McscError, MultiCamSelfCal};

/// Config values the caller chooses when matrices are supplied directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigFlags {
    pub undo_radial: bool,
    pub square_pixels: bool,
    /// Negative means "all cameras".
    pub num_cameras_fill: i64,
}

impl Default for ConfigFlags {
    fn default() -> Self {
        Self {
            undo_radial: false,
            square_pixels: true,
            num_cameras_fill: -1,
        }
    }
}

/// Pre-assembled solver matrices.
#[derive(Clone, Debug)]
pub struct CalibrationMatrices {
    /// One row per camera, 0/1 per frame.
    pub id_mat: DMatrix<u8>,
    /// Three rows (x, y, 1) per camera, one column per frame.
    pub points: DMatrix<f64>,
    /// One `width height` row per camera.
    pub res: DMatrix<u32>,
}

/// What [`MultiCamSelfCal::create_from_cams`] ended up writing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildSummary {
    /// Cameras that made it into the directory, in file order.
    pub order: CameraOrder,
    /// Cameras removed for having no usable observations.
    pub dropped: Vec<String>,
    pub undo_radial: bool,
    /// Observations per camera (columns of every matrix row).
    pub num_points: usize,
}

/// True for an observation value that counts as a detection.
#[inline]
fn is_detection(v: f64) -> bool {
    !v.is_nan() && v != 0.0
}

/// Number of values in `obs` that are neither NaN nor zero.
pub fn count_valid(obs: &DMatrix<f64>) -> usize {
    obs.iter().filter(|v| is_detection(**v)).count()
}

/// Visibility flags from one coordinate row: NaN and zero are "missing",
/// anything else is "detected".
pub fn visibility_row<I>(coords: I) -> Vec<u8>
where
    I: IntoIterator<Item = f64>,
{
    coords.into_iter().map(|v| u8::from(is_detection(v))).collect()
}

/// Turn an N×2 observation array into the solver's 3×N homogeneous block.
pub fn homogeneous_block(obs: &DMatrix<f64>) -> Result<DMatrix<f64>, McscError> {
    if obs.ncols() != 2 {
        return Err(McscError::Shape {
            what: "observation columns",
            expected: 2,
            got: obs.ncols(),
        });
    }
    Ok(DMatrix::from_fn(3, obs.nrows(), |r, c| {
        if r < 2 {
            obs[(c, r)]
        } else {
            1.0
        }
    }))
}

impl MultiCamSelfCal {
    /// Write `camera_order.txt`.
    pub fn write_camera_order(&self, order: &CameraOrder) -> Result<(), McscError> {
        let mut w = BufWriter::new(File::create(self.out_dir.join(CAMERA_ORDER_FILE))?);
        order.write(&mut w)?;
        w.flush()?;
        Ok(())
    }

    /// Render `multicamselfcal.cfg` for `order`.
    pub fn write_config(
        &self,
        order: &CameraOrder,
        undo_radial: bool,
        square_pixels: bool,
        num_cameras_fill: i64,
    ) -> Result<McscConfig, McscError> {
        let cfg = McscConfig::new(
            self.settings.basename.clone(),
            order.len(),
            num_cameras_fill,
            undo_radial,
            square_pixels,
            self.settings.use_nth_frame,
        );
        std::fs::write(self.out_dir.join(CONFIG_FILE), cfg.to_string())?;

        log::debug!("calibrate cams: {}", order.as_slice().join(","));
        log::debug!("undo radial: {}", cfg.undo_radial);
        log::debug!("num_cameras_fill: {}", cfg.num_cameras_fill);
        log::debug!("wrote camera calibration directory: {}", self.out_dir.display());
        Ok(cfg)
    }

    fn rad_path(&self, index: usize) -> PathBuf {
        self.out_dir.join(rad_file_name(&self.settings.basename, index))
    }

    /// Classify every supplied calibration for cameras in `order`.
    fn classify_sources(
        order: &CameraOrder,
        calibrations: &BTreeMap<String, PathBuf>,
    ) -> Result<BTreeMap<String, CalibrationSource>, McscError> {
        let mut sources = BTreeMap::new();
        for id in order.iter() {
            if let Some(path) = calibrations.get(id) {
                sources.insert(id.to_string(), CalibrationSource::from_path(path.clone())?);
            }
        }
        Ok(sources)
    }

    /// Build the directory from raw per-camera observations.
    ///
    /// `points` maps camera ID to an N×2 array of pixel coordinates, NaN where
    /// the camera saw nothing. When `cam_ids` is empty the cameras are taken
    /// from `points` in key (lexicographic) order. Cameras without a single
    /// usable observation are dropped from the run entirely.
    ///
    /// `Undo-Radial` is set only when every remaining camera has an entry in
    /// `calibrations`. Inputs are checked before any file is touched, so a
    /// rejected call leaves an existing directory as it was.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(cameras = points.len()))
    )]
    pub fn create_from_cams(
        &self,
        cam_ids: &[String],
        resolutions: &BTreeMap<String, [u32; 2]>,
        points: &BTreeMap<String, DMatrix<f64>>,
        calibrations: &BTreeMap<String, PathBuf>,
        num_cameras_fill: i64,
    ) -> Result<BuildSummary, McscError> {
        let requested = if cam_ids.is_empty() {
            CameraOrder::new(points.keys().cloned())
        } else {
            CameraOrder::new(cam_ids.iter().cloned())
        };

        if let Some(id) = requested.iter().find(|id| !points.contains_key(*id)) {
            return Err(McscError::MissingObservations(id.to_string()));
        }

        let (order, dropped) = requested.partition(|id| {
            let valid = count_valid(&points[id]);
            if valid == 0 {
                log::warn!("removing cam {id} - no points detected");
            }
            valid > 0
        });
        if order.is_empty() {
            log::warn!("no camera has any detected points");
        }

        let sources = Self::classify_sources(&order, calibrations)?;

        let mut num_points = None;
        let mut blocks = Vec::with_capacity(order.len());
        for id in order.iter() {
            let block = homogeneous_block(&points[id])?;
            let npts = block.ncols();
            match num_points {
                None => num_points = Some(npts),
                Some(expected) if expected != npts => {
                    return Err(McscError::Shape {
                        what: "observations per camera",
                        expected,
                        got: npts,
                    });
                }
                Some(_) => {}
            }
            let resolution = *resolutions
                .get(id)
                .ok_or_else(|| McscError::MissingResolution(id.to_string()))?;
            blocks.push((resolution, block));
        }

        self.write_camera_order(&order)?;

        let mut res_w = BufWriter::new(File::create(self.out_dir.join(RES_FILE))?);
        let mut id_w = BufWriter::new(File::create(self.out_dir.join(ID_MAT_FILE))?);
        let mut pts_w = BufWriter::new(File::create(self.out_dir.join(POINTS_FILE))?);

        for (i, (id, ([width, height], block))) in order.iter().zip(&blocks).enumerate() {
            let found = visibility_row(block.row(0).iter().copied());

            write_matrix(&RowVector2::new(*width, *height), &mut res_w)?;
            write_matrix(&DMatrix::from_row_slice(1, block.ncols(), &found), &mut id_w)?;
            write_matrix(block, &mut pts_w)?;

            if let Some(src) = sources.get(id) {
                src.materialize(&self.rad_path(i), self.converter())?;
            }
        }

        res_w.flush()?;
        id_w.flush()?;
        pts_w.flush()?;

        let undo_radial = order.iter().all(|id| sources.contains_key(id));
        self.write_config(&order, undo_radial, true, num_cameras_fill)?;
        log::debug!("dropped cams: {}", dropped.join(","));

        Ok(BuildSummary {
            order,
            dropped,
            undo_radial,
            num_points: num_points.unwrap_or(0),
        })
    }

    /// Build the directory from matrices the caller already assembled.
    ///
    /// Matrices are written verbatim. `flags.undo_radial` is taken as given;
    /// unlike [`MultiCamSelfCal::create_from_cams`] it is not inferred from
    /// `calibrations`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(cameras = order.len()))
    )]
    pub fn create_calibration_directory(
        &self,
        order: &CameraOrder,
        matrices: &CalibrationMatrices,
        calibrations: Option<&BTreeMap<String, PathBuf>>,
        flags: ConfigFlags,
    ) -> Result<McscConfig, McscError> {
        if matrices.res.nrows() != order.len() {
            return Err(McscError::Shape {
                what: "Res rows",
                expected: order.len(),
                got: matrices.res.nrows(),
            });
        }
        let sources = match calibrations {
            Some(cals) => {
                if cals.len() != order.len() {
                    return Err(McscError::Shape {
                        what: "calibrations",
                        expected: order.len(),
                        got: cals.len(),
                    });
                }
                Self::classify_sources(order, cals)?
            }
            None => BTreeMap::new(),
        };

        log::debug!("points.shape {:?}", matrices.points.shape());
        log::debug!("IdMat.shape {:?}", matrices.id_mat.shape());
        log::debug!("Res {:?}", matrices.res.shape());

        self.write_camera_order(order)?;

        save_matrix(&matrices.res, self.out_dir.join(RES_FILE))?;
        save_matrix(&matrices.id_mat, self.out_dir.join(ID_MAT_FILE))?;
        save_matrix(&matrices.points, self.out_dir.join(POINTS_FILE))?;

        for (i, id) in order.iter().enumerate() {
            if let Some(src) = sources.get(id) {
                src.materialize(&self.rad_path(i), self.converter())?;
            }
        }

        self.write_config(
            order,
            flags.undo_radial,
            flags.square_pixels,
            flags.num_cameras_fill,
        )
    }
}
