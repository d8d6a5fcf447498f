//! Drive the MultiCamSelfCal (MCSC) multi-camera self-calibration solver.
//!
//! The solver is an Octave/MATLAB program that talks only through files. This
//! crate covers the three steps around it:
//! - write a working directory in the layout the solver expects
//!   ([`MultiCamSelfCal::create_from_cams`],
//!   [`MultiCamSelfCal::create_calibration_directory`]);
//! - run the solver on a background thread ([`MultiCamSelfCal::execute`]);
//! - read its output matrices back ([`read_calibration_result_inliers`]).
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use mcsc::{ExecuteOptions, McscSettings, MultiCamSelfCal};
//! use nalgebra::DMatrix;
//!
//! # fn main() -> Result<(), mcsc::McscError> {
//! let cal = MultiCamSelfCal::new(McscSettings::with_out_dir("/tmp/mcsc-run"))?;
//!
//! let mut points = BTreeMap::new();
//! points.insert("cam1".to_string(), DMatrix::from_row_slice(2, 2, &[10.0, 20.0, f64::NAN, f64::NAN]));
//! points.insert("cam2".to_string(), DMatrix::from_row_slice(2, 2, &[11.0, 21.0, 30.0, 40.0]));
//! let mut res = BTreeMap::new();
//! res.insert("cam1".to_string(), [640, 480]);
//! res.insert("cam2".to_string(), [640, 480]);
//!
//! cal.create_from_cams(&[], &res, &points, &BTreeMap::new(), -1)?;
//! let outcome = cal.execute_blocking(&ExecuteOptions::default())?.check()?;
//! let result = mcsc::read_calibration_result_inliers(&outcome.result_dir)?;
//! println!("{} points", result.points()?.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `mcsc::core`: ASCII matrix codec, [`CameraOrder`], config template.
//! - [`MultiCamSelfCal`]: working directory, builders and solver launch.
//! - [`runner`]: the generic child-process runner used by `execute`.
//! - [`results`]: output readers and the point-cloud hook.

pub use mcsc_core as core;

mod calibrator;
mod directory;
mod error;
mod execute;
mod intrinsics;
pub mod results;
pub mod runner;
mod settings;

pub use calibrator::MultiCamSelfCal;
pub use directory::{
    count_valid, homogeneous_block, visibility_row, BuildSummary, CalibrationMatrices,
    ConfigFlags,
};
pub use error::McscError;
pub use execute::ExecuteOptions;
pub use intrinsics::{CalibrationSource, RadConverter};
pub use results::{
    camera_name_map, read_calibration_result_inliers, read_camera_order,
    reshape_calibrated_points, save_to_pcd, CalibrationResult, CameraPose, PointCloudWriter,
};
pub use runner::{OutputSink, RunOutcome, RunResult, SolverCommand, SolverHandle};
pub use settings::McscSettings;

pub use mcsc_core::{CameraOrder, McscConfig};
