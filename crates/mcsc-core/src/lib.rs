//! Core building blocks for driving the MultiCamSelfCal solver.
//!
//! This crate knows the solver's file protocol (ASCII matrices, the camera
//! order list, the config template) but nothing about directories or
//! processes; those live in the `mcsc` crate.

mod camera_order;
mod config;
mod logger;
mod matrix;

pub use camera_order::{normalize_camera_id, CameraOrder};
pub use config::{
    rad_file_name, McscConfig, CAMERA_ORDER_FILE, CE_FILE, CONFIG_FILE, ID_MAT_FILE, INPUT_FILES,
    POINTS_FILE, RES_FILE, RE_FILE, STDERR_FILE, STDOUT_FILE, XE_FILE,
};
pub use matrix::{load_matrix, read_matrix, save_matrix, write_matrix, AsciiValue, MatrixError};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_verbosity, init_with_level, level_from_verbosity};
