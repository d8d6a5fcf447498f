//! Solver configuration file (`multicamselfcal.cfg`) and protocol file names.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const CAMERA_ORDER_FILE: &str = "camera_order.txt";
pub const ID_MAT_FILE: &str = "IdMat.dat";
pub const POINTS_FILE: &str = "points.dat";
pub const RES_FILE: &str = "Res.dat";
pub const CONFIG_FILE: &str = "multicamselfcal.cfg";

/// Files the solver needs in its config directory, in write order.
pub const INPUT_FILES: [&str; 5] = [
    CAMERA_ORDER_FILE,
    ID_MAT_FILE,
    POINTS_FILE,
    RES_FILE,
    CONFIG_FILE,
];

pub const STDOUT_FILE: &str = "STDOUT";
pub const STDERR_FILE: &str = "STDERR";

/// Reconstructed 3D points (inliers).
pub const XE_FILE: &str = "Xe.dat";
/// Camera centers.
pub const CE_FILE: &str = "Ce.dat";
/// Camera rotations.
pub const RE_FILE: &str = "Re.dat";

/// Name of the radial distortion file for the camera at zero-based `index`.
///
/// The solver numbers cameras from 1.
pub fn rad_file_name(basename: &str, index: usize) -> String {
    format!("{basename}{}.rad", index + 1)
}

/// Parameters rendered into `multicamselfcal.cfg`.
///
/// Everything not listed here is fixed by the template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct McscConfig {
    pub basename: String,
    pub num_cameras: usize,
    pub num_cameras_fill: usize,
    pub undo_radial: bool,
    pub square_pixels: bool,
    pub use_nth_frame: u32,
}

impl McscConfig {
    /// Build a config, clamping `num_cameras_fill` with [`McscConfig::clamp_fill`].
    pub fn new(
        basename: impl Into<String>,
        num_cameras: usize,
        num_cameras_fill: i64,
        undo_radial: bool,
        square_pixels: bool,
        use_nth_frame: u32,
    ) -> Self {
        Self {
            basename: basename.into(),
            num_cameras,
            num_cameras_fill: Self::clamp_fill(num_cameras_fill, num_cameras),
            undo_radial,
            square_pixels,
            use_nth_frame,
        }
    }

    /// A negative fill count, or one above the camera count, means "all cameras".
    pub fn clamp_fill(requested: i64, num_cameras: usize) -> usize {
        match usize::try_from(requested) {
            Ok(n) if n <= num_cameras => n,
            _ => num_cameras,
        }
    }
}

impl fmt::Display for McscConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Files]
Basename: {basename}
Image-Extension: jpg

[Images]
Subpix: 0.5

[Calibration]
Num-Cameras: {num_cameras}
Num-Projectors: 0
Nonlinear-Parameters: 50    0    1    0    0    0
Nonlinear-Update: 1   0   1   0   0   0
Initial-Tolerance: 10
Do-Global-Iterations: 0
Global-Iteration-Threshold: 0.5
Global-Iteration-Max: 5
Num-Cameras-Fill: {num_cameras_fill}
Do-Bundle-Adjustment: 1
Undo-Radial: {undo_radial}
Min-Points-Value: 30
N-Tuples: 3
Square-Pixels: {square_pixels}
Use-Nth-Frame: {use_nth_frame}
",
            basename = self.basename,
            num_cameras = self.num_cameras,
            num_cameras_fill = self.num_cameras_fill,
            undo_radial = u8::from(self.undo_radial),
            square_pixels = u8::from(self.square_pixels),
            use_nth_frame = self.use_nth_frame,
        )
    }
}
