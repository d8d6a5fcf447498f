//! Reading the solver's output matrices.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use mcsc_core::{
    load_matrix, rad_file_name, CameraOrder, CAMERA_ORDER_FILE, CE_FILE, RE_FILE, XE_FILE,
};
use nalgebra::{DMatrix, Matrix3, Point3, Vector3};

use crate::McscError;

/// Raw solver output for the inlier set.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationResult {
    /// Point estimates; rows 0..3 are X, Y, Z, one column per point.
    pub xe: DMatrix<f64>,
    /// Camera centers, one column per camera.
    pub ce: DMatrix<f64>,
    /// Camera rotations, stacked 3×3 blocks, one per camera.
    pub re: DMatrix<f64>,
}

/// Pose of one camera as estimated by the solver.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraPose {
    pub cam_id: String,
    pub center: Vector3<f64>,
    pub rotation: Matrix3<f64>,
}

/// Writes reconstructed points to a point-cloud file.
///
/// The file format belongs to the implementor.
pub trait PointCloudWriter {
    fn write_points(&self, path: &Path, points: &[Point3<f64>]) -> io::Result<()>;
}

fn load_required(path: PathBuf) -> Result<DMatrix<f64>, McscError> {
    if !path.is_file() {
        return Err(McscError::MissingFile(path));
    }
    Ok(load_matrix(path)?)
}

/// Load `Xe.dat`, `Ce.dat` and `Re.dat` from `dir`.
pub fn read_calibration_result_inliers(
    dir: impl AsRef<Path>,
) -> Result<CalibrationResult, McscError> {
    let dir = dir.as_ref();
    Ok(CalibrationResult {
        xe: load_required(dir.join(XE_FILE))?,
        ce: load_required(dir.join(CE_FILE))?,
        re: load_required(dir.join(RE_FILE))?,
    })
}

/// One 3D point per column of `xe`, taken from its first three rows.
pub fn reshape_calibrated_points(xe: &DMatrix<f64>) -> Result<Vec<Point3<f64>>, McscError> {
    if xe.nrows() < 3 {
        return Err(McscError::Shape {
            what: "Xe rows",
            expected: 3,
            got: xe.nrows(),
        });
    }
    Ok((0..xe.ncols())
        .map(|j| Point3::new(xe[(0, j)], xe[(1, j)], xe[(2, j)]))
        .collect())
}

/// Read `camera_order.txt` from `dir`.
pub fn read_camera_order(dir: impl AsRef<Path>) -> Result<CameraOrder, McscError> {
    let path = dir.as_ref().join(CAMERA_ORDER_FILE);
    if !path.is_file() {
        return Err(McscError::MissingFile(path));
    }
    Ok(CameraOrder::parse(&fs::read_to_string(path)?))
}

/// Map each camera ID in `dir` to the solver's `.rad` file name for it.
pub fn camera_name_map(
    dir: impl AsRef<Path>,
    basename: &str,
) -> Result<BTreeMap<String, String>, McscError> {
    let order = read_camera_order(dir)?;
    Ok(order
        .iter()
        .enumerate()
        .map(|(i, id)| (id.to_string(), rad_file_name(basename, i)))
        .collect())
}

/// Read the inlier points from `dir` and hand them to `writer` for `dest`.
///
/// Returns the number of points written.
pub fn save_to_pcd(
    dir: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    writer: &dyn PointCloudWriter,
) -> Result<usize, McscError> {
    let result = read_calibration_result_inliers(dir)?;
    let points = result.points()?;
    writer.write_points(dest.as_ref(), &points)?;
    Ok(points.len())
}

impl CalibrationResult {
    pub fn points(&self) -> Result<Vec<Point3<f64>>, McscError> {
        reshape_calibrated_points(&self.xe)
    }

    /// Center and rotation per camera of `order`.
    ///
    /// `Ce` is accepted either as 3×N (column per camera) or N×3.
    pub fn camera_poses(&self, order: &CameraOrder) -> Result<Vec<CameraPose>, McscError> {
        let n = order.len();
        let center = |i: usize| -> Vector3<f64> {
            if self.ce.nrows() == 3 && self.ce.ncols() == n {
                Vector3::new(self.ce[(0, i)], self.ce[(1, i)], self.ce[(2, i)])
            } else {
                Vector3::new(self.ce[(i, 0)], self.ce[(i, 1)], self.ce[(i, 2)])
            }
        };

        let ce_ok = (self.ce.nrows() == 3 && self.ce.ncols() == n)
            || (self.ce.nrows() == n && self.ce.ncols() == 3);
        if !ce_ok {
            return Err(McscError::Shape {
                what: "Ce cameras",
                expected: n,
                got: self.ce.ncols(),
            });
        }
        if self.re.ncols() != 3 || self.re.nrows() != 3 * n {
            return Err(McscError::Shape {
                what: "Re rows",
                expected: 3 * n,
                got: self.re.nrows(),
            });
        }

        Ok(order
            .normalized()
            .enumerate()
            .map(|(i, id)| CameraPose {
                cam_id: id.to_string(),
                center: center(i),
                rotation: self.re.fixed_view::<3, 3>(3 * i, 0).into_owned(),
            })
            .collect())
    }
}
