//! Whitespace-delimited ASCII matrices.
//!
//! This is the only data format the solver understands: one matrix row per
//! line, values separated by a single space. Lines starting with `#` are
//! comments. There is no header, so the shape is implied by the content.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use nalgebra::{storage::RawStorage, DMatrix, Dim, Matrix};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced while reading or writing ASCII matrices.
#[derive(thiserror::Error, Debug)]
pub enum MatrixError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("line {line}: cannot parse {token:?} as a number")]
    Parse { line: usize, token: String },
    #[error("line {line}: expected {expected} values, got {got}")]
    Ragged {
        line: usize,
        expected: usize,
        got: usize,
    },
    #[error("matrix file contains no data rows")]
    Empty,
}

/// A scalar that can be written as a single ASCII matrix entry.
///
/// Floats use Rust's shortest round-trip formatting (`1.0`, `0.1`, `NaN`),
/// so reading a written matrix back reproduces every `f64` bit-for-bit.
/// Booleans are written as `0`/`1`.
pub trait AsciiValue {
    fn write_ascii<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()>;
}

macro_rules! ascii_display {
    ($($t:ty),*) => {
        $(impl AsciiValue for $t {
            #[inline]
            fn write_ascii<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
                write!(w, "{}", self)
            }
        })*
    };
}

macro_rules! ascii_float {
    ($($t:ty),*) => {
        $(impl AsciiValue for $t {
            #[inline]
            fn write_ascii<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
                write!(w, "{:?}", self)
            }
        })*
    };
}

ascii_display!(u8, u16, u32, u64, usize, i8, i16, i32, i64);
ascii_float!(f32, f64);

impl AsciiValue for bool {
    #[inline]
    fn write_ascii<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "{}", u8::from(*self))
    }
}

/// Write `m` to `w`, one row per line.
///
/// The writer is not flushed; callers that pass a `BufWriter` own that.
pub fn write_matrix<T, R, C, S, W>(m: &Matrix<T, R, C, S>, w: &mut W) -> io::Result<()>
where
    T: AsciiValue,
    R: Dim,
    C: Dim,
    S: RawStorage<T, R, C>,
    W: Write + ?Sized,
{
    for i in 0..m.nrows() {
        for j in 0..m.ncols() {
            if j > 0 {
                w.write_all(b" ")?;
            }
            m[(i, j)].write_ascii(w)?;
        }
        w.write_all(b"\n")?;
    }
    Ok(())
}

/// Write `m` to a new file at `path`, replacing any existing file.
pub fn save_matrix<T, R, C, S>(m: &Matrix<T, R, C, S>, path: impl AsRef<Path>) -> io::Result<()>
where
    T: AsciiValue,
    R: Dim,
    C: Dim,
    S: RawStorage<T, R, C>,
{
    let mut w = BufWriter::new(File::create(path)?);
    write_matrix(m, &mut w)?;
    w.flush()
}

/// Parse an ASCII matrix.
///
/// Comment lines (`#`) and blank lines are skipped. Every remaining line must
/// hold the same number of values.
pub fn read_matrix<R: BufRead>(reader: R) -> Result<DMatrix<f64>, MatrixError> {
    let mut data = Vec::new();
    let mut ncols = None;
    let mut nrows = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let start = data.len();
        for token in trimmed.split_whitespace() {
            let value = token.parse::<f64>().map_err(|_| MatrixError::Parse {
                line: idx + 1,
                token: token.to_string(),
            })?;
            data.push(value);
        }

        let got = data.len() - start;
        match ncols {
            None => ncols = Some(got),
            Some(expected) if expected != got => {
                return Err(MatrixError::Ragged {
                    line: idx + 1,
                    expected,
                    got,
                });
            }
            Some(_) => {}
        }
        nrows += 1;
    }

    let ncols = ncols.ok_or(MatrixError::Empty)?;
    Ok(DMatrix::from_row_slice(nrows, ncols, &data))
}

/// Read an ASCII matrix from the file at `path`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))
)]
pub fn load_matrix(path: impl AsRef<Path>) -> Result<DMatrix<f64>, MatrixError> {
    let file = File::open(path)?;
    read_matrix(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Matrix2x3;

    fn to_string<T: AsciiValue + nalgebra::Scalar>(m: &DMatrix<T>) -> String {
        let mut buf = Vec::new();
        write_matrix(m, &mut buf).expect("write to vec");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn writes_rows_space_separated() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.5, -3.0, 0.1, 1e-12, 640.0]);
        assert_eq!(to_string(&m), "1.0 2.5 -3.0\n0.1 1e-12 640.0\n");
    }

    #[test]
    fn writes_bools_as_u8() {
        let m = DMatrix::from_row_slice(1, 4, &[true, false, false, true]);
        assert_eq!(to_string(&m), "1 0 0 1\n");
    }

    #[test]
    fn writes_integers_without_fraction() {
        let m = DMatrix::from_row_slice(2, 2, &[640u32, 480, 1024, 768]);
        assert_eq!(to_string(&m), "640 480\n1024 768\n");
    }

    #[test]
    fn round_trips_floats_exactly() {
        let values = [
            0.1,
            1.0 / 3.0,
            -123456.789,
            f64::MIN_POSITIVE,
            6.02214076e23,
            0.0,
        ];
        let m = DMatrix::from_row_slice(2, 3, &values);
        let back = read_matrix(to_string(&m).as_bytes()).expect("read");
        assert_eq!(back, m);
    }

    #[test]
    fn round_trips_fixed_size_matrices() {
        let m = Matrix2x3::new(1.5, 2.0, 3.25, -4.0, 5.0, 6.125);
        let mut buf = Vec::new();
        write_matrix(&m, &mut buf).expect("write");
        let back = read_matrix(buf.as_slice()).expect("read");
        assert_eq!(back.shape(), (2, 3));
        for (a, b) in back.iter().zip(m.iter()) {
            assert_relative_eq!(*a, *b);
        }
    }

    #[test]
    fn nan_survives_round_trip() {
        let m = DMatrix::from_row_slice(1, 3, &[1.0, f64::NAN, 3.0]);
        let text = to_string(&m);
        assert_eq!(text, "1.0 NaN 3.0\n");
        let back = read_matrix(text.as_bytes()).expect("read");
        assert!(back[(0, 1)].is_nan());
        assert_eq!(back[(0, 2)], 3.0);
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let text = "# created by Octave\n# name: Xe\n1 2 3\n\n4 5 6\n";
        let m = read_matrix(text.as_bytes()).expect("read");
        assert_eq!(m, DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
    }

    #[test]
    fn accepts_octave_number_styles() {
        let text = "  1.2345e+02\t-Inf   NaN \n";
        let m = read_matrix(text.as_bytes()).expect("read");
        assert_relative_eq!(m[(0, 0)], 123.45);
        assert_eq!(m[(0, 1)], f64::NEG_INFINITY);
        assert!(m[(0, 2)].is_nan());
    }

    #[test]
    fn rejects_non_numeric_token() {
        let err = read_matrix("1 2\n3 four\n".as_bytes()).unwrap_err();
        match err {
            MatrixError::Parse { line, token } => {
                assert_eq!(line, 2);
                assert_eq!(token, "four");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = read_matrix("1 2 3\n4 5\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            MatrixError::Ragged {
                line: 2,
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            read_matrix("".as_bytes()),
            Err(MatrixError::Empty)
        ));
        assert!(matches!(
            read_matrix("# only a comment\n".as_bytes()),
            Err(MatrixError::Empty)
        ));
    }

    #[test]
    fn save_and_load_through_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Res.dat");
        let m = DMatrix::from_row_slice(2, 2, &[640u32, 480, 800, 600]);
        save_matrix(&m, &path).expect("save");
        let back = load_matrix(&path).expect("load");
        assert_eq!(back, m.map(f64::from));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_matrix(dir.path().join("nope.dat")).unwrap_err();
        assert!(matches!(err, MatrixError::Io(_)));
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn load_matrix_is_traced_under_a_subscriber() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("m.dat");
        std::fs::write(&path, "1 2\n3 4\n").expect("write");

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let m = tracing::subscriber::with_default(subscriber, || load_matrix(&path))
            .expect("load");
        assert_eq!(m.shape(), (2, 2));
    }
}
