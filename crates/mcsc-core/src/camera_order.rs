//! The ordered list of cameras taking part in one calibration run.
//!
//! Row `i` of every matrix file (`IdMat.dat`, `Res.dat`, the `i`-th block of
//! `points.dat`) and the `i+1`-th `.rad` file all belong to camera `i` of
//! this list. Everything that writes those files takes a `CameraOrder`
//! explicitly instead of relying on write sequence.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

/// Ordered camera identifiers.
///
/// IDs are kept exactly as the caller supplied them so they can be used as
/// lookup keys; [`CameraOrder::normalized`] yields the on-disk form with a
/// single leading `/` removed (ROS-style names like `/cam1`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraOrder(Vec<String>);

/// Strip a single leading `/` from a camera ID.
pub fn normalize_camera_id(id: &str) -> &str {
    id.strip_prefix('/').unwrap_or(id)
}

impl CameraOrder {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// IDs as written to `camera_order.txt`.
    pub fn normalized(&self) -> impl Iterator<Item = &str> {
        self.iter().map(normalize_camera_id)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Zero-based row index of `id`.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.0.iter().position(|c| c == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    /// Split into (kept, removed), preserving relative order in both.
    pub fn partition<F>(&self, mut keep: F) -> (CameraOrder, Vec<String>)
    where
        F: FnMut(&str) -> bool,
    {
        let (kept, removed): (Vec<String>, Vec<String>) =
            self.0.iter().cloned().partition(|id| keep(id));
        (CameraOrder(kept), removed)
    }

    /// Write one normalized ID per line.
    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        for id in self.normalized() {
            writeln!(w, "{id}")?;
        }
        Ok(())
    }

    /// Parse the contents of `camera_order.txt`.
    ///
    /// Splits on `\n` and discards one trailing empty entry, so a file that
    /// ends with a newline yields no blank camera.
    pub fn parse(text: &str) -> Self {
        let mut ids: Vec<String> = text.split('\n').map(str::to_string).collect();
        if ids.last().is_some_and(|s| s.is_empty()) {
            ids.pop();
        }
        Self(ids)
    }
}

impl<'a> IntoIterator for &'a CameraOrder {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<String>> for CameraOrder {
    fn from(ids: Vec<String>) -> Self {
        Self(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(order: &CameraOrder) -> String {
        let mut buf = Vec::new();
        order.write(&mut buf).expect("write");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn writes_one_id_per_line() {
        let order = CameraOrder::new(["camA", "camB"]);
        assert_eq!(written(&order), "camA\ncamB\n");
    }

    #[test]
    fn strips_single_leading_slash_on_write() {
        let order = CameraOrder::new(["/cam1", "cam2", "//cam3"]);
        assert_eq!(written(&order), "cam1\ncam2\n/cam3\n");
        assert_eq!(order.as_slice()[0], "/cam1");
    }

    #[test]
    fn parse_inverts_write() {
        let order = CameraOrder::new(["/Basler_1", "Basler_2", "Basler_3"]);
        let back = CameraOrder::parse(&written(&order));
        assert_eq!(back, CameraOrder::new(["Basler_1", "Basler_2", "Basler_3"]));
    }

    #[test]
    fn parse_drops_only_one_trailing_blank() {
        assert_eq!(CameraOrder::parse("a\nb"), CameraOrder::new(["a", "b"]));
        assert_eq!(CameraOrder::parse("a\n\n"), CameraOrder::new(["a", ""]));
        assert!(CameraOrder::parse("").is_empty());
    }

    #[test]
    fn partition_keeps_relative_order() {
        let order = CameraOrder::new(["a", "b", "c", "d"]);
        let (kept, removed) = order.partition(|id| id != "b" && id != "d");
        assert_eq!(kept, CameraOrder::new(["a", "c"]));
        assert_eq!(removed, vec!["b".to_string(), "d".to_string()]);
        assert_eq!(kept.index_of("c"), Some(1));
    }
}
