use std::io;
use std::path::{Path, PathBuf};

use crate::{Direction, Position};

/// Represents errors raised while building an observation.
///
/// A missing view is kept distinct from a decode failure so callers can tell
/// a map/state inconsistency apart from a damaged resource.
#[derive(Debug, thiserror::Error)]
pub enum ObservationError {
    #[error("no view image at {}", path.display())]
    MissingView { path: PathBuf },
    #[error("failed to decode view image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// The eye a view image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Uppercase label used in view resource names.
    pub const fn label(self) -> &'static str {
        match self {
            Side::Left => "LEFT",
            Side::Right => "RIGHT",
        }
    }
}

/// File name of the view image for a pose and eye: `<x>_<y>_<FACING>_<SIDE>.png`.
pub fn view_key(position: Position, direction: Direction, side: Side) -> String {
    format!(
        "{}_{}_{}_{}.png",
        position.x,
        position.y,
        direction.label(),
        side.label()
    )
}

/// Full path of the view image for a pose and eye under `resources`.
pub fn view_path(resources: &Path, position: Position, direction: Direction, side: Side) -> PathBuf {
    resources.join(view_key(position, direction, side))
}

/// An 8-bit RGB pixel buffer, interleaved row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbFrame {
    /// RGB triple at `(x, y)`. Coordinates must be in bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let base = ((y * self.width + x) * 3) as usize;
        [self.data[base], self.data[base + 1], self.data[base + 2]]
    }
}

/// A floating-point RGB pixel buffer, interleaved row-major.
///
/// View images are decoded as 8-bit and widened to `f32` before they reach
/// the caller, matching what learning code consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl Frame {
    /// Widens an 8-bit frame to floating point.
    pub fn from_rgb(frame: &RgbFrame) -> Self {
        Frame {
            width: frame.width,
            height: frame.height,
            data: frame.data.iter().map(|&byte| byte as f32).collect(),
        }
    }

    /// RGB triple at `(x, y)`. Coordinates must be in bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        let base = ((y * self.width + x) * 3) as usize;
        [self.data[base], self.data[base + 1], self.data[base + 2]]
    }
}

/// A stereo observation: the left and right view for the agent's pose.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub left: Frame,
    pub right: Frame,
}

/// Decodes view images addressed by path.
///
/// The default implementation reads PNG files from disk; tests and embedders
/// can substitute synthetic sources.
pub trait FrameSource {
    fn load_frame(&self, path: &Path) -> Result<RgbFrame, ObservationError>;
}

/// Loads view images as PNG files via the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PngFrameSource;

impl FrameSource for PngFrameSource {
    fn load_frame(&self, path: &Path) -> Result<RgbFrame, ObservationError> {
        let decoded = match image::open(path) {
            Ok(decoded) => decoded,
            Err(image::ImageError::IoError(err)) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ObservationError::MissingView {
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(ObservationError::Decode {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let rgb = decoded.to_rgb8();
        Ok(RgbFrame {
            width: rgb.width(),
            height: rgb.height(),
            data: rgb.into_raw(),
        })
    }
}

/// Builds the stereo observation for a pose by loading both eye views.
pub fn load_observation(
    source: &dyn FrameSource,
    resources: &Path,
    position: Position,
    direction: Direction,
) -> Result<Observation, ObservationError> {
    let left = source.load_frame(&view_path(resources, position, direction, Side::Left))?;
    let right = source.load_frame(&view_path(resources, position, direction, Side::Right))?;
    Ok(Observation {
        left: Frame::from_rgb(&left),
        right: Frame::from_rgb(&right),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn view_keys_encode_pose_and_side() {
        let pos = Position::new(2, -3);
        assert_eq!(
            view_key(pos, Direction::Front, Side::Left),
            "2_-3_FRONT_LEFT.png"
        );
        assert_eq!(
            view_key(pos, Direction::Back, Side::Right),
            "2_-3_BACK_RIGHT.png"
        );
    }

    #[test]
    fn frames_widen_to_f32_without_scaling() {
        let rgb = RgbFrame {
            width: 2,
            height: 1,
            data: vec![0, 128, 255, 1, 2, 3],
        };
        let frame = Frame::from_rgb(&rgb);
        assert_eq!(frame.data, vec![0.0, 128.0, 255.0, 1.0, 2.0, 3.0]);
        assert_eq!(frame.pixel(0, 0), [0.0, 128.0, 255.0]);
        assert_eq!(frame.pixel(1, 0), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn png_source_distinguishes_missing_from_broken() {
        let dir = TempDir::new().unwrap();
        let source = PngFrameSource;

        let absent = dir.path().join("0_0_FRONT_LEFT.png");
        assert!(matches!(
            source.load_frame(&absent),
            Err(ObservationError::MissingView { .. })
        ));

        let broken = dir.path().join("0_0_FRONT_RIGHT.png");
        fs::write(&broken, b"not a png").unwrap();
        assert!(matches!(
            source.load_frame(&broken),
            Err(ObservationError::Decode { .. })
        ));
    }

    #[test]
    fn png_source_round_trips_pixels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("1_1_FRONT_LEFT.png");
        let mut img = image::RgbImage::new(2, 2);
        img.put_pixel(0, 0, image::Rgb([10, 20, 30]));
        img.put_pixel(1, 1, image::Rgb([200, 100, 50]));
        img.save(&path).unwrap();

        let frame = PngFrameSource.load_frame(&path).unwrap();
        assert_eq!((frame.width, frame.height), (2, 2));
        assert_eq!(frame.pixel(0, 0), [10, 20, 30]);
        assert_eq!(frame.pixel(1, 1), [200, 100, 50]);
    }
}
