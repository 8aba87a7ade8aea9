use crate::obs::{Observation, RgbFrame};

/// Represents errors raised while composing a displayable frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("stereo views disagree on height: left {left_height}px, right {right_height}px")]
    MismatchedViews {
        left_height: u32,
        right_height: u32,
    },
}

/// Receives composed frames for display.
///
/// Implementations are expected to return promptly (single-frame refresh);
/// the environment never waits on presentation.
pub trait ViewSink {
    fn present(&mut self, frame: &RgbFrame);
}

/// Joins the stereo pair side by side and halves the resolution.
///
/// The two views are concatenated along the width, then downsampled by
/// averaging 2x2 blocks; odd trailing rows and columns are dropped. The
/// result is quantized back to 8-bit for display.
pub fn compose_views(observation: &Observation) -> Result<RgbFrame, RenderError> {
    let left = &observation.left;
    let right = &observation.right;
    if left.height != right.height {
        return Err(RenderError::MismatchedViews {
            left_height: left.height,
            right_height: right.height,
        });
    }

    let full_width = left.width + right.width;
    let sample = |x: u32, y: u32| -> [f32; 3] {
        if x < left.width {
            left.pixel(x, y)
        } else {
            right.pixel(x - left.width, y)
        }
    };

    let out_width = full_width / 2;
    let out_height = left.height / 2;
    let mut data = Vec::with_capacity((out_width * out_height * 3) as usize);
    for y in 0..out_height {
        for x in 0..out_width {
            let a = sample(2 * x, 2 * y);
            let b = sample(2 * x + 1, 2 * y);
            let c = sample(2 * x, 2 * y + 1);
            let d = sample(2 * x + 1, 2 * y + 1);
            for channel in 0..3 {
                let mean = (a[channel] + b[channel] + c[channel] + d[channel]) / 4.0;
                data.push(mean.round().clamp(0.0, 255.0) as u8);
            }
        }
    }
    Ok(RgbFrame {
        width: out_width,
        height: out_height,
        data,
    })
}

#[cfg(test)]
mod tests {
    use crate::obs::Frame;

    use super::*;

    fn solid(width: u32, height: u32, value: f32) -> Frame {
        Frame {
            width,
            height,
            data: vec![value; (width * height * 3) as usize],
        }
    }

    #[test]
    fn composition_halves_both_dimensions() {
        let observation = Observation {
            left: solid(4, 2, 100.0),
            right: solid(4, 2, 200.0),
        };
        let frame = compose_views(&observation).unwrap();
        assert_eq!((frame.width, frame.height), (4, 1));
        // Left half of the composite averages left-view pixels, right half
        // right-view pixels.
        assert_eq!(frame.pixel(0, 0), [100, 100, 100]);
        assert_eq!(frame.pixel(1, 0), [100, 100, 100]);
        assert_eq!(frame.pixel(2, 0), [200, 200, 200]);
        assert_eq!(frame.pixel(3, 0), [200, 200, 200]);
    }

    #[test]
    fn downsampling_averages_two_by_two_blocks() {
        // One 2x2 block per view with known mean.
        let left = Frame {
            width: 2,
            height: 2,
            data: vec![
                0.0, 0.0, 0.0, //
                40.0, 40.0, 40.0, //
                80.0, 80.0, 80.0, //
                120.0, 120.0, 120.0,
            ],
        };
        let right = solid(2, 2, 10.0);
        let frame = compose_views(&Observation { left, right }).unwrap();
        assert_eq!((frame.width, frame.height), (2, 1));
        assert_eq!(frame.pixel(0, 0), [60, 60, 60]);
        assert_eq!(frame.pixel(1, 0), [10, 10, 10]);
    }

    #[test]
    fn odd_trailing_pixels_are_dropped() {
        let observation = Observation {
            left: solid(3, 3, 50.0),
            right: solid(3, 3, 50.0),
        };
        let frame = compose_views(&observation).unwrap();
        assert_eq!((frame.width, frame.height), (3, 1));
    }

    #[test]
    fn mismatched_view_heights_are_rejected() {
        let observation = Observation {
            left: solid(2, 2, 0.0),
            right: solid(2, 4, 0.0),
        };
        assert_eq!(
            compose_views(&observation),
            Err(RenderError::MismatchedViews {
                left_height: 2,
                right_height: 4,
            })
        );
    }

    #[test]
    fn quantization_clamps_out_of_range_values() {
        let observation = Observation {
            left: solid(2, 2, 400.0),
            right: solid(2, 2, -25.0),
        };
        let frame = compose_views(&observation).unwrap();
        assert_eq!(frame.pixel(0, 0), [255, 255, 255]);
        assert_eq!(frame.pixel(1, 0), [0, 0, 0]);
    }
}
