//! Mapping between the model's reference resolution and the real screen.

use crate::error::ToolError;

/// Per-axis linear map from reference coordinates to screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenScaler {
    reference: (u32, u32),
    actual: (u32, u32),
}

impl ScreenScaler {
    pub fn new(reference: (u32, u32), actual: (u32, u32)) -> Self {
        Self { reference, actual }
    }

    pub fn reference(&self) -> (u32, u32) {
        self.reference
    }

    fn factors(&self) -> (f64, f64) {
        (
            f64::from(self.actual.0) / f64::from(self.reference.0.max(1)),
            f64::from(self.actual.1) / f64::from(self.reference.1.max(1)),
        )
    }

    /// Convert a reference-frame point to screen pixels.
    ///
    /// Points outside `0..reference` on either axis are rejected.
    pub fn to_screen(&self, x: i64, y: i64) -> Result<(i32, i32), ToolError> {
        let (ref_w, ref_h) = self.reference;
        if x < 0 || y < 0 || x >= i64::from(ref_w) || y >= i64::from(ref_h) {
            return Err(ToolError::InvalidArguments(format!(
                "coordinate ({x}, {y}) is outside the {ref_w}x{ref_h} screen"
            )));
        }
        let (fx, fy) = self.factors();
        // Flooring keeps the result inside 0..actual on both axes.
        Ok((
            (x as f64 * fx).floor() as i32,
            (y as f64 * fy).floor() as i32,
        ))
    }

    /// Convert a screen pixel back to the reference frame.
    pub fn to_reference(&self, x: i32, y: i32) -> (i64, i64) {
        let (fx, fy) = self.factors();
        if fx == 0.0 || fy == 0.0 {
            return (0, 0);
        }
        (
            (f64::from(x) / fx).round() as i64,
            (f64::from(y) / fy).round() as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_sizes_match() {
        let s = ScreenScaler::new((1920, 1080), (1920, 1080));
        assert_eq!(s.to_screen(0, 0).unwrap(), (0, 0));
        assert_eq!(s.to_screen(1919, 1079).unwrap(), (1919, 1079));
        assert_eq!(s.to_reference(640, 360), (640, 360));
    }

    #[test]
    fn upscales_per_axis_independently() {
        let s = ScreenScaler::new((1920, 1080), (3840, 1620));
        assert_eq!(s.to_screen(100, 100).unwrap(), (200, 150));
        assert_eq!(s.to_screen(960, 540).unwrap(), (1920, 810));
        assert_eq!(s.to_reference(200, 150), (100, 100));
    }

    #[test]
    fn downscale_stays_inside_screen() {
        let s = ScreenScaler::new((1920, 1080), (1280, 720));
        let (x, y) = s.to_screen(1919, 1079).unwrap();
        assert!(x < 1280 && y < 720, "got ({x}, {y})");
    }

    #[test]
    fn out_of_frame_points_are_rejected() {
        let s = ScreenScaler::new((1920, 1080), (2560, 1440));
        assert!(s.to_screen(-1, 10).is_err());
        assert!(s.to_screen(10, 1080).is_err());
        let err = s.to_screen(1920, 0).unwrap_err();
        assert!(err.to_string().contains("outside the 1920x1080 screen"), "got: {err}");
    }

    #[cfg(feature = "fuzz-tests")]
    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn rescale_is_linear_and_monotonic(
                actual_w in 320u32..8000,
                actual_h in 240u32..5000,
                x1 in 0i64..1920,
                x2 in 0i64..1920,
                y in 0i64..1080,
            ) {
                let s = ScreenScaler::new((1920, 1080), (actual_w, actual_h));
                let (a, _) = s.to_screen(x1, y).unwrap();
                let (b, by) = s.to_screen(x2, y).unwrap();
                let factor = f64::from(actual_w) / 1920.0;
                let expected = (x2 - x1) as f64 * factor;
                prop_assert!(((b - a) as f64 - expected).abs() < 1.0);
                if x1 <= x2 {
                    prop_assert!(a <= b);
                }
                prop_assert!(b >= 0 && (b as u32) < actual_w);
                prop_assert!(by >= 0 && (by as u32) < actual_h);
            }
        }
    }
}
