//! Viewport state: the fit-to-container base transform, the user transform
//! layered on top of it, and the clamps that keep content on screen.

use glam::DVec2;

/// The `(scale, transX, transY)` triple applied uniformly to rendered content.
///
/// A point `p` in unscaled map coordinates lands on screen at
/// `(p + trans) * scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub scale: f64,
    pub trans: DVec2,
}

impl Transform {
    pub fn new(scale: f64, trans_x: f64, trans_y: f64) -> Self {
        Self {
            scale,
            trans: DVec2::new(trans_x, trans_y),
        }
    }

    /// Map coordinates to screen coordinates.
    pub fn apply(&self, p: DVec2) -> DVec2 {
        (p + self.trans) * self.scale
    }

    /// Screen coordinates back to map coordinates.
    pub fn invert(&self, screen: DVec2) -> DVec2 {
        screen / self.scale - self.trans
    }
}

/// Zoom bounds, expressed as multiples of the base scale
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self { min: 1.0, max: 8.0 }
    }
}

/// Current and base transform of a map inside its container
#[derive(Clone, Debug, PartialEq)]
pub struct ViewportState {
    pub scale: f64,
    pub trans_x: f64,
    pub trans_y: f64,
    pub base_scale: f64,
    pub base_trans_x: f64,
    pub base_trans_y: f64,
    /// Container size in pixels
    pub width: f64,
    pub height: f64,
    /// Unscaled content size (the dataset's width and height)
    pub default_width: f64,
    pub default_height: f64,
    pub limits: ZoomLimits,
}

impl ViewportState {
    /// Fit `content` into a `width` x `height` container and start at the
    /// base transform.
    pub fn new(content: DVec2, width: f64, height: f64, limits: ZoomLimits) -> Self {
        let mut state = Self {
            scale: 1.0,
            trans_x: 0.0,
            trans_y: 0.0,
            base_scale: 1.0,
            base_trans_x: 0.0,
            base_trans_y: 0.0,
            width,
            height,
            default_width: content.x,
            default_height: content.y,
            limits,
        };
        state.resize(width, height);
        state.reset();
        state
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.scale, self.trans_x, self.trans_y)
    }

    /// Zoom ratio relative to the base scale
    pub fn zoom(&self) -> f64 {
        self.scale / self.base_scale
    }

    pub fn reset(&mut self) {
        self.scale = self.base_scale;
        self.trans_x = self.base_trans_x;
        self.trans_y = self.base_trans_y;
    }

    /// Clamp a requested scale into `[zoomMin, zoomMax] * baseScale`.
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        let max = self.limits.max * self.base_scale;
        let min = self.limits.min * self.base_scale;
        if scale > max {
            max
        } else if scale < min || scale.is_nan() {
            min
        } else {
            scale
        }
    }

    /// Recompute the base transform for a new container size, letterboxing
    /// on the long axis, and rescale the user transform so the visual zoom
    /// level survives the resize.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        if self.default_width <= 0.0 || self.default_height <= 0.0 || width <= 0.0 || height <= 0.0
        {
            return;
        }

        let previous = self.base_scale;
        if width / height > self.default_width / self.default_height {
            self.base_scale = height / self.default_height;
            self.base_trans_x =
                (width - self.default_width * self.base_scale).abs() / (2.0 * self.base_scale);
            self.base_trans_y = 0.0;
        } else {
            self.base_scale = width / self.default_width;
            self.base_trans_y =
                (height - self.default_height * self.base_scale).abs() / (2.0 * self.base_scale);
            self.base_trans_x = 0.0;
        }

        let ratio = self.base_scale / previous;
        self.scale *= ratio;
        self.trans_x *= ratio;
        self.trans_y *= ratio;
    }

    /// Clamp the translation for the current scale.
    ///
    /// An axis whose content fits the container is pinned to the centered
    /// value; otherwise content edges may not leave the container.
    pub fn clamp_translation(&mut self) {
        let (min_x, max_x) = axis_bounds(self.width, self.default_width, self.scale);
        let (min_y, max_y) = axis_bounds(self.height, self.default_height, self.scale);
        self.trans_x = clamp_axis(self.trans_x, min_x, max_x);
        self.trans_y = clamp_axis(self.trans_y, min_y, max_y);
    }

    /// Translation that puts planar `anchor` (given negated, as focus
    /// requests supply it) at the container center at `scale`.
    pub fn centered_translation(&self, anchor: DVec2, scale: f64) -> DVec2 {
        anchor + DVec2::new(self.width, self.height) / (2.0 * scale)
    }

    /// Translation that keeps screen point `anchor` fixed while zooming to
    /// `scale`.
    pub fn anchored_translation(&self, anchor: DVec2, scale: f64) -> DVec2 {
        let step = scale / self.scale;
        DVec2::new(self.trans_x, self.trans_y) - (step - 1.0) / scale * anchor
    }
}

fn axis_bounds(viewport: f64, content: f64, scale: f64) -> (f64, f64) {
    if content * scale <= viewport {
        let centered = (viewport - content * scale) / (2.0 * scale);
        (centered, centered)
    } else {
        ((viewport - content * scale) / scale, 0.0)
    }
}

fn clamp_axis(value: f64, min: f64, max: f64) -> f64 {
    if value > max {
        max
    } else if value < min {
        min
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(width: f64, height: f64) -> ViewportState {
        ViewportState::new(
            DVec2::new(900.0, 440.0),
            width,
            height,
            ZoomLimits::default(),
        )
    }

    #[test]
    fn letterboxes_on_long_axis() {
        let wide = state(1800.0, 440.0);
        assert_eq!(wide.base_scale, 1.0);
        assert_eq!(wide.base_trans_x, 450.0);
        assert_eq!(wide.base_trans_y, 0.0);

        let tall = state(450.0, 880.0);
        assert_eq!(tall.base_scale, 0.5);
        assert_eq!(tall.base_trans_y, 660.0);
        assert_eq!(tall.base_trans_x, 0.0);
    }

    #[test]
    fn resize_preserves_zoom_ratio() {
        let mut s = state(900.0, 440.0);
        s.scale = 3.0;
        s.trans_x = -100.0;
        s.resize(1800.0, 880.0);
        assert_eq!(s.base_scale, 2.0);
        assert_eq!(s.scale, 6.0);
        assert_eq!(s.trans_x, -200.0);
        assert_eq!(s.zoom(), 3.0);
    }

    #[test]
    fn degenerate_sizes_keep_previous_base() {
        let mut s = state(900.0, 440.0);
        s.resize(0.0, 0.0);
        assert_eq!(s.base_scale, 1.0);
        assert!(s.scale.is_finite());
    }

    #[test]
    fn scale_clamps_to_limits() {
        let s = state(900.0, 440.0);
        assert_eq!(s.clamp_scale(1000.0), 8.0);
        assert_eq!(s.clamp_scale(0.001), 1.0);
        assert_eq!(s.clamp_scale(f64::NAN), 1.0);
        assert_eq!(s.clamp_scale(2.5), 2.5);
    }

    #[test]
    fn small_content_is_centered() {
        let mut s = state(900.0, 440.0);
        s.scale = 0.5;
        s.trans_x = 1000.0;
        s.trans_y = -1000.0;
        s.clamp_translation();
        assert_eq!(s.trans_x, 450.0);
        assert_eq!(s.trans_y, 220.0);
    }

    #[test]
    fn large_content_keeps_edges_in_view() {
        let mut s = state(900.0, 440.0);
        s.scale = 2.0;
        s.trans_x = 10.0;
        s.trans_y = -1000.0;
        s.clamp_translation();
        assert_eq!(s.trans_x, 0.0);
        assert_eq!(s.trans_y, -220.0);
    }

    #[test]
    fn anchored_zoom_keeps_screen_point_fixed() {
        let mut s = state(900.0, 440.0);
        s.scale = 2.0;
        s.trans_x = -100.0;
        s.trans_y = -50.0;
        let anchor = DVec2::new(300.0, 120.0);
        let before = s.transform().invert(anchor);
        let trans = s.anchored_translation(anchor, 4.0);
        let after = Transform::new(4.0, trans.x, trans.y).apply(before);
        assert!((after - anchor).length() < 1e-9);
    }

    #[test]
    fn centered_translation_puts_anchor_mid_screen() {
        let s = state(900.0, 440.0);
        let target = DVec2::new(120.0, 80.0);
        let trans = s.centered_translation(-target, 3.0);
        let screen = Transform::new(3.0, trans.x, trans.y).apply(target);
        assert!((screen - DVec2::new(450.0, 220.0)).length() < 1e-9);
    }
}
