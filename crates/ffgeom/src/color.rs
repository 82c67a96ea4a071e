//! RGBA colors and the HSV ramp used to tell labels apart.

/// Linear RGBA color, laid out the way the vertex shader reads it.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Opaque black. Also what unknown labels resolve to.
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// HSV to RGB with saturation pinned at 1.
///
/// `hue` is in degrees and must lie in `[0, 360)`; anything else (including
/// NaN) produces black at the requested opacity. `value` is clamped to
/// `[0, 1]`.
pub fn new_color(hue: f32, value: f32, opacity: f32) -> Color {
    if !(0.0..360.0).contains(&hue) {
        return Color::rgba(0.0, 0.0, 0.0, opacity);
    }

    let v = value.clamp(0.0, 1.0);
    let c = v; // chroma with S = 1
    let h = hue / 60.0;
    let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Color::rgba(r + m, g + m, b + m, opacity)
}
