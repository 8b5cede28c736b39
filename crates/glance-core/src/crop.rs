//! Capture-rectangle geometry: margin application, clamping, and the
//! corner-pair conversion used when marking a scan zone by hand.

use glance_types::{CropMargins, Point, Rect, ScreenSize};

/// Rectangles narrower or shorter than this are not worth recognizing.
pub const MIN_DIMENSION: u32 = 10;

/// Apply percentage margins to `base` and clamp the result onto the screen.
///
/// Margins above 100 % are treated as 100 %. When two opposing margins sum
/// to 100 % or more, both are reset to zero for that axis instead of
/// producing a degenerate rectangle. No minimum-size floor is applied; see
/// [`crop_rect`] for the fallback-carrying variant.
pub fn apply_margins(base: Rect, margins: CropMargins, screen: ScreenSize) -> Rect {
    let up = margins.up.min(100) as i64;
    let left = margins.left.min(100) as i64;
    let right = margins.right.min(100) as i64;
    let down = margins.down.min(100) as i64;

    let (left, right) = if left + right >= 100 { (0, 0) } else { (left, right) };
    let (up, down) = if up + down >= 100 { (0, 0) } else { (up, down) };

    let base_w = base.width as i64;
    let base_h = base.height as i64;
    let screen_w = screen.width as i64;
    let screen_h = screen.height as i64;

    let new_left = (base.left as i64 + base_w * left / 100).clamp(0, screen_w);
    let new_top = (base.top as i64 + base_h * up / 100).clamp(0, screen_h);
    let new_width = (base_w - base_w * left / 100 - base_w * right / 100)
        .clamp(0, screen_w - new_left);
    let new_height = (base_h - base_h * up / 100 - base_h * down / 100)
        .clamp(0, screen_h - new_top);

    Rect::new(
        new_left as i32,
        new_top as i32,
        new_width as u32,
        new_height as u32,
    )
}

/// Margin application with a safety floor: if the clamped result is below
/// [`MIN_DIMENSION`] on either axis, fall back to the whole screen.
pub fn crop_rect(base: Rect, margins: CropMargins, screen: ScreenSize) -> Rect {
    let cropped = apply_margins(base, margins, screen);
    if cropped.width < MIN_DIMENSION || cropped.height < MIN_DIMENSION {
        screen.bounds()
    } else {
        cropped
    }
}

/// Convert two marked corner points into whole-screen percentage margins.
///
/// The points may be given in any order; coordinates outside the screen are
/// clamped onto it first.
pub fn margins_from_corners(a: Point, b: Point, screen: ScreenSize) -> CropMargins {
    let screen_w = (screen.width.max(1)) as f64;
    let screen_h = (screen.height.max(1)) as f64;

    let clamp_x = |x: i32| (x.max(0) as f64).min(screen_w);
    let clamp_y = |y: i32| (y.max(0) as f64).min(screen_h);

    let left = clamp_x(a.x.min(b.x));
    let right = clamp_x(a.x.max(b.x));
    let top = clamp_y(a.y.min(b.y));
    let bottom = clamp_y(a.y.max(b.y));

    CropMargins {
        left: (left / screen_w * 100.0) as u8,
        right: ((screen_w - right) / screen_w * 100.0) as u8,
        up: (top / screen_h * 100.0) as u8,
        down: ((screen_h - bottom) / screen_h * 100.0) as u8,
    }
}
