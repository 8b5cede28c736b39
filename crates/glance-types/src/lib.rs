pub mod geometry;
pub mod target;

pub use geometry::{CropMargins, Point, Rect, ScreenSize};
pub use target::{ScanKey, TargetKind};
