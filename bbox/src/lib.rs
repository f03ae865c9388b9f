//! Safe bounding box types and functions.

mod common;

pub use rect::*;
pub mod rect;

pub use tlbr::*;
pub mod tlbr;

/// The epsilon added to the union area when computing IoU.
pub const DEFAULT_IOU_EPSILON: f64 = 1e-5;

pub mod prelude {
    pub use crate::rect::{Rect, RectNum};
}
