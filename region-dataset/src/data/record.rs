use super::load_rgb_image;
use crate::common::*;

/// Bounding box in pixel units.
pub type PixelBox = TLBR<i32>;

/// Per-coordinate offset to the matched ground truth box in `[x1, y1, x2, y2]` order.
pub type Delta = [i32; 4];

/// A ground truth box with its class.
pub type GroundTruth = Label<PixelBox, Class>;

/// The record with image path and boxes, but without image pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// The image path relative to the image root of the source.
    pub path: PathBuf,
    /// Ground truth boxes in annotation order.
    pub bboxes: Vec<GroundTruth>,
}

impl FileRecord {
    /// Read the image pixels.
    pub fn load(&self, image_root: &Path) -> Result<ImageRecord> {
        let file = image_root.join(&self.path);
        let image = load_rgb_image(&file)?;
        Ok(ImageRecord {
            path: self.path.clone(),
            image,
            bboxes: self.bboxes.clone(),
        })
    }
}

/// The record with image pixels and boxes.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub image: RgbImage,
    pub bboxes: Vec<GroundTruth>,
}
