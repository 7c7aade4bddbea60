use image::Luma;
use imageproc::definitions::Image;
use imageproc::rect::Rect;

use crate::error::{GrabCutError, GrabCutResult};
use crate::grabcut::maxflow::{Partition, Side};

/// Per-pixel segmentation label
///
/// Definite labels are hard constraints and are never reassigned by the
/// engine. Probable labels are rewritten after every cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// Definitely background
    Background,
    /// Definitely foreground
    Foreground,
    /// Probably background
    ProbableBackground,
    /// Probably foreground
    ProbableForeground,
}

impl Label {
    /// Byte code of the label as stored in an exported mask.
    pub const fn code(self) -> u8 {
        match self {
            Self::Background => 0,
            Self::Foreground => 1,
            Self::ProbableBackground => 2,
            Self::ProbableForeground => 3,
        }
    }

    /// Label for a byte code, `None` for codes outside `0..=3`.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Background),
            1 => Some(Self::Foreground),
            2 => Some(Self::ProbableBackground),
            3 => Some(Self::ProbableForeground),
            _ => None,
        }
    }

    /// Whether the label is a hard constraint.
    #[inline]
    pub const fn is_definite(self) -> bool {
        matches!(self, Self::Background | Self::Foreground)
    }

    /// Whether the label counts towards the foreground sample set.
    #[inline]
    pub const fn is_foreground(self) -> bool {
        matches!(self, Self::Foreground | Self::ProbableForeground)
    }
}

/// Grid of labels with the same dimensions as the segmented image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMask {
    labels: Vec<Label>,
    width: u32,
    height: u32,
}

impl LabelMask {
    /// Creates a mask with every cell set to `label`.
    pub fn filled(width: u32, height: u32, label: Label) -> Self {
        Self {
            labels: vec![label; width as usize * height as usize],
            width,
            height,
        }
    }

    /// Initializes a mask from a region already clamped to the image.
    ///
    /// Cells inside `region` start as probable foreground, everything else
    /// is definite background.
    pub fn from_region(width: u32, height: u32, region: Rect) -> Self {
        let mut mask = Self::filled(width, height, Label::Background);
        let left = region.left().max(0) as u32;
        let top = region.top().max(0) as u32;
        let right = (left + region.width()).min(width);
        let bottom = (top + region.height()).min(height);

        for y in top..bottom {
            let row = y as usize * width as usize;
            mask.labels[row + left as usize..row + right as usize]
                .fill(Label::ProbableForeground);
        }
        mask
    }

    /// Width of the mask
    #[inline]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the mask
    #[inline]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// (width, height) of the mask
    #[inline]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Labels in row-major order
    #[inline]
    pub fn as_slice(&self) -> &[Label] {
        &self.labels
    }

    /// Label at (x, y). Panics when out of bounds, like `ImageBuffer::get_pixel`.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Label {
        assert!(
            x < self.width && y < self.height,
            "label ({x}, {y}) is out of bounds for a {}x{} mask",
            self.width,
            self.height
        );
        self.labels[y as usize * self.width as usize + x as usize]
    }

    /// Number of cells counted as foreground (definite or probable).
    pub fn foreground_count(&self) -> usize {
        self.labels.iter().filter(|label| label.is_foreground()).count()
    }

    /// Rewrites every probable label from the side it landed on in `partition`.
    ///
    /// Definite labels are left untouched regardless of the cut.
    ///
    /// # Returns
    ///
    /// The number of labels that changed
    ///
    /// # Errors
    ///
    /// * `GrabCutError::InternalFault` - When the partition does not cover the mask
    pub fn apply_partition(&mut self, partition: &Partition) -> GrabCutResult<usize> {
        if partition.len() != self.labels.len() {
            return Err(GrabCutError::InternalFault(format!(
                "partition covers {} nodes but the mask has {} cells",
                partition.len(),
                self.labels.len()
            )));
        }

        let mut changed = 0;
        for (label, side) in self.labels.iter_mut().zip(partition.sides()) {
            if label.is_definite() {
                continue;
            }
            let updated = match side {
                Side::Source => Label::ProbableForeground,
                Side::Sink => Label::ProbableBackground,
            };
            if *label != updated {
                *label = updated;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Exports the labels as a grayscale image of byte codes.
    pub fn to_code_image(&self) -> Image<Luma<u8>> {
        Image::from_fn(self.width, self.height, |x, y| Luma([self.get(x, y).code()]))
    }
}
