//! Presentation sink: where composed frames go.

use weft_core::PresentError;

/// A composed frame, row-major RGBA pixels (see [`weft_memory::view::rgba`]).
///
/// The scheduler reuses one image across ticks, so sinks must copy
/// anything they keep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameImage {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl FrameImage {
    /// A black image of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Pixel `(x, y)`, or `None` out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Pixels as RGBA bytes.
    pub fn rgba_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.pixels.iter().flat_map(|p| p.to_le_bytes())
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut Vec<u32> {
        &mut self.pixels
    }

    /// Check the image against a surface of `width × height`.
    pub fn check_size(&self, width: u32, height: u32) -> Result<(), PresentError> {
        if self.width == width && self.height == height {
            Ok(())
        } else {
            Err(PresentError::SizeMismatch {
                expected_width: width,
                expected_height: height,
                actual_width: self.width,
                actual_height: self.height,
            })
        }
    }
}

/// Receives each composed frame.
///
/// An error skips the frame; the scheduler logs it and carries on.
pub trait PresentSink {
    /// Hand off one frame.
    fn present(&mut self, frame: &FrameImage) -> Result<(), PresentError>;
}

impl<F> PresentSink for F
where
    F: FnMut(&FrameImage) -> Result<(), PresentError>,
{
    fn present(&mut self, frame: &FrameImage) -> Result<(), PresentError> {
        self(frame)
    }
}

/// A sink that discards every frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl PresentSink for NullSink {
    fn present(&mut self, _frame: &FrameImage) -> Result<(), PresentError> {
        Ok(())
    }
}
