use crate::foundation::error::{EffectgenError, EffectgenResult};

/// Bytes per packed RGB8 pixel.
pub const RGB_CHANNELS: usize = 3;

/// Absolute 0-based output frame number, assigned once at the first stage.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Output dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Create a validated resolution with non-zero sides.
    pub fn new(width: u32, height: u32) -> EffectgenResult<Self> {
        if width == 0 || height == 0 {
            return Err(EffectgenError::setup("width/height must be non-zero"));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels in one frame.
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of one packed RGB8 frame in bytes.
    pub fn frame_bytes(self) -> usize {
        self.pixel_count() * RGB_CHANNELS
    }
}

/// One video frame as tightly packed, row-major RGB8 samples.
///
/// The buffer length is always `width * height * 3`; it never changes after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    resolution: Resolution,
    data: Vec<u8>,
}

impl RawFrame {
    /// A black frame.
    pub fn black(resolution: Resolution) -> Self {
        Self {
            resolution,
            data: vec![0u8; resolution.frame_bytes()],
        }
    }

    /// Wrap an existing buffer, checking its length against `resolution`.
    pub fn from_bytes(resolution: Resolution, data: Vec<u8>) -> EffectgenResult<Self> {
        if data.len() != resolution.frame_bytes() {
            return Err(EffectgenError::setup(format!(
                "frame buffer size mismatch: got {} bytes, expected {}",
                data.len(),
                resolution.frame_bytes()
            )));
        }
        Ok(Self { resolution, data })
    }

    /// Frame dimensions.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.resolution.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.resolution.height
    }

    /// Borrow the packed RGB bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutably borrow the packed RGB bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Byte offset of pixel `(x, y)`.
    pub fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.resolution.width as usize + x as usize) * RGB_CHANNELS
    }

    /// Darken every sample by `multiplier` (clamped to `0..=1`), truncating toward zero.
    pub fn scale_brightness(&mut self, multiplier: f32) {
        let m = multiplier.clamp(0.0, 1.0);
        if m >= 1.0 {
            return;
        }
        for v in &mut self.data {
            *v = (f32::from(*v) * m) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
