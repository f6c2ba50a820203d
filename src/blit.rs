//! Blit requests handed to the display hardware.
//!
//! The mirroring core only describes a blit. Executing it (on vsync) and
//! clearing framebuffers are the job of a [`BlitSink`].

use crate::display::{PixelFormat, Rect, Rotation, ScreenGeometry};
use serde::Serialize;
use std::fmt;

/// Memory id of the primary panel framebuffer
pub const SOURCE_MEMORY_ID: u32 = 0x2000_0000;

/// Memory id of the HDMI framebuffer
pub const DEST_MEMORY_ID: u32 = 0x2000_0001;

/// Source images are always 32-bit on the mirroring path
pub const SOURCE_FORMAT: PixelFormat = PixelFormat::Rgbx8888;

/// The HDMI framebuffer runs at 16 bpp
pub const DEST_FORMAT: PixelFormat = PixelFormat::Rgb565;

/// One side of a blit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlitImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub memory_id: u32,
    /// Byte offset of the first scanned line
    pub offset: u32,
}

impl fmt::Display for BlitImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {} mem={:#x} offset={}",
            self.width, self.height, self.format, self.memory_id, self.offset
        )
    }
}

/// Rotation flag as the blitter understands it.
///
/// The blitter rotates counter to the display, so a 90° display rotation
/// is requested as `Rot270` and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlitRotation {
    Nop,
    Rot90,
    Rot180,
    Rot270,
}

impl From<Rotation> for BlitRotation {
    fn from(rotation: Rotation) -> Self {
        match rotation {
            Rotation::Deg0 => BlitRotation::Nop,
            Rotation::Deg90 => BlitRotation::Rot270,
            Rotation::Deg180 => BlitRotation::Rot180,
            Rotation::Deg270 => BlitRotation::Rot90,
        }
    }
}

/// Complete description of a mirror blit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlitDescriptor {
    pub src: BlitImage,
    pub dst: BlitImage,
    pub src_rect: Rect,
    pub dst_rect: Rect,
    pub rotation: BlitRotation,
}

impl fmt::Display for BlitDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "blit request:")?;
        writeln!(f, "  src: {}", self.src)?;
        writeln!(f, "  dst: {}", self.dst)?;
        writeln!(f, "  src_rect: {}", self.src_rect)?;
        writeln!(f, "  dst_rect: {}", self.dst_rect)?;
        write!(f, "  rotation: {:?}", self.rotation)
    }
}

/// Hardware side of the mirror loop
pub trait BlitSink: Send + Sync {
    /// Fill `rect` of the target framebuffer with a solid color
    fn fill_rect(&self, target: &ScreenGeometry, rect: Rect, color: u32);

    /// Queue the blit for the next vsync
    fn blit_on_vsync(&self, request: &BlitDescriptor);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blitter_rotation_is_inverted_for_quarter_turns() {
        assert_eq!(BlitRotation::from(Rotation::Deg0), BlitRotation::Nop);
        assert_eq!(BlitRotation::from(Rotation::Deg90), BlitRotation::Rot270);
        assert_eq!(BlitRotation::from(Rotation::Deg180), BlitRotation::Rot180);
        assert_eq!(BlitRotation::from(Rotation::Deg270), BlitRotation::Rot90);
    }
}
