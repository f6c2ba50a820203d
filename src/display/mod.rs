// Framebuffer geometry shared by the transform engine and change detector
//
// These are read-only snapshots of what the display subsystem reports for
// the primary panel (source) and the HDMI framebuffer (destination).

pub mod detector;
pub mod mode;
pub mod transform;

pub use detector::ChangeDetector;
pub use mode::{select_resolution, ColorChannel, DisplayMode};
pub use transform::{compute_blit, compute_blit_with_rotation, TransformState};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Swap the x/y and w/h axes
    pub fn transpose(self) -> Self {
        Self {
            x: self.y,
            y: self.x,
            w: self.h,
            h: self.w,
        }
    }

    pub fn translate(self, dx: u32, dy: u32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.w, self.h, self.x, self.y)
    }
}

/// Unit a physical screen size is reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    /// Panels report millimeters
    #[default]
    Mm,
    /// EDID reports centimeters
    Cm,
}

impl LengthUnit {
    pub fn to_mm(self, value: u32) -> u32 {
        match self {
            LengthUnit::Mm => value,
            LengthUnit::Cm => value.saturating_mul(10),
        }
    }
}

/// Physical size of a screen's visible area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhysicalSize {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub unit: LengthUnit,
}

impl PhysicalSize {
    pub const fn mm(width: u32, height: u32) -> Self {
        Self { width, height, unit: LengthUnit::Mm }
    }

    pub const fn cm(width: u32, height: u32) -> Self {
        Self { width, height, unit: LengthUnit::Cm }
    }

    /// Size normalized to millimeters
    pub fn in_mm(&self) -> (u32, u32) {
        (self.unit.to_mm(self.width), self.unit.to_mm(self.height))
    }
}

/// Pixel layouts the blitter understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    #[default]
    Rgbx8888,
    Rgb565,
}

impl PixelFormat {
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgbx8888 => 32,
            PixelFormat::Rgb565 => 16,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Rgbx8888 => write!(f, "RGBX8888"),
            PixelFormat::Rgb565 => write!(f, "RGB565"),
        }
    }
}

/// Concrete display rotation, clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Map a 0-based orientation index (0 => 0°, 3 => 270°)
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Rotation::Deg0),
            1 => Some(Rotation::Deg90),
            2 => Some(Rotation::Deg180),
            3 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// True when the rotation swaps the width and height axes
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Snapshot of a framebuffer's variable screen information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenGeometry {
    /// Visible resolution
    pub xres: u32,
    pub yres: u32,

    /// Virtual resolution (page-flipped buffers are taller than visible)
    pub xres_virtual: u32,
    pub yres_virtual: u32,

    /// Current pan position inside the virtual buffer
    pub xoffset: u32,
    pub yoffset: u32,

    pub bits_per_pixel: u32,

    /// Physical size of the visible area, zero if unknown
    pub physical: PhysicalSize,

    pub format: PixelFormat,
}

impl ScreenGeometry {
    /// Single-buffered geometry with matching virtual resolution
    pub fn new(xres: u32, yres: u32, format: PixelFormat, physical: PhysicalSize) -> Self {
        Self {
            xres,
            yres,
            xres_virtual: xres,
            yres_virtual: yres,
            xoffset: 0,
            yoffset: 0,
            bits_per_pixel: format.bits_per_pixel(),
            physical,
            format,
        }
    }

    /// Bytes per row of the virtual buffer
    pub fn line_length(&self) -> u32 {
        self.xres_virtual.saturating_mul(self.bits_per_pixel >> 3)
    }

    /// Byte offset of the current scan position
    pub fn scan_offset(&self) -> u32 {
        self.yoffset.saturating_mul(self.line_length())
    }

    /// Physical size in millimeters, or the pixel resolution when either
    /// physical dimension is unknown.
    ///
    /// The fallback keeps aspect-ratio math away from a zero divisor. It
    /// assumes square pixels, which is only an approximation.
    pub fn physical_mm_or_pixels(&self) -> (u32, u32) {
        let (w, h) = self.physical.in_mm();
        if w == 0 || h == 0 {
            (self.xres, self.yres)
        } else {
            (w, h)
        }
    }
}

impl fmt::Display for ScreenGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} (virtual {}x{}, offset {},{}, {} bpp, {})",
            self.xres,
            self.yres,
            self.xres_virtual,
            self.yres_virtual,
            self.xoffset,
            self.yoffset,
            self.bits_per_pixel,
            self.format
        )
    }
}
