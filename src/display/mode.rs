// HDMI framebuffer mode selection

use super::{PhysicalSize, PixelFormat, ScreenGeometry};
use crate::error::{MirrorError, Result};
use crate::session::HdmiOutput;
use log::{info, warn};
use std::fmt;

/// Bit layout of one color channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorChannel {
    pub offset: u32,
    pub length: u32,
    pub msb_right: bool,
}

impl ColorChannel {
    const fn new(offset: u32, length: u32) -> Self {
        Self {
            offset,
            length,
            msb_right: false,
        }
    }
}

/// Mode-set request for the HDMI framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    pub xres_virtual: u32,
    pub yres_virtual: u32,
    pub bits_per_pixel: u32,
    pub red: ColorChannel,
    pub green: ColorChannel,
    pub blue: ColorChannel,
    pub interlaced: bool,
    /// Apply immediately even if the mode looks unchanged
    pub force: bool,
}

impl DisplayMode {
    /// Heights up to this get a double-height virtual buffer
    pub const DOUBLE_BUFFER_MAX_HEIGHT: u32 = 720;

    /// RGB565 progressive mode for the given resolution
    pub fn for_resolution(width: u32, height: u32) -> Self {
        let yres_virtual = if height > Self::DOUBLE_BUFFER_MAX_HEIGHT {
            height
        } else {
            height * 2
        };

        Self {
            width,
            height,
            xres_virtual: width,
            yres_virtual,
            bits_per_pixel: PixelFormat::Rgb565.bits_per_pixel(),
            red: ColorChannel::new(11, 5),
            green: ColorChannel::new(5, 6),
            blue: ColorChannel::new(0, 5),
            interlaced: false,
            force: true,
        }
    }

    /// Framebuffer geometry once this mode is active
    pub fn geometry(&self, physical: PhysicalSize) -> ScreenGeometry {
        ScreenGeometry {
            xres_virtual: self.xres_virtual,
            yres_virtual: self.yres_virtual,
            ..ScreenGeometry::new(self.width, self.height, PixelFormat::Rgb565, physical)
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} (virtual {}x{}, {} bpp)",
            self.width, self.height, self.xres_virtual, self.yres_virtual, self.bits_per_pixel
        )
    }
}

/// Query the best resolution from the display and apply it
pub fn select_resolution(output: &dyn HdmiOutput) -> Result<DisplayMode> {
    let (width, height) = output.best_resolution().ok_or(MirrorError::NoResolution)?;
    if width == 0 || height == 0 {
        warn!("Display reported an empty resolution {}x{}", width, height);
        return Err(MirrorError::NoResolution);
    }

    let mode = DisplayMode::for_resolution(width, height);
    info!("Setting HDMI to {}x{}", width, height);
    output.set_mode(&mode)?;
    Ok(mode)
}
