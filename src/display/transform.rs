// Source-to-destination blit geometry
//
// Scaling is computed in a "working space": the destination with its axes
// swapped for quarter-turn rotations, so the blitter can rotate the source
// into it. The resulting rectangle is then mapped back to the real
// destination and shifted into the overscan margin.

use super::{Rect, Rotation, ScreenGeometry};
use crate::blit::{
    BlitDescriptor, BlitImage, BlitRotation, DEST_FORMAT, DEST_MEMORY_ID, SOURCE_FORMAT,
    SOURCE_MEMORY_ID,
};
use crate::error::{MirrorError, Result};
use crate::orientation::OrientationProvider;
use crate::settings::{MirrorSettings, ScalingMode};
use log::trace;

/// Values derived during the last successful transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformState {
    /// Rotation after resolving `Auto`
    pub current_rotation: Rotation,
    pub current_overscan_x: u32,
    pub current_overscan_y: u32,
}

/// Destination area the scaling math runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WorkingSpace {
    width: u32,
    height: u32,
    /// Physical size in mm, axes matching `width`/`height`
    size_mm: (u32, u32),
    /// Axes are swapped relative to the destination framebuffer
    flipped: bool,
}

/// Compute the blit for the current settings, resolving `Auto` rotation
/// through `orientation`.
pub fn compute_blit(
    src: &ScreenGeometry,
    dst: &ScreenGeometry,
    settings: &MirrorSettings,
    orientation: &dyn OrientationProvider,
) -> Result<(BlitDescriptor, TransformState)> {
    let rotation = settings.rotation.resolve(orientation);
    compute_blit_with_rotation(src, dst, settings, rotation)
}

/// Compute the blit for an already resolved rotation
pub fn compute_blit_with_rotation(
    src: &ScreenGeometry,
    dst: &ScreenGeometry,
    settings: &MirrorSettings,
    rotation: Rotation,
) -> Result<(BlitDescriptor, TransformState)> {
    if src.xres == 0 || src.yres == 0 {
        return Err(MirrorError::DegenerateGeometry("source has no pixels"));
    }
    if dst.xres == 0 || dst.yres == 0 {
        return Err(MirrorError::DegenerateGeometry("destination has no pixels"));
    }

    let (overscan_x, overscan_y) = settings.effective_overscan();
    let working = to_working_space(dst, rotation, overscan_x, overscan_y);

    let mut src_rect = Rect::new(0, 0, src.xres, src.yres);
    let scaled = match settings.scaling {
        ScalingMode::Stretch => Rect::new(0, 0, working.width, working.height),
        ScalingMode::Center => center(src, &working, &mut src_rect),
        ScalingMode::FitToScreen => fit_to_screen(src, &working)?,
    };
    let dst_rect = from_working_space(scaled, &working, overscan_x, overscan_y);

    trace!(
        "Transform {} -> {} ({:?}, {}): working {}x{} flipped={}",
        src,
        dst,
        settings.scaling,
        rotation,
        working.width,
        working.height,
        working.flipped
    );

    let descriptor = BlitDescriptor {
        src: BlitImage {
            width: src.xres,
            height: src.yres,
            format: SOURCE_FORMAT,
            memory_id: SOURCE_MEMORY_ID,
            offset: 0,
        },
        dst: BlitImage {
            width: dst.xres,
            height: dst.yres,
            format: DEST_FORMAT,
            memory_id: DEST_MEMORY_ID,
            offset: 0,
        },
        src_rect,
        dst_rect,
        rotation: BlitRotation::from(rotation),
    };

    let state = TransformState {
        current_rotation: rotation,
        current_overscan_x: overscan_x,
        current_overscan_y: overscan_y,
    };

    Ok((descriptor, state))
}

/// Destination area minus overscan, with axes swapped for 90°/270°
fn to_working_space(
    dst: &ScreenGeometry,
    rotation: Rotation,
    overscan_x: u32,
    overscan_y: u32,
) -> WorkingSpace {
    let width = dst.xres.saturating_sub(overscan_x);
    let height = dst.yres.saturating_sub(overscan_y);
    let size_mm = dst.physical_mm_or_pixels();

    if rotation.is_quarter_turn() {
        WorkingSpace {
            width: height,
            height: width,
            size_mm: (size_mm.1, size_mm.0),
            flipped: true,
        }
    } else {
        WorkingSpace {
            width,
            height,
            size_mm,
            flipped: false,
        }
    }
}

/// Map a working-space rectangle onto the destination framebuffer,
/// centered inside the overscan margin
fn from_working_space(rect: Rect, working: &WorkingSpace, overscan_x: u32, overscan_y: u32) -> Rect {
    let rect = if working.flipped { rect.transpose() } else { rect };
    rect.translate(overscan_x >> 1, overscan_y >> 1)
}

/// Pixel-for-pixel placement, cropping the source where it overflows
fn center(src: &ScreenGeometry, working: &WorkingSpace, src_rect: &mut Rect) -> Rect {
    let mut dst_rect = Rect::default();

    (dst_rect.x, dst_rect.w, src_rect.x, src_rect.w) = center_axis(src.xres, working.width);
    (dst_rect.y, dst_rect.h, src_rect.y, src_rect.h) = center_axis(src.yres, working.height);

    dst_rect
}

/// Returns (dst offset, dst extent, src offset, src extent) for one axis
fn center_axis(source: u32, working: u32) -> (u32, u32, u32, u32) {
    if source <= working {
        ((working - source) >> 1, source, 0, source)
    } else {
        (0, working, (source - working) >> 1, working)
    }
}

/// Preserve the source's physical aspect ratio, filling one axis
fn fit_to_screen(src: &ScreenGeometry, working: &WorkingSpace) -> Result<Rect> {
    let (src_w_mm, src_h_mm) = src.physical_mm_or_pixels();
    let (dst_w_mm, dst_h_mm) = working.size_mm;
    if dst_w_mm == 0 || dst_h_mm == 0 {
        return Err(MirrorError::DegenerateGeometry("destination physical size is zero"));
    }

    let (src_w_mm, src_h_mm) = (u64::from(src_w_mm), u64::from(src_h_mm));
    let (dst_w_mm, dst_h_mm) = (u64::from(dst_w_mm), u64::from(dst_h_mm));
    let (width, height) = (u64::from(working.width), u64::from(working.height));

    // Source size scaled to the destination's height / width
    let scale_to_x = src_w_mm * dst_h_mm / src_h_mm;
    let scale_to_y = src_h_mm * dst_w_mm / src_w_mm;

    let rect = if scale_to_x <= dst_w_mm {
        let w = clamp_u32(scale_to_x * width / dst_w_mm);
        Rect::new((working.width - w) >> 1, 0, w, working.height)
    } else {
        let h = clamp_u32(scale_to_y * height / dst_h_mm).min(working.height);
        Rect::new(0, (working.height - h) >> 1, working.width, h)
    };

    Ok(rect)
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
