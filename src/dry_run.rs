// Logging stand-ins for the HDMI driver and the blit engine

use hdmi_mirror::blit::{BlitDescriptor, BlitSink};
use hdmi_mirror::config::OutputConfig;
use hdmi_mirror::display::{DisplayMode, PhysicalSize, Rect, ScreenGeometry};
use hdmi_mirror::session::{HdmiOutput, MirrorReason};
use hdmi_mirror::MirrorError;
use log::{debug, info, trace};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// HDMI output that only records what a real driver would do
pub struct DryRunOutput {
    resolution: Option<(u32, u32)>,
    physical: PhysicalSize,
    connected: AtomicBool,
    running: AtomicBool,
    mode: Mutex<Option<DisplayMode>>,
}

impl DryRunOutput {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            resolution: config.resolution.map(|[w, h]| (w, h)),
            physical: config.physical_size(),
            connected: AtomicBool::new(config.connected),
            running: AtomicBool::new(false),
            mode: Mutex::new(None),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    /// Mirror loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// HDMI framebuffer geometry for the active mode
    pub fn destination(&self) -> Option<ScreenGeometry> {
        self.mode.lock().map(|mode| mode.geometry(self.physical))
    }
}

impl HdmiOutput for DryRunOutput {
    fn best_resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }

    fn set_mode(&self, mode: &DisplayMode) -> hdmi_mirror::Result<()> {
        if !self.is_cable_connected() {
            return Err(MirrorError::ModeSet(format!("{}: no sink attached", mode)));
        }
        debug!("Mode set: {}", mode);
        *self.mode.lock() = Some(*mode);
        Ok(())
    }

    fn start_mirroring(&self, reason: MirrorReason) {
        info!("Mirror loop started ({}, code {})", reason, reason.code());
        self.running.store(true, Ordering::Relaxed);
    }

    fn stop_mirroring(&self, reason: MirrorReason) {
        info!("Mirror loop stopped ({}, code {})", reason, reason.code());
        self.running.store(false, Ordering::Relaxed);
    }

    fn is_cable_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

/// Blit engine that logs requests instead of executing them
#[derive(Default)]
pub struct LogBlitter {
    submitted: AtomicU64,
}

impl LogBlitter {
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }
}

impl BlitSink for LogBlitter {
    fn fill_rect(&self, target: &ScreenGeometry, rect: Rect, color: u32) {
        debug!("Fill {} on {} with {:#06x}", rect, target, color);
    }

    fn blit_on_vsync(&self, request: &BlitDescriptor) {
        let count = self.submitted.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(
            "Blit #{} {} -> {} offset={}",
            count,
            request.src_rect,
            request.dst_rect,
            request.src.offset
        );
    }
}
