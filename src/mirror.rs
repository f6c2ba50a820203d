//! Mirror coordinator.
//!
//! Owns the settings, the cached blit geometry and the session. Frame
//! reports and hotplug events may arrive from different threads; each kind
//! of state sits behind its own lock and the frame path works on a settings
//! snapshot.

use crate::blit::{BlitDescriptor, BlitSink};
use crate::display::{
    compute_blit_with_rotation, ChangeDetector, DisplayMode, Rect, ScreenGeometry, TransformState,
};
use crate::error::{MirrorError, Result};
use crate::orientation::OrientationProvider;
use crate::session::{HdmiOutput, MirrorPhase, MirrorSession};
use crate::settings::{MirrorSettings, SettingsStore};
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;

/// Frame path counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MirrorStats {
    /// Frames reported
    pub frames: u64,
    /// Descriptor recomputations attempted
    pub recomputes: u64,
    /// Recomputations that failed
    pub failed_recomputes: u64,
    /// Blits handed to the sink
    pub blits: u64,
}

#[derive(Default)]
struct FrameState {
    detector: ChangeDetector,
    transform: Option<TransformState>,
    descriptor: Option<BlitDescriptor>,
    /// Settings generation the descriptor was computed from
    settings_generation: Option<u64>,
    stats: MirrorStats,
}

pub struct Mirror {
    settings: Arc<SettingsStore>,
    orientation: Arc<dyn OrientationProvider>,
    blitter: Arc<dyn BlitSink>,
    session: MirrorSession,
    frame: Mutex<FrameState>,
}

impl Mirror {
    pub fn new(
        settings: MirrorSettings,
        orientation: Arc<dyn OrientationProvider>,
        output: Arc<dyn HdmiOutput>,
        blitter: Arc<dyn BlitSink>,
    ) -> Self {
        Self {
            settings: Arc::new(SettingsStore::new(settings)),
            orientation,
            blitter,
            session: MirrorSession::new(output),
            frame: Mutex::new(FrameState::default()),
        }
    }

    pub fn settings(&self) -> MirrorSettings {
        self.settings.get()
    }

    /// Replace the settings; the next frame recomputes its geometry
    pub fn set_settings(&self, settings: MirrorSettings) {
        self.settings.set(settings);
    }

    /// Shared handle for control-plane surfaces
    pub fn settings_store(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn is_mirroring(&self) -> bool {
        self.session.is_mirroring()
    }

    pub fn phase(&self) -> MirrorPhase {
        self.session.phase()
    }

    /// Cable plugged in. The sink may be a different display than last
    /// time, so the cached geometry is dropped once the new mode is set.
    /// Frames reported while the mode is being set do not survive it.
    pub fn on_cable_connect(&self) -> Result<DisplayMode> {
        let mode = self.session.on_cable_connect();
        self.invalidate();
        mode
    }

    pub fn on_cable_disconnect(&self) {
        self.session.on_cable_disconnect();
    }

    pub fn on_external_enable_request(&self) -> bool {
        self.session.on_external_enable_request()
    }

    pub fn on_external_disable_request(&self) -> Result<Option<DisplayMode>> {
        let resumed = self.session.on_external_disable_request();
        if matches!(resumed, Ok(Some(_)) | Err(_)) {
            self.invalidate();
        }
        resumed
    }

    /// Handle one blit opportunity.
    ///
    /// Recomputes the descriptor when it is stale, clearing the destination
    /// first, then submits it with the current scan offset. If the
    /// recompute fails nothing is submitted and the previous descriptor is
    /// kept.
    pub fn report_frame(&self, src: &ScreenGeometry, dst: &ScreenGeometry) -> Result<BlitDescriptor> {
        let (settings, generation) = self.settings.snapshot();
        // Sampled once per frame, outside the frame lock
        let rotation = settings.rotation.resolve(self.orientation.as_ref());

        let (descriptor, recomputed) = {
            let mut guard = self.frame.lock();
            let frame = &mut *guard;
            frame.stats.frames += 1;

            let cached_rotation = frame.transform.map(|t| t.current_rotation);
            let stale = frame.detector.needs_recompute(
                src,
                frame.descriptor.as_ref(),
                &settings,
                cached_rotation,
                &rotation,
            );
            let recompute = stale || frame.settings_generation != Some(generation);

            if recompute {
                debug!("Recalculating blit details");
                frame.stats.recomputes += 1;

                match compute_blit_with_rotation(src, dst, &settings, rotation) {
                    Ok((descriptor, transform)) => {
                        debug!("{}", descriptor);
                        frame.descriptor = Some(descriptor);
                        frame.transform = Some(transform);
                        frame.settings_generation = Some(generation);
                    }
                    Err(e) => {
                        frame.stats.failed_recomputes += 1;
                        warn!("Failed to recalculate blit details: {}", e);
                        return Err(e);
                    }
                }
            }

            let Some(descriptor) = frame.descriptor.as_mut() else {
                return Err(MirrorError::DegenerateGeometry("no blit descriptor available"));
            };
            descriptor.src.offset = src.scan_offset();
            frame.stats.blits += 1;

            (*descriptor, recompute)
        };

        if recomputed {
            self.blitter.fill_rect(dst, Rect::new(0, 0, dst.xres, dst.yres), 0);
        }
        self.blitter.blit_on_vsync(&descriptor);

        Ok(descriptor)
    }

    /// Descriptor used for the most recent blit
    pub fn descriptor(&self) -> Option<BlitDescriptor> {
        self.frame.lock().descriptor
    }

    pub fn transform_state(&self) -> Option<TransformState> {
        self.frame.lock().transform
    }

    pub fn stats(&self) -> MirrorStats {
        self.frame.lock().stats.clone()
    }

    fn invalidate(&self) {
        let mut frame = self.frame.lock();
        frame.detector.reset();
        frame.settings_generation = None;
    }
}
