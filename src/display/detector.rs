// Staleness detection for the cached blit descriptor

use super::{Rotation, ScreenGeometry};
use crate::blit::BlitDescriptor;
use crate::orientation::OrientationProvider;
use crate::settings::{MirrorSettings, RotationMode};
use log::{debug, trace};

/// Decides when the cached blit geometry must be recomputed
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_source: Option<ScreenGeometry>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the cached descriptor is stale.
    ///
    /// The pan offset is copied into the stored snapshot before comparing,
    /// so page flipping alone never triggers a recompute. Any other change
    /// to the source geometry replaces the snapshot and reports stale.
    pub fn needs_recompute(
        &mut self,
        current: &ScreenGeometry,
        last_blit: Option<&BlitDescriptor>,
        settings: &MirrorSettings,
        cached_rotation: Option<Rotation>,
        orientation: &dyn OrientationProvider,
    ) -> bool {
        match self.last_source.as_mut() {
            Some(last) => {
                last.yoffset = current.yoffset;
                if last != current {
                    debug!("Source geometry changed: {} -> {}", last, current);
                    *last = *current;
                    return true;
                }
            }
            None => {
                self.last_source = Some(*current);
                return true;
            }
        }

        let Some(blit) = last_blit else {
            return true;
        };

        if blit.src.width != current.xres || blit.src.height != current.yres {
            trace!(
                "Blit source {}x{} no longer matches {}x{}",
                blit.src.width,
                blit.src.height,
                current.xres,
                current.yres
            );
            return true;
        }

        if settings.rotation == RotationMode::Auto {
            let live = orientation.orientation();
            if cached_rotation != Some(live) {
                debug!("Orientation changed to {}", live);
                return true;
            }
        }

        false
    }

    /// Forget the stored snapshot so the next check reports stale
    pub fn reset(&mut self) {
        self.last_source = None;
    }
}
