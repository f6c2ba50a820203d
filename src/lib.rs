//! hdmi-mirror - HDMI display mirroring core
//!
//! Computes the blit that copies the primary display onto an HDMI output,
//! decides when that geometry must be recomputed, and tracks the mirroring
//! session across cable and display-ownership events.

pub mod blit;
pub mod config;
pub mod display;
pub mod error;
pub mod mirror;
pub mod orientation;
pub mod session;
pub mod settings;

// Re-exports
pub use blit::{BlitDescriptor, BlitImage, BlitRotation, BlitSink};
pub use config::Config;
pub use display::{compute_blit, ChangeDetector, DisplayMode, Rect, Rotation, ScreenGeometry};
pub use error::{MirrorError, Result};
pub use mirror::{Mirror, MirrorStats};
pub use orientation::{ControlBlockOrientation, ManualOrientation, OrientationProvider};
pub use session::{HdmiOutput, MirrorPhase, MirrorReason, MirrorSession};
pub use settings::{MirrorSettings, RawMirrorSettings, RotationMode, ScalingMode, SettingsStore};
