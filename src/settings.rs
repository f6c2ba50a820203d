//! User-adjustable mirroring settings.
//!
//! `SettingsStore` is the single owner of the live settings. Every
//! mutation bumps a generation counter so the frame path can tell that its
//! cached transform was computed from older settings.

use crate::display::Rotation;
use crate::error::{MirrorError, Result};
use crate::orientation::OrientationProvider;
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// Requested rotation of the mirrored image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RotationMode {
    /// Follow the live orientation of the primary display
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "0")]
    Rotate0,
    #[serde(rename = "90")]
    Rotate90,
    #[serde(rename = "180")]
    Rotate180,
    #[serde(rename = "270")]
    Rotate270,
}

impl RotationMode {
    /// The fixed rotation, or `None` for `Auto`
    pub fn fixed(self) -> Option<Rotation> {
        match self {
            RotationMode::Auto => None,
            RotationMode::Rotate0 => Some(Rotation::Deg0),
            RotationMode::Rotate90 => Some(Rotation::Deg90),
            RotationMode::Rotate180 => Some(Rotation::Deg180),
            RotationMode::Rotate270 => Some(Rotation::Deg270),
        }
    }

    /// Resolve to a concrete rotation, querying `orientation` for `Auto`
    pub fn resolve(self, orientation: &dyn OrientationProvider) -> Rotation {
        match self.fixed() {
            Some(rotation) => rotation,
            None => orientation.orientation(),
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            RotationMode::Auto => 0,
            RotationMode::Rotate0 => 1,
            RotationMode::Rotate90 => 2,
            RotationMode::Rotate180 => 3,
            RotationMode::Rotate270 => 4,
        }
    }
}

impl TryFrom<u32> for RotationMode {
    type Error = MirrorError;

    fn try_from(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(RotationMode::Auto),
            1 => Ok(RotationMode::Rotate0),
            2 => Ok(RotationMode::Rotate90),
            3 => Ok(RotationMode::Rotate180),
            4 => Ok(RotationMode::Rotate270),
            other => Err(MirrorError::UnknownRotation(other)),
        }
    }
}

/// How the source image is fitted into the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// Scale to fill one axis while preserving the physical aspect ratio
    #[default]
    FitToScreen,
    /// Pixel-for-pixel, centered and cropped
    Center,
    /// Fill the whole destination, ignoring aspect ratio
    Stretch,
}

impl ScalingMode {
    pub fn as_raw(self) -> u32 {
        match self {
            ScalingMode::FitToScreen => 0,
            ScalingMode::Center => 1,
            ScalingMode::Stretch => 2,
        }
    }
}

impl TryFrom<u32> for ScalingMode {
    type Error = MirrorError;

    fn try_from(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(ScalingMode::FitToScreen),
            1 => Ok(ScalingMode::Center),
            2 => Ok(ScalingMode::Stretch),
            other => Err(MirrorError::UnknownScaling(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorSettings {
    pub rotation: RotationMode,
    pub scaling: ScalingMode,
    /// Pixels trimmed from the destination width, split across both edges
    pub overscan_x: u32,
    /// Pixels trimmed from the destination height, split across both edges
    pub overscan_y: u32,
    pub audio_over_hdmi: bool,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            rotation: RotationMode::Auto,
            scaling: ScalingMode::FitToScreen,
            overscan_x: 60,
            overscan_y: 60,
            audio_over_hdmi: true,
        }
    }
}

impl MirrorSettings {
    /// Overscan actually applied. Center scaling places pixels 1:1 and
    /// never trims.
    pub fn effective_overscan(&self) -> (u32, u32) {
        match self.scaling {
            ScalingMode::Center => (0, 0),
            _ => (self.overscan_x, self.overscan_y),
        }
    }
}

/// Settings block as exchanged with the control plane
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawMirrorSettings {
    pub rotation: u32,
    pub scaling: u32,
    pub overscan_x: i32,
    pub overscan_y: i32,
    pub audio_over_hdmi: i32,
}

impl From<MirrorSettings> for RawMirrorSettings {
    fn from(settings: MirrorSettings) -> Self {
        Self {
            rotation: settings.rotation.as_raw(),
            scaling: settings.scaling.as_raw(),
            overscan_x: i32::try_from(settings.overscan_x).unwrap_or(i32::MAX),
            overscan_y: i32::try_from(settings.overscan_y).unwrap_or(i32::MAX),
            audio_over_hdmi: i32::from(settings.audio_over_hdmi),
        }
    }
}

impl TryFrom<RawMirrorSettings> for MirrorSettings {
    type Error = MirrorError;

    fn try_from(raw: RawMirrorSettings) -> Result<Self> {
        let overscan_x = u32::try_from(raw.overscan_x).map_err(|_| MirrorError::InvalidOverscan {
            axis: 'x',
            value: raw.overscan_x,
        })?;
        let overscan_y = u32::try_from(raw.overscan_y).map_err(|_| MirrorError::InvalidOverscan {
            axis: 'y',
            value: raw.overscan_y,
        })?;

        Ok(Self {
            rotation: RotationMode::try_from(raw.rotation)?,
            scaling: ScalingMode::try_from(raw.scaling)?,
            overscan_x,
            overscan_y,
            audio_over_hdmi: raw.audio_over_hdmi != 0,
        })
    }
}

pub struct SettingsStore {
    settings: RwLock<MirrorSettings>,
    generation: AtomicU64,
}

impl SettingsStore {
    pub fn new(initial: MirrorSettings) -> Self {
        Self {
            settings: RwLock::new(initial),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current settings
    pub fn get(&self) -> MirrorSettings {
        *self.settings.read()
    }

    /// Settings together with the generation they belong to
    pub fn snapshot(&self) -> (MirrorSettings, u64) {
        let guard = self.settings.read();
        (*guard, self.generation.load(Ordering::Acquire))
    }

    /// Replace all settings. No range validation is performed.
    pub fn set(&self, settings: MirrorSettings) {
        self.update(|current| *current = settings);
    }

    /// Incremented on every mutation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut MirrorSettings),
    {
        let mut guard = self.settings.write();
        f(&mut *guard);
        self.generation.fetch_add(1, Ordering::AcqRel);
        debug!("Mirror settings updated: {:?}", *guard);
    }

    pub fn get_raw(&self) -> RawMirrorSettings {
        self.get().into()
    }

    /// Apply a raw control-plane block. Unknown enum values are rejected
    /// and leave the current settings untouched.
    pub fn set_raw(&self, raw: RawMirrorSettings) -> Result<()> {
        let settings = MirrorSettings::try_from(raw)?;
        self.set(settings);
        Ok(())
    }

    /// Apply a partial JSON settings object
    pub fn apply_settings_json(&self, json_str: &str) {
        let value: Value = match serde_json::from_str(json_str) {
            Ok(value) => value,
            Err(err) => {
                debug!("SETTINGS parse failed: {}", err);
                return;
            }
        };

        let rotation = value
            .get("rotation")
            .and_then(|v| RotationMode::deserialize(v).ok());
        let scaling = value
            .get("scaling")
            .and_then(|v| ScalingMode::deserialize(v).ok());
        let overscan_x = value.get("overscan_x").and_then(|v| v.as_u64());
        let overscan_y = value.get("overscan_y").and_then(|v| v.as_u64());
        let audio = value.get("audio_over_hdmi").and_then(|v| v.as_bool());

        if rotation.is_none()
            && scaling.is_none()
            && overscan_x.is_none()
            && overscan_y.is_none()
            && audio.is_none()
        {
            debug!("SETTINGS message carried no mirror fields");
            return;
        }

        self.update(|settings| {
            if let Some(rotation) = rotation {
                settings.rotation = rotation;
            }
            if let Some(scaling) = scaling {
                settings.scaling = scaling;
            }
            if let Some(x) = overscan_x {
                settings.overscan_x = u32::try_from(x).unwrap_or(u32::MAX);
            }
            if let Some(y) = overscan_y {
                settings.overscan_y = u32::try_from(y).unwrap_or(u32::MAX);
            }
            if let Some(enabled) = audio {
                settings.audio_over_hdmi = enabled;
            }
        });
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(MirrorSettings::default())
    }
}
