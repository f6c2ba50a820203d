//! Orientation of the primary display.
//!
//! The display server publishes its state in a small shared control block.
//! Only [`ControlBlockOrientation`] knows that layout; the rest of the crate
//! talks to an [`OrientationProvider`].

use crate::display::Rotation;
use crate::error::{MirrorError, Result};
use log::{trace, warn};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};

/// Source of the live display orientation.
///
/// Implementations never fail: on any read problem they log and report
/// `Rotation::Deg0`.
pub trait OrientationProvider: Send + Sync {
    fn orientation(&self) -> Rotation;
}

/// Per-display record inside the control block
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayRecord {
    pub width: u16,
    pub height: u16,
    pub format: u8,
    /// 0-based orientation index
    pub orientation: u8,
    pub fps: f32,
    pub density: f32,
    pub xdpi: f32,
    pub ydpi: f32,
}

impl DisplayRecord {
    pub const SIZE: usize = 32;

    fn parse(bytes: &[u8]) -> Self {
        Self {
            width: u16::from_le_bytes([bytes[0], bytes[1]]),
            height: u16::from_le_bytes([bytes[2], bytes[3]]),
            format: bytes[4],
            orientation: bytes[5],
            // bytes[6..8] reserved
            fps: read_f32(bytes, 8),
            density: read_f32(bytes, 12),
            xdpi: read_f32(bytes, 16),
            ydpi: read_f32(bytes, 20),
            // bytes[24..32] padding
        }
    }
}

/// Decoded display server control block
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlBlock {
    pub connected: bool,
    pub displays: [DisplayRecord; ControlBlock::DISPLAYS],
}

impl ControlBlock {
    pub const DISPLAYS: usize = 4;
    const HEADER_SIZE: usize = 32;
    pub const SIZE: usize = Self::HEADER_SIZE + Self::DISPLAYS * DisplayRecord::SIZE;

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(MirrorError::ControlBlock(format!(
                "short read: {} of {} bytes",
                bytes.len(),
                Self::SIZE
            )));
        }

        let mut displays = [DisplayRecord::default(); Self::DISPLAYS];
        for (index, record) in displays.iter_mut().enumerate() {
            let start = Self::HEADER_SIZE + index * DisplayRecord::SIZE;
            *record = DisplayRecord::parse(&bytes[start..start + DisplayRecord::SIZE]);
        }

        Ok(Self {
            connected: bytes[0] != 0,
            displays,
        })
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        File::open(path)?
            .take(Self::SIZE as u64)
            .read_to_end(&mut buf)?;
        Self::parse(&buf)
    }
}

fn read_f32(bytes: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Reads the orientation of display 0 from a control block file
pub struct ControlBlockOrientation {
    path: PathBuf,
}

impl ControlBlockOrientation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OrientationProvider for ControlBlockOrientation {
    fn orientation(&self) -> Rotation {
        let block = match ControlBlock::read_from(&self.path) {
            Ok(block) => block,
            Err(e) => {
                warn!("Failed to read control block {}: {}", self.path.display(), e);
                return Rotation::Deg0;
            }
        };

        let raw = block.displays[0].orientation;
        match Rotation::from_index(raw) {
            Some(rotation) => {
                trace!("Display orientation: {}", rotation);
                rotation
            }
            None => {
                warn!("Invalid orientation {} in control block", raw);
                Rotation::Deg0
            }
        }
    }
}

/// A rotation sampled earlier, e.g. once per frame
impl OrientationProvider for Rotation {
    fn orientation(&self) -> Rotation {
        *self
    }
}

/// Orientation set explicitly by the owner, e.g. from rotation events
#[derive(Debug, Default)]
pub struct ManualOrientation {
    index: AtomicU8,
}

impl ManualOrientation {
    pub fn new(rotation: Rotation) -> Self {
        let manual = Self::default();
        manual.set(rotation);
        manual
    }

    pub fn set(&self, rotation: Rotation) {
        let index = match rotation {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        };
        self.index.store(index, Ordering::Relaxed);
    }
}

impl OrientationProvider for ManualOrientation {
    fn orientation(&self) -> Rotation {
        Rotation::from_index(self.index.load(Ordering::Relaxed)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn block_bytes(orientation: u8) -> Vec<u8> {
        let mut bytes = vec![0u8; ControlBlock::SIZE];
        bytes[0] = 1;
        let record = 32;
        bytes[record..record + 2].copy_from_slice(&480u16.to_le_bytes());
        bytes[record + 2..record + 4].copy_from_slice(&800u16.to_le_bytes());
        bytes[record + 5] = orientation;
        bytes[record + 8..record + 12].copy_from_slice(&60.0f32.to_le_bytes());
        bytes
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hdmi-mirror-{}-{}", std::process::id(), name))
    }

    #[test]
    fn parses_first_display_record() {
        let block = ControlBlock::parse(&block_bytes(1)).unwrap();
        assert!(block.connected);
        assert_eq!(block.displays[0].width, 480);
        assert_eq!(block.displays[0].height, 800);
        assert_eq!(block.displays[0].orientation, 1);
        assert_eq!(block.displays[0].fps, 60.0);
        assert_eq!(block.displays[1], DisplayRecord::default());
    }

    #[test]
    fn short_block_is_rejected() {
        let bytes = block_bytes(0);
        assert!(ControlBlock::parse(&bytes[..100]).is_err());
    }

    #[test]
    fn reads_orientation_from_file() {
        let path = temp_path("rot270");
        fs::write(&path, block_bytes(3)).unwrap();
        let provider = ControlBlockOrientation::new(&path);
        assert_eq!(provider.orientation(), Rotation::Deg270);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn out_of_range_orientation_defaults_to_zero() {
        let path = temp_path("invalid");
        fs::write(&path, block_bytes(9)).unwrap();
        let provider = ControlBlockOrientation::new(&path);
        assert_eq!(provider.orientation(), Rotation::Deg0);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unreadable_block_defaults_to_zero() {
        let missing = ControlBlockOrientation::new(temp_path("missing"));
        assert_eq!(missing.orientation(), Rotation::Deg0);

        let path = temp_path("short");
        fs::write(&path, &block_bytes(2)[..40]).unwrap();
        let short = ControlBlockOrientation::new(&path);
        assert_eq!(short.orientation(), Rotation::Deg0);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn manual_orientation_tracks_updates() {
        let manual = ManualOrientation::new(Rotation::Deg90);
        assert_eq!(manual.orientation(), Rotation::Deg90);
        manual.set(Rotation::Deg180);
        assert_eq!(manual.orientation(), Rotation::Deg180);
    }
}
