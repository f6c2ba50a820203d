//! Configuration management for hdmi-mirror

use crate::display::{PhysicalSize, PixelFormat, ScreenGeometry};
use crate::error::{MirrorError, Result};
use crate::settings::MirrorSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Initial mirroring settings
    #[serde(default)]
    pub mirror: MirrorSettings,

    /// Primary display geometry
    #[serde(default)]
    pub source: SourceConfig,

    /// HDMI output used by the dry-run driver
    #[serde(default)]
    pub output: OutputConfig,

    /// Orientation source
    #[serde(default)]
    pub orientation: OrientationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Visible width in pixels
    pub width: u32,

    /// Visible height in pixels
    pub height: u32,

    /// Virtual width, defaults to `width`
    pub virtual_width: Option<u32>,

    /// Virtual height, defaults to twice `height` (page flipping)
    pub virtual_height: Option<u32>,

    /// Bits per pixel (16, 24 or 32)
    pub bits_per_pixel: u32,

    /// Physical width in millimeters, 0 if unknown
    pub width_mm: u32,

    /// Physical height in millimeters, 0 if unknown
    pub height_mm: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            width: 480,
            height: 800,
            virtual_width: None,
            virtual_height: None,
            bits_per_pixel: 32,
            width_mm: 56,
            height_mm: 94,
        }
    }
}

impl SourceConfig {
    pub fn geometry(&self) -> ScreenGeometry {
        let format = if self.bits_per_pixel == 16 {
            PixelFormat::Rgb565
        } else {
            PixelFormat::Rgbx8888
        };

        ScreenGeometry {
            xres_virtual: self.virtual_width.unwrap_or(self.width),
            yres_virtual: self.virtual_height
                .unwrap_or(self.height.saturating_mul(2)),
            bits_per_pixel: self.bits_per_pixel,
            ..ScreenGeometry::new(
                self.width,
                self.height,
                format,
                PhysicalSize::mm(self.width_mm, self.height_mm),
            )
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Best resolution advertised by the sink, `None` to simulate a
    /// display without usable EDID
    pub resolution: Option<[u32; 2]>,

    /// Screen width as reported by EDID, in centimeters
    pub width_cm: u32,

    /// Screen height as reported by EDID, in centimeters
    pub height_cm: u32,

    /// Cable state at startup
    pub connected: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            resolution: Some([1280, 720]),
            width_cm: 16,
            height_cm: 9,
            connected: true,
        }
    }
}

impl OutputConfig {
    pub fn physical_size(&self) -> PhysicalSize {
        PhysicalSize::cm(self.width_cm, self.height_cm)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Display server control block; orientation is fixed at 0° if unset
    pub control_block: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| MirrorError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let source = &self.source;
        if source.width == 0 || source.height == 0 {
            return Err(MirrorError::Config("Source dimensions must be non-zero".into()));
        }

        if !matches!(source.bits_per_pixel, 16 | 24 | 32) {
            return Err(MirrorError::Config(format!(
                "Unsupported source bits_per_pixel: {}",
                source.bits_per_pixel
            )));
        }

        let geometry = source.geometry();
        if geometry.xres_virtual < geometry.xres || geometry.yres_virtual < geometry.yres {
            return Err(MirrorError::Config(
                "Source virtual resolution cannot be smaller than visible resolution".into(),
            ));
        }

        if let Some([width, height]) = self.output.resolution {
            if width == 0 || height == 0 {
                return Err(MirrorError::Config("Output resolution must be non-zero".into()));
            }
            if self.mirror.overscan_x >= width || self.mirror.overscan_y >= height {
                return Err(MirrorError::Config(
                    "Overscan must be smaller than the output resolution".into(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::settings::{RotationMode, ScalingMode};

    #[test]
    fn validate_accepts_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_invalid_dimensions() {
        let mut cfg = Config::default();
        cfg.source.width = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_odd_depth() {
        let mut cfg = Config::default();
        cfg.source.bits_per_pixel = 12;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_overscan() {
        let mut cfg = Config::default();
        cfg.mirror.overscan_y = 720;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn huge_height_saturates_virtual_height() {
        let mut cfg = Config::default();
        cfg.source.height = u32::MAX;
        assert_eq!(cfg.source.geometry().yres_virtual, u32::MAX);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: Config = toml::from_str(
            r#"
            [mirror]
            rotation = "270"
            scaling = "stretch"
            overscan_x = 20

            [source]
            width = 720
            height = 1280
            virtual_height = 1280

            [output]
            resolution = [1920, 1080]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.mirror.rotation, RotationMode::Rotate270);
        assert_eq!(cfg.mirror.scaling, ScalingMode::Stretch);
        assert_eq!(cfg.mirror.overscan_x, 20);
        assert_eq!(cfg.mirror.overscan_y, 60);

        let geometry = cfg.source.geometry();
        assert_eq!((geometry.xres_virtual, geometry.yres_virtual), (720, 1280));
        assert_eq!(geometry.bits_per_pixel, 32);
        assert_eq!(cfg.output.resolution, Some([1920, 1080]));
        assert_eq!(cfg.output.width_cm, 16);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = Config::load(std::path::Path::new("/nonexistent/hdmi-mirror.toml")).unwrap();
        assert_eq!(cfg.source.width, 480);
    }
}
