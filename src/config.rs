use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    media::EncodeSettings,
    output::NamingMode,
};

/// Main configuration for clipforge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where and how results are written
    #[serde(default)]
    pub output: OutputConfig,

    /// External decoder settings
    #[serde(default)]
    pub decode: DecodeConfig,

    /// Frame processing settings
    #[serde(default)]
    pub processing: ProcessingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.output.validate()?;
        self.decode.validate()?;
        self.processing.validate()?;
        Ok(())
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives every output artifact
    pub dir: PathBuf,

    /// Unique per-request names, or the fixed legacy names
    pub naming: NamingMode,

    /// Codec settings for video outputs
    pub encode: EncodeSettings,

    /// JPEG quality for image outputs (1-100)
    pub image_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            naming: NamingMode::Unique,
            encode: EncodeSettings::default(),
            image_quality: 95,
        }
    }
}

impl OutputConfig {
    fn validate(&self) -> Result<()> {
        if self.encode.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "output.encode.quality".to_string(),
                value: self.encode.quality.to_string(),
            }
            .into());
        }

        if self.encode.video_codec.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "output.encode.video_codec".to_string(),
                value: self.encode.video_codec.clone(),
            }
            .into());
        }

        if !(1..=100).contains(&self.image_quality) {
            return Err(ConfigError::InvalidValue {
                key: "output.image_quality".to_string(),
                value: self.image_quality.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Settings for the ffmpeg-backed decoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// ffmpeg binary (looked up on PATH when relative)
    pub ffmpeg: PathBuf,

    /// ffprobe binary (looked up on PATH when relative)
    pub ffprobe: PathBuf,

    /// Sample rate audio is decoded to (Hz)
    pub audio_sample_rate: u32,

    /// Channel count audio is decoded to
    pub audio_channels: u16,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            audio_sample_rate: 44100,
            audio_channels: 2,
        }
    }
}

impl DecodeConfig {
    fn validate(&self) -> Result<()> {
        if self.audio_sample_rate == 0 {
            return Err(ConfigError::InvalidValue {
                key: "decode.audio_sample_rate".to_string(),
                value: self.audio_sample_rate.to_string(),
            }
            .into());
        }

        if self.audio_channels == 0 {
            return Err(ConfigError::InvalidValue {
                key: "decode.audio_channels".to_string(),
                value: self.audio_channels.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Frame processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Worker threads for per-frame stages (1 = strictly sequential)
    pub threads: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
        }
    }
}

impl ProcessingConfig {
    fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "processing.threads".to_string(),
                value: self.threads.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let mut original = Config::default();
        original.output.naming = NamingMode::Legacy;
        original.output.image_quality = 80;
        original.processing.threads = 3;

        original.save_to_file(&file_path).unwrap();
        let loaded = Config::from_file(&file_path).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(&file_path, "[output]\nnaming = \"legacy\"\n").unwrap();

        let loaded = Config::from_file(&file_path).unwrap();
        assert_eq!(loaded.output.naming, NamingMode::Legacy);
        assert_eq!(loaded.output.image_quality, 95);
        assert_eq!(loaded.decode, DecodeConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/no/such/clipforge.toml").unwrap_err();
        assert!(err.user_message().contains("not found"));
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::default();
        config.processing.threads = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.image_quality = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.decode.audio_channels = 0;
        assert!(config.validate().is_err());
    }
}
