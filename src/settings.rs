use std::path::PathBuf;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Tunables for the content cache: allocation thresholds, cleanup limits and
/// intervals, and the directories assets are resolved against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Total allocation below which `clean()` does nothing at all.
    #[serde(default = "CacheSettings::default_low_threshold")]
    pub low_cleanup_threshold: u64,
    /// Total allocation above which the aggressive cleanup tier kicks in.
    #[serde(default = "CacheSettings::default_high_threshold")]
    pub high_cleanup_threshold: u64,
    /// Maximum cores freed per `clean()` call in the relaxed tier.
    #[serde(default = "CacheSettings::default_low_deallocation_limit")]
    pub low_deallocation_limit: usize,
    /// Maximum entries scanned per `clean()` call in the relaxed tier.
    #[serde(default = "CacheSettings::default_low_scan_limit")]
    pub low_scan_limit: usize,
    /// Maximum cores freed per `clean()` call in the aggressive tier.
    #[serde(default = "CacheSettings::default_high_deallocation_limit")]
    pub high_deallocation_limit: usize,
    /// Maximum entries scanned per `clean()` call in the aggressive tier.
    #[serde(default = "CacheSettings::default_high_scan_limit")]
    pub high_scan_limit: usize,
    /// Interval between cleanups after a pass that hit its deallocation limit.
    #[serde(default = "CacheSettings::default_short_cleanup_interval")]
    pub short_cleanup_interval_secs: f64,
    /// Interval between cleanups after a pass that had spare capacity.
    #[serde(default = "CacheSettings::default_long_cleanup_interval")]
    pub long_cleanup_interval_secs: f64,
    /// Sleep interval of the background entry sweeper.
    #[serde(default = "CacheSettings::default_sweep_interval")]
    pub sweep_interval_secs: f64,
    /// How long an asset must go unused before `clean()` may free it.
    #[serde(default = "CacheSettings::default_idle_timeout")]
    pub idle_timeout_secs: f64,
    /// Largest edge of a decoded thumbnail, in pixels.
    #[serde(default = "CacheSettings::default_thumbnail_dimension")]
    pub thumbnail_dimension: u32,
    /// Directory that relative image paths are resolved against.
    #[serde(default = "CacheSettings::default_image_directory")]
    pub image_directory: PathBuf,
    /// Directory that effect names are resolved against (as `<name>.wgsl`).
    #[serde(default = "CacheSettings::default_shader_directory")]
    pub shader_directory: PathBuf,
    /// Font family used when a requested family is not installed.
    #[serde(default = "CacheSettings::default_font_family")]
    pub default_font_family: String,
    /// Installed font families. The default family is always considered
    /// installed.
    #[serde(default)]
    pub font_families: Vec<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            low_cleanup_threshold: Self::default_low_threshold(),
            high_cleanup_threshold: Self::default_high_threshold(),
            low_deallocation_limit: Self::default_low_deallocation_limit(),
            low_scan_limit: Self::default_low_scan_limit(),
            high_deallocation_limit: Self::default_high_deallocation_limit(),
            high_scan_limit: Self::default_high_scan_limit(),
            short_cleanup_interval_secs: Self::default_short_cleanup_interval(),
            long_cleanup_interval_secs: Self::default_long_cleanup_interval(),
            sweep_interval_secs: Self::default_sweep_interval(),
            idle_timeout_secs: Self::default_idle_timeout(),
            thumbnail_dimension: Self::default_thumbnail_dimension(),
            image_directory: Self::default_image_directory(),
            shader_directory: Self::default_shader_directory(),
            default_font_family: Self::default_font_family(),
            font_families: Vec::new(),
        }
    }
}

impl CacheSettings {
    pub fn load() -> Self {
        Self::load_from_path("content_cache.json")
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<CacheSettings>(&contents) {
                Ok(settings) => {
                    info!("Loaded content cache settings from {:?}", path);
                    settings.validate()
                }
                Err(err) => {
                    warn!(
                        "Failed to parse {:?} ({}). Falling back to default cache settings.",
                        path, err
                    );
                    CacheSettings::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Cache settings file {:?} not found. Using default settings.",
                    path
                );
                CacheSettings::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default cache settings.",
                    path, err
                );
                CacheSettings::default()
            }
        }
    }

    pub fn validate(mut self) -> Self {
        if self.low_cleanup_threshold > self.high_cleanup_threshold {
            warn!(
                "Low cleanup threshold ({}) exceeds high threshold ({}). Swapping them.",
                self.low_cleanup_threshold, self.high_cleanup_threshold
            );
            std::mem::swap(
                &mut self.low_cleanup_threshold,
                &mut self.high_cleanup_threshold,
            );
        }

        if self.low_deallocation_limit == 0 || self.high_deallocation_limit == 0 {
            warn!("Deallocation limits must be greater than zero. Using defaults.");
            self.low_deallocation_limit = Self::default_low_deallocation_limit();
            self.high_deallocation_limit = Self::default_high_deallocation_limit();
        }

        if self.low_scan_limit == 0 || self.high_scan_limit == 0 {
            warn!("Scan limits must be greater than zero. Using defaults.");
            self.low_scan_limit = Self::default_low_scan_limit();
            self.high_scan_limit = Self::default_high_scan_limit();
        }

        if !self.short_cleanup_interval_secs.is_finite() || self.short_cleanup_interval_secs <= 0.0
        {
            warn!("Short cleanup interval must be positive. Using default value.");
            self.short_cleanup_interval_secs = Self::default_short_cleanup_interval();
        }

        if !self.long_cleanup_interval_secs.is_finite() || self.long_cleanup_interval_secs <= 0.0 {
            warn!("Long cleanup interval must be positive. Using default value.");
            self.long_cleanup_interval_secs = Self::default_long_cleanup_interval();
        }

        if !self.sweep_interval_secs.is_finite() || self.sweep_interval_secs <= 0.0 {
            warn!("Sweep interval must be positive. Using default value.");
            self.sweep_interval_secs = Self::default_sweep_interval();
        }

        if !self.idle_timeout_secs.is_finite() || self.idle_timeout_secs < 0.0 {
            warn!("Idle timeout must not be negative. Using default value.");
            self.idle_timeout_secs = Self::default_idle_timeout();
        }

        if self.thumbnail_dimension == 0 {
            warn!("Thumbnail dimension must be greater than zero. Using default value.");
            self.thumbnail_dimension = Self::default_thumbnail_dimension();
        }

        self
    }

    pub fn short_cleanup_interval(&self) -> Duration {
        Duration::from_secs_f64(self.short_cleanup_interval_secs)
    }

    pub fn long_cleanup_interval(&self) -> Duration {
        Duration::from_secs_f64(self.long_cleanup_interval_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs_f64(self.sweep_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.idle_timeout_secs)
    }

    const fn default_low_threshold() -> u64 {
        70 * 1024 * 1024
    }

    const fn default_high_threshold() -> u64 {
        100 * 1024 * 1024
    }

    const fn default_low_deallocation_limit() -> usize {
        10
    }

    const fn default_low_scan_limit() -> usize {
        40
    }

    const fn default_high_deallocation_limit() -> usize {
        30
    }

    const fn default_high_scan_limit() -> usize {
        100
    }

    const fn default_short_cleanup_interval() -> f64 {
        1.0
    }

    const fn default_long_cleanup_interval() -> f64 {
        10.0
    }

    const fn default_sweep_interval() -> f64 {
        60.0
    }

    const fn default_idle_timeout() -> f64 {
        5.0
    }

    const fn default_thumbnail_dimension() -> u32 {
        256
    }

    fn default_image_directory() -> PathBuf {
        PathBuf::from("images")
    }

    fn default_shader_directory() -> PathBuf {
        PathBuf::from("shaders")
    }

    fn default_font_family() -> String {
        "DejaVuSans".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_settings() -> CacheSettings {
        CacheSettings {
            low_cleanup_threshold: 200,
            high_cleanup_threshold: 100,
            low_deallocation_limit: 0,
            low_scan_limit: 0,
            high_deallocation_limit: 0,
            high_scan_limit: 0,
            short_cleanup_interval_secs: -1.0,
            long_cleanup_interval_secs: 0.0,
            sweep_interval_secs: f64::NAN,
            idle_timeout_secs: -5.0,
            thumbnail_dimension: 0,
            ..CacheSettings::default()
        }
    }

    #[test]
    fn validate_replaces_invalid_values_with_defaults() {
        let validated = invalid_settings().validate();
        let defaults = CacheSettings::default();

        // Swapped, not reset: the caller expressed an ordering mistake,
        // not nonsense magnitudes.
        assert_eq!(validated.low_cleanup_threshold, 100);
        assert_eq!(validated.high_cleanup_threshold, 200);

        assert_eq!(
            validated.low_deallocation_limit,
            defaults.low_deallocation_limit
        );
        assert_eq!(
            validated.high_deallocation_limit,
            defaults.high_deallocation_limit
        );
        assert_eq!(validated.low_scan_limit, defaults.low_scan_limit);
        assert_eq!(validated.high_scan_limit, defaults.high_scan_limit);
        assert_eq!(
            validated.short_cleanup_interval_secs,
            defaults.short_cleanup_interval_secs
        );
        assert_eq!(
            validated.long_cleanup_interval_secs,
            defaults.long_cleanup_interval_secs
        );
        assert_eq!(validated.sweep_interval_secs, defaults.sweep_interval_secs);
        assert_eq!(validated.idle_timeout_secs, defaults.idle_timeout_secs);
        assert_eq!(validated.thumbnail_dimension, defaults.thumbnail_dimension);
    }

    #[test]
    fn validate_preserves_valid_values() {
        let valid = CacheSettings {
            low_cleanup_threshold: 1024,
            high_cleanup_threshold: 4096,
            low_deallocation_limit: 2,
            low_scan_limit: 8,
            high_deallocation_limit: 4,
            high_scan_limit: 16,
            short_cleanup_interval_secs: 0.5,
            long_cleanup_interval_secs: 2.0,
            sweep_interval_secs: 10.0,
            idle_timeout_secs: 1.0,
            thumbnail_dimension: 128,
            ..CacheSettings::default()
        };

        let validated = valid.clone().validate();

        assert_eq!(validated.low_cleanup_threshold, 1024);
        assert_eq!(validated.high_cleanup_threshold, 4096);
        assert_eq!(validated.low_deallocation_limit, 2);
        assert_eq!(validated.high_scan_limit, 16);
        assert_eq!(validated.idle_timeout_secs, 1.0);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let parsed: CacheSettings = serde_json::from_str("{}").unwrap();
        let defaults = CacheSettings::default();
        assert_eq!(parsed.low_cleanup_threshold, defaults.low_cleanup_threshold);
        assert_eq!(parsed.default_font_family, defaults.default_font_family);
        assert!(parsed.font_families.is_empty());
    }
}
