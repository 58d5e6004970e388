use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

/// Tunables for one trace view. Every field has a default, so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub row_height: f64,
    /// Extra rows rendered above and below the viewport.
    pub overscroll: usize,
    /// Initial fraction of the container given to the node list column.
    pub list_width: f64,
    pub min_column_width: f64,
    /// Horizontal indentation per tree depth level, in px.
    pub row_depth_padding: f64,
    pub list_scroll_margin: f64,
    pub bring_into_view_offset: f64,

    pub zoom_speed: f64,
    pub min_zoom_scale: f64,
    pub max_zoom_scale: f64,
    /// Narrowest view a wheel zoom may produce, in trace units.
    pub min_view_width: f64,

    pub zoom_animation_ms: u64,
    pub scroll_animation_ms: u64,
    pub wheel_end_ms: u64,
    pub scroll_end_ms: u64,
    pub pointer_events_restore_ms: u64,

    pub tick_spacing_px: f64,
    pub max_timeline_intervals: usize,
    pub device_pixel_ratio: f64,

    pub measure_cache_capacity: usize,
    pub text_cache_capacity: usize,
    pub measure_budget_per_frame: usize,
    pub char_width: f64,
    pub text_padding: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            row_height: 24.0,
            overscroll: 10,
            list_width: 0.3,
            min_column_width: 0.1,
            row_depth_padding: 22.0,
            list_scroll_margin: 16.0,
            bring_into_view_offset: 48.0,
            zoom_speed: 0.01,
            min_zoom_scale: 0.5,
            max_zoom_scale: 2.0,
            min_view_width: 1.0,
            zoom_animation_ms: 300,
            scroll_animation_ms: 600,
            wheel_end_ms: 200,
            scroll_end_ms: 300,
            pointer_events_restore_ms: 50,
            tick_spacing_px: 100.0,
            max_timeline_intervals: 20,
            device_pixel_ratio: 1.0,
            measure_cache_capacity: 4_096,
            text_cache_capacity: 4_096,
            measure_budget_per_frame: 64,
            char_width: 6.5,
            text_padding: 2.0,
        }
    }
}

impl ViewConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn zoom_animation(&self) -> Duration {
        Duration::from_millis(self.zoom_animation_ms)
    }

    pub fn scroll_animation(&self) -> Duration {
        Duration::from_millis(self.scroll_animation_ms)
    }

    pub fn wheel_end(&self) -> Duration {
        Duration::from_millis(self.wheel_end_ms)
    }

    pub fn scroll_end(&self) -> Duration {
        Duration::from_millis(self.scroll_end_ms)
    }

    pub fn pointer_events_restore(&self) -> Duration {
        Duration::from_millis(self.pointer_events_restore_ms)
    }

    pub fn measure_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.measure_cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn text_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.text_cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn overscroll_px(&self) -> f64 {
        self.overscroll as f64 * self.row_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ViewConfig::from_toml("row_height = 20.0\noverscroll = 4\n").unwrap();
        assert_eq!(config.row_height, 20.0);
        assert_eq!(config.overscroll, 4);
        assert_eq!(config.list_width, ViewConfig::default().list_width);
        assert_eq!(config.zoom_animation(), Duration::from_millis(300));
    }

    #[test]
    fn zero_capacity_falls_back_to_one() {
        let config = ViewConfig {
            measure_cache_capacity: 0,
            ..ViewConfig::default()
        };
        assert_eq!(config.measure_capacity().get(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ViewConfig::load(Path::new("/nonexistent/traceview.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
