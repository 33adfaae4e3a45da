use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::render::{Color, DARK_GRAY, WHITE};
use crate::view::{DEFAULT_PAGE_CACHE_LIMIT, DEFAULT_PAGE_SPACING, ViewOptions};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pagestack";

/// Logical resolution of one document unit (a PDF point)
pub const POINTS_PER_INCH: f64 = 72.0;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Rendered pages kept in memory
    #[serde(default = "default_page_cache_limit")]
    pub page_cache_limit: usize,

    /// Gap between pages in device pixels
    #[serde(default = "default_page_spacing")]
    pub page_spacing: u32,

    #[serde(default = "default_zoom")]
    pub zoom: f64,

    /// Logical dots per inch of the display; 72 shows one point per pixel
    #[serde(default = "default_screen_dpi")]
    pub screen_dpi: f64,

    #[serde(default = "default_render_workers")]
    pub render_workers: usize,

    /// `#rrggbb` behind and between pages
    #[serde(default = "default_background")]
    pub background: String,

    /// `#rrggbb` of pages still being rendered
    #[serde(default = "default_placeholder_background")]
    pub placeholder_background: String,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_page_cache_limit() -> usize {
    DEFAULT_PAGE_CACHE_LIMIT
}

fn default_page_spacing() -> u32 {
    DEFAULT_PAGE_SPACING
}

fn default_zoom() -> f64 {
    1.0
}

fn default_screen_dpi() -> f64 {
    POINTS_PER_INCH
}

fn default_render_workers() -> usize {
    crate::render::DEFAULT_WORKERS
}

fn default_background() -> String {
    to_hex(DARK_GRAY)
}

fn default_placeholder_background() -> String {
    to_hex(WHITE)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            page_cache_limit: default_page_cache_limit(),
            page_spacing: default_page_spacing(),
            zoom: default_zoom(),
            screen_dpi: default_screen_dpi(),
            render_workers: default_render_workers(),
            background: default_background(),
            placeholder_background: default_placeholder_background(),
        }
    }
}

fn to_hex(color: Color) -> String {
    let [r, g, b] = color.0;
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Parse `#rrggbb` (the `#` is optional)
pub fn parse_color(value: &str) -> Option<Color> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(image::Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

impl Settings {
    /// Reject values the view cannot work with
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.page_cache_limit == 0 {
            return Err(SettingsError::Invalid {
                field: "page_cache_limit",
                reason: "must be at least 1".into(),
            });
        }
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return Err(SettingsError::Invalid {
                field: "zoom",
                reason: format!("must be a positive number, got {}", self.zoom),
            });
        }
        if !(self.screen_dpi.is_finite() && self.screen_dpi > 0.0) {
            return Err(SettingsError::Invalid {
                field: "screen_dpi",
                reason: format!("must be a positive number, got {}", self.screen_dpi),
            });
        }
        for (field, value) in [
            ("background", &self.background),
            ("placeholder_background", &self.placeholder_background),
        ] {
            if parse_color(value).is_none() {
                return Err(SettingsError::Invalid {
                    field,
                    reason: format!("expected #rrggbb, got {value:?}"),
                });
            }
        }
        Ok(())
    }

    /// Device pixels per document unit at zoom 1.0
    #[must_use]
    pub fn screen_scale(&self) -> f64 {
        self.screen_dpi / POINTS_PER_INCH
    }

    #[must_use]
    pub fn view_options(&self) -> ViewOptions {
        let defaults = ViewOptions::default();
        ViewOptions {
            page_cache_limit: self.page_cache_limit,
            page_spacing: self.page_spacing,
            screen_scale: self.screen_scale(),
            background: parse_color(&self.background).unwrap_or(defaults.background),
            placeholder_background: parse_color(&self.placeholder_background)
                .unwrap_or(defaults.placeholder_background),
        }
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from `explicit` if given, otherwise from the default
/// location. A missing default file is created with the defaults.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, SettingsError> {
    if let Some(path) = explicit {
        return load_settings_from_path(path);
    }

    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return Ok(Settings::default());
    };

    if path.exists() {
        load_settings_from_path(&path)
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = Settings::default();
        save_settings_to_file(&settings, &path);
        Ok(settings)
    }
}

pub fn load_settings_from_path(path: &Path) -> Result<Settings, SettingsError> {
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut settings =
        serde_yaml::from_str::<Settings>(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Loaded settings from {path:?}");

    if settings.version < CURRENT_VERSION {
        migrate_settings(&mut settings);
        save_settings_to_file(&settings, path);
    }

    settings.validate()?;
    Ok(settings)
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

/// Write settings, logging instead of failing: a read-only config
/// directory must not keep the viewer from starting.
pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = match serde_yaml::to_string(settings) {
        Ok(yaml) => format!("{SETTINGS_HEADER}{yaml}"),
        Err(e) => {
            warn!("Failed to serialize settings: {e}");
            return;
        }
    };

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => warn!("Failed to save settings to {path:?}: {e}"),
    }
}

const SETTINGS_HEADER: &str = "# pagestack settings\n\
# screen_dpi: 72 shows one PDF point per pixel (two pixels per terminal row)\n";
