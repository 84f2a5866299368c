//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::infrastructure::visibility::ViewportConfig;
use crate::presentation::render::RevealStyle;

use super::args::CliArgs;

const APP_NAME: &str = "lazyreveal";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "linuxmobile";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Loader and reveal tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Pixels around the viewport that already count as visible.
    #[serde(default = "default_root_margin")]
    pub root_margin_px: u32,

    /// Keep notifying each time an element re-enters the viewport.
    #[serde(default)]
    pub repeat_notifications: bool,

    /// The host defers offscreen image fetches natively.
    #[serde(default)]
    pub native_lazy_loading: bool,

    /// Request timeout for fetching images, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Placeholder fade-out in milliseconds.
    #[serde(default = "default_placeholder_fade")]
    pub placeholder_fade_ms: u64,

    /// Main image fade-in in milliseconds.
    #[serde(default = "default_main_fade")]
    pub main_fade_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            root_margin_px: default_root_margin(),
            repeat_notifications: false,
            native_lazy_loading: false,
            fetch_timeout_secs: default_fetch_timeout(),
            placeholder_fade_ms: default_placeholder_fade(),
            main_fade_ms: default_main_fade(),
        }
    }
}

impl LoaderConfig {
    /// Settings for the viewport observer.
    #[must_use]
    pub const fn viewport(&self) -> ViewportConfig {
        ViewportConfig {
            root_margin: self.root_margin_px,
            repeat_notifications: self.repeat_notifications,
        }
    }

    /// Fade timings for rendering.
    #[must_use]
    pub const fn reveal(&self) -> RevealStyle {
        RevealStyle {
            placeholder_fade: Duration::from_millis(self.placeholder_fade_ms),
            main_fade: Duration::from_millis(self.main_fade_ms),
        }
    }

    /// Request timeout for fetching elements.
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Application configuration.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Height of the simulated viewport in pixels.
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Treat every image as visible immediately.
    #[serde(default)]
    pub disable_intersection: bool,

    /// Loader tuning.
    #[serde(default)]
    pub loader: LoaderConfig,
}

fn default_root_margin() -> u32 {
    200
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_placeholder_fade() -> u64 {
    500
}

fn default_main_fade() -> u64 {
    250
}

fn default_viewport_height() -> u32 {
    800
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(viewport_height) = args.viewport_height {
            self.viewport_height = viewport_height;
        }
        if let Some(root_margin) = args.root_margin {
            self.loader.root_margin_px = root_margin;
        }
        if let Some(repeat) = args.repeat_notifications {
            self.loader.repeat_notifications = repeat;
        }
        if args.native_lazy {
            self.loader.native_lazy_loading = true;
        }
        if let Some(timeout) = args.fetch_timeout {
            self.loader.fetch_timeout_secs = timeout;
        }
        if args.no_intersection {
            self.disable_intersection = true;
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns the log path, if file logging is enabled.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            viewport_height: default_viewport_height(),
            disable_intersection: false,
            loader: LoaderConfig::default(),
        }
    }
}
