use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "lazyreveal",
    version,
    about = "Simulate visibility-gated progressive image loading",
    long_about = None
)]
pub struct CliArgs {
    /// JSON manifest of images to mount.
    #[arg(short, long, value_name = "PATH")]
    pub manifest: PathBuf,

    /// Scroll offsets to visit, in order.
    #[arg(short, long = "scroll", value_name = "PX", allow_negative_numbers = true)]
    pub scroll: Vec<i64>,

    /// Signal loads immediately instead of fetching.
    #[arg(long)]
    pub dry_run: bool,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Height of the simulated viewport in pixels.
    #[arg(long)]
    pub viewport_height: Option<u32>,

    /// Pixels around the viewport that already count as visible.
    #[arg(long)]
    pub root_margin: Option<u32>,

    /// Notify again each time an element re-enters the viewport.
    #[arg(long)]
    pub repeat_notifications: Option<bool>,

    /// Fetch timeout in seconds.
    #[arg(long)]
    pub fetch_timeout: Option<u64>,

    /// Pretend the host defers offscreen fetches natively.
    #[arg(long)]
    pub native_lazy: bool,

    /// Pretend the host has no intersection primitive.
    #[arg(long)]
    pub no_intersection: bool,
}
