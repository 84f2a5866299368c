use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use lazyreveal::infrastructure::{AppConfig, CliArgs, StorageManager};
use lazyreveal::presentation::demo::{self, Manifest, SceneSettings};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = match StorageManager::new() {
        Ok(storage) => storage,
        Err(_) => StorageManager::with_dir(std::env::current_dir()?),
    };
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(version = lazyreveal::VERSION, "Starting {}", lazyreveal::NAME);

    let manifest = Manifest::from_path(&args.manifest)?;
    let settings = SceneSettings {
        viewport_height: config.viewport_height,
        loader: config.loader.clone(),
        dry_run: args.dry_run,
        disable_intersection: config.disable_intersection,
    };

    for report in demo::run(manifest, settings, &args.scroll).await? {
        println!("{report}");
    }

    Ok(())
}
