pub mod config;
pub mod drive;
pub mod sixaxis;

use crate::config::Config;
use crate::drive::{throttle_percent, TankDrive};
use crate::sixaxis::SyncHandle;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use tokio::time::Duration;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = Config::load().wrap_err("Failed to load configuration")?;

    info!("Opening input device {}", config.device_path.display());
    let device = tokio::fs::File::open(&config.device_path)
        .await
        .wrap_err_with(|| format!("Failed to open {}", config.device_path.display()))?;

    let sync_handle = SyncHandle::spawn(Box::new(device))
        .map_err(|e| color_eyre::eyre::eyre!("Failed to spawn synchronizer: {}", e))?;
    let state_receiver = sync_handle.subscribe();

    let mut drive = TankDrive::new(&config.drive).wrap_err("Failed to initialize drive")?;

    info!(
        "Entering actuation loop, polling every {} ms",
        config.poll_interval_ms
    );
    let mut ticker = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));

    // Registered once so a SIGINT arriving mid-tick is latched, not dropped.
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                if sync_handle.is_finished() {
                    drive.stop().wrap_err("Failed to stop drive")?;
                    return sync_handle
                        .wait()
                        .await
                        .wrap_err("Input stream died, shutting down");
                }

                let snapshot = state_receiver.borrow().clone();
                debug!("Controller snapshot: {}", snapshot);

                let left = throttle_percent(snapshot.left_stick.y);
                let right = throttle_percent(snapshot.right_stick.y);
                drive.update(left, right).wrap_err("Failed to drive motors")?;
            }
        }
    }

    drive.stop().wrap_err("Failed to stop drive")?;
    sync_handle.shutdown();
    sync_handle
        .wait()
        .await
        .wrap_err("Synchronizer terminated abnormally")?;

    info!("Shutdown complete");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
