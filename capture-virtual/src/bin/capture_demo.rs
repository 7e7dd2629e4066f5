//! Records a few seconds from the virtual rig and exports it.
//!
//! Usage: `capture-demo [config.json] [seconds]`. Set `RUST_LOG=debug` for
//! the controller's state transitions.

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use capture_core::{
    CaptureConfiguration, CaptureError, ControllerDelegate, ControllerSnapshot, ExportGateway, PermissionGate,
    RecordingController, RecordingResult, StartOutcome,
};
use capture_virtual::{DirectoryLibrary, ScriptedPermissions, VirtualCameraRig};

/// Delegate that forwards controller events to the log.
struct LogDelegate;

impl ControllerDelegate for LogDelegate {
    fn on_state_changed(&self, snapshot: &ControllerSnapshot) {
        log::info!(
            "state {} ({} camera, flash {:?})",
            snapshot.state.name(),
            snapshot.position,
            snapshot.flash_mode
        );
    }

    fn on_elapsed_updated(&self, elapsed: Duration) {
        log::trace!("elapsed {:.1}s", elapsed.as_secs_f64());
    }

    fn on_error(&self, error: &CaptureError) {
        log::error!("capture error: {}", error);
    }

    fn on_recording_finished(&self, result: &RecordingResult) {
        match result {
            Ok(media) => log::info!("recorded {:.1}s to {}", media.duration.as_secs_f64(), media.file_path.display()),
            Err(e) => log::warn!("recording ended without a file: {}", e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => CaptureConfiguration::from_json_file(Path::new(&path))?,
        None => CaptureConfiguration::default(),
    };
    let seconds: f64 = match args.next() {
        Some(value) => value.parse()?,
        None => 3.0,
    };
    let library_root = config.output_directory.join("capture-library");

    let gate = Arc::new(PermissionGate::new(Arc::new(ScriptedPermissions::new())));
    let rig = Arc::new(VirtualCameraRig::phone());
    let handle = RecordingController::new(rig.clone(), Arc::clone(&gate), config)?
        .with_delegate(Arc::new(LogDelegate))
        .spawn();

    handle.setup().await?;
    handle.toggle_flash().await?;

    let StartOutcome::Started(id) = handle.start().await? else {
        return Err("a recording was already running".into());
    };
    println!("recording {} for {:.1}s", id, seconds);
    tokio::time::sleep(Duration::from_secs_f64(seconds)).await;

    if let Err(e) = handle.flip().await {
        println!("flip while recording rejected: {}", e);
    }

    let media = match handle.stop().await? {
        Some(result) => result?,
        None => return Err("recording ended before stop".into()),
    };
    println!(
        "recorded {:.2}s ({} frames) to {}",
        media.duration.as_secs_f64(),
        rig.stats().frames_written,
        media.file_path.display()
    );
    println!("sha256 {}", media.checksum);

    let exporter = ExportGateway::new(gate, Arc::new(DirectoryLibrary::new(&library_root)));
    let asset = exporter.export(&media).await?;
    println!("exported as {} into {}", asset, library_root.display());

    handle.teardown().await;
    Ok(())
}
