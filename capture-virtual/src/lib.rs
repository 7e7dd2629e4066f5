//! # capture-virtual
//!
//! Software capture backend for capture-core.
//!
//! Provides:
//! - `VirtualCameraRig`: `CaptureHardware` with an exclusive lease and scriptable failures
//! - `VirtualSession`: `HardwareSession` whose recorder thread writes a real container file
//! - `DeviceEnumerator`: the rig's cameras and microphones
//! - `ScriptedPermissions`: `PermissionProvider` answering from a script
//! - `DirectoryLibrary`: `MediaLibrary` that copies recordings into a directory
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use capture_core::{CaptureConfiguration, PermissionGate, RecordingController};
//! use capture_virtual::{ScriptedPermissions, VirtualCameraRig};
//!
//! let gate = Arc::new(PermissionGate::new(Arc::new(ScriptedPermissions::granting_all())));
//! let controller = RecordingController::new(Arc::new(VirtualCameraRig::phone()), gate, CaptureConfiguration::default())?;
//! let handle = controller.spawn();
//! handle.setup().await?;
//! ```

pub mod device_enumerator;
pub mod frame_recorder;
pub mod library;
pub mod permissions;
pub mod rig;
pub mod virtual_session;

pub use device_enumerator::DeviceEnumerator;
pub use library::DirectoryLibrary;
pub use permissions::ScriptedPermissions;
pub use rig::{RigStats, VirtualCameraRig};
pub use virtual_session::VirtualSession;
