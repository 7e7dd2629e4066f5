//! Scripted permission store.
//!
//! Plays the role of the OS authorization database: each resource has a
//! current status and the answer the "user" gives when prompted. Prompts are
//! counted so callers can check the gate never re-prompts.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use capture_core::models::permission::{PermissionResource, PermissionStatus};
use capture_core::traits::permission_provider::PermissionProvider;

#[derive(Debug, Clone, Copy)]
struct Entry {
    status: PermissionStatus,
    answer: PermissionStatus,
    prompts: u32,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            status: PermissionStatus::NotDetermined,
            answer: PermissionStatus::Granted,
            prompts: 0,
        }
    }
}

/// Permission provider driven by a script instead of a user.
///
/// Unconfigured resources start `NotDetermined` and are granted when prompted.
#[derive(Debug, Default)]
pub struct ScriptedPermissions {
    entries: Mutex<HashMap<PermissionResource, Entry>>,
    prompt_latency: Option<Duration>,
}

impl ScriptedPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every resource already granted; nothing prompts.
    pub fn granting_all() -> Self {
        let mut permissions = Self::new();
        for resource in [
            PermissionResource::Camera,
            PermissionResource::Microphone,
            PermissionResource::MediaLibrary,
        ] {
            permissions = permissions.with_status(resource, PermissionStatus::Granted);
        }
        permissions
    }

    /// Set the current status of `resource`.
    pub fn with_status(self, resource: PermissionResource, status: PermissionStatus) -> Self {
        self.entries.lock().entry(resource).or_default().status = status;
        self
    }

    /// Set what the user answers when prompted for `resource`.
    pub fn answering(self, resource: PermissionResource, answer: PermissionStatus) -> Self {
        self.entries.lock().entry(resource).or_default().answer = answer;
        self
    }

    /// Delay every prompt, as a user reading the dialog would.
    pub fn with_prompt_latency(mut self, latency: Duration) -> Self {
        self.prompt_latency = Some(latency);
        self
    }

    /// Change a status out-of-band, as the user would in the system settings.
    pub fn set_status(&self, resource: PermissionResource, status: PermissionStatus) {
        self.entries.lock().entry(resource).or_default().status = status;
    }

    pub fn prompt_count(&self, resource: PermissionResource) -> u32 {
        self.entries.lock().get(&resource).map(|e| e.prompts).unwrap_or(0)
    }
}

#[async_trait]
impl PermissionProvider for ScriptedPermissions {
    fn authorization_status(&self, resource: PermissionResource) -> PermissionStatus {
        self.entries.lock().get(&resource).map(|e| e.status).unwrap_or_default()
    }

    async fn request_access(&self, resource: PermissionResource) -> PermissionStatus {
        if let Some(latency) = self.prompt_latency {
            tokio::time::sleep(latency).await;
        }

        let mut entries = self.entries.lock();
        let entry = entries.entry(resource).or_default();
        if entry.status.is_decided() {
            return entry.status;
        }
        entry.prompts += 1;
        entry.status = entry.answer;
        log::debug!("{} prompt answered {:?}", resource, entry.status);
        entry.status
    }
}
