use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as PromptLock;

use crate::models::error::CaptureError;
use crate::models::permission::{PermissionResource, PermissionStatus};
use crate::traits::permission_provider::PermissionProvider;

/// Authorization gate for camera, microphone and media-library access.
///
/// Each resource is gated independently. Decided answers are memoized in a
/// table owned by the gate; a `Denied` stays denied until the caller
/// explicitly calls `refresh` or `reset`. The gate never re-prompts on its own.
///
/// Concurrent requests for the same undetermined resource share one prompt.
pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
    memo: Mutex<HashMap<PermissionResource, PermissionStatus>>,
    prompts: Mutex<HashMap<PermissionResource, Arc<PromptLock<()>>>>,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn PermissionProvider>) -> Self {
        Self {
            provider,
            memo: Mutex::new(HashMap::new()),
            prompts: Mutex::new(HashMap::new()),
        }
    }

    /// Current status without prompting.
    pub fn status(&self, resource: PermissionResource) -> PermissionStatus {
        if let Some(status) = self.memo.lock().get(&resource) {
            return *status;
        }
        let status = self.provider.authorization_status(resource);
        self.remember(resource, status);
        status
    }

    /// Resolve the status, prompting the user only when it is not determined yet.
    pub async fn request(&self, resource: PermissionResource) -> PermissionStatus {
        let current = self.status(resource);
        if current.is_decided() {
            return current;
        }

        let lock = Arc::clone(self.prompts.lock().entry(resource).or_default());
        let _prompting = lock.lock().await;
        // Another caller may have prompted while we waited.
        let current = self.status(resource);
        if current.is_decided() {
            return current;
        }

        log::debug!("requesting {} access", resource);
        let answer = self.provider.request_access(resource).await;
        self.remember(resource, answer);
        log::info!("{} access: {:?}", resource, answer);
        answer
    }

    /// Like `request`, but a non-granted answer becomes `PermissionDenied`.
    pub async fn require(&self, resource: PermissionResource) -> Result<(), CaptureError> {
        match self.request(resource).await {
            PermissionStatus::Granted => Ok(()),
            _ => Err(CaptureError::PermissionDenied(resource)),
        }
    }

    /// Drop the memoized answer and re-query the platform, without prompting.
    ///
    /// This is the explicit path for picking up a change the user made in the
    /// system settings.
    pub fn refresh(&self, resource: PermissionResource) -> PermissionStatus {
        self.memo.lock().remove(&resource);
        self.status(resource)
    }

    /// Forget every memoized answer.
    pub fn reset(&self) {
        self.memo.lock().clear();
    }

    fn remember(&self, resource: PermissionResource, status: PermissionStatus) {
        if status.is_decided() {
            self.memo.lock().insert(resource, status);
        }
    }
}
