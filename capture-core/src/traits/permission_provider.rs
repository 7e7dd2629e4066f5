use async_trait::async_trait;

use crate::models::permission::{PermissionResource, PermissionStatus};

/// Platform authorization API for one app install.
///
/// Implemented by the platform backend. The platform shows its prompt at
/// most once per resource; after that `request_access` resolves immediately
/// with the stored answer.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Current authorization, without prompting. Must not block.
    fn authorization_status(&self, resource: PermissionResource) -> PermissionStatus;

    /// Ask for access, suspending until the user answers the prompt.
    async fn request_access(&self, resource: PermissionResource) -> PermissionStatus;
}
