use std::fmt;

use serde::{Deserialize, Serialize};

/// A gated hardware or storage capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionResource {
    Camera,
    Microphone,
    MediaLibrary,
}

impl fmt::Display for PermissionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera => f.write_str("camera"),
            Self::Microphone => f.write_str("microphone"),
            Self::MediaLibrary => f.write_str("media library"),
        }
    }
}

/// Outcome of a permission check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    #[default]
    NotDetermined,
    Granted,
    Denied,
}

impl PermissionStatus {
    /// Whether the user (or the system) has already answered.
    pub fn is_decided(self) -> bool {
        !matches!(self, Self::NotDetermined)
    }
}
