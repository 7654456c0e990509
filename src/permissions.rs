use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    Camera,
    Notifications,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PermissionOutcome {
    Granted,
    Denied,
}

impl PermissionOutcome {
    pub fn is_granted(self) -> bool {
        self == PermissionOutcome::Granted
    }
}

/// Asks the platform for access. A denial never blocks the flow.
#[async_trait]
pub trait PermissionPrompter: Send + Sync {
    async fn request(&self, permission: Permission) -> PermissionOutcome;
}

/// Answers from fixed configuration, for headless runs.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissions {
    camera: bool,
    notifications: bool,
}

impl StaticPermissions {
    pub fn new(camera: bool, notifications: bool) -> Self {
        Self {
            camera,
            notifications,
        }
    }
}

#[async_trait]
impl PermissionPrompter for StaticPermissions {
    async fn request(&self, permission: Permission) -> PermissionOutcome {
        let granted = match permission {
            Permission::Camera => self.camera,
            Permission::Notifications => self.notifications,
        };
        if granted {
            PermissionOutcome::Granted
        } else {
            PermissionOutcome::Denied
        }
    }
}
