//! Detection of the host's authoring environment
//!
//! Inside the authoring tool nobody is guaranteed to call
//! [`GlobalState::initialize`](crate::GlobalState::initialize), so effects
//! provision a default engine context themselves when this reports true.

use crate::config::PluginDesc;

pub trait EnvironmentDetector: Send + Sync {
    fn is_running_in_editor(&self) -> bool;
}

/// Matches the current executable path against a list of markers.
pub struct ExecutableNameDetector {
    markers: Vec<String>,
}

impl ExecutableNameDetector {
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }

    pub fn from_desc(desc: &PluginDesc) -> Self {
        Self::new(desc.editor_markers.clone())
    }

    fn matches(&self, executable: &str) -> bool {
        self.markers
            .iter()
            .any(|marker| executable.contains(marker.as_str()))
    }
}

impl EnvironmentDetector for ExecutableNameDetector {
    fn is_running_in_editor(&self) -> bool {
        match std::env::current_exe() {
            Ok(path) => self.matches(&path.to_string_lossy()),
            Err(e) => {
                log::warn!("Failed to resolve current executable: {}", e);
                false
            }
        }
    }
}

/// Environment with a fixed answer, for embedding applications and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedEnvironment(pub bool);

impl EnvironmentDetector for FixedEnvironment {
    fn is_running_in_editor(&self) -> bool {
        self.0
    }
}
