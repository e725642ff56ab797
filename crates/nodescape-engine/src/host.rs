//! The application context a graph is evaluated in.
//!
//! The engine never reaches for process-wide state. Everything it needs from
//! the surrounding application (which modules are running, where persistent
//! variables go) is injected as a [`NodeHost`] when the graph is built.

use std::collections::HashSet;

use nodescape_core::types::Value;

/// Services the hosting application provides to a graph.
pub trait NodeHost {
    /// Whether the module with this id is currently running. Module-bound
    /// nodes only run while their module does.
    fn is_module_running(&self, module: &str) -> bool;

    /// Called for every variable written with `persistent = true`. Storage
    /// is up to the host.
    fn persist_variable(&mut self, name: &str, value: &Value);
}

/// Host for graphs evaluated outside an application: a fixed set of running
/// modules and no persistence.
#[derive(Debug, Clone, Default)]
pub struct StandaloneHost {
    /// Running modules. `None` treats every module as running.
    running: Option<HashSet<String>>,
}

impl StandaloneHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the listed modules count as running.
    pub fn with_running_modules<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StandaloneHost {
            running: Some(modules.into_iter().map(Into::into).collect()),
        }
    }
}

impl NodeHost for StandaloneHost {
    fn is_module_running(&self, module: &str) -> bool {
        self.running.as_ref().map_or(true, |set| set.contains(module))
    }

    fn persist_variable(&mut self, name: &str, _value: &Value) {
        tracing::debug!("standalone host: not persisting variable '{}'", name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_host_runs_every_module() {
        let host = StandaloneHost::new();
        assert!(host.is_module_running("anything"));
    }

    #[test]
    fn restricted_host_runs_listed_modules_only() {
        let host = StandaloneHost::with_running_modules(["chatbox"]);
        assert!(host.is_module_running("chatbox"));
        assert!(!host.is_module_running("heartrate"));
    }
}
