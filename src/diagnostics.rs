//! Diagnostics sink handed to the graph, policy and extension components.
//!
//! Components report recoverable problems (a skipped policy, a policy target
//! that is not part of the graph) through this trait instead of logging
//! globally. The binary wires in [`TracingDiagnostics`].

pub trait Diagnostics {
    fn warn(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{}", message);
    }
}

/// Keeps every warning so tests can assert on them.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    warnings: std::cell::RefCell<Vec<String>>,
}

#[cfg(test)]
impl RecordingDiagnostics {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }
}

#[cfg(test)]
impl Diagnostics for RecordingDiagnostics {
    fn warn(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }

    fn debug(&self, _message: &str) {}
}
