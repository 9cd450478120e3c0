//! Ordered graph-annotation passes.
//!
//! Each pass reads and mutates the shared graph. [`execute_all`] runs them in
//! the given order and stops at the first failure; whatever earlier passes
//! (and the failing one) already wrote stays on the graph.

pub mod attached;
pub mod effective;
pub mod notfound;
pub mod refgrant;

pub use attached::PolicyAttachment;
pub use effective::EffectivePolicies;
pub use notfound::DanglingReferences;
pub use refgrant::ReferenceGrantCheck;

use crate::diagnostics::Diagnostics;
use crate::error::Error;
use crate::topology::Graph;

pub trait Extension {
    fn name(&self) -> &'static str;
    fn execute(&self, graph: &mut Graph) -> Result<(), Error>;
}

pub fn execute_all(
    graph: &mut Graph,
    extensions: &[&dyn Extension],
    diagnostics: &dyn Diagnostics,
) -> Result<(), Error> {
    for extension in extensions {
        diagnostics.debug(&format!("running extension {}", extension.name()));
        extension.execute(graph)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingDiagnostics;
    use std::cell::RefCell;

    struct Recorder<'a> {
        name: &'static str,
        fail: bool,
        ran: &'a RefCell<Vec<&'static str>>,
    }

    impl Extension for Recorder<'_> {
        fn name(&self) -> &'static str {
            self.name
        }

        fn execute(&self, _graph: &mut Graph) -> Result<(), Error> {
            self.ran.borrow_mut().push(self.name);
            if self.fail {
                return Err(Error::Extension {
                    name: self.name,
                    message: "boom".to_string(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn runs_in_order_and_stops_at_first_failure() {
        let ran = RefCell::new(Vec::new());
        let first = Recorder { name: "first", fail: false, ran: &ran };
        let second = Recorder { name: "second", fail: true, ran: &ran };
        let third = Recorder { name: "third", fail: false, ran: &ran };

        let mut graph = Graph::new(&[]);
        let err = execute_all(
            &mut graph,
            &[&first, &second, &third],
            &RecordingDiagnostics::default(),
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "extension second failed: boom");
        assert_eq!(*ran.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn empty_pipeline_succeeds() {
        let mut graph = Graph::new(&[]);
        assert!(execute_all(&mut graph, &[], &RecordingDiagnostics::default()).is_ok());
    }
}
