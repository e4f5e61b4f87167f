//! Layout error types.

use bpmn_diagram::Id;
use bpmn_diagram::modeler::ModelerError;
use ecow::EcoString;
use thiserror::Error;

/// A fatal layout error.
///
/// Expected conditions (back edges, open fans, orphan lane members, missing
/// hosts, missing solver sections) are not errors; they have defined
/// fallbacks. Recoverable modeler rejections are handled at their call-sites
/// and never surface here.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The requested scope element does not exist or is not a participant or
    /// subprocess.
    #[error("invalid layout scope: {0}")]
    InvalidScope(Id),
    /// The layered solver rejected its input or returned a malformed tree.
    #[error("layered solver failed: {0}")]
    Solver(EcoString),
    /// A pipeline step failed; the original error is preserved as the cause.
    #[error("Pipeline step \"{name}\" failed: {source}")]
    Step {
        /// The failing step's name.
        name: &'static str,
        /// The original error.
        #[source]
        source: Box<LayoutError>,
    },
    /// The pipeline was cancelled between steps.
    #[error("layout cancelled")]
    Cancelled,
    /// A modeler operation failed where no local recovery applies.
    #[error(transparent)]
    Modeler(#[from] ModelerError),
}

/// The usual result type of layout operations.
pub type LayoutResult<T> = Result<T, LayoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_message_and_cause() {
        let error = LayoutError::Step {
            name: "solve",
            source: Box::new(LayoutError::Solver(EcoString::from("cycle in input"))),
        };
        assert_eq!(
            error.to_string(),
            "Pipeline step \"solve\" failed: layered solver failed: cycle in input"
        );
        assert!(std::error::Error::source(&error).is_some());
    }
}
