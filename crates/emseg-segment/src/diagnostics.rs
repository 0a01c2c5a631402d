//! Warnings collected while preparing a segmentation.
//!
//! Every call that can tolerate a problem returns the problems it found in
//! a [`Diagnostics`] list; each entry is also logged with `tracing::warn!`
//! as it is recorded.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tree::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A branch's child probabilities do not sum to one.
    ProbabilitySumMismatch,
    /// A segmentation boundary was reset to the whole volume.
    BoundaryCorrected,
    /// A spatial-prior weight was zeroed for lack of a prior volume.
    SpatialPriorWeightReset,
    /// Two volumes expected on one grid were not.
    GeometryMismatch,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::ProbabilitySumMismatch => "probability sum mismatch",
            DiagnosticKind::BoundaryCorrected => "boundary corrected",
            DiagnosticKind::SpatialPriorWeightReset => "spatial prior weight reset",
            DiagnosticKind::GeometryMismatch => "geometry mismatch",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Node the warning is about, if any.
    pub node: Option<NodeId>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "[{}] node {}: {}", self.kind, node, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Ordered list of warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a warning.
    pub fn warn(&mut self, kind: DiagnosticKind, node: Option<NodeId>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            kind,
            node,
            message: message.into(),
        };
        tracing::warn!(kind = %diagnostic.kind, node = ?diagnostic.node, "{}", diagnostic.message);
        self.entries.push(diagnostic);
    }

    /// Append another list without logging its entries again.
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Entries of one kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.of_kind(kind).count()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
