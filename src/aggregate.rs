use crate::diagnostic::{Diagnostic, Severity};
use serde::Serialize;

/// Finding counts per severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SeverityCounts {
    pub total: usize,
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

/// Aggregated view of one validation run: counts plus a severity-ordered list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub counts: SeverityCounts,
    pub sorted: Vec<Diagnostic>,
}

/// Count diagnostics per severity and order them errors-first
///
/// The sort is stable: findings with the same severity keep the order the
/// validator reported them in.
pub fn aggregate(diagnostics: &[Diagnostic]) -> Summary {
    let mut counts = SeverityCounts {
        total: diagnostics.len(),
        ..Default::default()
    };
    for diagnostic in diagnostics {
        match diagnostic.severity {
            Severity::Error => counts.error += 1,
            Severity::Warning => counts.warning += 1,
            Severity::Info => counts.info += 1,
        }
    }

    let mut sorted = diagnostics.to_vec();
    sorted.sort_by_key(|d| d.severity.rank());

    Summary { counts, sorted }
}
