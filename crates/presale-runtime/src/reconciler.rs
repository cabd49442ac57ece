//! Manifest reconciliation.

use std::collections::BTreeSet;

use presale_models::{CompletionReport, ExpectedManifest, RetrievedArtifact};

/// Compares delivered names against expected names.
///
/// `missing = expected - delivered`; `delivered` is passed through untouched
/// and anything in it that was not expected is also listed as `unexpected`.
pub fn reconcile(expected: &BTreeSet<String>, delivered: &BTreeSet<String>) -> CompletionReport {
    CompletionReport {
        delivered: delivered.clone(),
        missing: expected.difference(delivered).cloned().collect(),
        unexpected: delivered.difference(expected).cloned().collect(),
    }
}

/// Reconciles retrieved artifacts against a manifest.
pub fn reconcile_artifacts(
    manifest: &ExpectedManifest,
    artifacts: &[RetrievedArtifact],
) -> CompletionReport {
    let delivered: BTreeSet<String> = artifacts.iter().map(|a| a.display_name.clone()).collect();
    reconcile(manifest.names(), &delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    const MANIFEST: [&str; 7] = [
        "Deal_Brief.pdf",
        "Use_Case_Map.xlsx",
        "ROI_Calc.xlsx",
        "Pilot_SOW.docx",
        "MAP.xlsx",
        "Mini_Deck.pptx",
        "Sources.md",
    ];

    #[test]
    fn test_same_set_has_nothing_missing() {
        let s = set(&MANIFEST);
        let report = reconcile(&s, &s);
        assert!(report.missing.is_empty());
        assert!(report.unexpected.is_empty());
        assert!(report.is_complete());
    }

    #[test]
    fn test_empty_delivery_misses_everything() {
        let s = set(&MANIFEST);
        let report = reconcile(&s, &BTreeSet::new());
        assert_eq!(report.missing, s);
        assert!(report.delivered.is_empty());
    }

    #[test]
    fn test_extras_are_reported_not_dropped() {
        let expected = set(&["a.pdf", "b.xlsx"]);
        let delivered = set(&["a.pdf", "notes.txt"]);
        let report = reconcile(&expected, &delivered);

        assert_eq!(report.delivered, delivered);
        assert_eq!(report.missing, set(&["b.xlsx"]));
        assert_eq!(report.unexpected, set(&["notes.txt"]));
        assert_eq!(report.expected_delivered(), 1);
    }

    #[test]
    fn test_empty_manifest() {
        let report = reconcile(&BTreeSet::new(), &set(&["x"]));
        assert!(report.is_complete());
        assert_eq!(report.unexpected, set(&["x"]));
    }

    #[test]
    fn test_reconcile_artifacts() {
        let manifest = ExpectedManifest::new(MANIFEST);
        let artifacts = vec![
            RetrievedArtifact {
                display_name: "MAP.xlsx".into(),
                local_path: PathBuf::from("/tmp/MAP.xlsx"),
            },
            RetrievedArtifact {
                display_name: "MAP.xlsx".into(),
                local_path: PathBuf::from("/tmp/MAP_2.xlsx"),
            },
            RetrievedArtifact {
                display_name: "summary.txt".into(),
                local_path: PathBuf::from("/tmp/summary.txt"),
            },
        ];

        let report = reconcile_artifacts(&manifest, &artifacts);
        assert_eq!(report.delivered, set(&["MAP.xlsx", "summary.txt"]));
        assert_eq!(report.missing.len(), 6);
        assert!(!report.missing.contains("MAP.xlsx"));
        assert_eq!(report.unexpected, set(&["summary.txt"]));
    }
}
