use std::path::{Path, PathBuf};

/// What happened to one directory entry during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Accepted,
    SkippedType,
    SkippedDuplicate,
    SkippedError(String),
}

/// Per-entry outcomes of one scan, in directory listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub outcomes: Vec<(PathBuf, ScanOutcome)>,
}

impl ScanReport {
    pub fn record(&mut self, path: PathBuf, outcome: ScanOutcome) {
        self.outcomes.push((path, outcome));
    }

    pub fn accepted(&self) -> usize {
        self.count(|o| matches!(o, ScanOutcome::Accepted))
    }

    pub fn skipped_type(&self) -> usize {
        self.count(|o| matches!(o, ScanOutcome::SkippedType))
    }

    pub fn skipped_duplicate(&self) -> usize {
        self.count(|o| matches!(o, ScanOutcome::SkippedDuplicate))
    }

    pub fn skipped_error(&self) -> usize {
        self.count(|o| matches!(o, ScanOutcome::SkippedError(_)))
    }

    pub fn outcome_for(&self, path: &Path) -> Option<&ScanOutcome> {
        self.outcomes
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, o)| o)
    }

    fn count(&self, pred: impl Fn(&ScanOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Check if a file name ends in one of `extensions` (case-insensitive,
/// leading dots in `extensions` are ignored).
pub fn is_image_file(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
