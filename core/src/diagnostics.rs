//! Diagnostic sink for unrecognised messages (spec.md §6 "Diagnostic sink
//! (optional collaborator)").

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::segment::Direction;

/// Write-only interface the decoders call on unrecognised messages. The
/// default is a no-op; [`FileDiagnosticSink`] is the sample-dumping
/// implementation.
pub trait DiagnosticSink: Send + Sync {
    fn store(&self, kind: &str, raw: &[u8], direction: Direction, sequence_nr: Option<u32>);
}

/// Default collaborator: discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnosticSink;

impl DiagnosticSink for NullDiagnosticSink {
    fn store(&self, _kind: &str, _raw: &[u8], _direction: Direction, _sequence_nr: Option<u32>) {}
}

/// Writes at most N samples (default 10, overridable per kind) per
/// `(direction, kind)` pair into `<root>/<direction>/<kind>/<n>.bin`.
pub struct FileDiagnosticSink {
    root: PathBuf,
    default_cap: usize,
    per_kind_cap: HashMap<String, usize>,
    counts: Mutex<HashMap<(Direction, String), usize>>,
}

impl FileDiagnosticSink {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            default_cap: 10,
            per_kind_cap: HashMap::new(),
            counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_cap(mut self, kind: impl Into<String>, cap: usize) -> Self {
        self.per_kind_cap.insert(kind.into(), cap);
        self
    }

    fn cap_for(&self, kind: &str) -> usize {
        self.per_kind_cap.get(kind).copied().unwrap_or(self.default_cap)
    }

    fn direction_dir(direction: Direction) -> &'static str {
        match direction {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
            Direction::Unknown => "unknown",
        }
    }
}

impl DiagnosticSink for FileDiagnosticSink {
    fn store(&self, kind: &str, raw: &[u8], direction: Direction, _sequence_nr: Option<u32>) {
        let cap = self.cap_for(kind);
        let key = (direction, kind.to_string());

        let n = {
            let mut counts = self.counts.lock();
            let n = counts.entry(key).or_insert(0);
            if *n >= cap {
                return;
            }
            let taken = *n;
            *n += 1;
            taken
        };

        let dir = self.root.join(Self::direction_dir(direction)).join(kind);

        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!(error = %e, path = %dir.display(), "failed to create diagnostic-sink directory");
            return;
        }

        let path = dir.join(format!("{n}.bin"));

        if let Err(e) = fs::write(&path, raw) {
            tracing::warn!(error = %e, path = %path.display(), "failed to write diagnostic sample");
        }
    }
}
