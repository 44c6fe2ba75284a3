// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Resolution Audit Log
// ─────────────────────────────────────────────────────────────────────
//! Every resolution is appended exactly once, in order, and never
//! changed. Records carry enough (mode, score, full breakdown, override
//! flag, timestamp) to audit a decision without re-running modules.
//!
//! Each record is sealed with a leaf hash over its canonical JSON, and
//! the log commits to the Merkle root over all leaves. Any single
//! record can be proven part of the log with an inclusion proof.
//!
//! Persistence is optional: a [`JsonlSink`] writes one sealed entry per
//! line from its own thread, so disk latency never sits in the caller's
//! resolution path. [`replay`] refuses a line whose record no longer
//! matches its leaf hash.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Sender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use concord_integrity::{fingerprint_of, inclusion_proof, merkle_root, MerkleProof};
use concord_types::{
    ConcordError, ConcordResult, PriorResolution, ResolutionMode, ResolutionRecord,
};

/// One persisted line: a record and the leaf hash it was sealed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub leaf: String,
    pub record: Value,
}

impl AuditEntry {
    pub fn seal(record: &ResolutionRecord) -> ConcordResult<Self> {
        let record = serde_json::to_value(record)?;
        Ok(Self {
            leaf: fingerprint_of(&record),
            record,
        })
    }

    pub fn is_intact(&self) -> bool {
        fingerprint_of(&self.record) == self.leaf
    }
}

#[derive(Default)]
struct LogState {
    records: Vec<Arc<ResolutionRecord>>,
    leaves: Vec<String>,
}

/// In-memory, append-only resolution log with an optional disk sink.
#[derive(Default)]
pub struct ResolutionLog {
    state: RwLock<LogState>,
    sink: Option<JsonlSink>,
}

impl ResolutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: JsonlSink) -> Self {
        Self {
            state: RwLock::new(LogState::default()),
            sink: Some(sink),
        }
    }

    /// Stamp `record` with its sequence number, seal it and append it.
    ///
    /// Sequence assignment, the in-memory push and the hand-off to the
    /// sink happen under one lock, so the file order matches the
    /// sequence order.
    pub fn append(&self, mut record: ResolutionRecord) -> ConcordResult<ResolutionRecord> {
        let mut state = self.state.write();
        record.sequence = state.records.len() as u64;
        let entry = AuditEntry::seal(&record)?;
        state.leaves.push(entry.leaf.clone());
        if let Some(sink) = &self.sink {
            sink.submit(entry);
        }
        state.records.push(Arc::new(record.clone()));
        Ok(record)
    }

    pub fn records(&self) -> Vec<ResolutionRecord> {
        self.state
            .read()
            .records
            .iter()
            .map(|r| ResolutionRecord::clone(r))
            .collect()
    }

    pub fn last_for(&self, action_id: &str) -> Option<ResolutionRecord> {
        self.state
            .read()
            .records
            .iter()
            .rev()
            .find(|r| r.action_id == action_id)
            .map(|r| ResolutionRecord::clone(r))
    }

    /// Most recent automatic (non-override) verdict for `action_id`.
    pub fn last_automatic(&self, action_id: &str) -> Option<PriorResolution> {
        self.state
            .read()
            .records
            .iter()
            .rev()
            .filter(|r| r.action_id == action_id && r.mode != ResolutionMode::HumanOverride)
            .find_map(|r| {
                r.final_score.map(|final_score| PriorResolution {
                    sequence: r.sequence,
                    final_score,
                    mode: r.mode.clone(),
                    timestamp: r.timestamp,
                })
            })
    }

    /// Leaf hash of the record at `sequence`.
    pub fn leaf(&self, sequence: u64) -> Option<String> {
        let index = usize::try_from(sequence).ok()?;
        self.state.read().leaves.get(index).cloned()
    }

    /// Merkle root over every record appended so far.
    pub fn root(&self) -> String {
        let leaves = self.state.read().leaves.clone();
        merkle_root(&leaves)
    }

    /// Inclusion proof for the record at `sequence` against the current root.
    pub fn proof(&self, sequence: u64) -> Option<MerkleProof> {
        let index = usize::try_from(sequence).ok()?;
        let leaves = self.state.read().leaves.clone();
        inclusion_proof(&leaves, index)
    }

    /// Re-seal every record and rebuild the root. Returns the root when
    /// every record still matches the leaf it was appended with.
    pub fn verify_chain(&self) -> ConcordResult<String> {
        let (records, leaves) = {
            let state = self.state.read();
            (state.records.clone(), state.leaves.clone())
        };
        for (record, leaf) in records.iter().zip(&leaves) {
            if AuditEntry::seal(record)?.leaf != *leaf {
                return Err(ConcordError::Tampered(format!(
                    "record {} no longer matches its leaf hash",
                    record.sequence
                )));
            }
        }
        Ok(merkle_root(&leaves))
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }

    pub fn sink_path(&self) -> Option<&Path> {
        self.sink.as_ref().map(|s| s.path())
    }
}

/// Background JSON-lines writer. Each entry is written and flushed
/// before the next is taken. Dropping the sink drains the queue.
pub struct JsonlSink {
    path: PathBuf,
    tx: Option<Sender<AuditEntry>>,
    worker: Option<JoinHandle<()>>,
}

impl JsonlSink {
    /// Open (or create) `path` in append mode and start the writer.
    pub fn open(path: impl AsRef<Path>) -> ConcordResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                ConcordError::Persistence(format!("cannot open {}: {e}", path.display()))
            })?;

        let (tx, rx) = unbounded::<AuditEntry>();
        let worker_path = path.clone();
        let worker = std::thread::Builder::new()
            .name("concord-audit".into())
            .spawn(move || {
                let mut file: File = file;
                for entry in rx {
                    let line = match serde_json::to_string(&entry) {
                        Ok(line) => line,
                        Err(e) => {
                            log::error!("audit sink: cannot encode entry {}: {e}", entry.leaf);
                            continue;
                        }
                    };
                    if let Err(e) = writeln!(file, "{line}") {
                        log::error!("audit sink: write to {} failed: {e}", worker_path.display());
                        continue;
                    }
                    if let Err(e) = file.flush() {
                        log::error!("audit sink: flush of {} failed: {e}", worker_path.display());
                    }
                }
            })
            .map_err(|e| ConcordError::Persistence(format!("cannot start audit writer: {e}")))?;

        Ok(Self {
            path,
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn submit(&self, entry: AuditEntry) {
        if let Some(tx) = &self.tx {
            if let Err(e) = tx.send(entry) {
                log::error!("audit sink: writer stopped, entry {} lost", e.0.leaf);
            }
        }
    }

    /// Drain pending entries and stop the writer.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("audit sink: writer thread panicked");
            }
        }
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A persisted log read back with its leaf hashes.
#[derive(Debug, Clone, Default)]
pub struct AuditTrail {
    pub records: Vec<ResolutionRecord>,
    pub leaves: Vec<String>,
}

impl AuditTrail {
    pub fn root(&self) -> String {
        merkle_root(&self.leaves)
    }

    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        inclusion_proof(&self.leaves, index)
    }

    /// Fails unless the file commits to `expected_root`, which catches
    /// lines that were dropped, reordered or re-sealed after the fact.
    pub fn verify_root(&self, expected_root: &str) -> ConcordResult<()> {
        let root = self.root();
        if root != expected_root {
            return Err(ConcordError::Tampered(format!(
                "root {root} does not match committed root {expected_root}"
            )));
        }
        Ok(())
    }
}

/// Read back a JSON-lines audit log, checking every entry against its
/// leaf hash. Blank lines are skipped.
pub fn replay_trail(path: impl AsRef<Path>) -> ConcordResult<AuditTrail> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ConcordError::Persistence(format!("cannot open {}: {e}", path.display())))?;
    let mut trail = AuditTrail::default();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            ConcordError::Persistence(format!("read {} line {}: {e}", path.display(), idx + 1))
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| {
            ConcordError::Serialization(format!("{} line {}: {e}", path.display(), idx + 1))
        })?;
        if !entry.is_intact() {
            return Err(ConcordError::Tampered(format!(
                "{} line {}: record does not match leaf {}",
                path.display(),
                idx + 1,
                entry.leaf
            )));
        }
        let record = serde_json::from_value(entry.record).map_err(|e| {
            ConcordError::Serialization(format!("{} line {}: {e}", path.display(), idx + 1))
        })?;
        trail.records.push(record);
        trail.leaves.push(entry.leaf);
    }
    Ok(trail)
}

/// `replay_trail`, keeping only the records.
pub fn replay(path: impl AsRef<Path>) -> ConcordResult<Vec<ResolutionRecord>> {
    Ok(replay_trail(path)?.records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use concord_integrity::EMPTY_ROOT;

    fn record(action_id: &str, score: Option<f64>, mode: ResolutionMode) -> ResolutionRecord {
        ResolutionRecord {
            action_id: action_id.into(),
            context: None,
            final_score: score,
            mode,
            breakdown: Vec::new(),
            contested: None,
            override_applied: false,
            prior_automatic: None,
            concepts: Vec::new(),
            sequence: 99,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_append_assigns_sequence() {
        let log = ResolutionLog::new();
        let a = log
            .append(record("a", Some(0.7), ResolutionMode::WeightedSynthesis))
            .unwrap();
        let b = log
            .append(record("b", Some(0.2), ResolutionMode::WeightedSynthesis))
            .unwrap();
        assert_eq!(a.sequence, 0);
        assert_eq!(b.sequence, 1);
        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[1].action_id, "b");
    }

    #[test]
    fn test_last_automatic_skips_overrides_and_deadlocks() {
        let log = ResolutionLog::new();
        log.append(record("a", Some(0.7), ResolutionMode::WeightedSynthesis)).unwrap();
        log.append(record("a", None, ResolutionMode::InsufficientSharedDensity)).unwrap();
        log.append(record("a", Some(0.9), ResolutionMode::HumanOverride)).unwrap();
        let prior = log.last_automatic("a").unwrap();
        assert_eq!(prior.sequence, 0);
        assert_eq!(prior.final_score, 0.7);
        assert_eq!(log.last_for("a").unwrap().sequence, 2);
        assert!(log.last_automatic("b").is_none());
    }

    #[test]
    fn test_sink_and_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolutions.jsonl");
        {
            let log = ResolutionLog::with_sink(JsonlSink::open(&path).unwrap());
            assert_eq!(log.sink_path(), Some(path.as_path()));
            log.append(record("a", Some(0.7), ResolutionMode::WeightedSynthesis)).unwrap();
            log.append(record(
                "b",
                Some(0.0),
                ResolutionMode::BlockedByPriority {
                    module: "honesty".into(),
                },
            ))
            .unwrap();
        }
        let replayed = replay(&path).unwrap();
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[0].sequence, 0);
        assert_eq!(replayed[1].mode.to_string(), "blocked_by_priority(honesty)");
    }

    #[test]
    fn test_sink_appends_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        for _ in 0..2 {
            let sink = JsonlSink::open(&path).unwrap();
            let entry = record("a", Some(0.5), ResolutionMode::WeightedSynthesis);
            sink.submit(AuditEntry::seal(&entry).unwrap());
            sink.close();
        }
        assert_eq!(replay(&path).unwrap().len(), 2);
    }

    /// Three records persisted through a sink; returns the file and the
    /// root the in-memory log committed to.
    fn sealed_file(dir: &Path) -> (PathBuf, String) {
        let path = dir.join("sealed.jsonl");
        let log = ResolutionLog::with_sink(JsonlSink::open(&path).unwrap());
        for (id, score) in [("a", 0.7), ("b", 0.4), ("c", 0.9)] {
            log.append(record(id, Some(score), ResolutionMode::WeightedSynthesis))
                .unwrap();
        }
        let root = log.root();
        drop(log);
        (path, root)
    }

    fn rewrite_line(path: &Path, line_no: usize, edit: impl Fn(&mut AuditEntry)) {
        let text = std::fs::read_to_string(path).unwrap();
        let lines: Vec<String> = text
            .lines()
            .enumerate()
            .map(|(i, line)| {
                if i + 1 != line_no {
                    return line.to_string();
                }
                let mut entry: AuditEntry = serde_json::from_str(line).unwrap();
                edit(&mut entry);
                serde_json::to_string(&entry).unwrap()
            })
            .collect();
        std::fs::write(path, lines.join("\n") + "\n").unwrap();
    }

    #[test]
    fn test_root_and_inclusion_proofs() {
        let log = ResolutionLog::new();
        assert_eq!(log.root(), EMPTY_ROOT);
        for i in 0..5 {
            log.append(record(&format!("a{i}"), Some(0.5), ResolutionMode::WeightedSynthesis))
                .unwrap();
        }
        let root = log.verify_chain().unwrap();
        assert_eq!(root, log.root());
        for seq in 0..5 {
            assert!(log.proof(seq).unwrap().verify_against(&root), "seq {seq}");
        }
        assert!(log.proof(5).is_none());
        assert_eq!(log.leaf(2), Some(log.proof(2).unwrap().leaf_hash));
    }

    #[test]
    fn test_intact_file_matches_committed_root() {
        let dir = tempfile::tempdir().unwrap();
        let (path, root) = sealed_file(dir.path());
        let trail = replay_trail(&path).unwrap();
        assert_eq!(trail.records.len(), 3);
        assert!(trail.verify_root(&root).is_ok());
        assert!(trail.proof(1).unwrap().verify_against(&root));
    }

    #[test]
    fn test_edited_line_fails_replay() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = sealed_file(dir.path());
        rewrite_line(&path, 2, |entry| {
            entry.record["final_score"] = serde_json::json!(0.99);
        });
        match replay(&path) {
            Err(ConcordError::Tampered(msg)) => assert!(msg.contains("line 2"), "{msg}"),
            other => panic!("expected tamper error, got {other:?}"),
        }
    }

    #[test]
    fn test_resealed_or_dropped_line_fails_root_check() {
        let dir = tempfile::tempdir().unwrap();
        let (path, root) = sealed_file(dir.path());
        rewrite_line(&path, 2, |entry| {
            entry.record["final_score"] = serde_json::json!(0.99);
            entry.leaf = fingerprint_of(&entry.record);
        });
        let trail = replay_trail(&path).unwrap();
        assert!(matches!(
            trail.verify_root(&root),
            Err(ConcordError::Tampered(_))
        ));

        let other = tempfile::tempdir().unwrap();
        let (path, root) = sealed_file(other.path());
        let text = std::fs::read_to_string(&path).unwrap();
        let kept: Vec<&str> = text.lines().take(2).collect();
        std::fs::write(&path, kept.join("\n")).unwrap();
        assert!(replay_trail(&path).unwrap().verify_root(&root).is_err());
    }

    #[test]
    fn test_replay_reports_bad_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "\n{not json}\n").unwrap();
        match replay(&path) {
            Err(ConcordError::Serialization(msg)) => assert!(msg.contains("line 2")),
            other => panic!("expected serialization error, got {other:?}"),
        }
    }

    #[test]
    fn test_replay_missing_file() {
        assert!(matches!(
            replay("/nonexistent/concord.jsonl"),
            Err(ConcordError::Persistence(_))
        ));
    }
}
