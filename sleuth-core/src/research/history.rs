//! Persisted research results.
//!
//! Each completed call is written to
//! `<results_dir>/<session_id>_<timestamp>_<context_id>.json`, so calls finishing
//! in the same millisecond on one engine never share a file.

use super::context::ResearchContext;
use crate::persistence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// File name for result `context_id` written by `session_id` at `at`.
pub fn result_file_name(session_id: &Uuid, at: DateTime<Utc>, context_id: &Uuid) -> String {
    format!(
        "{}_{}_{}.json",
        session_id,
        at.format("%Y%m%dT%H%M%S%.3fZ"),
        context_id
    )
}

/// Write `ctx` into `dir`. Returns the path written.
pub fn persist_result(dir: &Path, session_id: &Uuid, ctx: &ResearchContext) -> io::Result<PathBuf> {
    let at = ctx.completed_at.unwrap_or_else(Utc::now);
    let path = dir.join(result_file_name(session_id, at, &ctx.id));
    persistence::atomic_write_json(&path, ctx)?;
    Ok(path)
}

pub fn load_result(path: &Path) -> io::Result<Option<ResearchContext>> {
    persistence::load_json(path)
}

/// One line of result history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub path: PathBuf,
    pub id: Uuid,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub confidence: Option<f64>,
    pub source_count: usize,
    pub degraded: bool,
}

/// Every readable result in `dir`, newest first. Unreadable files are skipped.
pub fn list_results(dir: &Path) -> io::Result<Vec<ResultSummary>> {
    let mut summaries = Vec::new();
    for path in persistence::list_json_files(dir)? {
        match load_result(&path) {
            Ok(Some(ctx)) => summaries.push(ResultSummary {
                id: ctx.id,
                topic: ctx.topic.clone(),
                created_at: ctx.created_at,
                confidence: ctx.confidence(),
                source_count: ctx.results.len(),
                degraded: ctx.report.degraded,
                path,
            }),
            Ok(None) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable result file"),
        }
    }
    summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::options::ResearchOptions;
    use chrono::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_persist_and_load() {
        let dir = TempDir::new().unwrap();
        let session = Uuid::new_v4();
        let ctx = ResearchContext::new("persisted topic", ResearchOptions::default());
        let path = persist_result(dir.path(), &session, &ctx).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(&session.to_string()));
        assert!(name.ends_with(&format!("_{}.json", ctx.id)));
        assert_eq!(load_result(&path).unwrap(), Some(ctx));
    }

    #[test]
    fn test_list_newest_first_and_skip_corrupt() {
        let dir = TempDir::new().unwrap();
        let session = Uuid::new_v4();
        let mut older = ResearchContext::new("older", ResearchOptions::default());
        older.created_at = Utc::now() - Duration::hours(1);
        older.completed_at = Some(older.created_at);
        let newer = ResearchContext::new("newer", ResearchOptions::default());
        persist_result(dir.path(), &session, &older).unwrap();
        persist_result(dir.path(), &session, &newer).unwrap();
        std::fs::write(dir.path().join("junk.json"), b"not json").unwrap();

        let listed = list_results(dir.path()).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].topic, "newer");
        assert_eq!(listed[1].topic, "older");
    }

    #[test]
    fn test_same_instant_results_get_separate_files() {
        let dir = TempDir::new().unwrap();
        let session = Uuid::new_v4();
        let at = Utc::now();
        let mut first = ResearchContext::new("first", ResearchOptions::default());
        let mut second = ResearchContext::new("second", ResearchOptions::default());
        first.completed_at = Some(at);
        second.completed_at = Some(at);

        let a = persist_result(dir.path(), &session, &first).unwrap();
        let b = persist_result(dir.path(), &session, &second).unwrap();
        assert_ne!(a, b);
        assert_eq!(list_results(dir.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(list_results(&dir.path().join("absent")).unwrap().is_empty());
    }
}
