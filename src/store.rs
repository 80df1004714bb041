//! File-backed store for response snapshots and generated documents.
//!
//! Layout:
//! - `<responses>/{slug}_{student_id}.json`: response snapshots
//! - `<generated>/<student_id>/{slug}_statement_of_intent_{timestamp}.md`

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;
use tokio::fs;

use crate::config::AppConfig;
use crate::error::{LoadError, SessionError};
use crate::questionnaire::{ResponseSnapshot, StoredResponses};

/// Marker shared by every generated statement file name.
pub const STATEMENT_MARKER: &str = "statement_of_intent_";

/// Whether `id` is safe to use as a file-name component and a directory
/// name: non-blank, no path separators, no `..`.
pub fn is_valid_student_id(id: &str) -> bool {
    !id.trim().is_empty() && !id.contains(['/', '\\', '\0']) && !id.contains("..")
}

fn check_student_id(id: &str) -> Result<(), SessionError> {
    if is_valid_student_id(id) {
        Ok(())
    } else {
        Err(SessionError::InvalidStudentId(id.to_string()))
    }
}

/// Who a response file belongs to, as far as its content tells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOwner {
    Student(String),
    /// Legacy file without metadata.
    Unknown,
    /// The file could not be read or parsed.
    Unreadable,
}

impl std::fmt::Display for FileOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Student(id) => write!(f, "{id}"),
            Self::Unknown => write!(f, "Unknown"),
            Self::Unreadable => write!(f, "Unknown (Error reading file)"),
        }
    }
}

/// An entry in the response-file listing.
#[derive(Debug, Clone)]
pub struct ResponseFileEntry {
    pub path: PathBuf,
    pub owner: FileOwner,
    /// Snapshot timestamp when recorded, otherwise the file's mtime.
    pub modified: Option<chrono::NaiveDateTime>,
    pub size: u64,
}

impl ResponseFileEntry {
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// A student's generated-documents directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioEntry {
    pub student_id: String,
    pub statements: usize,
    /// Name of the newest statement file.
    pub latest: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResponseStore {
    responses_dir: PathBuf,
    generated_dir: PathBuf,
}

impl ResponseStore {
    pub fn new(responses_dir: PathBuf, generated_dir: PathBuf) -> Self {
        Self {
            responses_dir,
            generated_dir,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.responses_dir.clone(), config.generated_dir.clone())
    }

    pub fn snapshot_path(&self, slug: &str, student_id: &str) -> PathBuf {
        self.responses_dir.join(format!("{slug}_{student_id}.json"))
    }

    /// Write a snapshot as pretty JSON, replacing any previous file with the
    /// same slug and student id.
    pub async fn write_snapshot(
        &self,
        snapshot: &ResponseSnapshot,
        slug: &str,
    ) -> Result<PathBuf, SessionError> {
        check_student_id(&snapshot.student_id)?;
        let path = self.snapshot_path(slug, &snapshot.student_id);
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::create_dir_all(&self.responses_dir).await?;
        fs::write(&path, json).await?;
        Ok(path)
    }

    /// Read a response file in either the wrapped or the legacy format.
    pub async fn load(&self, path: &Path) -> Result<StoredResponses, LoadError> {
        let content = fs::read_to_string(path).await.map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        StoredResponses::from_json(&content).map_err(|source| LoadError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write a generated document under the student's output directory.
    pub async fn write_document(
        &self,
        student_id: &str,
        slug: &str,
        content: &str,
    ) -> Result<PathBuf, SessionError> {
        check_student_id(student_id)?;
        let dir = self.generated_dir.join(student_id);
        fs::create_dir_all(&dir).await?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("{slug}_{STATEMENT_MARKER}{timestamp}.md"));
        fs::write(&path, content).await?;
        Ok(path)
    }

    /// All `*.json` files in the responses directory, newest first.
    pub async fn list_responses(&self) -> std::io::Result<Vec<ResponseFileEntry>> {
        let mut entries = Vec::new();
        for (path, metadata) in json_files(&self.responses_dir).await? {
            let mtime = metadata.modified().ok().map(naive_local);
            let (owner, modified) = match self.load(&path).await {
                Ok(stored) => match stored.student_id() {
                    Some(id) => (
                        FileOwner::Student(id.to_string()),
                        stored.timestamp().or(mtime),
                    ),
                    None => (FileOwner::Unknown, mtime),
                },
                Err(e) => {
                    tracing::debug!("Unreadable response file: {}", e);
                    (FileOwner::Unreadable, mtime)
                }
            };
            entries.push(ResponseFileEntry {
                path,
                owner,
                modified,
                size: metadata.len(),
            });
        }
        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(entries)
    }

    /// Most recently modified response file whose name contains `student_id`.
    pub async fn find_latest_for_student(
        &self,
        student_id: &str,
    ) -> std::io::Result<Option<PathBuf>> {
        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for (path, metadata) in json_files(&self.responses_dir).await? {
            let matches = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| stem.contains(student_id));
            if !matches {
                continue;
            }
            let modified = metadata.modified()?;
            if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
                newest = Some((modified, path));
            }
        }
        Ok(newest.map(|(_, path)| path))
    }

    /// One entry per student directory under the generated dir, sorted by
    /// student id descending.
    pub async fn list_portfolios(&self) -> std::io::Result<Vec<PortfolioEntry>> {
        if !fs::try_exists(&self.generated_dir).await? {
            return Ok(Vec::new());
        }

        let mut portfolios = Vec::new();
        let mut read_dir = fs::read_dir(&self.generated_dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            if !entry.metadata().await?.is_dir() {
                continue;
            }

            let mut statements = Vec::new();
            let mut inner = fs::read_dir(entry.path()).await?;
            while let Some(file) = inner.next_entry().await? {
                let name = file.file_name().to_string_lossy().to_string();
                if name.contains(STATEMENT_MARKER) && name.ends_with(".md") {
                    statements.push(name);
                }
            }
            // Names end in %Y%m%d_%H%M%S, so the lexical maximum within one
            // slug is the newest.
            statements.sort();

            portfolios.push(PortfolioEntry {
                student_id: entry.file_name().to_string_lossy().to_string(),
                statements: statements.len(),
                latest: statements.pop(),
            });
        }
        portfolios.sort_by(|a, b| b.student_id.cmp(&a.student_id));
        Ok(portfolios)
    }
}

async fn json_files(dir: &Path) -> std::io::Result<Vec<(PathBuf, std::fs::Metadata)>> {
    if !fs::try_exists(dir).await? {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut read_dir = fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();
        let metadata = entry.metadata().await?;
        if metadata.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push((path, metadata));
        }
    }
    Ok(files)
}

fn naive_local(time: SystemTime) -> chrono::NaiveDateTime {
    chrono::DateTime::<Local>::from(time).naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::ResponseMap;
    use tempfile::TempDir;

    fn test_store() -> (ResponseStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ResponseStore::new(dir.path().join("responses"), dir.path().join("generated"));
        (store, dir)
    }

    fn responses(pairs: &[(&str, &str)]) -> ResponseMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn wrapped_round_trip() {
        let (store, _dir) = test_store();
        let map = responses(&[("q1", "Title"), ("q4", "Everyone\nand more")]);
        let snapshot = ResponseSnapshot::now("s1", Some("Title".into()), map.clone());

        let path = store.write_snapshot(&snapshot, "title").await.unwrap();
        let loaded = store.load(&path).await.unwrap();

        assert_eq!(loaded.into_responses(), map);
    }

    #[tokio::test]
    async fn legacy_round_trip() {
        let (store, dir) = test_store();
        let map = responses(&[("q2", "b"), ("q1", "a")]);
        let path = dir.path().join("legacy.json");
        std::fs::write(&path, serde_json::to_string(&map).unwrap()).unwrap();

        let loaded = store.load(&path).await.unwrap();
        assert!(matches!(loaded, StoredResponses::Legacy(_)));
        assert_eq!(loaded.into_responses(), map);
    }

    #[tokio::test]
    async fn load_keeps_answers_when_timestamp_has_offset() {
        let (store, dir) = test_store();
        let path = dir.path().join("t_s1.json");
        std::fs::write(
            &path,
            r#"{"student_id":"s1","project_title":"T","timestamp":"2024-05-01T10:30:00+10:00","responses":{"q1":"T","q2":"Game"}}"#,
        )
        .unwrap();

        let loaded = store.load(&path).await.unwrap();
        assert_eq!(loaded.student_id(), Some("s1"));
        assert_eq!(loaded.responses()["q2"], "Game");
    }

    #[test]
    fn student_id_validation() {
        assert!(is_valid_student_id("20240101_120000"));
        assert!(is_valid_student_id("jane.doe"));
        for bad in ["", "  ", "../x", "..", "/abs", "a/b", "a\\b", "x..y"] {
            assert!(!is_valid_student_id(bad), "{bad:?}");
        }
    }

    #[tokio::test]
    async fn traversing_student_ids_write_nothing() {
        let (store, dir) = test_store();
        let snapshot = ResponseSnapshot::now("../escaped", None, responses(&[("q1", "a")]));
        let result = store.write_snapshot(&snapshot, "game").await;
        assert!(matches!(result, Err(SessionError::InvalidStudentId(ref id)) if id == "../escaped"));

        let result = store.write_document("/abs", "game", "text").await;
        assert!(matches!(result, Err(SessionError::InvalidStudentId(_))));

        assert!(!dir.path().join("escaped.json").exists());
        assert!(!dir.path().join("game_escaped.json").exists());
        assert!(!dir.path().join("responses").exists());
        assert!(!dir.path().join("generated").exists());
    }

    #[tokio::test]
    async fn load_missing_file_is_io_error() {
        let (store, dir) = test_store();
        let result = store.load(&dir.path().join("none.json")).await;
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[tokio::test]
    async fn load_malformed_file_is_reported() {
        let (store, dir) = test_store();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        let result = store.load(&path).await;
        assert!(matches!(result, Err(LoadError::Malformed { .. })));
    }

    #[tokio::test]
    async fn snapshot_is_overwritten_in_place() {
        let (store, _dir) = test_store();
        let first = ResponseSnapshot::now("s1", None, responses(&[("q2", "a")]));
        let second = ResponseSnapshot::now("s1", None, responses(&[("q2", "b")]));
        let p1 = store.write_snapshot(&first, "untitled_project").await.unwrap();
        let p2 = store.write_snapshot(&second, "untitled_project").await.unwrap();
        assert_eq!(p1, p2);
        assert_eq!(store.load(&p2).await.unwrap().responses()["q2"], "b");
    }

    #[tokio::test]
    async fn list_responses_reports_owner_kinds() {
        let (store, dir) = test_store();
        let snapshot = ResponseSnapshot::now("s1", None, responses(&[("q1", "a")]));
        store.write_snapshot(&snapshot, "a").await.unwrap();
        let responses_dir = dir.path().join("responses");
        std::fs::write(responses_dir.join("old.json"), r#"{"q1": "x"}"#).unwrap();
        std::fs::write(responses_dir.join("broken.json"), "nope").unwrap();
        std::fs::write(responses_dir.join("notes.txt"), "ignored").unwrap();

        let entries = store.list_responses().await.unwrap();
        assert_eq!(entries.len(), 3);
        let owner_of = |name: &str| {
            entries
                .iter()
                .find(|e| e.name() == name)
                .map(|e| e.owner.clone())
                .unwrap()
        };
        assert_eq!(owner_of("a_s1.json"), FileOwner::Student("s1".into()));
        assert_eq!(owner_of("old.json"), FileOwner::Unknown);
        assert_eq!(owner_of("broken.json"), FileOwner::Unreadable);
        assert_eq!(FileOwner::Unreadable.to_string(), "Unknown (Error reading file)");
    }

    #[tokio::test]
    async fn list_on_missing_dirs_is_empty() {
        let (store, _dir) = test_store();
        assert!(store.list_responses().await.unwrap().is_empty());
        assert!(store.list_portfolios().await.unwrap().is_empty());
        assert!(store.find_latest_for_student("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_latest_matches_student_id_in_name() {
        let (store, _dir) = test_store();
        let snapshot = ResponseSnapshot::now("20240101_120000", None, responses(&[("q1", "a")]));
        let path = store.write_snapshot(&snapshot, "game").await.unwrap();
        let other = ResponseSnapshot::now("someone_else", None, responses(&[("q1", "a")]));
        store.write_snapshot(&other, "game").await.unwrap();

        let found = store.find_latest_for_student("20240101_120000").await.unwrap();
        assert_eq!(found, Some(path));
        assert!(store.find_latest_for_student("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn portfolios_count_statements() {
        let (store, dir) = test_store();
        store.write_document("s1", "game", "one").await.unwrap();
        let s1 = dir.path().join("generated/s1");
        std::fs::write(s1.join("game_statement_of_intent_20990101_000000.md"), "two").unwrap();
        std::fs::write(s1.join("scratch.txt"), "ignored").unwrap();
        std::fs::create_dir_all(dir.path().join("generated/s2")).unwrap();

        let portfolios = store.list_portfolios().await.unwrap();
        assert_eq!(
            portfolios,
            vec![
                PortfolioEntry {
                    student_id: "s2".into(),
                    statements: 0,
                    latest: None,
                },
                PortfolioEntry {
                    student_id: "s1".into(),
                    statements: 2,
                    latest: Some("game_statement_of_intent_20990101_000000.md".into()),
                },
            ]
        );
    }
}
