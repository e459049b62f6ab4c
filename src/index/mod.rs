//! Folder indexing.
//!
//! Walks the configured search roots and produces a flat catalog of PDF
//! candidates with normalized metadata. Roots fan out over a bounded set of
//! blocking tasks and are merged in input order so downstream matching stays
//! deterministic regardless of completion order. Inaccessible entries become
//! warnings, never fatal errors; only a fully unusable root set aborts.

use crate::cancel::CancelHandle;
use crate::config::EngineConfig;
use crate::report::{CandidateFile, IndexWarning};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;
use walkdir::WalkDir;

/// Buffer size for digest reads (8KB)
const DIGEST_BUFFER: usize = 8192;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("no usable search roots: {0}")]
    NoSearchRoots(String),

    #[error("indexing cancelled")]
    Cancelled,
}

/// Flat candidate catalog plus the warnings gathered while building it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub files: Vec<CandidateFile>,
    pub warnings: Vec<IndexWarning>,
}

/// Recursive indexer over an ordered list of search roots.
#[derive(Debug, Clone)]
pub struct FolderIndexer {
    follow_symlinks: bool,
    workers: usize,
    cancel_check_interval: usize,
}

impl FolderIndexer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            follow_symlinks: config.follow_symlinks,
            workers: config.index_workers.max(1),
            cancel_check_interval: config.cancel_check_interval.max(1),
        }
    }

    /// Index all roots into one catalog.
    ///
    /// Missing or unreadable roots degrade to warnings; only when every root
    /// is unusable does the indexer fail with `NoSearchRoots`. Files with
    /// identical content reachable under several roots (or several paths)
    /// enter the catalog once, first root in input order winning.
    pub async fn index(
        &self,
        roots: &[PathBuf],
        cancel: &CancelHandle,
    ) -> Result<Catalog, IndexError> {
        let start = Instant::now();
        let mut warnings = Vec::new();
        let mut usable = Vec::new();

        for root in roots {
            match fs::metadata(root) {
                Ok(meta) if meta.is_dir() => usable.push(root.clone()),
                Ok(_) => warnings.push(IndexWarning {
                    path: root.clone(),
                    message: "search root is not a directory".into(),
                }),
                Err(error) => warnings.push(IndexWarning {
                    path: root.clone(),
                    message: format!("search root unreadable: {error}"),
                }),
            }
        }

        if usable.is_empty() {
            return Err(IndexError::NoSearchRoots(format!(
                "{} roots supplied, none readable",
                roots.len()
            )));
        }

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(usable.len());
        for root in usable {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("semaphore is never closed");
            let cancel = cancel.clone();
            let walker = self.clone();
            let display = root.clone();
            handles.push((
                display,
                tokio::task::spawn_blocking(move || {
                    let result = walker.walk_root(&root, &cancel);
                    drop(permit);
                    result
                }),
            ));
        }

        // merge in input-root order, not completion order
        let mut files = Vec::new();
        let mut seen_paths: HashSet<PathBuf> = HashSet::new();
        let mut seen_digests: HashSet<String> = HashSet::new();
        for (root, handle) in handles {
            match handle.await {
                Ok(Ok(mut partial)) => {
                    warnings.append(&mut partial.warnings);
                    for file in partial.files {
                        let real = fs::canonicalize(&file.path).unwrap_or_else(|_| file.path.clone());
                        if !seen_paths.insert(real) {
                            continue;
                        }
                        if !seen_digests.insert(file.sha256.clone()) {
                            continue;
                        }
                        files.push(file);
                    }
                }
                Ok(Err(IndexError::Cancelled)) => return Err(IndexError::Cancelled),
                Ok(Err(other)) => return Err(other),
                Err(join_error) => {
                    tracing::warn!(root = %root.display(), error = %join_error, "index task panicked");
                    warnings.push(IndexWarning {
                        path: root,
                        message: format!("index task panicked: {join_error}"),
                    });
                }
            }
        }

        tracing::info!(
            files = files.len(),
            warnings = warnings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "indexed search roots"
        );
        Ok(Catalog { files, warnings })
    }

    fn walk_root(&self, root: &Path, cancel: &CancelHandle) -> Result<Catalog, IndexError> {
        let mut catalog = Catalog::default();
        let walker = WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name();

        for (seq, entry) in walker.into_iter().enumerate() {
            if seq % self.cancel_check_interval == 0 && cancel.is_cancelled() {
                return Err(IndexError::Cancelled);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    let path = error
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    catalog.warnings.push(IndexWarning {
                        path,
                        message: error.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !is_pdf_candidate(path) {
                continue;
            }

            match snapshot(path) {
                Ok(file) => catalog.files.push(file),
                Err(message) => catalog.warnings.push(IndexWarning {
                    path: path.to_path_buf(),
                    message,
                }),
            }
        }

        Ok(catalog)
    }
}

/// Regular PDF check: extension, MIME guess, and magic bytes must agree.
fn is_pdf_candidate(path: &Path) -> bool {
    let ext_ok = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !ext_ok {
        return false;
    }

    let mime_ok = mime_guess::from_path(path)
        .iter()
        .any(|mime| mime.essence_str() == "application/pdf");
    if !mime_ok {
        return false;
    }

    has_pdf_magic(path)
}

fn has_pdf_magic(path: &Path) -> bool {
    let mut header = [0u8; 5];
    let Ok(mut file) = fs::File::open(path) else {
        return false;
    };
    if file.read_exact(&mut header).is_err() {
        return false;
    }
    &header == b"%PDF-"
}

/// Immutable metadata snapshot of one candidate.
fn snapshot(path: &Path) -> Result<CandidateFile, String> {
    let metadata = fs::metadata(path).map_err(|e| format!("failed to stat: {e}"))?;
    let modified_at = metadata.modified().ok().map(DateTime::<Utc>::from);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let sha256 = file_digest(path)?;

    Ok(CandidateFile {
        path: path.to_path_buf(),
        tokens: filename_tokens(&file_name),
        file_name,
        size: metadata.len(),
        modified_at,
        sha256,
    })
}

fn file_digest(path: &Path) -> Result<String, String> {
    let file = fs::File::open(path).map_err(|e| format!("failed to open: {e}"))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; DIGEST_BUFFER];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| format!("failed to read: {e}"))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Lowercased alphanumeric tokens of a filename, extension dropped.
pub(crate) fn filename_tokens(name: &str) -> Vec<String> {
    let stem = name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name);
    stem.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_pdf(dir: &Path, name: &str, body: &str) {
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.extend_from_slice(body.as_bytes());
        fs::write(dir.join(name), bytes).unwrap();
    }

    fn indexer() -> FolderIndexer {
        FolderIndexer::new(&EngineConfig::default())
    }

    #[tokio::test]
    async fn indexes_only_real_pdfs() {
        let root = TempDir::new().unwrap();
        write_pdf(root.path(), "ISO_Certificate.pdf", "certificate body");
        fs::write(root.path().join("notes.txt"), "not a pdf").unwrap();
        fs::write(root.path().join("fake.pdf"), "missing magic").unwrap();

        let catalog = indexer()
            .index(&[root.path().to_path_buf()], &CancelHandle::new())
            .await
            .unwrap();

        assert_eq!(catalog.files.len(), 1);
        let file = &catalog.files[0];
        assert_eq!(file.file_name, "ISO_Certificate.pdf");
        assert_eq!(file.tokens, vec!["iso", "certificate"]);
        assert!(file.size > 0);
        assert!(!file.sha256.is_empty());
    }

    #[tokio::test]
    async fn same_tree_indexes_identically() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("sub")).unwrap();
        write_pdf(root.path(), "License.pdf", "license body");
        write_pdf(&root.path().join("sub"), "Permit.pdf", "permit body");

        let first = indexer()
            .index(&[root.path().to_path_buf()], &CancelHandle::new())
            .await
            .unwrap();
        let second = indexer()
            .index(&[root.path().to_path_buf()], &CancelHandle::new())
            .await
            .unwrap();

        assert_eq!(first.files, second.files);
    }

    #[tokio::test]
    async fn identical_content_under_two_roots_collapses() {
        let root_a = TempDir::new().unwrap();
        let root_b = TempDir::new().unwrap();
        write_pdf(root_a.path(), "License_2023.pdf", "same license body");
        write_pdf(root_b.path(), "License_2023.pdf", "same license body");

        let catalog = indexer()
            .index(
                &[root_a.path().to_path_buf(), root_b.path().to_path_buf()],
                &CancelHandle::new(),
            )
            .await
            .unwrap();

        assert_eq!(catalog.files.len(), 1);
        assert!(catalog.files[0].path.starts_with(root_a.path()));
    }

    #[tokio::test]
    async fn missing_root_degrades_to_warning() {
        let root = TempDir::new().unwrap();
        write_pdf(root.path(), "Contract.pdf", "contract body");
        let missing = root.path().join("does-not-exist");

        let catalog = indexer()
            .index(
                &[missing.clone(), root.path().to_path_buf()],
                &CancelHandle::new(),
            )
            .await
            .unwrap();

        assert_eq!(catalog.files.len(), 1);
        assert!(catalog.warnings.iter().any(|w| w.path == missing));
    }

    #[tokio::test]
    async fn all_roots_missing_is_fatal() {
        let root = TempDir::new().unwrap();
        let result = indexer()
            .index(&[root.path().join("nope")], &CancelHandle::new())
            .await;
        assert!(matches!(result, Err(IndexError::NoSearchRoots(_))));
    }

    #[tokio::test]
    async fn cancellation_aborts_traversal() {
        let root = TempDir::new().unwrap();
        write_pdf(root.path(), "Certificate.pdf", "body");

        let cancel = CancelHandle::new();
        cancel.cancel();
        let result = indexer().index(&[root.path().to_path_buf()], &cancel).await;
        assert!(matches!(result, Err(IndexError::Cancelled)));
    }

    #[test]
    fn filename_tokens_normalize() {
        assert_eq!(filename_tokens("ISO_Certificate.pdf"), vec!["iso", "certificate"]);
        assert_eq!(filename_tokens("License_2023.pdf"), vec!["license", "2023"]);
        assert_eq!(filename_tokens("no-extension"), vec!["no", "extension"]);
    }
}
