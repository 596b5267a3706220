//! The File Fetcher (SPEC_FULL.md §4.5) — downloads chat attachments into a
//! per-thread subdirectory of the fetch root, honoring a closed extension
//! allow-list and a fixed timeout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::timing::Timing;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

const TEXT_CODE_EXTENSIONS: &[&str] = &[
    "txt", "md", "rs", "py", "js", "ts", "tsx", "jsx", "go", "java", "c", "h", "cpp", "hpp", "cc",
    "rb", "sh", "bash", "zsh", "toml", "yaml", "yml", "json", "xml", "html", "css", "scss", "sql",
    "csv", "log", "ini", "cfg", "conf", "diff", "patch", "proto", "graphql", "lua", "kt", "swift",
    "php", "pl", "r", "scala", "clj", "ex", "exs", "erl", "hs", "nim", "zig", "vue", "svelte",
];

/// Extensionless basenames the bridge still recognizes as supported text.
const EXTENSIONLESS_ALLOW: &[&str] = &["Dockerfile", "Makefile", "LICENSE", "README"];

fn is_supported(filename: &str) -> bool {
    match Path::new(filename).extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let lower = ext.to_lowercase();
            IMAGE_EXTENSIONS.contains(&lower.as_str())
                || lower == "pdf"
                || TEXT_CODE_EXTENSIONS.contains(&lower.as_str())
        }
        None => EXTENSIONLESS_ALLOW.contains(&filename),
    }
}

/// Downloads attachments over HTTP using the bridge's chat bearer token.
pub struct FileFetcher {
    client: reqwest::Client,
    fetch_root: PathBuf,
    bearer_token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),
    #[error("io error writing {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}

impl FileFetcher {
    pub fn new(fetch_root: PathBuf, bearer_token: impl Into<String>, timing: &Timing) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timing.download_timeout).build()?;
        Ok(Self { client, fetch_root, bearer_token: bearer_token.into() })
    }

    #[cfg(test)]
    pub fn with_client(fetch_root: PathBuf, bearer_token: impl Into<String>, client: reqwest::Client) -> Self {
        Self { client, fetch_root, bearer_token: bearer_token.into() }
    }

    /// Resolve the on-disk destination for `filename` under `thread_id`,
    /// inserting a monotonic `-<k>` suffix before the extension if the
    /// unsuffixed path is already taken (SPEC_FULL.md §4.5).
    pub fn disambiguate(&self, thread_id: &str, filename: &str) -> PathBuf {
        let dir = self.fetch_root.join(thread_id);
        let stem = Path::new(filename).file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
        let ext = Path::new(filename).extension().and_then(|e| e.to_str());

        let mut candidate = dir.join(filename);
        let mut k = 1u64;
        while candidate.exists() {
            let name = match ext {
                Some(ext) => format!("{stem}-{k}.{ext}"),
                None => format!("{stem}-{k}"),
            };
            candidate = dir.join(name);
            k += 1;
        }
        candidate
    }

    /// Download `url` to `<fetch-root>/<thread_id>/<filename>`, returning
    /// the on-disk path. Aborts before issuing the request if `filename`'s
    /// extension isn't in the supported set.
    pub async fn fetch(&self, thread_id: &str, filename: &str, url: &str) -> Result<PathBuf, FetchError> {
        if !is_supported(filename) {
            return Err(FetchError::Unsupported(filename.to_owned()));
        }

        let dest = self.disambiguate(thread_id, filename);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FetchError::Io { path: parent.to_owned(), source: e })?;
        }

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        std::fs::write(&dest, &bytes).map_err(|e| FetchError::Io { path: dest.clone(), source: e })?;
        Ok(dest)
    }
}

/// Remove subdirectories of `fetch_root` older than `retention` (mtime-based;
/// SPEC_FULL.md §4.3.5 temp cleanup sweep — status-independent, a terminated
/// Session's files may still be needed for resurrection).
pub fn sweep_old_fetches(fetch_root: &Path, retention: Duration, now: std::time::SystemTime) -> anyhow::Result<()> {
    let Ok(entries) = std::fs::read_dir(fetch_root) else {
        return Ok(());
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Ok(metadata) = entry.metadata() else { continue };
        let Ok(modified) = metadata.modified() else { continue };
        let Ok(age) = now.duration_since(modified) else { continue };
        if age > retention {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove stale fetch directory");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "fetcher_tests.rs"]
mod tests;
