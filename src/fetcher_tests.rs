use super::*;

fn fetcher(dir: &tempfile::TempDir) -> FileFetcher {
    FileFetcher::with_client(dir.path().to_owned(), "tok", reqwest::Client::new())
}

#[test]
fn supported_extensions_cover_images_pdf_and_code() {
    assert!(is_supported("photo.png"));
    assert!(is_supported("doc.PDF"));
    assert!(is_supported("main.rs"));
    assert!(is_supported("Dockerfile"));
}

#[test]
fn unsupported_extension_is_rejected() {
    assert!(!is_supported("archive.xyz"));
    assert!(!is_supported("noextensionbutnotallowed"));
}

#[test]
fn disambiguate_returns_plain_path_when_free() {
    let dir = tempfile::tempdir().unwrap();
    let f = fetcher(&dir);
    let path = f.disambiguate("t1", "a.png");
    assert_eq!(path, dir.path().join("t1").join("a.png"));
}

#[test]
fn disambiguate_inserts_monotonic_suffix_on_collision() {
    let dir = tempfile::tempdir().unwrap();
    let f = fetcher(&dir);
    let thread_dir = dir.path().join("t1");
    std::fs::create_dir_all(&thread_dir).unwrap();
    std::fs::write(thread_dir.join("a.png"), b"x").unwrap();

    let path = f.disambiguate("t1", "a.png");
    assert_eq!(path, thread_dir.join("a-1.png"));
}

#[tokio::test]
async fn fetch_rejects_unsupported_extension_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let f = fetcher(&dir);
    let err = f.fetch("t1", "evil.exe", "http://127.0.0.1:1/unused").await.unwrap_err();
    assert!(matches!(err, FetchError::Unsupported(_)));
}

#[test]
fn sweep_old_fetches_removes_dirs_older_than_retention() {
    let dir = tempfile::tempdir().unwrap();
    let stale = dir.path().join("thread-a");
    std::fs::create_dir_all(&stale).unwrap();

    let now = std::time::SystemTime::now() + Duration::from_secs(1000);
    sweep_old_fetches(dir.path(), Duration::from_secs(10), now).unwrap();

    assert!(!stale.exists());
}

#[test]
fn sweep_old_fetches_keeps_dirs_within_retention() {
    let dir = tempfile::tempdir().unwrap();
    let fresh = dir.path().join("thread-b");
    std::fs::create_dir_all(&fresh).unwrap();

    sweep_old_fetches(dir.path(), Duration::from_secs(600), std::time::SystemTime::now()).unwrap();

    assert!(fresh.exists());
}
