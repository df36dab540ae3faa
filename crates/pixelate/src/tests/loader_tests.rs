use super::*;

#[test]
fn decodes_base64_data_uri() {
    let bytes = decode_data_uri("data:image/png;base64,aGVsbG8=").expect("decode");
    assert_eq!(bytes, b"hello");
}

#[test]
fn rejects_percent_encoded_data_uri() {
    let err = decode_data_uri("data:text/plain,hello").expect_err("not base64");
    assert!(matches!(err, LoadError::MalformedDataUri(_)));
}

#[test]
fn rejects_data_uri_without_separator() {
    let err = decode_data_uri("data:image/png;base64").expect_err("no comma");
    assert!(matches!(err, LoadError::MalformedDataUri(_)));
}

#[tokio::test]
async fn file_loader_reads_paths_and_file_urls() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("image.bin");
    std::fs::write(&path, b"bytes").expect("write");

    let by_path = FileLoader
        .load(path.to_str().expect("utf-8 path"))
        .await
        .expect("by path");
    assert_eq!(by_path, b"bytes");

    let url = Url::from_file_path(&path).expect("file url");
    let by_url = SchemeLoader::default()
        .load(url.as_str())
        .await
        .expect("by url");
    assert_eq!(by_url, b"bytes");
}

#[tokio::test]
async fn missing_file_reports_its_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing.png");

    let err = FileLoader
        .load(path.to_str().expect("utf-8 path"))
        .await
        .expect_err("missing");
    match err {
        LoadError::Io { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn scheme_loader_dispatches_data_uris() {
    let bytes = SchemeLoader::default()
        .load("data:image/png;base64,aGVsbG8=")
        .await
        .expect("data uri");
    assert_eq!(bytes, b"hello");
}

#[tokio::test]
async fn scheme_loader_rejects_unknown_schemes() {
    let err = SchemeLoader::default()
        .load("ftp://x/img.png")
        .await
        .expect_err("ftp");
    assert!(matches!(err, LoadError::UnsupportedScheme(scheme) if scheme == "ftp"));
}

#[tokio::test]
async fn memory_loader_serves_only_known_locators() {
    let loader = MemoryLoader::new().with_image("http://x/a.png", vec![1, 2, 3]);
    assert_eq!(loader.load("http://x/a.png").await.expect("known"), vec![1, 2, 3]);
    assert!(matches!(
        loader.load("http://x/b.png").await,
        Err(LoadError::NotFound(_))
    ));
}
