//! HTTP fetching, remote pagination and chain fallback against a local server

use std::path::Path;

use phaseline_core::SourceKind;
use phaseline_source::{
    Fetcher, LoadError, Location, RemoteClient, RemoteConfig, Source, SourceChain,
};
use pretty_assertions::assert_eq;
use reqwest::Client;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Serve one canned response per connection, in order, and hand back the
/// requests received (lowercased)
async fn serve(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            requests.push(read_request(&mut stream).await);
            let reason = if status == 200 { "OK" } else { "Error" };
            let reply = format!(
                "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            stream.write_all(reply.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
        requests
    });

    (base, handle)
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_lowercase()
}

fn client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}

fn remote(base: &str) -> RemoteConfig {
    RemoteConfig {
        base_url: base.to_string(),
        ..RemoteConfig::new("secret", "db1")
    }
}

fn page(name: &str) -> String {
    format!(
        r#"{{"properties": {{"Nome": {{"type": "title", "title": [{{"plain_text": "{}"}}]}}}}}}"#,
        name
    )
}

fn query_response(names: &[&str], next_cursor: Option<&str>) -> String {
    let results: Vec<String> = names.iter().map(|name| page(name)).collect();
    format!(
        r#"{{"object": "list", "results": [{}], "has_more": {}, "next_cursor": {}}}"#,
        results.join(","),
        next_cursor.is_some(),
        next_cursor.map_or("null".to_string(), |c| format!("\"{}\"", c))
    )
}

fn write_fixture(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

const CRONOGRAMA: &str = r#"{"tasks": [{"id": 1, "name": "Kickoff", "phase": "Planejamento",
    "project": "Portal", "start": "2026-01-01", "end": "2026-01-10"}]}"#;

// =============================================================================
// Fetcher
// =============================================================================

#[tokio::test]
async fn fetch_url_decodes_json() {
    let (base, server) = serve(vec![(200, r#"{"tasks": []}"#.to_string())]).await;
    let fetcher = Fetcher::with_client(client());

    let value = fetcher
        .fetch_json(&Location::parse(&format!("{}/data.json", base)))
        .await
        .unwrap();
    assert_eq!(value, serde_json::json!({"tasks": []}));

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("get /data.json http/1.1"));
}

#[tokio::test]
async fn fetch_url_rejects_non_success_status() {
    let (base, server) = serve(vec![(404, "{}".to_string())]).await;
    let url = format!("{}/missing.json", base);

    let err = Fetcher::with_client(client())
        .fetch_json(&Location::parse(&url))
        .await
        .unwrap_err();
    match err {
        LoadError::HttpStatus { url: failed, status } => {
            assert_eq!(failed, url);
            assert_eq!(status, 404);
        }
        other => panic!("unexpected error: {other}"),
    }
    server.await.unwrap();
}

// =============================================================================
// Remote client
// =============================================================================

#[tokio::test]
async fn query_page_sends_auth_version_and_cursor() {
    let (base, server) = serve(vec![(200, query_response(&["a"], None))]).await;
    let client = RemoteClient::new(client(), remote(&base));

    let response = client.query_page(Some("c2")).await.unwrap();
    assert_eq!(response.results.len(), 1);
    assert!(!response.has_more);

    let request = &server.await.unwrap()[0];
    assert!(request.starts_with("post /databases/db1/query http/1.1"));
    assert!(request.contains("authorization: bearer secret"));
    assert!(request.contains("notion-version: 2022-06-28"));
    assert!(request.ends_with(r#"{"page_size":100,"start_cursor":"c2"}"#));
}

#[tokio::test]
async fn query_page_rejects_non_success_status() {
    let (base, server) = serve(vec![(401, r#"{"message": "unauthorized"}"#.into())]).await;
    let client = RemoteClient::new(client(), remote(&base));

    let err = client.query_page(None).await.unwrap_err();
    assert!(matches!(err, LoadError::HttpStatus { status: 401, .. }));
    server.await.unwrap();
}

#[tokio::test]
async fn fetch_all_pages_follows_cursor() {
    let (base, server) = serve(vec![
        (200, query_response(&["a", "b"], Some("c2"))),
        (200, query_response(&["c"], None)),
    ])
    .await;
    let client = RemoteClient::new(client(), remote(&base));

    let pages = client.fetch_all_pages().await.unwrap();
    assert_eq!(pages.len(), 3);

    let requests = server.await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].contains("start_cursor"));
    assert!(requests[1].contains(r#""start_cursor":"c2""#));
}

#[tokio::test]
async fn fetch_all_pages_stops_on_repeated_cursor() {
    let (base, server) = serve(vec![
        (200, query_response(&["a"], Some("c2"))),
        (200, query_response(&["b"], Some("c2"))),
    ])
    .await;
    let client = RemoteClient::new(client(), remote(&base));

    let pages = client.fetch_all_pages().await.unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(server.await.unwrap().len(), 2);
}

// =============================================================================
// Chain
// =============================================================================

#[tokio::test]
async fn chain_falls_back_after_http_failure() {
    let dir = TempDir::new().unwrap();
    let (base, server) = serve(vec![(500, "{}".to_string())]).await;

    let chain = SourceChain::new(vec![
        Source::CsvJson(Location::parse(&format!("{}/projects.json", base))),
        Source::Json(write_fixture(dir.path(), "cronograma.json", CRONOGRAMA).as_str().into()),
    ])
    .unwrap()
    .fetcher(Fetcher::with_client(client()));

    let loaded = chain.load().await.unwrap();
    assert_eq!(loaded.source(), SourceKind::Json);
    assert_eq!(loaded.bundle.tasks[0].name, "Kickoff");
    server.await.unwrap();
}

#[tokio::test]
async fn http_failure_is_reported_as_unavailable_source() {
    let (base, server) = serve(vec![(503, "{}".to_string())]).await;
    let chain = SourceChain::new(vec![Source::Remote(remote(&base))])
        .unwrap()
        .fetcher(Fetcher::with_client(client()));

    let source = chain.sources()[0].clone();
    let err = chain.load_source(&source).await.unwrap_err();
    assert!(matches!(
        err,
        LoadError::SourceUnavailable {
            source_kind: SourceKind::RemoteApi,
            ..
        }
    ));
    assert!(err.to_string().contains("status 503"));
    server.await.unwrap();
}

#[tokio::test]
async fn chain_loads_remote_pages() {
    let (base, server) = serve(vec![
        (200, query_response(&["Kickoff"], Some("c2"))),
        (200, query_response(&["Entrega"], None)),
    ])
    .await;
    let chain = SourceChain::new(vec![Source::Remote(remote(&base))])
        .unwrap()
        .fetcher(Fetcher::with_client(client()));

    let loaded = chain.load().await.unwrap();
    assert_eq!(loaded.source(), SourceKind::RemoteApi);
    let names: Vec<&str> = loaded.bundle.tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Kickoff", "Entrega"]);
    assert_eq!(loaded.bundle.tasks[1].id, 2);
    server.await.unwrap();
}
