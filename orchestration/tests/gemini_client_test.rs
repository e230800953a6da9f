//! `GeminiClient` against a one-shot local HTTP server.

use std::time::Duration;

use orchestration::{classify, ErrorKind, GeminiClient, GenerateRequest, GenerativeClient, Language};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve one request with `status` and `body`; yields the raw request text.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/v1beta", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        String::from_utf8_lossy(&request).into_owned()
    });
    (base_url, handle)
}

#[tokio::test]
async fn success_returns_text_and_sends_key_header() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"candidates":[{"content":{"parts":[{"text":"{\"ok\":true}"}]}}]}"#,
    )
    .await;
    let client = GeminiClient::new("AIzaTestKey", base_url, Duration::from_secs(5)).unwrap();

    let request = GenerateRequest::new("gemini-2.5-flash").text("hello").json();
    let response = client.generate(&request).await.unwrap();
    assert_eq!(response.text().as_deref(), Some("{\"ok\":true}"));

    let seen = server.await.unwrap();
    assert!(seen.starts_with("POST /v1beta/models/gemini-2.5-flash:generateContent"));
    assert!(seen.to_ascii_lowercase().contains("x-goog-api-key: aizatestkey"));
    assert!(seen.contains("\"responseMimeType\":\"application/json\""));
}

#[tokio::test]
async fn error_status_is_kept_on_the_raw_error() {
    let (base_url, server) = serve_once(
        "429 Too Many Requests",
        r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#,
    )
    .await;
    let client = GeminiClient::new("AIzaTestKey", base_url, Duration::from_secs(5)).unwrap();

    let raw = client
        .generate(&GenerateRequest::new("gemini-2.5-flash").text("hello"))
        .await
        .unwrap_err();
    server.await.unwrap();

    assert_eq!(raw.status_code(), Some(429));
    let classified = classify(&raw, Language::En);
    assert_eq!(classified.kind(), ErrorKind::RateLimit);
    assert!(classified.retryable());
}

#[tokio::test]
async fn connection_refused_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = GeminiClient::new("AIzaTestKey", format!("http://{addr}"), Duration::from_secs(5)).unwrap();
    let raw = client
        .generate(&GenerateRequest::new("gemini-2.5-flash").text("hello"))
        .await
        .unwrap_err();
    assert_eq!(classify(&raw, Language::En).kind(), ErrorKind::Network);
}
