use secrecy::ExposeSecret;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use onshape_client::auth::{ApiKeyCredentials, OAuthAuthProvider, OAuthCredentials, QueryParams};
use onshape_client::rest::OnshapeClient;
use onshape_client::OnshapeError;

/// Read one full HTTP/1.1 request (headers plus `Content-Length` body).
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= end + 4 + content_length {
            return;
        }
    }
}

/// Serve responses whose body is cut off before `Content-Length` is reached.
async fn truncated_body_server(status_line: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{{\"message\":"
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_unreadable_error_body_is_transport_error() {
    let base_url = truncated_body_server("500 Internal Server Error").await;

    let client = OnshapeClient::builder()
        .base_url(base_url)
        .credentials(
            ApiKeyCredentials::new(
                "AbCdEfGhIjKlMnOpQrStUvWx",
                "S3cr3tK3yForOnshapeSigningTestsOnly0123456789abc",
            )
            .into(),
        )
        .build()
        .unwrap();
    let err = client
        .get_json::<serde_json::Value>("/api/documents", &QueryParams::new())
        .await
        .unwrap_err();

    assert!(err.is_transport(), "expected transport error, got {err:?}");
    assert!(!matches!(err, OnshapeError::Api { .. }));
}

#[tokio::test]
async fn test_unreadable_token_response_fails_refresh() {
    let base_url = truncated_body_server("200 OK").await;

    let provider = OAuthAuthProvider::new(
        OAuthCredentials::new("old-token")
            .with_refresh_token("refresh-1")
            .with_client("client-id", "client-secret"),
    )
    .unwrap()
    .with_token_url(format!("{base_url}/oauth/token"));

    match provider.refresh().await.unwrap_err() {
        OnshapeError::Authentication { status, message, .. } => {
            assert_eq!(status, Some(200));
            assert!(message.starts_with("Failed to read token response"), "{message}");
        }
        other => panic!("expected authentication error, got {other:?}"),
    }
    assert_eq!(provider.store().generation(), 0);
    assert_eq!(provider.store().access_token().expose_secret(), "old-token");
}
