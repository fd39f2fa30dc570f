//! One-shot HTTP responder for link title tests.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Serve a single response on 127.0.0.1 and return the URL to fetch.
#[allow(dead_code)]
pub async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: &'static str,
) -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.is_empty() {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = write_half.write_all(response.as_bytes()).await;
        let _ = write_half.shutdown().await;
    });
    Ok(format!("http://{addr}/page"))
}
