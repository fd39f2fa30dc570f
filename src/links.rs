//! Link titles for URLs posted in chat.
//!
//! Fetches run on detached tasks; the connection decides whether the result
//! is still wanted.

use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use ircb_proto::ParsedMessage;
use regex::Regex;
use tracing::{debug, error, warn};

use crate::connection::Connection;

/// Per-request timeout.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// How much of a body is scanned for a title.
pub const SCAN_LIMIT: usize = 512;

static OG_TITLE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    compile(r#"(?is)<meta[^>]+property\s*=\s*["']og:title["'][^>]*content\s*=\s*["']([^"']*)["']"#)
});

static TITLE: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r"(?is)<title[^>]*>([^<]*)"));

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            error!(pattern, error = %e, "title pattern failed to compile");
            None
        }
    }
}

fn first_capture(re: &Option<Regex>, haystack: &str) -> Option<String> {
    re.as_ref()?
        .captures(haystack)?
        .get(1)
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Build the shared HTTP client.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(crate::VERSION)
        .build()
}

/// First `http` URL in `text`, up to the next space.
pub fn extract_url(text: &str) -> Option<&str> {
    let start = text.find("http")?;
    text[start..].split(' ').next().filter(|u| !u.is_empty())
}

/// Reject local targets and anything that does not parse as a URL.
pub fn is_allowed(url: &str) -> bool {
    if url.contains("localhost") || url.contains("::") {
        return false;
    }
    matches!(reqwest::Url::parse(url), Ok(u) if u.scheme() == "http" || u.scheme() == "https")
}

/// Title from the head of an HTML document: `og:title` wins over `<title>`.
/// Nothing after `<body` is considered.
pub fn extract_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let head = match lower.find("<body") {
        Some(i) => &html[..i],
        None => html,
    };

    first_capture(&OG_TITLE, head).or_else(|| first_capture(&TITLE, head))
}

/// Fetch `url` and describe it in one line.
pub async fn describe(client: &reqwest::Client, url: &str) -> Result<String, reqwest::Error> {
    let started = Instant::now();
    let mut resp = client.get(url).send().await?;
    let status = resp.status();

    if status != reqwest::StatusCode::OK {
        return Ok(format!("{status} {:?}", started.elapsed()));
    }

    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let mut body = Vec::with_capacity(SCAN_LIMIT);
    while body.len() < SCAN_LIMIT {
        match resp.chunk().await? {
            Some(chunk) => body.extend_from_slice(&chunk),
            None => break,
        }
    }
    body.truncate(SCAN_LIMIT);
    let elapsed = started.elapsed();

    let html = String::from_utf8_lossy(&body);
    Ok(match extract_title(&html) {
        Some(title) => format!("{status} {elapsed:?} {title:?} ({content_type})"),
        None => format!("{status} {elapsed:?} ({content_type})"),
    })
}

/// Look for a URL in `msg` and reply with its description from a detached task.
pub fn spawn(conn: &Arc<Connection>, msg: &ParsedMessage) {
    let Some(url) = extract_url(&msg.message) else {
        return;
    };
    if !is_allowed(url) {
        debug!(url = %url, "link rejected");
        return;
    }

    let url = url.to_string();
    let conn = Arc::clone(conn);
    let msg = msg.clone();
    tokio::spawn(async move {
        debug!(url = %url, "fetching link");
        let result = describe(conn.http(), &url).await;
        if conn.is_closing() {
            debug!(url = %url, "connection closed, dropping link title");
            return;
        }
        match result {
            Ok(line) => {
                if let Err(e) = conn.reply(&msg, &line).await {
                    warn!(error = %e, "failed to send link title");
                }
            }
            Err(e) => debug!(url = %url, error = %e, "link fetch failed"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// Answer one HTTP request on 127.0.0.1 and return its URL.
    async fn serve_once(status: &'static str, content_type: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
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
            write_half.write_all(response.as_bytes()).await.unwrap();
            let _ = write_half.shutdown().await;
        });
        format!("http://{addr}/page")
    }

    #[tokio::test]
    async fn test_describe_with_title() {
        let body = "<html><head><title>Hi There</title></head><body>x</body></html>".to_string();
        let url = serve_once("200 OK", "text/html", body).await;
        let client = http_client().unwrap();
        let line = describe(&client, &url).await.unwrap();
        assert!(line.starts_with("200 OK "), "{line}");
        assert!(line.ends_with(" \"Hi There\" (text/html)"), "{line}");
    }

    #[tokio::test]
    async fn test_describe_without_title() {
        let url = serve_once("200 OK", "text/plain", "just words".to_string()).await;
        let client = http_client().unwrap();
        let line = describe(&client, &url).await.unwrap();
        assert!(line.starts_with("200 OK "), "{line}");
        assert!(line.ends_with(" (text/plain)"), "{line}");
        assert!(!line.contains('"'), "{line}");
    }

    #[tokio::test]
    async fn test_describe_title_past_scan_limit() {
        let body = format!("{}<title>Too Late</title>", " ".repeat(SCAN_LIMIT));
        let url = serve_once("200 OK", "text/html", body).await;
        let client = http_client().unwrap();
        let line = describe(&client, &url).await.unwrap();
        assert!(line.ends_with(" (text/html)"), "{line}");
        assert!(!line.contains("Too Late"), "{line}");
    }

    #[tokio::test]
    async fn test_describe_non_ok_status() {
        let url = serve_once("404 Not Found", "text/html", "<title>Missing</title>".to_string()).await;
        let client = http_client().unwrap();
        let line = describe(&client, &url).await.unwrap();
        assert!(line.starts_with("404 Not Found "), "{line}");
        assert!(!line.contains("Missing"), "{line}");
        assert!(!line.contains('('), "{line}");
    }

    #[test]
    fn test_title_patterns_compile() {
        assert!(OG_TITLE.is_some());
        assert!(TITLE.is_some());
    }

    #[test]
    fn test_extract_url() {
        assert_eq!(
            extract_url("look at https://example.com/a?b=c please"),
            Some("https://example.com/a?b=c")
        );
        assert_eq!(extract_url("no links here"), None);
    }

    #[test]
    fn test_is_allowed() {
        assert!(is_allowed("https://example.com/"));
        assert!(!is_allowed("http://localhost:8080/"));
        assert!(!is_allowed("http://[::1]/"));
        assert!(!is_allowed("httpfoo"));
        assert!(!is_allowed("http//broken"));
    }

    #[test]
    fn test_extract_title_prefers_og() {
        let html = r#"<html><head><title>Plain</title>
<meta property="og:title" content="Open Graph"></head><body>x</body></html>"#;
        assert_eq!(extract_title(html).as_deref(), Some("Open Graph"));
    }

    #[test]
    fn test_extract_title_plain() {
        let html = "<html><head><TITLE> Hello World </TITLE></head>";
        assert_eq!(extract_title(html).as_deref(), Some("Hello World"));
    }

    #[test]
    fn test_extract_title_stops_at_body() {
        let html = "<html><head></head><body><title>late</title></body>";
        assert_eq!(extract_title(html), None);
    }
}
