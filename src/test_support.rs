//! Local HTTP fake for tests that talk to the commits endpoint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A canned-response server bound to an ephemeral port.
pub(crate) struct FakeApi {
    pub base: String,
    hits: Arc<AtomicUsize>,
    request_lines: Arc<Mutex<Vec<String>>>,
}

impl FakeApi {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// First line of every request received so far, e.g. `GET /repos/o/r/commits/jp HTTP/1.1`.
    pub fn request_lines(&self) -> Vec<String> {
        self.request_lines.lock().unwrap().clone()
    }
}

pub(crate) fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

/// Commit body whose author date is `date` (RFC 3339).
pub(crate) fn commit_body(date: &str) -> String {
    format!(r#"{{"sha":"abc","commit":{{"author":{{"date":"{}"}}}}}}"#, date)
}

/// Serve canned responses in order, one per connection. `None` entries
/// accept and never answer.
pub(crate) async fn serve(responses: Vec<Option<String>>) -> FakeApi {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let request_lines = Arc::new(Mutex::new(Vec::new()));
    let counter = Arc::clone(&hits);
    let lines = Arc::clone(&request_lines);

    tokio::spawn(async move {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let text = String::from_utf8_lossy(&request);
            if let Some(line) = text.lines().next() {
                lines.lock().unwrap().push(line.to_string());
            }

            match response {
                Some(response) => {
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                }
                None => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    });

    FakeApi {
        base: format!("http://{}", addr),
        hits,
        request_lines,
    }
}
