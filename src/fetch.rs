//! Remote Fetch
//!
//! One unauthenticated, unencrypted HTTP GET per run, via `ureq`.
//! No retries, no redirects, no timeout: a single blocking attempt whose
//! body is read in fixed-size chunks until end of stream.

use std::io::{ErrorKind, Read};

use thiserror::Error;

/// Size of each body read.
pub const CHUNK_SIZE: usize = 4096;

/// Remote fetch errors. No partial body is ever returned alongside one.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid remote request: {0}")]
    InvalidRequest(String),

    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("{url} answered with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} returned an empty body")]
    EmptyBody(String),
}

/// Build the request URL for `host` and `path`.
///
/// `host` may carry a port (`example.com:8080`). A missing leading slash on
/// `path` is supplied.
pub fn request_url(host: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("http://{}{}", host, path)
    } else {
        format!("http://{}/{}", host, path)
    }
}

fn validate(host: &str) -> Result<(), FetchError> {
    if host.is_empty() {
        return Err(FetchError::InvalidRequest("host is empty".into()));
    }
    if host.contains("://") {
        return Err(FetchError::InvalidRequest(format!(
            "host '{}' must not carry a scheme; only plain HTTP is used",
            host
        )));
    }
    if host.contains('/') {
        return Err(FetchError::InvalidRequest(format!(
            "host '{}' must not contain a path",
            host
        )));
    }
    Ok(())
}

/// Fetch `path` from `host` and return the whole response body.
pub fn fetch(host: &str, path: &str) -> Result<Vec<u8>, FetchError> {
    validate(host)?;
    let url = request_url(host, path);

    let agent = ureq::AgentBuilder::new().redirects(0).build();
    let response = match agent.get(&url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(status, _)) => {
            return Err(FetchError::Status { url, status });
        }
        Err(transport) => {
            return Err(FetchError::Connect {
                url,
                reason: transport.to_string(),
            });
        }
    };

    let status = response.status();
    if !(200..300).contains(&status) {
        return Err(FetchError::Status { url, status });
    }

    let body = read_body(response.into_reader()).map_err(|source| FetchError::Body {
        url: url.clone(),
        source,
    })?;
    if body.is_empty() {
        return Err(FetchError::EmptyBody(url));
    }

    tracing::info!(url = %url, bytes = body.len(), "fetched remote IR");
    Ok(body)
}

fn read_body(mut reader: impl Read) -> std::io::Result<Vec<u8>> {
    let mut body = Vec::new();
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(body),
            Ok(n) => body.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one canned HTTP response on a loopback port; returns the
    /// `host:port` and a handle yielding the request line it saw.
    fn serve_once(response: Vec<u8>) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let host = listener.local_addr().unwrap().to_string();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            let mut stream = stream;
            stream.write_all(&response).unwrap();
            stream.flush().unwrap();
            request_line
        });
        (host, handle)
    }

    fn http_response(status: &str, body: &[u8]) -> Vec<u8> {
        let mut response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(body);
        response
    }

    #[test]
    fn test_request_url() {
        assert_eq!(request_url("example.com", "/a.ll"), "http://example.com/a.ll");
        assert_eq!(request_url("example.com:8080", "a.ll"), "http://example.com:8080/a.ll");
    }

    #[test]
    fn test_fetch_body_across_chunks() {
        let body: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let (host, server) = serve_once(http_response("200 OK", &body));

        let fetched = fetch(&host, "/payload.ll").unwrap();
        assert_eq!(fetched, body);
        assert_eq!(server.join().unwrap(), "GET /payload.ll HTTP/1.1\r\n");
    }

    #[test]
    fn test_fetch_error_status() {
        let (host, server) = serve_once(http_response("404 Not Found", b"missing"));
        match fetch(&host, "/gone.ll") {
            Err(FetchError::Status { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected Status error, got {:?}", other),
        }
        server.join().unwrap();
    }

    #[test]
    fn test_redirect_not_followed() {
        let response = b"HTTP/1.1 302 Found\r\nLocation: /elsewhere.ll\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec();
        let (host, server) = serve_once(response);
        match fetch(&host, "/moved.ll") {
            Err(FetchError::Status { status, .. }) => assert_eq!(status, 302),
            other => panic!("Expected Status error, got {:?}", other),
        }
        server.join().unwrap();
    }

    #[test]
    fn test_empty_body_rejected() {
        let (host, server) = serve_once(http_response("200 OK", b""));
        assert!(matches!(fetch(&host, "/"), Err(FetchError::EmptyBody(_))));
        server.join().unwrap();
    }

    #[test]
    fn test_truncated_body_rejected() {
        let response = b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nabc".to_vec();
        let (host, server) = serve_once(response);
        assert!(matches!(
            fetch(&host, "/short.ll"),
            Err(FetchError::Body { .. })
        ));
        server.join().unwrap();
    }

    #[test]
    fn test_unreachable_host() {
        // Bind then drop to find a port nobody listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let host = format!("127.0.0.1:{}", port);
        assert!(matches!(
            fetch(&host, "/main.ll"),
            Err(FetchError::Connect { .. })
        ));
    }

    #[test]
    fn test_invalid_hosts() {
        assert!(matches!(fetch("", "/x"), Err(FetchError::InvalidRequest(_))));
        assert!(matches!(
            fetch("https://example.com", "/x"),
            Err(FetchError::InvalidRequest(_))
        ));
        assert!(matches!(
            fetch("example.com/x", "/y"),
            Err(FetchError::InvalidRequest(_))
        ));
    }
}
