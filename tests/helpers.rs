// Shared test helpers: canned-response HTTP servers and a recording
// observer.
//
// The servers are plain TcpListener loops so tests can assert on the raw
// bytes a request put on the wire.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use search_transport::{
    ConnectionConfig, Diagnostic, FailureDetail, RequestInfo, TransportObserver,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// One recorded observer event, with the borrowed request details flattened
/// into owned strings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)] // Constructed here, matched on by individual test files
pub enum Event {
    Success {
        method: String,
        url: String,
        path: String,
        status: u16,
        body: String,
    },
    FailureError {
        method: String,
        url: String,
        message: String,
    },
    FailureStatus {
        status: u16,
        body: String,
    },
    Diagnostic(Diagnostic),
}

/// Observer that records every hook invocation for later assertions.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

#[allow(dead_code)] // Used by other test files
impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn successes(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Success { .. }))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::FailureError { .. } | Event::FailureStatus { .. }))
            .count()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Diagnostic(d) => Some(d),
                _ => None,
            })
            .collect()
    }
}

impl TransportObserver for RecordingObserver {
    fn on_success(&self, request: &RequestInfo<'_>, status: u16, body: &str, _elapsed: Duration) {
        self.events.lock().unwrap().push(Event::Success {
            method: request.method.to_string(),
            url: request.url.to_string(),
            path: request.path.to_string(),
            status,
            body: body.to_string(),
        });
    }

    fn on_failure(
        &self,
        request: &RequestInfo<'_>,
        detail: FailureDetail<'_>,
        _elapsed: Duration,
    ) {
        let event = match detail {
            FailureDetail::Error(cause) => Event::FailureError {
                method: request.method.to_string(),
                url: request.url.to_string(),
                message: cause.to_string(),
            },
            FailureDetail::Status { status, body } => Event::FailureStatus {
                status,
                body: body.to_string(),
            },
        };
        self.events.lock().unwrap().push(event);
    }

    fn on_diagnostic(&self, event: &Diagnostic) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Diagnostic(event.clone()));
    }
}

/// Renders a minimal HTTP/1.1 response with the given status and body.
#[allow(dead_code)]
pub fn http_response(status: u16, reason: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status} {reason}\r\n\
         content-type: application/json\r\n\
         content-length: {}\r\n\
         connection: close\r\n\
         \r\n\
         {body}",
        body.len()
    )
}

/// Reads one full HTTP request (headers plus content-length body) off the
/// socket.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let Ok(n) = socket.read(&mut buf).await else {
            break;
        };
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&raw);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if raw.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).to_string()
}

/// Spawns a server that answers every connection with the given canned
/// response. Returns the bound address and a log of the raw requests
/// received.
#[allow(dead_code)]
pub async fn spawn_canned_server(response: String) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let log = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let response = response.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                log.lock().unwrap().push(request);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    (addr, requests)
}

/// Spawns a server that accepts connections and never answers, for timeout
/// and cancellation tests.
#[allow(dead_code)]
pub async fn spawn_stalling_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                // Hold the socket open without answering.
                tokio::time::sleep(Duration::from_secs(60)).await;
                drop(socket);
            });
        }
    });
    addr
}

/// Routes `LogObserver` output through the test harness when `RUST_LOG` is
/// set. Safe to call from every test; only the first call installs the
/// logger.
#[allow(dead_code)]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Plain-http config pointed at a local test server.
#[allow(dead_code)]
pub fn config_for(addr: SocketAddr) -> ConnectionConfig {
    ConnectionConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        ..Default::default()
    }
}
