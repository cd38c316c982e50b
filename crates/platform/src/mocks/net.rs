//! Scripted network: a WiFi link and an HTTP server behind a connector.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::net::{Connector, WifiLink, WifiNetwork};

/// A request the mock server received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Host the connection was opened to.
    pub host: String,
    /// `GET` / `POST`.
    pub method: String,
    /// Request target.
    pub path: String,
    /// Header `(name, value)` pairs in order.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// First header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as UTF-8.
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Build a raw HTTP/1.1 response with a `Content-Length` header.
pub fn http_response(status: u16, headers: &[(&str, &str)], body: &str) -> Vec<u8> {
    let reason = match status {
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        404 => "Not Found",
        _ => "Status",
    };
    let mut out = format!("HTTP/1.1 {status} {reason}\r\n");
    for (name, value) in headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!("Content-Length: {}\r\n\r\n{body}", body.len()));
    out.into_bytes()
}

type Handler = Box<dyn FnMut(&RecordedRequest) -> Vec<u8>>;

struct NetState {
    handler: Handler,
    requests: Vec<RecordedRequest>,
    connects: Vec<(String, u16, bool)>,
    refuse: Vec<String>,
    read_chunk: usize,
    stall: bool,
}

/// Connector whose connections are answered by a handler closure.
#[derive(Clone)]
pub struct MockConnector {
    state: Rc<RefCell<NetState>>,
}

impl MockConnector {
    /// Server answering every request with `handler`.
    pub fn new(handler: impl FnMut(&RecordedRequest) -> Vec<u8> + 'static) -> Self {
        Self {
            state: Rc::new(RefCell::new(NetState {
                handler: Box::new(handler),
                requests: Vec::new(),
                connects: Vec::new(),
                refuse: Vec::new(),
                read_chunk: 64,
                stall: false,
            })),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.borrow().requests.clone()
    }

    /// `(host, port, tls)` of every connection opened.
    pub fn connects(&self) -> Vec<(String, u16, bool)> {
        self.state.borrow().connects.clone()
    }

    /// Refuse connections to `host`.
    pub fn refuse(&self, host: &str) {
        self.state.borrow_mut().refuse.push(host.to_string());
    }

    /// Maximum bytes returned per `read`.
    pub fn set_read_chunk(&self, n: usize) {
        self.state.borrow_mut().read_chunk = n.max(1);
    }

    /// Once the response is drained, block forever instead of reporting EOF.
    pub fn stall_after_response(&self, stall: bool) {
        self.state.borrow_mut().stall = stall;
    }
}

/// Error opening a mock connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refused(pub String);

impl Connector for MockConnector {
    type Connection = MockConnection;
    type Error = Refused;

    async fn connect(&mut self, host: &str, port: u16, tls: bool) -> Result<MockConnection, Refused> {
        let mut s = self.state.borrow_mut();
        s.connects.push((host.to_string(), port, tls));
        if s.refuse.iter().any(|h| h == host) {
            return Err(Refused(host.to_string()));
        }
        Ok(MockConnection {
            state: self.state.clone(),
            host: host.to_string(),
            inbuf: Vec::new(),
            out: VecDeque::new(),
        })
    }
}

/// One open connection to the mock server.
pub struct MockConnection {
    state: Rc<RefCell<NetState>>,
    host: String,
    inbuf: Vec<u8>,
    out: VecDeque<u8>,
}

impl MockConnection {
    fn try_complete_request(&mut self) {
        let Some(head_end) = find(&self.inbuf, b"\r\n\r\n") else {
            return;
        };
        let head = String::from_utf8_lossy(&self.inbuf[..head_end]).into_owned();
        let mut lines = head.split("\r\n");
        let mut request_line = lines.next().unwrap_or("").split(' ');
        let method = request_line.next().unwrap_or("").to_string();
        let path = request_line.next().unwrap_or("").to_string();
        let headers: Vec<(String, String)> = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
            .collect();
        let body_len = headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);
        let total = head_end + 4 + body_len;
        if self.inbuf.len() < total {
            return;
        }
        let body = self.inbuf[head_end + 4..total].to_vec();
        self.inbuf.drain(..total);
        let request = RecordedRequest {
            host: self.host.clone(),
            method,
            path,
            headers,
            body,
        };
        let response = {
            let mut s = self.state.borrow_mut();
            s.requests.push(request.clone());
            (s.handler)(&request)
        };
        self.out.extend(response);
    }
}

fn find(hay: &[u8], needle: &[u8]) -> Option<usize> {
    hay.windows(needle.len()).position(|w| w == needle)
}

impl embedded_io_async::ErrorType for MockConnection {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io_async::Read for MockConnection {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.out.is_empty() {
            if self.state.borrow().stall {
                core::future::pending::<()>().await;
            }
            return Ok(0);
        }
        let chunk = self.state.borrow().read_chunk;
        let n = buf.len().min(chunk).min(self.out.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.out.pop_front().unwrap_or(0);
        }
        Ok(n)
    }
}

impl embedded_io_async::Write for MockConnection {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.inbuf.extend_from_slice(buf);
        self.try_complete_request();
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct WifiState {
    credentials: Option<(String, String)>,
    connected: bool,
    attempts: Vec<(String, String, u32)>,
    networks: Vec<WifiNetwork>,
}

/// WiFi link that accepts one SSID/password pair.
#[derive(Debug, Clone, Default)]
pub struct MockWifi {
    state: Rc<RefCell<WifiState>>,
}

impl MockWifi {
    /// Link that accepts `ssid` / `password`.
    pub fn accepting(ssid: &str, password: &str) -> Self {
        let wifi = Self::default();
        wifi.state.borrow_mut().credentials = Some((ssid.to_string(), password.to_string()));
        wifi
    }

    /// Networks returned by `scan`.
    pub fn set_networks(&self, networks: Vec<WifiNetwork>) {
        self.state.borrow_mut().networks = networks;
    }

    /// `(ssid, password, timeout)` of every connect attempt.
    pub fn attempts(&self) -> Vec<(String, String, u32)> {
        self.state.borrow().attempts.clone()
    }
}

/// Association failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthFailed;

impl WifiLink for MockWifi {
    type Error = AuthFailed;

    async fn connect(&mut self, ssid: &str, password: &str, timeout_ms: u32) -> Result<(), AuthFailed> {
        let mut s = self.state.borrow_mut();
        s.attempts.push((ssid.to_string(), password.to_string(), timeout_ms));
        let ok = s
            .credentials
            .as_ref()
            .is_some_and(|(u, p)| u == ssid && p == password);
        s.connected = ok;
        if ok {
            Ok(())
        } else {
            Err(AuthFailed)
        }
    }

    fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    fn disconnect(&mut self) {
        self.state.borrow_mut().connected = false;
    }

    async fn scan(&mut self, out: &mut heapless::Vec<WifiNetwork, 16>) -> Result<(), AuthFailed> {
        out.clear();
        for n in self.state.borrow().networks.iter().take(16) {
            let _ = out.push(n.clone());
        }
        Ok(())
    }
}
