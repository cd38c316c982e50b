//! HTTP/1.1 wire codec: request writer, buffered reader with an idle
//! timeout, response head parser and body framing.

use core::fmt::Write as _;

use embassy_futures::select::{select, Either};
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{Read, Write};
use heapless::String;
use platform::Clock;

use crate::cookie::CookieJar;
use crate::url::{Url, UrlBuf};
use crate::FetchError;

/// Idle timeout for each read.
pub const IDLE_TIMEOUT_MS: u32 = 5_000;

/// Minimum spacing of progress reports.
pub const PROGRESS_INTERVAL_MS: u64 = 2_000;

/// Longest response header line.
pub const MAX_HEADER_LINE: usize = 1_024;

/// Fixed browser-like user agent; some sites refuse unknown clients.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Mobile Safari/537.36";

const WIRE_BUF: usize = 512;

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Method {
    /// `GET`
    Get,
    /// `POST` with a form body.
    Post,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// One request.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Method.
    pub method: Method,
    /// Target.
    pub url: &'a Url,
    /// Form body (POST only).
    pub body: &'a [u8],
    /// Page that presented the form (POST only).
    pub referer: Option<&'a Url>,
}

type HeaderLine = String<MAX_HEADER_LINE>;

async fn put<W: Write>(w: &mut W, bytes: &[u8]) -> Result<(), FetchError> {
    w.write_all(bytes).await.map_err(|e| {
        tracing::warn!("web: write failed: {:?}", e);
        FetchError::SendFailed
    })
}

/// Write the request line, headers (cookies from `jar`) and body.
pub async fn write_request<W: Write>(w: &mut W, req: &Request<'_>, jar: &CookieJar) -> Result<(), FetchError> {
    let url = req.url;
    let authority = url.origin().split_once("://").map_or(url.host(), |(_, a)| a);
    let mut line = HeaderLine::new();
    write!(
        line,
        "{} {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: {}\r\n",
        req.method.as_str(),
        url.target(),
        authority,
        USER_AGENT
    )
    .map_err(|_| FetchError::BadUrl)?;
    put(w, line.as_bytes()).await?;
    put(
        w,
        b"Accept: text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8\r\n\
Accept-Language: en-US,en;q=0.9\r\n\
Accept-Encoding: identity\r\n\
Connection: keep-alive\r\n\
Upgrade-Insecure-Requests: 1\r\n\
Cache-Control: max-age=0\r\n",
    )
    .await?;

    let mut first = true;
    for c in jar.matching(url.host()) {
        put(w, if first { b"Cookie: " } else { b"; " }).await?;
        put(w, c.name.as_bytes()).await?;
        put(w, b"=").await?;
        put(w, c.value.as_bytes()).await?;
        first = false;
    }
    if !first {
        put(w, b"\r\n").await?;
    }

    if req.method == Method::Post {
        line.clear();
        write!(
            line,
            "Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n",
            req.body.len()
        )
        .map_err(|_| FetchError::BadUrl)?;
        if let Some(referer) = req.referer {
            let site = if referer.origin() == url.origin() {
                "same-origin"
            } else {
                "cross-site"
            };
            write!(
                line,
                "Referer: {}\r\nOrigin: {}\r\nSec-Fetch-Dest: document\r\nSec-Fetch-Mode: navigate\r\nSec-Fetch-Site: {}\r\nSec-Fetch-User: ?1\r\n",
                referer.as_str(),
                referer.origin(),
                site
            )
            .map_err(|_| FetchError::BadUrl)?;
        }
        put(w, line.as_bytes()).await?;
    }
    put(w, b"\r\n").await?;
    if req.method == Method::Post {
        put(w, req.body).await?;
    }
    w.flush().await.map_err(|_| FetchError::SendFailed)
}

/// Buffered reader over a connection with a per-read idle timeout.
pub struct Wire<'c, R, D> {
    conn: &'c mut R,
    delay: &'c mut D,
    buf: [u8; WIRE_BUF],
    start: usize,
    end: usize,
}

impl<'c, R: Read, D: DelayNs> Wire<'c, R, D> {
    /// Reader over `conn`, timing out with `delay`.
    pub fn new(conn: &'c mut R, delay: &'c mut D) -> Self {
        Self {
            conn,
            delay,
            buf: [0; WIRE_BUF],
            start: 0,
            end: 0,
        }
    }

    /// Bytes read from the connection but not consumed yet.
    pub fn buffered(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    async fn read_timed(conn: &mut R, delay: &mut D, dst: &mut [u8]) -> Result<usize, FetchError> {
        match select(conn.read(dst), delay.delay_ms(IDLE_TIMEOUT_MS)).await {
            Either::First(Ok(n)) => Ok(n),
            Either::First(Err(e)) => {
                tracing::warn!("web: read failed: {:?}", e);
                Err(FetchError::Disconnected)
            }
            Either::Second(()) => Err(FetchError::Timeout),
        }
    }

    async fn fill(&mut self) -> Result<usize, FetchError> {
        if self.start == self.end {
            self.start = 0;
            self.end = 0;
        }
        let dst = self.buf.get_mut(self.end..).unwrap_or(&mut []);
        let n = Self::read_timed(self.conn, self.delay, dst).await?;
        self.end = self.end.saturating_add(n);
        Ok(n)
    }

    async fn byte(&mut self) -> Result<Option<u8>, FetchError> {
        if self.start == self.end && self.fill().await? == 0 {
            return Ok(None);
        }
        let b = self.buf.get(self.start).copied();
        self.start = self.start.saturating_add(1);
        Ok(b)
    }

    /// Read one CRLF (or LF) terminated line. `Ok(false)` at EOF before
    /// any byte.
    pub async fn read_line<const N: usize>(&mut self, out: &mut String<N>) -> Result<bool, FetchError> {
        out.clear();
        let mut raw: heapless::Vec<u8, N> = heapless::Vec::new();
        let mut any = false;
        loop {
            match self.byte().await? {
                None if !any => return Ok(false),
                None => return Err(FetchError::Disconnected),
                Some(b'\n') => break,
                Some(b) => {
                    any = true;
                    raw.push(b).map_err(|_| FetchError::Payload)?;
                }
            }
        }
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        let text = core::str::from_utf8(&raw).map_err(|_| FetchError::Payload)?;
        out.push_str(text).map_err(|_| FetchError::Payload)?;
        Ok(true)
    }

    /// Read up to `dst.len()` bytes; 0 means EOF.
    pub async fn read_some(&mut self, dst: &mut [u8]) -> Result<usize, FetchError> {
        if self.start < self.end {
            let avail = self.buf.get(self.start..self.end).unwrap_or(&[]);
            let n = avail.len().min(dst.len());
            if let (Some(d), Some(s)) = (dst.get_mut(..n), avail.get(..n)) {
                d.copy_from_slice(s);
            }
            self.start = self.start.saturating_add(n);
            return Ok(n);
        }
        Self::read_timed(self.conn, self.delay, dst).await
    }
}

/// How the body is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `Content-Length`
    Length(usize),
    /// `Transfer-Encoding: chunked`
    Chunked,
    /// Until the peer closes.
    Close,
}

/// Parsed status line and the headers the fetcher acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// Status code.
    pub status: u16,
    /// Body framing.
    pub framing: Framing,
    /// `Location`, if any.
    pub location: Option<UrlBuf>,
    /// Connection may carry another request.
    pub keep_alive: bool,
}

impl ResponseHead {
    /// 301/302/303/307/308 with a `Location`.
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308) && self.location.is_some()
    }
}

fn parse_status(line: &str) -> Option<(bool, u16)> {
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    let http11 = match version {
        "HTTP/1.1" => true,
        "HTTP/1.0" => false,
        _ => return None,
    };
    let status = parts.next()?.parse().ok()?;
    Some((http11, status))
}

/// Read the status line and headers. Every `Set-Cookie` goes into `jar`
/// under `host`.
pub async fn read_head<R: Read, D: DelayNs>(
    wire: &mut Wire<'_, R, D>,
    host: &str,
    jar: &mut CookieJar,
) -> Result<ResponseHead, FetchError> {
    let mut line = HeaderLine::new();
    loop {
        if !wire.read_line(&mut line).await? {
            return Err(FetchError::Disconnected);
        }
        let (http11, status) = parse_status(&line).ok_or(FetchError::Payload)?;
        let mut head = ResponseHead {
            status,
            framing: Framing::Close,
            location: None,
            keep_alive: http11,
        };
        let mut length = None;
        let mut chunked = false;
        loop {
            if !wire.read_line(&mut line).await? {
                return Err(FetchError::Disconnected);
            }
            if line.is_empty() {
                break;
            }
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let (name, value) = (name.trim(), value.trim());
            if name.eq_ignore_ascii_case("set-cookie") {
                jar.store_header(host, value);
            } else if name.eq_ignore_ascii_case("location") {
                let mut loc = UrlBuf::new();
                if loc.push_str(value).is_ok() {
                    head.location = Some(loc);
                }
            } else if name.eq_ignore_ascii_case("content-length") {
                length = Some(value.parse::<usize>().map_err(|_| FetchError::Payload)?);
            } else if name.eq_ignore_ascii_case("transfer-encoding") {
                chunked = contains_ignore_case(value, "chunked");
            } else if name.eq_ignore_ascii_case("connection") {
                if value.eq_ignore_ascii_case("close") {
                    head.keep_alive = false;
                } else if value.eq_ignore_ascii_case("keep-alive") {
                    head.keep_alive = true;
                }
            }
        }
        // Interim 1xx responses carry no body.
        if (100..200).contains(&status) {
            continue;
        }
        head.framing = if chunked {
            Framing::Chunked
        } else if let Some(n) = length {
            Framing::Length(n)
        } else if status == 204 || status == 304 {
            Framing::Length(0)
        } else {
            head.keep_alive = false;
            Framing::Close
        };
        return Ok(head);
    }
}

fn contains_ignore_case(hay: &str, needle: &str) -> bool {
    hay.as_bytes()
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Bytes received so far, reported to the splash screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Body bytes received.
    pub received: usize,
    /// Expected total, when the server said.
    pub total: Option<usize>,
}

/// Receives body progress while a response is read.
///
/// Any `FnMut(Progress)` is a sink. The device implements it directly to
/// redraw the splash, which needs to await the panel refresh.
pub trait ProgressSink {
    /// Called at most once per [`PROGRESS_INTERVAL_MS`].
    async fn report(&mut self, progress: Progress);
}

impl<F: FnMut(Progress)> ProgressSink for F {
    async fn report(&mut self, progress: Progress) {
        self(progress);
    }
}

struct Throttle<'k, K> {
    clock: &'k K,
    last: Option<u64>,
}

impl<K: Clock> Throttle<'_, K> {
    async fn tick<P: ProgressSink>(&mut self, progress: &mut P, p: Progress) {
        let now = self.clock.now_ms();
        if self.last.map_or(true, |t| now.saturating_sub(t) >= PROGRESS_INTERVAL_MS) {
            self.last = Some(now);
            progress.report(p).await;
        }
    }
}

/// Read the body into `out`; returns its length.
pub async fn read_body<R, D, K, P>(
    wire: &mut Wire<'_, R, D>,
    framing: Framing,
    out: &mut [u8],
    clock: &K,
    progress: &mut P,
) -> Result<usize, FetchError>
where
    R: Read,
    D: DelayNs,
    K: Clock,
    P: ProgressSink,
{
    let mut throttle = Throttle { clock, last: None };
    let mut got = 0usize;
    match framing {
        Framing::Length(n) => {
            if n > out.len() {
                return Err(FetchError::OutOfMemory);
            }
            while got < n {
                let dst = out.get_mut(got..n).unwrap_or(&mut []);
                let r = wire.read_some(dst).await?;
                if r == 0 {
                    return Err(FetchError::Disconnected);
                }
                got = got.saturating_add(r);
                throttle.tick(progress, Progress { received: got, total: Some(n) }).await;
            }
        }
        Framing::Chunked => {
            let mut line: String<64> = String::new();
            loop {
                if !wire.read_line(&mut line).await? {
                    return Err(FetchError::Disconnected);
                }
                let hex = line.split(';').next().unwrap_or("").trim();
                let size = usize::from_str_radix(hex, 16).map_err(|_| FetchError::Payload)?;
                if size == 0 {
                    // Trailer section up to the final empty line.
                    while wire.read_line(&mut line).await? && !line.is_empty() {}
                    break;
                }
                let end = got.checked_add(size).ok_or(FetchError::OutOfMemory)?;
                if end > out.len() {
                    return Err(FetchError::OutOfMemory);
                }
                while got < end {
                    let dst = out.get_mut(got..end).unwrap_or(&mut []);
                    let r = wire.read_some(dst).await?;
                    if r == 0 {
                        return Err(FetchError::Disconnected);
                    }
                    got = got.saturating_add(r);
                    throttle.tick(progress, Progress { received: got, total: None }).await;
                }
                if !wire.read_line(&mut line).await? || !line.is_empty() {
                    return Err(FetchError::Payload);
                }
            }
        }
        Framing::Close => loop {
            let dst = out.get_mut(got..).unwrap_or(&mut []);
            if dst.is_empty() {
                let mut peek = [0u8; 1];
                if wire.read_some(&mut peek).await? == 0 {
                    break;
                }
                return Err(FetchError::OutOfMemory);
            }
            let r = wire.read_some(dst).await?;
            if r == 0 {
                break;
            }
            got = got.saturating_add(r);
            throttle.tick(progress, Progress { received: got, total: None }).await;
        },
    }
    Ok(got)
}
