//! Page fetcher: manual redirect loop with per-hop cookie capture,
//! keep-alive connection reuse and form submission with a CSRF retry.

use core::fmt::Write as _;

use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{Read, Write};
use platform::{Clock, Connector};

use crate::cookie::CookieJar;
use crate::extract::{Document, HtmlExtractor};
use crate::form::{Form, FormMethod};
use crate::http::{read_body, read_head, write_request, Method, ProgressSink, Request, ResponseHead, Wire};
use crate::url::{Url, UrlBuf};
use crate::FetchError;

/// Redirects followed before giving up.
pub const MAX_REDIRECTS: u8 = 5;

/// Decides from the landed URL whether a form POST was bounced for a
/// stale anti-forgery token.
pub type AuthErrorCheck = fn(&str) -> bool;

/// `auth_error` or `session_expired` in the path or query.
pub fn default_auth_error(url: &str) -> bool {
    let target = match url.split_once("://") {
        Some((_, rest)) => rest.find(['/', '?']).and_then(|i| rest.get(i..)).unwrap_or(""),
        None => url,
    };
    target.contains("auth_error") || target.contains("session_expired")
}

/// A fetched page; its body (or extracted text) sits in the caller's buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// URL after redirects.
    pub url: Url,
    /// Final status.
    pub status: u16,
    /// Body length.
    pub len: usize,
}

struct Open<T> {
    endpoint: Url,
    conn: T,
    reusable: bool,
}

/// HTTP(S) client for the web reader.
pub struct Fetcher<C: Connector, D, K> {
    connector: C,
    delay: D,
    clock: K,
    jar: CookieJar,
    open: Option<Open<C::Connection>>,
    auth_error: AuthErrorCheck,
}

async fn transact<T, D, K, P>(
    conn: &mut T,
    delay: &mut D,
    clock: &K,
    jar: &mut CookieJar,
    req: &Request<'_>,
    out: &mut [u8],
    progress: &mut P,
) -> Result<(ResponseHead, usize, bool), FetchError>
where
    T: Read + Write,
    D: DelayNs,
    K: Clock,
    P: ProgressSink,
{
    write_request(conn, req, jar).await?;
    let mut wire = Wire::new(conn, delay);
    let head = read_head(&mut wire, req.url.host(), jar).await?;
    let len = read_body(&mut wire, head.framing, out, clock, progress).await?;
    let clean = wire.buffered() == 0;
    Ok((head, len, clean))
}

impl<C, D, K> Fetcher<C, D, K>
where
    C: Connector,
    D: DelayNs,
    K: Clock,
{
    /// Client with an empty cookie jar and the default auth-error check.
    pub fn new(connector: C, delay: D, clock: K) -> Self {
        Self {
            connector,
            delay,
            clock,
            jar: CookieJar::new(),
            open: None,
            auth_error: default_auth_error,
        }
    }

    /// Replace the check that triggers the CSRF retry.
    pub fn with_auth_error_check(mut self, check: AuthErrorCheck) -> Self {
        self.auth_error = check;
        self
    }

    /// Session cookies.
    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    /// Session cookies, mutable.
    pub fn jar_mut(&mut self) -> &mut CookieJar {
        &mut self.jar
    }

    /// Drop any kept-alive connection.
    pub fn disconnect(&mut self) {
        if self.open.take().is_some() {
            tracing::debug!("web: closed kept-alive connection");
        }
    }

    /// `GET url`, following redirects. The body lands in `out`.
    pub async fn get<P: ProgressSink>(
        &mut self,
        url: &Url,
        out: &mut [u8],
        progress: &mut P,
    ) -> Result<Page, FetchError> {
        self.navigate(Method::Get, url, &[], None, out, progress).await
    }

    /// `POST` a urlencoded `body` presented by the page at `referer`.
    pub async fn post<P: ProgressSink>(
        &mut self,
        url: &Url,
        body: &[u8],
        referer: &Url,
        out: &mut [u8],
        progress: &mut P,
    ) -> Result<Page, FetchError> {
        self.navigate(Method::Post, url, body, Some(referer), out, progress).await
    }

    /// Fetch `url` and extract it; `out[..doc.text_len]` holds the text.
    pub async fn load<E, P>(
        &mut self,
        url: &Url,
        extractor: &mut E,
        doc: &mut Document,
        out: &mut [u8],
        progress: &mut P,
    ) -> Result<Page, FetchError>
    where
        E: HtmlExtractor,
        P: ProgressSink,
    {
        let page = self.get(url, out, progress).await?;
        extractor.extract(out, page.len, doc);
        Ok(page)
    }

    /// Submit `form` from the page at `page_url` and extract the result.
    ///
    /// If a POST lands on a URL the auth-error check flags, the form page
    /// is fetched again (now carrying the session cookie the failed POST
    /// set), the user's values are copied onto its fresh form, and that
    /// form is posted once more.
    pub async fn submit<E, P>(
        &mut self,
        form: &Form,
        page_url: &Url,
        extractor: &mut E,
        doc: &mut Document,
        out: &mut [u8],
        progress: &mut P,
    ) -> Result<Page, FetchError>
    where
        E: HtmlExtractor,
        P: ProgressSink,
    {
        let action = page_url.resolve(&form.action)?;
        if form.method == FormMethod::Get {
            let target = with_query(&action, form)?;
            return self.load(&target, extractor, doc, out, progress).await;
        }

        let body = form.encode()?;
        let page = self.post(&action, body.as_bytes(), page_url, out, progress).await?;
        if !(self.auth_error)(page.url.as_str()) {
            extractor.extract(out, page.len, doc);
            return Ok(page);
        }

        tracing::info!("web: form post landed on {}, retrying with a fresh token", page.url);
        let fresh_page = self.load(page_url, extractor, doc, out, progress).await?;
        let fresh = doc
            .forms
            .iter()
            .find(|f| f.method == FormMethod::Post && f.action == form.action)
            .or_else(|| {
                doc.forms
                    .iter()
                    .find(|f| f.method == FormMethod::Post && f.has_password() == form.has_password())
            })
            .cloned();
        let Some(mut fresh) = fresh else {
            tracing::warn!("web: no form on {} to retry with", fresh_page.url);
            return Ok(fresh_page);
        };
        fresh.carry_user_values(form);
        let body = fresh.encode()?;
        let action = fresh_page.url.resolve(&fresh.action)?;
        let page = self
            .post(&action, body.as_bytes(), &fresh_page.url, out, progress)
            .await?;
        extractor.extract(out, page.len, doc);
        Ok(page)
    }

    async fn navigate<P: ProgressSink>(
        &mut self,
        method: Method,
        url: &Url,
        body: &[u8],
        referer: Option<&Url>,
        out: &mut [u8],
        progress: &mut P,
    ) -> Result<Page, FetchError> {
        let mut method = method;
        let mut body = body;
        let mut url = url.clone();
        let mut hops = 0u8;
        loop {
            let req = Request {
                method,
                url: &url,
                body,
                referer,
            };
            let (head, len) = self.exchange(&req, out, progress).await?;
            if head.is_redirect() {
                if hops >= MAX_REDIRECTS {
                    tracing::warn!("web: gave up after {} redirects at {}", hops, url);
                    return Err(FetchError::TooManyRedirects);
                }
                hops = hops.saturating_add(1);
                let next = url.resolve(head.location.as_deref().unwrap_or(""))?;
                tracing::info!("web: {} {} -> {}", head.status, url, next);
                if matches!(head.status, 302 | 303) && method == Method::Post {
                    method = Method::Get;
                    body = &[];
                }
                url = next;
                continue;
            }
            if head.status >= 400 {
                tracing::warn!("web: {} answered {}", url, head.status);
                return Err(FetchError::Status(head.status));
            }
            return Ok(Page {
                url,
                status: head.status,
                len,
            });
        }
    }

    async fn exchange<P: ProgressSink>(
        &mut self,
        req: &Request<'_>,
        out: &mut [u8],
        progress: &mut P,
    ) -> Result<(ResponseHead, usize), FetchError> {
        let reused = self
            .open
            .as_ref()
            .is_some_and(|o| o.reusable && o.endpoint.same_endpoint(req.url));
        if reused {
            match self.exchange_open(req, out, progress).await {
                Err(FetchError::SendFailed | FetchError::Disconnected) if req.method == Method::Get => {
                    tracing::debug!("web: kept-alive connection to {} went stale", req.url.host());
                }
                other => return other,
            }
        }
        self.connect(req.url).await?;
        self.exchange_open(req, out, progress).await
    }

    async fn connect(&mut self, url: &Url) -> Result<(), FetchError> {
        self.open = None;
        tracing::info!(
            "web: connecting to {}:{}{}",
            url.host(),
            url.port(),
            if url.is_tls() { " (tls)" } else { "" }
        );
        let conn = self
            .connector
            .connect(url.host(), url.port(), url.is_tls())
            .await
            .map_err(|e| {
                tracing::warn!("web: connect to {} failed: {:?}", url.host(), e);
                FetchError::ConnectionRefused
            })?;
        self.open = Some(Open {
            endpoint: url.clone(),
            conn,
            reusable: false,
        });
        Ok(())
    }

    async fn exchange_open<P: ProgressSink>(
        &mut self,
        req: &Request<'_>,
        out: &mut [u8],
        progress: &mut P,
    ) -> Result<(ResponseHead, usize), FetchError> {
        let Some(open) = self.open.as_mut() else {
            return Err(FetchError::Disconnected);
        };
        match transact(&mut open.conn, &mut self.delay, &self.clock, &mut self.jar, req, out, progress).await {
            Ok((head, len, clean)) => {
                open.reusable = head.keep_alive && clean;
                Ok((head, len))
            }
            Err(e) => {
                self.open = None;
                Err(e)
            }
        }
    }
}

fn with_query(action: &Url, form: &Form) -> Result<Url, FetchError> {
    let base = action.as_str().split('?').next().unwrap_or("");
    let mut text = UrlBuf::new();
    write!(text, "{}?{}", base, form.encode()?.as_str()).map_err(|_| FetchError::BadUrl)?;
    Url::parse(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_auth_error_looks_past_the_host() {
        assert!(default_auth_error("https://site.org/login?auth_error=1"));
        assert!(default_auth_error("https://site.org/session_expired"));
        assert!(!default_auth_error("https://auth_error.site.org/home"));
        assert!(!default_auth_error("https://site.org/"));
    }

    #[test]
    fn test_get_form_builds_query() {
        let mut form = Form::default();
        form.push("q", "rust lang", crate::form::FieldKind::Text);
        let action = Url::parse("https://search.org/find?old=1").unwrap();
        let url = with_query(&action, &form).unwrap();
        assert_eq!(url.as_str(), "https://search.org/find?q=rust+lang");
    }
}
