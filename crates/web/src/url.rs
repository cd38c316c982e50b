//! Absolute `http`/`https` URLs and reference resolution.

use core::fmt::Write as _;

use heapless::String;

use crate::FetchError;

/// Longest URL kept.
pub const MAX_URL: usize = 256;

/// Longest host name.
pub const MAX_HOST: usize = 64;

/// URL text buffer.
pub type UrlBuf = String<MAX_URL>;

/// Parsed absolute URL without fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    full: UrlBuf,
    tls: bool,
    host: String<MAX_HOST>,
    port: u16,
    /// Offset of the path within `full`.
    path_at: usize,
}

fn default_port(tls: bool) -> u16 {
    if tls {
        443
    } else {
        80
    }
}

impl Url {
    /// Parse user input or an absolute reference. Input without a scheme
    /// is taken as `https://`.
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        let input = input.trim();
        let input = input.split('#').next().unwrap_or("");
        let (tls, rest) = match input.find("://") {
            Some(i) => {
                let scheme = input.get(..i).ok_or(FetchError::BadUrl)?;
                let tls = if scheme.eq_ignore_ascii_case("https") {
                    true
                } else if scheme.eq_ignore_ascii_case("http") {
                    false
                } else {
                    return Err(FetchError::BadUrl);
                };
                (tls, input.get(i.saturating_add(3)..).unwrap_or(""))
            }
            None => (true, input),
        };
        let split = rest.find(['/', '?']).unwrap_or(rest.len());
        let authority = rest.get(..split).unwrap_or("");
        let path = rest.get(split..).unwrap_or("");
        let authority = authority.rsplit('@').next().unwrap_or(authority);
        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => (h, p.parse::<u16>().map_err(|_| FetchError::BadUrl)?),
            None => (authority, default_port(tls)),
        };
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(FetchError::BadUrl);
        }
        let mut lower: String<MAX_HOST> = String::new();
        for c in host.chars() {
            lower.push(c.to_ascii_lowercase()).map_err(|_| FetchError::BadUrl)?;
        }
        Self::build(tls, &lower, port, path)
    }

    fn build(tls: bool, host: &str, port: u16, path: &str) -> Result<Self, FetchError> {
        let mut full = UrlBuf::new();
        let scheme = if tls { "https" } else { "http" };
        write!(full, "{scheme}://{host}").map_err(|_| FetchError::BadUrl)?;
        if port != default_port(tls) {
            write!(full, ":{port}").map_err(|_| FetchError::BadUrl)?;
        }
        let path_at = full.len();
        if !path.starts_with('/') {
            full.push('/').map_err(|_| FetchError::BadUrl)?;
        }
        full.push_str(path).map_err(|_| FetchError::BadUrl)?;
        let mut h = String::new();
        h.push_str(host).map_err(|_| FetchError::BadUrl)?;
        Ok(Self {
            full,
            tls,
            host: h,
            port,
            path_at,
        })
    }

    /// Full text.
    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// `true` for `https`.
    pub fn is_tls(&self) -> bool {
        self.tls
    }

    /// Lower-case host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port (explicit or default).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Request target: path plus query.
    pub fn target(&self) -> &str {
        self.full.get(self.path_at..).unwrap_or("/")
    }

    /// Path without the query.
    pub fn path(&self) -> &str {
        let t = self.target();
        t.split('?').next().unwrap_or(t)
    }

    /// Query without the `?`.
    pub fn query(&self) -> Option<&str> {
        self.target().split_once('?').map(|(_, q)| q)
    }

    /// `scheme://host[:port]`.
    pub fn origin(&self) -> &str {
        self.full.get(..self.path_at).unwrap_or("")
    }

    /// `true` if a connection to `other` can reuse one to `self`.
    pub fn same_endpoint(&self, other: &Url) -> bool {
        self.tls == other.tls && self.port == other.port && self.host == other.host
    }

    /// Resolve a reference (`Location` header, link, form action).
    pub fn resolve(&self, reference: &str) -> Result<Self, FetchError> {
        let r = reference.trim();
        if r.is_empty() || r.starts_with('#') {
            return Ok(self.clone());
        }
        let scheme_end = r.find("://");
        let first_sep = r.find(['/', '?']);
        if let Some(i) = scheme_end {
            if first_sep.map_or(true, |s| i < s) {
                return Self::parse(r);
            }
        }
        if let Some(rest) = r.strip_prefix("//") {
            let mut abs = UrlBuf::new();
            let scheme = if self.tls { "https://" } else { "http://" };
            write!(abs, "{scheme}{rest}").map_err(|_| FetchError::BadUrl)?;
            return Self::parse(&abs);
        }
        let r = r.split('#').next().unwrap_or(r);
        let mut path = UrlBuf::new();
        if r.starts_with('/') {
            path.push_str(r).map_err(|_| FetchError::BadUrl)?;
        } else if r.starts_with('?') {
            write!(path, "{}{}", self.path(), r).map_err(|_| FetchError::BadUrl)?;
        } else {
            let base = self.path();
            let dir = base.get(..base.rfind('/').map_or(0, |i| i.saturating_add(1))).unwrap_or("/");
            write!(path, "{dir}{r}").map_err(|_| FetchError::BadUrl)?;
        }
        let path = remove_dot_segments(&path)?;
        Self::build(self.tls, &self.host, self.port, &path)
    }
}

impl core::fmt::Display for Url {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.full)
    }
}

/// Collapse `.` and `..` path segments; the query is left alone.
fn remove_dot_segments(target: &str) -> Result<UrlBuf, FetchError> {
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (target, None),
    };
    let mut stack: heapless::Vec<&str, 32> = heapless::Vec::new();
    let trailing = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            s => stack.push(s).map_err(|_| FetchError::BadUrl)?,
        }
    }
    let mut out = UrlBuf::new();
    for seg in &stack {
        write!(out, "/{seg}").map_err(|_| FetchError::BadUrl)?;
    }
    if out.is_empty() || (trailing && !out.ends_with('/')) {
        out.push('/').map_err(|_| FetchError::BadUrl)?;
    }
    if let Some(q) = query {
        write!(out, "?{q}").map_err(|_| FetchError::BadUrl)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_to_https() {
        let u = Url::parse("Example.com").unwrap();
        assert_eq!(u.as_str(), "https://example.com/");
        assert!(u.is_tls());
        assert_eq!(u.port(), 443);
        assert_eq!(u.target(), "/");
    }

    #[test]
    fn test_parse_port_path_query_fragment() {
        let u = Url::parse("http://host:8080/a/b?x=1#frag").unwrap();
        assert_eq!(u.as_str(), "http://host:8080/a/b?x=1");
        assert_eq!(u.host(), "host");
        assert_eq!(u.port(), 8080);
        assert_eq!(u.path(), "/a/b");
        assert_eq!(u.query(), Some("x=1"));
        assert_eq!(u.origin(), "http://host:8080");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert_eq!(Url::parse("ftp://x/"), Err(FetchError::BadUrl));
        assert_eq!(Url::parse("http://"), Err(FetchError::BadUrl));
        assert_eq!(Url::parse("http://h:99999/"), Err(FetchError::BadUrl));
    }

    #[test]
    fn test_resolve_forms() {
        let base = Url::parse("https://site.org/docs/guide/page.html?q=1").unwrap();
        assert_eq!(base.resolve("/login").unwrap().as_str(), "https://site.org/login");
        assert_eq!(base.resolve("next.html").unwrap().as_str(), "https://site.org/docs/guide/next.html");
        assert_eq!(base.resolve("../up").unwrap().as_str(), "https://site.org/docs/up");
        assert_eq!(base.resolve("?page=2").unwrap().as_str(), "https://site.org/docs/guide/page.html?page=2");
        assert_eq!(base.resolve("//cdn.net/x").unwrap().as_str(), "https://cdn.net/x");
        assert_eq!(base.resolve("http://other/").unwrap().as_str(), "http://other/");
        assert_eq!(base.resolve("#top").unwrap(), base);
    }

    #[test]
    fn test_same_endpoint() {
        let a = Url::parse("https://a.com/x").unwrap();
        assert!(a.same_endpoint(&Url::parse("https://a.com/y").unwrap()));
        assert!(!a.same_endpoint(&Url::parse("http://a.com/y").unwrap()));
    }
}
