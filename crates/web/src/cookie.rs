//! Session cookie jar.
//!
//! Holds at most [`MAX_COOKIES`] `(domain, name, value)` records. Attributes
//! other than `Domain` are ignored: cookies live until the jar is cleared
//! or they are evicted.

use heapless::{String, Vec};

/// Cookies kept.
pub const MAX_COOKIES: usize = 16;

/// Longest cookie value (session tokens can be long).
pub const MAX_COOKIE_VALUE: usize = 512;

/// Longest cookie name.
pub const MAX_COOKIE_NAME: usize = 64;

/// Longest cookie domain.
pub const MAX_COOKIE_DOMAIN: usize = 64;

/// One stored cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Domain without a leading dot.
    pub domain: String<MAX_COOKIE_DOMAIN>,
    /// Name.
    pub name: String<MAX_COOKIE_NAME>,
    /// Value.
    pub value: String<MAX_COOKIE_VALUE>,
}

/// Bounded cookie jar.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    entries: Vec<Cookie, MAX_COOKIES>,
}

fn copy<const N: usize>(src: &str) -> Option<String<N>> {
    let mut out = String::new();
    out.push_str(src).ok()?;
    Some(out)
}

/// `true` if `host` is `domain` or a subdomain of it.
pub fn domain_matches(host: &str, domain: &str) -> bool {
    if host.len() < domain.len() {
        return false;
    }
    let split = host.len().saturating_sub(domain.len());
    let (Some(head), Some(tail)) = (host.get(..split), host.get(split..)) else {
        return false;
    };
    tail.eq_ignore_ascii_case(domain) && (head.is_empty() || head.ends_with('.'))
}

impl CookieJar {
    /// Empty jar.
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Insert or update by `(domain, name)`. A full jar evicts its oldest
    /// entry. Over-long fields are dropped.
    pub fn set(&mut self, domain: &str, name: &str, value: &str) -> bool {
        let domain = domain.trim_start_matches('.');
        let Some(value) = copy::<MAX_COOKIE_VALUE>(value) else {
            tracing::warn!("web: cookie {} value too long, dropped", name);
            return false;
        };
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|c| c.domain.eq_ignore_ascii_case(domain) && c.name == name)
        {
            existing.value = value;
            return true;
        }
        let (Some(domain), Some(name)) = (
            copy::<MAX_COOKIE_DOMAIN>(domain),
            copy::<MAX_COOKIE_NAME>(name),
        ) else {
            return false;
        };
        if self.entries.is_full() {
            self.entries.remove(0);
        }
        self.entries.push(Cookie { domain, name, value }).is_ok()
    }

    /// Store the cookie(s) from one `Set-Cookie` header value received
    /// from `host`.
    pub fn store_header(&mut self, host: &str, header: &str) {
        for part in split_set_cookie(header) {
            if let Some((domain, name, value)) = parse_set_cookie(part, host) {
                tracing::debug!("web: cookie {} for {}", name, domain);
                self.set(domain, name, value);
            }
        }
    }

    /// Cookies sent to `host`, in jar order.
    pub fn matching<'a>(&'a self, host: &'a str) -> impl Iterator<Item = &'a Cookie> + 'a {
        self.entries.iter().filter(move |c| domain_matches(host, &c.domain))
    }

    /// Value of cookie `name` for `host`.
    pub fn get<'a>(&'a self, host: &'a str, name: &str) -> Option<&'a str> {
        self.matching(host)
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// Number of stored cookies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_graphic() && !matches!(b, b';' | b',' | b'=' | b'"'))
}

/// `true` if `text` begins with `name=`.
fn starts_cookie(text: &str) -> bool {
    text.split_once('=')
        .is_some_and(|(name, _)| is_token(name.trim_start()))
}

/// Split a `Set-Cookie` value that several headers were folded into.
///
/// Splits on `", "` only where the remainder starts a new `name=value`, so
/// commas inside attributes like `Expires=Wed, 09 Jun 2021 ...` stay put.
pub fn split_set_cookie(header: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(header);
    core::iter::from_fn(move || {
        let text = rest?;
        let mut from = 0usize;
        while let Some(i) = text.get(from..).and_then(|t| t.find(", ")) {
            let at = from.saturating_add(i);
            let tail = text.get(at.saturating_add(2)..).unwrap_or("");
            let head_is_cookie_attr_value = tail.split(';').next().is_some_and(starts_cookie);
            if head_is_cookie_attr_value {
                rest = Some(tail);
                return text.get(..at);
            }
            from = at.saturating_add(2);
        }
        rest = None;
        Some(text)
    })
}

/// `(domain, name, value)` from one cookie string. The domain is the
/// `Domain` attribute if present, else `host`.
pub fn parse_set_cookie<'a>(text: &'a str, host: &'a str) -> Option<(&'a str, &'a str, &'a str)> {
    let mut parts = text.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if !is_token(name) {
        return None;
    }
    let value = value.trim().trim_matches('"');
    let mut domain = host;
    for attr in parts {
        if let Some((k, v)) = attr.split_once('=') {
            if k.trim().eq_ignore_ascii_case("domain") {
                let d = v.trim().trim_start_matches('.');
                // Only the host itself or a parent domain may be named.
                if !d.is_empty() && domain_matches(host, d) {
                    domain = d;
                }
            }
        }
    }
    Some((domain, name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_keeps_length() {
        let mut jar = CookieJar::new();
        jar.set("a.com", "sid", "1");
        jar.set("a.com", "sid", "2");
        assert_eq!(jar.len(), 1);
        assert_eq!(jar.get("a.com", "sid"), Some("2"));
    }

    #[test]
    fn test_full_jar_evicts_oldest() {
        let mut jar = CookieJar::new();
        for i in 0..MAX_COOKIES {
            jar.set("a.com", &format!("c{i}"), "v");
        }
        jar.set("a.com", "late", "v");
        assert_eq!(jar.len(), MAX_COOKIES);
        assert_eq!(jar.get("a.com", "c0"), None);
        assert_eq!(jar.get("a.com", "late"), Some("v"));
    }

    #[test]
    fn test_long_value_kept_up_to_limit() {
        let mut jar = CookieJar::new();
        assert!(jar.set("a.com", "t", &"x".repeat(MAX_COOKIE_VALUE)));
        assert!(!jar.set("a.com", "u", &"x".repeat(MAX_COOKIE_VALUE + 1)));
    }

    #[test]
    fn test_domain_suffix_matching() {
        assert!(domain_matches("www.example.com", "example.com"));
        assert!(domain_matches("example.com", "example.com"));
        assert!(!domain_matches("badexample.com", "example.com"));
        assert!(!domain_matches("com", "example.com"));
    }

    #[test]
    fn test_split_respects_expires_comma() {
        let h = "a=1; Expires=Wed, 09 Jun 2021 10:18:14 GMT; Path=/, b=2; HttpOnly";
        let parts: std::vec::Vec<&str> = split_set_cookie(h).collect();
        assert_eq!(parts, ["a=1; Expires=Wed, 09 Jun 2021 10:18:14 GMT; Path=/", "b=2; HttpOnly"]);
    }

    #[test]
    fn test_split_keeps_comma_inside_value() {
        let parts: std::vec::Vec<&str> = split_set_cookie("list=x, y z").collect();
        assert_eq!(parts, ["list=x, y z"]);
    }

    #[test]
    fn test_domain_attribute() {
        assert_eq!(
            parse_set_cookie("sid=abc; Domain=.example.com; Path=/", "www.example.com"),
            Some(("example.com", "sid", "abc"))
        );
        // A foreign Domain attribute falls back to the host.
        assert_eq!(
            parse_set_cookie("sid=abc; Domain=evil.org", "www.example.com"),
            Some(("www.example.com", "sid", "abc"))
        );
    }

    #[test]
    fn test_store_header_and_match() {
        let mut jar = CookieJar::new();
        jar.store_header("login.site.io", "_session=abc; Domain=site.io, theme=dark");
        assert_eq!(jar.get("www.site.io", "_session"), Some("abc"));
        assert_eq!(jar.get("www.site.io", "theme"), None);
        assert_eq!(jar.matching("login.site.io").count(), 2);
    }
}
