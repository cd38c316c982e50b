//! HTML to reader text.
//!
//! Extraction happens in place: the page buffer that received the HTML is
//! rewritten front to back with the visible text, so no second page-sized
//! buffer is needed. Links and forms are collected on the way.

use heapless::{String, Vec};

use crate::form::{FieldKind, Form, FormMethod};
use crate::url::UrlBuf;

/// Links kept per page.
pub const MAX_LINKS: usize = 32;

/// Longest link label.
pub const MAX_LINK_TEXT: usize = 40;

/// Forms kept per page.
pub const MAX_FORMS: usize = 4;

const MAX_TAG: usize = 384;

/// A hyperlink, numbered in the text as `[n]` (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Anchor text.
    pub text: String<MAX_LINK_TEXT>,
    /// `href` as written in the page.
    pub href: UrlBuf,
}

/// What the extractor found besides the text.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Links in document order.
    pub links: Vec<Link, MAX_LINKS>,
    /// Forms in document order.
    pub forms: Vec<Form, MAX_FORMS>,
    /// Length of the extracted text at the front of the page buffer.
    pub text_len: usize,
}

impl Document {
    /// Forget the previous page.
    pub fn clear(&mut self) {
        self.links.clear();
        self.forms.clear();
        self.text_len = 0;
    }

    /// Extracted text within `page`.
    pub fn text<'p>(&self, page: &'p [u8]) -> &'p [u8] {
        page.get(..self.text_len).unwrap_or(page)
    }
}

/// Turns fetched HTML into displayable text.
pub trait HtmlExtractor {
    /// Rewrite `page[..len]` into text starting at `page[0]`, filling `doc`.
    /// Returns the text length (also stored in `doc.text_len`).
    fn extract(&mut self, page: &mut [u8], len: usize, doc: &mut Document) -> usize;
}

/// Tag-stripping extractor: drops scripts and styles, turns block tags
/// into line breaks, decodes common entities and numbers links.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagStripExtractor;

const BLOCK_TAGS: [&str; 24] = [
    "p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "ul", "ol", "table", "section",
    "article", "header", "footer", "nav", "blockquote", "pre", "form", "title", "hr", "dd",
];

const SKIPPED_TAGS: [&str; 6] = ["script", "style", "noscript", "template", "svg", "textarea"];

fn utf8_prefix(bytes: &[u8]) -> &str {
    match core::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => core::str::from_utf8(bytes.get(..e.valid_up_to()).unwrap_or(&[])).unwrap_or(""),
    }
}

fn find(hay: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    hay.get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p.saturating_add(from))
}

/// Decode the entity at the start of `s` (which begins with `&`).
/// Returns the character and the bytes consumed.
fn entity(s: &[u8]) -> Option<(char, usize)> {
    let semi = s.iter().take(10).position(|&b| b == b';')?;
    let name = utf8_prefix(s.get(1..semi)?);
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "mdash" | "ndash" => '-',
        "hellip" => '…',
        "copy" => '©',
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)?
        }
    };
    Some((c, semi.saturating_add(1)))
}

/// Copy `raw` with entities decoded, truncating at capacity.
fn decoded<const N: usize>(raw: &str) -> String<N> {
    let mut out = String::new();
    let bytes = raw.as_bytes();
    let mut i = 0;
    while let Some(&b) = bytes.get(i) {
        let (c, used) = if b == b'&' {
            bytes.get(i..).and_then(entity).unwrap_or(('&', 1))
        } else {
            let rest = utf8_prefix(bytes.get(i..).unwrap_or(&[]));
            match rest.chars().next() {
                Some(c) => (c, c.len_utf8()),
                None => break,
            }
        };
        if out.push(c).is_err() {
            break;
        }
        i = i.saturating_add(used);
    }
    out
}

/// Value of attribute `name` within a tag's inner text.
pub fn attr<'t>(tag: &'t str, name: &str) -> Option<&'t str> {
    let mut rest = tag.split_once(|c: char| c.is_ascii_whitespace())?.1;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '/');
        if rest.is_empty() {
            return None;
        }
        let key_end = rest
            .find(|c: char| c == '=' || c.is_ascii_whitespace())
            .unwrap_or(rest.len());
        let key = rest.get(..key_end)?;
        rest = rest.get(key_end..)?.trim_start();
        let value = if let Some(after) = rest.strip_prefix('=') {
            let after = after.trim_start();
            let (value, tail) = match after.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = after.get(1..)?;
                    let end = body.find(q).unwrap_or(body.len());
                    (body.get(..end)?, body.get(end.saturating_add(1)..).unwrap_or(""))
                }
                _ => {
                    let end = after
                        .find(|c: char| c.is_ascii_whitespace())
                        .unwrap_or(after.len());
                    (after.get(..end)?, after.get(end..)?)
                }
            };
            rest = tail;
            value
        } else {
            ""
        };
        if key.eq_ignore_ascii_case(name) {
            return Some(value);
        }
    }
}

struct Writer<'p> {
    page: &'p mut [u8],
    w: usize,
    line_start: bool,
    space: bool,
}

impl Writer<'_> {
    /// Write `bytes` unless that would overrun unread input at `r`.
    fn put(&mut self, bytes: &[u8], r: usize) {
        let end = self.w.saturating_add(bytes.len());
        if end > r {
            return;
        }
        if let Some(dst) = self.page.get_mut(self.w..end) {
            dst.copy_from_slice(bytes);
            self.w = end;
        }
    }

    fn text(&mut self, bytes: &[u8], r: usize) {
        if self.space && !self.line_start {
            self.put(b" ", r);
        }
        self.space = false;
        self.line_start = false;
        self.put(bytes, r);
    }

    fn newline(&mut self, r: usize) {
        self.space = false;
        if !self.line_start {
            self.put(b"\n", r);
            self.line_start = true;
        }
    }
}

impl HtmlExtractor for TagStripExtractor {
    fn extract(&mut self, page: &mut [u8], len: usize, doc: &mut Document) -> usize {
        doc.clear();
        let len = len.min(page.len());
        let mut out = Writer {
            page,
            w: 0,
            line_start: true,
            space: false,
        };
        let mut r = 0usize;
        let mut skip: Option<&'static str> = None;
        let mut link: Option<(usize, UrlBuf)> = None;
        let mut form: Option<usize> = None;

        while r < len {
            let Some(b) = out.page.get(r).copied() else { break };
            if b == b'<' {
                let inner_start = r.saturating_add(1);
                if out.page.get(inner_start..inner_start.saturating_add(3)) == Some(b"!--") {
                    r = find(out.page, inner_start, b"-->").map_or(len, |p| p.saturating_add(3));
                    continue;
                }
                let Some(end) = find(out.page, inner_start, b">").filter(|&e| e < len) else {
                    break;
                };
                let raw = out.page.get(inner_start..end).unwrap_or(&[]);
                let mut tag: String<MAX_TAG> = String::new();
                for c in utf8_prefix(raw).chars() {
                    if tag.push(c).is_err() {
                        break;
                    }
                }
                r = end.saturating_add(1);

                let closing = tag.starts_with('/');
                let name_text = tag.trim_start_matches('/');
                let name_end = name_text
                    .find(|c: char| c.is_ascii_whitespace() || c == '/')
                    .unwrap_or(name_text.len());
                let mut name: String<16> = String::new();
                for c in name_text.get(..name_end).unwrap_or("").chars() {
                    if name.push(c.to_ascii_lowercase()).is_err() {
                        break;
                    }
                }

                if let Some(waiting) = skip {
                    if closing && name.as_str() == waiting {
                        skip = None;
                    }
                    continue;
                }
                if !closing {
                    if let Some(s) = SKIPPED_TAGS.iter().find(|s| **s == name.as_str()) {
                        skip = Some(s);
                    }
                }

                match (name.as_str(), closing) {
                    ("a", false) => {
                        link = attr(name_text, "href")
                            .filter(|h| !h.is_empty() && !h.starts_with("javascript:"))
                            .map(|h| (out.w, decoded(h)));
                    }
                    ("a", true) => {
                        if let Some((start, href)) = link.take() {
                            let label = utf8_prefix(out.page.get(start..out.w).unwrap_or(&[])).trim();
                            let mut text = String::new();
                            for c in label.chars() {
                                if text.push(c).is_err() {
                                    break;
                                }
                            }
                            if doc.links.push(Link { text, href }).is_ok() {
                                let mut marker: String<8> = String::new();
                                let _ = core::fmt::write(&mut marker, format_args!("[{}]", doc.links.len()));
                                out.text(marker.as_bytes(), r);
                            }
                        }
                    }
                    ("form", false) => {
                        let method = match attr(name_text, "method") {
                            Some(m) if m.eq_ignore_ascii_case("post") => FormMethod::Post,
                            _ => FormMethod::Get,
                        };
                        let new = Form {
                            action: decoded(attr(name_text, "action").unwrap_or("")),
                            method,
                            fields: Vec::new(),
                        };
                        form = doc.forms.push(new).ok().map(|()| doc.forms.len().saturating_sub(1));
                        out.newline(r);
                    }
                    ("form", true) => {
                        form = None;
                        out.newline(r);
                    }
                    ("input" | "button" | "textarea", false) => {
                        let kind = match name.as_str() {
                            "input" => FieldKind::from_type(attr(name_text, "type").unwrap_or("")),
                            "textarea" => Some(FieldKind::Text),
                            _ => match attr(name_text, "type") {
                                Some(t) if !t.eq_ignore_ascii_case("submit") => None,
                                _ => Some(FieldKind::Submit),
                            },
                        };
                        if let (Some(kind), Some(f)) = (kind, form.and_then(|i| doc.forms.get_mut(i))) {
                            let field_name: String<{ crate::form::MAX_FIELD_NAME }> =
                                decoded(attr(name_text, "name").unwrap_or(""));
                            let value: String<{ crate::form::MAX_FIELD_VALUE }> =
                                decoded(attr(name_text, "value").unwrap_or(""));
                            f.push(&field_name, &value, kind);
                        }
                        if kind.is_some_and(FieldKind::is_editable) {
                            out.text(b"[___]", r);
                        }
                    }
                    ("li", false) => {
                        out.newline(r);
                        out.text(b"- ", r);
                    }
                    (n, _) if BLOCK_TAGS.contains(&n) => out.newline(r),
                    _ => {}
                }
                continue;
            }

            if skip.is_some() {
                r = r.saturating_add(1);
                continue;
            }
            if b.is_ascii_whitespace() {
                out.space = true;
                r = r.saturating_add(1);
                continue;
            }
            if b == b'&' {
                if let Some((c, used)) = out.page.get(r..len).and_then(entity) {
                    r = r.saturating_add(used);
                    if c == ' ' {
                        out.space = true;
                    } else {
                        let mut tmp = [0u8; 4];
                        out.text(c.encode_utf8(&mut tmp).as_bytes(), r);
                    }
                    continue;
                }
            }
            r = r.saturating_add(1);
            out.text(&[b], r);
        }

        while out.w > 0 && out.page.get(out.w.saturating_sub(1)).is_some_and(u8::is_ascii_whitespace) {
            out.w = out.w.saturating_sub(1);
        }
        doc.text_len = out.w;
        out.w
    }
}
