//! HTML forms as extracted from a page, and their urlencoded submission body.

use heapless::{String, Vec};

use crate::url::UrlBuf;
use crate::FetchError;

/// Fields kept per form.
pub const MAX_FIELDS: usize = 12;

/// Longest field name.
pub const MAX_FIELD_NAME: usize = 32;

/// Longest field value.
pub const MAX_FIELD_VALUE: usize = 128;

/// Largest encoded submission body.
pub const MAX_FORM_BODY: usize = 1_024;

/// Field names whose values come from the server and must not be carried
/// over when a form is re-submitted.
pub const SERVER_FIELDS: [&str; 4] = ["authenticity_token", "csrf_token", "_token", "commit"];

/// Encoded submission body.
pub type FormBody = String<MAX_FORM_BODY>;

/// Input kind, from the `type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldKind {
    /// Free text the user fills in.
    Text,
    /// Masked text.
    Password,
    /// Server-provided value.
    Hidden,
    /// Submit button with a name.
    Submit,
}

impl FieldKind {
    /// Kind for an `<input type=...>` value; `None` for kinds we skip.
    pub fn from_type(ty: &str) -> Option<Self> {
        let ty = ty.trim();
        if ty.is_empty()
            || ["text", "email", "search", "tel", "url", "number"]
                .iter()
                .any(|t| ty.eq_ignore_ascii_case(t))
        {
            Some(Self::Text)
        } else if ty.eq_ignore_ascii_case("password") {
            Some(Self::Password)
        } else if ty.eq_ignore_ascii_case("hidden") {
            Some(Self::Hidden)
        } else if ty.eq_ignore_ascii_case("submit") {
            Some(Self::Submit)
        } else {
            None
        }
    }

    /// `true` for kinds the user edits.
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Text | Self::Password)
    }
}

/// One named field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// `name` attribute.
    pub name: String<MAX_FIELD_NAME>,
    /// Current value.
    pub value: String<MAX_FIELD_VALUE>,
    /// Input kind.
    pub kind: FieldKind,
}

/// Submission method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FormMethod {
    /// Query string on the action URL.
    #[default]
    Get,
    /// urlencoded body.
    Post,
}

/// A form found on a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    /// `action` as written in the page; empty means the page itself.
    pub action: UrlBuf,
    /// Method.
    pub method: FormMethod,
    /// Named fields in document order.
    pub fields: Vec<FormField, MAX_FIELDS>,
}

fn truncated<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

impl Form {
    /// Append a field; dropped with a warning when the form is full.
    pub fn push(&mut self, name: &str, value: &str, kind: FieldKind) {
        if name.is_empty() {
            return;
        }
        let field = FormField {
            name: truncated(name),
            value: truncated(value),
            kind,
        };
        if self.fields.push(field).is_err() {
            tracing::warn!("web: form has more than {} fields, {} dropped", MAX_FIELDS, name);
        }
    }

    /// Value of field `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name.as_str() == name)
            .map(|f| f.value.as_str())
    }

    /// Set field `name`; `false` if the form has no such field.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        match self.fields.iter_mut().find(|f| f.name.as_str() == name) {
            Some(f) => {
                f.value = truncated(value);
                true
            }
            None => false,
        }
    }

    /// `true` if the form has a password field.
    pub fn has_password(&self) -> bool {
        self.fields.iter().any(|f| f.kind == FieldKind::Password)
    }

    /// Copy values the user entered in `filled` into this (fresh) form.
    /// Server-provided fields keep this form's values.
    pub fn carry_user_values(&mut self, filled: &Form) {
        for field in self.fields.iter_mut() {
            if SERVER_FIELDS.contains(&field.name.as_str()) || field.kind == FieldKind::Hidden {
                continue;
            }
            if let Some(v) = filled.get(&field.name) {
                field.value = truncated(v);
            }
        }
    }

    /// `application/x-www-form-urlencoded` body.
    pub fn encode(&self) -> Result<FormBody, FetchError> {
        let mut out = FormBody::new();
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push('&').map_err(|_| FetchError::OutOfMemory)?;
            }
            urlencode_into(&mut out, &field.name)?;
            out.push('=').map_err(|_| FetchError::OutOfMemory)?;
            urlencode_into(&mut out, &field.value)?;
        }
        Ok(out)
    }
}

/// Percent-encode `s` for a form body (space as `+`).
pub fn urlencode_into<const N: usize>(out: &mut String<N>, s: &str) -> Result<(), FetchError> {
    fn hex(n: u8) -> char {
        char::from_digit(u32::from(n & 0x0F), 16).map_or('0', |c| c.to_ascii_uppercase())
    }
    for b in s.bytes() {
        let ok = match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'*' => out.push(char::from(b)),
            b' ' => out.push('+'),
            _ => out
                .push('%')
                .and_then(|()| out.push(hex(b >> 4)))
                .and_then(|()| out.push(hex(b))),
        };
        ok.map_err(|_| FetchError::OutOfMemory)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_form(token: &str) -> Form {
        let mut f = Form {
            method: FormMethod::Post,
            ..Form::default()
        };
        f.action.push_str("/session").unwrap();
        f.push("authenticity_token", token, FieldKind::Hidden);
        f.push("login", "", FieldKind::Text);
        f.push("password", "", FieldKind::Password);
        f.push("commit", "Sign in", FieldKind::Submit);
        f
    }

    #[test]
    fn test_encode_escapes() {
        let mut f = login_form("a+b/c=");
        f.set("login", "ann smith");
        f.set("password", "p&ss");
        assert_eq!(
            f.encode().unwrap().as_str(),
            "authenticity_token=a%2Bb%2Fc%3D&login=ann+smith&password=p%26ss&commit=Sign+in"
        );
    }

    #[test]
    fn test_carry_user_values_keeps_fresh_token() {
        let mut old = login_form("stale");
        old.set("login", "ann");
        old.set("password", "pw");
        let mut fresh = login_form("fresh");
        fresh.carry_user_values(&old);
        assert_eq!(fresh.get("authenticity_token"), Some("fresh"));
        assert_eq!(fresh.get("login"), Some("ann"));
        assert_eq!(fresh.get("password"), Some("pw"));
        assert_eq!(fresh.get("commit"), Some("Sign in"));
    }

    #[test]
    fn test_field_kinds() {
        assert_eq!(FieldKind::from_type(""), Some(FieldKind::Text));
        assert_eq!(FieldKind::from_type("EMAIL"), Some(FieldKind::Text));
        assert_eq!(FieldKind::from_type("checkbox"), None);
        assert!(login_form("t").has_password());
        assert!(!login_form("t").set("missing", "x"));
    }

    #[test]
    fn test_field_limit() {
        let mut f = Form::default();
        for i in 0..MAX_FIELDS + 2 {
            f.push(&format!("f{i}"), "", FieldKind::Text);
        }
        assert_eq!(f.fields.len(), MAX_FIELDS);
    }
}
