//! Text-mode web client: URLs, cookies, HTTP/1.1 over any
//! [`platform::Connector`], HTML extraction and form submission.

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]
#![allow(async_fn_in_trait)]

pub mod cookie;
mod error;
pub mod extract;
pub mod fetch;
pub mod form;
pub mod http;
pub mod url;

pub use cookie::{Cookie, CookieJar};
pub use error::FetchError;
pub use extract::{Document, HtmlExtractor, Link, TagStripExtractor};
pub use fetch::{default_auth_error, AuthErrorCheck, Fetcher, Page, MAX_REDIRECTS};
pub use form::{FieldKind, Form, FormField, FormMethod};
pub use http::{Progress, ProgressSink};
pub use url::Url;
