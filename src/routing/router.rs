//! Outbound URI construction.
//!
//! # Responsibilities
//! - Combine the upstream base URL with the unmatched remainder of the path
//! - Merge query strings from the upstream and the inbound request
//! - Produce the authority used for the outbound Host header
//!
//! # Design Decisions
//! - Paths are matched percent-decoded, the way route keys are stored; the
//!   remainder is re-escaped on the way out, so an encoded `/` (`%2F`) is
//!   forwarded as a plain `/`
//! - No normalisation beyond stripping the matched key: `..` and `//` in the
//!   remainder are forwarded untouched
//! - An empty remainder forwards to the upstream base path as written

use std::borrow::Cow;

use axum::http::{uri::InvalidUri, HeaderValue, Uri};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use url::{Position, Url};

/// Bytes escaped when a decoded remainder is written back into a URI path.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-decode an inbound request path.
///
/// A path whose escapes do not decode to UTF-8 is used as sent.
pub fn decode_path(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw).decode_utf8().unwrap_or(Cow::Borrowed(raw))
}

/// Where a single request is sent.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    /// Absolute URI for the outbound request.
    pub uri: Uri,
    /// `host[:port]` of the upstream, for the Host header.
    pub authority: String,
}

impl UpstreamTarget {
    /// Build the outbound target for `remainder` (and the inbound query) against `upstream`.
    ///
    /// `remainder` is the decoded tail of the request path.
    pub fn new(upstream: &Url, remainder: &str, query: Option<&str>) -> Result<Self, InvalidUri> {
        let authority = upstream[Position::BeforeHost..Position::AfterPort].to_string();
        let remainder: Cow<'_, str> = utf8_percent_encode(remainder, PATH).into();
        let path = join_path(upstream.path(), &remainder);

        let mut uri = format!("{}://{}{}", upstream.scheme(), authority, path);
        match (upstream.query().filter(|q| !q.is_empty()), query.filter(|q| !q.is_empty())) {
            (Some(a), Some(b)) => {
                uri.push('?');
                uri.push_str(a);
                uri.push('&');
                uri.push_str(b);
            }
            (Some(q), None) | (None, Some(q)) => {
                uri.push('?');
                uri.push_str(q);
            }
            (None, None) => {}
        }

        Ok(Self {
            uri: uri.parse()?,
            authority,
        })
    }

    pub fn host_header(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.authority).ok()
    }
}

fn join_path(base: &str, remainder: &str) -> String {
    if remainder.is_empty() {
        return base.to_string();
    }
    match (base.ends_with('/'), remainder.starts_with('/')) {
        (true, true) => format!("{}{}", base, &remainder[1..]),
        (false, false) => format!("{}/{}", base, remainder),
        _ => format!("{}{}", base, remainder),
    }
}
