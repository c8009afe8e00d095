//! Plain data HTTP types exchanged between the deterministic core and the
//! transport layer.
//!
//! The client core never performs I/O. `build_*` methods on
//! [`crate::StoreClient`] produce an [`HttpRequest`], a
//! [`crate::transport::Transport`] carries it over the wire, and `parse_*`
//! methods interpret the resulting [`HttpResponse`]. Keeping these types
//! dumb makes every request inspectable and every response replayable in
//! tests.

use std::fmt;

/// HTTP methods used by the store API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A fully assembled request, ready to hand to a transport.
///
/// `url` is absolute. Header names are lowercase. `body`, when present, is
/// a JSON document and is accompanied by a `content-type` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// A response as seen by the transport, reduced to what the core needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is in the 2xx success class.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
