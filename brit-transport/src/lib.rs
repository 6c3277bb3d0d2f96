//! HTTP transport for BRIT envelopes.
//!
//! Posts opaque envelope bytes to a Matcher and returns the response body.

mod http;

pub use http::{HttpTransport, TransportConfig, DEFAULT_MAX_RESPONSE_BYTES};
