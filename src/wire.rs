//! Wire model for requests and replies exchanged over the bus.
//!
//! Both sides of the fabric speak a self-describing JSON object format.
//! A bridged HTTP request becomes a [`Request`]; the peer answers with a
//! [`Response`] carrying the status code, body bytes, and headers the proxy
//! renders back to the HTTP client. Header maps are multi-valued on both
//! sides, an ordered list of values per name, and duplicates are never
//! collapsed.

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A bridged HTTP request, published on the endpoint's topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// The caller's apparent source IP: the first `X-Forwarded-For` value
    /// when present, otherwise the connection's remote address verbatim.
    #[serde(rename = "IPAddress")]
    pub ip_address: String,

    /// All request headers, every value, order preserved within a name.
    #[serde(rename = "Headers")]
    pub headers: HashMap<String, Vec<String>>,

    /// URL query values in URL order, with matched path parameters appended
    /// under their key after any same-named query values.
    #[serde(rename = "QueryParams")]
    pub query_params: HashMap<String, Vec<String>>,

    /// The request body, read in full before publishing.
    #[serde(rename = "Body")]
    pub body: Vec<u8>,

    /// Opaque correlation ID generated per request.
    #[serde(rename = "RequestID")]
    pub request_id: String,
}

impl Request {
    /// Serialize for publishing on the bus.
    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}

/// A peer's reply to a bridged request.
///
/// Missing fields decode to their zero values, so a peer may answer with
/// just a `Code`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code to render.
    #[serde(rename = "Code", default)]
    pub code: u16,

    /// Response body bytes.
    #[serde(rename = "Msg", default)]
    pub msg: Vec<u8>,

    /// Response headers, every value set on the HTTP response.
    #[serde(rename = "Headers", default)]
    pub headers: HashMap<String, Vec<String>>,
}

impl Response {
    /// Parse a reply payload received from the bus.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Serialize for writing back over the bus.
    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}
