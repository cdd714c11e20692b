//! Bridge handler: the per-endpoint translation between HTTP and the bus.
//!
//! # Request Flow
//!
//! ```text
//! Request ──► read body ──► access log ──► publish on topic
//!                 │                              │
//!           read failure                 first event wins
//!           500, no hook              ┌──────────┴──────────┐
//!                                   reply                deadline
//!                                     │                     │
//!                              decode ── ok ── render     408
//!                                     │
//!                               decode failure
//!                                    500
//! ```
//!
//! Every terminal state runs the post-processing hook (read failures
//! excepted, they occur before the hook is wired) and emits exactly one
//! summary line on the request sink. A reply arriving after the deadline is
//! dropped together with the pending call; it cannot touch the response and
//! never produces a second summary line.

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use http::StatusCode;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::request::Parts;
use http_body_util::{BodyExt, Limited};

use crate::endpoint::Endpoint;
use crate::proxy::ProxyState;
use crate::wire;

/// Bridge one HTTP request to the endpoint's topic and render the outcome.
///
/// `remote` is the connection's remote address; `path_params` are the
/// parameters matched by the router, in match order.
pub(crate) async fn dispatch(
    state: &ProxyState,
    endpoint: &Endpoint,
    remote: &str,
    path_params: &[(String, String)],
    request: http::Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();

    // The body must be consumed in full before anything is published.
    let body = match Limited::new(body, state.config.body_limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            state.debug.println(&err.to_string());
            return finish(
                state,
                endpoint,
                &parts,
                None,
                plain_status(StatusCode::INTERNAL_SERVER_ERROR),
                false,
            );
        }
    };

    let ip = caller_ip(&parts.headers, remote);
    let request_id = (state.get_id)();

    // Access entry goes out strictly before the publish.
    state.access.printf(format_args!(
        "{}, remote Addr: {}, Id: {}",
        parts.uri.path(),
        ip,
        request_id
    ));

    let bus_request = wire::Request {
        ip_address: ip,
        headers: header_values(&parts.headers),
        query_params: merge_request_params(parts.uri.query(), path_params),
        body: body.to_vec(),
        request_id,
    };
    let payload = match bus_request.to_bytes() {
        Ok(payload) => payload,
        Err(err) => {
            state.debug.println(&err.to_string());
            return finish(
                state,
                endpoint,
                &parts,
                None,
                plain_status(StatusCode::INTERNAL_SERVER_ERROR),
                true,
            );
        }
    };

    let deadline = if endpoint.timeout_secs == 0 {
        state.config.call_timeout
    } else {
        Duration::from_secs(endpoint.timeout_secs)
    };

    // The call future is polled before the timer, so a reply racing the
    // deadline wins the tie.
    match tokio::time::timeout(deadline, state.bus.call(&endpoint.topic, payload)).await {
        Err(_elapsed) => finish(
            state,
            endpoint,
            &parts,
            None,
            plain_status(StatusCode::REQUEST_TIMEOUT),
            true,
        ),
        Ok(Err(err)) => {
            state.debug.println(&err.to_string());
            finish(
                state,
                endpoint,
                &parts,
                None,
                plain_status(StatusCode::INTERNAL_SERVER_ERROR),
                true,
            )
        }
        Ok(Ok(raw)) => match decode_reply(&raw) {
            Err(reason) => {
                state
                    .debug
                    .println(&format!("Malformed mrpcproxy Response: {reason}"));
                finish(
                    state,
                    endpoint,
                    &parts,
                    None,
                    plain_status(StatusCode::INTERNAL_SERVER_ERROR),
                    true,
                )
            }
            Ok((status, reply)) => {
                let mut response = Response::new(Body::from(Bytes::from(reply.msg.clone())));
                *response.status_mut() = status;
                apply_reply_headers(response.headers_mut(), &reply.headers);
                finish(state, endpoint, &parts, Some(&reply), response, true)
            }
        },
    }
}

/// Run the hook and emit the terminal request-sink line.
fn finish(
    state: &ProxyState,
    endpoint: &Endpoint,
    parts: &Parts,
    reply: Option<&wire::Response>,
    mut response: Response,
    run_hook: bool,
) -> Response {
    if run_hook && let Some(hook) = &state.hook {
        hook(response.headers_mut(), parts, reply);
    }
    state.requests.printf(format_args!(
        "{} - {}:{} ({})",
        response.status().as_u16(),
        endpoint.method,
        endpoint.path,
        endpoint.topic
    ));
    response
}

fn plain_status(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

/// Derive the caller's apparent source IP.
fn caller_ip(headers: &HeaderMap, remote: &str) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| remote.to_owned())
}

/// Copy request headers into the wire representation, all values, order
/// preserved within each name.
fn header_values(headers: &HeaderMap) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        map.entry(name.as_str().to_owned())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    map
}

/// Merge URL query values and matched path parameters.
///
/// Query values come first, in URL order. Path parameters never replace a
/// same-named query value; they append after it, in match order.
pub(crate) fn merge_request_params(
    query: Option<&str>,
    path_params: &[(String, String)],
) -> HashMap<String, Vec<String>> {
    let mut merged: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
        merged
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    for (key, value) in path_params {
        merged.entry(key.clone()).or_default().push(value.clone());
    }
    merged
}

/// Parse a reply payload and validate its status code.
fn decode_reply(raw: &[u8]) -> Result<(StatusCode, wire::Response), String> {
    let reply = wire::Response::from_bytes(raw).map_err(|err| err.to_string())?;
    let status = StatusCode::from_u16(reply.code)
        .map_err(|_| format!("invalid status code {}", reply.code))?;
    Ok((status, reply))
}

/// Set every reply header on the HTTP response. Names or values the HTTP
/// layer cannot represent are dropped.
fn apply_reply_headers(headers: &mut HeaderMap, reply_headers: &HashMap<String, Vec<String>>) {
    for (name, values) in reply_headers {
        let Ok(name) = HeaderName::try_from(name.as_str()) else {
            continue;
        };
        for value in values {
            if let Ok(value) = HeaderValue::try_from(value.as_str()) {
                headers.append(name.clone(), value);
            }
        }
    }
}
