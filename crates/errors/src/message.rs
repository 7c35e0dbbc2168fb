// Copyright 2024 The Matrix.org Foundation C.I.C.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Best-effort extraction of a human-readable message from an error response
//! body.
//!
//! None of the functions here fail: anything that goes wrong while looking
//! at the body degrades to a less specific message, or no message at all.

use encoding_rs::Encoding;
use http::HeaderValue;
use mime::Mime;
use tracing::debug;

/// Extract the message from a buffered response body.
///
/// The body is decoded as text using the charset declared in the
/// `Content-Type`, falling back to `default_charset`. If the media type is
/// exactly `application/json`, without any parameter, and the body is a JSON
/// object with a string `message` field, that field is used instead.
///
/// Returns `None` if the body is empty.
#[must_use]
pub fn extract_message(
    content_type: Option<&HeaderValue>,
    body: &[u8],
    default_charset: &'static Encoding,
) -> Option<String> {
    if body.is_empty() {
        return None;
    }

    let media_type = content_type.and_then(parse_media_type);
    let charset = media_type
        .as_ref()
        .and_then(declared_charset)
        .unwrap_or(default_charset);

    // Malformed sequences are replaced, so decoding itself never fails
    let (text, had_errors) = charset.decode_without_bom_handling(body);
    if had_errors {
        debug!(
            charset = charset.name(),
            "response body contained malformed sequences"
        );
    }

    let mut message = text.into_owned();

    if media_type.as_ref().is_some_and(is_plain_json) {
        if let Some(json_message) = json_message(body) {
            message = json_message;
        }
    }

    Some(message)
}

fn parse_media_type(content_type: &HeaderValue) -> Option<Mime> {
    let content_type = content_type.to_str().ok()?;
    match content_type.parse() {
        Ok(media_type) => Some(media_type),
        Err(err) => {
            debug!(content_type, "could not parse response content type: {err}");
            None
        }
    }
}

/// Resolve the `charset` parameter of a media type, if it names a known
/// encoding
fn declared_charset(media_type: &Mime) -> Option<&'static Encoding> {
    let label = media_type.get_param(mime::CHARSET)?;
    let encoding = Encoding::for_label(label.as_str().as_bytes());
    if encoding.is_none() {
        debug!(charset = label.as_str(), "unknown response charset");
    }

    encoding
}

/// Only a bare `application/json` qualifies: `application/json;
/// charset=utf-8` or `application/problem+json` do not.
fn is_plain_json(media_type: &Mime) -> bool {
    media_type.type_() == mime::APPLICATION
        && media_type.subtype() == mime::JSON
        && media_type.suffix().is_none()
        && media_type.params().next().is_none()
}

const UTF_8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Parse the raw body as JSON and look for a top-level string `message` field
fn json_message(body: &[u8]) -> Option<String> {
    let body = body.strip_prefix(UTF_8_BOM).unwrap_or(body);
    let mut value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) => {
            debug!("failed to deserialise engine error body: {err}");
            return None;
        }
    };

    match value.get_mut("message").map(serde_json::Value::take) {
        Some(serde_json::Value::String(message)) => Some(message),
        Some(other) => {
            debug!(?other, "engine error message is not a string");
            None
        }
        None => None,
    }
}
