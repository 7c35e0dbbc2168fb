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

use std::fmt::Display;

use encoding_rs::Encoding;
use http::{header::CONTENT_TYPE, HeaderMap, StatusCode};

use crate::message::extract_message;

/// Returns `true` for the status codes the engine uses to signal success.
///
/// Only `200 OK`, `201 Created` and `204 No Content` count; any other code,
/// including other 2xx codes, is turned into an [`EngineError`].
#[must_use]
pub fn is_success(status_code: StatusCode) -> bool {
    matches!(
        status_code,
        StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT
    )
}

/// The category of an [`EngineError`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotModified,
    BadRequest,
    Unauthorized,
    NotFound,
    NotAcceptable,
    Conflict,
    InternalServerError,
    Generic,
}

/// An error response from the container engine.
///
/// Each variant carries the message extracted from the response body, if
/// there was one. Status codes without a dedicated variant end up in
/// [`EngineError::Generic`], which keeps the original status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// `304 Not Modified`, e.g. starting a container which already runs
    NotModified { message: Option<String> },

    /// `400 Bad Request`
    BadRequest { message: Option<String> },

    /// `401 Unauthorized`
    Unauthorized { message: Option<String> },

    /// `404 Not Found`
    NotFound { message: Option<String> },

    /// `406 Not Acceptable`
    NotAcceptable { message: Option<String> },

    /// `409 Conflict`
    Conflict { message: Option<String> },

    /// `500 Internal Server Error`
    InternalServerError { message: Option<String> },

    /// Any other non-success status code
    Generic {
        status_code: StatusCode,
        message: Option<String>,
    },
}

impl EngineError {
    /// Map a status code to the matching error, or `None` if the status code
    /// means success.
    #[must_use]
    pub fn from_status(status_code: StatusCode, message: Option<String>) -> Option<Self> {
        if is_success(status_code) {
            return None;
        }

        let error = match status_code {
            StatusCode::NOT_MODIFIED => Self::NotModified { message },
            StatusCode::BAD_REQUEST => Self::BadRequest { message },
            StatusCode::UNAUTHORIZED => Self::Unauthorized { message },
            StatusCode::NOT_FOUND => Self::NotFound { message },
            StatusCode::NOT_ACCEPTABLE => Self::NotAcceptable { message },
            StatusCode::CONFLICT => Self::Conflict { message },
            StatusCode::INTERNAL_SERVER_ERROR => Self::InternalServerError { message },
            status_code => Self::Generic {
                status_code,
                message,
            },
        };

        Some(error)
    }

    /// Build the error for a buffered response, extracting the message from
    /// its body.
    ///
    /// `default_charset` is used to decode the body when the `Content-Type`
    /// header does not declare a usable charset. Returns `None` if the status
    /// code means success.
    #[must_use]
    pub fn from_parts(
        status_code: StatusCode,
        headers: &HeaderMap,
        body: &[u8],
        default_charset: &'static Encoding,
    ) -> Option<Self> {
        if is_success(status_code) {
            return None;
        }

        let message = extract_message(headers.get(CONTENT_TYPE), body, default_charset);
        Self::from_status(status_code, message)
    }

    /// The category of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotModified { .. } => ErrorKind::NotModified,
            Self::BadRequest { .. } => ErrorKind::BadRequest,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NotAcceptable { .. } => ErrorKind::NotAcceptable,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::InternalServerError { .. } => ErrorKind::InternalServerError,
            Self::Generic { .. } => ErrorKind::Generic,
        }
    }

    /// The HTTP status code this error was created from
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotModified { .. } => StatusCode::NOT_MODIFIED,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Generic { status_code, .. } => *status_code,
        }
    }

    /// The message sent by the engine, if any
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::NotModified { message }
            | Self::BadRequest { message }
            | Self::Unauthorized { message }
            | Self::NotFound { message }
            | Self::NotAcceptable { message }
            | Self::Conflict { message }
            | Self::InternalServerError { message }
            | Self::Generic { message, .. } => message.as_deref(),
        }
    }

    /// Replace the message carried by this error
    #[must_use]
    pub fn with_message(mut self, message: Option<String>) -> Self {
        match &mut self {
            Self::NotModified { message: slot }
            | Self::BadRequest { message: slot }
            | Self::Unauthorized { message: slot }
            | Self::NotFound { message: slot }
            | Self::NotAcceptable { message: slot }
            | Self::Conflict { message: slot }
            | Self::InternalServerError { message: slot }
            | Self::Generic { message: slot, .. } => *slot = message,
        }

        self
    }

    /// Consume the error, returning its message
    #[must_use]
    pub fn into_message(self) -> Option<String> {
        match self {
            Self::NotModified { message }
            | Self::BadRequest { message }
            | Self::Unauthorized { message }
            | Self::NotFound { message }
            | Self::NotAcceptable { message }
            | Self::Conflict { message }
            | Self::InternalServerError { message }
            | Self::Generic { message, .. } => message,
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status_code = self.status_code().as_u16();
        if let Some(message) = self.message() {
            write!(f, "Status {status_code}: {message}")
        } else {
            write!(f, "Status {status_code}: (no message)")
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use encoding_rs::UTF_8;
    use http::HeaderValue;

    use super::*;

    #[test]
    fn success_codes_are_not_errors() {
        for status_code in [StatusCode::OK, StatusCode::CREATED, StatusCode::NO_CONTENT] {
            assert!(is_success(status_code));
            assert_eq!(
                EngineError::from_status(status_code, Some("ignored".to_owned())),
                None
            );
        }

        // Other 2xx codes are not considered successful
        assert!(!is_success(StatusCode::ACCEPTED));
        assert_eq!(
            EngineError::from_status(StatusCode::ACCEPTED, None).map(|e| e.kind()),
            Some(ErrorKind::Generic)
        );
    }

    #[test]
    fn every_status_code_agrees_with_is_success() {
        for code in 100..=599 {
            let status_code = StatusCode::from_u16(code).unwrap();
            assert_eq!(
                EngineError::from_status(status_code, None).is_none(),
                is_success(status_code),
                "status {code}"
            );
        }
    }

    #[test]
    fn mapped_codes() {
        let cases = [
            (StatusCode::NOT_MODIFIED, ErrorKind::NotModified),
            (StatusCode::BAD_REQUEST, ErrorKind::BadRequest),
            (StatusCode::UNAUTHORIZED, ErrorKind::Unauthorized),
            (StatusCode::NOT_FOUND, ErrorKind::NotFound),
            (StatusCode::NOT_ACCEPTABLE, ErrorKind::NotAcceptable),
            (StatusCode::CONFLICT, ErrorKind::Conflict),
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::InternalServerError,
            ),
        ];

        for (status_code, kind) in cases {
            let error = EngineError::from_status(status_code, Some("boom".to_owned()))
                .expect("status code should map to an error");
            assert_eq!(error.kind(), kind);
            assert_eq!(error.status_code(), status_code);
            assert_eq!(error.message(), Some("boom"));

            let error = error.with_message(None);
            assert_eq!(error.kind(), kind);
            assert_eq!(error.message(), None);
        }
    }

    #[test]
    fn unmapped_codes_keep_their_status() {
        for status_code in [
            StatusCode::IM_A_TEAPOT,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::FORBIDDEN,
            StatusCode::MOVED_PERMANENTLY,
        ] {
            let error = EngineError::from_status(status_code, None)
                .expect("status code should map to an error");
            assert_eq!(
                error,
                EngineError::Generic {
                    status_code,
                    message: None
                }
            );
            assert_eq!(error.status_code(), status_code);
        }
    }

    #[test]
    fn from_parts_reads_the_body() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let error = EngineError::from_parts(
            StatusCode::NOT_FOUND,
            &headers,
            br#"{"message":"no such container: foo"}"#,
            UTF_8,
        )
        .expect("404 should map to an error");

        assert_eq!(
            error,
            EngineError::NotFound {
                message: Some("no such container: foo".to_owned())
            }
        );

        let error = EngineError::from_parts(StatusCode::NOT_FOUND, &HeaderMap::new(), b"", UTF_8)
            .expect("404 should map to an error");
        assert_eq!(error.into_message(), None);

        assert!(EngineError::from_parts(StatusCode::OK, &headers, b"{}", UTF_8).is_none());
    }

    #[test]
    fn display() {
        let error = EngineError::Conflict {
            message: Some("container name already in use".to_owned()),
        };
        insta::assert_snapshot!(error, @"Status 409: container name already in use");

        let error = EngineError::Generic {
            status_code: StatusCode::SERVICE_UNAVAILABLE,
            message: None,
        };
        insta::assert_snapshot!(error, @"Status 503: (no message)");
    }
}
