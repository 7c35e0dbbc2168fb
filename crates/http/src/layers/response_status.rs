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

use bytes::Bytes;
use dockhand_errors::{extract_message, EngineError};
use encoding_rs::Encoding;
use futures_util::future::BoxFuture;
use http::{header::CONTENT_TYPE, Request, Response, StatusCode};
use http_body::Body;
use http_body_util::BodyExt;
use thiserror::Error;
use tower::{Layer, Service};
use tracing::debug;

use crate::ResponseStatusConfig;

#[derive(Debug, Error)]
pub enum Error<S> {
    #[error(transparent)]
    Service { inner: S },

    #[error(transparent)]
    Engine { inner: EngineError },
}

impl<S> Error<S> {
    fn service(inner: S) -> Self {
        Self::Service { inner }
    }

    fn engine(inner: EngineError) -> Self {
        Self::Engine { inner }
    }

    /// The status code of the response, if the engine answered with an error
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Service { .. } => None,
            Self::Engine { inner } => Some(inner.status_code()),
        }
    }

    /// The error sent by the engine, if the request reached it
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            Self::Service { .. } => None,
            Self::Engine { inner } => Some(inner),
        }
    }
}

/// A service which turns every response of the engine which is not a
/// `200 OK`, `201 Created` or `204 No Content` into an [`EngineError`].
///
/// Successful responses are passed through untouched, without reading their
/// body. For error responses, the body is fully read to extract a message.
#[derive(Clone)]
pub struct ResponseStatus<S> {
    inner: S,
    default_charset: &'static Encoding,
}

impl<S> ResponseStatus<S> {
    pub fn new(inner: S, config: &ResponseStatusConfig) -> Self {
        Self {
            inner,
            default_charset: config.default_encoding(),
        }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ResponseStatus<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    ResBody: Body + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Display,
{
    type Error = Error<S::Error>;
    type Response = Response<ResBody>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Error::service)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let inner = self.inner.call(request);
        let default_charset = self.default_charset;

        let fut = async move {
            let response = inner.await.map_err(Error::service)?;

            let Some(error) = EngineError::from_status(response.status(), None) else {
                return Ok(response);
            };

            let (parts, body) = response.into_parts();
            let body = read_body(body).await;
            let message = extract_message(parts.headers.get(CONTENT_TYPE), &body, default_charset);
            let error = error.with_message(message);

            debug!(
                http.status_code = parts.status.as_u16(),
                kind = ?error.kind(),
                "engine answered with an error"
            );

            Err(Error::engine(error))
        };

        Box::pin(fut)
    }
}

/// Read the whole body. A body which can't be read is treated as empty.
async fn read_body<B>(body: B) -> Bytes
where
    B: Body,
    B::Error: Display,
{
    match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            debug!("failed to read engine error response body: {err}");
            Bytes::new()
        }
    }
}

#[derive(Clone, Copy)]
pub struct ResponseStatusLayer {
    default_charset: &'static Encoding,
}

impl ResponseStatusLayer {
    #[must_use]
    pub fn new(config: &ResponseStatusConfig) -> Self {
        Self {
            default_charset: config.default_encoding(),
        }
    }
}

impl Default for ResponseStatusLayer {
    fn default() -> Self {
        Self::new(&ResponseStatusConfig::default())
    }
}

impl<S> Layer<S> for ResponseStatusLayer {
    type Service = ResponseStatus<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResponseStatus {
            inner,
            default_charset: self.default_charset,
        }
    }
}
