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

use http::Request;
use tower::Service;

use crate::{ResponseStatus, ResponseStatusConfig};

pub trait HttpServiceExt<Body>: Sized {
    /// Turn non-success responses of the engine into
    /// [`EngineError`](dockhand_errors::EngineError)s, decoding error bodies
    /// as UTF-8 when they don't declare a charset
    fn catch_engine_errors(self) -> ResponseStatus<Self> {
        self.catch_engine_errors_with(&ResponseStatusConfig::default())
    }

    fn catch_engine_errors_with(self, config: &ResponseStatusConfig) -> ResponseStatus<Self> {
        ResponseStatus::new(self, config)
    }
}

impl<S, B> HttpServiceExt<B> for S where S: Service<Request<B>> {}
