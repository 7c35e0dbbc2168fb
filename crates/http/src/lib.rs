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

//! [`tower`] layers for HTTP clients talking to a container engine API

mod config;
mod ext;
mod layers;

pub use dockhand_errors::{EngineError, ErrorKind};

pub use self::{
    config::{ConfigurationSection, ResponseStatusConfig},
    ext::HttpServiceExt,
    layers::response_status::{self, ResponseStatus, ResponseStatusLayer},
};
