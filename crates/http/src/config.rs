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

use encoding_rs::{Encoding, UTF_8};
use figment::{error::Error as FigmentError, Figment};
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Trait implemented by configuration sections to help loading them from a
/// [`Figment`]
pub trait ConfigurationSection: Sized + DeserializeOwned {
    /// Specify where this section should live relative to the root.
    const PATH: Option<&'static str> = None;

    /// Validate the configuration section
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    fn validate(&self, _figment: &Figment) -> Result<(), FigmentError> {
        Ok(())
    }

    /// Extract configuration from a Figment instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration could not be loaded
    fn extract(figment: &Figment) -> Result<Self, FigmentError> {
        let this: Self = if let Some(path) = Self::PATH {
            figment.extract_inner(path)?
        } else {
            figment.extract()?
        };

        this.validate(figment)?;
        Ok(this)
    }

    /// Extract the configuration section from the given [`Figment`], or
    /// return the default value if the section is not present.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration section is invalid.
    fn extract_or_default(figment: &Figment) -> Result<Self, FigmentError>
    where
        Self: Default,
    {
        if let Some(path) = Self::PATH {
            if !figment.contains(path) {
                return Ok(Self::default());
            }
        }

        Self::extract(figment)
    }
}

const SECTION: &str = "engine";

fn default_charset() -> String {
    "utf-8".to_owned()
}

fn is_default_charset(value: &str) -> bool {
    value.eq_ignore_ascii_case("utf-8")
}

/// How responses from the container engine are inspected
#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
pub struct ResponseStatusConfig {
    /// Charset used to decode error response bodies which don't declare one.
    /// Accepts any WHATWG encoding label. Defaults to `utf-8`.
    #[serde(
        default = "default_charset",
        skip_serializing_if = "is_default_charset"
    )]
    pub default_charset: String,
}

impl Default for ResponseStatusConfig {
    fn default() -> Self {
        Self {
            default_charset: default_charset(),
        }
    }
}

impl ResponseStatusConfig {
    /// The encoding named by `default_charset`, or UTF-8 if the label is
    /// unknown
    #[must_use]
    pub fn default_encoding(&self) -> &'static Encoding {
        Encoding::for_label(self.default_charset.as_bytes()).unwrap_or(UTF_8)
    }
}

impl ConfigurationSection for ResponseStatusConfig {
    const PATH: Option<&'static str> = Some(SECTION);

    fn validate(&self, figment: &Figment) -> Result<(), FigmentError> {
        if Encoding::for_label(self.default_charset.as_bytes()).is_none() {
            let mut error = FigmentError::from(format!(
                "unknown charset {:?}",
                self.default_charset
            ));
            error.metadata = figment.find_metadata(SECTION).cloned();
            error.profile = Some(figment::Profile::Default);
            error.path = vec![SECTION.to_owned(), "default_charset".to_owned()];
            return Err(error);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use encoding_rs::WINDOWS_1252;
    use figment::{
        providers::{Env, Format, Yaml},
        Figment, Jail,
    };

    use super::*;

    fn figment() -> Figment {
        Figment::new()
            .merge(Yaml::file("config.yaml"))
            .merge(Env::prefixed("DOCKHAND_").split("__"))
    }

    #[test]
    fn load_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                  engine:
                    default_charset: latin1
                ",
            )?;

            let config = ResponseStatusConfig::extract(&figment())?;

            assert_eq!(config.default_charset, "latin1");
            assert_eq!(config.default_encoding(), WINDOWS_1252);
            assert!(!is_default_charset(&config.default_charset));

            Ok(())
        });
    }

    #[test]
    fn load_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("DOCKHAND_ENGINE__DEFAULT_CHARSET", "windows-1252");

            let config = ResponseStatusConfig::extract(&figment())?;
            assert_eq!(config.default_encoding(), WINDOWS_1252);

            Ok(())
        });
    }

    #[test]
    fn missing_section_uses_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                  something_else: true
                ",
            )?;

            let config = ResponseStatusConfig::extract_or_default(&figment())?;

            assert!(is_default_charset(&config.default_charset));
            assert_eq!(config.default_encoding(), UTF_8);

            Ok(())
        });
    }

    #[test]
    fn unknown_charset_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                  engine:
                    default_charset: klingon
                ",
            )?;

            let error = ResponseStatusConfig::extract(&figment())
                .expect_err("unknown charset should be rejected");
            assert_eq!(error.path, vec!["engine", "default_charset"]);

            Ok(())
        });
    }
}
