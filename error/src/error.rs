// Copyright 2022 SphereEx Authors
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

use std::io::Error as IoError;

use serde_json::Error as JsonError;
use strategy::sharding_rewrite::ShardingRewriteError;
use thiserror::Error as ThisError;
use toml::de::Error as TomlError;

#[derive(Debug, ThisError)]
pub enum ErrorKind {
    #[error("rewrite error: {0}")]
    Rewrite(#[from] ShardingRewriteError),

    #[error("stdio error: {0:?}")]
    Io(#[from] IoError),

    #[error("config error: {0}")]
    Toml(#[from] TomlError),

    #[error("json error: {0}")]
    Json(#[from] JsonError),
}

#[derive(Debug, ThisError)]
#[error("{kind}")]
pub struct Error {
    kind: ErrorKind,
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

macro_rules! impl_from_for_error {
    ($($source:ty),*) => {
        $(
            impl From<$source> for Error {
                fn from(err: $source) -> Self {
                    Error::new(ErrorKind::from(err))
                }
            }
        )*
    };
}

impl_from_for_error!(ShardingRewriteError, IoError, TomlError, JsonError);

impl Error {
    pub fn new(kind: ErrorKind) -> Error {
        Error { kind }
    }
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}
