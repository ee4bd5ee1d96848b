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

pub const DEFAULT_LOCAL_CONFIG: &str = "etc/config.toml";
pub const DEFAULT_CASE_PATH: &str = "etc/case.json";
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

pub const ENV_SHARDING_REWRITE_CONFIG: &str = "SHARDING_REWRITE_CONFIG";
pub const ENV_SHARDING_REWRITE_CASE: &str = "SHARDING_REWRITE_CASE";
pub const ENV_SHARDING_REWRITE_LOG_LEVEL: &str = "SHARDING_REWRITE_LOG_LEVEL";
