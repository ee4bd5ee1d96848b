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

use std::{env, ffi::OsString, fs};

use clap::{Arg, Command};
use pisa_error::error::Error;
use serde::{Deserialize, Serialize};
use strategy::config::ShardingRuleConfig;
use tracing::trace;

use crate::env_const::*;

#[derive(Default, Clone, Debug, PartialEq)]
pub struct RewriteConfigBuilder {
    pub _config_path: String,
    pub _case_path: String,
    pub _log_level: String,
}

impl RewriteConfigBuilder {
    pub fn new() -> Self {
        RewriteConfigBuilder::default()
    }

    pub fn build_from_cmd(self) -> Self {
        self.build_from_args(env::args_os())
    }

    pub fn build_from_args<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Command::new("sharding-rewrite")
            .about("Rewrite a sharded statement for every routing unit")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .help("Sharding rule config path")
                    .takes_value(true),
            )
            .arg(Arg::new("case").long("case").help("Rewrite case path").takes_value(true))
            .arg(Arg::new("loglevel").long("log-level").help("Log level").takes_value(true))
            .get_matches_from(args);

        if let Some(path) = matches.value_of("config") {
            self._config_path = path.to_string();
        }
        if let Some(path) = matches.value_of("case") {
            self._case_path = path.to_string();
        }
        if let Some(loglevel) = matches.value_of("loglevel") {
            self._log_level = loglevel.to_string();
        }

        self
    }

    pub fn build_from_env(mut self) -> Self {
        self._config_path = env::var(ENV_SHARDING_REWRITE_CONFIG).unwrap_or_default();
        self._case_path = env::var(ENV_SHARDING_REWRITE_CASE).unwrap_or_default();
        self._log_level = env::var(ENV_SHARDING_REWRITE_LOG_LEVEL).unwrap_or_default();
        self
    }

    pub fn build_from_str(content: &str) -> Result<RewriteConfig, Error> {
        Ok(toml::from_str(content)?)
    }

    pub fn build_from_file(path: &str) -> Result<RewriteConfig, Error> {
        let content = fs::read_to_string(path)?;
        Self::build_from_str(&content)
    }

    // Values set on `self` win over `fallback`.
    pub fn merge(self, fallback: RewriteConfigBuilder) -> Self {
        let pick = |val: String, fallback: String| if val.is_empty() { fallback } else { val };

        RewriteConfigBuilder {
            _config_path: pick(self._config_path, fallback._config_path),
            _case_path: pick(self._case_path, fallback._case_path),
            _log_level: pick(self._log_level, fallback._log_level),
        }
    }

    pub fn build(self) -> Result<RewriteConfig, Error> {
        let config_path = if self._config_path.is_empty() {
            DEFAULT_LOCAL_CONFIG
        } else {
            self._config_path.as_str()
        };
        let mut config = Self::build_from_file(config_path)?;

        if !self._log_level.is_empty() {
            config.admin.log_level = self._log_level;
        }
        if config.admin.log_level.is_empty() {
            config.admin.log_level = DEFAULT_LOG_LEVEL.to_string();
        }

        config.case_path = if self._case_path.is_empty() {
            DEFAULT_CASE_PATH.to_string()
        } else {
            self._case_path
        };

        trace!("configs: {:#?}", config);
        Ok(config)
    }

    /// Command line over environment over config file.
    pub fn load_config(self) -> Result<RewriteConfig, Error> {
        let cmd_builder = RewriteConfigBuilder::default().build_from_cmd();
        let env_builder = RewriteConfigBuilder::default().build_from_env();

        self.merge(cmd_builder).merge(env_builder).build()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Admin {
    #[serde(default)]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RewriteConfig {
    #[serde(default)]
    pub admin: Admin,
    #[serde(default)]
    pub sharding: ShardingRuleConfig,
    #[serde(skip)]
    pub case_path: String,
}

#[cfg(test)]
mod test {
    use pisa_error::error::ErrorKind;
    use strategy::{config::TableRuleConfig, rule::ShardingRule};

    use super::RewriteConfigBuilder;

    const CONFIG: &str = r#"
[admin]
log_level = "DEBUG"

[sharding]
binding_tables = [["t_order", "t_order_item"]]
broadcast_tables = ["t_config"]

[[sharding.table]]
logic_table = "t_order"
actual_datanodes = ["ds0.t_order_0", "ds1.t_order_1"]

[[sharding.table]]
logic_table = "t_order_item"
actual_datanodes = ["ds0.t_order_item_0", "ds1.t_order_item_1"]
"#;

    #[test]
    fn test_build_from_str() {
        let config = RewriteConfigBuilder::build_from_str(CONFIG).unwrap();
        assert_eq!(config.admin.log_level, "DEBUG");
        assert_eq!(config.sharding.tables.len(), 2);
        assert_eq!(
            config.sharding.tables[0],
            TableRuleConfig::new("t_order", &["ds0.t_order_0", "ds1.t_order_1"])
        );
        assert_eq!(config.sharding.binding_tables, vec![vec!["t_order", "t_order_item"]]);

        let rule = ShardingRule::new(config.sharding).unwrap();
        assert!(rule.is_broadcast_table("t_config"));
        assert!(rule.find_binding_table_rule("t_order").is_some());
    }

    #[test]
    fn test_build_from_str_defaults() {
        let config = RewriteConfigBuilder::build_from_str("").unwrap();
        assert!(config.admin.log_level.is_empty());
        assert!(config.sharding.tables.is_empty());

        let err =
            RewriteConfigBuilder::build_from_str("[sharding]\nbroadcast_tables = 1").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Toml(_)));
    }

    #[test]
    fn test_build_from_args() {
        let builder = RewriteConfigBuilder::new().build_from_args(vec![
            "sharding-rewrite",
            "-c",
            "rules.toml",
            "--log-level",
            "trace",
        ]);
        assert_eq!(builder._config_path, "rules.toml");
        assert_eq!(builder._log_level, "trace");
        assert!(builder._case_path.is_empty());
    }

    #[test]
    fn test_merge() {
        let cmd = RewriteConfigBuilder { _log_level: "debug".to_string(), ..Default::default() };
        let env = RewriteConfigBuilder {
            _config_path: "env.toml".to_string(),
            _log_level: "error".to_string(),
            ..Default::default()
        };
        let merged = RewriteConfigBuilder::new().merge(cmd).merge(env);
        assert_eq!(merged._config_path, "env.toml");
        assert_eq!(merged._log_level, "debug");
        assert!(merged._case_path.is_empty());
    }

    #[test]
    fn test_build_missing_file() {
        let builder = RewriteConfigBuilder {
            _config_path: "does/not/exist.toml".to_string(),
            ..Default::default()
        };
        let err = builder.build().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Io(_)));
    }
}
