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

mod case;

use std::{fs, str::FromStr};

use config::config::{RewriteConfig, RewriteConfigBuilder};
use pisa_error::error::Error;
use strategy::rule::ShardingRule;
use tracing::{error, info, Level};

use crate::case::RewriteCase;

fn main() {
    let config = match RewriteConfigBuilder::new().load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("load config err: {}", e);
            std::process::exit(-1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(Level::from_str(config.admin.log_level.as_str()).ok())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&config) {
        error!("rewrite err: {}", e);
        std::process::exit(1);
    }
}

fn run(config: &RewriteConfig) -> Result<(), Error> {
    let rule = ShardingRule::new(config.sharding.clone())?;
    info!("loaded {} table rules", rule.get_table_rules().len());

    let content = fs::read_to_string(&config.case_path)?;
    let case: RewriteCase = serde_json::from_str(&content)?;
    info!("rewrite {:?} for {} routing units", case.sql, case.routing_units.len());

    let units = case.rewrite(&rule)?;
    println!("{}", serde_json::to_string_pretty(&units)?);
    Ok(())
}
