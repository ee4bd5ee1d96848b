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

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ShardingRuleConfig {
    #[serde(rename = "table", default)]
    pub tables: Vec<TableRuleConfig>,
    // Groups of logic tables sharing the same sharding layout.
    #[serde(default)]
    pub binding_tables: Vec<Vec<String>>,
    #[serde(default)]
    pub broadcast_tables: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TableRuleConfig {
    pub logic_table: String,
    // Each node is written as `<datasource>.<table>`
    pub actual_datanodes: Vec<String>,
}

impl TableRuleConfig {
    pub fn new(logic_table: &str, actual_datanodes: &[&str]) -> Self {
        TableRuleConfig {
            logic_table: logic_table.to_string(),
            actual_datanodes: actual_datanodes.iter().map(|x| x.to_string()).collect(),
        }
    }
}
