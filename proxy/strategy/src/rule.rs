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

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use tracing::trace;

use crate::{
    config::{ShardingRuleConfig, TableRuleConfig},
    route::RoutingUnit,
    sharding_rewrite::{rewrite_const::DATA_NODE_DELIMITER, ShardingRewriteError},
};

/// Lower-cased logic table name to actual table name for one routing unit.
pub type LogicAndActualTables = IndexMap<String, String>;

/// One physical (datasource, table) location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataNode {
    data_source_name: String,
    table_name: String,
}

impl DataNode {
    pub fn new(data_source_name: &str, table_name: &str) -> Self {
        DataNode {
            data_source_name: data_source_name.to_string(),
            table_name: table_name.to_string(),
        }
    }

    pub fn get_data_source_name(&self) -> &str {
        &self.data_source_name
    }

    pub fn get_table_name(&self) -> &str {
        &self.table_name
    }
}

impl FromStr for DataNode {
    type Err = ShardingRewriteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(DATA_NODE_DELIMITER) {
            Some((ds, table)) if !ds.trim().is_empty() && !table.trim().is_empty() => {
                Ok(DataNode::new(ds.trim(), table.trim()))
            }
            _ => Err(ShardingRewriteError::InvalidDataNode(s.to_string())),
        }
    }
}

impl fmt::Display for DataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.data_source_name, DATA_NODE_DELIMITER, self.table_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRule {
    logic_table: String,
    actual_datanodes: Vec<DataNode>,
}

impl TableRule {
    pub fn new(config: &TableRuleConfig) -> Result<Self, ShardingRewriteError> {
        let actual_datanodes = config
            .actual_datanodes
            .iter()
            .map(|x| x.parse::<DataNode>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TableRule { logic_table: config.logic_table.to_lowercase(), actual_datanodes })
    }

    pub fn get_logic_table(&self) -> &str {
        &self.logic_table
    }

    pub fn get_actual_datanodes(&self) -> &[DataNode] {
        &self.actual_datanodes
    }

    /// Actual table names living on `data_source_name`, in configuration order.
    pub fn get_actual_table_names(&self, data_source_name: &str) -> Vec<&str> {
        self.actual_datanodes
            .iter()
            .filter(|x| x.data_source_name.eq_ignore_ascii_case(data_source_name))
            .map(|x| x.table_name.as_str())
            .collect()
    }

    /// Position of `actual_table_name` among the tables of `data_source_name`.
    pub fn find_actual_table_index(
        &self,
        data_source_name: &str,
        actual_table_name: &str,
    ) -> Option<usize> {
        self.get_actual_table_names(data_source_name)
            .iter()
            .position(|x| x.eq_ignore_ascii_case(actual_table_name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BindingTableRule {
    table_rules: Vec<TableRule>,
}

impl BindingTableRule {
    pub fn has_logic_table(&self, logic_table: &str) -> bool {
        self.table_rules.iter().any(|x| x.logic_table.eq_ignore_ascii_case(logic_table))
    }

    pub fn get_table_rules(&self) -> &[TableRule] {
        &self.table_rules
    }

    /// Actual table of `logic_table` that sits at the same index as `other_actual_table`
    /// on `data_source_name`.
    pub fn get_binding_actual_table(
        &self,
        data_source_name: &str,
        logic_table: &str,
        other_actual_table: &str,
    ) -> Result<String, ShardingRewriteError> {
        let not_found = || ShardingRewriteError::BindingActualTableNotFound {
            data_source: data_source_name.to_string(),
            actual_table: other_actual_table.to_string(),
        };

        let idx = self
            .table_rules
            .iter()
            .find_map(|x| x.find_actual_table_index(data_source_name, other_actual_table))
            .ok_or_else(not_found)?;

        let rule = self
            .table_rules
            .iter()
            .find(|x| x.logic_table.eq_ignore_ascii_case(logic_table))
            .ok_or_else(|| ShardingRewriteError::TableRuleNotFound(logic_table.to_string()))?;

        rule.get_actual_table_names(data_source_name)
            .get(idx)
            .map(|x| x.to_lowercase())
            .ok_or_else(not_found)
    }

    /// Mapping for every other member of the group that the statement references.
    pub fn get_logic_and_actual_tables(
        &self,
        data_source_name: &str,
        logic_table: &str,
        actual_table: &str,
        logic_table_names: &[String],
    ) -> Result<LogicAndActualTables, ShardingRewriteError> {
        let mut result = LogicAndActualTables::new();
        for rule in self.table_rules.iter() {
            if rule.logic_table.eq_ignore_ascii_case(logic_table) {
                continue;
            }

            if !logic_table_names.iter().any(|x| x.eq_ignore_ascii_case(&rule.logic_table)) {
                continue;
            }

            let target =
                self.get_binding_actual_table(data_source_name, &rule.logic_table, actual_table)?;
            result.insert(rule.logic_table.clone(), target);
        }

        Ok(result)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShardingRule {
    table_rules: Vec<TableRule>,
    binding_table_rules: Vec<BindingTableRule>,
    broadcast_tables: Vec<String>,
}

impl ShardingRule {
    pub fn new(config: ShardingRuleConfig) -> Result<Self, ShardingRewriteError> {
        let table_rules = config.tables.iter().map(TableRule::new).collect::<Result<Vec<_>, _>>()?;

        let mut binding_table_rules = Vec::with_capacity(config.binding_tables.len());
        for group in config.binding_tables.iter() {
            let rules = group
                .iter()
                .map(|name| {
                    table_rules
                        .iter()
                        .find(|x| x.logic_table.eq_ignore_ascii_case(name))
                        .cloned()
                        .ok_or_else(|| ShardingRewriteError::TableRuleNotFound(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            binding_table_rules.push(BindingTableRule { table_rules: rules });
        }

        Ok(ShardingRule {
            table_rules,
            binding_table_rules,
            broadcast_tables: config.broadcast_tables.iter().map(|x| x.to_lowercase()).collect(),
        })
    }

    pub fn get_table_rules(&self) -> &[TableRule] {
        &self.table_rules
    }

    pub fn find_table_rule(&self, logic_table: &str) -> Option<&TableRule> {
        self.table_rules.iter().find(|x| x.logic_table.eq_ignore_ascii_case(logic_table))
    }

    pub fn is_broadcast_table(&self, logic_table: &str) -> bool {
        self.broadcast_tables.iter().any(|x| x.eq_ignore_ascii_case(logic_table))
    }

    pub fn find_binding_table_rule(&self, logic_table: &str) -> Option<&BindingTableRule> {
        self.binding_table_rules.iter().find(|x| x.has_logic_table(logic_table))
    }

    /// Build the table name mapping used to render SQL for `routing_unit`.
    /// `table_names` are the logic tables referenced by the statement.
    pub fn get_logic_and_actual_tables(
        &self,
        routing_unit: &RoutingUnit,
        table_names: &[String],
    ) -> Result<LogicAndActualTables, ShardingRewriteError> {
        let mut result = LogicAndActualTables::new();
        for unit in routing_unit.get_table_units() {
            result.insert(unit.logic_table_name.to_lowercase(), unit.actual_table_name.clone());

            if let Some(binding) = self.find_binding_table_rule(&unit.logic_table_name) {
                let tables = binding.get_logic_and_actual_tables(
                    routing_unit.get_master_slave_logic_data_source_name(),
                    &unit.logic_table_name,
                    &unit.actual_table_name,
                    table_names,
                )?;
                result.extend(tables);
            }
        }

        trace!(
            "logic and actual tables of {:?}: {:?}",
            routing_unit.get_data_source_name(),
            result
        );
        Ok(result)
    }
}
