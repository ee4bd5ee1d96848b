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

pub mod condition;
pub mod rewrite_const;

use serde::Serialize;
use tracing::{debug, trace};

use self::condition::{ShardingCondition, ShardingConditions};
use crate::{
    rewrite::{
        parameter::{ParamValue, ParameterBuilder},
        SqlRewriteContext, SqlRewriteEngine, SqlRewriteResult,
    },
    route::{RoutingResult, RoutingUnit},
    rule::{LogicAndActualTables, ShardingRule},
};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ShardingRewriteError {
    #[error("standard parameter builder has no parameter groups")]
    GroupedAccessOnStandard,

    #[error("parameter group index {index} out of range, group count is {count}")]
    GroupIndexOutOfRange { index: usize, count: usize },

    #[error("sharding conditions count {conditions} does not match parameter group count {groups}")]
    ConditionsGroupsMismatch { conditions: usize, groups: usize },

    #[error("parameter index {index} out of range, parameter count is {count}")]
    ParameterIndexOutOfRange { index: usize, count: usize },

    #[error("invalid data node {0:?}, expected `<datasource>.<table>`")]
    InvalidDataNode(String),

    #[error("table rule not found {0:?}")]
    TableRuleNotFound(String),

    #[error("actual table [{data_source}].[{actual_table}] is not in table config")]
    BindingActualTableNotFound { data_source: String, actual_table: String },

    #[error("invalid sql token span {start}..{stop}")]
    InvalidToken { start: usize, stop: usize },
}

/// Rewrites one logical statement for a single routing unit.
#[derive(Debug)]
pub struct ShardingSqlRewriteEngine<'a> {
    sharding_conditions: &'a ShardingConditions,
    routing_unit: &'a RoutingUnit,
    logic_and_actual_tables: LogicAndActualTables,
}

impl<'a> ShardingSqlRewriteEngine<'a> {
    pub fn new(
        sharding_conditions: &'a ShardingConditions,
        routing_unit: &'a RoutingUnit,
        logic_and_actual_tables: LogicAndActualTables,
    ) -> Self {
        ShardingSqlRewriteEngine { sharding_conditions, routing_unit, logic_and_actual_tables }
    }

    fn get_parameters(
        &self,
        parameter_builder: &ParameterBuilder,
    ) -> Result<Vec<ParamValue>, ShardingRewriteError> {
        let grouped = match parameter_builder {
            ParameterBuilder::Standard(builder) => return Ok(builder.get_parameters()),
            ParameterBuilder::Grouped(grouped) => grouped,
        };

        if self.sharding_conditions.is_empty() {
            debug!("no sharding conditions, keep all parameters");
            return Ok(grouped.get_parameters());
        }

        if grouped.is_empty() {
            return Ok(vec![]);
        }

        let conditions = self.sharding_conditions.get_conditions();
        let groups = grouped.get_builders();
        if conditions.len() != groups.len() {
            return Err(ShardingRewriteError::ConditionsGroupsMismatch {
                conditions: conditions.len(),
                groups: groups.len(),
            });
        }

        let data_source_name = self.routing_unit.get_data_source_name();
        let mut result = Vec::with_capacity(groups.iter().map(|x| x.len()).sum());
        for (idx, (condition, group)) in conditions.iter().zip(groups).enumerate() {
            if self.is_in_same_data_node(condition) {
                trace!("batch item {} routed to {:?}", idx, data_source_name);
                result.extend(group.get_parameters());
            } else {
                trace!("batch item {} skipped for {:?}", idx, data_source_name);
            }
        }

        Ok(result)
    }

    // A condition without data nodes matches every routing unit.
    fn is_in_same_data_node(&self, condition: &ShardingCondition) -> bool {
        let data_nodes = condition.get_data_nodes();
        if data_nodes.is_empty() {
            return true;
        }

        data_nodes
            .iter()
            .any(|x| self.routing_unit.contains(x.get_data_source_name(), x.get_table_name()))
    }
}

impl SqlRewriteEngine for ShardingSqlRewriteEngine<'_> {
    fn rewrite(
        &self,
        context: &SqlRewriteContext,
    ) -> Result<SqlRewriteResult, ShardingRewriteError> {
        let sql = context
            .get_sql_builder()
            .to_routed_sql(self.routing_unit, &self.logic_and_actual_tables);
        let parameters = self.get_parameters(context.get_parameter_builder())?;
        Ok(SqlRewriteResult { sql, parameters })
    }
}

/// Physical SQL and parameters bound to the datasource that runs them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionUnit {
    pub data_source_name: String,
    pub sql_unit: SqlRewriteResult,
}

/// Rewrite `context` once per routing unit of `routing_result`.
/// `table_names` are the logic tables referenced by the statement.
pub fn build_execution_units(
    rule: &ShardingRule,
    sharding_conditions: &ShardingConditions,
    routing_result: &RoutingResult,
    table_names: &[String],
    context: &SqlRewriteContext,
) -> Result<Vec<ExecutionUnit>, ShardingRewriteError> {
    routing_result
        .get_routing_units()
        .iter()
        .map(|unit| {
            let tables = rule.get_logic_and_actual_tables(unit, table_names)?;
            let sql_unit =
                ShardingSqlRewriteEngine::new(sharding_conditions, unit, tables).rewrite(context)?;
            debug!("rewrite to {:?}: {:?}", unit.get_data_source_name(), sql_unit.sql);
            Ok(ExecutionUnit {
                data_source_name: unit.get_data_source_name().to_string(),
                sql_unit,
            })
        })
        .collect()
}
