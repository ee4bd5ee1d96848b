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

use pisa_error::error::Error;
use serde::{Deserialize, Serialize};
use strategy::{
    rewrite::{
        parameter::{ParamValue, ParameterBuilder, StandardParameterBuilder},
        sql_builder::{TableToken, TableTokenSqlBuilder},
        SqlRewriteContext,
    },
    route::{RoutingResult, RoutingUnit, TableUnit},
    rule::{DataNode, ShardingRule},
    sharding_rewrite::{
        build_execution_units,
        condition::{ShardingCondition, ShardingConditions},
        ExecutionUnit, ShardingRewriteError,
    },
};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CaseParameters {
    Standard(Vec<ParamValue>),
    Grouped(Vec<Vec<ParamValue>>),
}

impl Default for CaseParameters {
    fn default() -> Self {
        CaseParameters::Standard(vec![])
    }
}

/// Edit queued on a parameter builder. Without `group` the edit applies to the
/// standard builder, or to every group of a grouped one.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CaseParameterEdit {
    Add {
        #[serde(default)]
        group: Option<usize>,
        index: usize,
        values: Vec<ParamValue>,
    },
    Replace {
        #[serde(default)]
        group: Option<usize>,
        index: usize,
        value: ParamValue,
    },
    Remove {
        #[serde(default)]
        group: Option<usize>,
        index: usize,
    },
}

impl CaseParameterEdit {
    fn get_group(&self) -> Option<usize> {
        match self {
            Self::Add { group, .. } | Self::Replace { group, .. } | Self::Remove { group, .. } => {
                *group
            }
        }
    }

    fn apply(&self, builder: &mut StandardParameterBuilder) -> Result<(), ShardingRewriteError> {
        match self {
            Self::Add { index, values, .. } => {
                builder.add_added_parameters(*index, values.clone());
                Ok(())
            }
            Self::Replace { index, value, .. } => {
                builder.add_replaced_parameter(*index, value.clone())
            }
            Self::Remove { index, .. } => builder.add_removed_parameter(*index),
        }
    }

    fn apply_to(
        &self,
        parameter_builder: &mut ParameterBuilder,
    ) -> Result<(), ShardingRewriteError> {
        match (parameter_builder, self.get_group()) {
            (ParameterBuilder::Standard(builder), None) => self.apply(builder),
            (ParameterBuilder::Standard(_), Some(_)) => {
                Err(ShardingRewriteError::GroupedAccessOnStandard)
            }
            (ParameterBuilder::Grouped(grouped), None) => {
                grouped.get_builders_mut().iter_mut().try_for_each(|x| self.apply(x))
            }
            (ParameterBuilder::Grouped(grouped), Some(index)) => {
                let count = grouped.group_count();
                let builder = grouped
                    .get_builder_mut(index)
                    .ok_or(ShardingRewriteError::GroupIndexOutOfRange { index, count })?;
                self.apply(builder)
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CaseTableUnit {
    pub logic_table: String,
    pub actual_table: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CaseRoutingUnit {
    pub data_source_name: String,
    pub master_slave_logic_data_source_name: Option<String>,
    pub table_units: Vec<CaseTableUnit>,
}

/// One logical statement with its routing already decided.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RewriteCase {
    pub sql: String,
    #[serde(default)]
    pub tokens: Vec<TableToken>,
    #[serde(default)]
    pub table_names: Vec<String>,
    // Data nodes of each batch item, written as `<datasource>.<table>`.
    #[serde(default)]
    pub conditions: Vec<Vec<String>>,
    #[serde(default)]
    pub parameters: CaseParameters,
    // Generated key column of a batch insert, grouped parameters only.
    #[serde(default)]
    pub derived_column_name: Option<String>,
    #[serde(default)]
    pub parameter_edits: Vec<CaseParameterEdit>,
    pub routing_units: Vec<CaseRoutingUnit>,
}

impl RewriteCase {
    pub fn get_sharding_conditions(&self) -> Result<ShardingConditions, Error> {
        let mut conditions = Vec::with_capacity(self.conditions.len());
        for nodes in self.conditions.iter() {
            let nodes = nodes.iter().map(|x| x.parse::<DataNode>()).collect::<Result<Vec<_>, _>>()?;
            conditions.push(ShardingCondition::new(nodes));
        }

        Ok(ShardingConditions::new(conditions))
    }

    pub fn get_routing_result(&self) -> RoutingResult {
        let units = self
            .routing_units
            .iter()
            .map(|unit| {
                let table_units = unit
                    .table_units
                    .iter()
                    .map(|x| TableUnit::new(&x.logic_table, &x.actual_table))
                    .collect();
                let logic_ds = unit
                    .master_slave_logic_data_source_name
                    .as_deref()
                    .unwrap_or(&unit.data_source_name);
                RoutingUnit::with_master_slave_logic_data_source(
                    &unit.data_source_name,
                    logic_ds,
                    table_units,
                )
            })
            .collect();

        RoutingResult::new(units)
    }

    pub fn get_rewrite_context(&self) -> Result<SqlRewriteContext, Error> {
        let builder = TableTokenSqlBuilder::new(&self.sql, self.tokens.clone())?;
        let parameter_builder = match &self.parameters {
            CaseParameters::Standard(params) => ParameterBuilder::standard(params.clone()),
            CaseParameters::Grouped(groups) => ParameterBuilder::grouped(groups.clone()),
        };

        let mut context = SqlRewriteContext::new(builder, parameter_builder);
        if let Some(name) = &self.derived_column_name {
            match context.get_parameter_builder_mut() {
                ParameterBuilder::Grouped(grouped) => grouped.set_derived_column_name(name),
                ParameterBuilder::Standard(_) => {
                    return Err(ShardingRewriteError::GroupedAccessOnStandard.into());
                }
            }
        }

        for edit in self.parameter_edits.iter() {
            edit.apply_to(context.get_parameter_builder_mut())?;
        }

        Ok(context)
    }

    pub fn rewrite(&self, rule: &ShardingRule) -> Result<Vec<ExecutionUnit>, Error> {
        let conditions = self.get_sharding_conditions()?;
        let routing_result = self.get_routing_result();
        let context = self.get_rewrite_context()?;
        if let ParameterBuilder::Grouped(grouped) = context.get_parameter_builder() {
            if let Some(name) = grouped.get_derived_column_name() {
                debug!("generated key column {:?} on {} batch items", name, grouped.group_count());
            }
        }

        Ok(build_execution_units(
            rule,
            &conditions,
            &routing_result,
            &self.table_names,
            &context,
        )?)
    }
}

#[cfg(test)]
mod test {
    use pisa_error::error::ErrorKind;
    use strategy::{
        config::{ShardingRuleConfig, TableRuleConfig},
        rewrite::parameter::{ParamValue, ParameterBuilder},
        rule::ShardingRule,
        sharding_rewrite::ShardingRewriteError,
    };

    use super::{CaseParameterEdit, CaseParameters, RewriteCase};

    const CASE: &str = r#"{
        "sql": "INSERT INTO `t_order` (order_id, status) VALUES (?, ?), (?, ?), (?, ?)",
        "tokens": [{ "start": 12, "stop": 21, "table_name": "t_order", "quote": "back_quote" }],
        "table_names": ["t_order"],
        "conditions": [["ds0.t_order_0"], ["ds1.t_order_1"], []],
        "parameters": { "grouped": [[1, "init"], [2, "paid"], [3, null]] },
        "routing_units": [
            {
                "data_source_name": "ds0",
                "table_units": [{ "logic_table": "t_order", "actual_table": "t_order_0" }]
            },
            {
                "data_source_name": "ds1",
                "table_units": [{ "logic_table": "t_order", "actual_table": "t_order_1" }]
            }
        ]
    }"#;

    fn get_rule() -> ShardingRule {
        ShardingRule::new(ShardingRuleConfig {
            tables: vec![TableRuleConfig::new("t_order", &["ds0.t_order_0", "ds1.t_order_1"])],
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_rewrite_case() {
        let case: RewriteCase = serde_json::from_str(CASE).unwrap();
        assert_eq!(
            case.parameters,
            CaseParameters::Grouped(vec![
                vec![ParamValue::Int(1), ParamValue::from("init")],
                vec![ParamValue::Int(2), ParamValue::from("paid")],
                vec![ParamValue::Int(3), ParamValue::Null],
            ])
        );

        let units = case.rewrite(&get_rule()).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(
            units[0].sql_unit.sql,
            "INSERT INTO `t_order_0` (order_id, status) VALUES (?, ?), (?, ?), (?, ?)"
        );
        assert_eq!(
            units[0].sql_unit.parameters,
            vec![ParamValue::Int(1), ParamValue::from("init"), ParamValue::Int(3), ParamValue::Null]
        );
        assert_eq!(units[1].data_source_name, "ds1");
        assert_eq!(
            units[1].sql_unit.parameters,
            vec![ParamValue::Int(2), ParamValue::from("paid"), ParamValue::Int(3), ParamValue::Null]
        );

        let output = serde_json::to_value(&units).unwrap();
        assert_eq!(output[1]["sql_unit"]["parameters"], serde_json::json!([2, "paid", 3, null]));
    }

    #[test]
    fn test_rewrite_case_invalid_condition() {
        let mut case: RewriteCase = serde_json::from_str(CASE).unwrap();
        case.conditions[0] = vec!["t_order_0".to_string()];

        let err = case.rewrite(&get_rule()).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Rewrite(ShardingRewriteError::InvalidDataNode(node)) if node == "t_order_0"
        ));
    }

    #[test]
    fn test_rewrite_case_standard_parameters() {
        let mut case: RewriteCase = serde_json::from_str(CASE).unwrap();
        case.parameters = CaseParameters::Standard(vec![ParamValue::Int(7), ParamValue::Int(8)]);

        let units = case.rewrite(&get_rule()).unwrap();
        for unit in units {
            assert_eq!(unit.sql_unit.parameters, vec![ParamValue::Int(7), ParamValue::Int(8)]);
        }
    }

    #[test]
    fn test_rewrite_case_parameter_edits() {
        let mut case: RewriteCase = serde_json::from_str(CASE).unwrap();
        case.derived_column_name = Some("order_id".to_string());
        case.parameter_edits = serde_json::from_str(
            r#"[
                { "replace": { "group": 1, "index": 1, "value": "shipped" } },
                { "remove": { "group": 2, "index": 1 } },
                { "add": { "index": 2, "values": [0] } }
            ]"#,
        )
        .unwrap();
        assert_eq!(
            case.parameter_edits[1],
            CaseParameterEdit::Remove { group: Some(2), index: 1 }
        );

        let context = case.get_rewrite_context().unwrap();
        match context.get_parameter_builder() {
            ParameterBuilder::Grouped(grouped) => {
                assert_eq!(grouped.get_derived_column_name(), Some("order_id"))
            }
            ParameterBuilder::Standard(_) => panic!("expect grouped parameters"),
        }

        let units = case.rewrite(&get_rule()).unwrap();
        assert_eq!(
            units[0].sql_unit.parameters,
            vec![
                ParamValue::Int(1),
                ParamValue::from("init"),
                ParamValue::Int(0),
                ParamValue::Int(3),
                ParamValue::Int(0),
            ]
        );
        assert_eq!(
            units[1].sql_unit.parameters,
            vec![
                ParamValue::Int(2),
                ParamValue::from("shipped"),
                ParamValue::Int(0),
                ParamValue::Int(3),
                ParamValue::Int(0),
            ]
        );
    }

    #[test]
    fn test_rewrite_case_invalid_parameter_edits() {
        let mut case: RewriteCase = serde_json::from_str(CASE).unwrap();
        case.parameter_edits = vec![CaseParameterEdit::Remove { group: Some(5), index: 0 }];
        let err = case.rewrite(&get_rule()).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Rewrite(ShardingRewriteError::GroupIndexOutOfRange { index: 5, count: 3 })
        ));

        case.parameters = CaseParameters::Standard(vec![ParamValue::Int(7)]);
        case.parameter_edits = vec![CaseParameterEdit::Remove { group: Some(0), index: 0 }];
        let err = case.rewrite(&get_rule()).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Rewrite(ShardingRewriteError::GroupedAccessOnStandard)
        ));

        case.parameter_edits = vec![CaseParameterEdit::Replace {
            group: None,
            index: 1,
            value: ParamValue::Null,
        }];
        let err = case.rewrite(&get_rule()).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Rewrite(ShardingRewriteError::ParameterIndexOutOfRange {
                index: 1,
                count: 1
            })
        ));

        case.parameter_edits.clear();
        case.derived_column_name = Some("order_id".to_string());
        let err = case.rewrite(&get_rule()).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Rewrite(ShardingRewriteError::GroupedAccessOnStandard)
        ));
    }
}
