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

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::sharding_rewrite::ShardingRewriteError;

/// A value bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl From<i64> for ParamValue {
    fn from(val: i64) -> Self {
        ParamValue::Int(val)
    }
}

impl From<u64> for ParamValue {
    fn from(val: u64) -> Self {
        ParamValue::UInt(val)
    }
}

impl From<f64> for ParamValue {
    fn from(val: f64) -> Self {
        ParamValue::Float(val)
    }
}

impl From<bool> for ParamValue {
    fn from(val: bool) -> Self {
        ParamValue::Bool(val)
    }
}

impl From<&str> for ParamValue {
    fn from(val: &str) -> Self {
        ParamValue::String(val.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(val: String) -> Self {
        ParamValue::String(val)
    }
}

/// Flat parameter list plus the edits other rewriters queued on it.
///
/// Every index refers to a position in the original parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandardParameterBuilder {
    original: Vec<ParamValue>,
    added: BTreeMap<usize, Vec<ParamValue>>,
    replaced: IndexMap<usize, ParamValue>,
    removed: Vec<usize>,
}

impl StandardParameterBuilder {
    pub fn new(original: Vec<ParamValue>) -> Self {
        StandardParameterBuilder { original, ..Default::default() }
    }

    /// Insert `params` before the original parameter at `index`.
    /// An index past the end appends.
    pub fn add_added_parameters(&mut self, index: usize, params: Vec<ParamValue>) {
        self.added.entry(index).or_insert_with(Vec::new).extend(params);
    }

    pub fn add_replaced_parameter(
        &mut self,
        index: usize,
        param: ParamValue,
    ) -> Result<(), ShardingRewriteError> {
        self.check_index(index)?;
        self.replaced.insert(index, param);
        Ok(())
    }

    pub fn add_removed_parameter(&mut self, index: usize) -> Result<(), ShardingRewriteError> {
        self.check_index(index)?;
        if !self.removed.contains(&index) {
            self.removed.push(index);
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), ShardingRewriteError> {
        if index >= self.original.len() {
            return Err(ShardingRewriteError::ParameterIndexOutOfRange {
                index,
                count: self.original.len(),
            });
        }
        Ok(())
    }

    pub fn get_original_parameters(&self) -> &[ParamValue] {
        &self.original
    }

    pub fn len(&self) -> usize {
        self.original.len() + self.added.values().map(|x| x.len()).sum::<usize>()
            - self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_parameters(&self) -> Vec<ParamValue> {
        if self.added.is_empty() && self.replaced.is_empty() && self.removed.is_empty() {
            return self.original.clone();
        }

        let mut result = Vec::with_capacity(self.len());
        for (idx, param) in self.original.iter().enumerate() {
            if let Some(added) = self.added.get(&idx) {
                result.extend(added.iter().cloned());
            }

            if self.removed.contains(&idx) {
                continue;
            }

            result.push(self.replaced.get(&idx).unwrap_or(param).clone());
        }

        for (_, added) in self.added.range(self.original.len()..) {
            result.extend(added.iter().cloned());
        }

        result
    }
}

/// One parameter builder per batch item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedParameterBuilder {
    builders: Vec<StandardParameterBuilder>,
    // Generated key column appended by the insert rewriter, if any.
    derived_column_name: Option<String>,
}

impl GroupedParameterBuilder {
    pub fn new(groups: Vec<Vec<ParamValue>>) -> Self {
        GroupedParameterBuilder {
            builders: groups.into_iter().map(StandardParameterBuilder::new).collect(),
            derived_column_name: None,
        }
    }

    pub fn group_count(&self) -> usize {
        self.builders.len()
    }

    pub fn get_builders(&self) -> &[StandardParameterBuilder] {
        &self.builders
    }

    pub fn get_builder_mut(&mut self, index: usize) -> Option<&mut StandardParameterBuilder> {
        self.builders.get_mut(index)
    }

    pub fn get_builders_mut(&mut self) -> &mut [StandardParameterBuilder] {
        &mut self.builders
    }

    pub fn is_empty(&self) -> bool {
        self.builders.iter().all(|x| x.is_empty())
    }

    pub fn get_parameters(&self) -> Vec<ParamValue> {
        self.builders.iter().flat_map(|x| x.get_parameters()).collect()
    }

    pub fn get_group_parameters(
        &self,
        index: usize,
    ) -> Result<Vec<ParamValue>, ShardingRewriteError> {
        self.builders
            .get(index)
            .map(|x| x.get_parameters())
            .ok_or(ShardingRewriteError::GroupIndexOutOfRange {
                index,
                count: self.builders.len(),
            })
    }

    pub fn set_derived_column_name(&mut self, name: &str) {
        self.derived_column_name = Some(name.to_string());
    }

    pub fn get_derived_column_name(&self) -> Option<&str> {
        self.derived_column_name.as_deref()
    }
}

/// Bound values of a statement, flat or grouped by batch item.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterBuilder {
    Standard(StandardParameterBuilder),
    Grouped(GroupedParameterBuilder),
}

impl ParameterBuilder {
    pub fn standard(params: Vec<ParamValue>) -> Self {
        ParameterBuilder::Standard(StandardParameterBuilder::new(params))
    }

    pub fn grouped(groups: Vec<Vec<ParamValue>>) -> Self {
        ParameterBuilder::Grouped(GroupedParameterBuilder::new(groups))
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self, ParameterBuilder::Grouped(_))
    }

    pub fn get_parameters(&self) -> Vec<ParamValue> {
        match self {
            Self::Standard(builder) => builder.get_parameters(),
            Self::Grouped(builder) => builder.get_parameters(),
        }
    }

    pub fn get_group_parameters(
        &self,
        index: usize,
    ) -> Result<Vec<ParamValue>, ShardingRewriteError> {
        match self {
            Self::Standard(_) => Err(ShardingRewriteError::GroupedAccessOnStandard),
            Self::Grouped(builder) => builder.get_group_parameters(index),
        }
    }
}
