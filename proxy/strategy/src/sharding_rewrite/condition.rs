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

use indexmap::IndexSet;

use crate::rule::DataNode;

/// Candidate data nodes of one batch item. Empty means the item is not
/// scoped by a sharding column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardingCondition {
    data_nodes: IndexSet<DataNode>,
}

impl ShardingCondition {
    pub fn new(data_nodes: Vec<DataNode>) -> Self {
        ShardingCondition { data_nodes: data_nodes.into_iter().collect() }
    }

    pub fn get_data_nodes(&self) -> &IndexSet<DataNode> {
        &self.data_nodes
    }

    pub fn add_data_node(&mut self, data_node: DataNode) {
        self.data_nodes.insert(data_node);
    }
}

/// One condition per batch item, in batch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardingConditions {
    conditions: Vec<ShardingCondition>,
}

impl ShardingConditions {
    pub fn new(conditions: Vec<ShardingCondition>) -> Self {
        ShardingConditions { conditions }
    }

    pub fn get_conditions(&self) -> &[ShardingCondition] {
        &self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}
