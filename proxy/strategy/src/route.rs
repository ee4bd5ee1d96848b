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

/// Binding of one logic table to the actual table it resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableUnit {
    pub logic_table_name: String,
    pub actual_table_name: String,
}

impl TableUnit {
    pub fn new(logic_table_name: &str, actual_table_name: &str) -> Self {
        TableUnit {
            logic_table_name: logic_table_name.to_string(),
            actual_table_name: actual_table_name.to_string(),
        }
    }
}

/// The physical destination of one execution of a logical statement.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingUnit {
    data_source_name: String,
    // Equals `data_source_name` unless the unit routes through a master slave group.
    master_slave_logic_data_source_name: String,
    // One actual table may back several logic tables.
    table_units: IndexSet<TableUnit>,
}

impl RoutingUnit {
    pub fn new(data_source_name: &str, table_units: Vec<TableUnit>) -> Self {
        Self::with_master_slave_logic_data_source(data_source_name, data_source_name, table_units)
    }

    pub fn with_master_slave_logic_data_source(
        data_source_name: &str,
        master_slave_logic_data_source_name: &str,
        table_units: Vec<TableUnit>,
    ) -> Self {
        RoutingUnit {
            data_source_name: data_source_name.to_string(),
            master_slave_logic_data_source_name: master_slave_logic_data_source_name.to_string(),
            table_units: table_units.into_iter().collect(),
        }
    }

    pub fn get_data_source_name(&self) -> &str {
        &self.data_source_name
    }

    pub fn get_master_slave_logic_data_source_name(&self) -> &str {
        &self.master_slave_logic_data_source_name
    }

    pub fn get_table_units(&self) -> impl Iterator<Item = &TableUnit> {
        self.table_units.iter()
    }

    /// Find the first table unit serving `actual_table_name` on `data_source_name`.
    /// Both names must match exactly.
    pub fn get_table_unit(
        &self,
        data_source_name: &str,
        actual_table_name: &str,
    ) -> Option<&TableUnit> {
        if self.master_slave_logic_data_source_name != data_source_name {
            return None;
        }

        self.table_units.iter().find(|x| x.actual_table_name == actual_table_name)
    }

    pub fn contains(&self, data_source_name: &str, actual_table_name: &str) -> bool {
        self.get_table_unit(data_source_name, actual_table_name).is_some()
    }

    pub fn get_logic_table_names(&self) -> IndexSet<&str> {
        self.table_units.iter().map(|x| x.logic_table_name.as_str()).collect()
    }

    pub fn get_actual_table_names(&self, logic_table_name: &str) -> Vec<&str> {
        self.table_units
            .iter()
            .filter(|x| x.logic_table_name.eq_ignore_ascii_case(logic_table_name))
            .map(|x| x.actual_table_name.as_str())
            .collect()
    }
}

/// All routing units produced for one logical statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingResult {
    routing_units: Vec<RoutingUnit>,
}

impl RoutingResult {
    pub fn new(routing_units: Vec<RoutingUnit>) -> Self {
        RoutingResult { routing_units }
    }

    pub fn get_routing_units(&self) -> &[RoutingUnit] {
        &self.routing_units
    }

    pub fn is_single_routing(&self) -> bool {
        self.routing_units.len() == 1
    }

    pub fn get_data_source_names(&self) -> IndexSet<&str> {
        self.routing_units.iter().map(|x| x.get_data_source_name()).collect()
    }
}

#[cfg(test)]
mod test {
    use super::{RoutingResult, RoutingUnit, TableUnit};

    fn get_routing_unit() -> RoutingUnit {
        RoutingUnit::new(
            "ds0",
            vec![
                TableUnit::new("t_order", "t_order_0"),
                TableUnit::new("t_order_item", "t_order_item_0"),
            ],
        )
    }

    #[test]
    fn test_get_table_unit() {
        let unit = get_routing_unit();
        assert_eq!(
            unit.get_table_unit("ds0", "t_order_0"),
            Some(&TableUnit::new("t_order", "t_order_0"))
        );
        assert!(unit.contains("ds0", "t_order_item_0"));

        assert_eq!(unit.get_table_unit("ds1", "t_order_0"), None);
        assert_eq!(unit.get_table_unit("ds0", "t_order_1"), None);
        assert!(!unit.contains("ds0", "t_order"));
        assert!(!unit.contains("ds", "t_order_0"));
        assert!(!unit.contains("ds0", "t_order_0_bak"));
    }

    #[test]
    fn test_get_table_unit_with_master_slave() {
        let unit = RoutingUnit::with_master_slave_logic_data_source(
            "ds0_master",
            "ms_ds0",
            vec![TableUnit::new("t_order", "t_order_0")],
        );
        assert_eq!(unit.get_data_source_name(), "ds0_master");
        assert!(unit.contains("ms_ds0", "t_order_0"));
        assert!(!unit.contains("ds0_master", "t_order_0"));
    }

    #[test]
    fn test_table_names() {
        let unit = RoutingUnit::new(
            "ds0",
            vec![TableUnit::new("t_order", "t_order_0"), TableUnit::new("t_order", "t_order_2")],
        );
        assert_eq!(unit.get_logic_table_names().into_iter().collect::<Vec<_>>(), vec!["t_order"]);
        assert_eq!(unit.get_actual_table_names("T_ORDER"), vec!["t_order_0", "t_order_2"]);
        assert!(unit.get_actual_table_names("t_user").is_empty());
    }

    #[test]
    fn test_shared_actual_table() {
        let unit = RoutingUnit::new(
            "ds0",
            vec![
                TableUnit::new("t_config", "t_shared"),
                TableUnit::new("t_dict", "t_shared"),
                TableUnit::new("t_config", "t_shared"),
            ],
        );
        assert_eq!(unit.get_table_units().count(), 2);
        assert_eq!(
            unit.get_logic_table_names().into_iter().collect::<Vec<_>>(),
            vec!["t_config", "t_dict"]
        );
        assert_eq!(
            unit.get_table_unit("ds0", "t_shared"),
            Some(&TableUnit::new("t_config", "t_shared"))
        );
        assert_eq!(unit.get_actual_table_names("t_dict"), vec!["t_shared"]);
    }

    #[test]
    fn test_routing_result() {
        let result = RoutingResult::new(vec![
            get_routing_unit(),
            RoutingUnit::new("ds1", vec![TableUnit::new("t_order", "t_order_1")]),
            RoutingUnit::new("ds1", vec![TableUnit::new("t_order", "t_order_3")]),
        ]);
        assert!(!result.is_single_routing());
        assert_eq!(
            result.get_data_source_names().into_iter().collect::<Vec<_>>(),
            vec!["ds0", "ds1"]
        );
    }
}
