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

use crate::{rule::LogicAndActualTables, route::RoutingUnit, sharding_rewrite::ShardingRewriteError};

/// Renders physical SQL text.
pub trait SqlBuilder: Send + Sync {
    /// SQL with logic table names left in place.
    fn to_sql(&self) -> String;

    /// SQL for `routing_unit`, with logic tables replaced by their actual tables.
    fn to_routed_sql(
        &self,
        routing_unit: &RoutingUnit,
        logic_and_actual_tables: &LogicAndActualTables,
    ) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteCharacter {
    None,
    BackQuote,
    SingleQuote,
    Quote,
    Brackets,
}

impl Default for QuoteCharacter {
    fn default() -> Self {
        QuoteCharacter::None
    }
}

impl QuoteCharacter {
    pub fn get_start_delimiter(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::BackQuote => "`",
            Self::SingleQuote => "'",
            Self::Quote => "\"",
            Self::Brackets => "[",
        }
    }

    pub fn get_end_delimiter(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::BackQuote => "`",
            Self::SingleQuote => "'",
            Self::Quote => "\"",
            Self::Brackets => "]",
        }
    }
}

/// A table reference in the logical SQL, as a byte span `start..stop`
/// that includes the quote characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableToken {
    pub start: usize,
    pub stop: usize,
    pub table_name: String,
    #[serde(default)]
    pub quote: QuoteCharacter,
}

impl TableToken {
    pub fn new(start: usize, stop: usize, table_name: &str, quote: QuoteCharacter) -> Self {
        TableToken { start, stop, table_name: table_name.to_string(), quote }
    }

    fn render(&self, logic_and_actual_tables: Option<&LogicAndActualTables>) -> String {
        let logic_table = match logic_and_actual_tables {
            Some(_) => self.table_name.to_lowercase(),
            None => self.table_name.clone(),
        };
        let table = logic_and_actual_tables
            .and_then(|x| x.get(&logic_table))
            .map(|x| x.as_str())
            .unwrap_or(&logic_table);

        let mut target = String::with_capacity(table.len() + 2);
        target.push_str(self.quote.get_start_delimiter());
        target.push_str(table);
        target.push_str(self.quote.get_end_delimiter());
        target
    }
}

/// Rebuilds the SQL by replacing every table token span.
#[derive(Debug, Clone, PartialEq)]
pub struct TableTokenSqlBuilder {
    sql: String,
    tokens: Vec<TableToken>,
}

impl TableTokenSqlBuilder {
    pub fn new(sql: &str, mut tokens: Vec<TableToken>) -> Result<Self, ShardingRewriteError> {
        tokens.sort_by_key(|x| x.start);

        let mut prev_stop = 0;
        for token in tokens.iter() {
            let invalid = token.start > token.stop
                || token.start < prev_stop
                || token.stop > sql.len()
                || !sql.is_char_boundary(token.start)
                || !sql.is_char_boundary(token.stop);
            if invalid {
                return Err(ShardingRewriteError::InvalidToken {
                    start: token.start,
                    stop: token.stop,
                });
            }
            prev_stop = token.stop;
        }

        Ok(TableTokenSqlBuilder { sql: sql.to_string(), tokens })
    }

    pub fn get_tokens(&self) -> &[TableToken] {
        &self.tokens
    }

    fn build(&self, logic_and_actual_tables: Option<&LogicAndActualTables>) -> String {
        let mut target_sql = String::with_capacity(self.sql.len());
        let mut offset = 0;
        for token in self.tokens.iter() {
            target_sql.push_str(&self.sql[offset..token.start]);
            target_sql.push_str(&token.render(logic_and_actual_tables));
            offset = token.stop;
        }
        target_sql.push_str(&self.sql[offset..]);
        target_sql
    }
}

impl SqlBuilder for TableTokenSqlBuilder {
    fn to_sql(&self) -> String {
        self.build(None)
    }

    fn to_routed_sql(
        &self,
        _routing_unit: &RoutingUnit,
        logic_and_actual_tables: &LogicAndActualTables,
    ) -> String {
        self.build(Some(logic_and_actual_tables))
    }
}
