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

pub mod parameter;
pub mod sql_builder;

use serde::Serialize;
use tracing::debug;

use self::{
    parameter::{ParamValue, ParameterBuilder},
    sql_builder::SqlBuilder,
};
use crate::sharding_rewrite::ShardingRewriteError;

/// Rendered SQL and the parameters that travel with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlRewriteResult {
    pub sql: String,
    pub parameters: Vec<ParamValue>,
}

/// Everything a rewrite engine reads for one logical statement.
pub struct SqlRewriteContext {
    sql_builder: Box<dyn SqlBuilder>,
    parameter_builder: ParameterBuilder,
}

impl SqlRewriteContext {
    pub fn new<B: SqlBuilder + 'static>(
        sql_builder: B,
        parameter_builder: ParameterBuilder,
    ) -> Self {
        SqlRewriteContext { sql_builder: Box::new(sql_builder), parameter_builder }
    }

    pub fn get_sql_builder(&self) -> &dyn SqlBuilder {
        self.sql_builder.as_ref()
    }

    pub fn get_parameter_builder(&self) -> &ParameterBuilder {
        &self.parameter_builder
    }

    pub fn get_parameter_builder_mut(&mut self) -> &mut ParameterBuilder {
        &mut self.parameter_builder
    }
}

impl std::fmt::Debug for SqlRewriteContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlRewriteContext")
            .field("sql", &self.sql_builder.to_sql())
            .field("parameter_builder", &self.parameter_builder)
            .finish()
    }
}

pub trait SqlRewriteEngine {
    fn rewrite(
        &self,
        context: &SqlRewriteContext,
    ) -> Result<SqlRewriteResult, ShardingRewriteError>;
}

/// Rewrite for statements that are not sharded: logic SQL and all parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSqlRewriteEngine;

impl SqlRewriteEngine for DefaultSqlRewriteEngine {
    fn rewrite(
        &self,
        context: &SqlRewriteContext,
    ) -> Result<SqlRewriteResult, ShardingRewriteError> {
        let sql = context.get_sql_builder().to_sql();
        debug!("default rewrite: {:?}", sql);
        Ok(SqlRewriteResult { sql, parameters: context.get_parameter_builder().get_parameters() })
    }
}

#[cfg(test)]
mod test {
    use super::{
        parameter::{ParamValue, ParameterBuilder},
        sql_builder::{QuoteCharacter, TableToken, TableTokenSqlBuilder},
        DefaultSqlRewriteEngine, SqlRewriteContext, SqlRewriteEngine,
    };

    #[test]
    fn test_default_rewrite() {
        let sql = "SELECT * FROM `T_Config` WHERE id IN (?, ?)";
        let builder = TableTokenSqlBuilder::new(
            sql,
            vec![TableToken::new(14, 24, "T_Config", QuoteCharacter::BackQuote)],
        )
        .unwrap();
        let context = SqlRewriteContext::new(
            builder,
            ParameterBuilder::grouped(vec![vec![ParamValue::Int(1)], vec![ParamValue::Int(2)]]),
        );

        let res = DefaultSqlRewriteEngine.rewrite(&context).unwrap();
        assert_eq!(res.sql, sql);
        assert_eq!(res.parameters, vec![ParamValue::Int(1), ParamValue::Int(2)]);
    }
}
