use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterOrderInfo, SqlResult};
use crate::database::value::SqlValue;

/// SQL has no "offset without limit" form shared by every backend
const UNBOUNDED_LIMIT: i64 = i64::MAX;

/// Builds a parameterised `SELECT` against one table from JSON predicates,
/// order specs and a limit/offset window.
pub struct Filter {
    table_name: String,
    where_data: Vec<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        if !is_valid_identifier(&table_name) {
            return Err(FilterError::InvalidTableName(table_name));
        }
        Ok(Self {
            table_name,
            where_data: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    /// Adds a predicate. Multiple predicates are combined with AND.
    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        if !conditions.is_null() {
            self.where_data.push(conditions);
        }
        Ok(self)
    }

    /// Appends ordering terms after any already present
    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        let order_info = FilterOrder::validate_and_parse(&order_spec)?;
        self.order_data.extend(order_info);
        Ok(self)
    }

    pub fn has_order(&self) -> bool {
        !self.order_data.is_empty()
    }

    pub fn limit(&mut self, limit: Option<i64>, offset: Option<i64>) -> &mut Self {
        self.limit = limit.map(|l| l.max(0));
        self.offset = offset.map(|o| o.max(0));
        self
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", self.table_name),
            if where_result.query.is_empty() { String::new() } else { format!("WHERE {}", where_result.query) },
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let mut clauses = Vec::with_capacity(self.where_data.len());
        let mut params: Vec<SqlValue> = vec![];
        for where_data in &self.where_data {
            let (clause, clause_params) = FilterWhere::generate(where_data, params.len())?;
            clauses.push(clause);
            params.extend(clause_params);
        }
        let query = match clauses.len() {
            0 => String::new(),
            1 => clauses.remove(0),
            _ => clauses.iter().map(|c| format!("({})", c)).collect::<Vec<_>>().join(" AND "),
        };
        Ok(SqlResult { query, params })
    }

    /// Count of rows matching the predicates, ignoring order and window
    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = if where_result.query.is_empty() {
            format!("SELECT COUNT(*) AS count FROM \"{}\"", self.table_name)
        } else {
            format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.table_name, where_result.query)
        };
        Ok(SqlResult { query, params: where_result.params })
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("LIMIT {} OFFSET {}", UNBOUNDED_LIMIT, o),
            (None, None) => String::new(),
        }
    }
}

/// Table and column names: ASCII letter or underscore first, then letters,
/// digits or underscores.
pub(crate) fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
