use serde_json::Value;

use super::error::FilterError;
use super::filter::is_valid_identifier;
use super::types::{FilterOp, FilterWhereInfo};
use crate::database::value::SqlValue;

/// Translates a JSON predicate into a parameterised SQL condition.
///
/// `{ "name": "Rust" }` is implicit equality; operator objects look like
/// `{ "id": { "$gte": 10, "$lt": 20 } }`; `$and`/`$or` take arrays of
/// predicates and `$not` takes a single predicate.
pub struct FilterWhere {
    param_values: Vec<SqlValue>,
    param_offset: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_offset: starting_param_index,
        }
    }

    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<SqlValue>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.build(where_data)?;
        Ok((sql, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<String, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok("1=1".to_string()),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        let mut sql_conditions = vec![];
        for (key, value) in obj {
            if key.starts_with('$') {
                sql_conditions.push(self.build_logical(key, value)?);
            } else {
                for condition in Self::parse_field_condition(key, value)? {
                    sql_conditions.push(self.build_sql_condition(&condition)?);
                }
            }
        }

        if sql_conditions.is_empty() {
            Ok("1=1".to_string())
        } else {
            Ok(sql_conditions.join(" AND "))
        }
    }

    fn build_logical(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    return Ok(if op == "$and" { "1=1" } else { "1=0" }.to_string());
                }
                let mut sql_parts = Vec::with_capacity(arr.len());
                for v in arr {
                    sql_parts.push(format!("({})", self.build(v)?));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", sql_parts.join(joiner)))
            }
            "$not" => Ok(format!("NOT ({})", self.build(value)?)),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<FilterWhereInfo>, FilterError> {
        if !is_valid_identifier(field) {
            return Err(FilterError::InvalidColumn(field.to_string()));
        }
        if let Value::Object(obj) = value {
            let mut conditions = Vec::with_capacity(obj.len());
            for (op_key, op_val) in obj {
                let operator = FilterOp::parse(op_key)
                    .ok_or_else(|| FilterError::UnsupportedOperator(op_key.to_string()))?;
                conditions.push(FilterWhereInfo {
                    column: field.to_string(),
                    operator,
                    data: op_val.clone(),
                });
            }
            Ok(conditions)
        } else {
            // Implicit equality: { field: value }
            Ok(vec![FilterWhereInfo {
                column: field.to_string(),
                operator: FilterOp::Eq,
                data: value.clone(),
            }])
        }
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", condition.column);
        let data = &condition.data;
        match condition.operator {
            FilterOp::Eq => {
                if data.is_null() {
                    Ok(format!("{} IS NULL", quoted_column))
                } else {
                    Ok(format!("{} = {}", quoted_column, self.param(data)?))
                }
            }
            FilterOp::Ne => {
                if data.is_null() {
                    Ok(format!("{} IS NOT NULL", quoted_column))
                } else {
                    Ok(format!("{} <> {}", quoted_column, self.param(data)?))
                }
            }
            FilterOp::Gt => Ok(format!("{} > {}", quoted_column, self.param(data)?)),
            FilterOp::Gte => Ok(format!("{} >= {}", quoted_column, self.param(data)?)),
            FilterOp::Lt => Ok(format!("{} < {}", quoted_column, self.param(data)?)),
            FilterOp::Lte => Ok(format!("{} <= {}", quoted_column, self.param(data)?)),
            FilterOp::Like => Ok(format!("{} LIKE {}", quoted_column, self.param(data)?)),
            FilterOp::In | FilterOp::NIn => {
                let negate = condition.operator == FilterOp::NIn;
                let values = match data {
                    Value::Array(values) => values.clone(),
                    other => vec![other.clone()],
                };
                if values.is_empty() {
                    return Ok(if negate { "1=1" } else { "1=0" }.to_string());
                }
                let mut params = Vec::with_capacity(values.len());
                for v in &values {
                    params.push(self.param(v)?);
                }
                let keyword = if negate { "NOT IN" } else { "IN" };
                Ok(format!("{} {} ({})", quoted_column, keyword, params.join(", ")))
            }
            FilterOp::Between => match data {
                Value::Array(values) if values.len() == 2 => {
                    let low = self.param(&values[0])?;
                    let high = self.param(&values[1])?;
                    Ok(format!("{} BETWEEN {} AND {}", quoted_column, low, high))
                }
                _ => Err(FilterError::InvalidOperatorData("$between requires array with 2 values".to_string())),
            },
            FilterOp::Null => match data {
                Value::Bool(true) => Ok(format!("{} IS NULL", quoted_column)),
                Value::Bool(false) => Ok(format!("{} IS NOT NULL", quoted_column)),
                _ => Err(FilterError::InvalidOperatorData("$null requires a boolean".to_string())),
            },
        }
    }

    fn param(&mut self, value: &Value) -> Result<String, FilterError> {
        let bound = SqlValue::from_json(value)
            .ok_or_else(|| FilterError::InvalidOperatorData(format!("unsupported parameter value: {}", value)))?;
        self.param_values.push(bound);
        Ok(format!("${}", self.param_offset + self.param_values.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn implicit_equality_binds_parameter() {
        let (sql, params) = FilterWhere::generate(&json!({ "username": "ali" }), 0).unwrap();
        assert_eq!(sql, "\"username\" = $1");
        assert_eq!(params, vec![SqlValue::Text(Some("ali".to_string()))]);
    }

    #[test]
    fn null_equality_becomes_is_null() {
        let (sql, params) = FilterWhere::generate(&json!({ "image_id": null }), 0).unwrap();
        assert_eq!(sql, "\"image_id\" IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn operators_and_offset_numbering() {
        let (sql, params) =
            FilterWhere::generate(&json!({ "id": { "$gte": 10, "$lt": 20 } }), 2).unwrap();
        // serde_json maps iterate in key order
        assert_eq!(sql, "\"id\" >= $3 AND \"id\" < $4");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn logical_operators_nest() {
        let (sql, params) = FilterWhere::generate(
            &json!({ "$or": [ { "role": "Admin" }, { "id": { "$in": [1, 2] } } ] }),
            0,
        )
        .unwrap();
        assert_eq!(sql, "((\"role\" = $1) OR (\"id\" IN ($2, $3)))");
        assert_eq!(params.len(), 3);

        let (sql, _) = FilterWhere::generate(&json!({ "$not": { "id": 1 } }), 0).unwrap();
        assert_eq!(sql, "NOT (\"id\" = $1)");
    }

    #[test]
    fn empty_in_matches_nothing() {
        let (sql, params) = FilterWhere::generate(&json!({ "id": { "$in": [] } }), 0).unwrap();
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn rejects_unknown_operator_and_bad_column() {
        assert!(matches!(
            FilterWhere::generate(&json!({ "id": { "$regex": "x" } }), 0),
            Err(FilterError::UnsupportedOperator(_))
        ));
        assert!(matches!(
            FilterWhere::generate(&json!({ "id; DROP TABLE users": 1 }), 0),
            Err(FilterError::InvalidColumn(_))
        ));
        assert!(FilterWhere::validate(&json!("raw sql")).is_err());
    }
}
