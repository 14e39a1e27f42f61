use serde_json::Value;

use super::error::FilterError;
use super::filter::is_valid_identifier;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        match order {
            Value::Null => Ok(vec![]),
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                // Expect array of strings like ["created_at desc", "name asc"]
                let mut out = Vec::new();
                for v in arr {
                    match v {
                        Value::String(s) => out.extend(Self::parse_order_string(s)?),
                        other => return Err(FilterError::InvalidOrder(other.to_string())),
                    }
                }
                Ok(out)
            }
            Value::Object(obj) => {
                // { "created_at": "desc", "name": "asc" }
                let mut out = Vec::new();
                for (k, v) in obj {
                    let dir = v.as_str().unwrap_or("asc");
                    out.push(Self::info(k, dir)?);
                }
                Ok(out)
            }
            other => Err(FilterError::InvalidOrder(other.to_string())),
        }
    }

    fn parse_order_string(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        // split on commas, then each token into column and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let dir = it.next().unwrap_or("asc");
                if it.next().is_some() {
                    return Err(FilterError::InvalidOrder(trimmed.to_string()));
                }
                out.push(Self::info(col, dir)?);
            }
        }
        Ok(out)
    }

    fn info(column: &str, dir: &str) -> Result<FilterOrderInfo, FilterError> {
        if !is_valid_identifier(column) {
            return Err(FilterError::InvalidColumn(column.to_string()));
        }
        let sort = if dir.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else if dir.eq_ignore_ascii_case("asc") {
            SortDirection::Asc
        } else {
            return Err(FilterError::InvalidOrder(format!("{} {}", column, dir)));
        };
        Ok(FilterOrderInfo { column: column.to_string(), sort })
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_string_array_and_object_forms() {
        let infos = FilterOrder::validate_and_parse(&json!("created_at desc, name")).unwrap();
        assert_eq!(FilterOrder::generate(&infos), "ORDER BY \"created_at\" DESC, \"name\" ASC");

        let infos = FilterOrder::validate_and_parse(&json!(["id desc"])).unwrap();
        assert_eq!(infos[0].sort, SortDirection::Desc);

        let infos = FilterOrder::validate_and_parse(&json!({ "name": "desc" })).unwrap();
        assert_eq!(infos[0].column, "name");
    }

    #[test]
    fn rejects_bad_direction_and_column() {
        assert!(FilterOrder::validate_and_parse(&json!("name sideways")).is_err());
        assert!(FilterOrder::validate_and_parse(&json!("na-me asc")).is_err());
    }
}
