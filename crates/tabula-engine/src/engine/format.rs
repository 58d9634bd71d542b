use super::value::{Value, is_integral};

/// Format a value as cell text.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(*n),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_json().to_string(),
    }
}

/// Format a number for display: integral values without a fractional part,
/// everything else in the shortest form that round-trips.
pub fn format_number(n: f64) -> String {
    if is_integral(n) {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_scalars() {
        assert_eq!(format_value(&Value::Null), "");
        assert_eq!(format_value(&Value::from(true)), "true");
        assert_eq!(format_value(&Value::from(false)), "false");
        assert_eq!(format_value(&Value::from("txt")), "txt");
    }

    #[test]
    fn test_format_numbers() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn test_format_collection_as_compact_json() {
        let value = Value::from(json!({"a": [1, 2]}));
        assert_eq!(format_value(&value), r#"{"a":[1,2]}"#);
    }
}
