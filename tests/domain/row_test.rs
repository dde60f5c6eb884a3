use std::sync::Arc;

use rowstream::domain::Row;
use serde_json::json;

#[test]
fn given_row_when_getting_by_column_then_value_is_found() {
    let headers = Arc::new(vec!["id".to_string(), "email".to_string()]);
    let row = Row::new(headers, vec!["7".to_string(), "a@b.c".to_string()]);

    assert_eq!(row.get("email"), Some("a@b.c"));
    assert_eq!(row.get("missing"), None);
}

#[test]
fn given_row_with_extra_fields_when_converted_to_json_then_extras_keyed_by_position() {
    let headers = Arc::new(vec!["id".to_string()]);
    let row = Row::new(headers, vec!["7".to_string(), "extra".to_string()]);

    assert_eq!(row.to_json(), json!({"id": "7", "_1": "extra"}));
}
