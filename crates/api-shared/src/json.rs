//! Conversion between `serde_json` values and `google.protobuf.Struct`.
//!
//! `Struct` numbers are always doubles. When converting back to JSON, integral doubles that fit
//! in an `i64` are rendered as JSON integers so `170` does not come back as `170.0`.
//! Non-finite numbers have no JSON representation and become `null`.

use prost_types::value::Kind;
use prost_types::{ListValue, Struct, Value};
use serde_json::{Map, Number, Value as Json};

/// Largest magnitude at which every integer is exactly representable as an `f64`.
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Converts a JSON object into a `Struct`.
pub fn object_to_struct(object: &Map<String, Json>) -> Struct {
    Struct {
        fields: object
            .iter()
            .map(|(k, v)| (k.clone(), json_to_value(v)))
            .collect(),
    }
}

/// Converts a JSON value into a `Value`.
pub fn json_to_value(json: &Json) -> Value {
    let kind = match json {
        Json::Null => Kind::NullValue(0),
        Json::Bool(b) => Kind::BoolValue(*b),
        Json::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or(0.0)),
        Json::String(s) => Kind::StringValue(s.clone()),
        Json::Array(items) => Kind::ListValue(ListValue {
            values: items.iter().map(json_to_value).collect(),
        }),
        Json::Object(map) => Kind::StructValue(object_to_struct(map)),
    };
    Value { kind: Some(kind) }
}

/// Converts a `Struct` into a JSON object.
pub fn struct_to_object(s: &Struct) -> Map<String, Json> {
    s.fields
        .iter()
        .map(|(k, v)| (k.clone(), value_to_json(v)))
        .collect()
}

/// Converts a `Value` into JSON. A value with no kind set is treated as `null`.
pub fn value_to_json(value: &Value) -> Json {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => Json::Null,
        Some(Kind::BoolValue(b)) => Json::Bool(*b),
        Some(Kind::NumberValue(n)) => number_to_json(*n),
        Some(Kind::StringValue(s)) => Json::String(s.clone()),
        Some(Kind::ListValue(list)) => Json::Array(list.values.iter().map(value_to_json).collect()),
        Some(Kind::StructValue(s)) => Json::Object(struct_to_object(s)),
    }
}

fn number_to_json(n: f64) -> Json {
    if !n.is_finite() {
        return Json::Null;
    }
    if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        return Json::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_round_trips_through_struct() {
        let original = json!({
            "name": "Hypertension",
            "severity": 2,
            "ratio": 0.5,
            "active": true,
            "notes": null,
            "codes": ["I10", 3],
            "source": { "system": "icd10" }
        });
        let object = original.as_object().unwrap();

        let back = struct_to_object(&object_to_struct(object));
        assert_eq!(Json::Object(back), original);
    }

    #[test]
    fn integral_doubles_become_integers() {
        assert_eq!(number_to_json(170.0), json!(170));
        assert_eq!(number_to_json(-3.0), json!(-3));
        assert_eq!(number_to_json(1.25), json!(1.25));
    }

    #[test]
    fn non_finite_numbers_become_null() {
        assert_eq!(number_to_json(f64::NAN), Json::Null);
        assert_eq!(number_to_json(f64::INFINITY), Json::Null);
    }

    #[test]
    fn missing_kind_is_null() {
        assert_eq!(value_to_json(&Value { kind: None }), Json::Null);
    }
}
