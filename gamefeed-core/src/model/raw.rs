//! Tolerant accessors over a loosely-typed [`serde_json::Value`] object, mirroring the
//! `dict.get(key, default)` coalescing that the upstream wire format requires: a missing or
//! `null` field is never a parse error, only an absent message body is.
use serde_json::Value;

pub fn obj<'a>(v: &'a Value, key: &str) -> Option<&'a Value> {
    v.get(key).filter(|v| !v.is_null())
}

pub fn str_or(v: &Value, key: &str, default: &str) -> String {
    obj(v, key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| default.to_owned())
}

pub fn str_opt(v: &Value, key: &str) -> Option<String> {
    obj(v, key).and_then(Value::as_str).map(str::to_owned)
}

pub fn f64_or(v: &Value, key: &str, default: f64) -> f64 {
    obj(v, key).and_then(Value::as_f64).unwrap_or(default)
}

pub fn f64_opt(v: &Value, key: &str) -> Option<f64> {
    obj(v, key).and_then(Value::as_f64)
}

pub fn i64_or(v: &Value, key: &str, default: i64) -> i64 {
    obj(v, key).and_then(Value::as_i64).unwrap_or(default)
}

pub fn i64_opt(v: &Value, key: &str) -> Option<i64> {
    obj(v, key).and_then(Value::as_i64)
}

pub fn u64_or(v: &Value, key: &str, default: u64) -> u64 {
    obj(v, key).and_then(Value::as_u64).unwrap_or(default)
}

pub fn bool_or(v: &Value, key: &str, default: bool) -> bool {
    obj(v, key).and_then(Value::as_bool).unwrap_or(default)
}

pub fn bool_opt(v: &Value, key: &str) -> Option<bool> {
    obj(v, key).and_then(Value::as_bool)
}

pub fn array<'a>(v: &'a Value, key: &str) -> &'a [Value] {
    obj(v, key).and_then(Value::as_array).map_or(&[], |a| a)
}
