//! Verify query encoding against JSON test vectors stored in `test-vectors/`.
//!
//! Each case gives a parameter map and the exact query string it must encode
//! to. String values become `Text` params and everything else `Json`, which
//! is how callers building params from JSON would map them.

use api_transport::{encode_query_params, requires_multipart, ParamValue, Params};

fn params_from(value: &serde_json::Value) -> Params {
    value
        .as_object()
        .unwrap()
        .iter()
        .map(|(k, v)| {
            let param = match v {
                serde_json::Value::String(s) => ParamValue::Text(s.clone()),
                other => ParamValue::Json(other.clone()),
            };
            (k.clone(), param)
        })
        .collect()
}

#[test]
fn query_test_vectors() {
    let raw = include_str!("../../test-vectors/query.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let params = params_from(&case["params"]);
        let expected = case["expected"].as_str().unwrap();

        assert_eq!(encode_query_params(Some(&params)), expected, "{name}: encoding");
        assert!(!requires_multipart(&params), "{name}: plain params never need multipart");
    }
}

#[test]
fn missing_params_encode_like_empty_vector() {
    assert_eq!(encode_query_params(None), "");
}
