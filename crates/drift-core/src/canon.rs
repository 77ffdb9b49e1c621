use serde_json::Value;

/// Produce canonical JSON bytes: object keys sorted lexicographically (recursive),
/// arrays preserve order, no extra whitespace. Numbers keep serde_json's
/// shortest round-trip formatting.
///
/// Fingerprint shas are computed over these bytes, so the output format is a
/// compatibility contract: changing it changes every stored sha.
pub fn canonical_json_bytes(value: &Value) -> Vec<u8> {
    let sorted = sort_value(value);
    serde_json::to_vec(&sorted).expect("canonical JSON serialization should not fail")
}

fn sort_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<(&String, Value)> =
                map.iter().map(|(k, v)| (k, sort_value(v))).collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> =
                pairs.into_iter().map(|(k, v)| (k.clone(), v)).collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon_str(value: &Value) -> String {
        String::from_utf8(canonical_json_bytes(value)).unwrap()
    }

    #[test]
    fn keys_sorted_lexicographically() {
        let input: Value = serde_json::from_str(r#"{"z":1,"a":2,"m":3}"#).unwrap();
        assert_eq!(canon_str(&input), r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn nested_objects_inside_arrays_sorted() {
        let input: Value =
            serde_json::from_str(r#"[{"version":"1.2","name":"lodash"},{"b":{"y":1,"x":2}}]"#)
                .unwrap();
        assert_eq!(
            canon_str(&input),
            r#"[{"name":"lodash","version":"1.2"},{"b":{"x":2,"y":1}}]"#
        );
    }

    #[test]
    fn arrays_preserve_order() {
        let input: Value = serde_json::from_str(r#"{"deps":["b","a","c"]}"#).unwrap();
        assert_eq!(canon_str(&input), r#"{"deps":["b","a","c"]}"#);
    }

    #[test]
    fn equivalent_objects_share_bytes() {
        let a: Value = serde_json::from_str(r#"{"image":"node","tag":"18","labels":{"x":1,"a":0}}"#)
            .unwrap();
        let b: Value = serde_json::from_str(r#"{"labels":{"a":0,"x":1},"tag":"18","image":"node"}"#)
            .unwrap();
        assert_eq!(canonical_json_bytes(&a), canonical_json_bytes(&b));
    }

    #[test]
    fn scalars_unchanged() {
        let input: Value = serde_json::from_str(r#""hello""#).unwrap();
        assert_eq!(canon_str(&input), r#""hello""#);
    }
}
