//! Schema inference over a single sample document.
//!
//! Arrays are typed from their first element; an empty array yields
//! `Array(Any)`. This is a deliberate precision loss, not an error.
use serde_json::{Map, Value};

use super::{Properties, Property, SchemaNode};

pub fn observe(v: &Value) -> SchemaNode {
    match v {
        Value::Null => SchemaNode::Null,
        Value::Bool(_) => SchemaNode::Bool,
        Value::Number(n) if n.is_f64() => SchemaNode::Float,
        Value::Number(_) => SchemaNode::Integer,
        Value::String(_) => SchemaNode::String,
        Value::Array(xs) => SchemaNode::array_of(xs.first().map(observe).unwrap_or(SchemaNode::Any)),
        Value::Object(m) => SchemaNode::Object(observe_object(m)),
    }
}

fn observe_object(map: &Map<String, Value>) -> Properties {
    map.iter()
        .map(|(k, v)| (k.clone(), Property::new(observe(v))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitives() {
        assert_eq!(observe(&json!(null)), SchemaNode::Null);
        assert_eq!(observe(&json!(true)), SchemaNode::Bool);
        assert_eq!(observe(&json!(3)), SchemaNode::Integer);
        assert_eq!(observe(&json!(u64::MAX)), SchemaNode::Integer);
        assert_eq!(observe(&json!(3.5)), SchemaNode::Float);
        assert_eq!(observe(&json!("x")), SchemaNode::String);
    }

    #[test]
    fn arrays_use_first_element() {
        assert_eq!(observe(&json!([1, "a"])), SchemaNode::array_of(SchemaNode::Integer));
        assert_eq!(observe(&json!([])), SchemaNode::array_of(SchemaNode::Any));
    }

    #[test]
    fn objects_keep_source_order() {
        let SchemaNode::Object(props) = observe(&json!({"z": 1, "a": {"b": []}})) else {
            panic!("expected object");
        };
        let keys: Vec<_> = props.keys().cloned().collect();
        assert_eq!(keys, ["z", "a"]);
        let SchemaNode::Object(inner) = &props["a"].node else { panic!("expected object") };
        assert_eq!(inner["b"].node, SchemaNode::array_of(SchemaNode::Any));
    }
}
