use serde::de::DeserializeOwned;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        if inner.is_syntax() || inner.is_eof() {
            // position is more useful than a path for malformed text
            inner.to_string()
        } else {
            format!("at JSON path {path} → {inner}")
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Doc {
        items: Vec<Item>,
    }

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Item {
        id: u32,
    }

    #[test]
    fn reports_json_path_of_type_errors() {
        let err = from_str_with_path::<Doc>(r#"{"items": [{"id": 1}, {"id": "x"}]}"#).unwrap_err();
        assert!(err.contains("items[1].id"), "{err}");
    }

    #[test]
    fn reports_position_of_syntax_errors() {
        let err = from_str_with_path::<serde_json::Value>("{\"a\": ").unwrap_err();
        assert!(err.contains("line 1"), "{err}");
    }
}
