use serde_json::{Map, Value};

use super::ConfigError;

const METRICS: [&str; 5] = ["cosine", "euclidean", "dotproduct", "dot", "dot_product"];
const BACKENDS: [&str; 2] = ["pinecone", "memory"];
const ROTATIONS: [&str; 3] = ["daily", "hourly", "never"];
const MAX_INDEX_NAME_LEN: usize = 45;

pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(index) = expect_optional_object(root, "index")? {
        validate_enum_field(index, "index.backend", "backend", &BACKENDS)?;
        validate_index_name_field(index, "index.name", "name")?;
        validate_u64_field(index, "index.dimension", "dimension", 1, 20_000)?;
        validate_enum_field(index, "index.metric", "metric", &METRICS)?;
        validate_non_empty_string_field(index, "index.cloud", "cloud")?;
        validate_non_empty_string_field(index, "index.region", "region")?;
        validate_optional_string_field(index, "index.api_key", "api_key")?;
        validate_optional_string_field(index, "index.host", "host")?;
        validate_optional_string_field(index, "index.namespace", "namespace")?;
        validate_u64_field(index, "index.timeout_secs", "timeout_secs", 1, 3_600)?;
        validate_u64_field(
            index,
            "index.ready_timeout_secs",
            "ready_timeout_secs",
            0,
            86_400,
        )?;
        validate_u64_field(
            index,
            "index.ready_poll_interval_ms",
            "ready_poll_interval_ms",
            1,
            600_000,
        )?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_non_empty_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_non_empty_string_field(embedding, "embedding.model", "model")?;
        validate_optional_string_field(embedding, "embedding.api_key", "api_key")?;
        validate_u64_field(embedding, "embedding.timeout_secs", "timeout_secs", 1, 3_600)?;
        validate_bool_field(embedding, "embedding.verify_dimension", "verify_dimension")?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 10_000)?;
    }

    if let Some(logging) = expect_optional_object(root, "logging")? {
        validate_non_empty_string_field(logging, "logging.level", "level")?;
        validate_non_empty_string_field(logging, "logging.file_name", "file_name")?;
        validate_enum_field(logging, "logging.rotation", "rotation", &ROTATIONS)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ConfigError::invalid(
            path,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ConfigError::invalid(path, "value cannot be empty"));
    }
    Ok(())
}

/// Index names are lowercase alphanumerics and inner hyphens.
fn validate_index_name_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    validate_non_empty_string_field(section, path, key)?;
    let Some(name) = section.get(key).and_then(Value::as_str) else {
        return Ok(());
    };

    let charset_ok = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !charset_ok || name.starts_with('-') || name.ends_with('-') {
        return Err(ConfigError::invalid(
            path,
            "must contain only lowercase letters, digits and inner hyphens",
        ));
    }
    if name.len() > MAX_INDEX_NAME_LEN {
        return Err(ConfigError::invalid(
            path,
            format!("must be at most {} characters", MAX_INDEX_NAME_LEN),
        ));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text.to_lowercase().as_str()) {
        return Err(ConfigError::invalid(
            path,
            format!("must be one of {}", allowed.join(", ")),
        ));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", path, index);
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&item_path, "string"));
        };
        if text.trim().is_empty() {
            return Err(ConfigError::invalid(&item_path, "value cannot be empty"));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::invalid(path, format!("expected {}", expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_full_config() {
        let config = json!({
            "server": { "host": "0.0.0.0", "port": 8000, "cors_allowed_origins": ["http://localhost:3000"] },
            "index": { "backend": "pinecone", "name": "kaanoon", "dimension": 768, "metric": "cosine", "cloud": "aws", "region": "us-east-1", "api_key": null },
            "embedding": { "base_url": "http://localhost:8080", "model": "all-mpnet-base-v2" },
            "retrieval": { "top_k": 5 }
        });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_zero_top_k() {
        let err = validate_config(&json!({ "retrieval": { "top_k": 0 } })).unwrap_err();
        assert!(err.to_string().contains("retrieval.top_k"));
    }

    #[test]
    fn rejects_unknown_metric() {
        let err = validate_config(&json!({ "index": { "metric": "manhattan" } })).unwrap_err();
        assert!(err.to_string().contains("index.metric"));
    }

    #[test]
    fn rejects_wrong_section_type() {
        let err = validate_config(&json!({ "index": "kaanoon" })).unwrap_err();
        assert!(err.to_string().contains("expected object"));
    }

    #[test]
    fn rejects_unknown_log_rotation() {
        let err = validate_config(&json!({ "logging": { "rotation": "weekly" } })).unwrap_err();
        assert!(err.to_string().contains("logging.rotation"));
    }

    #[test]
    fn rejects_empty_origin() {
        let err = validate_config(&json!({ "server": { "cors_allowed_origins": ["  "] } }))
            .unwrap_err();
        assert!(err.to_string().contains("server.cors_allowed_origins[0]"));
    }

    #[test]
    fn index_name_must_be_a_valid_path_segment() {
        for bad in ["Kaanoon", "kaanoon index", "../admin", "-kaanoon", "kaanoon_v2"] {
            let err = validate_config(&json!({ "index": { "name": bad } })).unwrap_err();
            assert!(err.to_string().contains("index.name"), "{bad} should be rejected");
        }
        let too_long = "k".repeat(MAX_INDEX_NAME_LEN + 1);
        assert!(validate_config(&json!({ "index": { "name": too_long } })).is_err());

        assert!(validate_config(&json!({ "index": { "name": "kaanoon-judgments-2024" } })).is_ok());
    }
}
