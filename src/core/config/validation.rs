use serde_json::{Map, Value};

use super::ConfigError;

const EMBEDDING_PROVIDERS: [&str; 2] = ["openai_compatible", "hashing"];
const LLM_PROVIDERS: [&str; 2] = ["gemini", "openai_compatible"];

pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, u16::MAX as u64)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(rag) = expect_optional_object(root, "rag")? {
        validate_optional_string_field(rag, "rag.persist_dir", "persist_dir")?;
        validate_u64_field(rag, "rag.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(rag, "rag.chunk_overlap", "chunk_overlap", 0, 1_000_000)?;
        validate_u64_field(rag, "rag.top_k", "top_k", 1, 1_000)?;
        validate_u64_field(rag, "rag.embed_batch_size", "embed_batch_size", 1, 10_000)?;

        let size = rag.get("chunk_size").and_then(Value::as_u64).unwrap_or(500);
        let overlap = rag.get("chunk_overlap").and_then(Value::as_u64).unwrap_or(20);
        if overlap >= size {
            return Err(ConfigError::Invalid(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                overlap, size
            )));
        }
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_enum_field(embedding, "embedding.provider", "provider", &EMBEDDING_PROVIDERS)?;
        validate_non_empty_string_field(embedding, "embedding.model", "model")?;
        validate_optional_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_u64_field(embedding, "embedding.dimensions", "dimensions", 1, 65_536)?;
        validate_u64_field(embedding, "embedding.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_enum_field(llm, "llm.provider", "provider", &LLM_PROVIDERS)?;
        validate_non_empty_string_field(llm, "llm.model", "model")?;
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 3_600)?;
        validate_u64_field(llm, "llm.max_output_tokens", "max_output_tokens", 1, 1_000_000)?;
    }

    if let Some(service) = expect_optional_object(root, "service")? {
        validate_non_empty_string_field(service, "service.name", "name")?;
        validate_non_empty_string_field(service, "service.fallback_answer", "fallback_answer")?;
        validate_u64_field(
            service,
            "service.request_timeout_secs",
            "request_timeout_secs",
            1,
            3_600,
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    map: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = map.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let number = value
        .as_u64()
        .ok_or_else(|| config_type_error(path, "non-negative integer"))?;
    if number < min || number > max {
        return Err(ConfigError::Invalid(format!(
            "{} must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    map: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ConfigError> {
    let Some(value) = map.get(key) else {
        return Ok(());
    };
    let number = value
        .as_f64()
        .ok_or_else(|| config_type_error(path, "number"))?;
    if !(min..=max).contains(&number) {
        return Err(ConfigError::Invalid(format!(
            "{} must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    map: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    match map.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(config_type_error(path, "string")),
    }
}

fn validate_non_empty_string_field(
    map: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    match map.get(key) {
        None => Ok(()),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(()),
        Some(Value::String(_)) => Err(ConfigError::Invalid(format!("{} must not be empty", path))),
        Some(_) => Err(config_type_error(path, "string")),
    }
}

fn validate_enum_field(
    map: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ConfigError> {
    let Some(value) = map.get(key) else {
        return Ok(());
    };
    let text = value
        .as_str()
        .ok_or_else(|| config_type_error(path, "string"))?;
    if !allowed.contains(&text) {
        return Err(ConfigError::Invalid(format!(
            "{} must be one of: {}",
            path,
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn validate_string_array_field(
    map: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = map.get(key) else {
        return Ok(());
    };
    let items = value
        .as_array()
        .ok_or_else(|| config_type_error(path, "array of strings"))?;
    if items.iter().any(|item| !item.is_string()) {
        return Err(config_type_error(path, "array of strings"));
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::Invalid(format!("{} must be {}", path, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_and_default_shaped_configs() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({
            "rag": { "chunk_size": 500, "chunk_overlap": 20, "top_k": 2 },
            "llm": { "provider": "gemini", "temperature": 0.4 },
            "embedding": { "provider": "hashing", "dimensions": 64 }
        }))
        .is_ok());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let err = validate_config(&json!({
            "rag": { "chunk_size": 100, "chunk_overlap": 100 }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn rejects_zero_top_k_and_bad_temperature() {
        assert!(validate_config(&json!({ "rag": { "top_k": 0 } })).is_err());
        assert!(validate_config(&json!({ "llm": { "temperature": 3.5 } })).is_err());
    }

    #[test]
    fn rejects_unknown_providers_and_empty_models() {
        assert!(validate_config(&json!({ "llm": { "provider": "mystery" } })).is_err());
        assert!(validate_config(&json!({ "embedding": { "model": "  " } })).is_err());
    }

    #[test]
    fn rejects_non_object_sections() {
        assert!(validate_config(&json!({ "server": "localhost" })).is_err());
        assert!(validate_config(&json!([1, 2])).is_err());
    }
}
