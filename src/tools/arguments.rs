//! Typed access to tool call arguments.

use crate::error::FinanceError;

/// Wrapper around a tool call's argument bag providing typed extraction.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, FinanceError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                FinanceError::InvalidArgument(format!("Missing string argument: {key}"))
            })
    }

    /// Arguments with string-encoded objects decoded.
    ///
    /// Some models send the argument object as a JSON-encoded string.
    pub fn normalized(&self) -> Result<serde_json::Value, FinanceError> {
        match &self.value {
            serde_json::Value::String(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    Ok(serde_json::json!({}))
                } else {
                    serde_json::from_str::<serde_json::Value>(trimmed).map_err(|e| {
                        FinanceError::InvalidArgument(format!(
                            "Failed to deserialize arguments: {e}"
                        ))
                    })
                }
            }
            serde_json::Value::Null => Ok(serde_json::json!({})),
            other => Ok(other.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_string_encoded_object() {
        let args = ToolArguments::new(json!(r#"{"ticker": "MSFT"}"#));
        let decoded = ToolArguments::new(args.normalized().unwrap());
        assert_eq!(decoded.get_str("ticker").unwrap(), "MSFT");
    }

    #[test]
    fn null_and_blank_arguments_become_empty_object() {
        assert_eq!(ToolArguments::new(json!(null)).normalized().unwrap(), json!({}));
        assert_eq!(ToolArguments::new(json!("  ")).normalized().unwrap(), json!({}));
    }

    #[test]
    fn missing_string_is_invalid_argument() {
        let args = ToolArguments::new(json!({}));
        assert!(matches!(args.get_str("ticker"), Err(FinanceError::InvalidArgument(_))));
    }
}
