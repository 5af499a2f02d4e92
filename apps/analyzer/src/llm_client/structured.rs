//! Structured inference capability.
//!
//! The pipeline asks for "a value of type `T`" and never sees the backend.
//! `LlmClient` is the production implementation; tests plug in scripted stubs.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::LlmError;

/// One schema-constrained generation request.
#[derive(Debug, Clone, Copy)]
pub struct InferenceRequest<'a> {
    /// Role prompt.
    pub system: &'a str,
    /// User prompt.
    pub prompt: &'a str,
    pub schema_name: &'static str,
    /// JSON Schema the returned value must conform to.
    pub schema: &'a Value,
}

/// A backend able to return a JSON value for a prompt + target schema.
#[async_trait]
pub trait StructuredInference: Send + Sync {
    async fn infer_value(&self, request: InferenceRequest<'_>) -> Result<Value, LlmError>;
}

/// A type that can be requested from a `StructuredInference` backend.
///
/// Deserialization rejects missing and wrong-typed fields; `check` rejects
/// values that parse but violate the type's own bounds. Nothing is clamped.
pub trait StructuredOutput: DeserializeOwned + Send {
    const NAME: &'static str;

    fn schema() -> Value;

    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Requests a `T` from the backend and validates it against `T`'s contract.
pub async fn infer<T: StructuredOutput>(
    provider: &dyn StructuredInference,
    system: &str,
    prompt: &str,
) -> Result<T, LlmError> {
    let schema = T::schema();
    let value = provider
        .infer_value(InferenceRequest {
            system,
            prompt,
            schema_name: T::NAME,
            schema: &schema,
        })
        .await?;

    let output: T = serde_json::from_value(value).map_err(|e| LlmError::Schema {
        schema: T::NAME,
        reason: e.to_string(),
    })?;
    output.check().map_err(|reason| LlmError::Schema {
        schema: T::NAME,
        reason,
    })?;
    Ok(output)
}
