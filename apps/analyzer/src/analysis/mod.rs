// Resume analysis: validation gate, typed stage pipeline, HTTP handlers.
// All inference goes through the StructuredInference capability in llm_client.

pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod validation;
