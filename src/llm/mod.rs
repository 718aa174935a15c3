mod openai;
pub mod parsing;
pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::GenerationConfig;
use crate::error::Result;

pub use openai::ChatCompletionsBackend;
pub use prompts::GuideRequest;

/// Something that can turn a guide request into raw model output.
///
/// Implementations return the completion text untouched and classify
/// transport failures; they never retry on their own.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, request: &GuideRequest) -> Result<String>;

    /// Get the backend name
    fn name(&self) -> &'static str;
}

/// Build the configured generation backend.
pub fn backend_from_config(
    config: &GenerationConfig,
    model_override: Option<&str>,
) -> anyhow::Result<Arc<dyn GenerationBackend>> {
    let model = model_override.unwrap_or(&config.model);
    let backend = ChatCompletionsBackend::new(&config.api_key, model, &config.base_url)?;
    Ok(Arc::new(backend))
}
