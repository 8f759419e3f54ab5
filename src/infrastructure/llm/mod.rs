mod gemini_client;
mod scripted_llm_client;

pub use gemini_client::{GeminiClient, GeminiClientConfig};
pub use scripted_llm_client::ScriptedLlmClient;
