//! LLM 层：消息类型、客户端抽象与实现（OpenAI 兼容 / Mock / Scripted）

pub mod message;
pub mod mock;
pub mod openai;
pub mod providers;
pub mod traits;

pub use message::{Message, Role};
pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use providers::{create_llm, ModelRole, DEEPSEEK_BASE_URL, GEMINI_BASE_URL};
pub use traits::LlmClient;
