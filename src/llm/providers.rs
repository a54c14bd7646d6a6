//! 按配置创建 LLM 客户端
//!
//! DeepSeek 与 Gemini 均提供 OpenAI 兼容接口：
//! - DeepSeek: https://api.deepseek.com，Key 取 `DEEPSEEK_API_KEY`
//! - Gemini: https://generativelanguage.googleapis.com/v1beta/openai/，Key 取 `GEMINI_API_KEY` / `GOOGLE_API_KEY`

use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";

/// 运行角色：决定使用哪个模型覆盖
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Teacher,
    Student,
    Escalation,
}

fn env_key(names: &[&str]) -> Option<String> {
    names.iter().find_map(|n| std::env::var(n).ok())
}

/// 根据配置与环境变量选择 LLM 后端；缺少 Key 时退回 Mock
pub fn create_llm(cfg: &AppConfig, role: ModelRole) -> Arc<dyn LlmClient> {
    let section = match role {
        ModelRole::Teacher => &cfg.llm.teacher,
        ModelRole::Student => &cfg.llm.student,
        ModelRole::Escalation => &cfg.llm.escalation,
    };
    let model = section.model.clone().unwrap_or_else(|| cfg.llm.model.clone());
    let provider = cfg.llm.provider.to_lowercase();

    let (base, key) = match provider.as_str() {
        "deepseek" => (
            Some(cfg.llm.base_url.as_deref().unwrap_or(DEEPSEEK_BASE_URL)),
            env_key(&["DEEPSEEK_API_KEY"]),
        ),
        "gemini" => (
            Some(cfg.llm.base_url.as_deref().unwrap_or(GEMINI_BASE_URL)),
            env_key(&["GEMINI_API_KEY", "GOOGLE_API_KEY"]),
        ),
        "openai" => (cfg.llm.base_url.as_deref(), env_key(&["OPENAI_API_KEY"])),
        _ => (None, None),
    };

    match key {
        Some(key) if provider != "mock" => {
            tracing::info!(provider = %provider, model = %model, role = ?role, "using LLM");
            Arc::new(OpenAiClient::new(base, &model, Some(&key)))
        }
        _ => {
            if provider != "mock" {
                tracing::warn!(provider = %provider, "No API key set or provider unknown, using Mock LLM");
            }
            Arc::new(MockLlmClient)
        }
    }
}
