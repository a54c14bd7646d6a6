//! 离线 LLM 客户端（无需 API）
//!
//! - MockLlmClient：第一步即调用 done，回显最后一条 User 消息，便于本地跑通整个流程
//! - ScriptedLlmClient：按顺序返回预置回复，记录每次收到的消息，供测试断言 prompt 内容

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::llm::{LlmClient, Message, Role};

#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        let reply = serde_json::json!({
            "thinking": "Mock model: nothing to reason about.",
            "evaluation_previous_goal": "Unknown",
            "memory": "",
            "next_goal": "Finish immediately",
            "action": {
                "name": "done",
                "args": { "text": format!("Echo from Mock: {last_user}"), "success": true }
            }
        });
        Ok(reply.to_string())
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<String>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// 每次 complete 收到的完整消息列表
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(messages.to_vec());
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| "script exhausted".to_string())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
