//! System prompt 组装与教师引导注入
//!
//! 三种注入方式互斥，每次运行至多一种：
//! - PrependSystem：引导放在基础指令之前，同一条 system 消息
//! - AttachContext：基础 system 不变，引导作为独立的上下文消息紧随其后
//! - ReplaceSystem：引导替换基础指令；动作目录与输出格式仍然追加，否则无法解析回复

use std::fmt;
use std::str::FromStr;

use crate::agent::output::{output_schema_json, DONE_ACTION};
use crate::llm::Message;
use crate::tools::ActionRegistry;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a browser-operating agent. You complete the user's task step by step. \
At every step you reason about the current state, evaluate whether your previous goal succeeded, \
keep short notes in memory, set the next goal, and choose exactly one action. \
Use only the actions listed below. When the task is finished, or you decide it cannot be finished \
(for example because you are blocked by a captcha), call the done action.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionMode {
    PrependSystem,
    AttachContext,
    ReplaceSystem,
}

impl InjectionMode {
    pub const ALL: [InjectionMode; 3] = [
        InjectionMode::PrependSystem,
        InjectionMode::AttachContext,
        InjectionMode::ReplaceSystem,
    ];

    /// 用于对话记录文件名
    pub fn label(&self) -> &'static str {
        match self {
            Self::PrependSystem => "prepend",
            Self::AttachContext => "context",
            Self::ReplaceSystem => "replace",
        }
    }
}

impl fmt::Display for InjectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InjectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prepend" | "prepend-to-system-prompt" => Ok(Self::PrependSystem),
            "context" | "attach-as-context" => Ok(Self::AttachContext),
            "replace" | "replace-system-prompt" => Ok(Self::ReplaceSystem),
            other => Err(format!("unknown injection mode: {other}")),
        }
    }
}

/// 教师引导及其注入位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guidance {
    pub text: String,
    pub mode: InjectionMode,
}

impl Guidance {
    pub fn new(text: impl Into<String>, mode: InjectionMode) -> Self {
        Self {
            text: text.into(),
            mode,
        }
    }
}

/// 动作目录（含内置 done）与输出格式段落
fn protocol_section(actions: &ActionRegistry) -> String {
    format!(
        "## Available actions\n{}- {}: Finish the task. Args: {{\"text\": \"final answer\", \"success\": true}}\n\n\
## Response format\nReply with exactly one JSON object matching this schema, and nothing else:\n{}",
        actions.catalogue(),
        DONE_ACTION,
        output_schema_json()
    )
}

/// 组装每步请求的固定前缀（system 消息，以及 AttachContext 时的上下文消息）
pub fn build_preamble(
    base_system: &str,
    actions: &ActionRegistry,
    guidance: Option<&Guidance>,
) -> Vec<Message> {
    let protocol = protocol_section(actions);
    match guidance {
        None => vec![Message::system(format!("{base_system}\n\n{protocol}"))],
        Some(g) => match g.mode {
            InjectionMode::PrependSystem => vec![Message::system(format!(
                "{}\n\n{base_system}\n\n{protocol}",
                g.text
            ))],
            InjectionMode::AttachContext => vec![
                Message::system(format!("{base_system}\n\n{protocol}")),
                Message::user(format!("Context for the task:\n{}", g.text)),
            ],
            InjectionMode::ReplaceSystem => {
                vec![Message::system(format!("{}\n\n{protocol}", g.text))]
            }
        },
    }
}
