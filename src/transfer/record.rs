//! 单步推理记录
//!
//! 每一步 Agent 输出的四段推理（thinking / evaluation_previous_goal / memory / next_goal），
//! 在日志中序列化为一行 JSON；字段可为 null。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 一步推理：创建后不再修改，顺序即推理轨迹
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ThoughtRecord {
    /// 本步的思考过程
    pub thinking: Option<String>,
    /// 对上一步目标是否达成的评估
    pub evaluation_previous_goal: Option<String>,
    /// 需要跨步保留的记忆
    pub memory: Option<String>,
    /// 下一步目标
    pub next_goal: Option<String>,
}

impl ThoughtRecord {
    pub fn new(
        thinking: impl Into<String>,
        evaluation_previous_goal: impl Into<String>,
        memory: impl Into<String>,
        next_goal: impl Into<String>,
    ) -> Self {
        Self {
            thinking: Some(thinking.into()),
            evaluation_previous_goal: Some(evaluation_previous_goal.into()),
            memory: Some(memory.into()),
            next_goal: Some(next_goal.into()),
        }
    }

    pub fn thinking(&self) -> &str {
        self.thinking.as_deref().unwrap_or("")
    }

    pub fn evaluation_previous_goal(&self) -> &str {
        self.evaluation_previous_goal.as_deref().unwrap_or("")
    }

    pub fn memory(&self) -> &str {
        self.memory.as_deref().unwrap_or("")
    }

    pub fn next_goal(&self) -> &str {
        self.next_goal.as_deref().unwrap_or("")
    }
}
