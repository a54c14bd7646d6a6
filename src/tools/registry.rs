//! 动作注册表
//!
//! 所有动作实现 Action trait（name / description / execute），由 ActionRegistry 按名注册与查找，
//! ActionExecutor 在调用时加超时并统一转 AgentError。
//! description 会原样出现在 system prompt 的动作列表里，供 LLM 理解何时调用。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::ContextRef;

/// 一次动作调用：LLM 给出的参数 + 发起运行的上下文引用
#[derive(Debug, Clone, Default)]
pub struct ActionCall {
    pub args: Value,
    pub context: Option<ContextRef>,
}

impl ActionCall {
    pub fn new(args: Value) -> Self {
        Self {
            args,
            context: None,
        }
    }

    pub fn with_context(mut self, context: ContextRef) -> Self {
        self.context = Some(context);
        self
    }

    /// 候选上下文，按优先级：args 中的 "context" 映射，其次为运行时传入的上下文
    ///
    /// 前者解析不出任务时调用方应继续尝试后者。
    pub fn contexts(&self) -> Vec<ContextRef> {
        self.args
            .get("context")
            .and_then(ContextRef::from_value)
            .into_iter()
            .chain(self.context.clone())
            .collect()
    }

    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(|v| v.as_str())
    }
}

/// 动作结果：text 为返回给 Agent 的内容；remember 为 true 时写入 Agent 的工作记忆
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub text: String,
    pub remember: bool,
    #[serde(default)]
    pub is_error: bool,
}

impl ActionResult {
    pub fn remembered(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            remember: true,
            is_error: false,
        }
    }

    pub fn transient(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            remember: false,
            is_error: false,
        }
    }

    /// 失败但可报告的结果（仍写入工作记忆，让 Agent 知道这条路走不通）
    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            remember: true,
            is_error: true,
        }
    }
}

/// 动作 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行
#[async_trait]
pub trait Action: Send + Sync {
    /// 动作名称（对应 LLM 输出中 action.name）
    fn name(&self) -> &str;

    /// 动作描述（展示给 LLM 的文档）
    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认无参数
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 为 true 时执行器不加超时（在一步内跑完整个子运行的动作）
    fn timeout_exempt(&self) -> bool {
        false
    }

    async fn execute(&self, call: ActionCall) -> ActionResult;
}

/// 动作注册表：按名称有序存储 Arc<dyn Action>，保证生成的动作列表稳定
#[derive(Default, Clone)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: impl Action + 'static) {
        self.register_arc(Arc::new(action));
    }

    pub fn register_arc(&mut self, action: Arc<dyn Action>) {
        let name = action.name().to_string();
        if self.actions.insert(name.clone(), action).is_some() {
            tracing::warn!(action = %name, "action registered twice, replacing");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.actions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// 返回 (name, description) 列表
    pub fn descriptions(&self) -> Vec<(String, String)> {
        self.actions
            .iter()
            .map(|(name, action)| (name.clone(), action.description().to_string()))
            .collect()
    }

    /// 生成 prompt 中的动作目录（名称、描述、参数 schema）
    pub fn catalogue(&self) -> String {
        let mut s = String::new();
        for (name, action) in &self.actions {
            s.push_str(&format!(
                "- {}: {}\n  args schema: {}\n",
                name,
                action.description(),
                action.parameters_schema()
            ));
        }
        s
    }
}
