//! Agent 单步输出解析
//!
//! LLM 每步返回一个 JSON：四段推理 + 一个动作
//! `{"thinking": ..., "evaluation_previous_goal": ..., "memory": ..., "next_goal": ..., "action": {"name": ..., "args": {...}}}`。
//! 允许 ```json 代码块或前后夹杂文字；schemars 生成的 Schema 拼入 system prompt，减少格式错误。

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AgentError;
use crate::transfer::ThoughtRecord;

/// 结束运行的内置动作名
pub const DONE_ACTION: &str = "done";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionInvocation {
    /// 动作名，如 go_to_url、read_page、done
    pub name: String,
    /// 动作参数，依动作不同而不同
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgentOutput {
    #[serde(flatten)]
    pub thought: ThoughtRecord,
    pub action: ActionInvocation,
}

impl AgentOutput {
    pub fn is_done(&self) -> bool {
        self.action.name == DONE_ACTION
    }

    /// done 动作的最终文本与成功标记（success 缺省为 true）
    pub fn done_payload(&self) -> (Option<String>, bool) {
        let text = self
            .action
            .args
            .get("text")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let success = self
            .action
            .args
            .get("success")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        (text, success)
    }
}

/// 提取 JSON 块（```json ... ``` 或首个 '{' 到最后一个 '}'）并解析
pub fn parse_agent_output(output: &str) -> Result<AgentOutput, AgentError> {
    let trimmed = output.trim();
    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim())
    } else {
        match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(start), Some(end)) if start < end => &trimmed[start..=end],
            _ => {
                return Err(AgentError::JsonParseError(format!(
                    "no JSON object in reply: {}",
                    preview(trimmed)
                )))
            }
        }
    };

    let parsed: AgentOutput = serde_json::from_str(json_str)
        .map_err(|e| AgentError::JsonParseError(format!("{}: {}", e, preview(json_str))))?;
    if parsed.action.name.trim().is_empty() {
        return Err(AgentError::JsonParseError("empty action name".to_string()));
    }
    Ok(parsed)
}

/// 单步输出的 JSON Schema 字符串，可拼入 system prompt
pub fn output_schema_json() -> String {
    let schema = schema_for!(AgentOutput);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

fn preview(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let out = parse_agent_output(
            r#"{"thinking":"open page","evaluation_previous_goal":"Unknown","memory":"","next_goal":"go","action":{"name":"go_to_url","args":{"url":"https://en.wikipedia.org/wiki/Flower"}}}"#,
        )
        .unwrap();
        assert_eq!(out.thought.thinking(), "open page");
        assert_eq!(out.action.name, "go_to_url");
        assert!(!out.is_done());
    }

    #[test]
    fn test_parse_fenced_with_prose() {
        let reply = "Sure, here is my step:\n```json\n{\"thinking\":\"t\",\"evaluation_previous_goal\":null,\"memory\":null,\"next_goal\":\"finish\",\"action\":{\"name\":\"done\",\"args\":{\"text\":\"A flower is...\"}}}\n```";
        let out = parse_agent_output(reply).unwrap();
        assert!(out.is_done());
        assert_eq!(out.done_payload(), (Some("A flower is...".to_string()), true));
    }

    #[test]
    fn test_missing_args_defaults_to_null() {
        let out = parse_agent_output(r#"{"action":{"name":"read_page"}}"#).unwrap();
        assert!(out.action.args.is_null());
        assert_eq!(out.thought, ThoughtRecord::default());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_agent_output("I am not sure what to do"),
            Err(AgentError::JsonParseError(_))
        ));
        assert!(matches!(
            parse_agent_output(r#"{"thinking":"no action"}"#),
            Err(AgentError::JsonParseError(_))
        ));
        assert!(matches!(
            parse_agent_output(r#"{"action":{"name":" "}}"#),
            Err(AgentError::JsonParseError(_))
        ));
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = output_schema_json();
        assert!(schema.contains("next_goal"));
        assert!(schema.contains("action"));
    }
}
