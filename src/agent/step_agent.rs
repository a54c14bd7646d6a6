//! 逐步 Agent 主循环
//!
//! 固定前缀（system + 可选引导）-> 任务 / 当前 URL / 工作记忆 / 上一步观察 -> LLM ->
//! 解析四段推理与动作 -> done 则结束，否则经 ActionExecutor 执行并写回观察 -> StepHook -> 下一步。
//! 动作在本步内同步完成（包括嵌套整个子运行的 spawn better agent），之后才进入下一步。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::agent::{
    build_preamble, parse_agent_output, AgentHistory, AgentRuntime, AgentSpec, RunResult,
    StepHook, StepRecord, TranscriptWriter, WorkingMemory, DEFAULT_SYSTEM_PROMPT,
};
use crate::core::AgentError;
use crate::llm::Message;
use crate::tools::{ActionCall, ActionExecutor};

/// 解析失败时注入下一步的纠正提示
const FORMAT_CORRECTION: &str = "Your previous reply could not be parsed. \
Reply with exactly one JSON object with the keys thinking, evaluation_previous_goal, memory, next_goal and action \
(action = {\"name\": \"...\", \"args\": {...}}). No markdown, no extra text.";

#[derive(Debug, Clone)]
pub struct StepAgentConfig {
    pub max_steps: usize,
    pub action_timeout: Duration,
    pub system_prompt: String,
}

impl Default for StepAgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 20,
            action_timeout: Duration::from_secs(600),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StepAgentRuntime {
    config: StepAgentConfig,
}

impl StepAgentRuntime {
    pub fn new(config: StepAgentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StepAgentConfig {
        &self.config
    }
}

async fn notify(hook: &mut Option<&mut dyn StepHook>, history: &AgentHistory) {
    if let Some(h) = hook.as_mut() {
        if let Err(e) = h.on_step_end(history).await {
            tracing::warn!(error = %e, "step hook failed, will retry on next step");
        }
    }
}

#[async_trait]
impl AgentRuntime for StepAgentRuntime {
    async fn run(
        &self,
        spec: AgentSpec,
        mut hook: Option<&mut dyn StepHook>,
    ) -> Result<RunResult, AgentError> {
        let AgentSpec {
            context,
            llm,
            browser,
            actions,
            guidance,
            transcript_path,
        } = spec;

        let executor = ActionExecutor::new(Arc::clone(&actions), self.config.action_timeout);
        let preamble = build_preamble(&self.config.system_prompt, &actions, guidance.as_ref());
        let transcript = transcript_path.map(TranscriptWriter::new);
        if let Some(t) = &transcript {
            t.record(0, &preamble).await;
        }

        let mut history = AgentHistory::new();
        let mut memory = WorkingMemory::new();
        let mut observation: Option<String> = None;
        let mut correction: Option<&str> = None;

        tracing::info!(
            session_id = %context.session_id(),
            model = llm.model_name(),
            guidance = guidance.as_ref().map(|g| g.mode.label()).unwrap_or("none"),
            "agent run started"
        );

        for step in 0..self.config.max_steps {
            let mut turn = vec![Message::user(format!("Task: {}", context.task()))];
            if let Some(url) = browser.current_url().await {
                turn.push(Message::user(format!("Current URL: {url}")));
            }
            if !memory.is_empty() {
                turn.push(Message::user(memory.to_prompt_section()));
            }
            if let Some(obs) = observation.take() {
                turn.push(Message::user(format!("Result of your previous action:\n{obs}")));
            }
            if let Some(c) = correction.take() {
                turn.push(Message::user(c));
            }

            let mut messages = preamble.clone();
            messages.extend(turn.iter().cloned());
            let reply = llm.complete(&messages).await.map_err(AgentError::LlmError)?;
            if let Some(t) = &transcript {
                turn.push(Message::assistant(reply.clone()));
                t.record(step, &turn).await;
            }

            let output = match parse_agent_output(&reply) {
                Ok(o) => o,
                Err(e) => {
                    tracing::warn!(step, error = %e, "unparseable agent reply");
                    correction = Some(FORMAT_CORRECTION);
                    history.push(StepRecord {
                        step,
                        thought: None,
                        action: None,
                        observation: Some(e.to_string()),
                    });
                    notify(&mut hook, &history).await;
                    continue;
                }
            };

            tracing::debug!(step, next_goal = output.thought.next_goal(), action = %output.action.name, "agent step");

            if output.is_done() {
                let (final_text, success) = output.done_payload();
                history.push(StepRecord {
                    step,
                    thought: Some(output.thought),
                    action: Some(output.action.name),
                    observation: final_text.clone(),
                });
                notify(&mut hook, &history).await;
                tracing::info!(
                    session_id = %context.session_id(),
                    steps = step + 1,
                    success,
                    tokens = ?llm.token_usage(),
                    "agent run finished"
                );
                return Ok(RunResult {
                    final_text,
                    success,
                    steps: step + 1,
                    history,
                });
            }

            let name = output.action.name.clone();
            let call = ActionCall::new(output.action.args).with_context(context.clone().into());
            let text = match executor.execute(&name, call).await {
                Ok(result) => {
                    if result.is_error {
                        memory.add_failure(&name, &result.text);
                    } else if result.remember {
                        memory.remember(&name, &result.text);
                    }
                    result.text
                }
                Err(AgentError::UnknownAction(n)) => {
                    let available = actions.names().join(", ");
                    memory.add_failure(&n, "no such action");
                    format!("Unknown action '{n}'. Available actions: {available}, done")
                }
                Err(AgentError::ActionTimeout(n)) => {
                    memory.add_failure(&n, "timed out");
                    format!("Action '{n}' timed out")
                }
                Err(e) => return Err(e),
            };

            history.push(StepRecord {
                step,
                thought: Some(output.thought),
                action: Some(name),
                observation: Some(text.clone()),
            });
            observation = Some(text);
            notify(&mut hook, &history).await;
        }

        tracing::warn!(session_id = %context.session_id(), max_steps = self.config.max_steps, "agent hit step limit");
        Ok(RunResult {
            final_text: None,
            success: false,
            steps: self.config.max_steps,
            history,
        })
    }
}
