//! 师生流程集成测试：教师运行 -> 思考日志 -> 引导 -> 学生运行（三种注入方式）-> 升级

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use apprentice::agent::{
        Guidance, InjectionMode, StepAgentConfig, StepAgentRuntime, DEFAULT_SYSTEM_PROMPT,
    };
    use apprentice::browser::StaticBrowserFactory;
    use apprentice::core::{RunOrchestrator, RunRequest, SessionRegistry};
    use apprentice::escalation::EscalationController;
    use apprentice::llm::{Role, ScriptedLlmClient};
    use apprentice::transfer::{ContextFormatter, StepObserver, ThoughtLogStore};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    const FLOWER: &str = "https://en.wikipedia.org/wiki/Flower";
    const FIRST_LINE: &str =
        "A flower, also known as a bloom or blossom, is the reproductive structure found in flowering plants.";
    const TASK: &str = "Get me the first line from the wikipedia article on flowers (https://en.wikipedia.org/wiki/Flower). If you are stuck on a captcha, stop running.";

    fn reply(thinking: &str, next_goal: &str, action: Value) -> String {
        json!({
            "thinking": thinking,
            "evaluation_previous_goal": "Success",
            "memory": format!("working on: {next_goal}"),
            "next_goal": next_goal,
            "action": action
        })
        .to_string()
    }

    fn teacher_script() -> Vec<String> {
        vec![
            reply("I should open the article directly.", "Open the flower article", json!({"name": "go_to_url", "args": {"url": FLOWER}})),
            reply("The page is loaded, read the intro.", "Read the first paragraph", json!({"name": "read_page"})),
            reply("The first sentence is visible.", "Report the first line", json!({"name": "done", "args": {"text": FIRST_LINE}})),
        ]
    }

    fn student_script() -> Vec<String> {
        vec![
            reply("Follow the teacher: open the article.", "Open the flower article", json!({"name": "go_to_url", "args": {"url": FLOWER}})),
            reply("Found it.", "Report", json!({"name": "done", "args": {"text": FIRST_LINE}})),
        ]
    }

    struct Env {
        dir: TempDir,
        registry: Arc<SessionRegistry>,
        orchestrator: RunOrchestrator,
        browsers: Arc<StaticBrowserFactory>,
    }

    fn env() -> Env {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(SessionRegistry::new());
        let runtime = Arc::new(StepAgentRuntime::new(StepAgentConfig {
            max_steps: 6,
            ..Default::default()
        }));
        let orchestrator = RunOrchestrator::new(runtime, registry.clone())
            .with_transcripts_dir(dir.path().join("transcripts"));
        let browsers = Arc::new(StaticBrowserFactory::new().with_page(
            FLOWER,
            "Flower - Wikipedia",
            FIRST_LINE,
        ));
        Env {
            dir,
            registry,
            orchestrator,
            browsers,
        }
    }

    fn transcripts(env: &Env) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(env.dir.path().join("transcripts"))
            .map(|rd| {
                rd.map(|e| e.unwrap().file_name().into_string().unwrap())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    async fn run_teacher(env: &Env, log: &ThoughtLogStore) {
        let llm = Arc::new(ScriptedLlmClient::new(teacher_script()));
        let mut observer = StepObserver::new(log.clone());
        let result = env
            .orchestrator
            .run(
                RunRequest::new(llm, env.browsers.open(), TASK)
                    .with_observer(&mut observer)
                    .with_label("teacher"),
            )
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.final_text.as_deref(), Some(FIRST_LINE));
        assert_eq!(observer.cursor().position(), 3);

        // 日志与运行历史逐条一致
        let stored = log.load().await.unwrap();
        assert_eq!(stored.as_slice(), result.history.model_thoughts());
    }

    #[tokio::test]
    async fn test_teacher_to_student_all_modes() {
        let env = env();
        let teacher_log = ThoughtLogStore::new(env.dir.path().join("thoughts_log.jsonl"));
        let student_log = ThoughtLogStore::new(env.dir.path().join("student_thoughts.jsonl"));
        run_teacher(&env, &teacher_log).await;

        let records = teacher_log.load().await.unwrap();
        let guidance = ContextFormatter::new().format(&records, Some(2));
        assert!(guidance.contains("Step 1:\nThinking: The page is loaded, read the intro."));
        assert!(!guidance.contains("Step 2:"));

        for mode in InjectionMode::ALL {
            let llm = Arc::new(ScriptedLlmClient::new(student_script()));
            let mut observer = StepObserver::new(student_log.clone());
            let result = env
                .orchestrator
                .run(
                    RunRequest::new(llm.clone(), env.browsers.open(), TASK)
                        .with_guidance(Guidance::new(guidance.clone(), mode))
                        .with_observer(&mut observer)
                        .with_label(format!("student_{}", mode.label())),
                )
                .await
                .unwrap();
            assert!(result.success);

            let first = &llm.requests()[0];
            assert_eq!(first[0].role, Role::System);
            match mode {
                InjectionMode::PrependSystem => {
                    assert!(first[0].content.starts_with(&guidance));
                    assert!(first[0].content.contains(DEFAULT_SYSTEM_PROMPT));
                }
                InjectionMode::AttachContext => {
                    assert!(!first[0].content.contains(&guidance));
                    assert_eq!(first[1].role, Role::User);
                    assert!(first[1].content.contains(&guidance));
                }
                InjectionMode::ReplaceSystem => {
                    assert!(first[0].content.starts_with(&guidance));
                    assert!(!first[0].content.contains(DEFAULT_SYSTEM_PROMPT));
                    assert!(first[0].content.contains("go_to_url"));
                }
            }
        }

        // 三次学生运行各 2 步，追加到同一个学生日志
        assert_eq!(student_log.load().await.unwrap().len(), 6);
        // 教师日志不受学生运行影响
        assert_eq!(teacher_log.load().await.unwrap().len(), 3);

        let names = transcripts(&env);
        assert_eq!(names.len(), 4);
        for prefix in ["student_context_", "student_prepend_", "student_replace_", "teacher_"] {
            assert!(names.iter().any(|n| n.starts_with(prefix)), "missing {prefix}");
        }
        assert!(env.registry.is_empty());
    }

    #[tokio::test]
    async fn test_student_consults_then_escalates() {
        let env = env();
        let teacher_log = ThoughtLogStore::new(env.dir.path().join("thoughts_log.jsonl"));
        run_teacher(&env, &teacher_log).await;

        let better = Arc::new(ScriptedLlmClient::new([
            reply("Fresh start.", "Open the article", json!({"name": "go_to_url", "args": {"url": FLOWER}})),
            reply("Got the intro.", "Report", json!({"name": "done", "args": {"text": FIRST_LINE}})),
        ]));
        let controller = EscalationController::from_parts(
            teacher_log.clone(),
            None,
            env.orchestrator.clone(),
            better.clone(),
            env.browsers.clone(),
        );

        let student = Arc::new(ScriptedLlmClient::new([
            reply("I am unsure, ask the teacher.", "Consult", json!({"name": "consult_teacher"})),
            reply("Still stuck behind a captcha.", "Escalate", json!({"name": "spawn_better_agent", "args": {}})),
            reply("The better agent answered.", "Report", json!({"name": "done", "args": {"text": FIRST_LINE}})),
        ]));
        let browser = env.browsers.open();
        let opened_before = env.browsers.opened();
        let result = env
            .orchestrator
            .run(
                RunRequest::new(student.clone(), browser.clone(), TASK)
                    .with_actions(controller.actions_for(browser))
                    .with_label("student_context"),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.steps, 3);

        let steps = result.history.steps();
        assert!(steps[0]
            .observation
            .as_deref()
            .unwrap()
            .starts_with("You are a student agent learning from a smarter teacher agent."));
        assert_eq!(steps[1].observation.as_deref(), Some(FIRST_LINE));

        // 子运行在升级动作返回前已跑完，并使用了新的浏览器句柄
        assert_eq!(better.remaining(), 0);
        assert_eq!(env.browsers.opened(), opened_before + 1);
        let nested_task = better.requests()[0]
            .iter()
            .find(|m| m.content.starts_with("Task: "))
            .map(|m| m.content.clone())
            .unwrap();
        assert!(nested_task.contains(TASK));
        assert!(!better.requests()[0][0].content.contains("spawn_better_agent"));

        // 升级结果进入学生的工作记忆
        let third = &student.requests()[2];
        assert!(third
            .iter()
            .any(|m| m.content.contains(&format!("spawn_better_agent -> {FIRST_LINE}"))));
        assert!(third
            .iter()
            .any(|m| m.content.contains("consult_teacher -> You are a student agent")));

        let names = transcripts(&env);
        assert!(names.iter().any(|n| n.starts_with("escalation_session_")));
        assert!(names.iter().any(|n| n.starts_with("student_context_session_")));
        assert!(env.registry.is_empty());
    }

    #[tokio::test]
    async fn test_consult_without_teacher_log() {
        let env = env();
        let controller = EscalationController::from_parts(
            ThoughtLogStore::new(env.dir.path().join("missing.jsonl")),
            None,
            env.orchestrator.clone(),
            Arc::new(ScriptedLlmClient::new(Vec::<String>::new())),
            env.browsers.clone(),
        );
        let student = Arc::new(ScriptedLlmClient::new([
            reply("Ask the teacher.", "Consult", json!({"name": "consult_teacher"})),
            reply("No help, finish.", "Stop", json!({"name": "done", "args": {"text": "gave up", "success": false}})),
        ]));
        let browser = env.browsers.open();
        let result = env
            .orchestrator
            .run(RunRequest::new(student, browser.clone(), TASK).with_actions(controller.actions_for(browser)))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(
            result.history.steps()[0].observation.as_deref(),
            Some("The teacher's guidance is not available.")
        );
    }
}
