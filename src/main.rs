//! Apprentice 命令行
//!
//! - teach：教师运行，逐步把推理写入教师日志
//! - learn：读取教师日志生成引导，按注入方式依次跑学生运行（可带升级动作）
//! - guidance：只打印由教师日志生成的引导文本

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use apprentice::agent::{Guidance, InjectionMode, RunResult, StepAgentConfig, StepAgentRuntime};
use apprentice::browser::create_browser_factory;
use apprentice::config::{load_config, AppConfig};
use apprentice::core::{RunOrchestrator, RunRequest, SessionRegistry};
use apprentice::escalation::EscalationController;
use apprentice::llm::{create_llm, ModelRole};
use apprentice::observability;
use apprentice::transfer::{ContextFormatter, StepObserver, ThoughtLogStore};

const DEFAULT_TASK: &str =
    "Get me the first line from the wikipedia article on flowers (https://en.wikipedia.org/wiki/Flower).";

#[derive(Parser, Debug)]
#[command(name = "apprentice")]
#[command(version, about = "Teacher/student knowledge transfer for browser agents", long_about = None)]
struct Cli {
    /// Alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the teacher agent and record its reasoning
    Teach {
        #[arg(long)]
        task: Option<String>,
    },

    /// Run the student agent with the teacher's guidance
    Learn {
        #[arg(long)]
        task: Option<String>,

        /// prepend | context | replace | all
        #[arg(long, default_value = "all")]
        mode: String,

        /// Only use the teacher's first K steps
        #[arg(long, value_name = "K")]
        limit: Option<usize>,

        /// Do not give the student consult_teacher / spawn_better_agent
        #[arg(long)]
        no_escalation: bool,
    },

    /// Print the guidance text built from the teacher log
    Guidance {
        #[arg(long, value_name = "K")]
        limit: Option<usize>,
    },
}

fn with_halt(task: Option<String>, cfg: &AppConfig) -> String {
    let task = task.unwrap_or_else(|| DEFAULT_TASK.to_string());
    let halt = cfg.agent.halt_instruction.trim();
    if halt.is_empty() {
        task
    } else {
        format!("{task} {halt}")
    }
}

fn parse_modes(mode: &str) -> anyhow::Result<Vec<InjectionMode>> {
    if mode.eq_ignore_ascii_case("all") {
        return Ok(InjectionMode::ALL.to_vec());
    }
    mode.parse::<InjectionMode>()
        .map(|m| vec![m])
        .map_err(anyhow::Error::msg)
}

fn build_orchestrator(cfg: &AppConfig) -> RunOrchestrator {
    let runtime = StepAgentRuntime::new(StepAgentConfig {
        max_steps: cfg.agent.max_steps,
        action_timeout: Duration::from_secs(cfg.agent.action_timeout_secs),
        ..Default::default()
    });
    RunOrchestrator::new(Arc::new(runtime), SessionRegistry::global())
        .with_transcripts_dir(cfg.transfer.transcripts_dir.clone())
}

fn print_result(label: &str, result: &RunResult) {
    println!(
        "[{label}] success={} steps={}\n{}\n",
        result.success,
        result.steps,
        result.summary()
    );
}

async fn teach(cfg: &AppConfig, task: Option<String>) -> anyhow::Result<()> {
    let browsers = create_browser_factory(cfg);
    let browser = browsers
        .open_isolated()
        .await
        .context("Failed to open browser")?;
    let mut observer = StepObserver::new(ThoughtLogStore::new(&cfg.transfer.teacher_log));

    let request = RunRequest::new(create_llm(cfg, ModelRole::Teacher), browser.clone(), with_halt(task, cfg))
        .with_observer(&mut observer)
        .with_label("teacher");
    let outcome = build_orchestrator(cfg).run(request).await;
    browser.close().await;
    let result = outcome.context("Teacher run failed")?;

    tracing::info!(
        recorded = observer.cursor().position(),
        log = %cfg.transfer.teacher_log.display(),
        "teacher reasoning recorded"
    );
    print_result("teacher", &result);
    Ok(())
}

async fn learn(
    cfg: &AppConfig,
    task: Option<String>,
    mode: &str,
    limit: Option<usize>,
    no_escalation: bool,
) -> anyhow::Result<()> {
    let modes = parse_modes(mode)?;
    let limit = limit.or(cfg.transfer.guidance_limit);
    let teacher_log = ThoughtLogStore::new(&cfg.transfer.teacher_log);
    let records = teacher_log
        .load()
        .await
        .context("Failed to load teacher reasoning; run `apprentice teach` first")?;
    let text = ContextFormatter::new().format(&records, limit);
    let task = with_halt(task, cfg);

    let orchestrator = build_orchestrator(cfg);
    let browsers = create_browser_factory(cfg);
    let escalation = (!no_escalation).then(|| {
        EscalationController::from_parts(
            teacher_log.clone(),
            limit,
            orchestrator.clone(),
            create_llm(cfg, ModelRole::Escalation),
            Arc::clone(&browsers),
        )
    });

    for mode in modes {
        let label = format!("student_{}", mode.label());
        let browser = browsers
            .open_isolated()
            .await
            .context("Failed to open browser")?;
        let mut observer = StepObserver::new(ThoughtLogStore::new(&cfg.transfer.student_log));

        let mut request = RunRequest::new(create_llm(cfg, ModelRole::Student), browser.clone(), task.clone())
            .with_guidance(Guidance::new(text.clone(), mode))
            .with_observer(&mut observer)
            .with_label(label.clone());
        if let Some(controller) = &escalation {
            request = request.with_actions(controller.actions_for(browser.clone()));
        }

        let outcome = orchestrator.run(request).await;
        browser.close().await;
        let result = outcome.with_context(|| format!("Student run ({mode}) failed"))?;
        print_result(&label, &result);
    }
    Ok(())
}

async fn guidance(cfg: &AppConfig, limit: Option<usize>) -> anyhow::Result<()> {
    // 教师运行可能仍在写入，容忍末尾半行
    let records = ThoughtLogStore::new(&cfg.transfer.teacher_log)
        .load_prefix()
        .await
        .context("Failed to load teacher reasoning")?;
    println!(
        "{}",
        ContextFormatter::new().format(&records, limit.or(cfg.transfer.guidance_limit))
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(cli.config.clone()).context("Failed to load config")?;
    observability::init(&cfg.log.format);

    match cli.command {
        Command::Teach { task } => teach(&cfg, task).await,
        Command::Learn {
            task,
            mode,
            limit,
            no_escalation,
        } => learn(&cfg, task, &mode, limit, no_escalation).await,
        Command::Guidance { limit } => guidance(&cfg, limit).await,
    }
}
