//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `APPRENTICE__*` 覆盖（双下划线表示嵌套，如 `APPRENTICE__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub browser: BrowserSection,
    pub transfer: TransferSection,
    pub log: LogSection,
}

/// [llm] 段：后端选择；teacher / student / escalation 可分别覆盖模型
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// openai / deepseek / gemini / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub teacher: RoleModelSection,
    pub student: RoleModelSection,
    /// spawn better agent 使用的（更强的）模型
    pub escalation: RoleModelSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            base_url: None,
            teacher: RoleModelSection::default(),
            student: RoleModelSection::default(),
            escalation: RoleModelSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RoleModelSection {
    pub model: Option<String>,
}

/// [agent] 段：步数上限、动作超时、任务末尾的停止指令
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub max_steps: usize,
    /// 单次动作超时（秒）；spawn better agent 会在一步内跑完整个子运行，需留足时间
    pub action_timeout_secs: u64,
    pub halt_instruction: String,
    pub max_page_chars: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_steps: 20,
            action_timeout_secs: 600,
            halt_instruction: "If you are stuck on a captcha, stop running.".to_string(),
            max_page_chars: 8000,
        }
    }
}

/// [browser] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    /// fetch（默认，无需 Chrome）/ chrome（需 feature "browser"）
    pub engine: String,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub timeout_secs: u64,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            engine: "fetch".to_string(),
            headless: true,
            viewport_width: 1280,
            viewport_height: 1100,
            timeout_secs: 30,
        }
    }
}

/// [transfer] 段：思考日志与对话记录路径
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferSection {
    pub teacher_log: PathBuf,
    pub student_log: PathBuf,
    pub transcripts_dir: PathBuf,
    /// 引导中最多包含的教师步数；None 为全部
    pub guidance_limit: Option<usize>,
}

impl Default for TransferSection {
    fn default() -> Self {
        Self {
            teacher_log: PathBuf::from("thoughts_log.jsonl"),
            student_log: PathBuf::from("student_thoughts.jsonl"),
            transcripts_dir: PathBuf::from("transcripts"),
            guidance_limit: None,
        }
    }
}

/// [log] 段：text / json
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub format: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 APPRENTICE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 APPRENTICE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path).required(false));
        } else {
            tracing::warn!(path = %path.display(), "config file not found, skipping");
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("APPRENTICE")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
