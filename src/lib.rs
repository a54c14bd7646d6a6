//! Apprentice - 浏览器智能体的师生知识传递与运行中升级
//!
//! 模块划分：
//! - **agent**: 逐步 Agent 运行时、引导注入方式、运行历史与对话记录
//! - **browser**: 浏览器控制句柄（HTTP 抓取 / Headless Chrome / 测试用固定页面）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、TaskContext 与 SessionRegistry、RunOrchestrator
//! - **escalation**: consult_teacher / spawn_better_agent 升级动作
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock / Scripted）
//! - **observability**: 日志初始化
//! - **tools**: 动作注册表、执行器与浏览器动作
//! - **transfer**: 推理记录、思考日志、引导格式化与逐步观察器

pub mod agent;
pub mod browser;
pub mod config;
pub mod core;
pub mod escalation;
pub mod llm;
pub mod observability;
pub mod tools;
pub mod transfer;
