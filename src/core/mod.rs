//! 核心层：错误类型、会话上下文与登记表、运行编排

pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod session;

pub use error::{AgentError, EscalationError, TransferError};
pub use orchestrator::{RunOrchestrator, RunRequest};
pub use registry::{SessionGuard, SessionRegistry};
pub use session::{ContextRef, SessionId, TaskContext};
