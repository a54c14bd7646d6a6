//! 知识传递层：推理记录、日志存储、引导格式化、步骤观察者

pub mod formatter;
pub mod log_store;
pub mod observer;
pub mod record;

pub use formatter::ContextFormatter;
pub use log_store::ThoughtLogStore;
pub use observer::{StepCursor, StepObserver};
pub use record::ThoughtRecord;
