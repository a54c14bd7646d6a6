pub mod browser;
pub mod executor;
pub mod registry;

pub use browser::{browser_actions, GoToUrlAction, ReadPageAction};
pub use executor::ActionExecutor;
pub use registry::{Action, ActionCall, ActionRegistry, ActionResult};
