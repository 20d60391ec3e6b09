pub mod catalog;
pub mod engine;
pub mod layout;
pub mod logger;
pub mod lua_rt;
pub mod motion;
pub mod orchestrator;
pub mod scheduler;
pub mod settings;
pub mod state;
pub mod store;
pub mod terminal;
pub mod types;
pub mod workflow;

pub use engine::{AgentController, AgentHooks, NoHooks, RunOutcome};
pub use store::Store;
pub use workflow::{Workflow, WorkflowAction};
