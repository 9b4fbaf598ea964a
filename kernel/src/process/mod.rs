//! Process management
//!
//! Records live in a generation-checked [`table`]; non-running records sit
//! on the intrusive [`queue`]s. [`ProcessManager`] ties both together with
//! the memory collaborator and the context switch engine.

pub mod context_switch;
pub mod manager;
pub mod queue;
pub mod reaper;
pub mod record;
pub mod table;

pub use manager::{ProcessManager, IDLE_PROCESS_NAME};
pub use queue::QueueKind;
pub use record::{ProcessName, ProcessRecord, ProcessSummary};
pub use table::ProcessRef;
