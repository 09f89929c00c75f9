pub mod command;
pub mod engine;
pub mod resolver;


pub use command::Command;
pub use engine::{ResyncOutcome, ResyncRejection, SyncEngine, SyncOutcome};
pub use resolver::resolve;
