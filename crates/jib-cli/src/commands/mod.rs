//! Command implementations for the jib CLI.
//!
//! One module per subcommand:
//!
//! - [`build`] - one-shot production build
//! - [`start`] - development server
//! - [`test`] - jest wrapper
//! - [`serve`] - production server child
//!
//! plus [`run`], the task-timing wrapper and child exit-status forwarding
//! shared by the dispatcher.

pub mod build;
pub mod run;
pub mod serve;
pub mod start;
pub mod test;

// Re-export execute functions for convenience
pub use build::execute as build_execute;
pub use run::run_task;
pub use serve::execute as serve_execute;
pub use start::execute as start_execute;
pub use test::execute as test_execute;
