//! Real service implementations for production use

pub mod command_runner;
pub mod process_manager;
pub mod tool_locator;

#[cfg(test)]
mod tests;

pub use command_runner::RealCommandRunner;
pub use process_manager::RealProcessManager;
pub use tool_locator::PathToolLocator;
