//! Core engine: detect opportunities, decide, execute, and run a session.

pub mod executor;
pub mod runner;
pub mod scanner;
pub mod session;
