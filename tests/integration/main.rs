//! Integration tests: full session passes against an in-memory exchange.

mod mock_exchange;
mod session;
