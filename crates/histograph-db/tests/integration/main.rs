//! PostgreSQL repository tests. Each test starts its own container, so they
//! are ignored by default: `cargo test -p histograph-db -- --ignored`.

mod common;
mod node_tests;
mod session_tests;
