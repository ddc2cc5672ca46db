//! Summary metrics and aggregate views for highway maintenance intervention
//! logs.
//!
//! The pass for one uploaded file is `loader` → `validator` → `aggregator`,
//! wired together by `pipeline`. `output`, `cli` and `config` are the
//! terminal front end.

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod types;
pub mod util;
pub mod validator;
