//! Structured-query core over the health store.
//!
//! Caller payloads flow [`normalize`] → [`builder`] → result descriptor, with
//! [`retention`] sweeping expired rows at startup and, optionally, before
//! every call. [`dispatch`] strings the three together per tool.

pub mod builder;
pub mod dispatch;
pub mod normalize;
pub mod retention;
pub mod sql;
pub mod types;

/// Current wall-clock time in epoch seconds.
pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
