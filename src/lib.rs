//! Local health log for a single user, exposed to an LLM agent over MCP.
//!
//! The agent records food, medication and medical history through five
//! structured tools. Its arguments are untrusted and often malformed, so every
//! call is repaired by a normalizer, checked by a query builder that only ever
//! binds values as parameters, and subject to per-table retention rules.
//!
//! | Table | Holds | Retention |
//! |-------|-------|-----------|
//! | `medical_history` | conditions, severity, status | `recovered*` rows 14 days after last update |
//! | `medication` | name, dosage, linked condition | kept until deleted |
//! | `food_24h` | food eaten, notes | 24 hours after `taken_at` |
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks
//! - [`health`]: Normalizer, query builder, retention sweeper
//! - [`tools`]: MCP tool handler
//! - [`server`]: stdio and Streamable HTTP transports

pub mod config;
pub mod db;
pub mod error;
pub mod health;
pub mod server;
pub mod tools;
