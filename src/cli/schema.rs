//! CLI `schema` command: print the allowed tables and their columns.

use anyhow::Result;

use healthdb::config::HealthConfig;
use healthdb::health::builder;

/// Print every allowed table and its columns as pretty JSON.
pub fn schema(config: &HealthConfig) -> Result<()> {
    let conn = super::open_session(config)?;
    let description = builder::describe_schema(&conn)?;
    println!("{}", serde_json::to_string_pretty(&description)?);
    Ok(())
}
