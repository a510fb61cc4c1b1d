//! CLI `call` command: push a raw payload through the same path the MCP
//! tools use and print the result.

use anyhow::{anyhow, Result};
use serde_json::Value;

use healthdb::config::HealthConfig;
use healthdb::health::dispatch::{self, ToolKind};

/// Run `tool` with `payload` exactly as an agent would send it. The payload
/// is handed over as text, so malformed or wrapped JSON exercises the same
/// repairs as a live tool call.
pub fn call(config: &HealthConfig, tool: &str, payload: &str) -> Result<()> {
    let tool: ToolKind = tool.parse().map_err(|e: String| anyhow!(e))?;
    let conn = super::open_session(config)?;

    let raw = Value::String(payload.to_string());
    match dispatch::execute(
        &conn,
        &config.retention,
        tool,
        &raw,
        healthdb::health::now_ts(),
    ) {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&dispatch::error_payload(&err))?);
            Err(anyhow!(err).context(format!("{tool} failed")))
        }
    }
}
