pub mod table_delete;
pub mod table_insert;
pub mod table_query;
pub mod table_update;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, ListResourceTemplatesResult, ListResourcesResult, PaginatedRequestParams,
    RawResource, RawResourceTemplate, ReadResourceRequestParams, ReadResourceResult, Resource,
    ResourceContents, ResourceTemplate,
};
use rmcp::service::RequestContext;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, RoleServer, ServerHandler};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use table_delete::TableDeleteParams;
use table_insert::TableInsertParams;
use table_query::TableQueryParams;
use table_update::TableUpdateParams;

use crate::config::HealthConfig;
use crate::health::builder;
use crate::health::dispatch::{self, ToolKind};
use crate::health::types::Table;

const SCHEMA_URI: &str = "db://schema";

/// The healthdb MCP tool handler. Holds the shared connection and config and
/// exposes the five table tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct HealthTools {
    tool_router: ToolRouter<Self>,
    db: Arc<Mutex<Connection>>,
    config: Arc<HealthConfig>,
}

#[tool_router]
impl HealthTools {
    pub fn new(db: Arc<Mutex<Connection>>, config: Arc<HealthConfig>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            db,
            config,
        }
    }

    /// Describe the columns of every allowed table.
    #[tool(description = "List the allowed tables and their columns (name, type, notnull, default, pk). Call this first if unsure of column names.")]
    async fn check_schema(&self) -> Result<String, String> {
        tracing::info!("check_schema called");
        self.run(ToolKind::CheckSchema, Value::Null).await
    }

    /// Read rows from one table.
    #[tool(description = "Read rows from medical_history, medication, or food_24h. With no 'where', food_24h returns the last 24 hours and the other tables return everything ordered by updated_at ascending (oldest first; pass order_by or offset to reach newer rows). Results include rowCount and nextOffset for paging.")]
    async fn table_query(
        &self,
        Parameters(params): Parameters<TableQueryParams>,
    ) -> Result<String, String> {
        tracing::info!(table = ?params.table, "table_query called");
        self.run(ToolKind::Query, to_payload(&params)?).await
    }

    /// Insert one row.
    #[tool(description = "Insert one row. Example: {\"table\": \"medication\", \"values\": {\"name\": \"ibuprofen\", \"dosage\": \"200mg\"}}. Returns rowCount and lastRowId.")]
    async fn table_insert(
        &self,
        Parameters(params): Parameters<TableInsertParams>,
    ) -> Result<String, String> {
        tracing::info!(table = ?params.table, "table_insert called");
        self.run(ToolKind::Insert, to_payload(&params)?).await
    }

    /// Update rows matching a required filter.
    #[tool(description = "Update rows matching 'where'. A non-empty 'where' is required. Setting medical_history.status to 'recovered' schedules the row for removal after the grace period.")]
    async fn table_update(
        &self,
        Parameters(params): Parameters<TableUpdateParams>,
    ) -> Result<String, String> {
        tracing::info!(table = ?params.table, "table_update called");
        self.run(ToolKind::Update, to_payload(&params)?).await
    }

    /// Delete rows matching a required filter.
    #[tool(description = "Delete rows matching 'where'. A non-empty 'where' is required; an empty filter is refused rather than clearing the table.")]
    async fn table_delete(
        &self,
        Parameters(params): Parameters<TableDeleteParams>,
    ) -> Result<String, String> {
        tracing::info!(table = ?params.table, "table_delete called");
        self.run(ToolKind::Delete, to_payload(&params)?).await
    }
}

impl HealthTools {
    /// Run a tool call on the blocking pool and render the result as JSON.
    /// Query errors are returned as `{"error": kind, "message": ...}`.
    async fn run(&self, tool: ToolKind, payload: Value) -> Result<String, String> {
        let db = Arc::clone(&self.db);
        let config = Arc::clone(&self.config);

        let result = tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|e| format!("db lock poisoned: {e}"))?;
            Ok::<_, String>(dispatch::execute(
                &conn,
                &config.retention,
                tool,
                &payload,
                crate::health::now_ts(),
            ))
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))??;

        match result {
            Ok(output) => {
                serde_json::to_string(&output).map_err(|e| format!("serialization failed: {e}"))
            }
            Err(err) => {
                tracing::warn!(tool = %tool, kind = err.kind(), error = %err, "tool call rejected");
                Err(dispatch::error_payload(&err).to_string())
            }
        }
    }
}

/// `db://schema` plus one `db://schema/{table}` entry per allowed table.
fn schema_resources() -> Vec<Resource> {
    let mut index = RawResource::new(SCHEMA_URI, "schema");
    index.description = Some("Names of the allowed tables".into());
    index.mime_type = Some("application/json".into());

    let mut resources = vec![index.no_annotation()];
    for table in Table::ALL {
        let mut resource = RawResource::new(format!("{SCHEMA_URI}/{table}"), table.as_str());
        resource.description = Some(format!("Columns of {table}"));
        resource.mime_type = Some("application/json".into());
        resources.push(resource.no_annotation());
    }
    resources
}

impl HealthTools {
    /// Render a schema resource: the table list for `db://schema`, or
    /// `PRAGMA table_info` rows for `db://schema/{table}`.
    async fn schema_resource_text(&self, uri: &str) -> Result<String, McpError> {
        if uri == SCHEMA_URI {
            let tables: Vec<&str> = Table::ALL.iter().map(|t| t.as_str()).collect();
            return serde_json::to_string(&tables)
                .map_err(|e| McpError::internal_error(format!("serialization failed: {e}"), None));
        }

        let table: Table = uri
            .strip_prefix(SCHEMA_URI)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| McpError::resource_not_found(format!("unknown resource: {uri}"), None))?
            .parse()
            .map_err(|e: crate::error::QueryError| McpError::resource_not_found(e.to_string(), None))?;

        let db = Arc::clone(&self.db);
        let columns = tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|e| format!("db lock poisoned: {e}"))?;
            builder::table_columns(&conn, table).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| McpError::internal_error(format!("db task failed: {e}"), None))?
        .map_err(|e| McpError::internal_error(e, None))?;

        serde_json::to_string(&columns)
            .map_err(|e| McpError::internal_error(format!("serialization failed: {e}"), None))
    }
}

fn to_payload<T: Serialize>(params: &T) -> Result<Value, String> {
    serde_json::to_value(params).map_err(|e| format!("invalid parameters: {e}"))
}

#[tool_handler]
impl ServerHandler for HealthTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        let tables: Vec<&str> = Table::ALL.iter().map(|t| t.as_str()).collect();
        rmcp::model::ServerInfo {
            instructions: Some(format!(
                "healthdb: a personal health log. Allowed tables: {}. \
                 Use check_schema to see columns, table_query to read, and \
                 table_insert/table_update/table_delete to write. Updates and \
                 deletes require a non-empty 'where'. Timestamps are epoch seconds.",
                tables.join(", ")
            )),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult::with_all_items(schema_resources()))
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        let template: ResourceTemplate = RawResourceTemplate {
            uri_template: format!("{SCHEMA_URI}/{{table}}"),
            name: "table_schema".into(),
            title: None,
            description: Some("PRAGMA table_info rows for one allowed table".into()),
            mime_type: Some("application/json".into()),
            icons: None,
        }
        .no_annotation();
        Ok(ListResourceTemplatesResult::with_all_items(vec![template]))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        tracing::info!(uri = %request.uri, "read_resource called");
        let text = self.schema_resource_text(&request.uri).await?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, request.uri)],
        })
    }
}
