//! Meeting MCP Server implementation

use std::path::PathBuf;

use anyhow::Result;
use rmcp::{
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use meeting_recall::search::{join_context, Passages};
use meeting_recall::{MeetingId, SearchEngine};

/// Upper bound on passages per retrieval call.
const MAX_LIMIT: usize = 100;

/// Parameters for meeting_retrieve tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RetrieveParams {
    /// Natural language question about the meeting
    #[schemars(description = "Natural language question about the meeting")]
    pub query: String,
    /// Meeting to search in
    #[schemars(description = "Meeting identifier (see meeting_list)")]
    pub meeting_id: i64,
    /// Maximum number of passages to return (default: 5)
    #[schemars(description = "Maximum number of passages (default: 5, max: 100)")]
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Parameters for tools addressing a single meeting
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MeetingParams {
    #[schemars(description = "Meeting identifier")]
    pub meeting_id: i64,
}

/// Parameters for meeting_record_chat tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecordChatParams {
    #[schemars(description = "Meeting identifier")]
    pub meeting_id: i64,
    #[schemars(description = "The user's question")]
    pub user_message: String,
    #[schemars(description = "The answer given")]
    pub bot_response: String,
}

/// Meeting details for JSON output
#[derive(Debug, Serialize)]
struct MeetingInfoJson {
    id: MeetingId,
    name: String,
    summary: Option<String>,
    transcript: String,
    passage_count: usize,
}

/// Meeting MCP Service
#[derive(Clone)]
pub struct MeetingService {
    db_path: PathBuf,
    tool_router: ToolRouter<Self>,
}

impl MeetingService {
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            db_path,
            tool_router: Self::tool_router(),
        }
    }

    fn get_engine(&self) -> Result<SearchEngine, McpError> {
        crate::commands::open_engine(Some(self.db_path.as_path()))
            .map_err(|e| McpError::internal_error(format!("Failed to open engine: {:#}", e), None))
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let output = serde_json::to_string_pretty(value).map_err(|e| {
        McpError::internal_error(format!("JSON serialization failed: {}", e), None)
    })?;
    Ok(CallToolResult::success(vec![Content::text(output)]))
}

#[tool_router]
impl MeetingService {
    /// Retrieve the passages of a meeting most relevant to a question
    #[tool(description = "Retrieve the passages of one recorded meeting most relevant to a question, using hybrid semantic + keyword search. Answer using only the returned context.")]
    async fn meeting_retrieve(
        &self,
        params: Parameters<RetrieveParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine()?;
        let limit = params
            .0
            .limit
            .filter(|&l| l > 0)
            .unwrap_or(engine.config().top_k)
            .min(MAX_LIMIT);
        let meeting_id = MeetingId(params.0.meeting_id);

        let results = engine
            .retrieve(&params.0.query, meeting_id, limit)
            .map_err(|e| McpError::internal_error(format!("Retrieval failed: {}", e), None))?;

        let context = join_context(&results, &engine.config().context_separator);
        to_json(&serde_json::json!({
            "meeting_id": meeting_id,
            "context": context,
            "results": results,
        }))
    }

    /// List stored meetings
    #[tool(description = "List recorded meetings with their identifiers.")]
    async fn meeting_list(&self) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine()?;
        let meetings = engine
            .store()
            .list_meetings()
            .map_err(|e| McpError::internal_error(format!("Listing failed: {}", e), None))?;

        let items: Vec<_> = meetings
            .iter()
            .map(|m| serde_json::json!({ "id": m.id, "name": m.name(), "summary": m.summary }))
            .collect();
        to_json(&items)
    }

    /// Get transcript and summary of a meeting
    #[tool(description = "Get the transcript, summary and passage count of a recorded meeting.")]
    async fn meeting_get(
        &self,
        params: Parameters<MeetingParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine()?;
        let meeting_id = MeetingId(params.0.meeting_id);
        let store = engine.store();

        let meeting = store
            .get_meeting(meeting_id)
            .map_err(|e| McpError::internal_error(format!("Lookup failed: {}", e), None))?;

        let Some(meeting) = meeting else {
            return Ok(CallToolResult::success(vec![Content::text(format!(
                "Meeting not found: {}",
                meeting_id
            ))]));
        };

        let passage_count = match store.get_passages(meeting_id) {
            Ok(Some(Passages::Valid(p))) => p.len(),
            _ => 0,
        };

        to_json(&MeetingInfoJson {
            id: meeting.id,
            name: meeting.name(),
            summary: meeting.summary,
            transcript: meeting.transcript,
            passage_count,
        })
    }

    /// Get the chat log of a meeting
    #[tool(description = "Get previous questions and answers about a meeting, oldest first.")]
    async fn meeting_chat_history(
        &self,
        params: Parameters<MeetingParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine()?;
        let history = engine
            .store()
            .chat_history(MeetingId(params.0.meeting_id))
            .map_err(|e| McpError::internal_error(format!("Lookup failed: {}", e), None))?;
        to_json(&history)
    }

    /// Record a question/answer exchange
    #[tool(description = "Record a question and the answer given about a meeting in its chat history.")]
    async fn meeting_record_chat(
        &self,
        params: Parameters<RecordChatParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine()?;
        let meeting_id = MeetingId(params.0.meeting_id);
        let saved = engine
            .store()
            .save_chat(meeting_id, &params.0.user_message, &params.0.bot_response)
            .map_err(|e| McpError::internal_error(format!("Save failed: {}", e), None))?;

        to_json(&serde_json::json!({ "meeting_id": meeting_id, "saved": saved }))
    }
}

#[tool_handler]
impl ServerHandler for MeetingService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Meeting recall MCP Server. Retrieves passages from recorded meetings so questions can be answered from the meeting content only.".to_string()
            ),
            ..Default::default()
        }
    }
}

/// Run the MCP server
pub async fn run_mcp_server(db_path: PathBuf) -> Result<()> {
    use tokio::io::{stdin, stdout};

    let service = MeetingService::new(db_path);
    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
