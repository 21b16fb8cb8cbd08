//! MCP Server for meeting recall
//!
//! Exposes per-meeting retrieval and the chat log to an MCP host, which
//! writes the answer from the returned context.

mod server;

pub use server::run_mcp_server;
