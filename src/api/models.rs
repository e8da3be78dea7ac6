use serde::{Deserialize, Serialize};

use crate::data_models::DownloadResult;
use crate::llm::ChatMessage;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Full history, oldest first. The server keeps no session state; the
    /// client sends the whole conversation every turn.
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub tool_summary: Option<String>,
    /// Updated history for the client to send back next turn.
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub result: DownloadResult,
    pub summary: String,
}
