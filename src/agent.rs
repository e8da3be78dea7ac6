use anyhow::Result;
use serde_json::json;

use crate::data_models::{DownloadResult, DownloadStatus, SearchRequest};
use crate::errors::FetchError;
use crate::finder::SceneFinder;
use crate::llm::{ChatMessage, OpenAi};

pub const TOOL_NAME: &str = "sentinel1_download";

const SYSTEM_PROMPT: &str = "You are a helpful Sentinel-1 satellite data assistant. \
You can have casual conversations with users AND help them download Sentinel-1 data.\n\n\
When users request Sentinel-1 data, extract the location (lat, lon) and date, then \
IMMEDIATELY call sentinel1_download. Do NOT ask for confirmation - just download it.\n\n\
If the location is ambiguous, use Busan (lat=35.1796, lon=129.075) as the default. \
If the date is ambiguous, use a reasonable past date like 2023-06-01.\n\n\
After calling the tool, explain the download result in a friendly way.\n\n\
For general conversation (greetings, questions, chitchat), respond naturally without tools.";

pub fn system_message() -> ChatMessage {
    ChatMessage::system(SYSTEM_PROMPT)
}

/// Declaration of the one tool the model can call. Day/degree windows are
/// deliberately not exposed; the model only extracts what the user said.
fn tool_schema() -> serde_json::Value {
    json!([{
        "type": "function",
        "function": {
            "name": TOOL_NAME,
            "description": "Search for the Sentinel-1 GRD scene closest to the given \
                date at the given location and download its VV/VH bands.",
            "parameters": {
                "type": "object",
                "properties": {
                    "lat": { "type": "number", "description": "latitude in degrees" },
                    "lon": { "type": "number", "description": "longitude in degrees" },
                    "date": { "type": "string", "description": "target date, YYYY-MM-DD" }
                },
                "required": ["lat", "lon", "date"]
            }
        }
    }])
}

pub struct AgentReply {
    /// The assistant's wording, straight from the model.
    pub reply: String,
    /// Deterministic summary of the tool run, if one happened this turn.
    pub tool_summary: Option<String>,
}

/// Chat agent: LLM extracts `{lat, lon, date}` from free text and calls the
/// finder through the tool declared above. Holds no conversation state; the
/// caller owns the history.
pub struct Agent {
    llm: OpenAi,
    finder: SceneFinder,
}

impl Agent {
    pub fn new(llm: OpenAi, finder: SceneFinder) -> Agent {
        Agent { llm, finder }
    }

    /// Run one turn. Appends the assistant/tool messages it produces to
    /// `history` so the caller can carry the conversation forward.
    pub async fn respond(&self, history: &mut Vec<ChatMessage>) -> Result<AgentReply> {
        let tools = tool_schema();
        let response = self.llm.chat(history, Some(&tools)).await?;

        let Some(tool_calls) = response.tool_calls.clone().filter(|t| !t.is_empty()) else {
            let reply = response.content.clone().unwrap_or_default();
            history.push(response);
            return Ok(AgentReply {
                reply,
                tool_summary: None,
            });
        };

        history.push(response);
        let mut last_summary = String::new();
        for call in &tool_calls {
            if call.function.name != TOOL_NAME {
                log::error!("model asked for unknown tool: {}", call.function.name);
                history.push(ChatMessage::tool(
                    call.id.as_str(),
                    format!("unknown tool {}", call.function.name),
                ));
                continue;
            }
            let summary = match parse_tool_args(&call.function.arguments) {
                Ok(req) => {
                    log::info!(
                        "tool call: lat={} lon={} date={} +/-{}d",
                        req.lat,
                        req.lon,
                        req.date,
                        req.day_window
                    );
                    match self.finder.find_and_download(&req).await {
                        Ok(result) => summarize(&result),
                        Err(e) => describe_error(&e),
                    }
                }
                Err(reason) => reason,
            };
            history.push(ChatMessage::tool(call.id.as_str(), summary.as_str()));
            last_summary = summary;
        }

        // One more round so the model can phrase the result for the user.
        let final_response = self.llm.chat(history, Some(&tools)).await?;
        let reply = final_response.content.clone().unwrap_or_default();
        history.push(final_response);
        Ok(AgentReply {
            reply,
            tool_summary: Some(last_summary),
        })
    }
}

/// Tool arguments straight from the model. Bad JSON or an unparseable date is
/// an `InvalidParameters`-style message back to the model, never a crash.
fn parse_tool_args(arguments: &str) -> Result<SearchRequest, String> {
    serde_json::from_str::<SearchRequest>(arguments)
        .map_err(|e| format!("invalid parameters: could not parse tool arguments: {e}"))
}

pub fn summarize(result: &DownloadResult) -> String {
    let mut lines = vec![format!(
        "Scene {} acquired {}",
        result.scene_id,
        result.acquired_at.format("%Y-%m-%d %H:%M:%S UTC")
    )];
    for file in &result.files {
        lines.push(format!("  {}: saved to {}", file.band, file.path.display()));
    }
    for issue in &result.issues {
        lines.push(format!("  {issue}"));
    }
    let status = match result.status {
        DownloadStatus::Success => "success",
        DownloadStatus::Partial => "partial",
        DownloadStatus::Failure => "failure",
    };
    lines.push(format!("Status: {status}"));
    lines.join("\n")
}

pub fn describe_error(e: &FetchError) -> String {
    match e {
        FetchError::NoScenesFound { date, day_window } => format!(
            "No Sentinel-1 GRD scenes found within +/-{day_window} days of {date}. \
             Try widening the search window."
        ),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::{Band, BandFile};

    #[test]
    fn tool_args_parse_into_a_request_with_default_windows() {
        let req =
            parse_tool_args(r#"{"lat": 35.18, "lon": 129.08, "date": "2023-06-01"}"#).unwrap();
        assert_eq!(req.lat, 35.18);
        assert_eq!(req.lon, 129.08);
        assert_eq!(req.date.to_string(), "2023-06-01");
        assert_eq!(req.day_window, 10);
        assert_eq!(req.deg_window, 0.2);
    }

    #[test]
    fn bad_tool_args_become_a_message_not_a_panic() {
        assert!(parse_tool_args("not json").is_err());
        assert!(parse_tool_args(r#"{"lat": 35.18}"#).is_err());
        assert!(parse_tool_args(r#"{"lat": 35.18, "lon": 129.08, "date": "June 1st"}"#).is_err());
    }

    #[test]
    fn summary_lists_saved_bands_and_issues() {
        let result = DownloadResult::new(
            "S1A_TEST".to_string(),
            "2023-06-03T09:12:34Z".parse().unwrap(),
            vec![BandFile {
                band: Band::VV,
                path: "./downloads/S1A_TEST_vv.tif".into(),
            }],
            vec!["scene has no VH asset".to_string()],
        );
        let text = summarize(&result);
        assert!(text.contains("S1A_TEST"));
        assert!(text.contains("VV: saved to"));
        assert!(text.contains("no VH asset"));
        assert!(text.contains("Status: partial"));
    }

    #[test]
    fn no_scenes_error_suggests_widening() {
        let e = FetchError::NoScenesFound {
            date: "2023-06-01".parse().unwrap(),
            day_window: 10,
        };
        assert!(describe_error(&e).contains("widening"));
    }
}
