//! Raw OpenAI-compatible HTTP adapter.
//!
//! Talks to a self-hosted chat-completions endpoint directly with `reqwest`,
//! driving a tool-calling loop over the puzzle tools. This framework only
//! supports structured custom-endpoint descriptors; handing it a bare
//! hosted-model identifier is an [`AgentError::UnsupportedModelConfig`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::ModelDescriptor;
use crate::error::AgentError;
use crate::puzzles::{extract_json_object, SharedPuzzles, TOWERS_OF_HANOI};
use crate::registry::{AgentOutcome, AgentRunner, TokenUsage};

/// Upper bound on chat turns before the run is abandoned.
const MAX_TURNS: usize = 20;

/// HTTP timeout for a single chat-completions request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const FRUIT_SYSTEM_PROMPT: &str = r#"You are a fruit counting assistant. You MUST use the available tools to get fruit counts.
When asked about fruit counts:
1. Call relevant tools to get fruit count
2. Respond ONLY with a valid JSON object in this exact format, and nothing else (no explanation, no extra text):
{"fruit_count_by_color": {"orange": <orange_count>, "apple": <apple_count>}}
Replace <orange_count> and <apple_count> with the actual numbers you get from the tools.
Do not include any text before or after the JSON. The response must be a single valid JSON object."#;

const HANOI_SYSTEM_PROMPT: &str = r#"You are a Towers of Hanoi puzzle solver. You MUST use the available tools to solve the puzzle.

RULES:
- There are 3 towers: A, B, and C
- Tower A starts with 3 disks (3=largest, 2=medium, 1=smallest)
- Goal: Move all disks from tower A to tower C
- You can only move one disk at a time
- You can only move the top disk from a tower
- You cannot place a larger disk on a smaller disk

STRATEGY:
1. Use get_tower_state to see the current state
2. Plan your moves carefully - minimum 7 moves needed
3. Use move_disk to make moves one by one
4. Use check_if_solved to verify completion
5. Track all your moves

When you're done, respond ONLY with a valid JSON object in this exact format:
{"moves": [{"from": "A", "to": "C"}, ...], "solved": true, "final_state": {...}}"#;

enum Task {
    FruitCount,
    TowersOfHanoi,
}

/// Adapter for one puzzle against an OpenAI-compatible endpoint.
pub struct OpenAiHttpAgent {
    task: Task,
    puzzles: Arc<SharedPuzzles>,
    client: Client,
}

impl OpenAiHttpAgent {
    /// Fruit counting adapter.
    pub fn fruit_count(puzzles: Arc<SharedPuzzles>) -> Self {
        Self::new(Task::FruitCount, puzzles)
    }

    /// Towers of Hanoi adapter.
    pub fn towers_of_hanoi(puzzles: Arc<SharedPuzzles>) -> Self {
        Self::new(Task::TowersOfHanoi, puzzles)
    }

    fn new(task: Task, puzzles: Arc<SharedPuzzles>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            task,
            puzzles,
            client,
        }
    }

    fn framework_name(&self) -> &'static str {
        super::OPENAI_HTTP
    }

    fn system_prompt(&self) -> &'static str {
        match self.task {
            Task::FruitCount => FRUIT_SYSTEM_PROMPT,
            Task::TowersOfHanoi => HANOI_SYSTEM_PROMPT,
        }
    }

    fn user_prompt(&self) -> &'static str {
        match self.task {
            Task::FruitCount => "How many oranges and apples are in the inventory?",
            Task::TowersOfHanoi => {
                "Solve the Towers of Hanoi puzzle. Move all disks from tower A to tower C following the rules."
            }
        }
    }

    /// Tool schemas in OpenAI function-calling format.
    fn tool_schemas(&self) -> Value {
        fn tool(name: &str, description: &str, properties: Value, required: Value) -> Value {
            json!({
                "type": "function",
                "function": {
                    "name": name,
                    "description": description,
                    "parameters": {
                        "type": "object",
                        "properties": properties,
                        "required": required
                    }
                }
            })
        }

        match self.task {
            Task::FruitCount => json!([
                tool(
                    "get_count_of_oranges",
                    "Get the current count of oranges in inventory",
                    json!({}),
                    json!([])
                ),
                tool(
                    "get_count_of_apples",
                    "Get the current count of apples in inventory",
                    json!({}),
                    json!([])
                ),
            ]),
            Task::TowersOfHanoi => json!([
                tool(
                    "get_tower_state",
                    "Get the current state of all towers. Returns a map of tower names to disk lists (bottom to top).",
                    json!({}),
                    json!([])
                ),
                tool(
                    "get_column_names",
                    "Get the list of tower (column) names, e.g. ['A', 'B', 'C'].",
                    json!({}),
                    json!([])
                ),
                tool(
                    "move_disk",
                    "Move the top disk from one tower to another. Returns 'success' and 'message'.",
                    json!({
                        "from_tower": { "type": "string", "description": "Source tower" },
                        "to_tower": { "type": "string", "description": "Destination tower" }
                    }),
                    json!(["from_tower", "to_tower"])
                ),
                tool(
                    "check_if_solved",
                    "Check if the puzzle is solved. Returns 'solved' and 'message'.",
                    json!({}),
                    json!([])
                ),
                tool(
                    "reset_puzzle",
                    "Reset the puzzle to its initial state.",
                    json!({}),
                    json!([])
                ),
            ]),
        }
    }

    /// Executes one tool call against the shared puzzle state.
    async fn dispatch_tool(&self, name: &str, args: &Value, moves_made: &mut Vec<Value>) -> Value {
        tracing::debug!(tool = name, %args, "executing tool");
        match (name, &self.task) {
            ("get_count_of_oranges", Task::FruitCount) => {
                json!(self.puzzles.count_of_oranges().await)
            }
            ("get_count_of_apples", Task::FruitCount) => {
                json!(self.puzzles.count_of_apples().await)
            }
            ("get_tower_state", Task::TowersOfHanoi) => json!(self.puzzles.tower_state().await),
            ("get_column_names", Task::TowersOfHanoi) => json!(self.puzzles.column_names().await),
            ("move_disk", Task::TowersOfHanoi) => {
                let from = args.get("from_tower").and_then(Value::as_str);
                let to = args.get("to_tower").and_then(Value::as_str);
                match (from, to) {
                    (Some(from), Some(to)) => {
                        let reply = self.puzzles.move_disk(from, to).await;
                        if reply.success {
                            moves_made.push(json!({ "from": from, "to": to }));
                        }
                        json!(reply)
                    }
                    _ => json!({
                        "success": false,
                        "message": "Missing from_tower or to_tower parameter"
                    }),
                }
            }
            ("check_if_solved", Task::TowersOfHanoi) => json!(self.puzzles.check_if_solved().await),
            ("reset_puzzle", Task::TowersOfHanoi) => {
                self.puzzles.reset(TOWERS_OF_HANOI);
                moves_made.clear();
                json!({ "message": "Puzzle reset to initial state." })
            }
            _ => json!({ "error": format!("Unknown function: {name}") }),
        }
    }

    /// One chat-completions request.
    async fn call_endpoint(
        &self,
        base_url: &str,
        model: &str,
        messages: &[Value],
    ) -> Result<Value, AgentError> {
        let url = format!("{base_url}/chat/completions");
        let payload = json!({
            "model": model,
            "messages": messages,
            "temperature": 0.1,
            "max_tokens": 1000,
            "tools": self.tool_schemas(),
            "tool_choice": "auto"
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", "Bearer dummy-key")
            .json(&payload)
            .send()
            .await
            .map_err(|e| AgentError::Network {
                endpoint: base_url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::MalformedResponse(e.to_string()))?;

        // The endpoint may silently serve a different model than requested.
        match body.get("model").and_then(Value::as_str) {
            Some(served) if served != model => {
                tracing::warn!(requested = model, served, "model mismatch from endpoint");
            }
            None => tracing::warn!(requested = model, "endpoint response has no model field"),
            _ => {}
        }

        Ok(body)
    }

    /// Final-response cleanup: strip think tags and markdown fences, then
    /// scan for the embedded JSON object.
    fn parse_final_content(content: &str) -> Value {
        let stripped = regex::Regex::new(r"(?s)<think>.*?</think>")
            .expect("static regex")
            .replace_all(content, "");
        let trimmed = stripped
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        extract_json_object(trimmed).unwrap_or_else(|| Value::String(content.to_string()))
    }

    /// Shapes the final Hanoi answer, tolerating sloppy model output.
    ///
    /// Backfills an empty `moves` list from the tracked tool calls; when the
    /// content is not parseable JSON at all, reconstructs the answer from the
    /// live board instead of failing the run on a formatting slip.
    async fn finish_hanoi(&self, parsed: Value, moves_made: Vec<Value>) -> Value {
        match parsed {
            Value::Object(mut object) => {
                let missing = object
                    .get("moves")
                    .and_then(Value::as_array)
                    .map_or(true, Vec::is_empty);
                if missing && !moves_made.is_empty() {
                    object.insert("moves".to_string(), Value::Array(moves_made));
                }
                Value::Object(object)
            }
            other => {
                tracing::warn!(content = %other, "unparseable final answer, reconstructing from board state");
                self.board_snapshot(moves_made).await
            }
        }
    }

    /// Current board truth in the expected answer shape.
    async fn board_snapshot(&self, moves_made: Vec<Value>) -> Value {
        let solved = self.puzzles.check_if_solved().await;
        let final_state = self.puzzles.tower_state().await;
        json!({
            "moves": moves_made,
            "solved": solved.solved,
            "final_state": final_state,
        })
    }
}

#[async_trait]
impl AgentRunner for OpenAiHttpAgent {
    async fn run(&self, model: &ModelDescriptor) -> Result<AgentOutcome, AgentError> {
        let (base_url, model_name) = match model {
            ModelDescriptor::CustomEndpoint {
                base_url, model, ..
            } => (base_url.as_str(), model.as_str()),
            ModelDescriptor::Hosted(id) => {
                return Err(AgentError::UnsupportedModelConfig {
                    framework: self.framework_name().to_string(),
                    reason: format!("only custom endpoints are supported, got hosted model '{id}'"),
                });
            }
        };

        tracing::info!(base_url, model = model_name, "starting OpenAI HTTP agent");

        let mut messages = vec![
            json!({ "role": "system", "content": self.system_prompt() }),
            json!({ "role": "user", "content": self.user_prompt() }),
        ];
        let mut usage = TokenUsage::default();
        let mut moves_made: Vec<Value> = Vec::new();

        for turn in 1..=MAX_TURNS {
            tracing::debug!(turn, "chat completion request");
            let response = self.call_endpoint(base_url, model_name, &messages).await?;

            // Accumulate usage across the whole conversation
            if let Some(u) = response.get("usage") {
                let add = |field: &str, slot: &mut Option<u32>| {
                    if let Some(n) = u.get(field).and_then(Value::as_u64) {
                        *slot = Some(slot.unwrap_or(0) + n as u32);
                    }
                };
                add("prompt_tokens", &mut usage.prompt_tokens);
                add("completion_tokens", &mut usage.completion_tokens);
                add("total_tokens", &mut usage.total_tokens);
            }

            let message = response
                .get("choices")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("message"))
                .ok_or_else(|| {
                    AgentError::MalformedResponse("no choices in API response".to_string())
                })?
                .clone();

            let tool_calls = message
                .get("tool_calls")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            if tool_calls.is_empty() {
                let content = message
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let parsed = Self::parse_final_content(content);
                let result = match self.task {
                    Task::FruitCount => parsed,
                    Task::TowersOfHanoi => self.finish_hanoi(parsed, moves_made).await,
                };
                return Ok(AgentOutcome::new(result).with_usage(usage));
            }

            messages.push(message.clone());
            for call in &tool_calls {
                let name = call
                    .pointer("/function/name")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let args = call
                    .pointer("/function/arguments")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .and_then(|s| serde_json::from_str(s).ok())
                    .unwrap_or_else(|| json!({}));
                let result = self.dispatch_tool(name, &args, &mut moves_made).await;
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.get("id").cloned().unwrap_or(Value::Null),
                    "content": result.to_string()
                }));
            }
        }

        match self.task {
            Task::FruitCount => Err(AgentError::TurnLimitExceeded(MAX_TURNS)),
            Task::TowersOfHanoi => {
                // The board may still be solved even if the model never
                // stopped calling tools; report its actual state.
                tracing::warn!(turns = MAX_TURNS, "turn limit reached, reporting board state");
                Ok(AgentOutcome::new(self.board_snapshot(moves_made).await).with_usage(usage))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_hosted_model() {
        let agent = OpenAiHttpAgent::fruit_count(Arc::new(SharedPuzzles::new()));
        let err = agent
            .run(&ModelDescriptor::from("mistral.mistral-large-2407-v1:0"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::UnsupportedModelConfig { .. }));
        assert!(err.to_string().contains("only custom endpoints"));
    }

    #[tokio::test]
    async fn test_tool_dispatch_moves_and_resets() {
        let puzzles = Arc::new(SharedPuzzles::new());
        let agent = OpenAiHttpAgent::towers_of_hanoi(puzzles.clone());
        let mut moves = Vec::new();

        let reply = agent
            .dispatch_tool(
                "move_disk",
                &json!({ "from_tower": "A", "to_tower": "C" }),
                &mut moves,
            )
            .await;
        assert_eq!(reply["success"], true);
        assert_eq!(moves.len(), 1);

        // Rejected moves are not tracked
        let reply = agent
            .dispatch_tool(
                "move_disk",
                &json!({ "from_tower": "B", "to_tower": "C" }),
                &mut moves,
            )
            .await;
        assert_eq!(reply["success"], false);
        assert_eq!(moves.len(), 1);

        agent
            .dispatch_tool("reset_puzzle", &json!({}), &mut moves)
            .await;
        assert!(moves.is_empty());
        assert_eq!(puzzles.tower_state().await["A"], vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_tool_dispatch_unknown_function() {
        let agent = OpenAiHttpAgent::fruit_count(Arc::new(SharedPuzzles::new()));
        let mut moves = Vec::new();
        let reply = agent.dispatch_tool("launch_rocket", &json!({}), &mut moves).await;
        assert!(reply["error"].as_str().unwrap().contains("Unknown function"));
    }

    #[test]
    fn test_parse_final_content_strips_wrappers() {
        let content = "<think>let me count</think>\n```json\n{\"fruit_count_by_color\": {\"orange\": 25, \"apple\": 30}}\n```";
        let value = OpenAiHttpAgent::parse_final_content(content);
        assert_eq!(value["fruit_count_by_color"]["orange"], 25);
    }

    #[test]
    fn test_parse_final_content_falls_back_to_raw_text() {
        let value = OpenAiHttpAgent::parse_final_content("I could not solve it.");
        assert_eq!(value, Value::String("I could not solve it.".to_string()));
    }

    #[tokio::test]
    async fn test_finish_hanoi_backfills_empty_moves() {
        let agent = OpenAiHttpAgent::towers_of_hanoi(Arc::new(SharedPuzzles::new()));
        let parsed = json!({ "moves": [], "solved": true, "final_state": {} });
        let tracked = vec![json!({ "from": "A", "to": "C" })];

        let result = agent.finish_hanoi(parsed, tracked).await;
        assert_eq!(result["moves"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_finish_hanoi_reconstructs_from_board_on_garbage() {
        let puzzles = Arc::new(SharedPuzzles::new());
        let agent = OpenAiHttpAgent::towers_of_hanoi(puzzles.clone());
        let mut moves = Vec::new();
        for (from, to) in [("A", "C"), ("A", "B"), ("C", "B"), ("A", "C"), ("B", "A"), ("B", "C"), ("A", "C")] {
            agent
                .dispatch_tool(
                    "move_disk",
                    &json!({ "from_tower": from, "to_tower": to }),
                    &mut moves,
                )
                .await;
        }

        let result = agent
            .finish_hanoi(Value::String("done!".to_string()), moves)
            .await;
        assert_eq!(result["solved"], true);
        assert_eq!(result["final_state"]["C"], json!([3, 2, 1]));
        assert_eq!(result["moves"].as_array().unwrap().len(), 7);
    }
}
