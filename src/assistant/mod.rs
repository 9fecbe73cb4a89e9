//! The DeepDrone chat assistant.
//!
//! Routes each user message to one of three paths: a fixed self-introduction,
//! a tool-calling turn against the drone and analysis tools, or a plain
//! conversational turn with the full history.

mod prompts;

pub use prompts::{is_identity_question, needs_tools, IDENTITY_REPLY, SYSTEM_PROMPT};

use std::sync::Arc;

use serde_json::Value;

use crate::llm::{
    describe_failure, ChatMessage, ChatModel, ChatOptions, Completion, GeneratedScript, RawMessage,
    NO_RESPONSE,
};
use crate::mission::{MissionSession, MissionStatus};
use crate::telemetry::FlightDataStore;
use crate::tools::ToolRegistry;

pub struct DroneAssistant {
    tool_model: Arc<dyn ChatModel>,
    chat_model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    flight_data: Arc<FlightDataStore>,
    default_connection: String,
    history: Vec<ChatMessage>,
    /// Status transitions already copied into `history`.
    statuses_seen: u64,
}

impl DroneAssistant {
    pub fn new(
        tool_model: Arc<dyn ChatModel>,
        chat_model: Arc<dyn ChatModel>,
        tools: ToolRegistry,
        flight_data: Arc<FlightDataStore>,
        default_connection: impl Into<String>,
    ) -> Self {
        Self {
            tool_model,
            chat_model,
            tools,
            flight_data,
            default_connection: default_connection.into(),
            history: Vec::new(),
            statuses_seen: 0,
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Answer one user message. Failures are reported in the reply text.
    ///
    /// Mission status transitions are echoed into the history as system
    /// messages, ahead of the turn that caused them or observed them.
    pub async fn chat(&mut self, session: &MissionSession, message: &str) -> String {
        self.record_statuses(session).await;
        self.history.push(ChatMessage::user(message));

        let reply = if is_identity_question(message) {
            tracing::debug!("Answering identity question directly");
            IDENTITY_REPLY.to_string()
        } else if needs_tools(message) {
            self.tool_turn(session, message).await
        } else {
            self.conversation_turn().await
        };

        self.record_statuses(session).await;
        self.history.push(ChatMessage::assistant(reply.clone()));
        reply
    }

    async fn record_statuses(&mut self, session: &MissionSession) {
        let (entries, seen) = session.log_since(self.statuses_seen).await;
        self.statuses_seen = seen;
        self.history.extend(entries.into_iter().map(ChatMessage::system));
    }

    async fn tool_turn(&self, session: &MissionSession, message: &str) -> String {
        let prompt = prompts::tool_prompt(
            message,
            &self.flight_data.sensor_names().await,
            &self.flight_data.flight_ids().await,
            &self.default_connection,
        );
        let messages = [
            RawMessage::new("system", SYSTEM_PROMPT),
            RawMessage::new("user", prompt),
        ];
        let schemas = self.tools.get_tool_schemas();

        let calls = match self
            .tool_model
            .complete(&messages, ChatOptions::default(), Some(&schemas))
            .await
        {
            Ok(Completion::ToolCalls(calls)) => calls,
            Ok(other) => return other.into_content(),
            Err(e) => {
                tracing::error!("Tool turn with {} failed: {}", self.tool_model.model_id(), e);
                return describe_failure(&e);
            }
        };

        if let Some(script) = GeneratedScript::from_tool_calls(&calls) {
            tracing::debug!("Executing tool plan:\n{}", script.code());
        }

        let mut last_result = None;
        for call in calls {
            let args = Value::Object(call.arguments);
            match self.tools.execute(&call.function_name, args, session).await {
                Ok(result) => last_result = Some(result),
                Err(e) => {
                    session
                        .update_status(MissionStatus::Error, format!("Tool execution error: {}", e))
                        .await;
                    return format!(
                        "Error executing drone operation: {}. Please retry with the correct parameters.",
                        e
                    );
                }
            }
        }

        last_result.unwrap_or_else(|| NO_RESPONSE.to_string())
    }

    async fn conversation_turn(&self) -> String {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(RawMessage::new("system", SYSTEM_PROMPT));
        messages.extend(self.history.iter().map(RawMessage::from));

        self.chat_model
            .generate(&messages, ChatOptions::default())
            .await
            .content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drone::SimulatedDrone;
    use crate::llm::{LlmError, Role, ToolCall, ToolDefinition};
    use crate::mission::{MissionController, MissionTiming};
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::sync::Mutex;

    /// Model that replays canned completions and records what it was sent.
    struct ScriptedModel {
        replies: Mutex<Vec<Result<Completion, LlmError>>>,
        seen: Mutex<Vec<(Vec<RawMessage>, bool)>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<Completion, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn model_id(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            messages: &[RawMessage],
            _options: ChatOptions,
            tools: Option<&[ToolDefinition]>,
        ) -> Result<Completion, LlmError> {
            self.seen
                .lock()
                .unwrap()
                .push((messages.to_vec(), tools.is_some()));
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Ok(Completion::NoChoices);
            }
            replies.remove(0)
        }
    }

    fn call(id: &str, name: &str, args: Value) -> ToolCall {
        let arguments: Map<String, Value> = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        ToolCall {
            id: id.to_string(),
            function_name: name.to_string(),
            arguments,
        }
    }

    fn assistant(tool_model: Arc<ScriptedModel>, chat_model: Arc<ScriptedModel>) -> DroneAssistant {
        let timing = MissionTiming {
            transit_delay: std::time::Duration::ZERO,
            settle_delay: std::time::Duration::ZERO,
        };
        let controller = Arc::new(MissionController::new(
            Arc::new(SimulatedDrone::default()),
            timing,
        ));
        let flight_data = Arc::new(FlightDataStore::with_demo_data());
        let tools = ToolRegistry::new(controller, Arc::clone(&flight_data));
        DroneAssistant::new(tool_model, chat_model, tools, flight_data, "udp:127.0.0.1:14550")
    }

    #[tokio::test]
    async fn test_identity_question_skips_models() {
        let tool_model = ScriptedModel::new(vec![]);
        let chat_model = ScriptedModel::new(vec![]);
        let mut bot = assistant(tool_model.clone(), chat_model.clone());
        let session = MissionSession::new();

        let reply = bot.chat(&session, "Who are you?").await;
        assert_eq!(reply, IDENTITY_REPLY);
        assert_eq!(tool_model.calls() + chat_model.calls(), 0);
        assert_eq!(bot.history().len(), 2);
    }

    #[tokio::test]
    async fn test_tool_turn_runs_calls_in_order() {
        let tool_model = ScriptedModel::new(vec![Ok(Completion::ToolCalls(vec![
            call("c1", "connect_to_real_drone", json!({"connection_string": "udp:127.0.0.1:14550"})),
            call("c2", "drone_takeoff", json!({"altitude": 25})),
        ]))]);
        let chat_model = ScriptedModel::new(vec![]);
        let mut bot = assistant(tool_model.clone(), chat_model.clone());
        let session = MissionSession::new();

        let reply = bot.chat(&session, "Connect and take off to 25 meters").await;
        assert_eq!(reply, "Takeoff successful! Reached target altitude of 25 m.");
        assert_eq!(session.status().await, MissionStatus::Airborne);
        assert_eq!(chat_model.calls(), 0);

        // user, four status echoes, assistant
        let history = bot.history();
        assert_eq!(history.len(), 6);
        assert_eq!(history[0].role, Role::User);
        let echoed: Vec<&str> = history[1..5]
            .iter()
            .map(|m| {
                assert_eq!(m.role, Role::System);
                m.content.as_str()
            })
            .collect();
        assert!(echoed[0].contains("CONNECTING: Connecting to drone at udp:127.0.0.1:14550"));
        assert!(echoed[1].contains("CONNECTED: "));
        assert!(echoed[2].contains("TAKING OFF: "));
        assert!(echoed[3].contains("AIRBORNE: "));
        assert_eq!(history[5].role, Role::Assistant);

        let seen = tool_model.seen.lock().unwrap();
        let (messages, had_tools) = &seen[0];
        assert!(had_tools);
        let prompt = messages[1].content.as_ref().unwrap().to_text();
        assert!(prompt.contains("Flight logs available: [\"flight_001\"]"));
    }

    #[tokio::test]
    async fn test_unknown_tool_sets_error_status() {
        let tool_model = ScriptedModel::new(vec![Ok(Completion::ToolCalls(vec![call(
            "c1",
            "launch_fireworks",
            json!({}),
        )]))]);
        let mut bot = assistant(tool_model, ScriptedModel::new(vec![]));
        let session = MissionSession::new();

        let reply = bot.chat(&session, "run the show").await;
        assert!(reply.starts_with("Error executing drone operation: Unknown tool: launch_fireworks"));
        assert_eq!(session.status().await, MissionStatus::Error);
    }

    #[tokio::test]
    async fn test_conversation_carries_history() {
        let chat_model = ScriptedModel::new(vec![
            Ok(Completion::Text("Hi! Ready to help.".to_string())),
            Err(LlmError::network_error("connection refused".to_string())),
        ]);
        let mut bot = assistant(ScriptedModel::new(vec![]), chat_model.clone());
        let session = MissionSession::new();

        assert_eq!(bot.chat(&session, "Hello").await, "Hi! Ready to help.");
        let reply = bot.chat(&session, "How windy is too windy?").await;
        assert!(reply.starts_with("Error in API request:"));

        let seen = chat_model.seen.lock().unwrap();
        let (messages, had_tools) = &seen[1];
        assert!(!had_tools);
        // system prompt, then user / assistant / user
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[2].content.as_ref().unwrap().to_text(), "Hi! Ready to help.");
        assert_eq!(bot.history().len(), 4);
    }

    #[tokio::test]
    async fn test_status_changes_between_turns_are_echoed_once() {
        let chat_model = ScriptedModel::new(vec![
            Ok(Completion::Text("Standing by.".to_string())),
            Ok(Completion::Text("Still here.".to_string())),
        ]);
        let mut bot = assistant(ScriptedModel::new(vec![]), chat_model.clone());
        let session = MissionSession::new();

        assert_eq!(bot.chat(&session, "Hello").await, "Standing by.");
        session
            .update_status(MissionStatus::Interrupting, "Returning to base...")
            .await;
        assert_eq!(bot.chat(&session, "Are you there?").await, "Still here.");
        bot.chat(&session, "Who are you?").await;

        let roles: Vec<Role> = bot.history().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::User,
                Role::Assistant,
                Role::System,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
            ]
        );
        assert!(bot.history()[2]
            .content
            .ends_with("INTERRUPTING: Returning to base..."));

        // The conversational model sees the echoed status as context.
        let seen = chat_model.seen.lock().unwrap();
        let (messages, _) = &seen[1];
        assert_eq!(messages[3].role, "system");
    }

    #[tokio::test]
    async fn test_text_reply_from_tool_model_is_returned() {
        let tool_model = ScriptedModel::new(vec![Ok(Completion::Text(
            "I need a connection string first.".to_string(),
        ))]);
        let mut bot = assistant(tool_model, ScriptedModel::new(vec![]));
        let session = MissionSession::new();

        let reply = bot.chat(&session, "connect please").await;
        assert_eq!(reply, "I need a connection string first.");
        assert_eq!(session.status().await, MissionStatus::Standby);
    }
}
