//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::types::*;
use crate::assistant::DroneAssistant;
use crate::config::Config;
use crate::drone::{DroneLink, SimulatedDrone};
use crate::llm::{ChatMessage, ChatModel, CompletionClient, PlaceholderModel};
use crate::mission::{InterruptOutcome, MissionController, MissionSession, MissionSnapshot};
use crate::telemetry::FlightDataStore;
use crate::tools::ToolRegistry;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub session: MissionSession,
    pub controller: Arc<MissionController>,
    /// One chat turn at a time.
    pub assistant: Mutex<DroneAssistant>,
    chat_model_id: String,
}

impl AppState {
    /// Wire up the production models and a simulated drone from `config`.
    pub fn from_config(config: Config) -> Self {
        let tool_model: Arc<dyn ChatModel> = Arc::new(CompletionClient::new(
            config.tool_provider.clone(),
            config.tool_api_key.clone(),
        ));
        let chat_model: Arc<dyn ChatModel> = match &config.chat_api_key {
            Some(key) => Arc::new(CompletionClient::new(
                config.chat_provider.clone(),
                key.clone(),
            )),
            None => {
                tracing::warn!(
                    "{} not set; conversational replies will ask for a key",
                    config.chat_provider.api_key_env
                );
                Arc::new(PlaceholderModel::missing_key(&config.chat_provider))
            }
        };
        Self::new(
            config,
            tool_model,
            chat_model,
            Arc::new(SimulatedDrone::default()),
        )
    }

    pub fn new(
        config: Config,
        tool_model: Arc<dyn ChatModel>,
        chat_model: Arc<dyn ChatModel>,
        drone: Arc<dyn DroneLink>,
    ) -> Self {
        let controller = Arc::new(MissionController::new(drone, config.mission_timing));
        let flight_data = Arc::new(FlightDataStore::with_demo_data());
        let tools = ToolRegistry::new(Arc::clone(&controller), Arc::clone(&flight_data));
        let chat_model_id = chat_model.model_id().to_string();
        let assistant = DroneAssistant::new(
            tool_model,
            chat_model,
            tools,
            flight_data,
            config.drone_connection.clone(),
        );

        Self {
            config,
            session: MissionSession::new(),
            controller,
            assistant: Mutex::new(assistant),
            chat_model_id,
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/chat/history", get(chat_history))
        .route("/api/mission", get(mission_status))
        .route("/api/mission/interrupt", post(interrupt_mission))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::from_config(config));
    let app = router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Setup graceful shutdown on SIGTERM/SIGINT
    let shutdown_state = Arc::clone(&state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal(shutdown_state).await;
        })
        .await?;

    Ok(())
}

/// Wait for a shutdown signal and bring an active mission home.
async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, interrupting any active mission...");
    match state.controller.interrupt(&state.session).await {
        InterruptOutcome::NotInProgress => tracing::info!("No mission in progress"),
        outcome => tracing::info!("{}", outcome),
    }

    tracing::info!("Graceful shutdown complete");
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tool_model: state.config.tool_provider.model.clone(),
        chat_model: state.chat_model_id.clone(),
    })
}

/// Send a message to the assistant and wait for the reply.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message must not be empty".to_string()));
    }

    let mut assistant = state.assistant.lock().await;
    let response = assistant.chat(&state.session, message).await;
    Ok(Json(ChatResponse { response }))
}

async fn chat_history(State(state): State<Arc<AppState>>) -> Json<Vec<ChatMessage>> {
    Json(state.assistant.lock().await.history().to_vec())
}

async fn mission_status(State(state): State<Arc<AppState>>) -> Json<MissionSnapshot> {
    Json(state.session.snapshot().await)
}

/// Abort the active mission. Does not wait for the chat turn that started it.
async fn interrupt_mission(State(state): State<Arc<AppState>>) -> Json<InterruptResponse> {
    let outcome = state.controller.interrupt(&state.session).await;
    let kind = match &outcome {
        InterruptOutcome::NotInProgress => "not_in_progress",
        InterruptOutcome::Aborted => "aborted",
        InterruptOutcome::Failed(_) => "failed",
    };
    Json(InterruptResponse {
        outcome: kind.to_string(),
        message: outcome.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderConfig;
    use serde_json::{json, Value};

    async fn spawn_app() -> (String, Arc<AppState>) {
        let config = Config::new("glm-key".to_string(), None);
        let placeholder: Arc<dyn ChatModel> =
            Arc::new(PlaceholderModel::missing_key(&ProviderConfig::deepseek()));
        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&placeholder),
            placeholder,
            Arc::new(SimulatedDrone::default()),
        ));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::clone(&state));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), state)
    }

    #[tokio::test]
    async fn test_chat_and_mission_endpoints() {
        let (base, state) = spawn_app().await;
        let client = reqwest::Client::new();

        let health: Value = client
            .get(format!("{}/api/health", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["chat_model"], "placeholder");

        let reply: Value = client
            .post(format!("{}/api/chat", base))
            .json(&json!({"message": "Hello"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(
            reply["response"],
            "Authentication error: No DeepSeek API key provided. Please set DEEPSEEK_API_KEY to use this feature."
        );

        let empty = client
            .post(format!("{}/api/chat", base))
            .json(&json!({"message": "   "}))
            .send()
            .await
            .unwrap();
        assert_eq!(empty.status(), reqwest::StatusCode::BAD_REQUEST);

        let history: Vec<Value> = client
            .get(format!("{}/api/chat/history", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["role"], "user");

        let interrupt: Value = client
            .post(format!("{}/api/mission/interrupt", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(interrupt["outcome"], "not_in_progress");

        state
            .controller
            .connect(&state.session, "udp:127.0.0.1:14550")
            .await;
        let mission: Value = client
            .get(format!("{}/api/mission", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(mission["status"], "CONNECTED");
        assert_eq!(mission["tone"], "success");
        assert_eq!(mission["in_progress"], true);
        assert_eq!(mission["log"].as_array().unwrap().len(), 2);
    }
}
