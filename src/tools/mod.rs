//! Tool system for the assistant.
//!
//! Tools are how the tool-calling model acts on the world: drone commands go
//! through the [`MissionController`], analysis tools read the registered
//! flight data. Each call runs against the caller's [`MissionSession`].

mod analysis;
mod drone;

pub use analysis::{AnalyzeFlightPath, CheckSensorReadings, GenerateMissionPlan, RecommendMaintenance};
pub use drone::{
    ConnectToRealDrone, DisconnectFromDrone, DroneFlyTo, DroneLand, DroneReturnHome, DroneTakeoff,
    ExecuteDroneMission, GetDroneBattery, GetDroneLocation,
};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{FunctionDefinition, ToolDefinition};
use crate::mission::{MissionController, MissionSession};
use crate::telemetry::FlightDataStore;

/// Information about a tool for display purposes.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Trait for implementing tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool.
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    ///
    /// Missing or malformed arguments are reported in the returned text so
    /// the model can correct itself; `Err` is reserved for failures the
    /// assistant should surface as an error.
    async fn execute(&self, args: Value, session: &MissionSession) -> anyhow::Result<String>;
}

/// Registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a registry with every drone and analysis tool.
    pub fn new(controller: Arc<MissionController>, flight_data: Arc<FlightDataStore>) -> Self {
        let registry_id = uuid::Uuid::new_v4().to_string()[..8].to_string();
        tracing::debug!("Creating ToolRegistry {}", registry_id);
        let mut registry = Self::empty();

        // Drone control
        registry.register(Arc::new(ConnectToRealDrone::new(Arc::clone(&controller))));
        registry.register(Arc::new(DroneTakeoff::new(Arc::clone(&controller))));
        registry.register(Arc::new(DroneLand::new(Arc::clone(&controller))));
        registry.register(Arc::new(DroneReturnHome::new(Arc::clone(&controller))));
        registry.register(Arc::new(DroneFlyTo::new(Arc::clone(&controller))));
        registry.register(Arc::new(GetDroneLocation::new(Arc::clone(&controller))));
        registry.register(Arc::new(GetDroneBattery::new(Arc::clone(&controller))));
        registry.register(Arc::new(ExecuteDroneMission::new(Arc::clone(&controller))));
        registry.register(Arc::new(DisconnectFromDrone::new(controller)));

        // Planning and analysis
        registry.register(Arc::new(GenerateMissionPlan));
        registry.register(Arc::new(RecommendMaintenance));
        registry.register(Arc::new(AnalyzeFlightPath::new(Arc::clone(&flight_data))));
        registry.register(Arc::new(CheckSensorReadings::new(flight_data)));

        tracing::info!(
            "Registry {} complete with {} total tools",
            registry_id,
            registry.tools.len()
        );
        registry
    }

    /// Create an empty registry (no built-in tools).
    pub fn empty() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Add a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// List all available tools, sorted by name.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        let mut tools: Vec<ToolInfo> = self
            .tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Check if a tool exists by name.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get tool schemas in LLM-compatible format.
    pub fn get_tool_schemas(&self) -> Vec<ToolDefinition> {
        let mut schemas: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition {
                tool_type: "function".to_string(),
                function: FunctionDefinition {
                    name: t.name().to_string(),
                    description: t.description().to_string(),
                    parameters: t.parameters_schema(),
                },
            })
            .collect();
        schemas.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        schemas
    }

    /// Execute a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        session: &MissionSession,
    ) -> anyhow::Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", name))?;

        tracing::debug!("Executing tool {} with {}", name, args);
        tool.execute(args, session).await
    }
}

/// Read a numeric argument, accepting numbers sent as strings.
fn number_arg(args: &Value, key: &str) -> Option<f64> {
    match args.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drone::SimulatedDrone;
    use crate::mission::MissionTiming;
    use serde_json::json;

    fn registry() -> ToolRegistry {
        let controller = Arc::new(MissionController::new(
            Arc::new(SimulatedDrone::default()),
            MissionTiming::default(),
        ));
        ToolRegistry::new(controller, Arc::new(FlightDataStore::new()))
    }

    #[test]
    fn test_registry_lists_every_tool() {
        let registry = registry();
        let names: Vec<String> = registry.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "analyze_flight_path",
                "check_sensor_readings",
                "connect_to_real_drone",
                "disconnect_from_drone",
                "drone_fly_to",
                "drone_land",
                "drone_return_home",
                "drone_takeoff",
                "execute_drone_mission",
                "generate_mission_plan",
                "get_drone_battery",
                "get_drone_location",
                "recommend_maintenance",
            ]
        );

        let schemas = registry.get_tool_schemas();
        assert_eq!(schemas.len(), 13);
        assert!(schemas.iter().all(|s| s.tool_type == "function"));
        assert!(schemas.iter().all(|s| s.function.parameters["type"] == "object"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let registry = registry();
        let session = MissionSession::new();
        let err = registry
            .execute("launch_fireworks", json!({}), &session)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: launch_fireworks");
        assert!(!registry.has_tool("launch_fireworks"));
        assert!(registry.has_tool("drone_takeoff"));
    }

    #[test]
    fn test_argument_helpers() {
        let args = json!({"altitude": "30", "lat": 37.5, "name": "  ", "flag": true});
        assert_eq!(number_arg(&args, "altitude"), Some(30.0));
        assert_eq!(number_arg(&args, "lat"), Some(37.5));
        assert_eq!(number_arg(&args, "flag"), None);
        assert_eq!(number_arg(&args, "missing"), None);
        assert_eq!(string_arg(&args, "name"), None);
    }
}
