//! Planning and data-analysis tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{number_arg, string_arg, Tool};
use crate::mission::MissionSession;
use crate::telemetry::FlightDataStore;

/// Battery capacity to reserve per minute of planned flight.
const BATTERY_MARGIN: f64 = 1.3;

const PRE_FLIGHT_CHECKS: &[&str] = &[
    "Battery charge level",
    "Motor functionality",
    "GPS signal strength",
    "Camera/sensor calibration",
];

/// Maintenance tasks for the given hours since the last service.
pub fn maintenance_tasks(flight_hours: f64) -> &'static [&'static str] {
    if flight_hours < 10.0 {
        &["Regular pre-flight checks only"]
    } else if flight_hours < 50.0 {
        &[
            "Basic maintenance check recommended",
            "Inspect propellers and motors",
            "Check battery health",
        ]
    } else if flight_hours < 100.0 {
        &[
            "Intermediate maintenance required",
            "Replace propellers",
            "Test all sensors",
            "Firmware updates if available",
        ]
    } else {
        &[
            "Full maintenance overhaul required",
            "Motor inspection and possible replacement",
            "Full electronic systems check",
            "Battery replacement recommended",
            "Structural integrity evaluation",
        ]
    }
}

/// Build a mission plan for `mission_type` lasting `duration_minutes`.
pub fn mission_plan(mission_type: &str, duration_minutes: f64) -> Value {
    let (pattern, altitude, considerations) = match mission_type.to_lowercase().as_str() {
        "survey" => (
            "Grid pattern with 70% overlap",
            "40-60 meters",
            "Ensure consistent lighting conditions",
        ),
        "inspection" => (
            "Orbital with variable radius",
            "5-20 meters",
            "Maintain safe distance from structures",
        ),
        "delivery" => (
            "Direct point-to-point",
            "30 meters",
            "Check payload weight and balance",
        ),
        _ => (
            "Custom",
            "Dependent on mission specifics",
            "Consult regulations for specific operation type",
        ),
    };

    let mut plan = Map::new();
    plan.insert("mission_type".into(), json!(mission_type));
    plan.insert("duration_minutes".into(), json!(duration_minutes));
    plan.insert(
        "battery_required".into(),
        json!(format!("{:.1} minutes capacity", duration_minutes * BATTERY_MARGIN)),
    );
    plan.insert("pre_flight_checks".into(), json!(PRE_FLIGHT_CHECKS));
    plan.insert("flight_pattern".into(), json!(pattern));
    plan.insert("recommended_altitude".into(), json!(altitude));
    plan.insert("special_considerations".into(), json!(considerations));
    Value::Object(plan)
}

pub struct GenerateMissionPlan;

#[async_trait]
impl Tool for GenerateMissionPlan {
    fn name(&self) -> &str {
        "generate_mission_plan"
    }

    fn description(&self) -> &str {
        "Generate a mission plan (flight pattern, altitude, battery requirement and pre-flight checks) for a mission type and duration."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "mission_type": {
                    "type": "string",
                    "description": "Type of mission: survey, inspection, delivery or a custom type"
                },
                "duration_minutes": {
                    "type": "number",
                    "description": "Expected mission duration in minutes"
                }
            },
            "required": ["mission_type", "duration_minutes"]
        })
    }

    async fn execute(&self, args: Value, _session: &MissionSession) -> anyhow::Result<String> {
        let Some(mission_type) = string_arg(&args, "mission_type") else {
            return Ok(
                "Please specify the mission type (for example survey, inspection or delivery)."
                    .to_string(),
            );
        };
        let Some(duration) = number_arg(&args, "duration_minutes") else {
            return Ok("Please specify the expected mission duration in minutes.".to_string());
        };
        Ok(serde_json::to_string_pretty(&mission_plan(mission_type, duration))?)
    }
}

pub struct RecommendMaintenance;

#[async_trait]
impl Tool for RecommendMaintenance {
    fn name(&self) -> &str {
        "recommend_maintenance"
    }

    fn description(&self) -> &str {
        "Recommend maintenance tasks based on flight hours since the last service."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "flight_hours": {
                    "type": "number",
                    "description": "Flight hours since the last maintenance"
                }
            },
            "required": ["flight_hours"]
        })
    }

    async fn execute(&self, args: Value, _session: &MissionSession) -> anyhow::Result<String> {
        let Some(hours) = number_arg(&args, "flight_hours") else {
            return Ok("Please provide the total flight hours for the drone.".to_string());
        };
        Ok(maintenance_tasks(hours).join("\n"))
    }
}

pub struct AnalyzeFlightPath {
    flight_data: Arc<FlightDataStore>,
}

impl AnalyzeFlightPath {
    pub fn new(flight_data: Arc<FlightDataStore>) -> Self {
        Self { flight_data }
    }
}

#[async_trait]
impl Tool for AnalyzeFlightPath {
    fn name(&self) -> &str {
        "analyze_flight_path"
    }

    fn description(&self) -> &str {
        "Analyze a recorded flight: duration, maximum altitude and average speed."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "flight_id": {
                    "type": "string",
                    "description": "Identifier of a registered flight log"
                }
            },
            "required": ["flight_id"]
        })
    }

    async fn execute(&self, args: Value, _session: &MissionSession) -> anyhow::Result<String> {
        let analysis = match string_arg(&args, "flight_id") {
            Some(id) => self.flight_data.analyze_flight(id).await,
            None => None,
        };
        match analysis {
            Some(analysis) => Ok(serde_json::to_string_pretty(&analysis)?),
            None => Ok(format!(
                "Flight not found. Available flights: {:?}",
                self.flight_data.flight_ids().await
            )),
        }
    }
}

pub struct CheckSensorReadings {
    flight_data: Arc<FlightDataStore>,
}

impl CheckSensorReadings {
    pub fn new(flight_data: Arc<FlightDataStore>) -> Self {
        Self { flight_data }
    }
}

#[async_trait]
impl Tool for CheckSensorReadings {
    fn name(&self) -> &str {
        "check_sensor_readings"
    }

    fn description(&self) -> &str {
        "Check a sensor's readings: per-channel mean, min and max, and the number of samples more than three standard deviations from the mean."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sensor_name": {
                    "type": "string",
                    "description": "Name of a registered sensor, e.g. 'battery' or 'imu'"
                }
            },
            "required": ["sensor_name"]
        })
    }

    async fn execute(&self, args: Value, _session: &MissionSession) -> anyhow::Result<String> {
        let analysis = match string_arg(&args, "sensor_name") {
            Some(name) => self.flight_data.analyze_sensor(name).await,
            None => None,
        };
        match analysis {
            Some(analysis) => Ok(serde_json::to_string_pretty(&analysis)?),
            None => Ok(format!(
                "Sensor not found. Available sensors: {:?}",
                self.flight_data.sensor_names().await
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maintenance_tiers() {
        assert_eq!(maintenance_tasks(0.0), &["Regular pre-flight checks only"]);
        assert_eq!(maintenance_tasks(9.9).len(), 1);
        assert_eq!(maintenance_tasks(10.0)[0], "Basic maintenance check recommended");
        assert_eq!(maintenance_tasks(49.9).len(), 3);
        assert_eq!(maintenance_tasks(50.0)[0], "Intermediate maintenance required");
        assert_eq!(maintenance_tasks(100.0)[0], "Full maintenance overhaul required");
        assert_eq!(maintenance_tasks(250.0).len(), 5);
    }

    #[test]
    fn test_mission_plan_battery_and_pattern() {
        let plan = mission_plan("Survey", 20.0);
        assert_eq!(plan["battery_required"], "26.0 minutes capacity");
        assert_eq!(plan["flight_pattern"], "Grid pattern with 70% overlap");
        assert_eq!(plan["pre_flight_checks"].as_array().unwrap().len(), 4);

        let custom = mission_plan("crop spraying", 15.0);
        assert_eq!(custom["battery_required"], "19.5 minutes capacity");
        assert_eq!(custom["flight_pattern"], "Custom");
    }

    #[test]
    fn test_tools_report_missing_arguments() {
        let session = MissionSession::new();
        let reply = tokio_test::block_on(RecommendMaintenance.execute(json!({}), &session)).unwrap();
        assert_eq!(reply, "Please provide the total flight hours for the drone.");

        let reply = tokio_test::block_on(
            GenerateMissionPlan.execute(json!({"mission_type": "delivery"}), &session),
        )
        .unwrap();
        assert_eq!(reply, "Please specify the expected mission duration in minutes.");

        let reply = tokio_test::block_on(
            RecommendMaintenance.execute(json!({"flight_hours": 75}), &session),
        )
        .unwrap();
        assert_eq!(
            reply,
            "Intermediate maintenance required\nReplace propellers\nTest all sensors\nFirmware updates if available"
        );
    }

    #[tokio::test]
    async fn test_sensor_lookup() {
        let store = Arc::new(FlightDataStore::with_demo_data());
        let tool = CheckSensorReadings::new(Arc::clone(&store));
        let session = MissionSession::new();

        let reply = tool
            .execute(json!({"sensor_name": "lidar"}), &session)
            .await
            .unwrap();
        assert_eq!(reply, "Sensor not found. Available sensors: [\"battery\", \"imu\"]");

        let reply = tool
            .execute(json!({"sensor_name": "battery"}), &session)
            .await
            .unwrap();
        let report: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(report["sensor_name"], "battery");
        assert_eq!(report["data_points"], 50);

        let flight = AnalyzeFlightPath::new(store)
            .execute(json!({"flight_id": "flight_001"}), &session)
            .await
            .unwrap();
        assert!(flight.contains("\"max_altitude_meters\""));
    }

    #[tokio::test]
    async fn test_registered_data_is_analyzed() {
        use crate::telemetry::{FlightLog, FlightSample, SensorSeries};
        use chrono::{TimeZone, Utc};

        let store = Arc::new(FlightDataStore::default());
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let sample = |secs: i64, altitude: f64, speed: Option<f64>| FlightSample {
            timestamp: start + chrono::Duration::seconds(secs),
            latitude: 37.7749,
            longitude: -122.4194,
            altitude,
            speed,
        };
        store
            .register_flight_log(
                "survey_7",
                FlightLog {
                    samples: vec![
                        sample(0, 0.0, None),
                        sample(45, 42.0, Some(4.0)),
                        sample(90, 12.0, Some(6.0)),
                    ],
                },
            )
            .await;
        store
            .register_sensor(
                "lidar",
                SensorSeries::default().with_column("range", vec![10.0, 12.0, 14.0]),
            )
            .await;

        let session = MissionSession::new();
        let reply = AnalyzeFlightPath::new(Arc::clone(&store))
            .execute(json!({"flight_id": "survey_7"}), &session)
            .await
            .unwrap();
        let report: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(report["flight_id"], "survey_7");
        assert_eq!(report["duration_seconds"], 90.0);
        assert_eq!(report["max_altitude_meters"], 42.0);
        assert_eq!(report["avg_speed"], 5.0);

        let reply = CheckSensorReadings::new(store)
            .execute(json!({"sensor_name": "lidar"}), &session)
            .await
            .unwrap();
        let report: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(report["data_points"], 3);
        assert_eq!(report["statistics"]["mean"]["range"], 12.0);
    }
}
