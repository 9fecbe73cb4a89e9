//! Drone control tools backed by the mission controller.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{number_arg, string_arg, Tool};
use crate::mission::{parse_waypoints, MissionController, MissionSession};

macro_rules! controller_tool {
    ($name:ident) => {
        pub struct $name {
            controller: Arc<MissionController>,
        }

        impl $name {
            pub fn new(controller: Arc<MissionController>) -> Self {
                Self { controller }
            }
        }
    };
}

controller_tool!(ConnectToRealDrone);
controller_tool!(DroneTakeoff);
controller_tool!(DroneLand);
controller_tool!(DroneReturnHome);
controller_tool!(DroneFlyTo);
controller_tool!(GetDroneLocation);
controller_tool!(GetDroneBattery);
controller_tool!(ExecuteDroneMission);
controller_tool!(DisconnectFromDrone);

fn no_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

#[async_trait]
impl Tool for ConnectToRealDrone {
    fn name(&self) -> &str {
        "connect_to_real_drone"
    }

    fn description(&self) -> &str {
        "Connect to a drone. Use 'udp:127.0.0.1:14550' for a simulator, '/dev/ttyACM0' for serial, or 'tcp:192.168.1.1:5760' for a remote link."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "connection_string": {
                    "type": "string",
                    "description": "Connection string for the drone, e.g. 'udp:127.0.0.1:14550'"
                }
            },
            "required": ["connection_string"]
        })
    }

    async fn execute(&self, args: Value, session: &MissionSession) -> anyhow::Result<String> {
        let Some(connection_string) = string_arg(&args, "connection_string") else {
            return Ok("Error: A connection string is required. Examples: 'udp:127.0.0.1:14550' (simulator), '/dev/ttyACM0' (serial) or 'tcp:192.168.1.1:5760' (WiFi).".to_string());
        };
        Ok(self.controller.connect(session, connection_string).await)
    }
}

#[async_trait]
impl Tool for DroneTakeoff {
    fn name(&self) -> &str {
        "drone_takeoff"
    }

    fn description(&self) -> &str {
        "Arm the drone and take off to the given altitude in meters."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "altitude": {
                    "type": "number",
                    "description": "Target altitude in meters"
                }
            },
            "required": ["altitude"]
        })
    }

    async fn execute(&self, args: Value, session: &MissionSession) -> anyhow::Result<String> {
        let Some(altitude) = number_arg(&args, "altitude") else {
            return Ok(
                "Error: Altitude is required. Specify a safe takeoff altitude in meters."
                    .to_string(),
            );
        };
        Ok(self.controller.takeoff(session, altitude).await)
    }
}

#[async_trait]
impl Tool for DroneLand {
    fn name(&self) -> &str {
        "drone_land"
    }

    fn description(&self) -> &str {
        "Land the drone at its current position."
    }

    fn parameters_schema(&self) -> Value {
        no_parameters()
    }

    async fn execute(&self, _args: Value, session: &MissionSession) -> anyhow::Result<String> {
        Ok(self.controller.land(session).await)
    }
}

#[async_trait]
impl Tool for DroneReturnHome {
    fn name(&self) -> &str {
        "drone_return_home"
    }

    fn description(&self) -> &str {
        "Return the drone to its launch point."
    }

    fn parameters_schema(&self) -> Value {
        no_parameters()
    }

    async fn execute(&self, _args: Value, session: &MissionSession) -> anyhow::Result<String> {
        Ok(self.controller.return_home(session).await)
    }
}

#[async_trait]
impl Tool for DroneFlyTo {
    fn name(&self) -> &str {
        "drone_fly_to"
    }

    fn description(&self) -> &str {
        "Fly the drone to a GPS coordinate at the given altitude. The drone must be airborne."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "latitude": { "type": "number", "description": "Target latitude in degrees" },
                "longitude": { "type": "number", "description": "Target longitude in degrees" },
                "altitude": { "type": "number", "description": "Target altitude in meters" }
            },
            "required": ["latitude", "longitude", "altitude"]
        })
    }

    async fn execute(&self, args: Value, _session: &MissionSession) -> anyhow::Result<String> {
        let (Some(lat), Some(lon), Some(alt)) = (
            number_arg(&args, "latitude"),
            number_arg(&args, "longitude"),
            number_arg(&args, "altitude"),
        ) else {
            return Ok("Error: latitude, longitude and altitude are all required.".to_string());
        };
        Ok(self.controller.fly_to(lat, lon, alt).await)
    }
}

#[async_trait]
impl Tool for GetDroneLocation {
    fn name(&self) -> &str {
        "get_drone_location"
    }

    fn description(&self) -> &str {
        "Get the drone's current latitude, longitude and altitude."
    }

    fn parameters_schema(&self) -> Value {
        no_parameters()
    }

    async fn execute(&self, _args: Value, _session: &MissionSession) -> anyhow::Result<String> {
        Ok(self.controller.location().await)
    }
}

#[async_trait]
impl Tool for GetDroneBattery {
    fn name(&self) -> &str {
        "get_drone_battery"
    }

    fn description(&self) -> &str {
        "Get the drone's battery voltage and remaining percentage."
    }

    fn parameters_schema(&self) -> Value {
        no_parameters()
    }

    async fn execute(&self, _args: Value, _session: &MissionSession) -> anyhow::Result<String> {
        Ok(self.controller.battery().await)
    }
}

#[async_trait]
impl Tool for ExecuteDroneMission {
    fn name(&self) -> &str {
        "execute_drone_mission"
    }

    fn description(&self) -> &str {
        "Fly a mission through a list of waypoints. The mission can be interrupted between waypoints, in which case the drone returns to base."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "waypoints": {
                    "type": "array",
                    "description": "Ordered waypoints to visit",
                    "items": {
                        "type": "object",
                        "properties": {
                            "lat": { "type": "number" },
                            "lon": { "type": "number" },
                            "alt": { "type": "number" }
                        },
                        "required": ["lat", "lon", "alt"]
                    }
                }
            },
            "required": ["waypoints"]
        })
    }

    async fn execute(&self, args: Value, session: &MissionSession) -> anyhow::Result<String> {
        let waypoints = match parse_waypoints(&args["waypoints"]) {
            Ok(waypoints) => waypoints,
            Err(e) => return Ok(format!("Error: {}", e)),
        };
        let outcome = self.controller.execute_mission(session, &waypoints).await;
        Ok(outcome.to_string())
    }
}

#[async_trait]
impl Tool for DisconnectFromDrone {
    fn name(&self) -> &str {
        "disconnect_from_drone"
    }

    fn description(&self) -> &str {
        "Disconnect from the drone. Always call this when a flight is finished."
    }

    fn parameters_schema(&self) -> Value {
        no_parameters()
    }

    async fn execute(&self, _args: Value, session: &MissionSession) -> anyhow::Result<String> {
        Ok(self.controller.disconnect(session).await)
    }
}
