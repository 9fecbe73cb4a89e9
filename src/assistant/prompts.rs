//! Prompt text and routing vocabulary for the assistant.

pub const SYSTEM_PROMPT: &str = "You are DeepDrone, an advanced AI assistant designed to help with drone operations and data analysis. You are NOT Qwen or any other general AI assistant. Always identify yourself as DeepDrone when asked about your identity. Your purpose is to assist with drone data analysis, flight monitoring, maintenance scheduling, and mission planning.";

pub const IDENTITY_REPLY: &str = "I am DeepDrone, an advanced AI assistant designed for drone operations and data analysis. I can provide flight data, sensor readings, maintenance recommendations and mission planning for your drone systems. How can I help with your drone operations today?";

pub const IDENTITY_PATTERNS: &[&str] = &[
    "who are you",
    "what are you",
    "tell me about yourself",
    "your identity",
    "what's your name",
    "your name",
    "introduce yourself",
    "what should i call you",
];

pub const DRONE_CONTROL_KEYWORDS: &[&str] = &[
    "takeoff", "take off", "land", "fly to", "navigate", "goto", "connect", "location", "battery",
    "mission", "waypoint", "return", "home", "rtl",
];

pub const ANALYSIS_KEYWORDS: &[&str] = &[
    "analyze", "check", "recommend", "plan", "create", "execute", "run", "flight",
];

pub fn is_identity_question(message: &str) -> bool {
    let lower = message.to_lowercase();
    IDENTITY_PATTERNS.iter().any(|p| lower.contains(p))
}

pub fn needs_tools(message: &str) -> bool {
    let lower = message.to_lowercase();
    ANALYSIS_KEYWORDS
        .iter()
        .chain(DRONE_CONTROL_KEYWORDS)
        .any(|k| lower.contains(k))
}

/// Build the prompt for a tool-calling turn.
pub fn tool_prompt(
    question: &str,
    sensors: &[String],
    flight_logs: &[String],
    default_connection: &str,
) -> String {
    format!(
        r#"{system}

You can control drones with the provided tools. You can:
- Connect to a drone using a connection string
- Take off to a specified altitude
- Land the drone
- Return to the home location
- Fly to specific GPS coordinates
- Get the drone's current location and battery status
- Execute missions with multiple waypoints

Call the tools with the exact parameter names from their schemas. A complete flight looks like:
1. generate_mission_plan(mission_type, duration_minutes)
2. connect_to_real_drone(connection_string='{connection}')
3. drone_takeoff(altitude=30)
4. execute_drone_mission(waypoints=[{{"lat": 37.7749, "lon": -122.4194, "alt": 30}}, {{"lat": 37.7750, "lon": -122.4195, "alt": 30}}]) or drone_fly_to(latitude, longitude, altitude)
5. drone_return_home() or drone_land()
6. disconnect_from_drone()

Available context:
Registered sensors: {sensors:?}
Flight logs available: {flights:?}

User question: {question}"#,
        system = SYSTEM_PROMPT,
        connection = default_connection,
        sensors = sensors,
        flights = flight_logs,
        question = question,
    )
}
