//! Registered flight logs and sensor series, plus the statistics the analysis
//! tools report on them.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Samples further than this many standard deviations from the mean are anomalies.
const ANOMALY_SIGMA: f64 = 3.0;

/// One row of a flight log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightSample {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct FlightLog {
    pub samples: Vec<FlightSample>,
}

/// Named numeric columns from one sensor, sampled at the same instants.
#[derive(Debug, Clone, Default)]
pub struct SensorSeries {
    pub columns: BTreeMap<String, Vec<f64>>,
}

impl SensorSeries {
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.columns.insert(name.into(), values);
        self
    }

    /// Row count, taken from the longest column.
    pub fn len(&self) -> usize {
        self.columns.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightAnalysis {
    pub flight_id: String,
    pub duration_seconds: f64,
    pub max_altitude_meters: f64,
    /// `None` when the log has no speed samples.
    pub avg_speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorStatistics {
    pub mean: BTreeMap<String, f64>,
    pub min: BTreeMap<String, f64>,
    pub max: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorAnalysis {
    pub sensor_name: String,
    pub statistics: SensorStatistics,
    /// Columns with at least one anomalous sample, and how many.
    pub anomalies_detected: BTreeMap<String, usize>,
    pub data_points: usize,
}

impl FlightLog {
    pub fn analyze(&self, flight_id: &str) -> FlightAnalysis {
        let first = self.samples.iter().map(|s| s.timestamp).min();
        let last = self.samples.iter().map(|s| s.timestamp).max();
        let duration_seconds = match (first, last) {
            (Some(first), Some(last)) => (last - first).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        };

        let max_altitude_meters = self
            .samples
            .iter()
            .map(|s| s.altitude)
            .fold(f64::NEG_INFINITY, f64::max);

        let speeds: Vec<f64> = self.samples.iter().filter_map(|s| s.speed).collect();

        FlightAnalysis {
            flight_id: flight_id.to_string(),
            duration_seconds,
            max_altitude_meters: if max_altitude_meters.is_finite() {
                max_altitude_meters
            } else {
                0.0
            },
            avg_speed: mean(&speeds),
        }
    }
}

impl SensorSeries {
    pub fn analyze(&self, sensor_name: &str) -> SensorAnalysis {
        let mut statistics = SensorStatistics {
            mean: BTreeMap::new(),
            min: BTreeMap::new(),
            max: BTreeMap::new(),
        };
        let mut anomalies_detected = BTreeMap::new();

        for (column, values) in &self.columns {
            let Some(avg) = mean(values) else {
                continue;
            };
            statistics.mean.insert(column.clone(), avg);
            statistics
                .min
                .insert(column.clone(), values.iter().copied().fold(f64::INFINITY, f64::min));
            statistics
                .max
                .insert(column.clone(), values.iter().copied().fold(f64::NEG_INFINITY, f64::max));

            if let Some(std) = sample_std(values, avg) {
                let count = values
                    .iter()
                    .filter(|v| (*v - avg).abs() > ANOMALY_SIGMA * std)
                    .count();
                if count > 0 {
                    anomalies_detected.insert(column.clone(), count);
                }
            }
        }

        SensorAnalysis {
            sensor_name: sensor_name.to_string(),
            statistics,
            anomalies_detected,
            data_points: self.len(),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
fn sample_std(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Flight logs and sensor data available to the analysis tools.
#[derive(Debug, Default)]
pub struct FlightDataStore {
    flight_logs: RwLock<BTreeMap<String, FlightLog>>,
    sensors: RwLock<BTreeMap<String, SensorSeries>>,
}

impl FlightDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with `flight_001` and the `battery` and `imu` sensors.
    pub fn with_demo_data() -> Self {
        let start = Utc
            .with_ymd_and_hms(2023, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);

        let samples = (0..100)
            .map(|i| {
                let t = i as f64;
                FlightSample {
                    timestamp: start + ChronoDuration::seconds(10 * i),
                    latitude: 37.7749 + 0.0001 * t / 99.0,
                    longitude: -122.4194 + 0.0002 * t / 99.0,
                    altitude: 50.0 + 10.0 * (t * 0.3).sin(),
                    speed: Some(15.0 + 5.0 * (t * 0.7).cos()),
                }
            })
            .collect();

        let wave = |n: usize, base: f64, amplitude: f64, rate: f64| -> Vec<f64> {
            (0..n)
                .map(|i| base + amplitude * (i as f64 * rate).sin())
                .collect()
        };

        let battery = SensorSeries::default()
            .with_column("voltage", wave(50, 11.1, 0.2, 0.4))
            .with_column("current", wave(50, 5.0, 1.0, 0.9))
            .with_column("temperature", wave(50, 30.0, 5.0, 0.2));

        let imu = SensorSeries::default()
            .with_column("acc_x", wave(1000, 0.0, 0.5, 0.31))
            .with_column("acc_y", wave(1000, 0.0, 0.5, 0.17))
            .with_column("acc_z", wave(1000, 9.8, 0.5, 0.23))
            .with_column("gyro_x", wave(1000, 0.0, 0.1, 0.41))
            .with_column("gyro_y", wave(1000, 0.0, 0.1, 0.29))
            .with_column("gyro_z", wave(1000, 0.0, 0.1, 0.13));

        let mut flight_logs = BTreeMap::new();
        flight_logs.insert("flight_001".to_string(), FlightLog { samples });
        let mut sensors = BTreeMap::new();
        sensors.insert("battery".to_string(), battery);
        sensors.insert("imu".to_string(), imu);

        Self {
            flight_logs: RwLock::new(flight_logs),
            sensors: RwLock::new(sensors),
        }
    }

    pub async fn register_flight_log(&self, flight_id: impl Into<String>, log: FlightLog) {
        let flight_id = flight_id.into();
        tracing::debug!("Registered flight log {} ({} samples)", flight_id, log.samples.len());
        self.flight_logs.write().await.insert(flight_id, log);
    }

    pub async fn register_sensor(&self, sensor_name: impl Into<String>, series: SensorSeries) {
        self.sensors.write().await.insert(sensor_name.into(), series);
    }

    pub async fn flight_ids(&self) -> Vec<String> {
        self.flight_logs.read().await.keys().cloned().collect()
    }

    pub async fn sensor_names(&self) -> Vec<String> {
        self.sensors.read().await.keys().cloned().collect()
    }

    pub async fn analyze_flight(&self, flight_id: &str) -> Option<FlightAnalysis> {
        let logs = self.flight_logs.read().await;
        logs.get(flight_id).map(|log| log.analyze(flight_id))
    }

    pub async fn analyze_sensor(&self, sensor_name: &str) -> Option<SensorAnalysis> {
        let sensors = self.sensors.read().await;
        sensors.get(sensor_name).map(|series| series.analyze(sensor_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_outlier_is_detected() {
        let mut values = vec![10.0; 20];
        values.push(100.0);
        let series = SensorSeries::default()
            .with_column("temperature", values)
            .with_column("voltage", vec![11.0; 21]);

        let analysis = series.analyze("battery");
        assert_eq!(analysis.data_points, 21);
        assert_eq!(analysis.anomalies_detected.get("temperature"), Some(&1));
        assert!(!analysis.anomalies_detected.contains_key("voltage"));
        assert_eq!(analysis.statistics.max["temperature"], 100.0);
        assert_eq!(analysis.statistics.min["voltage"], 11.0);
    }

    #[test]
    fn test_flight_analysis() {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let sample = |secs: i64, altitude: f64, speed: Option<f64>| FlightSample {
            timestamp: start + ChronoDuration::seconds(secs),
            latitude: 37.0,
            longitude: -122.0,
            altitude,
            speed,
        };
        let log = FlightLog {
            samples: vec![
                sample(0, 10.0, Some(4.0)),
                sample(30, 55.0, Some(8.0)),
                sample(90, 20.0, None),
            ],
        };

        let analysis = log.analyze("f1");
        assert_eq!(analysis.duration_seconds, 90.0);
        assert_eq!(analysis.max_altitude_meters, 55.0);
        assert_eq!(analysis.avg_speed, Some(6.0));

        let no_speed = FlightLog {
            samples: vec![sample(0, 5.0, None)],
        };
        assert_eq!(no_speed.analyze("f2").avg_speed, None);
    }

    #[tokio::test]
    async fn test_demo_store_lookup() {
        let store = FlightDataStore::with_demo_data();
        assert_eq!(store.flight_ids().await, vec!["flight_001"]);
        assert_eq!(store.sensor_names().await, vec!["battery", "imu"]);

        let flight = store.analyze_flight("flight_001").await.unwrap();
        assert_eq!(flight.duration_seconds, 990.0);
        assert!(store.analyze_flight("flight_999").await.is_none());

        let imu = store.analyze_sensor("imu").await.unwrap();
        assert_eq!(imu.data_points, 1000);
    }
}
