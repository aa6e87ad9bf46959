use crux_core::capability::{Capability, CapabilityContext, Operation};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    LOCATION_FASTEST_INTERVAL_MS, LOCATION_INTERVAL_MS, MAX_LOCATION_INTERVAL_MS,
    MIN_LOCATION_INTERVAL_MS,
};

/// Accuracy/power trade-off requested from the fused location provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationPriority {
    #[default]
    HighAccuracy,
    BalancedPowerAccuracy,
    LowPower,
    Passive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocationRequestConfig {
    pub interval_ms: u64,
    pub fastest_interval_ms: u64,
    pub priority: LocationPriority,
}

impl Default for LocationRequestConfig {
    fn default() -> Self {
        Self {
            interval_ms: LOCATION_INTERVAL_MS,
            fastest_interval_ms: LOCATION_FASTEST_INTERVAL_MS,
            priority: LocationPriority::HighAccuracy,
        }
    }
}

impl LocationRequestConfig {
    /// Clamps the interval into the supported window and keeps the fastest
    /// interval no slower than the nominal one.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.interval_ms = self
            .interval_ms
            .clamp(MIN_LOCATION_INTERVAL_MS, MAX_LOCATION_INTERVAL_MS);
        self.fastest_interval_ms = self
            .fastest_interval_ms
            .clamp(MIN_LOCATION_INTERVAL_MS, self.interval_ms);
        self
    }
}

/// One raw reading as delivered by the platform. Not validated; see
/// [`crate::PositionSample`] for the checked form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Epoch milliseconds.
    pub time_ms: i64,
}

/// A delivery from the provider. Providers may batch several fixes into one
/// callback, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LocationBatch {
    pub fixes: Vec<LocationFix>,
}

impl LocationBatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum LocationError {
    #[error("location services are disabled")]
    ServicesDisabled,

    #[error("location permission was revoked")]
    PermissionRevoked,

    #[error("location provider unavailable: {reason}")]
    Unavailable { reason: String },
}

pub type LocationResult = Result<LocationBatch, LocationError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum LocationOperation {
    /// Subscribe to periodic fixes. Each answer is one [`LocationResult`].
    /// Starting again replaces whatever subscription the shell holds.
    StartUpdates(LocationRequestConfig),
    /// Drop the subscription. Safe to send when nothing is subscribed.
    StopUpdates,
}

impl Operation for LocationOperation {
    type Output = LocationResult;
}

#[derive(Clone)]
pub struct Location<E> {
    context: CapabilityContext<LocationOperation, E>,
}

impl<Ev> Capability<Ev> for Location<Ev> {
    type Operation = LocationOperation;
    type MappedSelf<MappedEv> = Location<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Location::new(self.context.map_event(f))
    }
}

impl<E> Location<E>
where
    E: Send + 'static,
{
    pub fn new(context: CapabilityContext<LocationOperation, E>) -> Self {
        Self { context }
    }

    pub fn start_updates<F>(&self, config: LocationRequestConfig, callback: F)
    where
        F: Fn(LocationResult) -> E + Send + 'static,
    {
        let ctx = self.context.clone();
        let operation = LocationOperation::StartUpdates(config.validated());
        self.context.spawn(async move {
            let mut updates = ctx.stream_from_shell(operation);
            while let Some(result) = updates.next().await {
                ctx.update_app(callback(result));
            }
        });
    }

    pub fn stop_updates(&self) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(LocationOperation::StopUpdates).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_config_defaults() {
        let config = LocationRequestConfig::default();
        assert_eq!(config.interval_ms, 1_000);
        assert_eq!(config.fastest_interval_ms, 500);
        assert_eq!(config.priority, LocationPriority::HighAccuracy);
        assert_eq!(config.clone().validated(), config);
    }

    #[test]
    fn test_request_config_validated_clamps() {
        let config = LocationRequestConfig {
            interval_ms: 10,
            fastest_interval_ms: 5,
            ..LocationRequestConfig::default()
        }
        .validated();
        assert_eq!(config.interval_ms, MIN_LOCATION_INTERVAL_MS);
        assert_eq!(config.fastest_interval_ms, MIN_LOCATION_INTERVAL_MS);

        let config = LocationRequestConfig {
            interval_ms: 10 * 60 * 1000,
            ..LocationRequestConfig::default()
        }
        .validated();
        assert_eq!(config.interval_ms, MAX_LOCATION_INTERVAL_MS);
    }

    #[test]
    fn test_fastest_never_slower_than_interval() {
        let config = LocationRequestConfig {
            interval_ms: 2_000,
            fastest_interval_ms: 5_000,
            priority: LocationPriority::LowPower,
        }
        .validated();
        assert_eq!(config.interval_ms, 2_000);
        assert_eq!(config.fastest_interval_ms, 2_000);
        assert_eq!(config.priority, LocationPriority::LowPower);
    }

    #[test]
    fn test_batch_helpers() {
        assert!(LocationBatch::default().is_empty());

        let fix = LocationFix {
            latitude: 1.0,
            longitude: 2.0,
            altitude: 3.0,
            time_ms: 4,
        };
        let batch = LocationBatch { fixes: vec![fix] };
        assert!(!batch.is_empty());
        assert_eq!(batch.fixes, vec![fix]);
    }

    #[test]
    fn test_operation_serialization() {
        let op = LocationOperation::StartUpdates(LocationRequestConfig::default());
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"op\":\"StartUpdates\""));
        assert!(json.contains("\"priority\":\"high_accuracy\""));

        let back: LocationOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);

        let stop = serde_json::to_value(LocationOperation::StopUpdates).unwrap();
        assert_eq!(stop, serde_json::json!({ "op": "StopUpdates" }));
    }

    #[test]
    fn test_location_error_display() {
        assert_eq!(
            LocationError::ServicesDisabled.to_string(),
            "location services are disabled"
        );
        assert_eq!(
            LocationError::Unavailable {
                reason: "no provider".into()
            }
            .to_string(),
            "location provider unavailable: no provider"
        );
    }
}
