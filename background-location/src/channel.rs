use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    accuracy::AccuracyTier,
    fix::ControlEcho,
    provider::{LocationListener, LocationProvider, UpdateRequest},
    service::LocationService,
    settings::interval_from_millis,
};

pub const START_LOCATION_SERVICE: &str = "start_location_service";
pub const STOP_LOCATION_SERVICE: &str = "stop_location_service";
pub const SET_CONFIGURATION: &str = "set_configuration";
pub const SET_ANDROID_NOTIFICATION: &str = "set_android_notification";
pub const IS_SERVICE_RUNNING: &str = "is_service_running";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A request arriving over the method channel
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MethodResponse {
    Success(Value),
    /// The method name isn't one this channel knows
    NotImplemented,
}

impl MethodResponse {
    fn bool(v: bool) -> Self {
        Self::Success(Value::Bool(v))
    }
}

/// Dispatches method channel calls onto a [LocationService]
pub struct MethodChannel<P: LocationProvider, L: LocationListener> {
    service: Arc<LocationService<P, L>>,
    notification: Mutex<Option<Value>>,
}

impl<P: LocationProvider + 'static, L: LocationListener + 'static> MethodChannel<P, L> {
    pub fn new(service: Arc<LocationService<P, L>>) -> Self {
        Self {
            service,
            notification: Mutex::new(None),
        }
    }

    pub fn service(&self) -> &Arc<LocationService<P, L>> {
        &self.service
    }

    /// The last payload passed to `set_android_notification`, for hosts that show a foreground
    /// service notification
    pub async fn notification_config(&self) -> Option<Value> {
        self.notification.lock().await.clone()
    }

    fn echo(&self, echo: ControlEcho) {
        self.service.listener().on_control(echo);
    }

    pub async fn handle(&self, call: MethodCall) -> MethodResponse {
        self.echo(ControlEcho::Method);

        let args = &call.arguments;

        match call.method.as_str() {
            START_LOCATION_SERVICE => {
                self.echo(ControlEcho::StartLocationService);
                let settings = self.service.settings();
                let distance_filter = args
                    .get("distance_filter")
                    .and_then(Value::as_f64)
                    .unwrap_or(settings.default_distance_filter);
                let accuracy = args
                    .get("priority")
                    .and_then(Value::as_i64)
                    .and_then(AccuracyTier::from_priority)
                    .unwrap_or(settings.default_accuracy);
                let request = UpdateRequest {
                    accuracy,
                    distance_filter,
                };
                MethodResponse::bool(self.service.start(request).await)
            }
            SET_CONFIGURATION => {
                match args.get("interval") {
                    Some(Value::String(raw)) => {
                        self.service.configure(raw).await;
                    }
                    Some(Value::Number(n)) => {
                        if let Some(interval) = n.as_f64().and_then(interval_from_millis) {
                            self.service.set_interval(interval).await;
                        } else {
                            debug!("Ignoring unusable interval {n}");
                        }
                    }
                    other => debug!("Ignoring configuration without an interval: {other:?}"),
                }
                MethodResponse::bool(true)
            }
            SET_ANDROID_NOTIFICATION => {
                debug!("Notification configuration received");
                *self.notification.lock().await = Some(call.arguments);
                MethodResponse::bool(true)
            }
            IS_SERVICE_RUNNING => MethodResponse::bool(self.service.is_running().await),
            STOP_LOCATION_SERVICE => {
                let stopped = self.service.stop().await;
                self.echo(ControlEcho::StopLocationService);
                MethodResponse::bool(stopped)
            }
            other => {
                warn!("Unknown method call {other}");
                MethodResponse::NotImplemented
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::test;

    use super::*;
    use crate::{
        ServiceSettings,
        fix::LocationEvent,
        tests::{MockProvider, RecordingListener},
    };

    type TestChannel = MethodChannel<MockProvider, RecordingListener>;

    fn mk_channel(provider: MockProvider) -> TestChannel {
        tokio::time::pause();
        let service = LocationService::new(
            ServiceSettings::default(),
            provider,
            RecordingListener::default(),
        );
        MethodChannel::new(Arc::new(service))
    }

    async fn call(channel: &TestChannel, method: &str, arguments: Value) -> MethodResponse {
        channel.handle(MethodCall::new(method, arguments)).await
    }

    #[test]
    async fn start_maps_priority_and_filter() {
        let channel = mk_channel(MockProvider::default());

        let resp = call(
            &channel,
            START_LOCATION_SERVICE,
            json!({ "distance_filter": 25.0, "priority": 2 }),
        )
        .await;

        assert_eq!(resp, MethodResponse::Success(json!(true)));
        assert_eq!(
            channel.service().provider().last_request(),
            Some(UpdateRequest {
                accuracy: AccuracyTier::HundredMeters,
                distance_filter: 25.0,
            })
        );
        assert!(channel.service().is_running().await);
    }

    #[test]
    async fn start_without_arguments_uses_defaults() {
        let channel = mk_channel(MockProvider::default());

        call(&channel, START_LOCATION_SERVICE, Value::Null).await;

        assert_eq!(
            channel.service().provider().last_request(),
            Some(UpdateRequest::default())
        );
    }

    #[test]
    async fn reduced_priority_falls_back_when_unsupported() {
        let channel = mk_channel(MockProvider::without(&[AccuracyTier::Reduced]));

        call(&channel, START_LOCATION_SERVICE, json!({ "priority": 3 })).await;

        let request = channel.service().provider().last_request().unwrap();
        assert_eq!(request.accuracy, AccuracyTier::Best);
    }

    #[test]
    async fn start_reports_success_even_if_provider_fails() {
        let channel = mk_channel(MockProvider::unauthorized());

        let resp = call(&channel, START_LOCATION_SERVICE, json!({})).await;

        assert_eq!(resp, MethodResponse::Success(json!(true)));
    }

    #[test]
    async fn configuration_interval() {
        let channel = mk_channel(MockProvider::default());

        call(&channel, SET_CONFIGURATION, json!({ "interval": "30000" })).await;
        assert_eq!(
            channel.service().snapshot().await.interval(),
            Duration::from_secs(30)
        );

        let resp = call(
            &channel,
            SET_CONFIGURATION,
            json!({ "interval": "not-a-number" }),
        )
        .await;
        assert_eq!(resp, MethodResponse::Success(json!(true)));
        assert_eq!(
            channel.service().snapshot().await.interval(),
            Duration::from_secs(30)
        );

        call(&channel, SET_CONFIGURATION, json!({ "interval": 5000 })).await;
        assert_eq!(
            channel.service().snapshot().await.interval(),
            Duration::from_secs(5)
        );

        call(&channel, SET_CONFIGURATION, json!({})).await;
        assert_eq!(
            channel.service().snapshot().await.interval(),
            Duration::from_secs(5)
        );
    }

    #[test]
    async fn running_flag_follows_start_and_stop() {
        let channel = mk_channel(MockProvider::default());

        assert_eq!(
            call(&channel, IS_SERVICE_RUNNING, Value::Null).await,
            MethodResponse::Success(json!(false))
        );

        call(&channel, START_LOCATION_SERVICE, json!({})).await;
        assert_eq!(
            call(&channel, IS_SERVICE_RUNNING, Value::Null).await,
            MethodResponse::Success(json!(true))
        );

        call(&channel, STOP_LOCATION_SERVICE, Value::Null).await;
        assert_eq!(
            call(&channel, IS_SERVICE_RUNNING, Value::Null).await,
            MethodResponse::Success(json!(false))
        );
        assert!(channel.service().provider().stopped());
    }

    #[test]
    async fn notification_config_is_kept() {
        let channel = mk_channel(MockProvider::default());
        let config = json!({ "title": "Tracking", "message": "Location in use" });

        let resp = call(&channel, SET_ANDROID_NOTIFICATION, config.clone()).await;

        assert_eq!(resp, MethodResponse::Success(json!(true)));
        assert_eq!(channel.notification_config().await, Some(config));
    }

    #[test]
    async fn control_echoes() {
        let channel = mk_channel(MockProvider::default());

        call(&channel, START_LOCATION_SERVICE, json!({})).await;
        call(&channel, IS_SERVICE_RUNNING, Value::Null).await;
        call(&channel, STOP_LOCATION_SERVICE, Value::Null).await;

        assert_eq!(
            channel.service().listener().events(),
            vec![
                LocationEvent::Control(ControlEcho::Method),
                LocationEvent::Control(ControlEcho::StartLocationService),
                LocationEvent::Control(ControlEcho::Method),
                LocationEvent::Control(ControlEcho::Method),
                LocationEvent::Control(ControlEcho::StopLocationService),
            ]
        );
    }

    #[test]
    async fn unknown_method() {
        let channel = mk_channel(MockProvider::default());

        let resp = call(&channel, "get_location", Value::Null).await;

        assert_eq!(resp, MethodResponse::NotImplemented);
        assert_eq!(
            channel.service().listener().events(),
            vec![LocationEvent::Control(ControlEcho::Method)]
        );
    }
}
