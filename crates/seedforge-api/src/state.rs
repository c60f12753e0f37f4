//! API application state and health tracking.

use std::sync::{Mutex, MutexGuard, PoisonError};

use seedforge_config::ConfigService;
use seedforge_events::{Event, EventBus};
use seedforge_telemetry::Metrics;
use tracing::{info, warn};

use crate::CreationHandles;

pub(crate) const CONFIG_WATCHER_COMPONENT: &str = "config_watcher";
pub(crate) const REMOTE_COMPONENT: &str = "qbittorrent";

pub(crate) struct ApiState {
    pub(crate) config: ConfigService,
    pub(crate) telemetry: Metrics,
    pub(crate) events: EventBus,
    pub(crate) handles: CreationHandles,
    health_status: Mutex<Vec<String>>,
}

impl ApiState {
    pub(crate) fn new(
        config: ConfigService,
        telemetry: Metrics,
        events: EventBus,
        handles: CreationHandles,
    ) -> Self {
        Self {
            config,
            telemetry,
            events,
            handles,
            health_status: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn add_degraded_component(&self, component: &str) -> bool {
        let mut guard = lock(&self.health_status);
        if guard.iter().any(|entry| entry == component) {
            return false;
        }
        guard.push(component.to_string());
        guard.sort();
        drop(guard);
        warn!(component, "component degraded");
        true
    }

    pub(crate) fn remove_degraded_component(&self, component: &str) -> bool {
        let mut guard = lock(&self.health_status);
        let previous = guard.len();
        guard.retain(|entry| entry != component);
        if guard.len() == previous {
            return false;
        }
        drop(guard);
        info!(component, "component recovered");
        true
    }

    pub(crate) fn current_health_degraded(&self) -> Vec<String> {
        lock(&self.health_status).clone()
    }

    /// Mirror the config watcher's health reports; other components are probed here.
    pub(crate) fn apply_health_event(&self, event: &Event) {
        if let Event::HealthChanged { degraded } = event {
            if degraded.iter().any(|entry| entry == CONFIG_WATCHER_COMPONENT) {
                self.add_degraded_component(CONFIG_WATCHER_COMPONENT);
            } else {
                self.remove_degraded_component(CONFIG_WATCHER_COMPONENT);
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
