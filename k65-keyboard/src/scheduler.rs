//! Keep-alive and telemetry tickers
//!
//! Each ticker is its own thread with its own cancel token, so either can be
//! stopped without touching the other or the render loop.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use k65_transport::protocol::cmd;
use k65_transport::{Target, Transport};
use tracing::{debug, warn};

use crate::engine::CancelToken;
use crate::error::EngineError;
use crate::telemetry::{TemperatureCache, TemperatureSource};

/// A thread that runs a closure every `interval` until stopped
pub struct PeriodicTask {
    name: String,
    token: CancelToken,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    pub fn spawn<F>(name: &str, interval: Duration, mut tick: F) -> Result<Self, EngineError>
    where
        F: FnMut() + Send + 'static,
    {
        let token = CancelToken::new();
        let loop_token = token.clone();
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while !loop_token.sleep(interval) {
                    tick();
                }
            })
            .map_err(|e| EngineError::Spawn(e.to_string()))?;
        debug!("{} started, every {:?}", name, interval);
        Ok(Self {
            name: name.to_string(),
            token,
            handle,
        })
    }

    /// Cancel and wait for the thread to exit
    pub fn stop(self) {
        self.token.cancel();
        if self.handle.join().is_err() {
            warn!("{} panicked", self.name);
        }
        debug!("{} stopped", self.name);
    }
}

/// Ping every target; failures are logged and otherwise ignored
pub fn keep_alive(transport: &dyn Transport, targets: &[Target]) {
    for &target in targets {
        if let Err(e) = transport.transfer(cmd::KEEP_ALIVE, &[], target) {
            warn!(
                serial = %transport.device_info().serial,
                error = %e,
                "Keep-alive to {:?} failed",
                target
            );
        }
    }
}

/// Owns the keep-alive and telemetry tickers of one device
#[derive(Default)]
pub struct Scheduler {
    keep_alive: Option<PeriodicTask>,
    telemetry: Option<PeriodicTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_keep_alive(
        &mut self,
        transport: Arc<dyn Transport>,
        targets: &'static [Target],
        interval: Duration,
    ) -> Result<(), EngineError> {
        self.stop_keep_alive();
        self.keep_alive = Some(PeriodicTask::spawn("k65-keep-alive", interval, move || {
            keep_alive(transport.as_ref(), targets)
        })?);
        Ok(())
    }

    pub fn start_telemetry(
        &mut self,
        mut source: Box<dyn TemperatureSource>,
        cache: Arc<TemperatureCache>,
        interval: Duration,
    ) -> Result<(), EngineError> {
        self.stop_telemetry();
        // Prime the cache so temperature effects start from a real reading
        cache.sample(source.as_mut());
        self.telemetry = Some(PeriodicTask::spawn("k65-telemetry", interval, move || {
            cache.sample(source.as_mut())
        })?);
        Ok(())
    }

    pub fn stop_keep_alive(&mut self) {
        if let Some(task) = self.keep_alive.take() {
            task.stop();
        }
    }

    pub fn stop_telemetry(&mut self) {
        if let Some(task) = self.telemetry.take() {
            task.stop();
        }
    }

    pub fn stop_all(&mut self) {
        self.stop_keep_alive();
        self.stop_telemetry();
    }

    pub fn is_running(&self) -> bool {
        self.keep_alive.is_some() || self.telemetry.is_some()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}
