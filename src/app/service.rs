//! Device service: wires channels, evaluators and the listener together.
//!
//! `main` owns the platform (peripherals, link, storage, watchdog) and
//! hands this service two outputs, a clock and an event sink. Everything
//! from there on is target-independent, which is what lets the
//! integration tests run the full device against mock pins on the host.
//!
//! ```text
//!   DeviceService::start
//!     ├─ RelayChannel(relay pin)        ─┐
//!     ├─ IndicatorChannel(indicator pwm) ├─▶ ChannelBank (Arc)
//!     ├─ Evaluator × N  (Core::App)      ┘
//!     └─ Listener       (Core::Pro) ──▶ ConnectionHandler × M
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::{error, info};

use super::events::{AppEvent, StatusData};
use super::ports::{Clock, EventSink};
use crate::actuator::bank::ChannelBank;
use crate::actuator::Channel;
use crate::actuator::evaluator::{self, Evaluator};
use crate::actuator::indicator::IndicatorChannel;
use crate::actuator::relay::RelayChannel;
use crate::adapters::tcp::{Admission, Listener};
use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::protocol::handler::HandlerContext;
use crate::safety::EvaluatorSupervisor;

/// Evaluator task names, one per channel (NUL-terminated for FreeRTOS).
const RELAY_TASK: &str = "eval-relay\0";
const INDICATOR_TASK: &str = "eval-led\0";

/// A running device.
pub struct DeviceService {
    bank: Arc<ChannelBank>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    supervisor: EvaluatorSupervisor,
    connections: Arc<AtomicUsize>,
    port: u16,
    started_ms: u64,
}

impl DeviceService {
    /// Build the channel set, start one evaluator per channel, bind the
    /// listener and start accepting.
    ///
    /// Pins must already be configured as outputs.
    pub fn start<R, L>(
        config: &SystemConfig,
        relay: R,
        indicator: L,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self>
    where
        R: OutputPin + Send + 'static,
        L: SetDutyCycle + Send + 'static,
    {
        let now = clock.now_ms();
        let relay = Arc::new(RelayChannel::new("relay", relay, now));
        let indicator = Arc::new(IndicatorChannel::new(
            "indicator",
            indicator,
            config.activity_pulse_ms,
            now,
        ));

        let mut bank = ChannelBank::new();
        bank.push(relay.clone())?;
        bank.push(indicator.clone())?;
        let bank = Arc::new(bank);

        let mut supervisor = EvaluatorSupervisor::default();
        for (channel, task) in [
            (relay as Arc<dyn Channel>, RELAY_TASK),
            (indicator as Arc<dyn Channel>, INDICATOR_TASK),
        ] {
            let ev = Evaluator::new(channel, Arc::clone(&clock));
            supervisor
                .watch(ev.heartbeat())
                .map_err(|_| Error::Init("supervisor full"))?;
            evaluator::spawn(ev, task).map_err(|e| {
                error!("service: evaluator spawn failed: {}", e);
                Error::Init("evaluator spawn")
            })?;
        }

        let ctx = HandlerContext {
            bank: Arc::clone(&bank),
            clock: Arc::clone(&clock),
            events: Arc::clone(&events),
            byte_order: config.byte_order,
            framing: config.framing,
        };
        let admission = Admission::new(config.max_connections, config.accept_rate_per_sec);
        let connections = admission.counter();
        let listener = Listener::bind(config.server_port, ctx, admission)?;
        let port = listener.port();
        listener.spawn().map_err(|e| {
            error!("service: listener spawn failed: {}", e);
            Error::Init("listener spawn")
        })?;

        events.emit(&AppEvent::Started {
            port,
            channels: bank.len(),
        });
        info!("service: {} channels, listening on :{}", bank.len(), port);

        Ok(Self {
            bank,
            clock,
            events,
            supervisor,
            connections,
            port,
            started_ms: now,
        })
    }

    /// Port the listener is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Check evaluator liveness; emits an event per stalled evaluator.
    /// Returns `true` when it is safe to feed the watchdog.
    pub fn supervise(&mut self) -> bool {
        let stalls = self.supervisor.check(self.clock.now_ms());
        for s in &stalls {
            self.events.emit(&AppEvent::EvaluatorStalled {
                channel: s.channel,
                silent_ms: u64::from(s.silent_ms),
            });
        }
        stalls.is_empty()
    }

    /// Snapshot for telemetry.
    pub fn status(&self) -> StatusData {
        let now = self.clock.now_ms();
        StatusData {
            uptime_ms: now.saturating_sub(self.started_ms),
            connections: self.connections.load(Ordering::Acquire),
            channels: self.bank.status(now),
        }
    }

    /// Emit a [`AppEvent::Status`] snapshot.
    pub fn report_status(&self) {
        self.events.emit(&AppEvent::Status(self.status()));
    }
}
