//! Per-channel evaluator loop.
//!
//! Each channel gets its own thread that, every [`EVALUATOR_PERIOD_MS`],
//! reads the clock, lets the channel recompute and commit its output, and
//! stamps a heartbeat. The loop never exits on its own: the only way out
//! is a hardware write failure, which is fatal for the whole device.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{error, info};

use super::Channel;
use crate::app::ports::Clock;
use crate::drivers::task_pin::{spawn_on_core, Core};
use crate::error::HardwareError;
use crate::safety::Heartbeat;

/// Tick period. Evaluators observe a new deadline at most this late.
pub const EVALUATOR_PERIOD_MS: u64 = 10;

const EVALUATOR_PRIORITY: u8 = 5;
const EVALUATOR_STACK_KB: usize = 4;

/// Drives one channel's output from its deadline.
pub struct Evaluator {
    channel: Arc<dyn Channel>,
    clock: Arc<dyn Clock>,
    heartbeat: Arc<Heartbeat>,
}

impl Evaluator {
    pub fn new(channel: Arc<dyn Channel>, clock: Arc<dyn Clock>) -> Self {
        let heartbeat = Arc::new(Heartbeat::new(channel.name(), clock.now_ms()));
        Self {
            channel,
            clock,
            heartbeat,
        }
    }

    /// Shared handle for the supervisor.
    pub fn heartbeat(&self) -> Arc<Heartbeat> {
        Arc::clone(&self.heartbeat)
    }

    /// One evaluation at the clock's current time.
    pub fn step(&self) -> Result<bool, HardwareError> {
        let now = self.clock.now_ms();
        let wrote = self.channel.tick(now)?;
        self.heartbeat.beat(now);
        Ok(wrote)
    }

    /// Drive the output low, then tick forever. Returns only on failure.
    pub fn run(&self) -> HardwareError {
        if let Err(e) = self.channel.force_off() {
            return e;
        }
        info!("{}: evaluator running ({} ms period)", self.channel.name(), EVALUATOR_PERIOD_MS);
        loop {
            if let Err(e) = self.step() {
                return e;
            }
            std::thread::sleep(Duration::from_millis(EVALUATOR_PERIOD_MS));
        }
    }
}

/// Start `evaluator` on the application core.
///
/// `task_name` must be NUL-terminated (e.g. `"eval-relay\0"`). A hardware
/// failure inside the loop aborts the process.
pub fn spawn(evaluator: Evaluator, task_name: &'static str) -> std::io::Result<JoinHandle<()>> {
    spawn_on_core(
        Core::App,
        EVALUATOR_PRIORITY,
        EVALUATOR_STACK_KB,
        task_name,
        move || {
            let err = evaluator.run();
            error!("{}: {} - aborting", evaluator.channel.name(), err);
            std::process::abort();
        },
    )
}
