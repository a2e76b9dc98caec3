//! Fixed-rate control loop.
//!
//! ```text
//! poll input → sample (deadzone, edges) → session.tick (update, dispatch,
//! invalidate) → render → sleep for the rest of the period
//! ```
//!
//! The loop ends when the input source reports quit or when the shared
//! running flag is cleared (Ctrl-C).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::display::StatusDisplay;
use crate::input::{InputSource, Sampler};
use crate::session::{Session, SessionError};
use dexjoy_common::config::ControlConfig;
use dexjoy_link::Transport;

/// Ticks between periodic statistics lines.
const STATS_INTERVAL: u64 = 100;

/// Control loop timing statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Ticks executed.
    pub ticks: u64,
    /// Commands acknowledged by the arm.
    pub commands: u64,
    /// Ticks that took longer than the period.
    pub overruns: u64,
    /// Longest tick.
    pub max_tick: Duration,
    /// Sum of tick durations.
    pub busy: Duration,
}

impl LoopStats {
    /// Record one tick.
    pub fn record(&mut self, elapsed: Duration, sent: usize, period: Duration) {
        self.ticks += 1;
        self.commands += sent as u64;
        self.busy += elapsed;
        if elapsed > self.max_tick {
            self.max_tick = elapsed;
        }
        if elapsed > period {
            self.overruns += 1;
        }
    }

    /// Average tick duration.
    pub fn avg_tick(&self) -> Duration {
        if self.ticks == 0 {
            return Duration::ZERO;
        }
        let nanos = self.busy.as_nanos() / u128::from(self.ticks);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Joystick-to-arm driver loop.
pub struct ControlLoop<I: InputSource, D: StatusDisplay> {
    input: I,
    display: D,
    sampler: Sampler,
    period: Duration,
    running: Arc<AtomicBool>,
    stats: LoopStats,
}

impl<I: InputSource, D: StatusDisplay> ControlLoop<I, D> {
    /// Build a loop from the control configuration.
    pub fn new(input: I, display: D, config: &ControlConfig) -> Result<Self, SessionError> {
        let mapping = config.resolved_mapping()?;
        Ok(Self {
            input,
            display,
            sampler: Sampler::new(mapping, config.deadzone),
            period: config.period(),
            running: Arc::new(AtomicBool::new(true)),
            stats: LoopStats::default(),
        })
    }

    /// Flag cleared by signal handlers to stop the loop.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Statistics so far.
    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Display sink.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// Run until quit.
    ///
    /// A protocol failure (only possible with bounded retries/wait) or an
    /// input failure ends the loop with an error.
    pub fn run<T: Transport>(&mut self, session: &mut Session<T>) -> Result<LoopStats, SessionError> {
        info!(
            "Control loop started: input '{}', period {:?}",
            self.input.name(),
            self.period
        );
        let mut device: Option<String> = None;

        while self.running.load(Ordering::SeqCst) {
            let tick_start = Instant::now();

            let snapshot = self.input.poll()?;
            if snapshot.quit {
                info!("Quit requested by input");
                break;
            }
            if snapshot.device != device {
                match &snapshot.device {
                    Some(name) => info!("Input device: {}", name),
                    None => warn!("Input device lost, holding position"),
                }
                device = snapshot.device.clone();
            }

            let intent = self.sampler.sample(&snapshot);
            let report = session.tick(intent)?;
            self.display.render(&snapshot, &intent, &report.snapshot);

            let elapsed = tick_start.elapsed();
            self.stats.record(elapsed, report.sent, self.period);
            if elapsed > self.period {
                debug!(
                    "Tick #{} overran: {:?} (period {:?})",
                    self.stats.ticks, elapsed, self.period
                );
            } else {
                std::thread::sleep(self.period - elapsed);
            }

            if self.stats.ticks % STATS_INTERVAL == 0 {
                debug!(
                    "Control loop: {} ticks, {} commands, avg={:?}, max={:?}, overruns={}",
                    self.stats.ticks,
                    self.stats.commands,
                    self.stats.avg_tick(),
                    self.stats.max_tick,
                    self.stats.overruns
                );
            }
        }

        info!(
            "Control loop stopped after {} ticks ({} commands, {} overruns)",
            self.stats.ticks, self.stats.commands, self.stats.overruns
        );
        Ok(self.stats)
    }

    /// Open the session on `port`, run until quit, then close.
    ///
    /// The session is closed on every path, including a failed
    /// initialization sequence.
    pub fn drive<T: Transport>(
        &mut self,
        session: &mut Session<T>,
        port: &str,
    ) -> Result<LoopStats, SessionError> {
        let result = session.open(port).and_then(|()| self.run(session));
        session.close();
        result
    }
}
