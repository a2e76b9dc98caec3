//! Raw joystick monitor.
//!
//! Polls an input source at the control rate and logs the unmapped axis
//! readings, button levels and device count every tick. The arm link is
//! never opened. Used to find the indices for a `controller = "custom"`
//! mapping.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

use crate::input::{InputError, InputSnapshot, InputSource};

/// One-line rendering of a raw snapshot.
///
/// ```text
/// [1 device] Xbox Wireless Controller | axes 0:+0.00 1:-1.00 ... | buttons 0:0 1:1 ...
/// ```
pub fn describe(snapshot: &InputSnapshot) -> String {
    let mut line = format!(
        "[{} device{}] {}",
        snapshot.device_count,
        if snapshot.device_count == 1 { "" } else { "s" },
        snapshot.device.as_deref().unwrap_or("Not detected")
    );
    line.push_str(" | axes");
    for (i, value) in snapshot.axes.iter().enumerate() {
        let _ = write!(line, " {i}:{value:+.2}");
    }
    line.push_str(" | buttons");
    for (i, pressed) in snapshot.buttons.iter().enumerate() {
        let _ = write!(line, " {i}:{}", u8::from(*pressed));
    }
    line
}

/// Input-only loop printing raw readings.
pub struct InputMonitor<I: InputSource> {
    input: I,
    period: Duration,
    running: Arc<AtomicBool>,
}

impl<I: InputSource> InputMonitor<I> {
    /// Create a monitor polling every `period`.
    pub fn new(input: I, period: Duration) -> Self {
        Self {
            input,
            period,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flag cleared by signal handlers to stop the monitor.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Poll until quit, returning the number of snapshots logged.
    pub fn run(&mut self) -> Result<u64, InputError> {
        info!(
            "Joystick monitor started: input '{}', period {:?}",
            self.input.name(),
            self.period
        );
        let mut ticks = 0;

        while self.running.load(Ordering::SeqCst) {
            let tick_start = Instant::now();
            let snapshot = self.input.poll()?;
            if snapshot.quit {
                break;
            }
            info!("{}", describe(&snapshot));
            ticks += 1;

            let elapsed = tick_start.elapsed();
            if elapsed < self.period {
                std::thread::sleep(self.period - elapsed);
            }
        }

        info!("Joystick monitor stopped after {} ticks", ticks);
        Ok(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::scripted::{Frame, ScriptedInput};

    #[test]
    fn describe_lists_every_index() {
        let mut snapshot = InputSnapshot {
            device: Some("Pad".to_string()),
            device_count: 1,
            ..InputSnapshot::default()
        };
        snapshot.axes[4] = -1.0;
        snapshot.buttons[3] = true;

        let line = describe(&snapshot);
        assert!(line.starts_with("[1 device] Pad"));
        assert!(line.contains(" 0:+0.00"));
        assert!(line.contains(" 4:-1.00"));
        assert!(line.contains("buttons 0:0 1:0 2:0 3:1"));
    }

    #[test]
    fn describe_disconnected() {
        let line = describe(&InputSnapshot::disconnected(0));
        assert!(line.starts_with("[0 devices] Not detected"));
    }

    #[test]
    fn runs_until_script_ends() {
        let input = ScriptedInput::new(vec![
            Frame::new(&[0.5], &[true]).times(3),
            Frame::unplugged().times(2),
        ])
        .unwrap();
        let mut monitor = InputMonitor::new(input, Duration::from_millis(1));
        assert_eq!(monitor.run().unwrap(), 5);
    }

    #[test]
    fn cleared_flag_stops_immediately() {
        let input = ScriptedInput::new(vec![Frame::new(&[], &[]).times(100)]).unwrap();
        let mut monitor = InputMonitor::new(input, Duration::from_millis(1));
        monitor.running_flag().store(false, Ordering::SeqCst);
        assert_eq!(monitor.run().unwrap(), 0);
    }
}
