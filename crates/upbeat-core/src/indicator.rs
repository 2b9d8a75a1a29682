//! Binary status output (an LED).
//!
//! The supervisor decides *when* the indicator is on; backends only know
//! how to switch it. Switching is best effort: a broken LED must never
//! take the probe loop down with it.

use std::path::PathBuf;

use tracing::{trace, warn};

pub trait Indicator {
    fn set(&mut self, on: bool);
    fn is_on(&self) -> bool;
}

/// An indicator with no physical output. State changes go to `trace`.
#[derive(Debug, Default)]
pub struct LogIndicator {
    on: bool,
}

impl Indicator for LogIndicator {
    fn set(&mut self, on: bool) {
        if self.on != on {
            trace!(on, "indicator");
        }
        self.on = on;
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

/// A Linux LED class device, e.g. `/sys/class/leds/led0`.
#[derive(Debug)]
pub struct SysfsLed {
    brightness: PathBuf,
    on: Option<bool>,
    warned: bool,
}

impl SysfsLed {
    /// LED by name under `/sys/class/leds`.
    pub fn named(name: &str) -> Self {
        Self::at(PathBuf::from("/sys/class/leds").join(name))
    }

    /// LED class directory at an explicit path.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            brightness: dir.into().join("brightness"),
            on: None,
            warned: false,
        }
    }
}

impl Indicator for SysfsLed {
    fn set(&mut self, on: bool) {
        if self.on == Some(on) {
            return;
        }
        match std::fs::write(&self.brightness, if on { "1" } else { "0" }) {
            Ok(()) => {
                self.on = Some(on);
                self.warned = false;
            }
            Err(e) => {
                // Once per outage, not once per blink.
                if !self.warned {
                    warn!(path = %self.brightness.display(), error = %e, "cannot switch LED");
                    self.warned = true;
                }
            }
        }
    }

    fn is_on(&self) -> bool {
        self.on.unwrap_or(false)
    }
}
