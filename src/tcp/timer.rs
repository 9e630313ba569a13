/// Countdown timer driving retransmission.
///
/// Time never advances on its own; the owner injects elapsed milliseconds
/// through `tick`. Elapsed time accumulates only while the timer is started.
#[derive(Debug)]
pub struct RetransmissionTimer {
    timeout: u64,
    elapsed: u64,
    started: bool,
}

impl RetransmissionTimer {
    pub fn new(timeout: u64) -> Self {
        RetransmissionTimer {
            timeout,
            elapsed: 0,
            started: false,
        }
    }

    pub fn tick(&mut self, ms: u64) {
        if self.started {
            self.elapsed += ms;
        }
    }

    pub fn start(&mut self) {
        self.started = true;
    }

    pub fn stop(&mut self) {
        self.started = false;
    }

    /// Zero the elapsed time without touching the started flag.
    pub fn reset(&mut self) {
        self.elapsed = 0;
    }

    pub fn set_timeout(&mut self, timeout: u64) {
        self.timeout = timeout;
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn expired(&self) -> bool {
        self.started && self.elapsed >= self.timeout
    }
}

// -- Unit tests --
