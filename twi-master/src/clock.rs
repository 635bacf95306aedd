//! Millisecond time source for the hardware wait timeouts.

/// A free-running millisecond counter, such as the Arduino `millis()`.
///
/// The counter may wrap; elapsed time is always computed with wrapping
/// subtraction.
pub trait Millis {
    /// Current value of the counter.
    fn millis(&mut self) -> u32;
}

impl<F: FnMut() -> u32> Millis for F {
    fn millis(&mut self) -> u32 {
        self()
    }
}

/// Deadline for one hardware wait.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    start: u32,
    limit: u32,
}

impl Deadline {
    pub(crate) fn start(clock: &mut impl Millis, limit: u32) -> Self {
        Self {
            start: clock.millis(),
            limit,
        }
    }

    /// True once strictly more than `limit` milliseconds have passed.
    pub(crate) fn expired(&self, clock: &mut impl Millis) -> bool {
        clock.millis().wrapping_sub(self.start) > self.limit
    }
}
