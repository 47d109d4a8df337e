//! Pause growth for the adaptive consumer loop.

use std::time::Duration;

/// Returns a growth function that multiplies the current pause by `factor`,
/// clamped to [1 s, `max_pause`]. The floor keeps a sub-second base pause
/// from collapsing the backoff to zero under sustained load.
pub fn increment_pause(
    factor: f64,
    max_pause: Duration,
) -> impl Fn(Duration) -> Duration + Send + Sync + 'static {
    move |current: Duration| {
        let base = Duration::from_secs(1);
        let grown = current.mul_f64(factor);
        if grown < base {
            base
        } else if grown > max_pause {
            max_pause
        } else {
            grown
        }
    }
}
