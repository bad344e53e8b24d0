//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Delay to wait after failed attempt number `attempt` (1-based).
///
/// Doubles from `base` per attempt, capped at `max`, plus up to 10% jitter.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u32.saturating_pow(attempt - 1);
    let capped = base.saturating_mul(factor).min(max);

    let jitter_range = capped.as_millis() as u64 / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    capped + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(1000);

        let first = backoff_delay(1, base, max);
        assert!(first >= base && first < Duration::from_millis(110));

        let second = backoff_delay(2, base, max);
        assert!(second >= Duration::from_millis(200));

        let capped = backoff_delay(10, base, max);
        assert!(capped >= max && capped < Duration::from_millis(1100));
    }

    #[test]
    fn test_zero_attempt_has_no_delay() {
        assert_eq!(
            backoff_delay(0, Duration::from_millis(100), Duration::from_secs(1)),
            Duration::ZERO
        );
    }
}
