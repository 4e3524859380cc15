//! Status-class encoder: a gauge built from up/down counter deltas.
//!
//! The metrics backend only offers sums, yet operators want to read
//! "which class is currently active" the way they would read a gauge.
//! The encoder keeps the last active bucket and turns every observation
//! into one signed delta per bucket, so that the running sum of a bucket
//! is 1 while it is active and 0 otherwise.
//!
//! Unchanged buckets still get a `0` delta: the series stays populated
//! with fresh labels on every execution instead of looking like missing
//! data.

/// HTTP status-class bucket names, indexed by [`http_status_class`].
pub const HTTP_STATUS_CLASSES: [&str; 5] = ["1xx", "2xx", "3xx", "4xx", "5xx"];

/// Bucket index for an HTTP status code, or `None` outside 100–599.
pub fn http_status_class(code: u16) -> Option<usize> {
    match code {
        100..=599 => Some(usize::from(code / 100) - 1),
        _ => None,
    }
}

/// Tracks which of `N` mutually exclusive buckets is active.
///
/// Starts with no active bucket, so the first observation always emits a
/// single `+1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusClassEncoder<const N: usize> {
    previous: [bool; N],
}

impl<const N: usize> StatusClassEncoder<N> {
    pub const fn new() -> Self {
        Self {
            previous: [false; N],
        }
    }

    /// The bucket asserted by the last observation.
    pub fn active(&self) -> Option<usize> {
        self.previous.iter().position(|active| *active)
    }

    /// Record that `active` is now the active bucket and return the delta
    /// for every bucket.
    ///
    /// `None` (or an index `>= N`) deactivates every bucket: the previously
    /// active one gets `-1` and nothing gets `+1`.
    pub fn observe(&mut self, active: Option<usize>) -> [i64; N] {
        let mut deltas = [0i64; N];
        for (i, (was_active, delta)) in self.previous.iter_mut().zip(deltas.iter_mut()).enumerate()
        {
            let is_active = active == Some(i);
            *delta = match (*was_active, is_active) {
                (true, false) => -1,
                (false, true) => 1,
                _ => 0,
            };
            *was_active = is_active;
        }
        deltas
    }
}

impl<const N: usize> Default for StatusClassEncoder<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type HttpEncoder = StatusClassEncoder<{ HTTP_STATUS_CLASSES.len() }>;

    fn observe_code(encoder: &mut HttpEncoder, code: u16) -> [i64; 5] {
        encoder.observe(http_status_class(code))
    }

    #[test]
    fn status_class_mapping() {
        assert_eq!(http_status_class(100), Some(0));
        assert_eq!(http_status_class(200), Some(1));
        assert_eq!(http_status_class(204), Some(1));
        assert_eq!(http_status_class(301), Some(2));
        assert_eq!(http_status_class(401), Some(3));
        assert_eq!(http_status_class(599), Some(4));
        assert_eq!(http_status_class(0), None);
        assert_eq!(http_status_class(99), None);
        assert_eq!(http_status_class(600), None);
        assert_eq!(http_status_class(999), None);
    }

    #[test]
    fn first_observation_emits_single_increment() {
        for code in [100, 200, 302, 404, 503] {
            let mut encoder = HttpEncoder::new();
            let deltas = observe_code(&mut encoder, code);
            assert_eq!(deltas.iter().filter(|d| **d == 1).count(), 1, "code {code}");
            assert_eq!(deltas.iter().filter(|d| **d == 0).count(), 4, "code {code}");
            assert_eq!(deltas[http_status_class(code).unwrap()], 1);
        }
    }

    #[test]
    fn repeated_class_emits_zeros() {
        let mut encoder = HttpEncoder::new();
        observe_code(&mut encoder, 200);
        assert_eq!(observe_code(&mut encoder, 200), [0; 5]);
        assert_eq!(observe_code(&mut encoder, 201), [0; 5]);
        assert_eq!(encoder.active(), Some(1));
    }

    #[test]
    fn class_change_moves_the_one() {
        let mut encoder = HttpEncoder::new();
        observe_code(&mut encoder, 200);
        assert_eq!(observe_code(&mut encoder, 503), [0, -1, 0, 0, 1]);
        assert_eq!(observe_code(&mut encoder, 404), [0, 0, 0, 1, -1]);
        assert_eq!(encoder.active(), Some(3));
    }

    #[test]
    fn unclassified_deactivates_everything() {
        let mut encoder = HttpEncoder::new();
        assert_eq!(encoder.observe(None), [0; 5]);
        observe_code(&mut encoder, 200);
        assert_eq!(observe_code(&mut encoder, 799), [0, -1, 0, 0, 0]);
        assert_eq!(encoder.active(), None);
        // Recovering re-asserts the class with a single +1.
        assert_eq!(observe_code(&mut encoder, 200), [0, 1, 0, 0, 0]);
    }

    #[test]
    fn out_of_range_index_is_unclassified() {
        let mut encoder = HttpEncoder::new();
        encoder.observe(Some(2));
        assert_eq!(encoder.observe(Some(17)), [0, 0, -1, 0, 0]);
    }

    #[test]
    fn running_sum_reconstructs_a_gauge() {
        // Deterministic pseudo-random walk over status codes.
        let codes = [100, 200, 301, 404, 500, 700];
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut encoder = HttpEncoder::new();
        let mut sums = [0i64; 5];

        for _ in 0..1_000 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let code = codes[(state % codes.len() as u64) as usize];

            let deltas = observe_code(&mut encoder, code);
            for (sum, delta) in sums.iter_mut().zip(deltas) {
                *sum += delta;
            }

            for (bucket, sum) in sums.iter().enumerate() {
                let expected = i64::from(http_status_class(code) == Some(bucket));
                assert_eq!(*sum, expected, "bucket {bucket} after code {code}");
            }
        }
    }
}
