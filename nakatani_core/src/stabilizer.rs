//! Sliding-window stability test for resistance samples.
//!
//! Readings are noisy while the pen settles on the skin. A point is
//! considered stable once the last `window` samples all sit below the
//! open-circuit ceiling and within a bounded spread of each other.

use std::collections::VecDeque;

use crate::config::StabilizerCfg;

/// Owns the window of recent samples for the point being measured.
#[derive(Debug, Clone)]
pub struct SampleStabilizer {
    cfg: StabilizerCfg,
    window: VecDeque<u32>,
}

impl SampleStabilizer {
    pub fn new(cfg: StabilizerCfg) -> Self {
        let capacity = cfg.window.max(1);
        Self {
            cfg: StabilizerCfg {
                window: capacity,
                ..cfg
            },
            window: VecDeque::with_capacity(capacity),
        }
    }

    pub fn cfg(&self) -> &StabilizerCfg {
        &self.cfg
    }

    /// Append a sample, evicting the oldest on overflow, then run the test.
    ///
    /// Returns the stabilized value and clears the window when the test fires.
    pub fn push(&mut self, sample: u32) -> Option<u32> {
        if self.window.len() == self.cfg.window {
            self.window.pop_front();
        }
        self.window.push_back(sample);

        let value = evaluate(self.window.make_contiguous(), &self.cfg)?;
        tracing::trace!(value, "window stabilized");
        self.window.clear();
        Some(value)
    }

    /// Drop every buffered sample (pen lifted or session restarted).
    pub fn clear(&mut self) {
        self.window.clear();
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.window.len() == self.cfg.window
    }

    /// Snapshot of the window, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = u32> + '_ {
        self.window.iter().copied()
    }
}

/// Pure stability test over a snapshot of the window.
///
/// Fires only on a full window whose maximum is below the ceiling and whose
/// spread is below the limit; yields the truncating mean of the window.
pub fn evaluate(window: &[u32], cfg: &StabilizerCfg) -> Option<u32> {
    if cfg.window == 0 || window.len() != cfg.window {
        return None;
    }
    let max = window.iter().copied().max()?;
    let min = window.iter().copied().min()?;
    if max >= cfg.ceiling_ohms || max - min >= cfg.max_spread_ohms {
        return None;
    }
    // Mean of u32 values always fits back into u32.
    let sum: u64 = window.iter().map(|&v| u64::from(v)).sum();
    let mean = sum / window.len() as u64;
    u32::try_from(mean).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> StabilizerCfg {
        StabilizerCfg::default()
    }

    #[test]
    fn nineteen_samples_never_fire() {
        let mut s = SampleStabilizer::new(cfg());
        for _ in 0..19 {
            assert_eq!(s.push(1000), None);
        }
        assert_eq!(s.len(), 19);
        assert_eq!(s.push(1000), Some(1000));
        assert!(s.is_empty(), "window resets after firing");
    }

    #[test]
    fn mean_truncates() {
        let mut window = vec![1000u32; 19];
        window.push(1019);
        // 20_019 / 20 = 1000.95 -> 1000
        assert_eq!(evaluate(&window, &cfg()), Some(1000));
    }

    #[test]
    fn bounds_are_strict() {
        let mut at_ceiling = vec![85_000u32; 19];
        at_ceiling.push(90_000);
        assert_eq!(evaluate(&at_ceiling, &cfg()), None);

        let mut spread_at_limit = vec![10_000u32; 19];
        spread_at_limit.push(15_000);
        assert_eq!(evaluate(&spread_at_limit, &cfg()), None);

        let mut spread_below = vec![10_000u32; 19];
        spread_below.push(14_999);
        assert!(evaluate(&spread_below, &cfg()).is_some());
    }

    #[test]
    fn window_never_exceeds_capacity() {
        let mut s = SampleStabilizer::new(cfg());
        // Alternate wildly so the test never fires.
        for i in 0..100u32 {
            let v = if i % 2 == 0 { 1_000 } else { 60_000 };
            assert_eq!(s.push(v), None);
            assert!(s.len() <= 20);
        }
        assert!(s.is_full());
    }

    #[test]
    fn oldest_sample_is_evicted_first() {
        let mut s = SampleStabilizer::new(cfg());
        s.push(80_000);
        for _ in 0..19 {
            assert_eq!(s.push(1_000), None);
        }
        assert_eq!(s.samples().next(), Some(80_000));
        // 21st sample pushes the outlier out; the window is now uniform.
        assert_eq!(s.push(1_000), Some(1_000));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let s = SampleStabilizer::new(StabilizerCfg {
            window: 0,
            ..cfg()
        });
        assert_eq!(s.cfg().window, 1);
    }
}
