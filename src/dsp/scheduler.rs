use crate::config::DEFAULT_ANALYSIS_RATE_HZ;

/// Decides when enough new samples have arrived to run an analysis pass.
///
/// The interval is `floor(sample_rate / target_rate)` samples, so the pass
/// rate follows the target regardless of sample rate or transform size.
/// Until the first pass has happened, a full window also fires. After a
/// [`reset`](Self::reset) only a full window fires, so the first pass never
/// sees the silence the window was refilled with.
#[derive(Debug, Clone)]
pub struct AnalysisScheduler {
    target_rate_hz: f32,
    interval: usize,
    window_len: usize,
    primed: bool,
    refilling: bool,
}

impl AnalysisScheduler {
    pub fn new(target_rate_hz: f32, sample_rate: f32, window_len: usize) -> Self {
        let mut scheduler = Self {
            target_rate_hz: DEFAULT_ANALYSIS_RATE_HZ,
            interval: window_len,
            window_len,
            primed: false,
            refilling: false,
        };
        scheduler.set_target_rate(target_rate_hz);
        scheduler.configure(sample_rate, window_len);
        scheduler
    }

    pub fn set_target_rate(&mut self, target_rate_hz: f32) {
        if target_rate_hz.is_finite() && target_rate_hz > 0.0 {
            self.target_rate_hz = target_rate_hz;
        }
    }

    pub fn configure(&mut self, sample_rate: f32, window_len: usize) {
        self.window_len = window_len.max(1);
        let interval = (sample_rate / self.target_rate_hz).floor();
        self.interval = if interval.is_finite() && interval >= 1.0 {
            interval as usize
        } else {
            // A stalled scheduler would freeze every envelope
            self.window_len
        };
    }

    pub fn should_fire(&self, pending: usize) -> bool {
        if self.refilling {
            return pending >= self.window_len;
        }
        pending >= self.interval || (!self.primed && pending >= self.window_len)
    }

    pub fn fired(&mut self) {
        self.primed = true;
        self.refilling = false;
    }

    /// The window was discarded: hold off until it is full of new samples.
    pub fn reset(&mut self) {
        self.primed = false;
        self.refilling = true;
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn target_rate_hz(&self) -> f32 {
        self.target_rate_hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Feeds `total` samples in blocks of `block`, returning the sample
    /// index of each pass.
    fn simulate(scheduler: &mut AnalysisScheduler, total: usize, block: usize) -> Vec<usize> {
        let mut passes = Vec::new();
        let mut pending = 0;
        let mut fed = 0;
        while fed < total {
            let n = block.min(total - fed);
            for _ in 0..n {
                pending += 1;
                fed += 1;
                if scheduler.should_fire(pending) {
                    scheduler.fired();
                    pending = 0;
                    passes.push(fed);
                }
            }
        }
        passes
    }

    #[test]
    fn test_interval_from_rates() {
        let scheduler = AnalysisScheduler::new(60.0, 48000.0, 1024);
        assert_eq!(scheduler.interval(), 800);

        let scheduler = AnalysisScheduler::new(60.0, 44100.0, 1024);
        assert_eq!(scheduler.interval(), 735);
    }

    #[test]
    fn test_first_pass_at_full_window_when_interval_longer() {
        let mut scheduler = AnalysisScheduler::new(60.0, 48000.0, 512);
        let passes = simulate(&mut scheduler, 2200, 64);
        assert_eq!(passes, vec![512, 1312, 2112]);
    }

    #[test]
    fn test_pathological_sample_rate_falls_back_to_window() {
        let mut scheduler = AnalysisScheduler::new(60.0, 0.0, 256);
        assert_eq!(scheduler.interval(), 256);

        scheduler.configure(f32::NAN, 256);
        assert_eq!(scheduler.interval(), 256);

        scheduler.configure(30.0, 256);
        assert_eq!(scheduler.interval(), 256);
    }

    #[test]
    fn test_invalid_target_rate_ignored() {
        let mut scheduler = AnalysisScheduler::new(60.0, 48000.0, 1024);
        scheduler.set_target_rate(0.0);
        scheduler.set_target_rate(f32::NAN);
        assert_eq!(scheduler.target_rate_hz(), 60.0);
    }

    #[test]
    fn test_reset_primes_again() {
        let mut scheduler = AnalysisScheduler::new(10.0, 48000.0, 256);
        assert!(scheduler.should_fire(256));
        scheduler.fired();
        assert!(!scheduler.should_fire(256));
        scheduler.reset();
        assert!(scheduler.should_fire(256));
    }

    #[test]
    fn test_reset_waits_for_full_window() {
        let mut scheduler = AnalysisScheduler::new(60.0, 48000.0, 2048);
        assert_eq!(scheduler.interval(), 800);
        assert!(scheduler.should_fire(800));
        scheduler.fired();

        scheduler.reset();
        assert!(!scheduler.should_fire(800));
        assert!(!scheduler.should_fire(2047));
        assert!(scheduler.should_fire(2048));

        // back on the interval once the refilled window has been analysed
        scheduler.fired();
        assert!(scheduler.should_fire(800));
    }

    proptest! {
        #[test]
        fn prop_pass_rate_tracks_target(
            sample_rate in 8000u32..=192000,
            block in 1usize..=4096,
            size_index in 0usize..4,
        ) {
            let window = 256usize << size_index;
            let target = 60.0;
            let mut scheduler = AnalysisScheduler::new(target, sample_rate as f32, window);

            let passes = simulate(&mut scheduler, sample_rate as usize, block);

            prop_assert!(!passes.is_empty());
            prop_assert!(passes[0] <= window);
            let count = passes.len() as f32;
            prop_assert!((count - target).abs() <= 1.0, "{} passes for target {}", count, target);
        }
    }
}
