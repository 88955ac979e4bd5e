/// Attack/release smoothing factors, shared by every band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingCoefficients {
    pub attack: f32,
    pub release: f32,
}

impl SmoothingCoefficients {
    pub fn new(attack_ms: f32, release_ms: f32, analysis_rate_hz: f32) -> Self {
        Self {
            attack: coefficient(attack_ms, analysis_rate_hz),
            release: coefficient(release_ms, analysis_rate_hz),
        }
    }
}

/// `1 - exp(-1 / updates)` where `updates` is the time constant measured in
/// analysis passes. Anything shorter than one pass is treated as one pass.
pub fn coefficient(time_ms: f32, analysis_rate_hz: f32) -> f32 {
    let updates = time_ms / 1000.0 * analysis_rate_hz;
    let updates = if updates.is_finite() { updates.max(1.0) } else { 1.0 };
    (1.0 - (-1.0 / updates).exp()).clamp(0.0, 1.0)
}

// Below -120 dBFS counts as silence; stops the decay from stalling in denormals
const SILENCE_FLOOR: f32 = 1e-6;

/// Asymmetric one-pole follower, stepped once per analysis pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeFollower {
    value: f32,
}

impl EnvelopeFollower {
    pub fn new() -> Self {
        Self { value: 0.0 }
    }

    pub fn update(&mut self, energy: f32, coeffs: &SmoothingCoefficients) -> f32 {
        let energy = if energy.is_finite() {
            energy.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let coeff = if energy > self.value {
            coeffs.attack
        } else {
            coeffs.release
        };
        self.value += coeff * (energy - self.value);

        if energy < SILENCE_FLOOR && self.value < SILENCE_FLOOR {
            self.value = 0.0;
        }
        self.value = self.value.clamp(0.0, 1.0);

        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficient_from_time() {
        // 100 ms at 60 Hz = 6 passes
        let c = coefficient(100.0, 60.0);
        assert!((c - (1.0 - (-1.0f32 / 6.0).exp())).abs() < 1e-6);
    }

    #[test]
    fn test_coefficient_bounds() {
        let fastest = 1.0 - (-1.0f32).exp();
        assert!((coefficient(0.0, 60.0) - fastest).abs() < 1e-6);
        assert!((coefficient(-50.0, 60.0) - fastest).abs() < 1e-6);
        assert!((coefficient(f32::NAN, 60.0) - fastest).abs() < 1e-6);

        let slow = coefficient(5000.0, 60.0);
        assert!(slow > 0.0 && slow < 0.01);
    }

    #[test]
    fn test_coefficient_shrinks_as_rate_rises() {
        // same time constant spread over twice as many passes
        let at_60 = coefficient(250.0, 60.0);
        let at_120 = coefficient(250.0, 120.0);
        assert!(at_120 < at_60);
        assert!((at_120 - (1.0 - (-1.0f32 / 30.0).exp())).abs() < 1e-6);
        assert!((at_60 - (1.0 - (-1.0f32 / 15.0).exp())).abs() < 1e-6);
    }

    #[test]
    fn test_attack_is_monotonic_without_overshoot() {
        let coeffs = SmoothingCoefficients::new(50.0, 500.0, 60.0);
        let mut env = EnvelopeFollower::new();
        let mut last = 0.0;

        for _ in 0..200 {
            let v = env.update(1.0, &coeffs);
            assert!(v >= last);
            assert!(v <= 1.0);
            last = v;
        }
        assert!(last > 0.99);
    }

    #[test]
    fn test_release_is_monotonic_and_reaches_zero() {
        let coeffs = SmoothingCoefficients::new(1.0, 200.0, 60.0);
        let mut env = EnvelopeFollower::new();
        env.update(1.0, &coeffs);
        env.update(1.0, &coeffs);
        let mut last = env.value();

        for _ in 0..1000 {
            let v = env.update(0.0, &coeffs);
            assert!(v <= last);
            assert!(v >= 0.0);
            last = v;
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn test_attack_faster_than_release() {
        let coeffs = SmoothingCoefficients::new(10.0, 1000.0, 60.0);
        let mut rising = EnvelopeFollower::new();
        rising.update(1.0, &coeffs);

        let mut falling = EnvelopeFollower { value: 1.0 };
        falling.update(0.0, &coeffs);

        assert!(rising.value() > 1.0 - falling.value());
    }

    #[test]
    fn test_bad_energy_is_silence() {
        let coeffs = SmoothingCoefficients::new(10.0, 10.0, 60.0);
        let mut env = EnvelopeFollower::new();
        assert_eq!(env.update(f32::NAN, &coeffs), 0.0);
        assert_eq!(env.update(-3.0, &coeffs), 0.0);
        assert!(env.update(7.0, &coeffs) <= 1.0);
    }
}
