//! Pacing model for simulated input and the gaps between actions.
//!
//! Keystroke cadence drifts inside a narrow band instead of being either
//! constant or unbounded. The band is expressed as seconds per character.

use std::time::Duration;

use rand::Rng;
use rand::rngs::StdRng;

/// Default per-character delay band (≈25–33 chars/s).
pub const TYPING_BAND: (f64, f64) = (0.030, 0.040);

/// Largest single drift step applied to the current rate.
const DRIFT_STEP: f64 = 0.002;

/// Words per minute used for reading pauses.
const READING_WPM: f64 = 350.0;

/// Bounds on a reading pause before jitter, in seconds.
const READING_BOUNDS: (f64, f64) = (0.2, 1.0);

/// What the next delay is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayContext {
    Idle,
    Space,
    Punctuation,
    LineBreak,
    Reading { words: usize },
}

impl DelayContext {
    /// Classify a typed character.
    pub fn for_char(c: char) -> Self {
        match c {
            ' ' => Self::Space,
            '.' | ',' | '!' | '?' => Self::Punctuation,
            '\n' => Self::LineBreak,
            _ => Self::Idle,
        }
    }
}

/// Human-plausible delay generator.
pub struct TimingModel {
    rng: StdRng,
    band: (f64, f64),
    current: f64,
    /// Invocations left before the next drift step.
    until_drift: u32,
}

impl TimingModel {
    pub fn new(rng: StdRng) -> Self {
        Self::with_band(rng, TYPING_BAND)
    }

    pub fn with_band(mut rng: StdRng, band: (f64, f64)) -> Self {
        let (lo, hi) = if band.0 <= band.1 { band } else { (band.1, band.0) };
        let current = rng.gen_range(lo..=hi);
        let until_drift = rng.gen_range(5..=10);
        Self {
            rng,
            band: (lo, hi),
            current,
            until_drift,
        }
    }

    /// Current per-character base rate, in seconds.
    pub fn current_rate(&self) -> f64 {
        self.current
    }

    /// Re-draw the base rate for a new piece of text.
    pub fn begin_text(&mut self) {
        self.current = self.rng.gen_range(self.band.0..=self.band.1);
        self.until_drift = self.rng.gen_range(5..=10);
    }

    /// Next delay for the given context.
    pub fn next_delay(&mut self, context: DelayContext) -> Duration {
        let secs = match context {
            DelayContext::Reading { words } => self.reading_secs(words),
            DelayContext::Space => self.tick() + self.rng.gen_range(0.03..0.06),
            DelayContext::Punctuation => self.tick() + self.rng.gen_range(0.05..0.12),
            DelayContext::LineBreak => self.tick() + self.rng.gen_range(0.10..0.18),
            DelayContext::Idle => self.tick() + self.rng.gen_range(-0.005..0.005),
        };
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// One delay per character of `text`, for the driver to pace input with.
    pub fn keystroke_plan(&mut self, text: &str) -> Vec<Duration> {
        self.begin_text();
        text.chars()
            .map(|c| self.next_delay(DelayContext::for_char(c)))
            .collect()
    }

    /// Pause proportional to the word count of `text`.
    pub fn reading(&mut self, text: &str) -> Duration {
        let words = text.split_whitespace().count();
        self.next_delay(DelayContext::Reading { words })
    }

    /// Pause between the primary and secondary action on one item.
    pub fn action_pause(&mut self) -> Duration {
        Duration::from_secs_f64(self.rng.gen_range(1.0..=3.0))
    }

    /// Cool-down after an item whose primary action succeeded.
    pub fn item_cooldown(&mut self) -> Duration {
        Duration::from_secs_f64(self.rng.gen_range(10.0..=18.0))
    }

    /// Jittered gap between poll cycles.
    pub fn poll_interval(&mut self, base: Duration) -> Duration {
        base.mul_f64(self.rng.gen_range(0.8..=1.1))
    }

    fn reading_secs(&mut self, words: usize) -> f64 {
        let base = (words as f64 / READING_WPM * 60.0).clamp(READING_BOUNDS.0, READING_BOUNDS.1);
        base * self.rng.gen_range(0.8..=1.2)
    }

    /// Advance the drift counter and return the current base rate.
    fn tick(&mut self) -> f64 {
        self.until_drift = self.until_drift.saturating_sub(1);
        if self.until_drift == 0 {
            let step = self.rng.gen_range(-DRIFT_STEP..=DRIFT_STEP);
            self.current = (self.current + step).clamp(self.band.0, self.band.1);
            self.until_drift = self.rng.gen_range(5..=10);
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn model(seed: u64) -> TimingModel {
        TimingModel::new(StdRng::seed_from_u64(seed))
    }

    #[test]
    fn rate_stays_within_band() {
        let mut timing = model(7);
        for _ in 0..5_000 {
            timing.next_delay(DelayContext::Idle);
            let rate = timing.current_rate();
            assert!((TYPING_BAND.0..=TYPING_BAND.1).contains(&rate), "rate {rate}");
        }
    }

    #[test]
    fn rate_drifts_over_time() {
        let mut timing = model(11);
        let start = timing.current_rate();
        let drifted = (0..200).any(|_| {
            timing.next_delay(DelayContext::Idle);
            (timing.current_rate() - start).abs() > f64::EPSILON
        });
        assert!(drifted);
    }

    #[test]
    fn context_offsets_are_ordered() {
        let mut timing = model(3);
        let hi = TYPING_BAND.1;
        for _ in 0..200 {
            let idle = timing.next_delay(DelayContext::Idle).as_secs_f64();
            assert!(idle <= hi + 0.005 + 1e-9);

            let space = timing.next_delay(DelayContext::Space).as_secs_f64();
            assert!(space >= TYPING_BAND.0 + 0.03 - 1e-9);

            let newline = timing.next_delay(DelayContext::LineBreak).as_secs_f64();
            assert!(newline >= TYPING_BAND.0 + 0.10 - 1e-9);
        }
    }

    #[test]
    fn reading_is_bounded() {
        let mut timing = model(5);
        let short = timing.next_delay(DelayContext::Reading { words: 0 }).as_secs_f64();
        assert!((0.16..=0.24).contains(&short), "short {short}");

        let long = timing
            .next_delay(DelayContext::Reading { words: 10_000 })
            .as_secs_f64();
        assert!((0.8..=1.2).contains(&long), "long {long}");
    }

    #[test]
    fn keystroke_plan_has_one_delay_per_char() {
        let mut timing = model(9);
        let plan = timing.keystroke_plan("hi, 안녕!\nok");
        assert_eq!(plan.len(), "hi, 안녕!\nok".chars().count());
        assert!(plan.iter().all(|d| *d > Duration::ZERO));
    }

    #[test]
    fn char_classification() {
        assert_eq!(DelayContext::for_char(' '), DelayContext::Space);
        assert_eq!(DelayContext::for_char('?'), DelayContext::Punctuation);
        assert_eq!(DelayContext::for_char('\n'), DelayContext::LineBreak);
        assert_eq!(DelayContext::for_char('a'), DelayContext::Idle);
    }

    #[test]
    fn pacing_helpers_stay_in_range() {
        let mut timing = model(1);
        for _ in 0..100 {
            let pause = timing.action_pause().as_secs_f64();
            assert!((1.0..=3.0).contains(&pause));
            let cooldown = timing.item_cooldown().as_secs_f64();
            assert!((10.0..=18.0).contains(&cooldown));
            let poll = timing.poll_interval(Duration::from_secs(2)).as_secs_f64();
            assert!((1.6 - 1e-6..=2.2 + 1e-6).contains(&poll));
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = model(42);
        let mut b = model(42);
        for _ in 0..50 {
            assert_eq!(
                a.next_delay(DelayContext::Space),
                b.next_delay(DelayContext::Space)
            );
        }
    }
}
