//! Time-bounded ring of recent estimates.

use std::collections::VecDeque;

use super::estimator::PitchEstimate;

/// Recent estimates, evicted by capture-clock age rather than count
#[derive(Debug, Clone)]
pub struct EstimateHistory {
    retention_s: f64,
    entries: VecDeque<PitchEstimate>,
}

impl EstimateHistory {
    pub fn new(retention_s: f32) -> Self {
        Self {
            retention_s: retention_s.max(0.0) as f64,
            entries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn latest(&self) -> Option<&PitchEstimate> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PitchEstimate> {
        self.entries.iter()
    }

    /// Append an estimate and evict everything older than the retention span.
    ///
    /// A timestamp earlier than the newest entry means the capture clock
    /// restarted (new source), so the ring starts over.
    pub fn push(&mut self, estimate: PitchEstimate) {
        if let Some(newest) = self.entries.back() {
            if estimate.timestamp_s < newest.timestamp_s {
                self.entries.clear();
            }
        }
        self.entries.push_back(estimate);

        let horizon = estimate.timestamp_s - self.retention_s;
        while let Some(oldest) = self.entries.front() {
            if oldest.timestamp_s < horizon {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Entry at a normalised position, 0.0 = oldest and 1.0 = newest
    pub fn at_position(&self, position: f32) -> Option<PitchEstimate> {
        if self.entries.is_empty() {
            return None;
        }
        let position = if position.is_finite() {
            position.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let index = (position * (self.entries.len() - 1) as f32).round() as usize;
        self.entries.get(index).copied()
    }

    /// Capture-clock span covered by the ring (seconds)
    pub fn span_s(&self) -> f64 {
        match (self.entries.front(), self.entries.back()) {
            (Some(first), Some(last)) => last.timestamp_s - first.timestamp_s,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(timestamp_s: f64, frequency_hz: f32) -> PitchEstimate {
        PitchEstimate {
            frequency_hz,
            loudness_rms: 0.1,
            timestamp_s,
            confidence: 0.9,
            fallback: false,
        }
    }

    #[test]
    fn test_evicts_by_age() {
        let mut history = EstimateHistory::new(2.0);
        for i in 0..100 {
            history.push(estimate(i as f64 * 0.05, 200.0 + i as f32));
        }
        assert!(history.span_s() <= 2.0 + 1e-9);
        assert!(history.span_s() >= 1.9);
        assert_eq!(history.latest().map(|e| e.frequency_hz), Some(299.0));
        let oldest = history.iter().next().expect("oldest");
        assert!(oldest.timestamp_s >= 4.95 - 2.0 - 1e-9);
    }

    #[test]
    fn test_position_lookup() {
        let mut history = EstimateHistory::new(10.0);
        assert!(history.at_position(0.5).is_none());
        for i in 0..5 {
            history.push(estimate(i as f64, 100.0 * (i + 1) as f32));
        }
        assert_eq!(history.at_position(0.0).map(|e| e.frequency_hz), Some(100.0));
        assert_eq!(history.at_position(0.5).map(|e| e.frequency_hz), Some(300.0));
        assert_eq!(history.at_position(1.0).map(|e| e.frequency_hz), Some(500.0));
        assert_eq!(history.at_position(7.0).map(|e| e.frequency_hz), Some(500.0));
        assert_eq!(history.at_position(f32::NAN).map(|e| e.frequency_hz), Some(500.0));
    }

    #[test]
    fn test_clock_restart_clears_ring() {
        let mut history = EstimateHistory::new(2.0);
        history.push(estimate(5.0, 100.0));
        history.push(estimate(5.1, 110.0));
        history.push(estimate(0.05, 220.0));
        assert_eq!(history.len(), 1);
    }
}
