use std::time::Duration;

pub const RECALC_WINDOW_LEN: usize = 120;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RollingMsStats {
    pub last_ms: f32,
    pub avg_ms: f32,
    pub max_ms: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecalcStatsSnapshot {
    pub passes: u64,
    pub last_roofs: usize,
    pub last_containment_tests: usize,
    pub duration: RollingMsStats,
}

#[derive(Debug, Default)]
pub(crate) struct RecalcStats {
    passes: u64,
    last_roofs: usize,
    last_containment_tests: usize,
    window: PassDurationWindow,
}

impl RecalcStats {
    pub(crate) fn record_pass(&mut self, duration: Duration, roofs: usize, containment_tests: usize) {
        self.passes = self.passes.saturating_add(1);
        self.last_roofs = roofs;
        self.last_containment_tests = containment_tests;
        self.window.push_ms(duration_to_ms(duration));
    }

    pub(crate) fn snapshot(&self) -> RecalcStatsSnapshot {
        RecalcStatsSnapshot {
            passes: self.passes,
            last_roofs: self.last_roofs,
            last_containment_tests: self.last_containment_tests,
            duration: self.window.snapshot(),
        }
    }
}

#[derive(Debug)]
struct PassDurationWindow {
    durations_ms: [f32; RECALC_WINDOW_LEN],
    head: usize,
    count: usize,
    sum_ms: f32,
    last_ms: f32,
}

impl Default for PassDurationWindow {
    fn default() -> Self {
        Self {
            durations_ms: [0.0; RECALC_WINDOW_LEN],
            head: 0,
            count: 0,
            sum_ms: 0.0,
            last_ms: 0.0,
        }
    }
}

impl PassDurationWindow {
    fn push_ms(&mut self, value_ms: f32) {
        self.last_ms = value_ms;
        let evicted = if self.count < RECALC_WINDOW_LEN {
            self.count += 1;
            0.0
        } else {
            self.durations_ms[self.head]
        };
        self.durations_ms[self.head] = value_ms;
        self.head = (self.head + 1) % RECALC_WINDOW_LEN;
        self.sum_ms += value_ms - evicted;
    }

    fn snapshot(&self) -> RollingMsStats {
        if self.count == 0 {
            return RollingMsStats::default();
        }
        let max_ms = self.durations_ms[..self.count]
            .iter()
            .copied()
            .fold(f32::MIN, f32::max);
        RollingMsStats {
            last_ms: self.last_ms,
            avg_ms: self.sum_ms / self.count as f32,
            max_ms,
        }
    }
}

fn duration_to_ms(duration: Duration) -> f32 {
    duration.as_secs_f32() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_snapshot_is_zeroed() {
        assert_eq!(RecalcStats::default().snapshot(), RecalcStatsSnapshot::default());
    }

    #[test]
    fn pass_counts_and_last_sizes_are_tracked() {
        let mut stats = RecalcStats::default();
        stats.record_pass(Duration::from_millis(2), 3, 12);
        stats.record_pass(Duration::from_millis(4), 1, 0);
        let snapshot = stats.snapshot();

        assert_eq!(snapshot.passes, 2);
        assert_eq!(snapshot.last_roofs, 1);
        assert_eq!(snapshot.last_containment_tests, 0);
        assert!((snapshot.duration.avg_ms - 3.0).abs() < 0.001);
        assert!((snapshot.duration.max_ms - 4.0).abs() < 0.001);
    }

    #[test]
    fn max_recomputes_when_prior_max_is_evicted() {
        let mut window = PassDurationWindow::default();
        window.push_ms(100.0);
        for _ in 1..RECALC_WINDOW_LEN {
            window.push_ms(10.0);
        }
        window.push_ms(20.0);
        let snapshot = window.snapshot();

        assert_eq!(snapshot.last_ms, 20.0);
        assert_eq!(snapshot.max_ms, 20.0);
        let expected_avg = ((RECALC_WINDOW_LEN as f32 - 2.0) * 10.0 + 20.0 + 10.0)
            / RECALC_WINDOW_LEN as f32;
        assert!((snapshot.avg_ms - expected_avg).abs() < 0.01);
    }
}
