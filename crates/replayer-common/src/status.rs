//! Per-trace verdicts and their aggregation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of replaying a single trace.
///
/// `Crash` means no checksum or frame-time series could be produced at all;
/// `Fail` means one was produced and did not match the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayStatus {
    Pass,
    Fail,
    Crash,
}

impl ReplayStatus {
    /// Lowercase name used in the `PIGLIT:` result line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Crash => "crash",
        }
    }

    /// Fold one more per-trace result into a running batch result.
    ///
    /// A crash is sticky: a later failure never replaces it, while a later
    /// crash always replaces a failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use replayer_common::ReplayStatus;
    ///
    /// let overall = ReplayStatus::Pass
    ///     .merge(ReplayStatus::Crash)
    ///     .merge(ReplayStatus::Fail);
    /// assert_eq!(overall, ReplayStatus::Crash);
    /// ```
    #[must_use]
    pub fn merge(self, next: ReplayStatus) -> ReplayStatus {
        if next != Self::Pass && self != Self::Crash { next } else { self }
    }

    /// Aggregate a whole batch, starting from `Pass`.
    pub fn aggregate<I>(results: I) -> ReplayStatus
    where
        I: IntoIterator<Item = ReplayStatus>,
    {
        results.into_iter().fold(Self::Pass, Self::merge)
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl fmt::Display for ReplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_passes() {
        assert_eq!(ReplayStatus::aggregate(Vec::new()), ReplayStatus::Pass);
    }

    #[test]
    fn all_pass_stays_pass() {
        let overall = ReplayStatus::aggregate([ReplayStatus::Pass, ReplayStatus::Pass]);
        assert_eq!(overall, ReplayStatus::Pass);
    }

    #[test]
    fn fail_dominates_pass() {
        let overall = ReplayStatus::aggregate([ReplayStatus::Pass, ReplayStatus::Fail]);
        assert_eq!(overall, ReplayStatus::Fail);

        let overall = ReplayStatus::aggregate([ReplayStatus::Fail, ReplayStatus::Pass]);
        assert_eq!(overall, ReplayStatus::Fail);
    }

    #[test]
    fn crash_dominates_in_every_order() {
        use ReplayStatus::*;
        let orders = [
            [Pass, Fail, Crash],
            [Pass, Crash, Fail],
            [Fail, Pass, Crash],
            [Fail, Crash, Pass],
            [Crash, Pass, Fail],
            [Crash, Fail, Pass],
        ];
        for order in orders {
            assert_eq!(ReplayStatus::aggregate(order), Crash, "order {order:?}");
        }
    }

    #[test]
    fn crash_is_not_downgraded_by_later_fail() {
        assert_eq!(ReplayStatus::Crash.merge(ReplayStatus::Fail), ReplayStatus::Crash);
        assert_eq!(ReplayStatus::Fail.merge(ReplayStatus::Crash), ReplayStatus::Crash);
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(ReplayStatus::Pass.to_string(), "pass");
        assert_eq!(ReplayStatus::Fail.to_string(), "fail");
        assert_eq!(ReplayStatus::Crash.to_string(), "crash");
        assert_eq!(serde_json::to_string(&ReplayStatus::Crash).unwrap(), "\"crash\"");
    }
}
