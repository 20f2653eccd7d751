//! Slowest-first orderings
//!
//! Both orderings are stable: spawns with equal total time keep log order,
//! mnemonics with equal total duration keep first-seen order.

use crate::record::SpawnExec;
use crate::stats::{MnemonicMetrics, StatsTracker};

/// All spawns, slowest total time first
pub fn slowest_actions(spawns: &[SpawnExec]) -> Vec<&SpawnExec> {
    let mut sorted: Vec<&SpawnExec> = spawns.iter().collect();
    sorted.sort_by(|a, b| b.total_time().cmp(&a.total_time()));
    sorted
}

/// The `n` slowest spawns; fewer when the log is shorter
pub fn top_n(spawns: &[SpawnExec], n: usize) -> Vec<&SpawnExec> {
    let mut sorted = slowest_actions(spawns);
    sorted.truncate(n);
    sorted
}

/// Mnemonics ordered by total duration, largest first
pub fn mnemonics_by_total_time(tracker: &StatsTracker) -> Vec<(&str, &MnemonicMetrics)> {
    let mut sorted: Vec<(&str, &MnemonicMetrics)> = tracker
        .stats_map()
        .iter()
        .map(|(name, stats)| (name.as_str(), stats))
        .collect();
    sorted.sort_by(|a, b| b.1.total_duration.cmp(&a.1.total_duration));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Duration, SpawnMetrics};

    fn spawn(mnemonic: &str, label: &str, millis: i64) -> SpawnExec {
        let total = Duration::new(millis / 1000, ((millis % 1000) * 1_000_000) as i32);
        SpawnExec {
            mnemonic: mnemonic.to_string(),
            target_label: label.to_string(),
            metrics: Some(SpawnMetrics {
                total_time: Some(total),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_slowest_first() {
        let spawns = vec![
            spawn("Compile", "//a", 2000),
            spawn("Compile", "//b", 3000),
            spawn("Link", "//c", 1000),
        ];
        let labels: Vec<&str> = slowest_actions(&spawns)
            .iter()
            .map(|s| s.target_label.as_str())
            .collect();
        assert_eq!(labels, vec!["//b", "//a", "//c"]);
        assert_eq!(top_n(&spawns, 1)[0].target_label, "//b");
    }

    #[test]
    fn test_ties_keep_log_order() {
        let spawns = vec![
            spawn("A", "//first", 500),
            spawn("B", "//slow", 900),
            spawn("C", "//second", 500),
            spawn("D", "//third", 500),
        ];
        let labels: Vec<&str> = slowest_actions(&spawns)
            .iter()
            .map(|s| s.target_label.as_str())
            .collect();
        assert_eq!(labels, vec!["//slow", "//first", "//second", "//third"]);
    }

    #[test]
    fn test_top_n_bounds() {
        let spawns = vec![spawn("A", "//a", 1), spawn("B", "//b", 2)];
        assert!(top_n(&spawns, 0).is_empty());
        assert_eq!(top_n(&spawns, 10).len(), 2);
        assert!(top_n(&[], 3).is_empty());
    }

    #[test]
    fn test_missing_metrics_sort_last() {
        let spawns = vec![
            SpawnExec {
                target_label: "//none".to_string(),
                ..Default::default()
            },
            spawn("A", "//a", 1),
        ];
        assert_eq!(slowest_actions(&spawns)[1].target_label, "//none");
    }

    #[test]
    fn test_mnemonics_by_total_time() {
        let spawns = vec![
            spawn("Link", "//a", 1000),
            spawn("Compile", "//b", 2000),
            spawn("Compile", "//c", 3000),
            spawn("Genrule", "//d", 1000),
        ];
        let tracker = StatsTracker::from_spawns(&spawns);
        let order: Vec<&str> = mnemonics_by_total_time(&tracker)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        // Link and Genrule tie at 1s; Link was seen first
        assert_eq!(order, vec!["Compile", "Link", "Genrule"]);
    }
}
