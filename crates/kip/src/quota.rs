//! Per-`(agent_id, tool_name, date)` daily use counters.
//!
//! Mirrors the UTC-date-keyed, lock-protected usage tracker used for model
//! quotas elsewhere in this workspace, specialized to per-tool counts and
//! a fixed retention window instead of token/cost totals.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;

pub struct QuotaTracker {
    retention_days: i64,
    counts: RwLock<HashMap<(String, String, NaiveDate), u32>>,
}

impl QuotaTracker {
    pub fn new(retention_days: u32) -> Self {
        Self {
            retention_days: retention_days as i64,
            counts: RwLock::new(HashMap::new()),
        }
    }

    /// Count of successful executions for this agent/tool on the current
    /// UTC date.
    pub fn count_today(&self, agent_id: &str, tool_name: &str) -> u32 {
        let today = Utc::now().date_naive();
        let key = (agent_id.to_string(), tool_name.to_string(), today);
        self.counts.read().get(&key).copied().unwrap_or(0)
    }

    /// Increment today's counter and discard entries older than the
    /// retention window (spec §4.5: "discard counter keys older than 7
    /// days").
    pub fn increment(&self, agent_id: &str, tool_name: &str) {
        let today = Utc::now().date_naive();
        let key = (agent_id.to_string(), tool_name.to_string(), today);
        let mut counts = self.counts.write();
        *counts.entry(key).or_insert(0) += 1;

        let cutoff = today - chrono::Duration::days(self.retention_days);
        counts.retain(|(_, _, date), _| *date >= cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_increment_per_agent_tool_pair() {
        let tracker = QuotaTracker::new(7);
        assert_eq!(tracker.count_today("agent_a", "search"), 0);
        tracker.increment("agent_a", "search");
        tracker.increment("agent_a", "search");
        assert_eq!(tracker.count_today("agent_a", "search"), 2);
        assert_eq!(tracker.count_today("agent_a", "other_tool"), 0);
        assert_eq!(tracker.count_today("agent_b", "search"), 0);
    }
}
