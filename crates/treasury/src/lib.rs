//! Treasury (spec §4.4): per-agent balances, daily reset, spend
//! authorization, ROI adjustments, and emergency freeze.
//!
//! Grounded on the `Treasury` class in the original `core/kip.py`: the
//! priority-ordered rejection reasons in [`Treasury::check_funds`], the
//! debit-first "Darwinian" policy used by the KIP executor, and the
//! UTC-date daily reset. Concurrency follows the per-agent-mutex idiom
//! used for daily quota tracking elsewhere in this workspace: each
//! agent's ledger is guarded by its own lock so unrelated agents never
//! contend.
//!
//! The per-agent ledger is an in-process cache in front of the shared
//! [`KvStore`] (spec §4.4: "reads cache first, 1-minute TTL; on miss
//! reads KV and refreshes cache"), the same cache-aside shape the rate
//! limiter and pheromind scan use for their own KV-backed state. A KV
//! write failure degrades to "this instance's cache is now the only
//! copy" rather than failing the caller — the same fail-open posture
//! [`orch_ratelimit::RateLimiter`] applies to its own KV calls.

mod model;
mod roi;

pub use model::{Budget, RejectReason, Transaction, TransactionKind};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use orch_domain::error::{Error, Result};
use orch_domain::trace::TraceEvent;
use orch_kv::KvStore;
use parking_lot::{Mutex, RwLock};

/// TTL of the durable KV copy of a budget/transaction. Refreshed on
/// every write, so an active agent's KV copy never actually expires;
/// only a dormant agent's eventually does, which just means the next
/// `get_budget` on a fresh instance re-hydrates from local state or
/// `AgentNotFound` instead of a cross-instance hit.
const BUDGET_KV_TTL_SECS: u64 = 30 * 24 * 60 * 60;
const TRANSACTION_KV_TTL_SECS: u64 = 30 * 24 * 60 * 60;

fn budget_key(agent_id: &str) -> String {
    format!("treasury:budget:{agent_id}")
}

fn transaction_key(agent_id: &str) -> String {
    format!("treasury:tx:{agent_id}")
}

struct AgentLedger {
    budget: Budget,
    transactions: Vec<Transaction>,
    cached_at: Instant,
}

/// Result of a funds check (spec §4.4 `CheckFunds`).
#[derive(Debug, Clone)]
pub struct CheckFundsResult {
    pub approved: bool,
    pub reason: Option<RejectReason>,
}

impl CheckFundsResult {
    fn approved() -> Self {
        Self {
            approved: true,
            reason: None,
        }
    }

    fn rejected(reason: RejectReason) -> Self {
        Self {
            approved: false,
            reason: Some(reason),
        }
    }
}

pub struct Treasury {
    default_seed_cents: i64,
    default_daily_limit_cents: i64,
    default_per_action_limit_cents: i64,
    agents: RwLock<HashMap<String, Arc<Mutex<AgentLedger>>>>,
    emergency_active: AtomicBool,
    kv: Arc<dyn KvStore>,
    cache_ttl: Duration,
}

/// Normalize an agent id: lowercase, spaces become underscores, and the
/// result must be at least 3 characters (spec §8 boundary behavior).
pub fn normalize_agent_id(raw: &str) -> Result<String> {
    let normalized = raw.trim().to_ascii_lowercase().replace(' ', "_");
    if normalized.len() < 3 {
        return Err(Error::ValidationError(format!(
            "agent_id '{raw}' must be at least 3 characters"
        )));
    }
    Ok(normalized)
}

impl Treasury {
    pub fn new(
        default_seed_cents: i64,
        default_daily_limit_cents: i64,
        default_per_action_limit_cents: i64,
        kv: Arc<dyn KvStore>,
        budget_cache_ttl_secs: u64,
    ) -> Self {
        Self {
            default_seed_cents,
            default_daily_limit_cents,
            default_per_action_limit_cents,
            agents: RwLock::new(HashMap::new()),
            emergency_active: AtomicBool::new(false),
            kv,
            cache_ttl: Duration::from_secs(budget_cache_ttl_secs),
        }
    }

    fn ledger_for(&self, agent_id: &str) -> Option<Arc<Mutex<AgentLedger>>> {
        self.agents.read().get(agent_id).cloned()
    }

    /// `InitializeBudget` (spec §4.4). Fails with [`Error::AlreadyExists`]
    /// if a budget already exists for this agent *in this instance's
    /// cache* — uniqueness is not checked against KV, so concurrent
    /// initialization of the same agent across two instances racing at
    /// startup is not guarded against (unchanged from the original
    /// single-instance behavior, just noted here as a real limitation).
    pub async fn initialize_budget(
        &self,
        agent_id: &str,
        seed_cents: Option<i64>,
        daily_limit_cents: Option<i64>,
        per_action_limit_cents: Option<i64>,
    ) -> Result<Budget> {
        let agent_id = normalize_agent_id(agent_id)?;

        if self.ledger_for(&agent_id).is_some() {
            return Err(Error::AlreadyExists(format!("budget already exists for {agent_id}")));
        }

        let seed = seed_cents.unwrap_or(self.default_seed_cents);
        let today = Utc::now().date_naive();
        let budget = Budget {
            agent_id: agent_id.clone(),
            balance_cents: seed,
            total_spent: 0,
            total_earned: seed,
            daily_spent: 0,
            daily_limit: daily_limit_cents.unwrap_or(self.default_daily_limit_cents),
            per_action_limit: per_action_limit_cents.unwrap_or(self.default_per_action_limit_cents),
            last_reset_date: today,
            frozen: false,
            total_transactions: 1,
            roi_score: 0.0,
        };

        let seed_tx = Transaction {
            tx_id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.clone(),
            amount_cents: seed,
            kind: TransactionKind::Seed,
            description: "initial budget seed".to_string(),
            balance_before: 0,
            balance_after: seed,
            roi_data: None,
            timestamp: Utc::now(),
            processed_by: "system".to_string(),
        };

        TraceEvent::TransactionRecorded {
            tx_id: seed_tx.tx_id.clone(),
            agent_id: agent_id.clone(),
            amount_cents: seed,
            kind: "seed".to_string(),
        }
        .emit();

        self.agents.write().insert(
            agent_id.clone(),
            Arc::new(Mutex::new(AgentLedger {
                budget: budget.clone(),
                transactions: vec![seed_tx.clone()],
                cached_at: Instant::now(),
            })),
        );

        self.write_through(&agent_id, &budget).await;
        self.persist_transaction(&agent_id, &seed_tx).await;

        Ok(budget)
    }

    /// `GetBudget` (spec §4.4). Reads the local cache first; on a miss or
    /// past-TTL entry, reads through to KV and refreshes the cache (spec
    /// §4.4: "1-minute TTL"). On [`Error::KvUnavailable`] or a KV miss,
    /// falls back to whatever stale local copy exists, else `None` (spec
    /// §7: "budget cache falls back to KV-then-null"). Also applies the
    /// daily reset if the resolved `last_reset_date` predates today-UTC.
    pub async fn get_budget(&self, agent_id: &str) -> Option<Budget> {
        if let Some(ledger) = self.ledger_for(agent_id) {
            let fresh = ledger.lock().cached_at.elapsed() < self.cache_ttl;
            if fresh {
                let mut ledger = ledger.lock();
                self.apply_daily_reset(&mut ledger.budget);
                return Some(ledger.budget.clone());
            }
        }

        match self.kv.get_string(&budget_key(agent_id)).await {
            Ok(Some(raw)) => match serde_json::from_str::<Budget>(&raw) {
                Ok(mut budget) => {
                    self.apply_daily_reset(&mut budget);
                    self.refresh_cache(agent_id, budget.clone());
                    Some(budget)
                }
                Err(e) => {
                    tracing::warn!(agent_id, error = %e, "corrupt budget entry in KV, falling back to local cache");
                    self.stale_local_budget(agent_id)
                }
            },
            Ok(None) => self.stale_local_budget(agent_id),
            Err(e) => {
                tracing::warn!(agent_id, error = %e, "budget cache KV read failed, falling back to local cache");
                self.stale_local_budget(agent_id)
            }
        }
    }

    fn stale_local_budget(&self, agent_id: &str) -> Option<Budget> {
        let ledger = self.ledger_for(agent_id)?;
        let mut ledger = ledger.lock();
        self.apply_daily_reset(&mut ledger.budget);
        Some(ledger.budget.clone())
    }

    /// Install `budget` as the fresh local cache entry for `agent_id`,
    /// creating the ledger (with empty local transaction history) if this
    /// instance has never seen the agent before — the cross-instance
    /// hydration path.
    fn refresh_cache(&self, agent_id: &str, budget: Budget) {
        if let Some(ledger) = self.ledger_for(agent_id) {
            let mut ledger = ledger.lock();
            ledger.budget = budget;
            ledger.cached_at = Instant::now();
            return;
        }
        self.agents.write().insert(
            agent_id.to_string(),
            Arc::new(Mutex::new(AgentLedger {
                budget,
                transactions: Vec::new(),
                cached_at: Instant::now(),
            })),
        );
    }

    async fn write_through(&self, agent_id: &str, budget: &Budget) {
        let payload = match serde_json::to_string(budget) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(agent_id, error = %e, "failed to serialize budget for KV write-through");
                return;
            }
        };
        if let Err(e) = self.kv.set_string_ex(&budget_key(agent_id), &payload, BUDGET_KV_TTL_SECS).await {
            tracing::warn!(agent_id, error = %e, "budget cache write-through to KV failed");
        }
    }

    async fn persist_transaction(&self, agent_id: &str, tx: &Transaction) {
        let payload = match serde_json::to_string(tx) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(agent_id, error = %e, "failed to serialize transaction for KV durable copy");
                return;
            }
        };
        if let Err(e) = self.kv.push_with_ttl(&transaction_key(agent_id), &payload, TRANSACTION_KV_TTL_SECS).await {
            tracing::warn!(agent_id, error = %e, "failed to write transaction durable copy to KV");
        }
    }

    fn apply_daily_reset(&self, budget: &mut Budget) {
        let today = Utc::now().date_naive();
        if budget.last_reset_date < today {
            budget.last_reset_date = today;
            budget.daily_spent = 0;
        }
    }

    /// `CheckFunds` (spec §4.4): priority-ordered rejection reasons.
    /// Reads local state only — this sits on the KIP executor's hot
    /// path, so it trades cross-instance visibility of a budget this
    /// instance has never hydrated (via [`Treasury::get_budget`]) for
    /// not taking a KV round trip per tool call. An agent initialized on
    /// another instance becomes visible here once something on this
    /// instance has called `get_budget` for it at least once.
    pub fn check_funds(&self, agent_id: &str, amount_cents: i64) -> CheckFundsResult {
        if amount_cents <= 0 {
            return CheckFundsResult::rejected(RejectReason::InvalidAmount);
        }
        if self.emergency_active.load(Ordering::SeqCst) {
            return CheckFundsResult::rejected(RejectReason::EmergencyFreeze);
        }

        let Some(ledger) = self.ledger_for(agent_id) else {
            return CheckFundsResult::rejected(RejectReason::AgentNotFound);
        };
        let mut ledger = ledger.lock();
        self.apply_daily_reset(&mut ledger.budget);
        let budget = &ledger.budget;

        if budget.frozen {
            return CheckFundsResult::rejected(RejectReason::AgentFrozen);
        }
        if budget.balance_cents < amount_cents {
            return CheckFundsResult::rejected(RejectReason::InsufficientBalance);
        }
        if amount_cents > budget.per_action_limit {
            return CheckFundsResult::rejected(RejectReason::PerActionExceeded);
        }
        if budget.daily_spent + amount_cents > budget.daily_limit {
            return CheckFundsResult::rejected(RejectReason::DailyLimitExceeded);
        }

        CheckFundsResult::approved()
    }

    /// `RecordTransaction` (spec §4.4). For negative `spending` amounts,
    /// re-checks funds; rejection returns `Ok(None)` rather than an error,
    /// since "insufficient funds for this particular action" is an
    /// expected outcome, not a system failure. Writes the updated budget
    /// and the new transaction's durable copy through to KV after the
    /// per-agent lock is released.
    pub async fn record_transaction(
        &self,
        agent_id: &str,
        amount_cents: i64,
        description: &str,
        kind: TransactionKind,
        processed_by: &str,
    ) -> Result<Option<Transaction>> {
        let ledger = self
            .ledger_for(agent_id)
            .ok_or_else(|| Error::Other(format!("no budget for agent {agent_id}")))?;

        let (budget_snapshot, tx) = {
            let mut ledger = ledger.lock();
            self.apply_daily_reset(&mut ledger.budget);

            if amount_cents < 0 && matches!(kind, TransactionKind::Spending) {
                let check = self.check_funds_locked(&ledger.budget, amount_cents.unsigned_abs() as i64);
                if !check.approved {
                    return Ok(None);
                }
            }

            let balance_before = ledger.budget.balance_cents;
            let balance_after = balance_before + amount_cents;
            ledger.budget.balance_cents = balance_after;
            if amount_cents < 0 {
                ledger.budget.total_spent += amount_cents.unsigned_abs() as i64;
                if matches!(kind, TransactionKind::Spending) {
                    ledger.budget.daily_spent += amount_cents.unsigned_abs() as i64;
                }
            } else {
                ledger.budget.total_earned += amount_cents;
            }
            ledger.budget.total_transactions += 1;

            let tx = Transaction {
                tx_id: uuid::Uuid::new_v4().to_string(),
                agent_id: agent_id.to_string(),
                amount_cents,
                kind,
                description: description.to_string(),
                balance_before,
                balance_after,
                roi_data: None,
                timestamp: Utc::now(),
                processed_by: processed_by.to_string(),
            };

            TraceEvent::TransactionRecorded {
                tx_id: tx.tx_id.clone(),
                agent_id: agent_id.to_string(),
                amount_cents,
                kind: tx.kind.as_str().to_string(),
            }
            .emit();

            ledger.transactions.push(tx.clone());
            ledger.cached_at = Instant::now();
            (ledger.budget.clone(), tx)
        };

        self.write_through(agent_id, &budget_snapshot).await;
        self.persist_transaction(agent_id, &tx).await;

        Ok(Some(tx))
    }

    /// Funds check against an already-locked budget, used internally by
    /// `record_transaction` to avoid re-acquiring the per-agent lock.
    fn check_funds_locked(&self, budget: &Budget, amount_cents: i64) -> CheckFundsResult {
        if amount_cents <= 0 {
            return CheckFundsResult::rejected(RejectReason::InvalidAmount);
        }
        if self.emergency_active.load(Ordering::SeqCst) {
            return CheckFundsResult::rejected(RejectReason::EmergencyFreeze);
        }
        if budget.frozen {
            return CheckFundsResult::rejected(RejectReason::AgentFrozen);
        }
        if budget.balance_cents < amount_cents {
            return CheckFundsResult::rejected(RejectReason::InsufficientBalance);
        }
        if amount_cents > budget.per_action_limit {
            return CheckFundsResult::rejected(RejectReason::PerActionExceeded);
        }
        if budget.daily_spent + amount_cents > budget.daily_limit {
            return CheckFundsResult::rejected(RejectReason::DailyLimitExceeded);
        }
        CheckFundsResult::approved()
    }

    /// `CalculateROIAdjustment` (spec §4.4). Positive ROI rounds the
    /// adjustment up (`ceil(0.5 * profit)`); negative ROI rounds the
    /// penalty down (`floor(0.25 * profit)`, itself negative).
    pub async fn calculate_roi_adjustment(
        &self,
        agent_id: &str,
        revenue_cents: i64,
        cost_cents: i64,
        description: &str,
    ) -> Result<Option<Transaction>> {
        if cost_cents <= 0 {
            return Err(Error::ValidationError("cost must be positive".to_string()));
        }
        let (amount, roi_data, kind) = roi::compute(revenue_cents, cost_cents);

        let ledger = self
            .ledger_for(agent_id)
            .ok_or_else(|| Error::Other(format!("no budget for agent {agent_id}")))?;

        let (budget_snapshot, tx) = {
            let mut ledger = ledger.lock();
            self.apply_daily_reset(&mut ledger.budget);
            let balance_before = ledger.budget.balance_cents;
            let balance_after = balance_before + amount;
            ledger.budget.balance_cents = balance_after;
            if amount < 0 {
                ledger.budget.total_spent += amount.unsigned_abs() as i64;
            } else {
                ledger.budget.total_earned += amount;
            }
            ledger.budget.total_transactions += 1;
            ledger.budget.roi_score = roi_data.roi_percent;

            let tx = Transaction {
                tx_id: uuid::Uuid::new_v4().to_string(),
                agent_id: agent_id.to_string(),
                amount_cents: amount,
                kind,
                description: description.to_string(),
                balance_before,
                balance_after,
                roi_data: Some(roi_data),
                timestamp: Utc::now(),
                processed_by: "system".to_string(),
            };
            ledger.transactions.push(tx.clone());
            ledger.cached_at = Instant::now();
            (ledger.budget.clone(), tx)
        };

        self.write_through(agent_id, &budget_snapshot).await;
        self.persist_transaction(agent_id, &tx).await;

        Ok(Some(tx))
    }

    /// `EmergencyFreezeAll` / `EmergencyUnfreezeAll` (spec §4.4). Returns
    /// the count of budgets whose `frozen` flag actually changed.
    pub async fn emergency_freeze_all(&self, reason: &str) -> usize {
        self.emergency_active.store(true, Ordering::SeqCst);
        self.toggle_all_frozen(true, reason).await
    }

    pub async fn emergency_unfreeze_all(&self, reason: &str) -> usize {
        self.emergency_active.store(false, Ordering::SeqCst);
        self.toggle_all_frozen(false, reason).await
    }

    async fn toggle_all_frozen(&self, frozen: bool, reason: &str) -> usize {
        let changed: Vec<(String, Budget)> = {
            let agents = self.agents.read();
            let mut changed = Vec::new();
            for ledger in agents.values() {
                let mut ledger = ledger.lock();
                if ledger.budget.frozen != frozen {
                    ledger.budget.frozen = frozen;
                    ledger.cached_at = Instant::now();
                    if frozen {
                        TraceEvent::BudgetFrozen {
                            agent_id: ledger.budget.agent_id.clone(),
                            reason: reason.to_string(),
                        }
                        .emit();
                    }
                    changed.push((ledger.budget.agent_id.clone(), ledger.budget.clone()));
                }
            }
            changed
        };

        for (agent_id, budget) in &changed {
            self.write_through(agent_id, budget).await;
        }
        changed.len()
    }

    pub fn is_emergency_active(&self) -> bool {
        self.emergency_active.load(Ordering::SeqCst)
    }

    /// Local transaction history only — the KV durable copy written by
    /// [`Treasury::record_transaction`] is a write-only audit trail for
    /// external tooling, not read back here.
    pub fn transactions_for(&self, agent_id: &str) -> Vec<Transaction> {
        self.ledger_for(agent_id)
            .map(|l| l.lock().transactions.clone())
            .unwrap_or_default()
    }

    pub fn known_agent_ids(&self) -> Vec<String> {
        self.agents.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orch_kv::InMemoryKv;

    fn treasury() -> Treasury {
        Treasury::new(5000, 10_000, 1_000, Arc::new(InMemoryKv::new()), 60)
    }

    #[tokio::test]
    async fn initialize_seeds_and_records_transaction() {
        let t = treasury();
        let budget = t.initialize_budget("data_analyst_01", None, None, None).await.unwrap();
        assert_eq!(budget.balance_cents, 5000);
        let txs = t.transactions_for("data_analyst_01");
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].balance_before, 0);
        assert_eq!(txs[0].balance_after, 5000);
    }

    #[tokio::test]
    async fn initialize_twice_fails() {
        let t = treasury();
        t.initialize_budget("agent_two", None, None, None).await.unwrap();
        let err = t.initialize_budget("agent_two", None, None, None).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn agent_id_shorter_than_three_chars_rejected() {
        let t = treasury();
        let err = t.initialize_budget("ab", None, None, None).await.unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
    }

    #[test]
    fn agent_id_normalized_lowercase_and_underscored() {
        assert_eq!(normalize_agent_id("Data Analyst").unwrap(), "data_analyst");
    }

    #[tokio::test]
    async fn check_funds_priority_order() {
        let t = treasury();
        // unknown agent
        assert!(matches!(
            t.check_funds("ghost_agent", 100).reason,
            Some(RejectReason::AgentNotFound)
        ));

        t.initialize_budget("agent_three", Some(50), Some(10_000), Some(1_000)).await.unwrap();
        // invalid amount takes priority over everything
        assert!(matches!(
            t.check_funds("agent_three", 0).reason,
            Some(RejectReason::InvalidAmount)
        ));
        // insufficient balance (balance=50, amount=200)
        assert!(matches!(
            t.check_funds("agent_three", 200).reason,
            Some(RejectReason::InsufficientBalance)
        ));
    }

    #[tokio::test]
    async fn per_action_limit_boundary() {
        let t = treasury();
        t.initialize_budget("agent_four", Some(10_000), Some(10_000), Some(1_000)).await.unwrap();
        assert!(t.check_funds("agent_four", 1_000).approved);
        assert!(!t.check_funds("agent_four", 1_001).approved);
    }

    #[tokio::test]
    async fn daily_limit_boundary() {
        let t = treasury();
        t.initialize_budget("agent_five", Some(20_000), Some(10_000), Some(10_000)).await.unwrap();
        t.record_transaction("agent_five", -9_999, "spend", TransactionKind::Spending, "tool")
            .await
            .unwrap();
        assert!(t.check_funds("agent_five", 1).approved);
        t.record_transaction("agent_five", -1, "spend", TransactionKind::Spending, "tool")
            .await
            .unwrap();
        assert!(!t.check_funds("agent_five", 1).approved);
    }

    #[tokio::test]
    async fn negative_spending_rejected_when_over_limit_returns_none_not_error() {
        let t = treasury();
        t.initialize_budget("agent_six", Some(50), Some(10_000), Some(1_000)).await.unwrap();
        let result = t
            .record_transaction("agent_six", -200, "tool call", TransactionKind::Spending, "tool")
            .await
            .unwrap();
        assert!(result.is_none());
        // no negative-amount transaction should have been recorded
        let txs = t.transactions_for("agent_six");
        assert!(txs.iter().all(|tx| tx.amount_cents >= 0 || tx.kind != TransactionKind::Spending));
    }

    #[tokio::test]
    async fn balance_before_after_chain_holds() {
        let t = treasury();
        t.initialize_budget("agent_seven", Some(10_000), Some(10_000), Some(5_000)).await.unwrap();
        t.record_transaction("agent_seven", -1_000, "a", TransactionKind::Spending, "tool").await.unwrap();
        t.record_transaction("agent_seven", 500, "b", TransactionKind::Earning, "system").await.unwrap();
        let txs = t.transactions_for("agent_seven");
        for pair in txs.windows(2) {
            assert_eq!(pair[0].balance_after, pair[1].balance_before);
        }
        let budget = t.get_budget("agent_seven").await.unwrap();
        assert_eq!(budget.balance_cents, budget.total_earned - budget.total_spent);
    }

    #[tokio::test]
    async fn roi_adjustment_rounds_ceil_for_positive_and_floor_for_negative() {
        let t = treasury();
        t.initialize_budget("agent_eight", Some(10_000), Some(100_000), Some(100_000)).await.unwrap();
        // profit = 101, 0.5*101 = 50.5 -> ceil = 51
        let tx = t
            .calculate_roi_adjustment("agent_eight", 301, 200, "campaign a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.amount_cents, 51);
        assert_eq!(tx.kind, TransactionKind::RoiAdjustment);

        // profit = -101 (loss), 0.25 * -101 = -25.25 -> floor = -26
        let tx2 = t
            .calculate_roi_adjustment("agent_eight", 99, 200, "campaign b")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx2.amount_cents, -26);
        assert_eq!(tx2.kind, TransactionKind::Penalty);
    }

    #[tokio::test]
    async fn emergency_freeze_blocks_all_agents_and_unfreeze_restores() {
        let t = treasury();
        t.initialize_budget("agent_nine", Some(1_000), Some(10_000), Some(1_000)).await.unwrap();
        assert!(t.check_funds("agent_nine", 10).approved);

        let changed = t.emergency_freeze_all("incident-123").await;
        assert_eq!(changed, 1);
        assert!(matches!(
            t.check_funds("agent_nine", 10).reason,
            Some(RejectReason::EmergencyFreeze)
        ));

        t.emergency_unfreeze_all("resolved").await;
        assert!(t.check_funds("agent_nine", 10).approved);
    }

    #[tokio::test]
    async fn get_budget_rehydrates_from_kv_on_a_fresh_instance() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKv::new());
        let first = Treasury::new(5000, 10_000, 1_000, kv.clone(), 60);
        first.initialize_budget("agent_ten", None, None, None).await.unwrap();

        // A second instance sharing the same KV has never seen this agent
        // locally, but should still resolve its budget through KV.
        let second = Treasury::new(5000, 10_000, 1_000, kv, 60);
        let budget = second.get_budget("agent_ten").await.unwrap();
        assert_eq!(budget.balance_cents, 5000);
    }

    #[tokio::test]
    async fn get_budget_falls_back_to_stale_local_copy_when_kv_has_no_entry() {
        // Cache TTL of 0 forces every read past the freshness check, but
        // the in-memory KV has no entry for this key, so the stale local
        // copy must still win over returning None.
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKv::new());
        let t = Treasury::new(5000, 10_000, 1_000, kv, 0);
        t.initialize_budget("agent_eleven", None, None, None).await.unwrap();
        let _ = t.kv.del(&budget_key("agent_eleven")).await;
        let budget = t.get_budget("agent_eleven").await.unwrap();
        assert_eq!(budget.agent_id, "agent_eleven");
    }
}
