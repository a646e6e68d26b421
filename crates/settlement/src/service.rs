//! The settlement service: bet lifecycle, check-ins, points, leaderboards.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use bet_core::{
    advance, check_in_points, compute_payout, determine_outcome, milestone_reached,
    outcome_points, required_logged_days, validate_missed_days, validate_new_bet, ActionKind,
    BetOutcome, BetStatus, BetTerms, Clock, IdGenerator, PointsConfig, PointsKind,
    StreakSnapshot, StreakUpdate, SystemClock,
};
use database::{
    Bet, CheckInLog, DatabaseError, Habit, Json, LeaderboardRow, Metadata, PointsEntry, Streak,
    User,
};

use crate::error::SettlementError;
use crate::ids::UuidIds;
use crate::store::Store;
use crate::views::{
    BetProgress, BetView, CheckInReceipt, Leaderboard, LeaderboardEntry, LeaderboardKind, NewBet,
    NewHabit, Resolution,
};

/// Service-wide settings, injected at construction.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub points: PointsConfig,
    /// Upper bound on any single store call.
    pub storage_timeout: Duration,
    /// Largest leaderboard page a caller can request.
    pub leaderboard_max: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            points: PointsConfig::default(),
            storage_timeout: Duration::from_secs(30),
            leaderboard_max: 100,
        }
    }
}

/// Coordinates bet resolution, check-ins, and point accrual over a [`Store`].
///
/// All collaborators are explicit: the store, the clock, and the id source
/// are injected, so every decision the service makes is reproducible under
/// test. The service never retries a failed store call; retries are the
/// caller's policy, and the conditional writes in the store keep them safe.
pub struct SettlementService<S> {
    store: S,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    config: ServiceConfig,
}

impl<S: Store> SettlementService<S> {
    /// Create a service with explicit collaborators.
    pub fn new(
        store: S,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            clock,
            ids,
            config,
        }
    }

    /// Create a service with the wall clock, UUID ids, and default config.
    pub fn with_defaults(store: S) -> Self {
        Self::new(
            store,
            Arc::new(SystemClock),
            Arc::new(UuidIds),
            ServiceConfig::default(),
        )
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run a store call under the configured timeout.
    ///
    /// On timeout nothing is retried and no partial mutation exists; the
    /// guarded writes either landed or they did not.
    async fn guard<T>(
        &self,
        op: impl Future<Output = database::Result<T>>,
    ) -> Result<T, SettlementError> {
        match tokio::time::timeout(self.config.storage_timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(SettlementError::StorageTimeout),
        }
    }

    /// Look up a user, creating the row on first interaction.
    async fn ensure_user(&self, wallet_address: &str) -> Result<User, SettlementError> {
        if let Some(user) = self.guard(self.store.user_by_wallet(wallet_address)).await? {
            return Ok(user);
        }

        let user = User {
            id: self.ids.new_id(),
            wallet_address: wallet_address.to_string(),
            username: None,
            created_at: self.clock.now(),
        };
        match self.guard(self.store.create_user(&user)).await {
            Ok(()) => {
                info!("created user {} for wallet {}", user.id, wallet_address);
                Ok(user)
            }
            Err(SettlementError::Storage(DatabaseError::AlreadyExists { .. })) => {
                // lost a creation race; the row exists now
                self.guard(self.store.user_by_wallet(wallet_address))
                    .await?
                    .ok_or_else(|| SettlementError::NotFound {
                        entity: "User",
                        id: wallet_address.to_string(),
                    })
            }
            Err(err) => Err(err),
        }
    }

    async fn require_user(&self, wallet_address: &str) -> Result<User, SettlementError> {
        self.guard(self.store.user_by_wallet(wallet_address))
            .await?
            .ok_or_else(|| SettlementError::NotFound {
                entity: "User",
                id: wallet_address.to_string(),
            })
    }

    /// Fetch a bet and confirm it belongs to `user`. Other users' bets are
    /// indistinguishable from missing ones.
    async fn owned_bet(&self, bet_id: &str, user: &User) -> Result<Bet, SettlementError> {
        let bet = self.guard(self.store.bet(bet_id)).await?;
        if bet.user_id != user.id {
            return Err(SettlementError::NotFound {
                entity: "Bet",
                id: bet_id.to_string(),
            });
        }
        Ok(bet)
    }

    async fn owned_habit(&self, habit_id: &str, user: &User) -> Result<Habit, SettlementError> {
        let habit = self.guard(self.store.habit(habit_id)).await?;
        if habit.user_id != user.id {
            return Err(bet_core::ValidationError::ForeignHabit {
                habit_id: habit_id.to_string(),
                user_id: user.id.clone(),
            }
            .into());
        }
        Ok(habit)
    }

    fn points_entry(
        &self,
        user_id: &str,
        kind: PointsKind,
        amount: i64,
        metadata: Metadata,
        dedup_key: Option<String>,
    ) -> PointsEntry {
        PointsEntry {
            id: self.ids.new_id(),
            user_id: user_id.to_string(),
            kind,
            amount,
            metadata: Json(metadata),
            dedup_key,
            created_at: self.clock.now(),
        }
    }

    /// Append a non-critical award. Failures are logged, not surfaced: the
    /// operation that earned the award has already succeeded.
    async fn award(&self, user_id: &str, kind: PointsKind, amount: i64, metadata: Metadata) {
        let entry = self.points_entry(user_id, kind, amount, metadata, None);
        if let Err(err) = self.guard(self.store.insert_points(&entry)).await {
            warn!(
                "failed to award {} {} points to {}: {}",
                amount, kind, user_id, err
            );
        }
    }

    /// Create a habit for the wallet's user, initializing its streak row.
    pub async fn create_habit(
        &self,
        wallet_address: &str,
        new: NewHabit,
    ) -> Result<Habit, SettlementError> {
        let user = self.ensure_user(wallet_address).await?;
        let now = self.clock.now();

        let habit = Habit {
            id: self.ids.new_id(),
            user_id: user.id.clone(),
            name: new.name,
            description: new.description,
            category: new.category,
            goal: new.goal,
            positive_actions: Json(new.positive_actions),
            negative_actions: Json(new.negative_actions),
            created_at: now,
        };
        self.guard(self.store.create_habit(&habit)).await?;

        let streak = Streak {
            id: self.ids.new_id(),
            habit_id: habit.id.clone(),
            user_id: user.id.clone(),
            current_streak: 0,
            longest_streak: 0,
            last_log_date: None,
            updated_at: now,
        };
        self.guard(self.store.init_streak(&streak)).await?;

        info!("created habit {} ({}) for user {}", habit.id, habit.name, user.id);

        let mut metadata = Metadata::new();
        metadata.insert("habit_id".to_string(), json!(habit.id));
        metadata.insert("habit_name".to_string(), json!(habit.name));
        self.award(
            &user.id,
            PointsKind::HabitCreated,
            self.config.points.habit_created_points,
            metadata,
        )
        .await;

        Ok(habit)
    }

    /// Record one performed action on a habit.
    ///
    /// Advances the streak (at most once per calendar day), writes the
    /// immutable log row, and appends the earned points to the ledger. When
    /// the check-in carries the streak onto a milestone length, the milestone
    /// bonus is appended as a separate entry.
    pub async fn record_check_in(
        &self,
        wallet_address: &str,
        habit_id: &str,
        action_name: &str,
        action_kind: ActionKind,
        base_points: Option<i64>,
    ) -> Result<CheckInReceipt, SettlementError> {
        let user = self.require_user(wallet_address).await?;
        let habit = self.owned_habit(habit_id, &user).await?;
        let today = self.clock.today();
        let now = self.clock.now();

        let prev = self.guard(self.store.streak(&habit.id, &user.id)).await?;
        let snapshot = prev.as_ref().map(|s| StreakSnapshot {
            current: s.current_streak,
            longest: s.longest_streak,
            last_log_date: s.last_log_date,
        });
        let mut update = advance(snapshot.as_ref(), today);

        let row = Streak {
            id: prev
                .as_ref()
                .map(|s| s.id.clone())
                .unwrap_or_else(|| self.ids.new_id()),
            habit_id: habit.id.clone(),
            user_id: user.id.clone(),
            current_streak: update.current,
            longest_streak: update.longest,
            last_log_date: Some(today),
            updated_at: now,
        };
        let prev_date = snapshot.as_ref().and_then(|s| s.last_log_date);
        if !self.guard(self.store.upsert_streak(&row, prev_date)).await? {
            // a concurrent check-in moved the row first; today is already
            // counted, so take the stored values and award no advance
            if let Some(stored) = self.guard(self.store.streak(&habit.id, &user.id)).await? {
                update = StreakUpdate {
                    current: stored.current_streak,
                    longest: stored.longest_streak,
                    advanced: false,
                };
            }
        }

        let base = base_points.unwrap_or(self.config.points.default_base_points);
        let points_earned = check_in_points(base, update.current, &self.config.points);

        let log = CheckInLog {
            id: self.ids.new_id(),
            habit_id: habit.id.clone(),
            user_id: user.id.clone(),
            action_kind,
            action_name: action_name.to_string(),
            points_earned,
            logged_at: now,
        };
        self.guard(self.store.insert_log(&log)).await?;

        let mut metadata = Metadata::new();
        metadata.insert("habit_id".to_string(), json!(habit.id));
        metadata.insert("action_kind".to_string(), json!(action_kind.as_str()));
        metadata.insert("action_name".to_string(), json!(action_name));
        metadata.insert("log_id".to_string(), json!(log.id));
        metadata.insert("streak".to_string(), json!(update.current));
        let entry = self.points_entry(&user.id, PointsKind::HabitLog, points_earned, metadata, None);
        self.guard(self.store.insert_points(&entry)).await?;

        let milestone_bonus = if milestone_reached(&update, &self.config.points) {
            let bonus = self.config.points.milestone_bonus;
            let mut metadata = Metadata::new();
            metadata.insert("habit_id".to_string(), json!(habit.id));
            metadata.insert("streak".to_string(), json!(update.current));
            metadata.insert(
                "milestone".to_string(),
                json!(format!("{} day streak", update.current)),
            );
            let entry =
                self.points_entry(&user.id, PointsKind::StreakMilestone, bonus, metadata, None);
            self.guard(self.store.insert_points(&entry)).await?;
            info!(
                "user {} reached a {}-day streak on habit {}",
                user.id, update.current, habit.id
            );
            Some(bonus)
        } else {
            None
        };

        debug!(
            "check-in on habit {} by {}: {} points, streak {}",
            habit.id, user.id, points_earned, update.current
        );

        Ok(CheckInReceipt {
            log_id: log.id,
            points_earned,
            current_streak: update.current,
            longest_streak: update.longest,
            milestone_bonus,
        })
    }

    /// Place a new bet. The stake is assumed to be locked in escrow by the
    /// caller; `stake_reference` is stored opaque.
    pub async fn create_bet(
        &self,
        wallet_address: &str,
        new: NewBet,
    ) -> Result<Bet, SettlementError> {
        validate_new_bet(new.stake_amount, new.duration_days)?;
        let user = self.ensure_user(wallet_address).await?;
        if let Some(habit_id) = &new.habit_id {
            self.owned_habit(habit_id, &user).await?;
        }

        let start_date = self.clock.today();
        let end_date = start_date + chrono::Duration::days(new.duration_days);
        let bet = Bet {
            id: self.ids.new_id(),
            user_id: user.id.clone(),
            habit_id: new.habit_id,
            goal_description: new.goal_description,
            stake_amount: new.stake_amount,
            duration_days: new.duration_days,
            start_date,
            end_date,
            status: BetStatus::Active,
            daily_log_required: new.daily_log_required,
            missed_days: 0,
            stake_reference: new.stake_reference,
            payout_reference: None,
            created_at: self.clock.now(),
            resolved_at: None,
        };
        self.guard(self.store.create_bet(&bet)).await?;

        info!(
            "created bet {} for user {}: {} minor units over {} days",
            bet.id, user.id, bet.stake_amount, bet.duration_days
        );

        let mut metadata = Metadata::new();
        metadata.insert("bet_id".to_string(), json!(bet.id));
        metadata.insert("stake_amount".to_string(), json!(bet.stake_amount));
        metadata.insert("duration_days".to_string(), json!(bet.duration_days));
        self.award(
            &user.id,
            PointsKind::BetCreated,
            self.config.points.bet_created_points,
            metadata,
        )
        .await;

        Ok(bet)
    }

    /// Push a recomputed missed-day count from the scheduler.
    ///
    /// Set semantics: the new count replaces the old one. Does not touch
    /// status, and is rejected once the bet has been resolved.
    pub async fn update_missed_days(
        &self,
        bet_id: &str,
        wallet_address: &str,
        count: i64,
    ) -> Result<(), SettlementError> {
        validate_missed_days(count)?;
        let user = self.require_user(wallet_address).await?;
        let bet = self.owned_bet(bet_id, &user).await?;
        if bet.status.is_terminal() {
            return Err(SettlementError::AlreadyResolved { status: bet.status });
        }

        if !self.guard(self.store.set_missed_days(&bet.id, count)).await? {
            let current = self.guard(self.store.bet(&bet.id)).await?;
            return Err(SettlementError::AlreadyResolved {
                status: current.status,
            });
        }

        debug!("bet {} missed days set to {}", bet.id, count);
        Ok(())
    }

    /// Settle an expired bet: judge the outcome, split the stake, persist
    /// the transition exactly once, then award outcome points.
    ///
    /// The status write is conditional on the bet still being active, so of
    /// two concurrent calls exactly one returns a [`Resolution`]; the other
    /// gets [`SettlementError::AlreadyResolved`]. If the points append fails
    /// after the committed transition, the error is
    /// [`SettlementError::PartialSettlement`] and only
    /// [`retry_outcome_points`](Self::retry_outcome_points) should be retried.
    pub async fn resolve_bet(
        &self,
        bet_id: &str,
        wallet_address: &str,
        payout_reference: Option<&str>,
    ) -> Result<Resolution, SettlementError> {
        let user = self.require_user(wallet_address).await?;
        let bet = self.owned_bet(bet_id, &user).await?;
        if bet.status.is_terminal() {
            return Err(SettlementError::AlreadyResolved { status: bet.status });
        }

        let today = self.clock.today();
        if today < bet.end_date {
            return Err(SettlementError::TooEarly {
                end_date: bet.end_date,
            });
        }

        // Snapshot progress. A late check-in landing between this read and
        // the conditional write below does not reopen the decision.
        let logged_days = match (&bet.habit_id, bet.daily_log_required) {
            (Some(habit_id), true) => Some(
                self.guard(self.store.count_logged_days(
                    habit_id,
                    &user.id,
                    bet.start_date,
                    bet.end_date,
                ))
                .await?,
            ),
            _ => None,
        };

        let terms = BetTerms {
            duration_days: bet.duration_days,
            daily_log_required: bet.daily_log_required,
            missed_days: bet.missed_days,
        };
        let decision = determine_outcome(&terms, logged_days);
        let payout = compute_payout(bet.stake_amount, decision.outcome);
        let resolved_at = self.clock.now();

        if !self
            .guard(
                self.store
                    .resolve_bet(&bet.id, decision.outcome, resolved_at, payout_reference),
            )
            .await?
        {
            let current = self.guard(self.store.bet(&bet.id)).await?;
            return Err(SettlementError::AlreadyResolved {
                status: current.status,
            });
        }

        info!(
            "bet {} resolved as {}: {} (user payout {}, platform rake {})",
            bet.id, decision.outcome, decision.reason, payout.user_payout, payout.platform_rake
        );

        let points = outcome_points(decision.outcome, &self.config.points);
        if let Some(kind) = decision.outcome.points_kind() {
            let mut metadata = Metadata::new();
            metadata.insert("bet_id".to_string(), json!(bet.id));
            metadata.insert("stake_amount".to_string(), json!(bet.stake_amount));
            metadata.insert("payout".to_string(), json!(payout.user_payout));
            metadata.insert("reason".to_string(), json!(decision.reason));
            let entry = self.points_entry(
                &user.id,
                kind,
                points,
                metadata,
                Some(outcome_dedup_key(&bet.id)),
            );
            if let Err(err) = self.guard(self.store.insert_points(&entry)).await {
                return Err(SettlementError::PartialSettlement {
                    bet_id: bet.id.clone(),
                    outcome: decision.outcome,
                    points,
                    source: Box::new(err),
                });
            }
        }

        Ok(Resolution {
            bet_id: bet.id,
            outcome: decision.outcome,
            reason: decision.reason,
            stake_amount: bet.stake_amount,
            user_payout: payout.user_payout,
            platform_rake: payout.platform_rake,
            payout_reference: payout_reference.map(str::to_string),
            points_awarded: points,
            resolved_at,
        })
    }

    /// Re-append the outcome award for an already-resolved bet.
    ///
    /// Idempotent: the award carries a deterministic dedup key per bet, so
    /// calling this after a [`SettlementError::PartialSettlement`] (or
    /// repeatedly) credits the points at most once. Returns the award size.
    pub async fn retry_outcome_points(
        &self,
        bet_id: &str,
        wallet_address: &str,
    ) -> Result<i64, SettlementError> {
        let user = self.require_user(wallet_address).await?;
        let bet = self.owned_bet(bet_id, &user).await?;

        let outcome = match bet.status {
            BetStatus::Active => {
                return Err(SettlementError::StillActive { bet_id: bet.id });
            }
            BetStatus::Won => BetOutcome::Won,
            BetStatus::Lost => BetOutcome::Lost,
            BetStatus::Forfeited => BetOutcome::Forfeited,
        };
        let Some(kind) = outcome.points_kind() else {
            return Ok(0);
        };

        let points = outcome_points(outcome, &self.config.points);
        let payout = compute_payout(bet.stake_amount, outcome);
        let mut metadata = Metadata::new();
        metadata.insert("bet_id".to_string(), json!(bet.id));
        metadata.insert("stake_amount".to_string(), json!(bet.stake_amount));
        metadata.insert("payout".to_string(), json!(payout.user_payout));
        let entry = self.points_entry(
            &user.id,
            kind,
            points,
            metadata,
            Some(outcome_dedup_key(&bet.id)),
        );

        if self.guard(self.store.insert_points(&entry)).await? {
            info!("recovered {} outcome points for bet {}", points, bet.id);
        } else {
            debug!("outcome points for bet {} already awarded", bet.id);
        }
        Ok(points)
    }

    /// A bet with derived display fields: days remaining and, for
    /// habit-linked bets, advisory progress numbers.
    pub async fn get_bet(
        &self,
        bet_id: &str,
        wallet_address: &str,
    ) -> Result<BetView, SettlementError> {
        let user = self.require_user(wallet_address).await?;
        let bet = self.owned_bet(bet_id, &user).await?;
        let today = self.clock.today();
        let days_remaining = (bet.end_date - today).num_days().max(0);

        let progress = match &bet.habit_id {
            Some(habit_id) => {
                let logged = self
                    .guard(self.store.count_logged_days(
                        habit_id,
                        &user.id,
                        bet.start_date,
                        bet.end_date,
                    ))
                    .await?;
                let total = bet.duration_days;
                let elapsed = ((today - bet.start_date).num_days() + 1).clamp(0, total);
                Some(BetProgress {
                    logged_days: logged,
                    total_days: total,
                    required_days: required_logged_days(total),
                    percent_complete: (logged * 100 / total).min(100),
                    on_track: logged >= required_logged_days(elapsed),
                })
            }
            None => None,
        };

        Ok(BetView {
            bet,
            days_remaining,
            progress,
        })
    }

    /// List the wallet's bets, optionally filtered by status.
    pub async fn list_bets(
        &self,
        wallet_address: &str,
        status: Option<BetStatus>,
    ) -> Result<Vec<Bet>, SettlementError> {
        let user = self.require_user(wallet_address).await?;
        self.guard(self.store.list_bets(&user.id, status)).await
    }

    /// Attach the escrow settlement reference to a resolved bet.
    ///
    /// The one field of a resolved bet that may still change. Active bets
    /// have nothing to attach yet.
    pub async fn attach_payout_reference(
        &self,
        bet_id: &str,
        wallet_address: &str,
        payout_reference: &str,
    ) -> Result<(), SettlementError> {
        let user = self.require_user(wallet_address).await?;
        let bet = self.owned_bet(bet_id, &user).await?;
        if !bet.status.is_terminal() {
            return Err(SettlementError::StillActive { bet_id: bet.id });
        }
        self.guard(
            self.store
                .attach_payout_reference(&bet.id, payout_reference),
        )
        .await?;
        info!("attached payout reference to bet {}", bet.id);
        Ok(())
    }

    /// The wallet's total score: the sum of all their ledger entries.
    pub async fn points_total(&self, wallet_address: &str) -> Result<i64, SettlementError> {
        let user = self.require_user(wallet_address).await?;
        self.guard(self.store.points_total(&user.id)).await
    }

    /// The wallet's recent ledger entries, newest first.
    pub async fn points_history(
        &self,
        wallet_address: &str,
        limit: i64,
    ) -> Result<Vec<PointsEntry>, SettlementError> {
        let user = self.require_user(wallet_address).await?;
        self.guard(self.store.points_history(&user.id, limit)).await
    }

    /// Recent check-ins on one of the wallet's habits, newest first.
    pub async fn habit_logs(
        &self,
        wallet_address: &str,
        habit_id: &str,
        limit: i64,
    ) -> Result<Vec<CheckInLog>, SettlementError> {
        let user = self.require_user(wallet_address).await?;
        let habit = self.owned_habit(habit_id, &user).await?;
        self.guard(self.store.list_logs(&habit.id, limit)).await
    }

    /// Ranked leaderboard with the caller's own rank, when their wallet is
    /// supplied. The caller's rank is looked up over the full ranking, even
    /// when it falls past the requested page.
    pub async fn leaderboard(
        &self,
        kind: LeaderboardKind,
        limit: usize,
        caller_wallet: Option<&str>,
    ) -> Result<Leaderboard, SettlementError> {
        let rows = match kind {
            LeaderboardKind::Points => self.guard(self.store.points_leaderboard()).await?,
            LeaderboardKind::Streak => self.guard(self.store.streak_leaderboard()).await?,
        };

        let caller_rank = caller_wallet.and_then(|wallet| {
            rows.iter()
                .position(|row| row.wallet_address == wallet)
                .map(|index| entry_at(&rows, index))
        });

        let limit = limit.min(self.config.leaderboard_max);
        let entries = (0..rows.len().min(limit))
            .map(|index| entry_at(&rows, index))
            .collect();

        Ok(Leaderboard {
            kind,
            entries,
            caller_rank,
        })
    }
}

/// Dedup key for a bet's outcome award: at most one such entry can ever
/// land in the ledger.
fn outcome_dedup_key(bet_id: &str) -> String {
    format!("bet-outcome:{}", bet_id)
}

fn entry_at(rows: &[LeaderboardRow], index: usize) -> LeaderboardEntry {
    let row = &rows[index];
    LeaderboardEntry {
        rank: index + 1,
        wallet_address: row.wallet_address.clone(),
        username: row.username.clone(),
        value: row.value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bet_core::{FixedClock, SequentialIds, ValidationError};
    use chrono::NaiveDate;

    use crate::store::MemoryStore;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn service() -> (SettlementService<MemoryStore>, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::at_midnight(day("2026-08-01")));
        let service = SettlementService::new(
            MemoryStore::new(),
            clock.clone(),
            Arc::new(SequentialIds::new()),
            ServiceConfig::default(),
        );
        (service, clock)
    }

    fn new_bet(stake: i64, duration: i64, habit_id: Option<String>) -> NewBet {
        NewBet {
            goal_description: "Run every day".to_string(),
            stake_amount: stake,
            duration_days: duration,
            daily_log_required: true,
            habit_id,
            stake_reference: None,
        }
    }

    async fn make_habit(service: &SettlementService<MemoryStore>, wallet: &str) -> Habit {
        service
            .create_habit(
                wallet,
                NewHabit {
                    name: "Morning run".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    async fn check_in(
        service: &SettlementService<MemoryStore>,
        wallet: &str,
        habit_id: &str,
    ) -> CheckInReceipt {
        service
            .record_check_in(wallet, habit_id, "Ran 5k", ActionKind::Positive, None)
            .await
            .unwrap()
    }

    async fn user_id(service: &SettlementService<MemoryStore>, wallet: &str) -> String {
        service
            .store()
            .user_by_wallet(wallet)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_create_bet_validates_inputs() {
        let (service, _clock) = service();

        let err = service
            .create_bet("w1", new_bet(0, 10, None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettlementError::Validation(ValidationError::InvalidStake(0))
        ));

        let err = service
            .create_bet("w1", new_bet(100, 366, None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettlementError::Validation(ValidationError::InvalidDuration(366))
        ));
    }

    #[tokio::test]
    async fn test_create_bet_rejects_foreign_habit() {
        let (service, _clock) = service();
        let habit = make_habit(&service, "w1").await;

        let err = service
            .create_bet("w2", new_bet(100, 10, Some(habit.id)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettlementError::Validation(ValidationError::ForeignHabit { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_before_end_date_fails() {
        let (service, _clock) = service();
        let bet = service
            .create_bet("w1", new_bet(1_000_000, 10, None))
            .await
            .unwrap();

        let err = service.resolve_bet(&bet.id, "w1", None).await.unwrap_err();
        assert!(matches!(
            err,
            SettlementError::TooEarly { end_date } if end_date == day("2026-08-11")
        ));
    }

    #[tokio::test]
    async fn test_resolve_within_threshold_wins() {
        let (service, clock) = service();
        let bet = service
            .create_bet("w1", new_bet(1_000_000, 10, None))
            .await
            .unwrap();
        service.update_missed_days(&bet.id, "w1", 2).await.unwrap();

        clock.advance_days(10);
        let resolution = service
            .resolve_bet(&bet.id, "w1", Some("sig-1"))
            .await
            .unwrap();

        assert_eq!(resolution.outcome, BetOutcome::Won);
        assert_eq!(resolution.user_payout, 1_000_000);
        assert_eq!(resolution.platform_rake, 0);
        assert_eq!(resolution.points_awarded, 100);
        assert_eq!(
            resolution.reason,
            "Completed with 2 missed days (threshold: 3)"
        );

        let stored = service.store().bet(&bet.id).await.unwrap();
        assert_eq!(stored.status, BetStatus::Won);
        assert!(stored.resolved_at.is_some());
        assert_eq!(stored.payout_reference.as_deref(), Some("sig-1"));

        // second attempt loses the guard
        let err = service.resolve_bet(&bet.id, "w1", None).await.unwrap_err();
        assert!(matches!(
            err,
            SettlementError::AlreadyResolved {
                status: BetStatus::Won
            }
        ));
    }

    #[tokio::test]
    async fn test_excess_missed_days_forfeit() {
        let (service, clock) = service();
        let bet = service
            .create_bet("w1", new_bet(1_000_000, 10, None))
            .await
            .unwrap();
        service.update_missed_days(&bet.id, "w1", 4).await.unwrap();

        clock.advance_days(10);
        let resolution = service.resolve_bet(&bet.id, "w1", None).await.unwrap();

        assert_eq!(resolution.outcome, BetOutcome::Forfeited);
        assert_eq!(resolution.user_payout, 0);
        assert_eq!(resolution.platform_rake, 1_000_000);
        assert_eq!(resolution.points_awarded, 0);

        // forfeits earn no ledger entry
        let uid = user_id(&service, "w1").await;
        let entries = service.store().points_for_user(&uid).await;
        assert!(entries
            .iter()
            .all(|e| !matches!(e.kind, PointsKind::BetWon | PointsKind::BetLost)));
    }

    #[tokio::test]
    async fn test_habit_linked_loss_payout() {
        let (service, clock) = service();
        let habit = make_habit(&service, "w1").await;
        let bet = service
            .create_bet("w1", new_bet(1_000_000, 10, Some(habit.id.clone())))
            .await
            .unwrap();

        // 6 distinct logged days out of the 7 required
        for _ in 0..6 {
            check_in(&service, "w1", &habit.id).await;
            clock.advance_days(1);
        }
        service.update_missed_days(&bet.id, "w1", 1).await.unwrap();

        clock.advance_days(4);
        let resolution = service.resolve_bet(&bet.id, "w1", None).await.unwrap();

        assert_eq!(resolution.outcome, BetOutcome::Lost);
        assert_eq!(resolution.reason, "Only logged 6/10 days (required: 7)");
        assert_eq!(resolution.user_payout, 475_000);
        assert_eq!(resolution.platform_rake, 525_000);
        assert_eq!(
            resolution.user_payout + resolution.platform_rake,
            resolution.stake_amount
        );
        assert_eq!(resolution.points_awarded, 25);
    }

    #[tokio::test]
    async fn test_habit_linked_win() {
        let (service, clock) = service();
        let habit = make_habit(&service, "w1").await;
        let bet = service
            .create_bet("w1", new_bet(500_000, 10, Some(habit.id.clone())))
            .await
            .unwrap();

        for _ in 0..7 {
            check_in(&service, "w1", &habit.id).await;
            clock.advance_days(1);
        }

        clock.advance_days(3);
        let resolution = service.resolve_bet(&bet.id, "w1", None).await.unwrap();
        assert_eq!(resolution.outcome, BetOutcome::Won);
        assert_eq!(resolution.reason, "Logged 7/10 days (required: 7)");
        assert_eq!(resolution.user_payout, 500_000);
    }

    #[tokio::test]
    async fn test_same_day_check_in_is_idempotent() {
        let (service, _clock) = service();
        let habit = make_habit(&service, "w1").await;

        let first = check_in(&service, "w1", &habit.id).await;
        assert_eq!(first.current_streak, 1);
        assert_eq!(first.points_earned, 15); // 10 base + 5 streak bonus

        let second = check_in(&service, "w1", &habit.id).await;
        assert_eq!(second.current_streak, 1);
        assert_eq!(second.longest_streak, 1);
        assert!(second.milestone_bonus.is_none());

        let uid = user_id(&service, "w1").await;
        let streak = service.store().streak(&habit.id, &uid).await.unwrap().unwrap();
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.longest_streak, 1);
    }

    #[tokio::test]
    async fn test_penalty_actions_earn_no_bonus() {
        let (service, _clock) = service();
        let habit = make_habit(&service, "w1").await;

        let receipt = service
            .record_check_in("w1", &habit.id, "Skipped", ActionKind::Negative, Some(-5))
            .await
            .unwrap();
        assert_eq!(receipt.points_earned, -5);
    }

    #[tokio::test]
    async fn test_milestone_awarded_once() {
        let (service, clock) = service();
        let habit = make_habit(&service, "w1").await;

        let mut last = None;
        for i in 0..7 {
            if i > 0 {
                clock.advance_days(1);
            }
            last = Some(check_in(&service, "w1", &habit.id).await);
        }
        let seventh = last.unwrap();
        assert_eq!(seventh.current_streak, 7);
        assert_eq!(seventh.milestone_bonus, Some(50));
        // 10 base + capped 35 bonus at streak 7
        assert_eq!(seventh.points_earned, 45);

        // re-logging on the milestone day earns no second milestone
        let again = check_in(&service, "w1", &habit.id).await;
        assert!(again.milestone_bonus.is_none());

        let uid = user_id(&service, "w1").await;
        let milestones = service
            .store()
            .points_for_user(&uid)
            .await
            .into_iter()
            .filter(|e| e.kind == PointsKind::StreakMilestone)
            .count();
        assert_eq!(milestones, 1);
    }

    #[tokio::test]
    async fn test_partial_settlement_and_idempotent_retry() {
        let (service, clock) = service();
        let bet = service
            .create_bet("w1", new_bet(1_000_000, 10, None))
            .await
            .unwrap();

        clock.advance_days(10);
        service.store().fail_next_points_append();
        let err = service.resolve_bet(&bet.id, "w1", None).await.unwrap_err();
        assert!(matches!(
            err,
            SettlementError::PartialSettlement {
                outcome: BetOutcome::Won,
                points: 100,
                ..
            }
        ));

        // the transition itself is committed
        let stored = service.store().bet(&bet.id).await.unwrap();
        assert_eq!(stored.status, BetStatus::Won);

        // retrying the award step credits the points exactly once
        assert_eq!(
            service.retry_outcome_points(&bet.id, "w1").await.unwrap(),
            100
        );
        assert_eq!(
            service.retry_outcome_points(&bet.id, "w1").await.unwrap(),
            100
        );

        let uid = user_id(&service, "w1").await;
        let won_entries: Vec<_> = service
            .store()
            .points_for_user(&uid)
            .await
            .into_iter()
            .filter(|e| e.kind == PointsKind::BetWon)
            .collect();
        assert_eq!(won_entries.len(), 1);
        assert_eq!(won_entries[0].amount, 100);
    }

    #[tokio::test]
    async fn test_retry_outcome_points_requires_resolution() {
        let (service, _clock) = service();
        let bet = service
            .create_bet("w1", new_bet(100, 10, None))
            .await
            .unwrap();

        let err = service
            .retry_outcome_points(&bet.id, "w1")
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::StillActive { .. }));
    }

    #[tokio::test]
    async fn test_update_missed_days_rules() {
        let (service, clock) = service();
        let bet = service
            .create_bet("w1", new_bet(100, 10, None))
            .await
            .unwrap();

        let err = service
            .update_missed_days(&bet.id, "w1", -1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettlementError::Validation(ValidationError::InvalidCount(-1))
        ));

        // last write wins, including decreases
        service.update_missed_days(&bet.id, "w1", 5).await.unwrap();
        service.update_missed_days(&bet.id, "w1", 2).await.unwrap();
        assert_eq!(service.store().bet(&bet.id).await.unwrap().missed_days, 2);

        clock.advance_days(10);
        service.resolve_bet(&bet.id, "w1", None).await.unwrap();
        let err = service
            .update_missed_days(&bet.id, "w1", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::AlreadyResolved { .. }));
    }

    #[tokio::test]
    async fn test_other_users_bets_are_invisible() {
        let (service, _clock) = service();
        let bet = service
            .create_bet("w1", new_bet(100, 10, None))
            .await
            .unwrap();
        // w2 must exist to get past the user lookup
        make_habit(&service, "w2").await;

        let err = service.resolve_bet(&bet.id, "w2", None).await.unwrap_err();
        assert!(matches!(err, SettlementError::NotFound { entity: "Bet", .. }));
    }

    #[tokio::test]
    async fn test_bet_progress_view() {
        let (service, clock) = service();
        let habit = make_habit(&service, "w1").await;
        let bet = service
            .create_bet("w1", new_bet(100, 10, Some(habit.id.clone())))
            .await
            .unwrap();

        for _ in 0..3 {
            check_in(&service, "w1", &habit.id).await;
            clock.advance_days(1);
        }

        let view = service.get_bet(&bet.id, "w1").await.unwrap();
        assert_eq!(view.days_remaining, 7);
        let progress = view.progress.unwrap();
        assert_eq!(progress.logged_days, 3);
        assert_eq!(progress.total_days, 10);
        assert_eq!(progress.required_days, 7);
        assert_eq!(progress.percent_complete, 30);
        // 3 logged over 4 elapsed days, pace requirement ceil(4 * 0.7) = 3
        assert!(progress.on_track);
    }

    #[tokio::test]
    async fn test_leaderboards_and_caller_rank() {
        let (service, _clock) = service();

        // w1: habit (25) + two same-day check-ins (15 each) = 55
        let h1 = make_habit(&service, "w1").await;
        check_in(&service, "w1", &h1.id).await;
        check_in(&service, "w1", &h1.id).await;
        // w2: habit only = 25
        make_habit(&service, "w2").await;
        // w3: habit (25) + one check-in (15) = 40
        let h3 = make_habit(&service, "w3").await;
        check_in(&service, "w3", &h3.id).await;

        let board = service
            .leaderboard(LeaderboardKind::Points, 2, Some("w2"))
            .await
            .unwrap();
        assert_eq!(board.entries.len(), 2);
        assert_eq!(board.entries[0].wallet_address, "w1");
        assert_eq!(board.entries[0].value, 55);
        assert_eq!(board.entries[0].rank, 1);
        assert_eq!(board.entries[1].wallet_address, "w3");
        assert_eq!(board.entries[1].value, 40);

        // caller's rank is found past the page cut
        let caller = board.caller_rank.unwrap();
        assert_eq!(caller.rank, 3);
        assert_eq!(caller.value, 25);

        // streak board excludes users who never checked in
        let board = service
            .leaderboard(LeaderboardKind::Streak, 10, None)
            .await
            .unwrap();
        assert_eq!(board.entries.len(), 2);
        assert!(board
            .entries
            .iter()
            .all(|e| e.wallet_address != "w2" && e.value == 1));
    }

    #[tokio::test]
    async fn test_points_queries() {
        let (service, _clock) = service();
        let habit = make_habit(&service, "w1").await;
        check_in(&service, "w1", &habit.id).await;

        // habit_created 25 + check-in 15
        assert_eq!(service.points_total("w1").await.unwrap(), 40);

        let history = service.points_history("w1", 10).await.unwrap();
        assert_eq!(history.len(), 2);

        let logs = service.habit_logs("w1", &habit.id, 10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].points_earned, 15);
    }

    #[tokio::test]
    async fn test_attach_payout_reference_after_resolution() {
        let (service, clock) = service();
        let bet = service
            .create_bet("w1", new_bet(100, 10, None))
            .await
            .unwrap();

        // nothing to attach while the bet is still running
        let err = service
            .attach_payout_reference(&bet.id, "w1", "sig-9")
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::StillActive { .. }));

        clock.advance_days(10);
        service.resolve_bet(&bet.id, "w1", None).await.unwrap();

        service
            .attach_payout_reference(&bet.id, "w1", "sig-9")
            .await
            .unwrap();
        let stored = service.store().bet(&bet.id).await.unwrap();
        assert_eq!(stored.payout_reference.as_deref(), Some("sig-9"));
    }

    #[tokio::test]
    async fn test_check_in_unknown_wallet() {
        let (service, _clock) = service();
        let err = service
            .record_check_in("ghost", "h1", "Ran", ActionKind::Positive, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::NotFound { entity: "User", .. }));
    }
}
