//! Periodic refresh
//!
//! One `RefreshScheduler` owns every timer. It follows the session: a
//! connected account gets a positions timer and a market timer under a
//! child of the shutdown token; a disconnect or account switch cancels them
//! before anything is started for the next account.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::RefreshConfig;
use crate::engine::Engine;
use crate::session::SessionState;

pub struct RefreshScheduler {
    engine: Engine,
    positions_every: Duration,
    market_every: Duration,
    shutdown: CancellationToken,
}

impl RefreshScheduler {
    pub fn new(engine: Engine, config: &RefreshConfig, shutdown: CancellationToken) -> Self {
        Self::with_intervals(
            engine,
            Duration::from_secs(config.positions_secs.max(1)),
            Duration::from_secs(config.balances_secs.max(1)),
            shutdown,
        )
    }

    pub fn with_intervals(
        engine: Engine,
        positions_every: Duration,
        market_every: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            engine,
            positions_every,
            market_every,
            shutdown,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut session = self.engine.session().subscribe();
        let mut current = *session.borrow_and_update();
        let mut timers = self.start_timers(current);
        println!("[SCHEDULER] Started (positions every {:?}, market every {:?})", self.positions_every, self.market_every);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    println!("[SCHEDULER] Shutting down");
                    tracing::info!("Refresh scheduler stopped");
                    break;
                }
                changed = session.changed() => {
                    if changed.is_err() {
                        tracing::warn!("Session closed, stopping scheduler");
                        break;
                    }
                    let next = *session.borrow_and_update();

                    if next.account != current.account {
                        if let Some(timers) = timers.take() {
                            timers.cancel();
                        }
                        self.engine.reset_account_state().await;
                        timers = self.start_timers(next);
                    } else if next.chain_id != current.chain_id && next.account.is_some() {
                        tracing::info!(chain_id = ?next.chain_id, "Chain changed, re-reading pools");
                        let engine = self.engine.clone();
                        let token = timers.clone().unwrap_or_else(|| self.shutdown.child_token());
                        tokio::spawn(async move {
                            tokio::select! {
                                _ = token.cancelled() => {}
                                _ = engine.refresh_positions() => {}
                            }
                        });
                    }
                    current = next;
                }
            }
        }

        if let Some(timers) = timers {
            timers.cancel();
        }
    }

    fn start_timers(&self, state: SessionState) -> Option<CancellationToken> {
        let account = state.account?;
        let token = self.shutdown.child_token();
        tracing::info!(account = %account, "Starting refresh timers");

        spawn_timer("positions", self.positions_every, token.clone(), self.engine.clone(), |engine| async move {
            engine.refresh_positions().await;
        });
        spawn_timer("market", self.market_every, token.clone(), self.engine.clone(), |engine| async move {
            engine.refresh_market().await;
        });
        Some(token)
    }
}

/// Run `tick` every `every` (first tick immediately) until `token` is
/// cancelled. A tick in progress is abandoned on cancellation.
fn spawn_timer<F, Fut>(name: &'static str, every: Duration, token: CancellationToken, engine: Engine, tick: F)
where
    F: Fn(Engine) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tick(engine.clone()) => {}
                    }
                }
            }
        }
        tracing::debug!(timer = %name, "Refresh timer stopped");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::staking::IModxStaking;
    use crate::engine::testing::{fixture, mock_single_pool};
    use alloy_primitives::Address;

    const ALICE: Address = Address::repeat_byte(0xa1);
    const TICK: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn test_timers_follow_the_session() {
        let f = fixture(1);
        mock_single_pool(&f.chain, f.contracts.staking, ALICE, 10);
        let shutdown = CancellationToken::new();
        let handle = RefreshScheduler::with_intervals(f.engine.clone(), TICK, TICK, shutdown.clone()).spawn();

        tokio::time::sleep(TICK * 3).await;
        assert_eq!(f.chain.call_count::<IModxStaking::poolCountCall>(f.contracts.staking), 0);
        assert_eq!(f.feed.calls(), 0);

        f.engine.session().connect(ALICE, 97);
        tokio::time::sleep(TICK * 5).await;
        assert!(f.chain.call_count::<IModxStaking::poolCountCall>(f.contracts.staking) > 0);
        assert!(f.feed.calls() > 0);

        f.engine.session().disconnect();
        tokio::time::sleep(TICK * 2).await;
        let pool_reads = f.chain.call_count::<IModxStaking::poolCountCall>(f.contracts.staking);
        let price_reads = f.feed.calls();
        tokio::time::sleep(TICK * 5).await;
        assert_eq!(f.chain.call_count::<IModxStaking::poolCountCall>(f.contracts.staking), pool_reads);
        assert_eq!(f.feed.calls(), price_reads);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_running_timers() {
        let f = fixture(1);
        mock_single_pool(&f.chain, f.contracts.staking, ALICE, 10);
        f.engine.session().connect(ALICE, 97);
        let shutdown = CancellationToken::new();
        let handle = RefreshScheduler::with_intervals(f.engine.clone(), TICK, TICK, shutdown.clone()).spawn();

        tokio::time::sleep(TICK * 3).await;
        assert!(f.feed.calls() > 0);
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();

        tokio::time::sleep(TICK).await;
        let price_reads = f.feed.calls();
        tokio::time::sleep(TICK * 5).await;
        assert_eq!(f.feed.calls(), price_reads);
    }

    #[tokio::test]
    async fn test_account_switch_clears_state() {
        let f = fixture(1);
        mock_single_pool(&f.chain, f.contracts.staking, ALICE, 10);
        f.engine.session().connect(ALICE, 97);
        let shutdown = CancellationToken::new();
        let handle = RefreshScheduler::with_intervals(f.engine.clone(), TICK, TICK, shutdown.clone()).spawn();

        tokio::time::sleep(TICK * 3).await;
        assert_eq!(f.engine.stakes().await.unwrap().len(), 1);

        f.engine.session().switch_account(Address::repeat_byte(0xb0));
        tokio::time::sleep(TICK * 3).await;
        assert!(f.engine.stakes().await.unwrap().is_empty());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
