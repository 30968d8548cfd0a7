// In crates/engine/src/task.rs

use crate::Result;
use crate::backoff::{BackoffDecision, FailureBackoff};
use crate::notify_gate::NotificationGate;
use crate::session::SessionState;
use api_client::MarketData;
use app_config::types::{ScheduleSettings, TradingSettings};
use chrono::Utc;
use core_types::{Bar, Direction, SessionId, Signal, Symbol};
use execution::Executor;
use notifier::{Notifier, messages};
use risk::{PositionGate, RiskManager};
use std::sync::Arc;
use std::time::Duration;
use strategies::{CrossoverIndicator, create_indicator, latest_signal};
use tokio_util::sync::CancellationToken;

/// How a single tick ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The session was stopped before the tick began.
    Skipped,
    /// Bars or position could not be fetched; the failure was counted.
    FetchFailed { consecutive_failures: u32 },
    /// The failure threshold was reached. The job pauses this long.
    CooldownTriggered(Duration),
    InsufficientData { bars: usize, required: usize },
    NoSignal,
    /// The position gate dropped the signal.
    NotActionable(Direction),
    /// The exchange rejected the order. Nothing was recorded as announced.
    OrderFailed(Direction),
    OrderPlaced { direction: Direction, notified: bool },
    /// The session was stopped mid-tick; nothing further was sent.
    Aborted,
}

/// The trading pipeline shared by every session.
///
/// A tick is fetch, evaluate, gate, execute, notify. The task itself is
/// stateless across ticks: each session's memory lives in the `SessionState`
/// its job lends to `tick`.
pub struct TradingTask {
    symbol: Symbol,
    timeframe: String,
    bar_limit: u16,
    evaluate_forming_bar: bool,
    indicator: Box<dyn CrossoverIndicator>,
    risk_manager: Box<dyn RiskManager>,
    market_data: Arc<dyn MarketData>,
    executor: Arc<dyn Executor>,
    notifier: Arc<dyn Notifier>,
    backoff: FailureBackoff,
    notification_gate: NotificationGate,
    notification_retry_delay: Duration,
}

impl TradingTask {
    pub fn new(
        trading: &TradingSettings,
        schedule: &ScheduleSettings,
        market_data: Arc<dyn MarketData>,
        executor: Arc<dyn Executor>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let indicator = create_indicator(&trading.indicator)?;
        let risk_manager = Box::new(PositionGate::new(trading.order_size)?);

        tracing::info!(
            symbol = %trading.symbol,
            timeframe = %trading.timeframe,
            indicator = indicator.name(),
            fast = trading.indicator.fast_period,
            slow = trading.indicator.slow_period,
            risk_manager = risk_manager.name(),
            executor = executor.name(),
            notifier = notifier.name(),
            "Trading task assembled."
        );

        Ok(Self {
            symbol: trading.symbol(),
            timeframe: trading.timeframe.clone(),
            bar_limit: trading.bar_limit,
            evaluate_forming_bar: trading.evaluate_forming_bar,
            indicator,
            risk_manager,
            market_data,
            executor,
            notifier,
            backoff: FailureBackoff::new(schedule.failure_threshold, schedule.cooldown()),
            notification_gate: NotificationGate::new(trading.notify_policy),
            notification_retry_delay: schedule.notification_retry_delay(),
        })
    }

    pub fn backoff(&self) -> &FailureBackoff {
        &self.backoff
    }

    /// Runs one pass of the pipeline for `session`.
    ///
    /// `cancel` is checked before the order and before the notification, so
    /// a session stopped mid-tick produces neither.
    pub async fn tick(
        &self,
        session: SessionId,
        state: &mut SessionState,
        cancel: &CancellationToken,
    ) -> TickOutcome {
        if cancel.is_cancelled() {
            return TickOutcome::Skipped;
        }

        // --- 1. Fetch ---
        // The failure count resets only once every fetch of the tick has
        // succeeded; the position fetch below belongs to the same phase.
        let bars = match self.market_data.fetch_bars(&self.symbol, &self.timeframe, self.bar_limit).await {
            Ok(bars) => bars,
            Err(e) => return self.fetch_failed(session, state, "bars", &e),
        };
        let bars = self.evaluation_window(bars, Utc::now().timestamp_millis());

        // --- 2. Evaluate ---
        let required = self.indicator.required_bars();
        if bars.len() < required {
            tracing::info!(session = %session, bars = bars.len(), required, "Not enough bars to evaluate yet.");
            self.backoff.record_success(&mut state.consecutive_failures);
            return TickOutcome::InsufficientData { bars: bars.len(), required };
        }

        let states = self.indicator.compute(&bars);
        let Some(signal) = latest_signal(&bars, &states) else {
            self.backoff.record_success(&mut state.consecutive_failures);
            return TickOutcome::NoSignal;
        };
        tracing::info!(
            session = %session,
            direction = %signal.direction,
            price = %signal.price,
            bar_open_time = signal.timestamp,
            "Crossover detected."
        );

        // --- 3. Gate ---
        let position = match self.market_data.fetch_position(&self.symbol).await {
            Ok(position) => {
                self.backoff.record_success(&mut state.consecutive_failures);
                position
            }
            Err(e) => return self.fetch_failed(session, state, "position", &e),
        };
        let order_request = self.risk_manager.evaluate(&signal, &position);

        if cancel.is_cancelled() {
            tracing::info!(session = %session, "Session stopped mid-tick; discarding signal.");
            return TickOutcome::Aborted;
        }

        let Some(order_request) = order_request else {
            if self.notification_gate.announces_unplaced_signals() {
                self.announce(session, state, &signal, &messages::signal_without_order(&signal)).await;
            }
            return TickOutcome::NotActionable(signal.direction);
        };

        // --- 4. Execute ---
        // Orders are never retried; a duplicate fill is worse than a missed one.
        if let Err(e) = self.executor.execute(&order_request).await {
            tracing::error!(session = %session, direction = %signal.direction, error = %e, "Order failed.");
            if !cancel.is_cancelled() {
                self.deliver(session, &messages::order_failed(&signal, &e.to_string())).await;
            }
            return TickOutcome::OrderFailed(signal.direction);
        }

        // --- 5. Notify ---
        if cancel.is_cancelled() {
            tracing::info!(session = %session, "Session stopped after the order; skipping notification.");
            return TickOutcome::OrderPlaced { direction: signal.direction, notified: false };
        }
        let notified = self.announce(session, state, &signal, &messages::order_placed(&signal)).await;

        TickOutcome::OrderPlaced { direction: signal.direction, notified }
    }

    /// Drops the trailing bar while it is still forming, unless configured to
    /// evaluate it.
    fn evaluation_window(&self, mut bars: Vec<Bar>, now_millis: i64) -> Vec<Bar> {
        if !self.evaluate_forming_bar && bars.last().is_some_and(|bar| !bar.is_closed_at(now_millis)) {
            bars.pop();
        }
        bars
    }

    fn fetch_failed(
        &self,
        session: SessionId,
        state: &mut SessionState,
        what: &str,
        error: &api_client::Error,
    ) -> TickOutcome {
        match self.backoff.record_failure(&mut state.consecutive_failures) {
            BackoffDecision::Continue => {
                tracing::warn!(
                    session = %session,
                    what,
                    error = %error,
                    consecutive_failures = state.consecutive_failures,
                    "Fetch failed."
                );
                TickOutcome::FetchFailed { consecutive_failures: state.consecutive_failures }
            }
            BackoffDecision::Cooldown(cooldown) => {
                tracing::warn!(
                    session = %session,
                    what,
                    error = %error,
                    consecutive_failures = state.consecutive_failures,
                    cooldown_secs = cooldown.as_secs(),
                    "Failure threshold reached; cooling down."
                );
                TickOutcome::CooldownTriggered(cooldown)
            }
        }
    }

    /// Sends `text` if the notification gate admits `signal`. Returns whether
    /// the gate admitted it.
    async fn announce(&self, session: SessionId, state: &mut SessionState, signal: &Signal, text: &str) -> bool {
        if !self.notification_gate.admit(signal, &mut state.last_signal) {
            tracing::debug!(session = %session, direction = %signal.direction, "Same direction as last notice; staying quiet.");
            return false;
        }
        self.deliver(session, text).await;
        true
    }

    /// Best-effort delivery with a single retry.
    async fn deliver(&self, session: SessionId, text: &str) {
        let Err(first) = self.notifier.send(session, text).await else {
            return;
        };
        tracing::warn!(session = %session, error = %first, "Notification failed; retrying once.");

        tokio::time::sleep(self.notification_retry_delay).await;
        if let Err(e) = self.notifier.send(session, text).await {
            tracing::error!(session = %session, error = %e, "Notification dropped.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use app_config::NotifyPolicy;
    use rust_decimal::Decimal;
    use std::sync::atomic::Ordering;

    const SESSION: SessionId = SessionId(42);

    fn task_with(
        exchange: &Arc<FakeExchange>,
        notifier: &Arc<RecordingNotifier>,
        trading: TradingSettings,
    ) -> TradingTask {
        TradingTask::new(&trading, &schedule_settings(), exchange.clone(), exchange.clone(), notifier.clone())
            .unwrap()
    }

    fn task(exchange: &Arc<FakeExchange>, notifier: &Arc<RecordingNotifier>) -> TradingTask {
        task_with(exchange, notifier, trading_settings(NotifyPolicy::OnOrder))
    }

    #[tokio::test]
    async fn trades_both_crossovers_of_a_full_series() {
        let exchange = Arc::new(FakeExchange::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let task = task(&exchange, &notifier);
        let cancel = CancellationToken::new();
        let mut state = SessionState::default();
        let series = bars(&DIP_RISE_FALL);

        let mut outcomes = Vec::new();
        for n in 1..=series.len() {
            exchange.set_window(series[..n].to_vec());
            outcomes.push(task.tick(SESSION, &mut state, &cancel).await);
        }

        for (i, outcome) in outcomes.iter().enumerate() {
            let n = i + 1;
            let expected = match n {
                1..=4 => TickOutcome::InsufficientData { bars: n, required: 5 },
                9 => TickOutcome::OrderPlaced { direction: Direction::Buy, notified: true },
                18 => TickOutcome::OrderPlaced { direction: Direction::Sell, notified: true },
                _ => TickOutcome::NoSignal,
            };
            assert_eq!(outcome, &expected, "window of {} bars", n);
        }

        let sides: Vec<_> = exchange.orders().iter().map(|o| o.side).collect();
        assert_eq!(sides, vec![Direction::Buy, Direction::Sell]);
        assert!(exchange.orders().iter().all(|o| o.quantity == ORDER_SIZE));
        assert_eq!(exchange.position(), Decimal::ZERO);

        let delivered = notifier.delivered();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0], (SESSION, "🚀 <b>BUY</b> | Price: 109".to_string()));
        assert_eq!(delivered[1], (SESSION, "🔻 <b>SELL</b> | Price: 119".to_string()));
        assert_eq!(state.last_signal.map(|s| s.direction), Some(Direction::Sell));
    }

    #[tokio::test]
    async fn signal_matching_the_position_is_dropped() {
        let exchange = Arc::new(FakeExchange::with_window(bars(&DIP_RISE_FALL[..9])));
        exchange.set_position(ORDER_SIZE);
        let notifier = Arc::new(RecordingNotifier::default());
        let task = task(&exchange, &notifier);
        let mut state = SessionState::default();

        let outcome = task.tick(SESSION, &mut state, &CancellationToken::new()).await;

        assert_eq!(outcome, TickOutcome::NotActionable(Direction::Buy));
        assert!(exchange.orders().is_empty());
        assert!(notifier.delivered().is_empty());
        assert_eq!(state.last_signal, None);
    }

    #[tokio::test]
    async fn on_signal_policy_announces_dropped_signals() {
        let exchange = Arc::new(FakeExchange::with_window(bars(&DIP_RISE_FALL[..9])));
        exchange.set_position(ORDER_SIZE);
        let notifier = Arc::new(RecordingNotifier::default());
        let task = task_with(&exchange, &notifier, trading_settings(NotifyPolicy::OnSignal));
        let mut state = SessionState::default();

        let outcome = task.tick(SESSION, &mut state, &CancellationToken::new()).await;

        assert_eq!(outcome, TickOutcome::NotActionable(Direction::Buy));
        assert!(exchange.orders().is_empty());
        let delivered = notifier.delivered();
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].1.ends_with("no order"));
        assert_eq!(state.last_signal.map(|s| s.direction), Some(Direction::Buy));
    }

    #[tokio::test]
    async fn repeated_direction_trades_but_is_announced_once() {
        let exchange = Arc::new(FakeExchange::with_window(bars(&DIP_RISE_FALL[..9])));
        let notifier = Arc::new(RecordingNotifier::default());
        let task = task(&exchange, &notifier);
        let cancel = CancellationToken::new();
        let mut state = SessionState::default();

        let first = task.tick(SESSION, &mut state, &cancel).await;
        // Someone closed the position by hand; the next Buy is actionable again.
        exchange.set_position(Decimal::ZERO);
        let second = task.tick(SESSION, &mut state, &cancel).await;

        assert_eq!(first, TickOutcome::OrderPlaced { direction: Direction::Buy, notified: true });
        assert_eq!(second, TickOutcome::OrderPlaced { direction: Direction::Buy, notified: false });
        assert_eq!(exchange.orders().len(), 2);
        assert_eq!(notifier.delivered().len(), 1);

        exchange.set_window(bars(&DIP_RISE_FALL[..18]));
        let third = task.tick(SESSION, &mut state, &cancel).await;
        assert_eq!(third, TickOutcome::OrderPlaced { direction: Direction::Sell, notified: true });
        assert_eq!(notifier.delivered().len(), 2);
    }

    #[tokio::test]
    async fn failed_order_is_reported_and_not_recorded() {
        let exchange = Arc::new(FakeExchange::with_window(bars(&DIP_RISE_FALL[..9])));
        *exchange.fail_orders.lock().unwrap() = true;
        let notifier = Arc::new(RecordingNotifier::default());
        let task = task(&exchange, &notifier);
        let mut state = SessionState::default();

        let outcome = task.tick(SESSION, &mut state, &CancellationToken::new()).await;

        assert_eq!(outcome, TickOutcome::OrderFailed(Direction::Buy));
        assert_eq!(state.last_signal, None);
        let delivered = notifier.delivered();
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].1.contains("order failed"));

        // Once the exchange recovers, the same crossover is traded and announced.
        *exchange.fail_orders.lock().unwrap() = false;
        let retry = task.tick(SESSION, &mut state, &CancellationToken::new()).await;
        assert_eq!(retry, TickOutcome::OrderPlaced { direction: Direction::Buy, notified: true });
    }

    #[tokio::test]
    async fn fetch_failures_count_until_cooldown() {
        let exchange = Arc::new(FakeExchange::with_window(bars(&DIP_RISE_FALL[..9])));
        exchange.failing_bar_fetches.store(5, Ordering::SeqCst);
        let notifier = Arc::new(RecordingNotifier::default());
        let task = task(&exchange, &notifier);
        let cancel = CancellationToken::new();
        let mut state = SessionState::default();

        for expected in 1..=4 {
            let outcome = task.tick(SESSION, &mut state, &cancel).await;
            assert_eq!(outcome, TickOutcome::FetchFailed { consecutive_failures: expected });
        }
        let fifth = task.tick(SESSION, &mut state, &cancel).await;
        assert_eq!(fifth, TickOutcome::CooldownTriggered(Duration::from_secs(300)));
        assert_eq!(state.consecutive_failures, 5);

        task.backoff().finish_cooldown(&mut state.consecutive_failures);
        let recovered = task.tick(SESSION, &mut state, &cancel).await;
        assert!(matches!(recovered, TickOutcome::OrderPlaced { .. }));
        assert_eq!(state.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn successful_fetch_resets_the_failure_count() {
        let exchange = Arc::new(FakeExchange::with_window(bars(&DIP_RISE_FALL[..12])));
        exchange.failing_bar_fetches.store(2, Ordering::SeqCst);
        let notifier = Arc::new(RecordingNotifier::default());
        let task = task(&exchange, &notifier);
        let cancel = CancellationToken::new();
        let mut state = SessionState::default();

        task.tick(SESSION, &mut state, &cancel).await;
        task.tick(SESSION, &mut state, &cancel).await;
        assert_eq!(state.consecutive_failures, 2);

        assert_eq!(task.tick(SESSION, &mut state, &cancel).await, TickOutcome::NoSignal);
        assert_eq!(state.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn position_failure_counts_as_a_fetch_failure() {
        let exchange = Arc::new(FakeExchange::with_window(bars(&DIP_RISE_FALL[..9])));
        *exchange.fail_position.lock().unwrap() = true;
        let notifier = Arc::new(RecordingNotifier::default());
        let task = task(&exchange, &notifier);
        let mut state = SessionState::default();

        let outcome = task.tick(SESSION, &mut state, &CancellationToken::new()).await;

        assert_eq!(outcome, TickOutcome::FetchFailed { consecutive_failures: 1 });
        assert!(exchange.orders().is_empty());
    }

    #[tokio::test]
    async fn repeated_position_failures_reach_the_cooldown() {
        let exchange = Arc::new(FakeExchange::with_window(bars(&DIP_RISE_FALL[..9])));
        *exchange.fail_position.lock().unwrap() = true;
        let notifier = Arc::new(RecordingNotifier::default());
        let task = task(&exchange, &notifier);
        let cancel = CancellationToken::new();
        let mut state = SessionState::default();

        for expected in 1..=4 {
            let outcome = task.tick(SESSION, &mut state, &cancel).await;
            assert_eq!(outcome, TickOutcome::FetchFailed { consecutive_failures: expected });
        }
        let fifth = task.tick(SESSION, &mut state, &cancel).await;
        assert_eq!(fifth, TickOutcome::CooldownTriggered(Duration::from_secs(300)));
        assert_eq!(exchange.bar_fetches.load(Ordering::SeqCst), 5);
        assert!(exchange.orders().is_empty());

        task.backoff().finish_cooldown(&mut state.consecutive_failures);
        *exchange.fail_position.lock().unwrap() = false;
        let recovered = task.tick(SESSION, &mut state, &cancel).await;
        assert!(matches!(recovered, TickOutcome::OrderPlaced { .. }));
        assert_eq!(state.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn position_is_only_fetched_on_a_signal() {
        let exchange = Arc::new(FakeExchange::with_window(bars(&DIP_RISE_FALL[..12])));
        let notifier = Arc::new(RecordingNotifier::default());
        let task = task(&exchange, &notifier);
        let mut state = SessionState::default();

        task.tick(SESSION, &mut state, &CancellationToken::new()).await;

        assert_eq!(exchange.position_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn forming_bar_is_dropped_by_default() {
        let mut window = bars(&DIP_RISE_FALL[..10]);
        if let Some(forming) = window.last_mut() {
            forming.close_time = i64::MAX;
        }
        let exchange = Arc::new(FakeExchange::with_window(window));
        let notifier = Arc::new(RecordingNotifier::default());
        let cancel = CancellationToken::new();

        // Without the forming bar, the crossover bar is the last one.
        let closed_only = task(&exchange, &notifier);
        let outcome = closed_only.tick(SESSION, &mut SessionState::default(), &cancel).await;
        assert_eq!(outcome, TickOutcome::OrderPlaced { direction: Direction::Buy, notified: true });

        let mut trading = trading_settings(NotifyPolicy::OnOrder);
        trading.evaluate_forming_bar = true;
        let with_forming = task_with(&exchange, &notifier, trading);
        let outcome = with_forming.tick(SESSION, &mut SessionState::default(), &cancel).await;
        assert_eq!(outcome, TickOutcome::NoSignal);
    }

    #[tokio::test]
    async fn stopped_session_skips_the_tick() {
        let exchange = Arc::new(FakeExchange::with_window(bars(&DIP_RISE_FALL[..9])));
        let notifier = Arc::new(RecordingNotifier::default());
        let task = task(&exchange, &notifier);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = task.tick(SESSION, &mut SessionState::default(), &cancel).await;

        assert_eq!(outcome, TickOutcome::Skipped);
        assert_eq!(exchange.bar_fetches(), 0);
    }

    #[tokio::test]
    async fn notification_is_retried_once() {
        let exchange = Arc::new(FakeExchange::with_window(bars(&DIP_RISE_FALL[..9])));
        let notifier = Arc::new(RecordingNotifier::default());
        notifier.failing_sends.store(1, Ordering::SeqCst);
        let task = task(&exchange, &notifier);

        let outcome = task.tick(SESSION, &mut SessionState::default(), &CancellationToken::new()).await;

        assert_eq!(outcome, TickOutcome::OrderPlaced { direction: Direction::Buy, notified: true });
        assert_eq!(notifier.attempts(), 2);
        assert_eq!(notifier.delivered().len(), 1);
    }

    #[tokio::test]
    async fn undeliverable_notification_does_not_fail_the_tick() {
        let exchange = Arc::new(FakeExchange::with_window(bars(&DIP_RISE_FALL[..9])));
        let notifier = Arc::new(RecordingNotifier::default());
        notifier.failing_sends.store(2, Ordering::SeqCst);
        let task = task(&exchange, &notifier);
        let mut state = SessionState::default();

        let outcome = task.tick(SESSION, &mut state, &CancellationToken::new()).await;

        assert_eq!(outcome, TickOutcome::OrderPlaced { direction: Direction::Buy, notified: true });
        assert_eq!(notifier.attempts(), 2);
        assert!(notifier.delivered().is_empty());
        assert_eq!(exchange.orders().len(), 1);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let exchange = Arc::new(FakeExchange::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let mut trading = trading_settings(NotifyPolicy::OnOrder);
        trading.indicator.fast_period = 5;
        let result = TradingTask::new(&trading, &schedule_settings(), exchange.clone(), exchange.clone(), notifier.clone());
        assert!(matches!(result, Err(crate::Error::Strategy(_))));

        let mut trading = trading_settings(NotifyPolicy::OnOrder);
        trading.order_size = Decimal::ZERO;
        let result = TradingTask::new(&trading, &schedule_settings(), exchange.clone(), exchange, notifier);
        assert!(matches!(result, Err(crate::Error::Risk(_))));
    }
}
