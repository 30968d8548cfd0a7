// In crates/engine/src/testing.rs
//
// In-memory stand-ins for the exchange and the bot. The fake exchange keeps
// a position that its own orders move, so a sequence of ticks behaves like
// a real account.

use api_client::MarketData;
use app_config::NotifyPolicy;
use app_config::types::{ScheduleSettings, TradingSettings};
use async_trait::async_trait;
use core_types::{Bar, OrderRequest, OrderResult, PositionSnapshot, SessionId, Symbol};
use execution::Executor;
use notifier::Notifier;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use strategies::types::{IndicatorKind, IndicatorSettings};

pub const ORDER_SIZE: Decimal = dec!(0.001);

// Dips from 110 to 100, rises to 125, falls back to 110. With SMA(3)/SMA(5)
// the lines cross upward on bar 8 and downward on bar 17.
pub const DIP_RISE_FALL: [i64; 25] = [
    110, 108, 106, 104, 102, 100, 102, 106, 109, 112, 115, 118, 121, 124, 125, 123, 121, 119, 117,
    115, 113, 111, 110, 110, 110,
];

pub fn bars(closes: &[i64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let price = Decimal::from(*c);
            Bar {
                open_time: i as i64 * 60_000,
                open: price,
                high: price,
                low: price,
                close: price,
                volume: Decimal::ONE,
                close_time: i as i64 * 60_000 + 59_999,
            }
        })
        .collect()
}

pub fn trading_settings(notify_policy: NotifyPolicy) -> TradingSettings {
    TradingSettings {
        symbol: "BTCUSDT".to_string(),
        timeframe: "1m".to_string(),
        bar_limit: 100,
        order_size: ORDER_SIZE,
        notify_policy,
        evaluate_forming_bar: false,
        indicator: IndicatorSettings { kind: IndicatorKind::Sma, fast_period: 3, slow_period: 5 },
    }
}

pub fn schedule_settings() -> ScheduleSettings {
    ScheduleSettings { notification_retry_delay_ms: 0, ..ScheduleSettings::default() }
}

#[derive(Default)]
pub struct FakeExchange {
    pub window: Mutex<Vec<Bar>>,
    pub position: Mutex<Decimal>,
    pub orders: Mutex<Vec<OrderRequest>>,
    pub bar_fetches: AtomicUsize,
    pub position_fetches: AtomicUsize,
    /// While positive, each bar fetch fails and decrements it.
    pub failing_bar_fetches: AtomicUsize,
    pub fail_position: Mutex<bool>,
    pub fail_orders: Mutex<bool>,
    /// Simulated latency of the position endpoint.
    pub position_latency: Mutex<Duration>,
}

impl FakeExchange {
    pub fn with_window(bars: Vec<Bar>) -> Self {
        let exchange = Self::default();
        exchange.set_window(bars);
        exchange
    }

    pub fn set_window(&self, bars: Vec<Bar>) {
        *self.window.lock().unwrap() = bars;
    }

    pub fn set_position(&self, quantity: Decimal) {
        *self.position.lock().unwrap() = quantity;
    }

    pub fn position(&self) -> Decimal {
        *self.position.lock().unwrap()
    }

    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().unwrap().clone()
    }

    pub fn bar_fetches(&self) -> usize {
        self.bar_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketData for FakeExchange {
    async fn fetch_bars(&self, _symbol: &Symbol, _timeframe: &str, limit: u16) -> api_client::Result<Vec<Bar>> {
        self.bar_fetches.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_bar_fetches.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_bar_fetches.store(failing - 1, Ordering::SeqCst);
            return Err(api_client::Error::CustomError("exchange unreachable".to_string()));
        }

        let window = self.window.lock().unwrap();
        let skip = window.len().saturating_sub(limit as usize);
        Ok(window[skip..].to_vec())
    }

    async fn fetch_position(&self, symbol: &Symbol) -> api_client::Result<PositionSnapshot> {
        self.position_fetches.fetch_add(1, Ordering::SeqCst);
        let latency = *self.position_latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if *self.fail_position.lock().unwrap() {
            return Err(api_client::Error::ApiError { code: -1001, msg: "Internal error".to_string() });
        }
        Ok(PositionSnapshot { symbol: symbol.clone(), signed_quantity: self.position() })
    }
}

#[async_trait]
impl Executor for FakeExchange {
    fn name(&self) -> &'static str {
        "FakeExchange"
    }

    async fn execute(&self, order_request: &OrderRequest) -> execution::Result<OrderResult> {
        if *self.fail_orders.lock().unwrap() {
            return Err(execution::Error::ExecutionFailed { reason: "Margin is insufficient.".to_string() });
        }

        let delta = match order_request.side {
            core_types::Direction::Buy => order_request.quantity,
            core_types::Direction::Sell => -order_request.quantity,
        };
        *self.position.lock().unwrap() += delta;

        let mut orders = self.orders.lock().unwrap();
        orders.push(order_request.clone());
        Ok(OrderResult {
            order_id: orders.len() as i64,
            symbol: order_request.symbol.clone(),
            side: order_request.side,
            executed_quantity: order_request.quantity,
            average_price: Decimal::ZERO,
            status: "FILLED".to_string(),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub delivered: Mutex<Vec<(SessionId, String)>>,
    pub attempts: AtomicUsize,
    /// While positive, each send fails and decrements it.
    pub failing_sends: AtomicUsize,
}

impl RecordingNotifier {
    pub fn delivered(&self) -> Vec<(SessionId, String)> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "RecordingNotifier"
    }

    async fn send(&self, session: SessionId, text: &str) -> notifier::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_sends.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_sends.store(failing - 1, Ordering::SeqCst);
            return Err(notifier::Error::Rejected("Too Many Requests".to_string()));
        }
        self.delivered.lock().unwrap().push((session, text.to_string()));
        Ok(())
    }
}
