// In crates/notifier/src/messages.rs

// Telegram renders these texts with the HTML parse mode.

use core_types::{Direction, Signal};

fn headline(direction: Direction) -> &'static str {
    match direction {
        Direction::Buy => "🚀 <b>BUY</b>",
        Direction::Sell => "🔻 <b>SELL</b>",
    }
}

/// Announces a signal whose order went through.
pub fn order_placed(signal: &Signal) -> String {
    format!("{} | Price: {}", headline(signal.direction), signal.price)
}

/// Announces a signal for which no order was sent because the position
/// already points the same way.
pub fn signal_without_order(signal: &Signal) -> String {
    format!("{} | Price: {} | position already open, no order", headline(signal.direction), signal.price)
}

pub fn order_failed(signal: &Signal, reason: &str) -> String {
    format!("⚠️ <b>{}</b> order failed: {}", signal.direction, escape_html(reason))
}

/// Exchange error texts may contain `<` or `&`, which Telegram rejects.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
