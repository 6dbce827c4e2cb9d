//! Position and Trade Management Service

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::BotError;
use crate::services::simulated_exchange::{to_decimal, Order, OrderSide, SimulatedExchange};
use crate::services::trading_signal::PositionSignal;

/// Position opened by the bot and not yet closed.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub side: OrderSide,
    pub size: Decimal,
    pub opened_at: DateTime<Utc>,
}

/// Opens a fixed-notional position on each directional signal and closes it
/// with the opposite order once it has been held long enough.
#[derive(Debug)]
pub struct PositionManager {
    symbol: String,
    trade_notional: Decimal,
    hold: Duration,
    open: Option<OpenPosition>,
}

impl PositionManager {
    pub fn new(symbol: impl Into<String>, trade_notional: Decimal, hold: Duration) -> Self {
        Self {
            symbol: symbol.into(),
            trade_notional,
            hold,
            open: None,
        }
    }

    pub fn open_position(&self) -> Option<&OpenPosition> {
        self.open.as_ref()
    }

    /// Act on `signal` at `current_price`. Returns the order placed, if any.
    ///
    /// A signal is ignored while a position is still tracked, and when the
    /// exchange already holds exposure in the signal's direction.
    pub fn manage_position(
        &mut self,
        exchange: &mut SimulatedExchange,
        signal: PositionSignal,
        current_price: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, BotError> {
        if signal == PositionSignal::Flat {
            return Ok(None);
        }
        if let Some(open) = &self.open {
            info!(
                "Holding {} {} since {}, ignoring {} signal",
                open.side, open.size, open.opened_at, signal
            );
            return Ok(None);
        }

        let price = to_decimal(current_price)?;
        if price <= Decimal::ZERO {
            return Err(BotError::InvalidOrder(format!("price must be positive, got {}", price)));
        }
        let amount = (self.trade_notional / price).round_dp(8);
        let held = exchange.position(&self.symbol);

        let order = match signal {
            PositionSignal::Long if held <= Decimal::ZERO => {
                exchange.market_buy(&self.symbol, amount, now)?
            }
            PositionSignal::Short if held >= Decimal::ZERO => {
                exchange.market_sell(&self.symbol, amount, now)?
            }
            _ => return Ok(None),
        };

        info!("Opened {} position of {} {}", signal, amount, self.symbol);
        self.open = Some(OpenPosition {
            side: order.side,
            size: order.amount,
            opened_at: now,
        });
        Ok(Some(order))
    }

    /// Close the tracked position once it has been held for the configured time.
    pub fn check_and_close_position(
        &mut self,
        exchange: &mut SimulatedExchange,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, BotError> {
        let Some(open) = self.open.clone() else {
            return Ok(None);
        };
        if now - open.opened_at < self.hold {
            return Ok(None);
        }

        if exchange.position(&self.symbol) == Decimal::ZERO {
            warn!("{} position already flat, dropping tracked position", self.symbol);
            self.open = None;
            return Ok(None);
        }

        let order = match open.side {
            OrderSide::Buy => exchange.market_sell(&self.symbol, open.size, now)?,
            OrderSide::Sell => exchange.market_buy(&self.symbol, open.size, now)?,
        };
        info!(
            "Closed {} position of {} {} after {}s",
            open.side,
            open.size,
            self.symbol,
            (now - open.opened_at).num_seconds()
        );
        self.open = None;
        Ok(Some(order))
    }
}
