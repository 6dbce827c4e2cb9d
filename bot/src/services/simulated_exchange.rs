//! Paper exchange used by the bot instead of a live account

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::BotError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("buy"),
            Self::Sell => f.write_str("sell"),
        }
    }
}

/// A filled market order.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub symbol: String,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Order {
    pub fn notional(&self) -> Decimal {
        self.amount * self.price
    }
}

pub(crate) fn to_decimal(value: f64) -> Result<Decimal, BotError> {
    if !value.is_finite() {
        return Err(BotError::InvalidOrder(format!("not a finite number: {}", value)));
    }
    Decimal::from_str(&value.to_string())
        .map_err(|e| BotError::InvalidOrder(format!("{}: {}", value, e)))
}

/// Quote balance plus signed base positions per symbol. Orders fill at the
/// last price set for the symbol.
#[derive(Debug)]
pub struct SimulatedExchange {
    balance: Decimal,
    positions: HashMap<String, Decimal>,
    last_prices: HashMap<String, Decimal>,
    trade_history: Vec<Order>,
}

impl SimulatedExchange {
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            balance: initial_balance,
            positions: HashMap::new(),
            last_prices: HashMap::new(),
            trade_history: Vec::new(),
        }
    }

    pub fn set_price(&mut self, symbol: &str, price: f64) -> Result<(), BotError> {
        let price = to_decimal(price)?;
        if price <= Decimal::ZERO {
            return Err(BotError::InvalidOrder(format!("price must be positive, got {}", price)));
        }
        self.last_prices.insert(symbol.to_string(), price);
        Ok(())
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Signed base amount; negative while short.
    pub fn position(&self, symbol: &str) -> Decimal {
        self.positions.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn trade_history(&self) -> &[Order] {
        &self.trade_history
    }

    pub fn market_buy(
        &mut self,
        symbol: &str,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Order, BotError> {
        let price = self.fill_price(symbol, amount)?;
        let cost = amount * price;
        if cost > self.balance {
            return Err(BotError::InsufficientFunds {
                needed: cost,
                available: self.balance,
            });
        }

        self.balance -= cost;
        *self.positions.entry(symbol.to_string()).or_default() += amount;
        Ok(self.record(symbol, OrderSide::Buy, amount, price, now))
    }

    /// Sells never check holdings, so selling past zero opens a short.
    pub fn market_sell(
        &mut self,
        symbol: &str,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Order, BotError> {
        let price = self.fill_price(symbol, amount)?;
        self.balance += amount * price;
        *self.positions.entry(symbol.to_string()).or_default() -= amount;
        Ok(self.record(symbol, OrderSide::Sell, amount, price, now))
    }

    fn fill_price(&self, symbol: &str, amount: Decimal) -> Result<Decimal, BotError> {
        if amount <= Decimal::ZERO {
            return Err(BotError::InvalidOrder(format!("amount must be positive, got {}", amount)));
        }
        self.last_prices
            .get(symbol)
            .copied()
            .ok_or_else(|| BotError::InvalidOrder(format!("no price for {}", symbol)))
    }

    fn record(
        &mut self,
        symbol: &str,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Order {
        let order = Order {
            symbol: symbol.to_string(),
            side,
            amount,
            price,
            timestamp: now,
        };
        debug!(
            "Simulated {} {} {} @ {} (balance {})",
            side, amount, symbol, price, self.balance
        );
        self.trade_history.push(order.clone());
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    fn dec(v: f64) -> Decimal {
        Decimal::from_f64(v).unwrap()
    }

    fn exchange() -> SimulatedExchange {
        let mut exchange = SimulatedExchange::new(dec(1000.0));
        exchange.set_price("BTC/USDT", 100.0).unwrap();
        exchange
    }

    #[test]
    fn test_buy_debits_balance_and_adds_position() {
        let mut exchange = exchange();
        let order = exchange.market_buy("BTC/USDT", dec(2.0), Utc::now()).unwrap();

        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.notional(), dec(200.0));
        assert_eq!(exchange.balance(), dec(800.0));
        assert_eq!(exchange.position("BTC/USDT"), dec(2.0));
        assert_eq!(exchange.trade_history().len(), 1);
    }

    #[test]
    fn test_buy_with_insufficient_funds_fails_without_side_effects() {
        let mut exchange = exchange();
        let err = exchange
            .market_buy("BTC/USDT", dec(20.0), Utc::now())
            .unwrap_err();

        assert!(matches!(err, BotError::InsufficientFunds { .. }));
        assert_eq!(exchange.balance(), dec(1000.0));
        assert_eq!(exchange.position("BTC/USDT"), Decimal::ZERO);
        assert!(exchange.trade_history().is_empty());
    }

    #[test]
    fn test_sell_can_go_short() {
        let mut exchange = exchange();
        exchange.market_sell("BTC/USDT", dec(1.5), Utc::now()).unwrap();

        assert_eq!(exchange.position("BTC/USDT"), dec(-1.5));
        assert_eq!(exchange.balance(), dec(1150.0));
    }

    #[test]
    fn test_fills_use_last_price() {
        let mut exchange = exchange();
        exchange.market_buy("BTC/USDT", dec(1.0), Utc::now()).unwrap();
        exchange.set_price("BTC/USDT", 110.0).unwrap();
        exchange.market_sell("BTC/USDT", dec(1.0), Utc::now()).unwrap();

        assert_eq!(exchange.position("BTC/USDT"), Decimal::ZERO);
        assert_eq!(exchange.balance(), dec(1010.0));
        assert_eq!(exchange.trade_history()[1].price, dec(110.0));
    }

    #[test]
    fn test_invalid_orders() {
        let mut exchange = exchange();
        assert!(matches!(
            exchange.market_buy("ETH/USDT", dec(1.0), Utc::now()),
            Err(BotError::InvalidOrder(_))
        ));
        assert!(matches!(
            exchange.market_sell("BTC/USDT", Decimal::ZERO, Utc::now()),
            Err(BotError::InvalidOrder(_))
        ));
        assert!(exchange.set_price("BTC/USDT", -1.0).is_err());
        assert!(to_decimal(f64::NAN).is_err());
    }
}
