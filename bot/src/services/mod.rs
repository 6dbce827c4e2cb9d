pub mod features;
pub mod position_service;
pub mod predictor;
pub mod simulated_exchange;
pub mod trader;
pub mod trading_signal;
