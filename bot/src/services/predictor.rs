//! Pre-trained price regression

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BotError;
use crate::services::features::FeatureRow;

pub trait PricePredictor: Send + Sync {
    /// Predicted next close, or `None` when the features are not usable.
    fn predict(&self, features: &FeatureRow) -> Option<f64>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coefficients {
    pub close: f64,
    pub ma20: f64,
    pub ma50: f64,
    pub returns: f64,
    pub volatility: f64,
}

/// Linear regression exported as
/// `{"intercept": .., "coefficients": {"close": .., "ma20": .., ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Coefficients,
}

impl LinearModel {
    pub fn load(path: &Path) -> Result<Self, BotError> {
        let load_err = |reason: String| BotError::ModelLoad {
            path: path.to_path_buf(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| load_err(e.to_string()))
    }
}

impl PricePredictor for LinearModel {
    fn predict(&self, features: &FeatureRow) -> Option<f64> {
        let c = &self.coefficients;
        let prediction = self.intercept
            + c.close * features.close
            + c.ma20 * features.ma20?
            + c.ma50 * features.ma50?
            + c.returns * features.returns?
            + c.volatility * features.volatility?;
        prediction.is_finite().then_some(prediction)
    }
}
