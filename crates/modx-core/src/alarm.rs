//! Single durable price alarm.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation::parse_amount;
use crate::CoreResult;

/// Fires once when `token` crosses `target_price` coming from the side of
/// `reference_price` (the price when the alarm was set).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlarm {
    pub token: String,
    pub target_price: Decimal,
    pub reference_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl PriceAlarm {
    pub fn new(token: impl Into<String>, target_price: &str, reference_price: Decimal) -> CoreResult<Self> {
        Ok(Self {
            token: token.into(),
            target_price: parse_amount(target_price)?,
            reference_price,
            created_at: Utc::now(),
        })
    }

    /// An alarm set exactly at the reference price never fires.
    pub fn is_triggered(&self, current_price: Decimal) -> bool {
        (self.reference_price < self.target_price && current_price >= self.target_price)
            || (self.reference_price > self.target_price && current_price <= self.target_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_upward_crossing() {
        let alarm = PriceAlarm::new("BNB", "400", dec!(350)).unwrap();
        assert!(!alarm.is_triggered(dec!(399.99)));
        assert!(alarm.is_triggered(dec!(400)));
        assert!(alarm.is_triggered(dec!(420)));
    }

    #[test]
    fn test_downward_crossing() {
        let alarm = PriceAlarm::new("modX", "0.2", dec!(0.251)).unwrap();
        assert!(!alarm.is_triggered(dec!(0.21)));
        assert!(alarm.is_triggered(dec!(0.2)));
    }

    #[test]
    fn test_target_at_reference_is_inert() {
        let alarm = PriceAlarm::new("ETH", "3200", dec!(3200)).unwrap();
        assert!(!alarm.is_triggered(dec!(3200)));
        assert!(!alarm.is_triggered(dec!(1)));
    }

    #[test]
    fn test_rejects_bad_target() {
        assert!(PriceAlarm::new("ETH", "-1", dec!(3200)).is_err());
    }
}
