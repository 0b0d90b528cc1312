// 5.0 proceeds.rs: pull-payment balances. sales and redemptions credit, `take` drains.
// 5.1 fee split lives here too since it decides who gets credited what.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{Address, Amount, Bps};

// How one purchase payment is divided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub net: Amount,
    pub fee: Amount,
}

// fee is truncated so rounding dust always stays with the seller
pub fn split_fee(payment: Amount, fee_bps: Bps, decimals: u32) -> FeeSplit {
    let raw = payment.value() * fee_bps.as_fraction();
    let fee = Amount::new(raw)
        .map(|f| f.truncate(decimals))
        .unwrap_or(Amount::ZERO)
        .min(payment);
    FeeSplit {
        net: payment.saturating_sub(fee),
        fee,
    }
}

#[derive(Debug, Default, Clone)]
pub struct ProceedsLedger {
    balances: HashMap<Address, Amount>,
}

impl ProceedsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(Amount::ZERO)
    }

    // overwrite, returning the previous balance
    pub fn set(&mut self, holder: Address, amount: Amount) -> Amount {
        let prev = if amount.is_zero() {
            self.balances.remove(&holder)
        } else {
            self.balances.insert(holder, amount)
        };
        prev.unwrap_or(Amount::ZERO)
    }

    pub fn total(&self) -> Amount {
        self.balances.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fee_split_is_exact() {
        let split = split_fee(Amount::from_units(100_000), Bps::new(10), 18);
        assert_eq!(split.fee, Amount::from_units(100));
        assert_eq!(split.net, Amount::from_units(99_900));
        assert_eq!(split.net.checked_add(split.fee).unwrap(), Amount::from_units(100_000));
    }

    #[test]
    fn fee_truncates_to_asset_scale() {
        // 0.1% of 1.5 = 0.0015, only 2 decimals available
        let split = split_fee(Amount::new_unchecked(dec!(1.5)), Bps::new(10), 2);
        assert_eq!(split.fee, Amount::ZERO);
        assert_eq!(split.net.value(), dec!(1.5));
    }

    #[test]
    fn zero_fee_rate() {
        let split = split_fee(Amount::from_units(7), Bps::new(0), 18);
        assert_eq!(split.fee, Amount::ZERO);
        assert_eq!(split.net, Amount::from_units(7));
    }

    #[test]
    fn set_and_total() {
        let mut ledger = ProceedsLedger::new();
        let a = Address::from_low_u64(1);
        let b = Address::from_low_u64(2);

        assert_eq!(ledger.set(a, Amount::from_units(5)), Amount::ZERO);
        ledger.set(b, Amount::from_units(3));
        assert_eq!(ledger.total(), Amount::from_units(8));

        assert_eq!(ledger.set(a, Amount::ZERO), Amount::from_units(5));
        assert_eq!(ledger.balance_of(&a), Amount::ZERO);
        assert_eq!(ledger.total(), Amount::from_units(3));
    }
}
