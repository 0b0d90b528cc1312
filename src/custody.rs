// 9.2 custody.rs: MOCKED asset layer. balances in a map, no real chain.
// used by tests and the simulator; production plugs its own AssetTransfer in.

use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

use crate::settlement::{AssetTransfer, Holder, Movement, SettlementBatch, TransferError};
use crate::types::{Address, Amount, AssetId};

#[derive(Debug, Default)]
pub struct InMemoryAssets {
    balances: HashMap<(AssetId, Holder), Decimal>,
    // parties whose incoming transfers bounce (contract wallets that revert, frozen accounts)
    rejecting: HashSet<Address>,
    // one-shot failure for the next batch
    fail_next: Option<TransferError>,
    settled_batches: usize,
}

impl InMemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    // Fund a party from outside the system
    pub fn mint(&mut self, asset: AssetId, to: Address, amount: Amount) {
        *self
            .balances
            .entry((asset, Holder::Party(to)))
            .or_insert(Decimal::ZERO) += amount.value();
    }

    pub fn balance_of(&self, asset: AssetId, holder: Address) -> Amount {
        self.balance(asset, Holder::Party(holder))
    }

    pub fn escrow_balance(&self, asset: AssetId) -> Amount {
        self.balance(asset, Holder::Escrow)
    }

    fn balance(&self, asset: AssetId, holder: Holder) -> Amount {
        self.balances
            .get(&(asset, holder))
            .copied()
            .and_then(Amount::new)
            .unwrap_or(Amount::ZERO)
    }

    pub fn reject_transfers_to(&mut self, address: Address) {
        self.rejecting.insert(address);
    }

    pub fn accept_transfers_to(&mut self, address: &Address) {
        self.rejecting.remove(address);
    }

    pub fn fail_next(&mut self, error: TransferError) {
        self.fail_next = Some(error);
    }

    pub fn settled_batches(&self) -> usize {
        self.settled_batches
    }
}

impl AssetTransfer for InMemoryAssets {
    fn settle(&mut self, batch: &SettlementBatch) -> Result<(), TransferError> {
        if let Some(error) = self.fail_next.take() {
            return Err(error);
        }

        for movement in &batch.movements {
            if let Movement::Push { to, .. } = movement {
                if self.rejecting.contains(to) {
                    return Err(TransferError::Rejected { address: *to });
                }
            }
        }

        // validate all flows first
        let flows = batch.net_flows();
        for ((asset, holder), flow) in &flows {
            if *flow < Decimal::ZERO {
                let available = self.balance(*asset, *holder).value();
                if available + flow < Decimal::ZERO {
                    return Err(TransferError::InsufficientFunds {
                        asset: *asset,
                        holder: *holder,
                        required: flow.abs(),
                        available,
                    });
                }
            }
        }

        // apply all flows
        for (key, flow) in flows {
            *self.balances.entry(key).or_insert(Decimal::ZERO) += flow;
        }

        self.settled_batches += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::MovementReason;

    fn a(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn dai() -> AssetId {
        AssetId::Token(a(100))
    }

    #[test]
    fn test_pull_then_push() {
        let mut assets = InMemoryAssets::new();
        assets.mint(dai(), a(1), Amount::from_units(1000));

        let mut batch = SettlementBatch::new(1);
        batch.pull(dai(), a(1), Amount::from_units(300), MovementReason::AskPayment);
        assets.settle(&batch).unwrap();
        assert_eq!(assets.balance_of(dai(), a(1)), Amount::from_units(700));
        assert_eq!(assets.escrow_balance(dai()), Amount::from_units(300));

        let mut batch = SettlementBatch::new(2);
        batch.push(dai(), a(2), Amount::from_units(300), MovementReason::ProceedsWithdrawal);
        assets.settle(&batch).unwrap();
        assert_eq!(assets.balance_of(dai(), a(2)), Amount::from_units(300));
        assert_eq!(assets.escrow_balance(dai()), Amount::ZERO);
        assert_eq!(assets.settled_batches(), 2);
    }

    #[test]
    fn test_insufficient_funds_moves_nothing() {
        let mut assets = InMemoryAssets::new();
        assets.mint(dai(), a(1), Amount::from_units(10));
        assets.mint(AssetId::Native, a(1), Amount::from_units(10));

        let mut batch = SettlementBatch::new(1);
        batch.pull(AssetId::Native, a(1), Amount::from_units(5), MovementReason::LockCollateral);
        batch.pull(dai(), a(1), Amount::from_units(50), MovementReason::StrikePayment);

        let result = assets.settle(&batch);
        assert!(matches!(result, Err(TransferError::InsufficientFunds { .. })));
        assert_eq!(assets.balance_of(AssetId::Native, a(1)), Amount::from_units(10));
        assert_eq!(assets.escrow_balance(AssetId::Native), Amount::ZERO);
    }

    #[test]
    fn test_rejecting_receiver() {
        let mut assets = InMemoryAssets::new();
        assets.mint(AssetId::Native, a(1), Amount::from_units(10));

        let mut batch = SettlementBatch::new(1);
        batch.pull(AssetId::Native, a(1), Amount::from_units(10), MovementReason::LockCollateral);
        assets.settle(&batch).unwrap();

        assets.reject_transfers_to(a(1));
        let mut back = SettlementBatch::new(2);
        back.push(AssetId::Native, a(1), Amount::from_units(10), MovementReason::ReturnCollateral);
        assert_eq!(assets.settle(&back), Err(TransferError::Rejected { address: a(1) }));

        assets.accept_transfers_to(&a(1));
        assert!(assets.settle(&back).is_ok());
    }

    #[test]
    fn test_fail_next_is_one_shot() {
        let mut assets = InMemoryAssets::new();
        assets.fail_next(TransferError::Unavailable("rpc down".to_string()));

        let batch = SettlementBatch::new(1);
        assert!(assets.settle(&batch).is_err());
        assert!(assets.settle(&batch).is_ok());
    }
}
