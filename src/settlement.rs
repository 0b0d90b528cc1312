// 9.1 settlement.rs: the seam to the asset layer. the core never moves value itself,
// it describes movements and hands them over as one all-or-nothing batch.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{Address, Amount, AssetId};

// Unique identifier for a settlement batch
pub type BatchId = u64;

// Either side of a movement: the escrow itself or an outside party
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Holder {
    Escrow,
    Party(Address),
}

// One asset movement the escrow needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Movement {
    // holder -> escrow (transferFrom-style pull)
    Pull {
        asset: AssetId,
        from: Address,
        amount: Amount,
        reason: MovementReason,
    },

    // escrow -> holder
    Push {
        asset: AssetId,
        to: Address,
        amount: Amount,
        reason: MovementReason,
    },
}

impl Movement {
    pub fn asset(&self) -> AssetId {
        match self {
            Movement::Pull { asset, .. } | Movement::Push { asset, .. } => *asset,
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            Movement::Pull { amount, .. } | Movement::Push { amount, .. } => *amount,
        }
    }
}

// Why a movement is happening
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    LockCollateral,
    ReturnCollateral,
    ReleaseCollateral,
    AskPayment,
    StrikePayment,
    ProceedsWithdrawal,
}

// Movements that must happen together or not at all
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementBatch {
    pub batch_id: BatchId,
    pub movements: Vec<Movement>,
}

impl SettlementBatch {
    pub fn new(batch_id: BatchId) -> Self {
        Self {
            batch_id,
            movements: Vec::new(),
        }
    }

    // zero-amount movements are dropped. nothing to settle.
    pub fn pull(&mut self, asset: AssetId, from: Address, amount: Amount, reason: MovementReason) {
        if !amount.is_zero() {
            self.movements.push(Movement::Pull { asset, from, amount, reason });
        }
    }

    pub fn push(&mut self, asset: AssetId, to: Address, amount: Amount, reason: MovementReason) {
        if !amount.is_zero() {
            self.movements.push(Movement::Push { asset, to, amount, reason });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.movements.len()
    }

    // Net change per (asset, holder). escrow flows net to zero only when a batch is pass-through.
    pub fn net_flows(&self) -> HashMap<(AssetId, Holder), Decimal> {
        let mut flows = HashMap::new();

        for movement in &self.movements {
            match movement {
                Movement::Pull { asset, from, amount, .. } => {
                    *flows.entry((*asset, Holder::Party(*from))).or_insert(Decimal::ZERO) -= amount.value();
                    *flows.entry((*asset, Holder::Escrow)).or_insert(Decimal::ZERO) += amount.value();
                }
                Movement::Push { asset, to, amount, .. } => {
                    *flows.entry((*asset, Holder::Escrow)).or_insert(Decimal::ZERO) -= amount.value();
                    *flows.entry((*asset, Holder::Party(*to))).or_insert(Decimal::ZERO) += amount.value();
                }
            }
        }

        flows
    }
}

// Errors the asset layer reports back
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("{holder:?} has insufficient {asset}: required {required}, available {available}")]
    InsufficientFunds {
        asset: AssetId,
        holder: Holder,
        required: Decimal,
        available: Decimal,
    },

    #[error("{address} rejected the transfer")]
    Rejected { address: Address },

    #[error("asset {0} is not supported")]
    UnsupportedAsset(AssetId),

    #[error("asset layer unavailable: {0}")]
    Unavailable(String),
}

// The asset-transfer collaborator. implement this for each chain or custody system.
pub trait AssetTransfer {
    // Execute every movement in the batch or none of them
    fn settle(&mut self, batch: &SettlementBatch) -> Result<(), TransferError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    #[test]
    fn test_zero_movements_dropped() {
        let mut batch = SettlementBatch::new(1);
        batch.pull(AssetId::Native, a(1), Amount::ZERO, MovementReason::LockCollateral);
        batch.push(AssetId::Native, a(1), Amount::ZERO, MovementReason::ReturnCollateral);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_batch_net_flows() {
        let dai = AssetId::Token(a(100));
        let mut batch = SettlementBatch::new(1);
        batch.pull(dai, a(2), Amount::from_units(100), MovementReason::StrikePayment);
        batch.push(AssetId::Native, a(2), Amount::from_units(5), MovementReason::ReleaseCollateral);

        let flows = batch.net_flows();
        assert_eq!(flows.get(&(dai, Holder::Party(a(2)))), Some(&Decimal::from(-100)));
        assert_eq!(flows.get(&(dai, Holder::Escrow)), Some(&Decimal::from(100)));
        assert_eq!(flows.get(&(AssetId::Native, Holder::Escrow)), Some(&Decimal::from(-5)));
        assert_eq!(flows.get(&(AssetId::Native, Holder::Party(a(2)))), Some(&Decimal::from(5)));
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_movement_serialization_tagged() {
        let m = Movement::Push {
            asset: AssetId::Native,
            to: a(3),
            amount: Amount::from_units(1),
            reason: MovementReason::ReturnCollateral,
        };
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"type\":\"push\""));
        assert!(json.contains("return_collateral"));
    }
}
