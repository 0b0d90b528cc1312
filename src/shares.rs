// 3.0 shares.rs: partial-fill sub-ledger. who bought how much of which position.
// each share carries its own state tag so a redeemed share can't be confused with "never bought".

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{Address, Amount, PositionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareStatus {
    Held,
    Redeemed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub quantity: Amount,
    pub status: ShareStatus,
}

impl Share {
    pub fn held(quantity: Amount) -> Self {
        Self {
            quantity,
            status: ShareStatus::Held,
        }
    }

    pub fn is_redeemable(&self) -> bool {
        self.status == ShareStatus::Held && !self.quantity.is_zero()
    }

    // what the share looks like after `quantity` more is bought.
    // a redeemed share starts over rather than resurrecting the old quantity.
    pub fn topped_up(existing: Option<Share>, quantity: Amount) -> Option<Share> {
        match existing {
            Some(share) if share.status == ShareStatus::Held => {
                share.quantity.checked_add(quantity).map(Share::held)
            }
            _ => Some(Share::held(quantity)),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ShareBook {
    shares: HashMap<PositionId, HashMap<Address, Share>>,
}

impl ShareBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &PositionId, holder: &Address) -> Option<Share> {
        self.shares.get(id).and_then(|m| m.get(holder)).copied()
    }

    // returns what was there before so the caller can undo
    pub fn set(&mut self, id: PositionId, holder: Address, share: Share) -> Option<Share> {
        self.shares.entry(id).or_default().insert(holder, share)
    }

    pub fn remove(&mut self, id: &PositionId, holder: &Address) -> Option<Share> {
        let holders = self.shares.get_mut(id)?;
        let removed = holders.remove(holder);
        if holders.is_empty() {
            self.shares.remove(id);
        }
        removed
    }

    pub fn holders(&self, id: &PositionId) -> Vec<(Address, Share)> {
        let mut out: Vec<(Address, Share)> = self
            .shares
            .get(id)
            .map(|m| m.iter().map(|(a, s)| (*a, *s)).collect())
            .unwrap_or_default();
        out.sort_by_key(|(a, _)| *a);
        out
    }
}
