//! Single-fill desk: one buyer takes the whole position.
//!
//! Alive -> Purchased -> Redeemed, with Cancelled (origin exits before a sale)
//! and Reclaimed (`until` passed unsold, or `expire` passed unredeemed) on the side.

use super::config::EngineConfig;
use super::core::Ledger;
use super::desk::Pivot;
use super::results::{
    BackResult, BuyResult, ClaimResult, EscrowError, ExitResult, JoinResult, TakeResult,
};
use crate::config::{ConfigError, PivotParams, Variant};
use crate::events::{BoughtEvent, ClaimedEvent, EventPayload, ReclaimReason, ReclaimedEvent};
use crate::position::{JoinRequest, PositionStatus};
use crate::settlement::{AssetTransfer, MovementReason};
use crate::types::{Address, Amount, PositionId, Timestamp};
use tracing::{debug, info};

#[derive(Debug)]
pub struct SingleFillDesk<A> {
    ledger: Ledger<A>,
}

impl<A: AssetTransfer> SingleFillDesk<A> {
    pub fn new(params: PivotParams, config: EngineConfig, assets: A) -> Result<Self, ConfigError> {
        if params.variant != Variant::SingleFill {
            return Err(ConfigError::VariantMismatch {
                expected: Variant::SingleFill,
                actual: params.variant,
            });
        }
        Ok(Self { ledger: Ledger::new(params, config, assets)? })
    }

    pub fn into_ledger(self) -> Ledger<A> {
        self.ledger
    }
}

impl<A: AssetTransfer> Pivot for SingleFillDesk<A> {
    type Assets = A;

    fn variant(&self) -> Variant {
        Variant::SingleFill
    }

    fn ledger(&self) -> &Ledger<A> {
        &self.ledger
    }

    fn assets_mut(&mut self) -> &mut A {
        self.ledger.assets_mut()
    }

    fn take(&mut self, beneficiary: Address) -> Result<TakeResult, EscrowError> {
        self.ledger.take(beneficiary)
    }

    fn set_time(&mut self, timestamp: Timestamp) -> Result<(), EscrowError> {
        self.ledger.set_time(timestamp)
    }

    fn advance_time(&mut self, secs: u64) {
        self.ledger.advance_time(secs)
    }

    fn join(&mut self, caller: Address, request: JoinRequest) -> Result<JoinResult, EscrowError> {
        if request.until.is_none() {
            return Err(EscrowError::MissingUntil);
        }
        self.ledger.open(caller, request)
    }

    fn exit(&mut self, caller: Address, id: PositionId) -> Result<ExitResult, EscrowError> {
        self.ledger.cancel(caller, id)
    }

    fn buy(
        &mut self,
        caller: Address,
        id: PositionId,
        quantity: Option<Amount>,
    ) -> Result<BuyResult, EscrowError> {
        let ledger = &mut self.ledger;
        let now = ledger.time();
        let position = ledger.require_open(&id)?;

        if let Some(requested) = quantity {
            if requested != position.lock {
                return Err(EscrowError::QuantityMismatch { requested, lock: position.lock });
            }
        }

        if caller == position.origin {
            return Err(EscrowError::SelfDealing { id, caller });
        }

        if position.status != PositionStatus::Alive {
            return Err(EscrowError::AlreadyPurchased(id));
        }

        // join guarantees until is set for single-fill records
        let deadline = position.until.unwrap_or(position.expire);
        if now >= deadline {
            return Err(EscrowError::PurchaseWindowClosed { deadline, now });
        }

        let mut updated = position.clone();
        let payment = updated.price_in;
        updated.owner = caller;
        updated.sold = updated.lock;
        updated.status = PositionStatus::Purchased;
        let origin = updated.origin;
        let lock = updated.lock;
        let quote = ledger.params.quote.id;

        let mut batch = ledger.begin();
        ledger.write_position(updated);
        let split = ledger.route_payment(origin, payment).map_err(|e| ledger.abort(e))?;
        batch.pull(quote, caller, payment, MovementReason::AskPayment);
        ledger.stage(EventPayload::Bought(BoughtEvent {
            id,
            buyer: caller,
            quantity: lock,
            paid: payment,
            fee: split.fee,
            sold_total: lock,
        }));
        ledger.commit(batch)?;

        debug!(id = %id, buyer = %caller, paid = %payment, fee = %split.fee, "rights purchased");

        Ok(BuyResult {
            id,
            buyer: caller,
            quantity: lock,
            paid: payment,
            fee: split.fee,
            remaining: Amount::ZERO,
        })
    }

    fn claim(&mut self, caller: Address, id: PositionId) -> Result<ClaimResult, EscrowError> {
        let ledger = &mut self.ledger;
        let now = ledger.time();
        let position = ledger.require_open(&id)?;

        if caller == position.origin {
            return Err(EscrowError::SelfDealing { id, caller });
        }

        if caller != position.owner {
            return Err(EscrowError::NotOwner { id, caller });
        }

        if now >= position.expire {
            return Err(EscrowError::Expired { expire: position.expire, now });
        }

        let mut updated = position.clone();
        let strike = updated.price_out;
        let released = updated.outstanding();
        updated.status = PositionStatus::Redeemed;
        updated.released = updated.lock;
        let origin = updated.origin;
        let quote = ledger.params.quote.id;
        let collateral = ledger.params.collateral.id;

        let mut batch = ledger.begin();
        ledger.write_position(updated);
        ledger.credit_proceeds(origin, strike).map_err(|e| ledger.abort(e))?;
        batch.pull(quote, caller, strike, MovementReason::StrikePayment);
        batch.push(collateral, caller, released, MovementReason::ReleaseCollateral);
        ledger.stage(EventPayload::Claimed(ClaimedEvent {
            id,
            holder: caller,
            quantity: released,
            paid: strike,
            status: PositionStatus::Redeemed,
        }));
        ledger.commit(batch)?;

        info!(id = %id, holder = %caller, released = %released, paid = %strike, "position redeemed");

        Ok(ClaimResult {
            id,
            holder: caller,
            released,
            paid: strike,
            position_status: PositionStatus::Redeemed,
        })
    }

    fn back(&mut self, caller: Address, id: PositionId) -> Result<BackResult, EscrowError> {
        let ledger = &mut self.ledger;
        let now = ledger.time();
        let position = ledger.require_open(&id)?;

        let (deadline, reason) = match position.status {
            PositionStatus::Alive => (position.until.unwrap_or(position.expire), ReclaimReason::Unsold),
            _ => (position.expire, ReclaimReason::Unredeemed),
        };

        if now < deadline {
            return Err(EscrowError::NotYetReclaimable { deadline, now });
        }

        let mut updated = position.clone();
        let returned = updated.outstanding();
        updated.status = PositionStatus::Reclaimed;
        updated.released = updated.lock;
        let origin = updated.origin;
        let collateral = ledger.params.collateral.id;

        let mut batch = ledger.begin();
        ledger.write_position(updated);
        batch.push(collateral, origin, returned, MovementReason::ReturnCollateral);
        ledger.stage(EventPayload::Reclaimed(ReclaimedEvent {
            id,
            origin,
            caller,
            returned,
            reason,
        }));
        ledger.commit(batch)?;

        info!(id = %id, origin = %origin, returned = %returned, reason = ?reason, "position reclaimed");

        Ok(BackResult { id, origin, returned, reason })
    }
}
