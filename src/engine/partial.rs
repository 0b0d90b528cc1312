//! Partial-fill desk: many buyers take slices of one position.
//!
//! Each slice is a share in the `ShareBook`. Prices scale with quantity:
//! `price * quantity / lock`, truncated to the quote asset's decimals.

use super::config::EngineConfig;
use super::core::Ledger;
use super::desk::Pivot;
use super::results::{
    BackResult, BuyResult, ClaimResult, EscrowError, ExitResult, JoinResult, TakeResult,
};
use crate::config::{ConfigError, PivotParams, Variant};
use crate::events::{BoughtEvent, ClaimedEvent, EventPayload, ReclaimReason, ReclaimedEvent};
use crate::position::{proportional_cost, JoinRequest, PositionStatus};
use crate::settlement::{AssetTransfer, MovementReason};
use crate::shares::{Share, ShareStatus};
use crate::types::{Address, Amount, PositionId, Timestamp};
use tracing::{debug, info};

#[derive(Debug)]
pub struct PartialFillDesk<A> {
    ledger: Ledger<A>,
}

impl<A: AssetTransfer> PartialFillDesk<A> {
    pub fn new(params: PivotParams, config: EngineConfig, assets: A) -> Result<Self, ConfigError> {
        if params.variant != Variant::PartialFill {
            return Err(ConfigError::VariantMismatch {
                expected: Variant::PartialFill,
                actual: params.variant,
            });
        }
        Ok(Self { ledger: Ledger::new(params, config, assets)? })
    }

    pub fn into_ledger(self) -> Ledger<A> {
        self.ledger
    }

    /// Every holder of a share in `id`, sorted by address.
    pub fn holders(&self, id: &PositionId) -> Vec<(Address, Share)> {
        self.ledger.shares().holders(id)
    }
}

impl<A: AssetTransfer> Pivot for PartialFillDesk<A> {
    type Assets = A;

    fn variant(&self) -> Variant {
        Variant::PartialFill
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
        if request.until.is_some() {
            return Err(EscrowError::UntilNotSupported);
        }
        self.ledger.open(caller, request)
    }

    // only while nothing has been sold
    fn exit(&mut self, caller: Address, id: PositionId) -> Result<ExitResult, EscrowError> {
        self.ledger.cancel(caller, id)
    }

    fn buy(
        &mut self,
        caller: Address,
        id: PositionId,
        quantity: Option<Amount>,
    ) -> Result<BuyResult, EscrowError> {
        let quantity = quantity.ok_or(EscrowError::MissingQuantity)?;
        if quantity.is_zero() {
            return Err(EscrowError::ZeroQuantity);
        }

        let ledger = &mut self.ledger;
        let now = ledger.time();
        let position = ledger.require_open(&id)?;

        if caller == position.origin {
            return Err(EscrowError::SelfDealing { id, caller });
        }

        if now >= position.expire {
            return Err(EscrowError::PurchaseWindowClosed { deadline: position.expire, now });
        }

        let remaining = position.remaining();
        if quantity > remaining {
            return Err(EscrowError::QuantityExceedsRemaining { requested: quantity, remaining });
        }

        // both the ask and the strike for this slice must cost something
        let decimals = ledger.params.quote.decimals;
        let payment = proportional_cost(position.price_in, quantity, position.lock, decimals)?;
        let strike = proportional_cost(position.price_out, quantity, position.lock, decimals)?;
        if payment.is_zero() || strike.is_zero() {
            return Err(EscrowError::DustQuantity { quantity });
        }

        let mut updated = position.clone();
        updated.sold = updated.sold.checked_add(quantity).ok_or(EscrowError::ArithmeticOverflow)?;
        if updated.sold == updated.lock {
            updated.status = PositionStatus::Purchased;
        }
        let share = Share::topped_up(ledger.share(&id, &caller), quantity)
            .ok_or(EscrowError::ArithmeticOverflow)?;
        let origin = updated.origin;
        let sold_total = updated.sold;
        let remaining = updated.remaining();
        let quote = ledger.params.quote.id;

        let mut batch = ledger.begin();
        ledger.write_position(updated);
        ledger.write_share(id, caller, share);
        let split = ledger.route_payment(origin, payment).map_err(|e| ledger.abort(e))?;
        batch.pull(quote, caller, payment, MovementReason::AskPayment);
        ledger.stage(EventPayload::Bought(BoughtEvent {
            id,
            buyer: caller,
            quantity,
            paid: payment,
            fee: split.fee,
            sold_total,
        }));
        ledger.commit(batch)?;

        debug!(
            id = %id,
            buyer = %caller,
            quantity = %quantity,
            paid = %payment,
            remaining = %remaining,
            "share purchased"
        );

        Ok(BuyResult {
            id,
            buyer: caller,
            quantity,
            paid: payment,
            fee: split.fee,
            remaining,
        })
    }

    fn claim(&mut self, caller: Address, id: PositionId) -> Result<ClaimResult, EscrowError> {
        let ledger = &mut self.ledger;
        let now = ledger.time();
        let position = ledger.require(&id)?;

        if caller == position.origin {
            return Err(EscrowError::SelfDealing { id, caller });
        }

        // a fully redeemed position still answers with the share error below
        if matches!(position.status, PositionStatus::Cancelled | PositionStatus::Reclaimed) {
            return Err(EscrowError::NotAlive { id, status: position.status });
        }

        let share = ledger
            .share(&id, &caller)
            .ok_or(EscrowError::NoShares { id, caller })?;
        if !share.is_redeemable() {
            if share.status == ShareStatus::Redeemed {
                return Err(EscrowError::SharesAlreadyRedeemed { id, holder: caller });
            }
            return Err(EscrowError::NoShares { id, caller });
        }

        if now >= position.expire {
            return Err(EscrowError::Expired { expire: position.expire, now });
        }

        let decimals = ledger.params.quote.decimals;
        let strike = proportional_cost(position.price_out, share.quantity, position.lock, decimals)?;

        let mut updated = position.clone();
        updated.released = updated
            .released
            .checked_add(share.quantity)
            .ok_or(EscrowError::ArithmeticOverflow)?;
        if updated.released == updated.lock {
            updated.status = PositionStatus::Redeemed;
        }
        let status = updated.status;
        let origin = updated.origin;
        let quote = ledger.params.quote.id;
        let collateral = ledger.params.collateral.id;
        let redeemed = Share { quantity: share.quantity, status: ShareStatus::Redeemed };

        let mut batch = ledger.begin();
        ledger.write_position(updated);
        ledger.write_share(id, caller, redeemed);
        ledger.credit_proceeds(origin, strike).map_err(|e| ledger.abort(e))?;
        batch.pull(quote, caller, strike, MovementReason::StrikePayment);
        batch.push(collateral, caller, share.quantity, MovementReason::ReleaseCollateral);
        ledger.stage(EventPayload::Claimed(ClaimedEvent {
            id,
            holder: caller,
            quantity: share.quantity,
            paid: strike,
            status,
        }));
        ledger.commit(batch)?;

        if status == PositionStatus::Redeemed {
            info!(id = %id, holder = %caller, "position fully redeemed");
        } else {
            debug!(id = %id, holder = %caller, quantity = %share.quantity, paid = %strike, "share redeemed");
        }

        Ok(ClaimResult {
            id,
            holder: caller,
            released: share.quantity,
            paid: strike,
            position_status: status,
        })
    }

    fn back(&mut self, caller: Address, id: PositionId) -> Result<BackResult, EscrowError> {
        let ledger = &mut self.ledger;
        let now = ledger.time();
        let position = ledger.require_open(&id)?;

        if now < position.expire {
            return Err(EscrowError::NotYetReclaimable { deadline: position.expire, now });
        }

        let reason = if position.sold.is_zero() {
            ReclaimReason::Unsold
        } else {
            ReclaimReason::Unredeemed
        };

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
