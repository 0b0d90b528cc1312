//! The escrow interface both desk variants expose.

use super::config::EngineConfig;
use super::core::Ledger;
use super::partial::PartialFillDesk;
use super::results::{
    BackResult, BuyResult, ClaimResult, EscrowError, ExitResult, JoinResult, TakeResult,
};
use super::single::SingleFillDesk;
use crate::config::{ConfigError, PivotParams, Variant};
use crate::events::Event;
use crate::position::{JoinRequest, Position, PositionStatus};
use crate::settlement::AssetTransfer;
use crate::shares::Share;
use crate::types::{Address, Amount, PositionId, Timestamp};

/// Escrow operations plus read accessors.
///
/// Mutating operations are atomic: on `Err` nothing in the ledger changed and
/// no asset moved. Accessors on an unknown id return `None`. The ledger is
/// read-only from outside; every write goes through an operation below.
pub trait Pivot {
    type Assets: AssetTransfer;

    fn variant(&self) -> Variant;
    fn ledger(&self) -> &Ledger<Self::Assets>;

    /// The caller-supplied asset layer. Touching it never changes the ledger.
    fn assets_mut(&mut self) -> &mut Self::Assets;

    /// Lock collateral and offer the right to redeem it.
    fn join(&mut self, caller: Address, request: JoinRequest) -> Result<JoinResult, EscrowError>;

    /// Withdraw a position nobody has bought into.
    fn exit(&mut self, caller: Address, id: PositionId) -> Result<ExitResult, EscrowError>;

    /// Buy redemption rights. single-fill takes `None` or the whole lock.
    fn buy(
        &mut self,
        caller: Address,
        id: PositionId,
        quantity: Option<Amount>,
    ) -> Result<BuyResult, EscrowError>;

    /// Pay the strike and receive collateral.
    fn claim(&mut self, caller: Address, id: PositionId) -> Result<ClaimResult, EscrowError>;

    /// Return unclaimed collateral to origin once the relevant deadline passed.
    fn back(&mut self, caller: Address, id: PositionId) -> Result<BackResult, EscrowError>;

    /// Pay a beneficiary's accrued proceeds out. A zero balance is a no-op.
    fn take(&mut self, beneficiary: Address) -> Result<TakeResult, EscrowError>;

    /// Move the clock forward to `timestamp`; refuses to go backwards.
    fn set_time(&mut self, timestamp: Timestamp) -> Result<(), EscrowError>;

    fn advance_time(&mut self, secs: u64);

    fn position(&self, id: &PositionId) -> Option<&Position> {
        self.ledger().position(id)
    }

    fn origin(&self, id: &PositionId) -> Option<Address> {
        self.position(id).map(|p| p.origin)
    }

    fn owner(&self, id: &PositionId) -> Option<Address> {
        self.position(id).map(|p| p.owner)
    }

    fn lock(&self, id: &PositionId) -> Option<Amount> {
        self.position(id).map(|p| p.lock)
    }

    fn expire(&self, id: &PositionId) -> Option<Timestamp> {
        self.position(id).map(|p| p.expire)
    }

    fn until(&self, id: &PositionId) -> Option<Timestamp> {
        self.position(id).and_then(|p| p.until)
    }

    fn price_in(&self, id: &PositionId) -> Option<Amount> {
        self.position(id).map(|p| p.price_in)
    }

    fn price_out(&self, id: &PositionId) -> Option<Amount> {
        self.position(id).map(|p| p.price_out)
    }

    fn status(&self, id: &PositionId) -> Option<PositionStatus> {
        self.position(id).map(|p| p.status)
    }

    // unknown ids are simply not alive
    fn is_alive(&self, id: &PositionId) -> bool {
        self.position(id).map(|p| p.is_alive()).unwrap_or(false)
    }

    fn share_of(&self, id: &PositionId, holder: &Address) -> Option<Share> {
        self.ledger().share(id, holder)
    }

    fn proceeds_of(&self, holder: &Address) -> Amount {
        self.ledger().proceeds_of(holder)
    }

    fn params(&self) -> &PivotParams {
        self.ledger().params()
    }

    fn events(&self) -> &[Event] {
        self.ledger().events()
    }

    fn time(&self) -> Timestamp {
        self.ledger().time()
    }
}

/// A desk whose variant is picked from the params at runtime.
#[derive(Debug)]
pub enum AnyDesk<A> {
    Single(SingleFillDesk<A>),
    Partial(PartialFillDesk<A>),
}

impl<A: AssetTransfer> AnyDesk<A> {
    pub fn new(params: PivotParams, config: EngineConfig, assets: A) -> Result<Self, ConfigError> {
        match params.variant {
            Variant::SingleFill => Ok(AnyDesk::Single(SingleFillDesk::new(params, config, assets)?)),
            Variant::PartialFill => Ok(AnyDesk::Partial(PartialFillDesk::new(params, config, assets)?)),
        }
    }
}

impl<A: AssetTransfer> Pivot for AnyDesk<A> {
    type Assets = A;

    fn variant(&self) -> Variant {
        match self {
            AnyDesk::Single(d) => d.variant(),
            AnyDesk::Partial(d) => d.variant(),
        }
    }

    fn ledger(&self) -> &Ledger<A> {
        match self {
            AnyDesk::Single(d) => d.ledger(),
            AnyDesk::Partial(d) => d.ledger(),
        }
    }

    fn assets_mut(&mut self) -> &mut A {
        match self {
            AnyDesk::Single(d) => d.assets_mut(),
            AnyDesk::Partial(d) => d.assets_mut(),
        }
    }

    fn take(&mut self, beneficiary: Address) -> Result<TakeResult, EscrowError> {
        match self {
            AnyDesk::Single(d) => d.take(beneficiary),
            AnyDesk::Partial(d) => d.take(beneficiary),
        }
    }

    fn set_time(&mut self, timestamp: Timestamp) -> Result<(), EscrowError> {
        match self {
            AnyDesk::Single(d) => d.set_time(timestamp),
            AnyDesk::Partial(d) => d.set_time(timestamp),
        }
    }

    fn advance_time(&mut self, secs: u64) {
        match self {
            AnyDesk::Single(d) => d.advance_time(secs),
            AnyDesk::Partial(d) => d.advance_time(secs),
        }
    }

    fn join(&mut self, caller: Address, request: JoinRequest) -> Result<JoinResult, EscrowError> {
        match self {
            AnyDesk::Single(d) => d.join(caller, request),
            AnyDesk::Partial(d) => d.join(caller, request),
        }
    }

    fn exit(&mut self, caller: Address, id: PositionId) -> Result<ExitResult, EscrowError> {
        match self {
            AnyDesk::Single(d) => d.exit(caller, id),
            AnyDesk::Partial(d) => d.exit(caller, id),
        }
    }

    fn buy(
        &mut self,
        caller: Address,
        id: PositionId,
        quantity: Option<Amount>,
    ) -> Result<BuyResult, EscrowError> {
        match self {
            AnyDesk::Single(d) => d.buy(caller, id, quantity),
            AnyDesk::Partial(d) => d.buy(caller, id, quantity),
        }
    }

    fn claim(&mut self, caller: Address, id: PositionId) -> Result<ClaimResult, EscrowError> {
        match self {
            AnyDesk::Single(d) => d.claim(caller, id),
            AnyDesk::Partial(d) => d.claim(caller, id),
        }
    }

    fn back(&mut self, caller: Address, id: PositionId) -> Result<BackResult, EscrowError> {
        match self {
            AnyDesk::Single(d) => d.back(caller, id),
            AnyDesk::Partial(d) => d.back(caller, id),
        }
    }
}
