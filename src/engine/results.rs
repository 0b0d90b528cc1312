// 8.0.2: result types and errors for desk operations.

use crate::config::ConfigError;
use crate::events::ReclaimReason;
use crate::position::PositionStatus;
use crate::settlement::TransferError;
use crate::types::{Address, Amount, PositionId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinResult {
    pub id: PositionId,
    pub origin: Address,
    pub lock: Amount,
    pub expire: Timestamp,
    pub until: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitResult {
    pub id: PositionId,
    pub refunded: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyResult {
    pub id: PositionId,
    pub buyer: Address,
    pub quantity: Amount,
    pub paid: Amount,
    pub fee: Amount,
    pub remaining: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimResult {
    pub id: PositionId,
    pub holder: Address,
    pub released: Amount,
    pub paid: Amount,
    pub position_status: PositionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackResult {
    pub id: PositionId,
    pub origin: Address,
    pub returned: Amount,
    pub reason: ReclaimReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TakeResult {
    pub beneficiary: Address,
    pub amount: Amount,
}

/// Coarse classification of why an operation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    Authorization,
    State,
    Timing,
    Quantity,
    Transfer,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EscrowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // validation
    #[error("Taken: position {0} already exists")]
    IdTaken(PositionId),

    #[error("Single-fill positions need a purchase deadline")]
    MissingUntil,

    #[error("Partial-fill positions have no purchase deadline")]
    UntilNotSupported,

    #[error("Partial-fill purchases need a quantity")]
    MissingQuantity,

    #[error("Quantity must be positive")]
    ZeroQuantity,

    #[error("Value is less than min_lock: {lock} < {minimum}")]
    LockBelowMinimum { lock: Amount, minimum: Amount },

    #[error("price_in less than min_price_in: {price_in} < {minimum}")]
    PriceInBelowMinimum { price_in: Amount, minimum: Amount },

    #[error("price_out less than min_price_out: {price_out} < {minimum}")]
    PriceOutBelowMinimum { price_out: Amount, minimum: Amount },

    #[error("Expire less than now: {expire} <= {now}")]
    ExpireInPast { expire: Timestamp, now: Timestamp },

    #[error("Until less than now: {until} <= {now}")]
    UntilInPast { until: Timestamp, now: Timestamp },

    #[error("Expire is less than min_expire: {horizon}s < {minimum}s")]
    ExpiryTooSoon { horizon: i64, minimum: i64 },

    #[error("Invalid until: {until} is not before expire {expire}")]
    UntilNotBeforeExpire { until: Timestamp, expire: Timestamp },

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    // authorization
    #[error("Auth: {caller} does not hold the rights to position {id}")]
    NotOwner { id: PositionId, caller: Address },

    #[error("Same: {caller} is the origin of position {id}")]
    SelfDealing { id: PositionId, caller: Address },

    #[error("No shares: {caller} holds no share of position {id}")]
    NoShares { id: PositionId, caller: Address },

    // state
    #[error("Position {0} not found")]
    PositionNotFound(PositionId),

    #[error("Not alive: position {id} is {status}")]
    NotAlive { id: PositionId, status: PositionStatus },

    #[error("Position {0} already purchased")]
    AlreadyPurchased(PositionId),

    #[error("Share of {holder} in position {id} already redeemed")]
    SharesAlreadyRedeemed { id: PositionId, holder: Address },

    // timing
    #[error("Until exceeded: purchases closed at {deadline}, now {now}")]
    PurchaseWindowClosed { deadline: Timestamp, now: Timestamp },

    #[error("Expired: redemption closed at {expire}, now {now}")]
    Expired { expire: Timestamp, now: Timestamp },

    #[error("Not expired: reclaim opens at {deadline}, now {now}")]
    NotYetReclaimable { deadline: Timestamp, now: Timestamp },

    #[error("Clock cannot move backwards from {current} to {requested}")]
    ClockRegression { current: Timestamp, requested: Timestamp },

    // quantity
    #[error("Requested {requested} but only {remaining} remains unsold")]
    QuantityExceedsRemaining { requested: Amount, remaining: Amount },

    #[error("Single-fill purchases take the whole lock {lock}, got {requested}")]
    QuantityMismatch { requested: Amount, lock: Amount },

    #[error("Quantity {quantity} is too small to carry a payment")]
    DustQuantity { quantity: Amount },

    #[error("Transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

impl EscrowError {
    pub fn kind(&self) -> ErrorKind {
        use EscrowError::*;
        match self {
            Config(_) => ErrorKind::Configuration,
            IdTaken(_)
            | MissingUntil
            | UntilNotSupported
            | MissingQuantity
            | ZeroQuantity
            | LockBelowMinimum { .. }
            | PriceInBelowMinimum { .. }
            | PriceOutBelowMinimum { .. }
            | ExpireInPast { .. }
            | UntilInPast { .. }
            | ExpiryTooSoon { .. }
            | UntilNotBeforeExpire { .. }
            | ArithmeticOverflow => ErrorKind::Validation,
            NotOwner { .. } | SelfDealing { .. } | NoShares { .. } => ErrorKind::Authorization,
            PositionNotFound(_)
            | NotAlive { .. }
            | AlreadyPurchased(_)
            | SharesAlreadyRedeemed { .. } => ErrorKind::State,
            PurchaseWindowClosed { .. }
            | Expired { .. }
            | NotYetReclaimable { .. }
            | ClockRegression { .. } => ErrorKind::Timing,
            QuantityExceedsRemaining { .. } | QuantityMismatch { .. } | DustQuantity { .. } => {
                ErrorKind::Quantity
            }
            Transfer(_) => ErrorKind::Transfer,
        }
    }
}
