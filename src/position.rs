//! Position record and the pure math around it.
//!
//! A position is one escrow: collateral locked by an origin, an ask to buy the
//! right to redeem it, a strike to exercise that right, and two deadlines.
//! Records are never deleted; the status tag is what stops further operations.

use crate::config::PivotParams;
use crate::engine::EscrowError;
use crate::types::{Address, Amount, PositionId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Position lifecycle. `Alive` and `Purchased` are open, the rest are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    /// Created, nothing sold yet (partial-fill: not yet sold out)
    Alive,
    /// Rights sold (partial-fill: every unit sold, shares outstanding)
    Purchased,
    /// Every unit of collateral went to buyers
    Redeemed,
    /// Origin withdrew before any sale
    Cancelled,
    /// A deadline passed and the remainder went back to origin
    Reclaimed,
}

impl PositionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PositionStatus::Redeemed | PositionStatus::Cancelled | PositionStatus::Reclaimed
        )
    }

    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PositionStatus::Alive => "alive",
            PositionStatus::Purchased => "purchased",
            PositionStatus::Redeemed => "redeemed",
            PositionStatus::Cancelled => "cancelled",
            PositionStatus::Reclaimed => "reclaimed",
        };
        f.write_str(s)
    }
}

/// Arguments to `join`. `until` is required by single-fill and refused by partial-fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub id: PositionId,
    pub expire: Timestamp,
    pub price_in: Amount,
    pub price_out: Amount,
    pub until: Option<Timestamp>,
    pub lock: Amount,
}

impl JoinRequest {
    pub fn single(
        id: PositionId,
        expire: Timestamp,
        price_in: Amount,
        price_out: Amount,
        until: Timestamp,
        lock: Amount,
    ) -> Self {
        Self {
            id,
            expire,
            price_in,
            price_out,
            until: Some(until),
            lock,
        }
    }

    pub fn partial(
        id: PositionId,
        expire: Timestamp,
        ask: Amount,
        strike: Amount,
        lock: Amount,
    ) -> Self {
        Self {
            id,
            expire,
            price_in: ask,
            price_out: strike,
            until: None,
            lock,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub origin: Address,
    pub owner: Address,
    pub lock: Amount,
    pub price_in: Amount,
    pub price_out: Amount,
    pub expire: Timestamp,
    pub until: Option<Timestamp>,
    pub status: PositionStatus,
    /// Quantity bought so far. single-fill jumps straight from 0 to `lock`.
    pub sold: Amount,
    /// Collateral already paid out of escrow for this position
    pub released: Amount,
    pub created_at: Timestamp,
}

impl Position {
    pub fn open(origin: Address, request: &JoinRequest, now: Timestamp) -> Self {
        Self {
            id: request.id,
            origin,
            owner: origin,
            lock: request.lock,
            price_in: request.price_in,
            price_out: request.price_out,
            expire: request.expire,
            until: request.until,
            status: PositionStatus::Alive,
            sold: Amount::ZERO,
            released: Amount::ZERO,
            created_at: now,
        }
    }

    pub fn remaining(&self) -> Amount {
        self.lock.saturating_sub(self.sold)
    }

    /// Collateral still sitting in escrow for this position
    pub fn outstanding(&self) -> Amount {
        self.lock.saturating_sub(self.released)
    }

    pub fn is_alive(&self) -> bool {
        self.status.is_open()
    }
}

// 4.1: creation checks, in the order callers observe them
pub fn validate_terms(
    params: &PivotParams,
    request: &JoinRequest,
    now: Timestamp,
) -> Result<(), EscrowError> {
    if request.lock < params.min_lock {
        return Err(EscrowError::LockBelowMinimum {
            lock: request.lock,
            minimum: params.min_lock,
        });
    }

    if request.price_in < params.min_price_in {
        return Err(EscrowError::PriceInBelowMinimum {
            price_in: request.price_in,
            minimum: params.min_price_in,
        });
    }

    if request.price_out < params.min_price_out {
        return Err(EscrowError::PriceOutBelowMinimum {
            price_out: request.price_out,
            minimum: params.min_price_out,
        });
    }

    if request.expire <= now {
        return Err(EscrowError::ExpireInPast { expire: request.expire, now });
    }

    if let Some(until) = request.until {
        if until <= now {
            return Err(EscrowError::UntilInPast { until, now });
        }
    }

    let horizon = now.secs_until(request.expire);
    if horizon < params.min_expire {
        return Err(EscrowError::ExpiryTooSoon {
            horizon,
            minimum: params.min_expire,
        });
    }

    if let Some(until) = request.until {
        if until >= request.expire {
            return Err(EscrowError::UntilNotBeforeExpire {
                until,
                expire: request.expire,
            });
        }
    }

    Ok(())
}

/// `price * quantity / lock`, truncated to `decimals`. the full lock always costs exactly `price`.
pub fn proportional_cost(
    price: Amount,
    quantity: Amount,
    lock: Amount,
    decimals: u32,
) -> Result<Amount, EscrowError> {
    if quantity == lock {
        return Ok(price);
    }
    if lock.is_zero() {
        return Err(EscrowError::ArithmeticOverflow);
    }

    let raw = price
        .value()
        .checked_mul(quantity.value())
        .and_then(|v| v.checked_div(lock.value()))
        .ok_or(EscrowError::ArithmeticOverflow)?;

    Amount::new(raw)
        .map(|a| a.truncate(decimals))
        .ok_or(EscrowError::ArithmeticOverflow)
}
