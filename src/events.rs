// 11.0: every committed state change produces an event. used for audit trails and
// notifying external systems. events from a rolled-back operation are never published.

use crate::position::PositionStatus;
use crate::types::{Address, Amount, PositionId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Position lifecycle
    Joined(JoinedEvent),
    Exited(ExitedEvent),
    Bought(BoughtEvent),
    Claimed(ClaimedEvent),
    Reclaimed(ReclaimedEvent),

    // Proceeds
    ProceedsWithdrawn(ProceedsWithdrawnEvent),
}

impl EventPayload {
    pub fn position_id(&self) -> Option<PositionId> {
        match self {
            EventPayload::Joined(e) => Some(e.id),
            EventPayload::Exited(e) => Some(e.id),
            EventPayload::Bought(e) => Some(e.id),
            EventPayload::Claimed(e) => Some(e.id),
            EventPayload::Reclaimed(e) => Some(e.id),
            EventPayload::ProceedsWithdrawn(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinedEvent {
    pub id: PositionId,
    pub origin: Address,
    pub lock: Amount,
    pub price_in: Amount,
    pub price_out: Amount,
    pub expire: Timestamp,
    pub until: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitedEvent {
    pub id: PositionId,
    pub origin: Address,
    pub refunded: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoughtEvent {
    pub id: PositionId,
    pub buyer: Address,
    pub quantity: Amount,
    pub paid: Amount,
    pub fee: Amount,
    pub sold_total: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimedEvent {
    pub id: PositionId,
    pub holder: Address,
    pub quantity: Amount,
    pub paid: Amount,
    pub status: PositionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReclaimReason {
    // nobody bought before `until`
    Unsold,
    // rights were bought but not (fully) exercised before `expire`
    Unredeemed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReclaimedEvent {
    pub id: PositionId,
    pub origin: Address,
    pub caller: Address,
    pub returned: Amount,
    pub reason: ReclaimReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProceedsWithdrawnEvent {
    pub beneficiary: Address,
    pub amount: Amount,
}
