// 8.0 engine/core.rs: the ledger. positions, shares, proceeds, clock, audit log.
// both desks drive the same ledger; only their transition rules differ.

use super::config::EngineConfig;
use super::results::{EscrowError, ExitResult, JoinResult, TakeResult};
use crate::config::{ConfigError, PivotParams};
use crate::events::{
    Event, EventId, EventPayload, ExitedEvent, JoinedEvent, ProceedsWithdrawnEvent,
};
use crate::position::{validate_terms, JoinRequest, Position, PositionStatus};
use crate::proceeds::{split_fee, FeeSplit, ProceedsLedger};
use crate::settlement::{AssetTransfer, MovementReason, SettlementBatch};
use crate::shares::{Share, ShareBook};
use crate::types::{Address, Amount, PositionId, Timestamp};
use std::collections::HashMap;
use tracing::{debug, info, warn};

// what to put back if the asset layer refuses the batch
#[derive(Debug)]
enum Undo {
    Position { id: PositionId, previous: Option<Position> },
    Share { id: PositionId, holder: Address, previous: Option<Share> },
    Proceeds { holder: Address, previous: Amount },
}

/** 8.1: ledger struct. all escrow state lives here */
#[derive(Debug)]
pub struct Ledger<A> {
    pub(super) config: EngineConfig,
    pub(super) params: PivotParams,
    pub(super) assets: A,
    pub(super) positions: HashMap<PositionId, Position>,
    pub(super) shares: ShareBook,
    pub(super) proceeds: ProceedsLedger,
    pub(super) events: Vec<Event>,
    pub(super) settlements: Vec<SettlementBatch>,
    pub(super) next_event_id: u64,
    pub(super) next_batch_id: u64,
    pub(super) current_time: Timestamp,
    journal: Vec<Undo>,
    staged: Vec<EventPayload>,
}

impl<A: AssetTransfer> Ledger<A> {
    pub fn new(params: PivotParams, config: EngineConfig, assets: A) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            config,
            params,
            assets,
            positions: HashMap::new(),
            shares: ShareBook::new(),
            proceeds: ProceedsLedger::new(),
            events: Vec::new(),
            settlements: Vec::new(),
            next_event_id: 1,
            next_batch_id: 1,
            current_time: Timestamp::from_secs(0),
            journal: Vec::new(),
            staged: Vec::new(),
        })
    }

    pub fn set_time(&mut self, timestamp: Timestamp) -> Result<(), EscrowError> {
        if timestamp < self.current_time {
            return Err(EscrowError::ClockRegression {
                current: self.current_time,
                requested: timestamp,
            });
        }
        self.current_time = timestamp;
        Ok(())
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, secs: u64) {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        self.current_time = self.current_time.plus(secs);
    }

    pub fn params(&self) -> &PivotParams {
        &self.params
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn assets(&self) -> &A {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut A {
        &mut self.assets
    }

    pub fn position(&self, id: &PositionId) -> Option<&Position> {
        self.positions.get(id)
    }

    pub fn share(&self, id: &PositionId, holder: &Address) -> Option<Share> {
        self.shares.get(id, holder)
    }

    pub fn shares(&self) -> &ShareBook {
        &self.shares
    }

    pub fn proceeds_of(&self, holder: &Address) -> Amount {
        self.proceeds.balance_of(holder)
    }

    // what the escrow owes in quote asset right now
    pub fn outstanding_proceeds(&self) -> Amount {
        self.proceeds.total()
    }

    // what the escrow holds in collateral right now
    pub fn outstanding_collateral(&self) -> Amount {
        self.positions.values().map(|p| p.outstanding()).sum()
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    // batches the asset layer accepted, oldest first
    pub fn settlements(&self) -> &[SettlementBatch] {
        &self.settlements
    }

    pub(super) fn require(&self, id: &PositionId) -> Result<&Position, EscrowError> {
        self.positions.get(id).ok_or(EscrowError::PositionNotFound(*id))
    }

    pub(super) fn require_open(&self, id: &PositionId) -> Result<&Position, EscrowError> {
        let position = self.require(id)?;
        if position.status.is_terminal() {
            return Err(EscrowError::NotAlive { id: *id, status: position.status });
        }
        Ok(position)
    }

    // 8.2: journaled writes. everything between begin() and commit() is one unit.

    pub(super) fn begin(&mut self) -> SettlementBatch {
        self.journal.clear();
        self.staged.clear();

        let batch = SettlementBatch::new(self.next_batch_id);
        self.next_batch_id += 1;
        batch
    }

    pub(super) fn write_position(&mut self, position: Position) {
        let id = position.id;
        let previous = self.positions.insert(id, position);
        self.journal.push(Undo::Position { id, previous });
    }

    pub(super) fn write_share(&mut self, id: PositionId, holder: Address, share: Share) {
        let previous = self.shares.set(id, holder, share);
        self.journal.push(Undo::Share { id, holder, previous });
    }

    pub(super) fn credit_proceeds(&mut self, holder: Address, amount: Amount) -> Result<(), EscrowError> {
        if amount.is_zero() {
            return Ok(());
        }
        let current = self.proceeds.balance_of(&holder);
        let updated = current.checked_add(amount).ok_or(EscrowError::ArithmeticOverflow)?;
        let previous = self.proceeds.set(holder, updated);
        self.journal.push(Undo::Proceeds { holder, previous });
        Ok(())
    }

    fn drain_proceeds(&mut self, holder: Address) -> Amount {
        let previous = self.proceeds.set(holder, Amount::ZERO);
        self.journal.push(Undo::Proceeds { holder, previous });
        previous
    }

    pub(super) fn stage(&mut self, payload: EventPayload) {
        self.staged.push(payload);
    }

    // Ledger state is already written. hand the batch over; undo everything if it bounces.
    pub(super) fn commit(&mut self, batch: SettlementBatch) -> Result<(), EscrowError> {
        if !batch.is_empty() {
            if let Err(e) = self.assets.settle(&batch) {
                warn!(
                    batch_id = batch.batch_id,
                    movements = batch.len(),
                    error = %e,
                    "settlement rejected, rolling back"
                );
                self.rollback();
                return Err(EscrowError::Transfer(e));
            }
        }

        self.journal.clear();
        self.record_settlement(batch);
        let staged = std::mem::take(&mut self.staged);
        for payload in staged {
            self.emit_event(payload);
        }
        Ok(())
    }

    fn record_settlement(&mut self, batch: SettlementBatch) {
        if batch.is_empty() || self.config.max_settlements == 0 {
            return;
        }
        self.settlements.push(batch);
        if self.settlements.len() > self.config.max_settlements {
            let drain_count = self.settlements.len() - self.config.max_settlements;
            self.settlements.drain(0..drain_count);
        }
    }

    // an operation failed after begin(); put the ledger back and pass the error on
    pub(super) fn abort(&mut self, error: EscrowError) -> EscrowError {
        self.rollback();
        error
    }

    pub(super) fn rollback(&mut self) {
        while let Some(undo) = self.journal.pop() {
            match undo {
                Undo::Position { id, previous: Some(p) } => {
                    self.positions.insert(id, p);
                }
                Undo::Position { id, previous: None } => {
                    self.positions.remove(&id);
                }
                Undo::Share { id, holder, previous: Some(s) } => {
                    self.shares.set(id, holder, s);
                }
                Undo::Share { id, holder, previous: None } => {
                    self.shares.remove(&id, &holder);
                }
                Undo::Proceeds { holder, previous } => {
                    self.proceeds.set(holder, previous);
                }
            }
        }
        self.staged.clear();
    }

    fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        if self.config.verbose {
            info!(event_id = event.id.0, payload = ?event.payload, "event");
        } else {
            debug!(event_id = event.id.0, payload = ?event.payload, "event");
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }

    // 8.3: operations both desks share

    // fee goes to the protocol, the rest to the seller
    pub(super) fn route_payment(&mut self, seller: Address, payment: Amount) -> Result<FeeSplit, EscrowError> {
        let split = split_fee(payment, self.params.fee_bps, self.params.quote.decimals);
        self.credit_proceeds(seller, split.net)?;
        let recipient = self.params.fee_recipient;
        self.credit_proceeds(recipient, split.fee)?;
        Ok(split)
    }

    pub(super) fn open(&mut self, caller: Address, request: JoinRequest) -> Result<JoinResult, EscrowError> {
        if self.positions.contains_key(&request.id) {
            return Err(EscrowError::IdTaken(request.id));
        }

        let now = self.current_time;
        validate_terms(&self.params, &request, now)?;

        let position = Position::open(caller, &request, now);
        let collateral = self.params.collateral.id;

        let mut batch = self.begin();
        self.write_position(position);
        batch.pull(collateral, caller, request.lock, MovementReason::LockCollateral);
        self.stage(EventPayload::Joined(JoinedEvent {
            id: request.id,
            origin: caller,
            lock: request.lock,
            price_in: request.price_in,
            price_out: request.price_out,
            expire: request.expire,
            until: request.until,
        }));
        self.commit(batch)?;

        debug!(id = %request.id, origin = %caller, lock = %request.lock, expire = %request.expire, "position joined");

        Ok(JoinResult {
            id: request.id,
            origin: caller,
            lock: request.lock,
            expire: request.expire,
            until: request.until,
        })
    }

    // 4.2: only the current owner, only before any sale
    pub(super) fn cancel(&mut self, caller: Address, id: PositionId) -> Result<ExitResult, EscrowError> {
        let position = self.require_open(&id)?;

        if caller != position.owner {
            return Err(EscrowError::NotOwner { id, caller });
        }

        if position.status == PositionStatus::Purchased || !position.sold.is_zero() {
            return Err(EscrowError::AlreadyPurchased(id));
        }

        let mut updated = position.clone();
        let refunded = updated.outstanding();
        updated.status = PositionStatus::Cancelled;
        updated.released = updated.lock;
        let origin = updated.origin;
        let collateral = self.params.collateral.id;

        let mut batch = self.begin();
        self.write_position(updated);
        batch.push(collateral, origin, refunded, MovementReason::ReturnCollateral);
        self.stage(EventPayload::Exited(ExitedEvent { id, origin, refunded }));
        self.commit(batch)?;

        info!(id = %id, origin = %origin, refunded = %refunded, "position cancelled");

        Ok(ExitResult { id, refunded })
    }

    // 4.6: anyone can push a beneficiary's proceeds out to them
    pub(crate) fn take(&mut self, beneficiary: Address) -> Result<TakeResult, EscrowError> {
        let balance = self.proceeds.balance_of(&beneficiary);
        if balance.is_zero() {
            return Ok(TakeResult { beneficiary, amount: Amount::ZERO });
        }

        let quote = self.params.quote.id;

        let mut batch = self.begin();
        let amount = self.drain_proceeds(beneficiary);
        batch.push(quote, beneficiary, amount, MovementReason::ProceedsWithdrawal);
        self.stage(EventPayload::ProceedsWithdrawn(ProceedsWithdrawnEvent { beneficiary, amount }));
        self.commit(batch)?;

        debug!(beneficiary = %beneficiary, amount = %amount, "proceeds withdrawn");

        Ok(TakeResult { beneficiary, amount })
    }
}
