//! Atomicity tests.
//!
//! A rejected settlement must leave the ledger, the share book, the proceeds
//! balances and the event log exactly as they were.

use pivot_core::*;

const ORIGIN: u64 = 0x1001;
const BUYER: u64 = 0x2002;

fn addr(n: u64) -> Address {
    Address::from_low_u64(n)
}

fn single_desk() -> SingleFillDesk<InMemoryAssets> {
    let p = PivotParams::single_fill(addr(0xda1), addr(0xfee));
    let mut assets = InMemoryAssets::new();
    for who in [ORIGIN, BUYER] {
        assets.mint(p.collateral.id, addr(who), Amount::from_units(100));
        assets.mint(p.quote.id, addr(who), Amount::from_units(100_000));
    }
    SingleFillDesk::new(p, EngineConfig::default(), assets).unwrap()
}

fn partial_desk() -> PartialFillDesk<InMemoryAssets> {
    let p = PivotParams::partial_fill(addr(0x7c1), addr(0xda1), addr(0xfee));
    let mut assets = InMemoryAssets::new();
    for who in [ORIGIN, BUYER] {
        assets.mint(p.collateral.id, addr(who), Amount::from_units(10_000));
        assets.mint(p.quote.id, addr(who), Amount::from_units(100_000));
    }
    PartialFillDesk::new(p, EngineConfig::default(), assets).unwrap()
}

fn single_request(desk: &SingleFillDesk<InMemoryAssets>, lock: u64) -> JoinRequest {
    let now = desk.time();
    JoinRequest::single(
        PositionId::from_low_u64(1),
        now.plus(4000),
        Amount::from_units(10),
        Amount::from_units(100),
        now.plus(2000),
        Amount::from_units(lock),
    )
}

fn fail_next<P: Pivot<Assets = InMemoryAssets>>(desk: &mut P) {
    desk.assets_mut()
        .fail_next(TransferError::Unavailable("injected".to_string()));
}

#[test]
fn join_without_funds_creates_nothing() {
    let mut desk = single_desk();
    let request = single_request(&desk, 500);

    let result = desk.join(addr(ORIGIN), request);
    assert!(matches!(
        result,
        Err(EscrowError::Transfer(TransferError::InsufficientFunds { .. }))
    ));
    assert!(desk.position(&PositionId::from_low_u64(1)).is_none());
    assert!(desk.events().is_empty());

    // the id is still free
    let request = single_request(&desk, 50);
    assert!(desk.join(addr(ORIGIN), request).is_ok());
}

#[test]
fn failed_buy_keeps_position_alive() {
    let mut desk = single_desk();
    let request = single_request(&desk, 10);
    let id = desk.join(addr(ORIGIN), request).unwrap().id;
    let snapshot = desk.position(&id).cloned();

    fail_next(&mut desk);
    assert!(matches!(desk.buy(addr(BUYER), id, None), Err(EscrowError::Transfer(_))));

    assert_eq!(desk.position(&id).cloned(), snapshot);
    assert_eq!(desk.proceeds_of(&addr(ORIGIN)), Amount::ZERO);
    assert_eq!(desk.proceeds_of(&addr(0xfee)), Amount::ZERO);
    assert_eq!(desk.events().len(), 1);

    assert!(desk.buy(addr(BUYER), id, None).is_ok());
}

#[test]
fn rejecting_origin_blocks_reclaim_until_accepted() {
    let mut desk = single_desk();
    let request = single_request(&desk, 10);
    let id = desk.join(addr(ORIGIN), request).unwrap().id;
    desk.advance_time(2000);

    desk.assets_mut().reject_transfers_to(addr(ORIGIN));
    assert_eq!(
        desk.back(addr(BUYER), id),
        Err(EscrowError::Transfer(TransferError::Rejected { address: addr(ORIGIN) }))
    );
    assert_eq!(desk.status(&id), Some(PositionStatus::Alive));
    assert_eq!(desk.ledger().outstanding_collateral(), Amount::from_units(10));

    desk.assets_mut().accept_transfers_to(&addr(ORIGIN));
    assert!(desk.back(addr(BUYER), id).is_ok());
    assert_eq!(desk.ledger().outstanding_collateral(), Amount::ZERO);
}

#[test]
fn failed_take_keeps_balance() {
    let mut desk = single_desk();
    let request = single_request(&desk, 10);
    let id = desk.join(addr(ORIGIN), request).unwrap().id;
    desk.buy(addr(BUYER), id, None).unwrap();
    let owed = desk.proceeds_of(&addr(ORIGIN));

    fail_next(&mut desk);
    assert!(desk.take(addr(ORIGIN)).is_err());
    assert_eq!(desk.proceeds_of(&addr(ORIGIN)), owed);

    assert_eq!(desk.take(addr(ORIGIN)).unwrap().amount, owed);
}

#[test]
fn failed_partial_buy_restores_share_book() {
    let mut desk = partial_desk();
    let now = desk.time();
    let id = desk
        .join(
            addr(ORIGIN),
            JoinRequest::partial(
                PositionId::from_low_u64(1),
                now.plus(4000),
                Amount::from_units(10),
                Amount::from_units(100),
                Amount::from_units(1000),
            ),
        )
        .unwrap()
        .id;

    desk.buy(addr(BUYER), id, Some(Amount::from_units(100))).unwrap();
    let share_before = desk.share_of(&id, &addr(BUYER));
    let sold_before = desk.position(&id).map(|p| p.sold);

    fail_next(&mut desk);
    assert!(desk.buy(addr(BUYER), id, Some(Amount::from_units(200))).is_err());
    assert_eq!(desk.share_of(&id, &addr(BUYER)), share_before);
    assert_eq!(desk.position(&id).map(|p| p.sold), sold_before);

    fail_next(&mut desk);
    assert!(desk.claim(addr(BUYER), id).is_err());
    let share = desk.share_of(&id, &addr(BUYER)).unwrap();
    assert_eq!(share.status, ShareStatus::Held);
    assert_eq!(desk.position(&id).map(|p| p.released), Some(Amount::ZERO));

    assert!(desk.claim(addr(BUYER), id).is_ok());
}

#[test]
fn escrow_matches_ledger_after_failures() {
    let mut desk = single_desk();
    let request = single_request(&desk, 10);
    let id = desk.join(addr(ORIGIN), request).unwrap().id;

    fail_next(&mut desk);
    let _ = desk.buy(addr(BUYER), id, None);
    desk.buy(addr(BUYER), id, None).unwrap();

    let params = desk.params().clone();
    let ledger = desk.ledger();
    assert_eq!(
        ledger.assets().escrow_balance(params.collateral.id),
        ledger.outstanding_collateral()
    );
    assert_eq!(
        ledger.assets().escrow_balance(params.quote.id),
        ledger.outstanding_proceeds()
    );
}
