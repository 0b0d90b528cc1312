//! Single-fill desk lifecycle tests.
//!
//! Amounts are whole base units (wei-style), quote decimals 0.

use pivot_core::*;

const ORIGIN: u64 = 0x1001;
const OTHER_GUY: u64 = 0x2002;
const THIRD: u64 = 0x3003;
const START: i64 = 1_600_000_000;

fn addr(n: u64) -> Address {
    Address::from_low_u64(n)
}

fn params() -> PivotParams {
    let mut p = PivotParams::single_fill(addr(0xda1), addr(0xfee));
    p.collateral = AssetConfig::native("ETH", 0);
    p.quote = AssetConfig::token(addr(0xda1), "DAI", 0);
    p.min_lock = Amount::from_units(1000);
    p.min_expire = 1000;
    p.min_price_in = Amount::from_units(1000);
    p.min_price_out = Amount::from_units(100_000);
    p.fee_bps = Bps::new(10);
    p
}

fn setup() -> SingleFillDesk<InMemoryAssets> {
    let p = params();
    let mut assets = InMemoryAssets::new();
    for who in [ORIGIN, OTHER_GUY, THIRD] {
        assets.mint(p.collateral.id, addr(who), Amount::from_units(1_000_000));
        assets.mint(p.quote.id, addr(who), Amount::from_units(1_000_000_000));
    }
    let mut desk = SingleFillDesk::new(p, EngineConfig::default(), assets).unwrap();
    desk.set_time(Timestamp::from_secs(START)).unwrap();
    desk
}

fn request(id: u64, lock: u64) -> JoinRequest {
    let now = Timestamp::from_secs(START);
    JoinRequest::single(
        PositionId::from_low_u64(id),
        now.plus(4000),
        Amount::from_units(100_000),
        Amount::from_units(10_000_000),
        now.plus(2000),
        Amount::from_units(lock),
    )
}

fn eth(desk: &SingleFillDesk<InMemoryAssets>, who: u64) -> Amount {
    desk.ledger().assets().balance_of(AssetId::Native, addr(who))
}

#[test]
fn buy_then_claim_scenario() {
    let mut desk = setup();
    let lock = 50_000;
    let id = desk.join(addr(ORIGIN), request(1, lock)).unwrap().id;

    assert_eq!(desk.status(&id), Some(PositionStatus::Alive));
    assert_eq!(desk.owner(&id), Some(addr(ORIGIN)));
    assert_eq!(desk.ledger().assets().escrow_balance(AssetId::Native), Amount::from_units(lock));

    desk.advance_time(1000);
    let bought = desk.buy(addr(OTHER_GUY), id, None).unwrap();
    assert_eq!(bought.paid, Amount::from_units(100_000));
    assert_eq!(bought.fee, Amount::from_units(100));
    assert_eq!(desk.owner(&id), Some(addr(OTHER_GUY)));

    assert_eq!(desk.buy(addr(THIRD), id, None), Err(EscrowError::AlreadyPurchased(id)));

    let before = eth(&desk, OTHER_GUY);
    let claimed = desk.claim(addr(OTHER_GUY), id).unwrap();
    assert_eq!(claimed.paid, Amount::from_units(10_000_000));
    assert_eq!(claimed.released, Amount::from_units(lock));
    assert_eq!(eth(&desk, OTHER_GUY), before.checked_add(Amount::from_units(lock)).unwrap());

    let again = desk.claim(addr(OTHER_GUY), id);
    assert!(matches!(again, Err(EscrowError::NotAlive { status: PositionStatus::Redeemed, .. })));

    // origin got the ask minus fee, plus the full strike
    assert_eq!(desk.proceeds_of(&addr(ORIGIN)), Amount::from_units(99_900 + 10_000_000));
    assert_eq!(desk.proceeds_of(&addr(0xfee)), Amount::from_units(100));
    assert_eq!(desk.ledger().outstanding_collateral(), Amount::ZERO);
}

#[test]
fn timeout_reclaim_scenario() {
    let mut desk = setup();
    let lock = 50_000;
    let id = desk.join(addr(ORIGIN), request(1, lock)).unwrap().id;
    let before = eth(&desk, ORIGIN);

    assert!(matches!(
        desk.back(addr(THIRD), id),
        Err(EscrowError::NotYetReclaimable { .. })
    ));

    desk.advance_time(2001);
    let back = desk.back(addr(THIRD), id).unwrap();
    assert_eq!(back.returned, Amount::from_units(lock));
    assert_eq!(back.reason, ReclaimReason::Unsold);
    assert_eq!(eth(&desk, ORIGIN), before.checked_add(Amount::from_units(lock)).unwrap());

    assert!(matches!(desk.back(addr(THIRD), id), Err(EscrowError::NotAlive { .. })));
}

#[test]
fn purchased_but_unredeemed_goes_back_after_expire() {
    let mut desk = setup();
    let id = desk.join(addr(ORIGIN), request(1, 5000)).unwrap().id;
    desk.buy(addr(OTHER_GUY), id, None).unwrap();

    // until passed but the buyer still has until expire
    desk.advance_time(3000);
    assert!(matches!(
        desk.back(addr(THIRD), id),
        Err(EscrowError::NotYetReclaimable { .. })
    ));

    desk.advance_time(1000);
    assert!(matches!(desk.claim(addr(OTHER_GUY), id), Err(EscrowError::Expired { .. })));
    let back = desk.back(addr(THIRD), id).unwrap();
    assert_eq!(back.reason, ReclaimReason::Unredeemed);
    assert_eq!(desk.status(&id), Some(PositionStatus::Reclaimed));
}

#[test]
fn duplicate_id_rejected() {
    let mut desk = setup();
    desk.join(addr(ORIGIN), request(7, 1000)).unwrap();
    let again = desk.join(addr(THIRD), request(7, 1000));
    assert_eq!(again, Err(EscrowError::IdTaken(PositionId::from_low_u64(7))));
}

#[test]
fn each_floor_rejects_alone() {
    let mut desk = setup();
    let now = desk.time();

    let mut r = request(1, 999);
    assert!(matches!(desk.join(addr(ORIGIN), r.clone()), Err(EscrowError::LockBelowMinimum { .. })));

    r = request(1, 1000);
    r.price_in = Amount::from_units(999);
    assert!(matches!(desk.join(addr(ORIGIN), r), Err(EscrowError::PriceInBelowMinimum { .. })));

    r = request(1, 1000);
    r.price_out = Amount::from_units(99_999);
    assert!(matches!(desk.join(addr(ORIGIN), r), Err(EscrowError::PriceOutBelowMinimum { .. })));

    r = request(1, 1000);
    r.expire = now;
    assert!(matches!(desk.join(addr(ORIGIN), r), Err(EscrowError::ExpireInPast { .. })));

    r = request(1, 1000);
    r.until = Some(now);
    assert!(matches!(desk.join(addr(ORIGIN), r), Err(EscrowError::UntilInPast { .. })));

    r = request(1, 1000);
    r.expire = now.plus(999);
    r.until = Some(now.plus(500));
    assert!(matches!(desk.join(addr(ORIGIN), r), Err(EscrowError::ExpiryTooSoon { .. })));

    r = request(1, 1000);
    r.until = Some(now.plus(4000));
    assert!(matches!(desk.join(addr(ORIGIN), r), Err(EscrowError::UntilNotBeforeExpire { .. })));

    // nothing was created by any of the failures
    assert!(desk.position(&PositionId::from_low_u64(1)).is_none());
    assert!(desk.events().is_empty());
}

#[test]
fn exit_before_purchase_refunds() {
    let mut desk = setup();
    let id = desk.join(addr(ORIGIN), request(1, 4000)).unwrap().id;

    assert!(matches!(desk.exit(addr(THIRD), id), Err(EscrowError::NotOwner { .. })));
    let result = desk.exit(addr(ORIGIN), id).unwrap();
    assert_eq!(result.refunded, Amount::from_units(4000));
    assert_eq!(desk.status(&id), Some(PositionStatus::Cancelled));
    assert!(!desk.is_alive(&id));

    assert!(matches!(desk.buy(addr(OTHER_GUY), id, None), Err(EscrowError::NotAlive { .. })));
    assert!(matches!(desk.exit(addr(ORIGIN), id), Err(EscrowError::NotAlive { .. })));
}

#[test]
fn origin_cannot_deal_with_itself() {
    let mut desk = setup();
    let id = desk.join(addr(ORIGIN), request(1, 1000)).unwrap().id;
    assert!(matches!(desk.buy(addr(ORIGIN), id, None), Err(EscrowError::SelfDealing { .. })));
    assert!(matches!(desk.claim(addr(ORIGIN), id), Err(EscrowError::SelfDealing { .. })));
    assert!(matches!(desk.claim(addr(THIRD), id), Err(EscrowError::NotOwner { .. })));
}

#[test]
fn proceeds_take_moves_quote_out() {
    let mut desk = setup();
    let id = desk.join(addr(ORIGIN), request(1, 1000)).unwrap().id;
    desk.buy(addr(OTHER_GUY), id, None).unwrap();

    let quote = desk.params().quote.id;
    let before = desk.ledger().assets().balance_of(quote, addr(ORIGIN));
    let taken = desk.take(addr(ORIGIN)).unwrap();
    assert_eq!(taken.amount, Amount::from_units(99_900));
    assert_eq!(
        desk.ledger().assets().balance_of(quote, addr(ORIGIN)),
        before.checked_add(taken.amount).unwrap()
    );
    assert_eq!(desk.proceeds_of(&addr(ORIGIN)), Amount::ZERO);

    // second take is a silent no-op
    let events = desk.events().len();
    assert_eq!(desk.take(addr(ORIGIN)).unwrap().amount, Amount::ZERO);
    assert_eq!(desk.events().len(), events);
}

#[test]
fn events_trace_the_lifecycle() {
    let mut desk = setup();
    let id = desk.join(addr(ORIGIN), request(1, 1000)).unwrap().id;
    desk.buy(addr(OTHER_GUY), id, None).unwrap();
    desk.claim(addr(OTHER_GUY), id).unwrap();

    let kinds: Vec<_> = desk
        .events()
        .iter()
        .map(|e| match &e.payload {
            EventPayload::Joined(_) => "joined",
            EventPayload::Bought(_) => "bought",
            EventPayload::Claimed(_) => "claimed",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["joined", "bought", "claimed"]);
    assert!(desk.events().iter().all(|e| e.payload.position_id() == Some(id)));
}

#[test]
fn negative_price_in_request_never_decodes() {
    let mut raw = serde_json::to_value(request(1, 1000)).unwrap();
    raw["price_in"] = serde_json::Value::String("-400".to_string());
    assert!(serde_json::from_value::<JoinRequest>(raw.clone()).is_err());

    raw["price_in"] = serde_json::Value::String("400".to_string());
    let decoded: JoinRequest = serde_json::from_value(raw).unwrap();
    assert_eq!(decoded.price_in, Amount::from_units(400));
}
