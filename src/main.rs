//! Escrowed option desk simulation.
//!
//! Walks both desk variants through their lifecycles against the in-memory
//! asset layer: purchase and redemption, timeout reclaim, partial fills,
//! and proceeds withdrawal.
//!
//! Usage: `pivot-sim [params.json]`. With a params file the generic lifecycle
//! runs against those params instead of the built-in presets.

use pivot_core::*;
use rust_decimal_macros::dec;
use std::error::Error;

type SimResult = Result<(), Box<dyn Error>>;

const ALICE: u64 = 0xa11ce;
const BOB: u64 = 0xb0b;
const CAROL: u64 = 0xca201;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("Pivot Escrow Desk Simulation\n");

    let result = match std::env::args().nth(1) {
        Some(path) => scenario_from_file(&path),
        None => run_presets(),
    };

    match result {
        Ok(()) => println!("\nAll simulations completed successfully."),
        Err(e) => {
            eprintln!("\nSimulation failed: {e}");
            std::process::exit(1);
        }
    }
}

fn run_presets() -> SimResult {
    scenario_1_single_fill_lifecycle()?;
    scenario_2_unsold_reclaim()?;
    scenario_3_partial_fills()?;
    scenario_4_proceeds()?;
    Ok(())
}

fn addr(n: u64) -> Address {
    Address::from_low_u64(n)
}

fn funded(params: &PivotParams) -> InMemoryAssets {
    let mut assets = InMemoryAssets::new();
    for who in [ALICE, BOB, CAROL] {
        assets.mint(params.collateral.id, addr(who), Amount::from_units(10_000));
        assets.mint(params.quote.id, addr(who), Amount::from_units(1_000_000));
    }
    assets
}

/// Alice locks ETH, Bob buys the right, Bob redeems before expiry.
fn scenario_1_single_fill_lifecycle() -> SimResult {
    println!("Scenario 1: Single-Fill Lifecycle\n");

    let params = Environment::Development.params(Variant::SingleFill);
    let assets = funded(&params);
    let mut desk = SingleFillDesk::new(params, EngineConfig::default(), assets)?;
    desk.set_time(Timestamp::from_secs(1_700_000_000))?;
    let now = desk.time();

    let request = JoinRequest::single(
        PositionId::from_low_u64(1),
        now.plus(4000),
        Amount::from_units(100),
        Amount::from_units(3000),
        now.plus(2000),
        Amount::new_unchecked(dec!(1.5)),
    );
    let joined = desk.join(addr(ALICE), request)?;
    println!("  Alice locks {} ETH in position {}", joined.lock, joined.id);

    let bought = desk.buy(addr(BOB), joined.id, None)?;
    println!("  Bob pays {} DAI (fee {}) for the rights", bought.paid, bought.fee);

    desk.advance_time(1000);
    let claimed = desk.claim(addr(BOB), joined.id)?;
    println!(
        "  Bob pays strike {} DAI and receives {} ETH",
        claimed.paid, claimed.released
    );
    println!("  Status: {:?}", desk.status(&joined.id));
    println!("  Alice proceeds: {} DAI\n", desk.proceeds_of(&addr(ALICE)));

    Ok(())
}

/// Nobody buys before `until`; anyone can send the collateral home.
fn scenario_2_unsold_reclaim() -> SimResult {
    println!("Scenario 2: Unsold Position Reclaim\n");

    let params = Environment::Development.params(Variant::SingleFill);
    let assets = funded(&params);
    let collateral = params.collateral.id;
    let mut desk = SingleFillDesk::new(params, EngineConfig::default(), assets)?;
    let now = desk.time();

    let id = desk
        .join(
            addr(ALICE),
            JoinRequest::single(
                PositionId::from_low_u64(2),
                now.plus(4000),
                Amount::from_units(100),
                Amount::from_units(3000),
                now.plus(2000),
                Amount::from_units(2),
            ),
        )?
        .id;

    match desk.back(addr(CAROL), id) {
        Err(e) => println!("  Early reclaim refused: {e}"),
        Ok(_) => return Err("reclaim before until should fail".into()),
    }

    desk.advance_time(2000);
    let back = desk.back(addr(CAROL), id)?;
    println!("  Carol triggers reclaim: {} ETH back to Alice ({:?})", back.returned, back.reason);
    println!(
        "  Alice ETH balance: {}\n",
        desk.ledger().assets().balance_of(collateral, addr(ALICE))
    );

    Ok(())
}

/// A 1000-unit position sold in slices; oversized requests bounce.
fn scenario_3_partial_fills() -> SimResult {
    println!("Scenario 3: Partial Fills\n");

    let params = Environment::Development.params(Variant::PartialFill);
    let assets = funded(&params);
    let mut desk = PartialFillDesk::new(params, EngineConfig::default(), assets)?;
    let now = desk.time();

    let id = desk
        .join(
            addr(ALICE),
            JoinRequest::partial(
                PositionId::from_low_u64(3),
                now.plus(4000),
                Amount::from_units(10),
                Amount::from_units(100),
                Amount::from_units(1000),
            ),
        )?
        .id;
    println!("  Alice locks 1000 TKN, ask 10 DAI, strike 100 DAI");

    let b = desk.buy(addr(BOB), id, Some(Amount::from_units(400)))?;
    println!("  Bob buys 400 for {} DAI, {} left", b.paid, b.remaining);

    match desk.buy(addr(CAROL), id, Some(Amount::from_units(700))) {
        Err(e) => println!("  Carol's 700 refused: {e}"),
        Ok(_) => return Err("oversized purchase should fail".into()),
    }

    let c = desk.buy(addr(CAROL), id, Some(Amount::from_units(600)))?;
    println!("  Carol buys 600 for {} DAI, status {:?}", c.paid, desk.status(&id));

    let bob = desk.claim(addr(BOB), id)?;
    println!("  Bob redeems {} TKN for {} DAI", bob.released, bob.paid);

    desk.advance_time(4000);
    let back = desk.back(addr(ALICE), id)?;
    println!("  After expiry {} TKN returns to Alice ({:?})\n", back.returned, back.reason);

    Ok(())
}

/// Sales accrue as balances; take moves them out.
fn scenario_4_proceeds() -> SimResult {
    println!("Scenario 4: Proceeds Withdrawal\n");

    let params = Environment::Mainnet.params(Variant::SingleFill);
    let treasury = params.fee_recipient;
    let quote = params.quote.id;
    let assets = funded(&params);
    let mut desk = AnyDesk::new(params, EngineConfig::default(), assets)?;
    let now = desk.time();

    let id = desk
        .join(
            addr(ALICE),
            JoinRequest::single(
                PositionId::from_low_u64(4),
                now.plus(7200),
                Amount::from_units(200),
                Amount::from_units(3000),
                now.plus(3600),
                Amount::from_units(1),
            ),
        )?
        .id;
    desk.buy(addr(BOB), id, None)?;

    println!("  Alice accrued {} DAI", desk.proceeds_of(&addr(ALICE)));
    println!("  Treasury accrued {} DAI", desk.proceeds_of(&treasury));

    let taken = desk.take(addr(ALICE))?;
    let fees = desk.take(treasury)?;
    println!("  Withdrawn: Alice {} DAI, treasury {} DAI", taken.amount, fees.amount);
    println!(
        "  Escrow quote balance left: {}\n",
        desk.ledger().assets().escrow_balance(quote)
    );

    Ok(())
}

/// Run a join-buy-claim-take cycle on user supplied params.
fn scenario_from_file(path: &str) -> SimResult {
    println!("Custom params from {path}\n");

    let json = std::fs::read_to_string(path)?;
    let params = PivotParams::from_json(&json)?;
    let variant = params.variant;
    let assets = funded(&params);
    let mut desk = AnyDesk::new(params, EngineConfig { verbose: true, ..Default::default() }, assets)?;
    let now = desk.time();

    let p = desk.params().clone();
    let expire = now.plus(p.min_expire.saturating_mul(2));
    let lock = p.min_lock.checked_add(p.min_lock).ok_or("lock overflow")?;
    let id = PositionId::from_low_u64(1);

    let request = match variant {
        Variant::SingleFill => JoinRequest::single(
            id,
            expire,
            p.min_price_in,
            p.min_price_out,
            now.plus(p.min_expire),
            lock,
        ),
        Variant::PartialFill => JoinRequest::partial(id, expire, p.min_price_in, p.min_price_out, lock),
    };

    desk.join(addr(ALICE), request)?;
    let bought = desk.buy(addr(BOB), id, Some(lock))?;
    let claimed = desk.claim(addr(BOB), id)?;
    let taken = desk.take(addr(ALICE))?;

    println!("  Bought {} for {}", bought.quantity, bought.paid);
    println!("  Redeemed {} for {}", claimed.released, claimed.paid);
    println!("  Origin withdrew {}", taken.amount);
    println!("  Events recorded: {}", desk.events().len());

    Ok(())
}
