// pivot-core: escrowed option desk. an origin locks collateral, sells the right
// to redeem it before a deadline, and takes it back if nobody exercises.
// all computation is deterministic; assets move through one trait seam.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: PositionId, Address, AssetId, Amount, Bps, Timestamp
//   2.x  position.rs: position record, creation checks, proportional pricing
//   3.x  shares.rs: partial-fill share sub-ledger
//   5.x  proceeds.rs: pull-payment balances, fee split
//   7.x  config.rs: pivot params, validation, env presets
//   8.x  engine/: ledger, Pivot trait, single-fill and partial-fill desks
//   9.1  settlement.rs: settlement batches, AssetTransfer seam
//   9.2  custody.rs: in-memory asset layer (mocked)
//   11.x events.rs: state transition events for audit

// core escrow modules
pub mod engine;
pub mod events;
pub mod position;
pub mod proceeds;
pub mod shares;
pub mod types;

// integration modules
pub mod config;
pub mod custody;
pub mod settlement;

// re exports for convenience
pub use config::*;
pub use custody::*;
pub use engine::*;
pub use events::*;
pub use position::*;
pub use proceeds::*;
pub use settlement::*;
pub use shares::*;
pub use types::*;
