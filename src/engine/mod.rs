// 8.0: escrow engine. one ledger, two rule sets on top of it.
// deterministic: time is an input, assets move through the AssetTransfer seam.

mod config;
mod core;
mod desk;
mod partial;
mod results;
mod single;

pub use config::EngineConfig;
pub use core::Ledger;
pub use desk::{AnyDesk, Pivot};
pub use partial::PartialFillDesk;
pub use results::{
    BackResult, BuyResult, ClaimResult, ErrorKind, EscrowError, ExitResult, JoinResult, TakeResult,
};
pub use single::SingleFillDesk;
