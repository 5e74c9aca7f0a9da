// Thin re-export module: implementation is in `blockchain/core.rs` to allow
// progressive decomposition of chain responsibilities (block structure,
// proof-of-work, whole-chain validation).

pub mod core;
pub use core::*;
