//! PtSol pool and staking engine
//!
//! A deterministic state machine over a key-addressed ledger store:
//! - Multi-asset liquidity pool under a constant-product invariant
//! - Staking vault with per-principal stake records
//! - Deferred legs (scheduled funding, automated release) registered with an
//!   external scheduler and completed by an explicit `Resume`
//!
//! Every account is located by derived address; nothing is held by reference.

pub mod config;
pub mod engine;
pub mod entrypoint;
pub mod instructions;
pub mod math;
pub mod scheduler;
pub mod state;
pub mod store;

pub use config::EngineConfig;
pub use engine::PoolEngine;
pub use entrypoint::process_instruction;
pub use instructions::*;
pub use math::{pool_invariant, quote_swap, InvariantValue, SwapQuote};
pub use scheduler::*;
pub use state::*;
pub use store::*;

solana_program::declare_id!("iYKtp9m8Kf922xuDmNjLmJ1AQQYRCNJE99AHfY4NYRJ");
