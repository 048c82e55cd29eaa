//! Shared building blocks for the PtSol pool and staking engine:
//! deterministic addressing, the error taxonomy, instruction encoding and
//! the small value types that cross crate boundaries.

pub mod address;
pub mod error;
pub mod instruction;
pub mod math;
pub mod types;

pub use address::*;
pub use error::*;
pub use instruction::*;
pub use math::*;
pub use types::*;
