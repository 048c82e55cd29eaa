//! Deterministic account addressing
//!
//! Every account the engine touches lives at a program-derived address built
//! from a fixed seed tag and zero or more discriminating keys. No pointers, no
//! registry lookups: anyone holding the program id can locate any record.

use crate::error::{EngineError, EngineResult};
use solana_program::pubkey::{Pubkey, MAX_SEEDS, MAX_SEED_LEN};

/// Seed of the liquidity pool PDA
pub const LIQUIDITY_POOL_SEED: &[u8] = b"liquidity_pool";

/// Seed of the staking vault PDA
pub const VAULT_SEED: &[u8] = b"vault";

/// Seed of the per-principal stake record PDA
pub const STAKE_INFO_SEED: &[u8] = b"stake_info";

/// Seed of a pool custodial account: ["custody", pool, mint]
pub const CUSTODY_SEED: &[u8] = b"custody";

/// Seed of a principal token account: ["token", owner, mint]
pub const TOKEN_SEED: &[u8] = b"token";

/// Seed of the thread authority PDA that signs deferred re-invocations
pub const THREAD_AUTHORITY_SEED: &[u8] = b"authority";

/// Seed of a pending task handle: ["thread", authority, task_id]
pub const THREAD_SEED: &[u8] = b"thread";

/// All registered tags. Prefix-free, so no two roles can derive the same
/// seed byte stream.
pub const SEED_TAGS: [&[u8]; 7] = [
    LIQUIDITY_POOL_SEED,
    VAULT_SEED,
    STAKE_INFO_SEED,
    CUSTODY_SEED,
    TOKEN_SEED,
    THREAD_AUTHORITY_SEED,
    THREAD_SEED,
];

/// Derive an address from a seed tag and discriminating keys.
///
/// Rejects empty tags, tags outside `[a-z0-9_]`, oversize seeds and too many
/// keys with `ConfigurationError`. Pure and idempotent.
pub fn derive_address(
    program_id: &Pubkey,
    tag: &[u8],
    keys: &[&[u8]],
) -> EngineResult<(Pubkey, u8)> {
    validate_seed_tag(tag)?;

    // One seed slot is reserved for the tag and one for the bump
    if keys.len() > MAX_SEEDS - 2 {
        return Err(EngineError::ConfigurationError(format!(
            "too many discriminating keys: {}",
            keys.len()
        )));
    }
    if let Some(key) = keys.iter().find(|k| k.len() > MAX_SEED_LEN) {
        return Err(EngineError::ConfigurationError(format!(
            "discriminating key of {} bytes exceeds {}",
            key.len(),
            MAX_SEED_LEN
        )));
    }

    let mut seeds: Vec<&[u8]> = Vec::with_capacity(keys.len() + 1);
    seeds.push(tag);
    seeds.extend_from_slice(keys);

    Ok(Pubkey::find_program_address(&seeds, program_id))
}

/// Validate a seed tag: non-empty, at most 32 bytes, `[a-z0-9_]` only
pub fn validate_seed_tag(tag: &[u8]) -> EngineResult<()> {
    if tag.is_empty() {
        return Err(EngineError::ConfigurationError("empty seed tag".into()));
    }
    if tag.len() > MAX_SEED_LEN {
        return Err(EngineError::ConfigurationError(format!(
            "seed tag of {} bytes exceeds {}",
            tag.len(),
            MAX_SEED_LEN
        )));
    }
    if !tag
        .iter()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'_')
    {
        return Err(EngineError::ConfigurationError(
            "seed tag must be lowercase ascii, digits or '_'".into(),
        ));
    }
    Ok(())
}

/// Liquidity pool: ["liquidity_pool"]
pub fn pool_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[LIQUIDITY_POOL_SEED], program_id)
}

/// Staking vault: ["vault"]
pub fn vault_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED], program_id)
}

/// Stake record: ["stake_info", principal]
pub fn stake_info_pda(program_id: &Pubkey, principal: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[STAKE_INFO_SEED, principal.as_ref()], program_id)
}

/// Pool custodial account for one asset: ["custody", pool, mint]
pub fn custody_address(program_id: &Pubkey, pool: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[CUSTODY_SEED, pool.as_ref(), mint.as_ref()], program_id).0
}

/// Principal token account for one asset: ["token", owner, mint]
pub fn token_account_address(program_id: &Pubkey, owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[TOKEN_SEED, owner.as_ref(), mint.as_ref()], program_id).0
}

/// Thread authority: ["authority"]
pub fn thread_authority_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[THREAD_AUTHORITY_SEED], program_id)
}

/// Pending task handle: ["thread", authority, task_id]
pub fn thread_pda(program_id: &Pubkey, authority: &Pubkey, task_id: &[u8]) -> EngineResult<Pubkey> {
    if task_id.is_empty() {
        return Err(EngineError::ConfigurationError("empty task identifier".into()));
    }
    derive_address(program_id, THREAD_SEED, &[authority.as_ref(), task_id]).map(|(key, _)| key)
}
