//! Instruction builder for task re-invocation

use ptsol_common::EngineInstruction;
use ptsol_pool::ScheduledTask;
use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

/// Build the `Resume` instruction for a delivered task
///
/// Accounts: the record owning the pending task (writable), the task's thread
/// address, and the keeper as signer.
pub fn build_resume_instruction(program_id: &Pubkey, task: &ScheduledTask, keeper: &Pubkey) -> Instruction {
    let data = EngineInstruction::Resume {
        target: task.target,
        handle: task.handle,
    }
    .pack();

    let accounts = vec![
        AccountMeta::new(task.target, false),
        AccountMeta::new_readonly(task.handle, false),
        AccountMeta::new_readonly(*keeper, true),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// One `Resume` per delivered task, in delivery order
pub fn build_resume_batch(program_id: &Pubkey, tasks: &[ScheduledTask], keeper: &Pubkey) -> Vec<Instruction> {
    tasks
        .iter()
        .map(|task| build_resume_instruction(program_id, task, keeper))
        .collect()
}
