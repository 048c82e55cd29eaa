//! Instruction encoding and decoding
//!
//! Wire format: one discriminator byte followed by little-endian fields.
//! Pubkeys are 32 raw bytes, task identifiers are a length byte plus bytes,
//! optional fields carry a 0/1 presence byte. All readers bounds-check and
//! fail with `InvalidInstruction`.

use crate::error::EngineError;
use crate::types::{TaskId, Trigger};
use solana_program::pubkey::Pubkey;

/// Read a u8 from instruction data
#[inline]
pub fn read_u8(data: &[u8], offset: usize) -> Result<u8, EngineError> {
    if offset >= data.len() {
        return Err(EngineError::InvalidInstruction);
    }
    Ok(data[offset])
}

/// Read a u64 (little-endian) from instruction data
#[inline]
pub fn read_u64(data: &[u8], offset: usize) -> Result<u64, EngineError> {
    read_bytes::<8>(data, offset).map(u64::from_le_bytes)
}

/// Read an i64 (little-endian) from instruction data
#[inline]
pub fn read_i64(data: &[u8], offset: usize) -> Result<i64, EngineError> {
    read_bytes::<8>(data, offset).map(i64::from_le_bytes)
}

/// Read a fixed-size byte array from instruction data
#[inline]
pub fn read_bytes<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], EngineError> {
    let end = offset.checked_add(N).ok_or(EngineError::InvalidInstruction)?;
    if end > data.len() {
        return Err(EngineError::InvalidInstruction);
    }
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&data[offset..end]);
    Ok(bytes)
}

/// Instruction data reader with tracked offset
pub struct InstructionReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> InstructionReader<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, EngineError> {
        let val = read_u8(self.data, self.offset)?;
        self.offset += 1;
        Ok(val)
    }

    #[inline]
    pub fn read_u64(&mut self) -> Result<u64, EngineError> {
        let val = read_u64(self.data, self.offset)?;
        self.offset += 8;
        Ok(val)
    }

    #[inline]
    pub fn read_i64(&mut self) -> Result<i64, EngineError> {
        let val = read_i64(self.data, self.offset)?;
        self.offset += 8;
        Ok(val)
    }

    #[inline]
    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], EngineError> {
        let val = read_bytes(self.data, self.offset)?;
        self.offset += N;
        Ok(val)
    }

    pub fn read_pubkey(&mut self) -> Result<Pubkey, EngineError> {
        self.read_bytes::<32>().map(Pubkey::new_from_array)
    }

    /// Length-prefixed task identifier
    pub fn read_task_id(&mut self) -> Result<TaskId, EngineError> {
        let len = self.read_u8()? as usize;
        let end = self.offset.checked_add(len).ok_or(EngineError::InvalidInstruction)?;
        if end > self.data.len() {
            return Err(EngineError::InvalidInstruction);
        }
        let id = TaskId::new(&self.data[self.offset..end])?;
        self.offset = end;
        Ok(id)
    }

    pub fn read_trigger(&mut self) -> Result<Trigger, EngineError> {
        match self.read_u8()? {
            0 => Ok(Trigger::Immediate),
            1 => Ok(Trigger::Timestamp(self.read_i64()?)),
            2 => Ok(Trigger::Slot(self.read_u64()?)),
            _ => Err(EngineError::InvalidInstruction),
        }
    }

    /// Fail if trailing bytes remain
    pub fn finish(&self) -> Result<(), EngineError> {
        if self.remaining() != 0 {
            return Err(EngineError::InvalidInstruction);
        }
        Ok(())
    }
}

/// Deferred execution request attached to a FundPool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingSchedule {
    pub task_id: TaskId,
    pub trigger: Trigger,
}

/// Instruction discriminator
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionTag {
    CreatePool = 0,
    FundPool = 1,
    Swap = 2,
    InitializeStaking = 3,
    Stake = 4,
    Unstake = 5,
    Resume = 6,
    CancelFunding = 7,
}

impl TryFrom<u8> for InstructionTag {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => InstructionTag::CreatePool,
            1 => InstructionTag::FundPool,
            2 => InstructionTag::Swap,
            3 => InstructionTag::InitializeStaking,
            4 => InstructionTag::Stake,
            5 => InstructionTag::Unstake,
            6 => InstructionTag::Resume,
            7 => InstructionTag::CancelFunding,
            _ => return Err(EngineError::InvalidInstruction),
        })
    }
}

/// Decoded engine instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineInstruction {
    CreatePool,
    FundPool {
        mint: Pubkey,
        source: Pubkey,
        quantity: u64,
        schedule: Option<FundingSchedule>,
    },
    Swap {
        pay_mint: Pubkey,
        receive_mint: Pubkey,
        payer_pay: Pubkey,
        payer_receive: Pubkey,
        amount: u64,
    },
    InitializeStaking {
        mint: Pubkey,
    },
    Stake {
        mint: Pubkey,
        source: Pubkey,
        amount: u64,
        task_id: TaskId,
    },
    Unstake {
        destination: Pubkey,
    },
    /// Re-invocation by the automation driver
    Resume {
        target: Pubkey,
        handle: Pubkey,
    },
    /// Funder withdraws a deferred pool funding
    CancelFunding {
        handle: Pubkey,
    },
}

impl EngineInstruction {
    pub fn tag(&self) -> InstructionTag {
        match self {
            EngineInstruction::CreatePool => InstructionTag::CreatePool,
            EngineInstruction::FundPool { .. } => InstructionTag::FundPool,
            EngineInstruction::Swap { .. } => InstructionTag::Swap,
            EngineInstruction::InitializeStaking { .. } => InstructionTag::InitializeStaking,
            EngineInstruction::Stake { .. } => InstructionTag::Stake,
            EngineInstruction::Unstake { .. } => InstructionTag::Unstake,
            EngineInstruction::Resume { .. } => InstructionTag::Resume,
            EngineInstruction::CancelFunding { .. } => InstructionTag::CancelFunding,
        }
    }

    pub fn unpack(data: &[u8]) -> Result<Self, EngineError> {
        let mut reader = InstructionReader::new(data);
        let tag = InstructionTag::try_from(reader.read_u8()?)?;

        let ix = match tag {
            InstructionTag::CreatePool => EngineInstruction::CreatePool,
            InstructionTag::FundPool => {
                let mint = reader.read_pubkey()?;
                let source = reader.read_pubkey()?;
                let quantity = reader.read_u64()?;
                let schedule = match reader.read_u8()? {
                    0 => None,
                    1 => Some(FundingSchedule {
                        task_id: reader.read_task_id()?,
                        trigger: reader.read_trigger()?,
                    }),
                    _ => return Err(EngineError::InvalidInstruction),
                };
                EngineInstruction::FundPool { mint, source, quantity, schedule }
            }
            InstructionTag::Swap => EngineInstruction::Swap {
                pay_mint: reader.read_pubkey()?,
                receive_mint: reader.read_pubkey()?,
                payer_pay: reader.read_pubkey()?,
                payer_receive: reader.read_pubkey()?,
                amount: reader.read_u64()?,
            },
            InstructionTag::InitializeStaking => EngineInstruction::InitializeStaking {
                mint: reader.read_pubkey()?,
            },
            InstructionTag::Stake => EngineInstruction::Stake {
                mint: reader.read_pubkey()?,
                source: reader.read_pubkey()?,
                amount: reader.read_u64()?,
                task_id: reader.read_task_id()?,
            },
            InstructionTag::Unstake => EngineInstruction::Unstake {
                destination: reader.read_pubkey()?,
            },
            InstructionTag::Resume => EngineInstruction::Resume {
                target: reader.read_pubkey()?,
                handle: reader.read_pubkey()?,
            },
            InstructionTag::CancelFunding => EngineInstruction::CancelFunding {
                handle: reader.read_pubkey()?,
            },
        };

        reader.finish()?;
        Ok(ix)
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut data = vec![self.tag() as u8];
        match self {
            EngineInstruction::CreatePool => {}
            EngineInstruction::FundPool { mint, source, quantity, schedule } => {
                data.extend_from_slice(mint.as_ref());
                data.extend_from_slice(source.as_ref());
                data.extend_from_slice(&quantity.to_le_bytes());
                match schedule {
                    None => data.push(0),
                    Some(s) => {
                        data.push(1);
                        pack_task_id(&mut data, &s.task_id);
                        pack_trigger(&mut data, &s.trigger);
                    }
                }
            }
            EngineInstruction::Swap { pay_mint, receive_mint, payer_pay, payer_receive, amount } => {
                data.extend_from_slice(pay_mint.as_ref());
                data.extend_from_slice(receive_mint.as_ref());
                data.extend_from_slice(payer_pay.as_ref());
                data.extend_from_slice(payer_receive.as_ref());
                data.extend_from_slice(&amount.to_le_bytes());
            }
            EngineInstruction::InitializeStaking { mint } => {
                data.extend_from_slice(mint.as_ref());
            }
            EngineInstruction::Stake { mint, source, amount, task_id } => {
                data.extend_from_slice(mint.as_ref());
                data.extend_from_slice(source.as_ref());
                data.extend_from_slice(&amount.to_le_bytes());
                pack_task_id(&mut data, task_id);
            }
            EngineInstruction::Unstake { destination } => {
                data.extend_from_slice(destination.as_ref());
            }
            EngineInstruction::Resume { target, handle } => {
                data.extend_from_slice(target.as_ref());
                data.extend_from_slice(handle.as_ref());
            }
            EngineInstruction::CancelFunding { handle } => {
                data.extend_from_slice(handle.as_ref());
            }
        }
        data
    }
}

fn pack_task_id(data: &mut Vec<u8>, task_id: &TaskId) {
    // TaskId construction bounds the length to MAX_TASK_ID_LEN
    data.push(task_id.as_bytes().len() as u8);
    data.extend_from_slice(task_id.as_bytes());
}

fn pack_trigger(data: &mut Vec<u8>, trigger: &Trigger) {
    match *trigger {
        Trigger::Immediate => data.push(0),
        Trigger::Timestamp(ts) => {
            data.push(1);
            data.extend_from_slice(&ts.to_le_bytes());
        }
        Trigger::Slot(slot) => {
            data.push(2);
            data.extend_from_slice(&slot.to_le_bytes());
        }
    }
}
