//! Encoding of single instructions into the SPIR-V word format.

use crate::error::{Error, Result};
use crate::id::Id;
use crate::operand::Operands;
use spirv::Op;

/// Largest word count representable in the upper half of the first word.
pub const MAX_WORD_COUNT: usize = u16::MAX as usize;

/// One SPIR-V instruction with pre-flattened operands.
///
/// The optional id slots are emitted in front of the operands, result type
/// first, matching the layout of the grammar (`IdResultType`, `IdResult`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Op,
    pub result_type: Option<Id>,
    pub result_id: Option<Id>,
    pub operands: Operands,
}

impl Instruction {
    pub fn new(opcode: Op, operands: Operands) -> Instruction {
        Instruction {
            opcode,
            result_type: None,
            result_id: None,
            operands,
        }
    }

    pub fn with_result_type(mut self, result_type: Id) -> Self {
        self.result_type = Some(result_type);
        self
    }

    pub fn with_result_id(mut self, result_id: Id) -> Self {
        self.result_id = Some(result_id);
        self
    }

    pub fn word_count(&self) -> usize {
        1 + self.result_type.is_some() as usize
            + self.result_id.is_some() as usize
            + self.operands.len()
    }

    /// Appends the encoded instruction to `out`.
    ///
    /// `out` is left untouched when the instruction is too long.
    pub fn encode_into(&self, out: &mut Vec<u32>) -> Result<()> {
        let word_count = self.word_count();
        let length = u16::try_from(word_count).map_err(|_| Error::EncodingSizeExceeded {
            opcode: self.opcode,
            word_count,
        })?;

        out.reserve(word_count);
        out.push(u32::from(length) << 16 | self.opcode as u32);
        out.extend(self.result_type.map(Id::word));
        out.extend(self.result_id.map(Id::word));
        out.extend_from_slice(&self.operands);
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u32>> {
        let mut words = Vec::with_capacity(self.word_count());
        self.encode_into(&mut words)?;
        Ok(words)
    }
}

/// An instruction split off a word stream, without any knowledge of its
/// operand layout: id slots and literals are all part of `operands`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawInstruction<'a> {
    pub opcode: u16,
    pub operands: &'a [u32],
}

impl RawInstruction<'_> {
    /// The catalogue opcode, if this is a known one.
    pub fn op(&self) -> Option<Op> {
        Op::from_u32(u32::from(self.opcode))
    }
}

/// Splits the first instruction off `words`, returning it and the remainder.
///
/// `offset` is only used for error reporting and should be the position of
/// `words[0]` in the enclosing stream.
pub fn decode(words: &[u32], offset: usize) -> Result<(RawInstruction, &[u32])> {
    let first = *words.first().ok_or(Error::Truncated { offset })?;
    let word_count = (first >> 16) as usize;
    if word_count == 0 || word_count > words.len() {
        return Err(Error::Truncated { offset });
    }

    let inst = RawInstruction {
        opcode: first as u16,
        operands: &words[1..word_count],
    };
    Ok((inst, &words[word_count..]))
}

/// Iterator over the instructions of a word stream.
pub struct Instructions<'a> {
    words: &'a [u32],
    offset: usize,
}

impl<'a> Instructions<'a> {
    pub fn new(words: &'a [u32], offset: usize) -> Self {
        Instructions { words, offset }
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<RawInstruction<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.words.is_empty() {
            return None;
        }
        match decode(self.words, self.offset) {
            Ok((inst, rest)) => {
                self.offset += 1 + inst.operands.len();
                self.words = rest;
                Some(Ok(inst))
            }
            Err(e) => {
                // Stop after the first malformed instruction.
                self.words = &[];
                Some(Err(e))
            }
        }
    }
}
