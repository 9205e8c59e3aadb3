//! Flattening of literal and enumerant operands into raw SPIR-V words.
//!
//! Every operand an instruction takes ends up as a run of 32-bit words. The
//! [`Operand`] trait captures "knows how to append its words", and the
//! [`operands!`](crate::operands) macro stitches heterogeneous operands
//! together into one list:
//!
//! ```
//! use spirv_assembler::{operands, Id};
//! use spirv::StorageClass;
//!
//! let words = operands![Id(3), StorageClass::Output, "main"];
//! assert_eq!(&words[..], &[3, 3, 0x6e69_616d, 0]);
//! ```

use crate::id::Id;
use smallvec::SmallVec;

/// Flattened operand words of a single instruction.
pub type Operands = SmallVec<[u32; 4]>;

pub trait Operand {
    fn write_words(&self, out: &mut Operands);
}

/// Flattens any number of [`Operand`]s into an [`Operands`] list.
#[macro_export]
macro_rules! operands {
    () => { $crate::Operands::new() };
    ($($operand:expr),+ $(,)?) => {{
        let mut words = $crate::Operands::new();
        $( $crate::Operand::write_words(&$operand, &mut words); )+
        words
    }};
}

/// UTF-8 bytes packed four per word, little-endian, always nul-terminated.
///
/// A string whose length is a multiple of four gets an extra zero word.
pub fn string(s: &str) -> Operands {
    let mut words = Operands::new();
    write_string(s, &mut words);
    words
}

fn write_string(s: &str, out: &mut Operands) {
    let bytes = s.as_bytes();
    out.reserve(bytes.len() / 4 + 1);
    for chunk in bytes.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        out.push(u32::from_le_bytes(word));
    }
    if bytes.len() % 4 == 0 {
        out.push(0);
    }
}

pub fn float(value: f32) -> u32 {
    value.to_bits()
}

pub fn int(value: i32) -> u32 {
    value as u32
}

pub fn short(value: i16) -> u32 {
    i32::from(value) as u32
}

/// High word first.
pub fn long(value: i64) -> [u32; 2] {
    split_u64(value as u64)
}

/// High word first.
pub fn double(value: f64) -> [u32; 2] {
    split_u64(value.to_bits())
}

fn split_u64(bits: u64) -> [u32; 2] {
    [(bits >> 32) as u32, bits as u32]
}

impl Operand for u32 {
    fn write_words(&self, out: &mut Operands) {
        out.push(*self);
    }
}

impl Operand for i32 {
    fn write_words(&self, out: &mut Operands) {
        out.push(int(*self));
    }
}

impl Operand for i16 {
    fn write_words(&self, out: &mut Operands) {
        out.push(short(*self));
    }
}

impl Operand for f32 {
    fn write_words(&self, out: &mut Operands) {
        out.push(float(*self));
    }
}

impl Operand for bool {
    fn write_words(&self, out: &mut Operands) {
        out.push(*self as u32);
    }
}

impl Operand for u64 {
    fn write_words(&self, out: &mut Operands) {
        out.extend_from_slice(&split_u64(*self));
    }
}

impl Operand for i64 {
    fn write_words(&self, out: &mut Operands) {
        out.extend_from_slice(&long(*self));
    }
}

impl Operand for f64 {
    fn write_words(&self, out: &mut Operands) {
        out.extend_from_slice(&double(*self));
    }
}

impl Operand for Id {
    fn write_words(&self, out: &mut Operands) {
        out.push(self.0);
    }
}

impl Operand for str {
    fn write_words(&self, out: &mut Operands) {
        write_string(self, out);
    }
}

impl Operand for String {
    fn write_words(&self, out: &mut Operands) {
        write_string(self, out);
    }
}

impl<T: Operand + ?Sized> Operand for &T {
    fn write_words(&self, out: &mut Operands) {
        (**self).write_words(out);
    }
}

impl<T: Operand> Operand for [T] {
    fn write_words(&self, out: &mut Operands) {
        for operand in self {
            operand.write_words(out);
        }
    }
}

impl<T: Operand, const N: usize> Operand for [T; N] {
    fn write_words(&self, out: &mut Operands) {
        self[..].write_words(out);
    }
}

impl<T: Operand> Operand for Vec<T> {
    fn write_words(&self, out: &mut Operands) {
        self[..].write_words(out);
    }
}

impl Operand for Operands {
    fn write_words(&self, out: &mut Operands) {
        out.extend_from_slice(self);
    }
}

/// Absent optional operands contribute no words.
impl<T: Operand> Operand for Option<T> {
    fn write_words(&self, out: &mut Operands) {
        if let Some(operand) = self {
            operand.write_words(out);
        }
    }
}

macro_rules! enum_operands {
    ($($ty:ident),* $(,)?) => {
        $(
            impl Operand for spirv::$ty {
                fn write_words(&self, out: &mut Operands) {
                    out.push(*self as u32);
                }
            }
        )*
    };
}

macro_rules! mask_operands {
    ($($ty:ident),* $(,)?) => {
        $(
            impl Operand for spirv::$ty {
                fn write_words(&self, out: &mut Operands) {
                    out.push(self.bits());
                }
            }
        )*
    };
}

enum_operands! {
    AddressingModel,
    BuiltIn,
    Capability,
    Decoration,
    Dim,
    ExecutionMode,
    ExecutionModel,
    ImageFormat,
    MemoryModel,
    Op,
    SourceLanguage,
    StorageClass,
}

mask_operands! {
    FunctionControl,
    LoopControl,
    MemoryAccess,
    SelectionControl,
}
