//! Memory-operand encoding for addressing modes 2, 3, and VFP.
//!
//! An [`Address`] packs base register, offset magnitude, sign, and
//! indexing mode into the low 25 bits of the instruction word:
//!
//! ```text
//! 24  23  21   19..16   11..0
//! P   U   W    Rn       offset magnitude
//! ```
//!
//! Word/byte accesses (mode 2) consume that layout directly. Halfword,
//! signed-byte, and doubleword accesses (mode 3) re-split an 8-bit
//! magnitude into two nibbles via [`Address::encoding3`]; VFP loads and
//! stores scale a 4-aligned 10-bit magnitude down to 8 bits via
//! [`Address::vencoding`]. The legality predicates classify which offsets
//! each access width can express, so the macro layer knows when to
//! synthesize `base + offset` in a scratch register instead.

use crate::bits::{is_absolute_uint, is_aligned};
use crate::ir::Register;

const U: u32 = 1 << 23;
const RN_SHIFT: u32 = 16;
const OFFSET_12_MASK: u32 = (1 << 12) - 1;
const MODE_MASK: u32 = (8 | 4 | 1) << 21;

/// Indexing mode, packed as the P/U/W bits at positions 24, 23, 21.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum AddressMode {
    /// `[Rn, #+off]` — offset, no writeback.
    Offset = (8 | 4 | 0) << 21,
    /// `[Rn, #+off]!` — pre-indexed with writeback.
    PreIndex = (8 | 4 | 1) << 21,
    /// `[Rn], #+off` — post-indexed.
    PostIndex = (0 | 4 | 0) << 21,
    /// `[Rn, #-off]` — negative offset, no writeback.
    NegOffset = (8 | 0 | 0) << 21,
}

/// Load access width, for offset legality classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum LoadOperandType {
    SignedByte,
    UnsignedByte,
    SignedHalfword,
    UnsignedHalfword,
    Word,
    WordPair,
    SWord,
    DWord,
}

/// Store access width, for offset legality classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum StoreOperandType {
    Byte,
    Halfword,
    Word,
    WordPair,
    SWord,
    DWord,
}

/// A packed memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    encoding: u32,
}

impl Address {
    /// `[rn, #offset]` with no writeback (the common case).
    #[must_use]
    pub fn new(rn: Register, offset: i32) -> Address {
        Address::with_mode(rn, offset, AddressMode::Offset)
    }

    /// A memory operand with an explicit indexing mode. A negative
    /// `offset` flips the mode's U bit and stores the magnitude.
    #[must_use]
    pub fn with_mode(rn: Register, offset: i32, mode: AddressMode) -> Address {
        assert!(
            is_absolute_uint(12, i64::from(offset)),
            "address offset out of range: {offset}"
        );
        let mut encoding = if offset < 0 {
            (mode as u32 ^ U) | offset.unsigned_abs()
        } else {
            mode as u32 | offset as u32
        };
        encoding |= rn.encoding() << RN_SHIFT;
        Address { encoding }
    }

    /// The mode-2 bit pattern (word/byte loads and stores).
    #[inline]
    #[must_use]
    pub fn encoding(self) -> u32 {
        self.encoding
    }

    /// The mode-3 bit pattern: the 8-bit magnitude re-split into bits
    /// 11..8 and 3..0 (halfword, signed byte, doubleword).
    #[must_use]
    pub fn encoding3(self) -> u32 {
        let offset = self.encoding & OFFSET_12_MASK;
        assert!(offset < 256, "addressing mode 3 offset out of range: {offset}");
        (self.encoding & !OFFSET_12_MASK) | ((offset & 0xF0) << 4) | (offset & 0xF)
    }

    /// The VFP bit pattern: the word-scaled magnitude in bits 7..0 plus
    /// the U bit. Requires a 4-aligned magnitude below 1024 and a plain
    /// offset mode (no indexing).
    #[must_use]
    pub fn vencoding(self) -> u32 {
        let offset = self.encoding & OFFSET_12_MASK;
        assert!(offset < (1 << 10), "VFP offset out of range: {offset}");
        assert!(is_aligned(i64::from(offset), 4), "VFP offset not 4-aligned: {offset}");
        let mode = self.encoding & MODE_MASK;
        assert!(
            mode == AddressMode::Offset as u32 || mode == AddressMode::NegOffset as u32,
            "VFP access requires a plain offset mode"
        );
        let mut vencoding = (self.encoding & (0xF << RN_SHIFT)) | (offset >> 2);
        if mode == AddressMode::Offset as u32 {
            vencoding |= U;
        }
        vencoding
    }

    /// The base-register field (bits 19..16).
    #[inline]
    pub(crate) fn rn_field(self) -> u32 {
        (self.encoding >> RN_SHIFT) & 0xF
    }

    /// Whether `offset` is directly encodable for a load of width `ty`.
    #[must_use]
    pub fn can_hold_load_offset(ty: LoadOperandType, offset: i32) -> bool {
        let offset = i64::from(offset);
        match ty {
            // Addressing mode 3.
            LoadOperandType::SignedByte
            | LoadOperandType::SignedHalfword
            | LoadOperandType::UnsignedHalfword
            | LoadOperandType::WordPair => is_absolute_uint(8, offset),
            // Addressing mode 2.
            LoadOperandType::UnsignedByte | LoadOperandType::Word => is_absolute_uint(12, offset),
            // VFP addressing mode.
            LoadOperandType::SWord | LoadOperandType::DWord => is_absolute_uint(10, offset),
        }
    }

    /// Whether `offset` is directly encodable for a store of width `ty`.
    #[must_use]
    pub fn can_hold_store_offset(ty: StoreOperandType, offset: i32) -> bool {
        let offset = i64::from(offset);
        match ty {
            // Addressing mode 3.
            StoreOperandType::Halfword | StoreOperandType::WordPair => is_absolute_uint(8, offset),
            // Addressing mode 2.
            StoreOperandType::Byte | StoreOperandType::Word => is_absolute_uint(12, offset),
            // VFP addressing mode.
            StoreOperandType::SWord | StoreOperandType::DWord => is_absolute_uint(10, offset),
        }
    }
}
