//! # arm-emit — ARM32 Machine-Code Emitter for JIT Backends
//!
//! `arm-emit` is a pure Rust code-emission backend for just-in-time
//! compilers targeting ARMv7-A (A32 mode) with the VFPv3-D32 scalar
//! floating-point extension. A higher layer (an IR lowering or stub
//! generator) drives a typed API of mnemonics; the emitter produces a
//! contiguous little-endian buffer of 32-bit instruction words, resolves
//! intra-buffer forward branches, and manages an object pool of
//! compile-time constants addressed through a dedicated base register.
//!
//! ## Quick Start
//!
//! ```rust
//! use arm_emit::{Assembler, Condition, Register, ShifterOperand};
//!
//! let mut asm = Assembler::new();
//! asm.mov(Register::R0, ShifterOperand::from(Register::R1), Condition::Al);
//! let result = asm.finalize();
//! assert_eq!(result.bytes(), [0x01, 0x00, 0xA0, 0xE1]); // MOV R0, R1
//! ```
//!
//! ## Features
//!
//! - **Pure Rust** — no C/C++ FFI, no LLVM, no system assembler.
//! - **Bit-exact A32 encodings** — data-processing (with barrel shifter),
//!   load/store (addressing modes 2, 3, and VFP), multiply, exclusive
//!   monitors, VFP scalar arithmetic and conversions, branches, system.
//! - **Zero-allocation forward branches** — unresolved branch sites form a
//!   linked list threaded through the instructions' own offset fields.
//! - **Constant pool** — deduplicated heap-object entries and per-call-site
//!   external addresses, materialized as `[CP, #offset]` loads.
//! - **Macro layer** — arbitrary 32-bit immediates, arbitrary-offset
//!   loads/stores, and arbitrary add/sub constants synthesized into legal
//!   instruction sequences.
//! - **`no_std` + `alloc`** — embeddable in runtimes without an OS.
//!
//! All input errors are contract violations by the emitting compiler layer
//! (invalid register sentinels, out-of-range branch targets, misaligned
//! offsets without a fallback) and are reported by panicking at emission or
//! bind time.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
// ── Pedantic lint policy ─────────────────────────────────────────────────
// An instruction encoder intentionally performs many narrowing /
// sign-changing casts between integer widths (i32→u16, u32→i32, …) and
// composes dense hex literals without separators (0xE1A00001, 0x0F9F).
// The lints below are expected and acceptable in this context.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::cast_possible_wrap,
    clippy::unreadable_literal,
    clippy::match_same_arms,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::doc_markdown,
    clippy::similar_names,
    clippy::many_single_char_names,
    clippy::return_self_not_must_use,
    clippy::missing_panics_doc
)]

extern crate alloc;

/// Addressing modes 2, 3, and VFP: offset packing and legality predicates.
pub mod address;
/// The assembler façade: every instruction emitter, labels, and `finalize`.
pub mod assembler;
/// Fixed-width integer helpers shared by the encoders.
pub mod bits;
/// The append-only little-endian code buffer.
pub mod buffer;
/// Registers, conditions, opcodes, shifts, and block address modes.
pub mod ir;
/// Branch-target labels (unused / linked / bound).
pub mod label;
/// The barrel-shifter "operand 2" field encoder.
pub mod operand;
/// The object pool of compile-time constants.
pub mod pool;

// Re-exports
pub use address::{Address, AddressMode, LoadOperandType, StoreOperandType};
pub use assembler::{
    decode_branch_offset, encode_branch_offset, Assembler, AssemblyResult,
    BREAKPOINT_INSTRUCTION, STOP_MESSAGE_SVC_CODE,
};
pub use buffer::AssemblerBuffer;
pub use ir::{
    reg_list, BlockAddressMode, Condition, DRegister, Opcode, RegList, Register, SRegister, Shift,
};
pub use label::Label;
pub use operand::ShifterOperand;
pub use pool::{
    ExternalLabel, Object, ObjectPool, PoolEntry, HEAP_OBJECT_TAG, POOL_DATA_OFFSET, SMI_TAG_SHIFT,
};
