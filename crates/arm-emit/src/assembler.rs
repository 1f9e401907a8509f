//! The assembler façade: instruction emitters, labels, and finalization.
//!
//! Every public method appends exactly one 32-bit A32 instruction word,
//! except the macro-level operations (capitalized in ARM ARM terms:
//! "pseudo-instructions"), which synthesize short legal sequences for
//! requests the ISA cannot express in one word — arbitrary 32-bit
//! immediates, out-of-range offsets, constant-pool loads.
//!
//! ## A32 word layout (data-processing)
//!
//! ```text
//! 31..28  27..26  25  24..21  20  19..16  15..12  11..0
//! cond    00      I   opcode  S   Rn      Rd      operand2
//! ```
//!
//! Branches to [`Label`]s may be emitted before the label is bound. Each
//! unresolved site stores, in its own 24-bit offset field, the position of
//! the previous unresolved site for the same label (zero terminated);
//! the label holds the head. [`Assembler::bind`] walks that chain and
//! patches every site — forward references cost no allocations.

use alloc::vec::Vec;

use crate::address::{Address, AddressMode, LoadOperandType, StoreOperandType};
use crate::bits::{count_one_bits, high_16_bits, is_aligned, is_int, low_16_bits};
use crate::buffer::AssemblerBuffer;
use crate::ir::{BlockAddressMode, Condition, DRegister, Opcode, RegList, Register, SRegister, Shift};
use crate::label::Label;
use crate::operand::ShifterOperand;
use crate::pool::{ExternalLabel, Object, ObjectPool, HEAP_OBJECT_TAG, POOL_DATA_OFFSET};

// ── Encoding constants ───────────────────────────────────────────────────

/// Single-bit masks and multi-purpose flag bits, named by position as in
/// the ARM ARM encoding diagrams.
#[allow(dead_code)]
mod enc {
    pub const H: u32 = 1 << 5; // halfword (or byte)
    pub const L: u32 = 1 << 20; // load (or store)
    pub const B: u32 = 1 << 22; // unsigned byte (or word)

    pub const B0: u32 = 1;
    pub const B1: u32 = 1 << 1;
    pub const B2: u32 = 1 << 2;
    pub const B3: u32 = 1 << 3;
    pub const B4: u32 = 1 << 4;
    pub const B5: u32 = 1 << 5;
    pub const B6: u32 = 1 << 6;
    pub const B7: u32 = 1 << 7;
    pub const B8: u32 = 1 << 8;
    pub const B9: u32 = 1 << 9;
    pub const B10: u32 = 1 << 10;
    pub const B11: u32 = 1 << 11;
    pub const B12: u32 = 1 << 12;
    pub const B16: u32 = 1 << 16;
    pub const B17: u32 = 1 << 17;
    pub const B18: u32 = 1 << 18;
    pub const B19: u32 = 1 << 19;
    pub const B20: u32 = 1 << 20;
    pub const B21: u32 = 1 << 21;
    pub const B22: u32 = 1 << 22;
    pub const B23: u32 = 1 << 23;
    pub const B24: u32 = 1 << 24;
    pub const B25: u32 = 1 << 25;
    pub const B26: u32 = 1 << 26;
    pub const B27: u32 = 1 << 27;
}
use enc::*;

const COND_SHIFT: u32 = 28;
const TYPE_SHIFT: u32 = 25;
const LINK_SHIFT: u32 = 24;
const OPCODE_SHIFT: u32 = 21;
const S_SHIFT: u32 = 20;
const RN_SHIFT: u32 = 16;
const RD_SHIFT: u32 = 12;

const WORD_SIZE: i32 = 4;
const OFFSET_12_MASK: i32 = 0xFFF;
const BRANCH_OFFSET_MASK: u32 = (1 << 24) - 1;

/// The word used to fill uninitialized code memory: `bkpt #0`.
pub const BREAKPOINT_INSTRUCTION: u32 = 0xE120_0070;

/// SVC immediate recognized by the host's simulator/debugger as a `stop`
/// with an inline message word.
pub const STOP_MESSAGE_SVC_CODE: u32 = 0x9_0001;

// ── Branch offset packing ────────────────────────────────────────────────

/// Store a byte `offset` (relative to the branch site) into the 24-bit
/// offset field of `inst`, preserving the other bits. Accounts for the
/// 8-byte PC read-ahead; panics on misaligned or out-of-range offsets.
#[must_use]
pub fn encode_branch_offset(offset: i32, inst: u32) -> u32 {
    // The PC reads 8 bytes ahead of the executing instruction.
    let offset = offset - 8;
    assert!(
        is_aligned(i64::from(offset), 4),
        "branch offset not 4-aligned: {offset}"
    );
    assert!(
        is_int(count_one_bits(BRANCH_OFFSET_MASK) + 2, i64::from(offset)),
        "branch offset out of range: {offset}"
    );
    (inst & !BRANCH_OFFSET_MASK) | (((offset >> 2) as u32) & BRANCH_OFFSET_MASK)
}

/// Recover the byte offset stored by [`encode_branch_offset`]:
/// sign-extend the 24-bit field, scale to bytes, re-add the PC bias.
#[must_use]
pub fn decode_branch_offset(inst: u32) -> i32 {
    ((((inst & BRANCH_OFFSET_MASK) << 8) as i32) >> 6) + 8
}

// ── Assembly result ──────────────────────────────────────────────────────

/// The output of [`Assembler::finalize`]: the code bytes and the object
/// pool the code references through the pool base register.
#[derive(Debug, Clone)]
#[must_use]
pub struct AssemblyResult {
    bytes: Vec<u8>,
    object_pool: ObjectPool,
}

impl AssemblyResult {
    /// The emitted machine code, little-endian, length a multiple of 4.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume and return the code bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The constant pool, in layout order.
    #[must_use]
    pub fn object_pool(&self) -> &ObjectPool {
        &self.object_pool
    }

    /// Split into code bytes and pool.
    #[must_use]
    pub fn into_parts(self) -> (Vec<u8>, ObjectPool) {
        (self.bytes, self.object_pool)
    }

    /// The code size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ── Assembler ────────────────────────────────────────────────────────────

/// An ARMv7-A (A32) + VFPv3 instruction emitter.
///
/// Owns the code buffer and object pool. Not reentrant and not shareable;
/// labels are only valid with the instance whose buffer their unresolved
/// sites live in.
#[derive(Debug)]
pub struct Assembler {
    buffer: AssemblerBuffer,
    object_pool: ObjectPool,
    print_stop_messages: bool,
    stop_message_stub: Option<ExternalLabel>,
}

impl Default for Assembler {
    fn default() -> Assembler {
        Assembler::new()
    }
}

impl Assembler {
    /// A fresh assembler with an empty buffer and pool.
    ///
    /// `stop` message printing is enabled by default, matching the host
    /// runtime flag; wire a stub with
    /// [`set_stop_message_stub`](Assembler::set_stop_message_stub) or
    /// disable it before emitting a `stop`.
    #[must_use]
    pub fn new() -> Assembler {
        Assembler {
            buffer: AssemblerBuffer::new(),
            object_pool: ObjectPool::new(),
            print_stop_messages: true,
            stop_message_stub: None,
        }
    }

    /// Control whether [`stop`](Assembler::stop) emits a runtime call that
    /// prints its message.
    pub fn set_print_stop_messages(&mut self, enabled: bool) -> &mut Assembler {
        self.print_stop_messages = enabled;
        self
    }

    /// The runtime entry point [`stop`](Assembler::stop) calls to print
    /// its message when printing is enabled.
    pub fn set_stop_message_stub(&mut self, stub: ExternalLabel) -> &mut Assembler {
        self.stop_message_stub = Some(stub);
        self
    }

    /// Bytes emitted so far. Always a multiple of 4.
    #[must_use]
    pub fn code_size(&self) -> usize {
        self.buffer.len()
    }

    /// The pool accumulated so far.
    #[must_use]
    pub fn object_pool(&self) -> &ObjectPool {
        &self.object_pool
    }

    /// Append one raw 32-bit word. Every instruction emitter funnels
    /// through here; it is public for inline literals (the message word
    /// of [`stop`](Assembler::stop), stub-embedded constants).
    pub fn emit(&mut self, word: u32) {
        self.buffer.emit32(word);
    }

    /// Consume the assembler, yielding the code and the pool.
    pub fn finalize(self) -> AssemblyResult {
        AssemblyResult {
            bytes: self.buffer.into_bytes(),
            object_pool: self.object_pool,
        }
    }

    /// Fill a code region with [`BREAKPOINT_INSTRUCTION`] words so that
    /// control flow reaching unwritten memory traps immediately.
    pub fn initialize_memory_with_breakpoints(region: &mut [u8]) {
        assert!(
            is_aligned(region.len() as i64, 4),
            "breakpoint region length not 4-aligned: {}",
            region.len()
        );
        for chunk in region.chunks_exact_mut(4) {
            chunk.copy_from_slice(&BREAKPOINT_INSTRUCTION.to_le_bytes());
        }
    }

    // ── Encoding dispatchers ─────────────────────────────────────────────

    fn emit_type01(
        &mut self,
        cond: Condition,
        opcode: Opcode,
        set_cc: bool,
        rn: Register,
        rd: Register,
        so: ShifterOperand,
    ) {
        let encoding = (cond.encoding() << COND_SHIFT)
            | (so.type_bit() << TYPE_SHIFT)
            | (opcode.encoding() << OPCODE_SHIFT)
            | (u32::from(set_cc) << S_SHIFT)
            | (rn.encoding() << RN_SHIFT)
            | (rd.encoding() << RD_SHIFT)
            | so.encoding();
        self.emit(encoding);
    }

    fn emit_type5(&mut self, cond: Condition, offset: i32, link: bool) {
        let encoding = (cond.encoding() << COND_SHIFT)
            | (5 << TYPE_SHIFT)
            | (u32::from(link) << LINK_SHIFT);
        self.emit(encode_branch_offset(offset, encoding));
    }

    fn emit_mem_op(&mut self, cond: Condition, load: bool, byte: bool, rd: Register, ad: Address) {
        let encoding = (cond.encoding() << COND_SHIFT)
            | B26
            | if load { L } else { 0 }
            | if byte { B } else { 0 }
            | (rd.encoding() << RD_SHIFT)
            | ad.encoding();
        self.emit(encoding);
    }

    fn emit_mem_op_address_mode3(&mut self, cond: Condition, mode: u32, rd: Register, ad: Address) {
        let encoding = (cond.encoding() << COND_SHIFT)
            | B22
            | mode
            | (rd.encoding() << RD_SHIFT)
            | ad.encoding3();
        self.emit(encoding);
    }

    fn emit_multi_mem_op(
        &mut self,
        cond: Condition,
        am: BlockAddressMode,
        load: bool,
        base: Register,
        regs: RegList,
    ) {
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | am.encoding()
            | if load { L } else { 0 }
            | (base.encoding() << RN_SHIFT)
            | u32::from(regs);
        self.emit(encoding);
    }

    fn emit_branch(&mut self, cond: Condition, label: &mut Label, link: bool) {
        if label.is_bound() {
            self.emit_type5(cond, label.position() - self.buffer.len() as i32, link);
        } else {
            let position = self.buffer.len() as i32;
            // Use the offset field of the branch to link the site chain.
            self.emit_type5(cond, label.position, link);
            label.link_to(position);
        }
    }

    // Multiply operands rd, rn, rm, rs land in the encoding's rn, rd, rs,
    // rm fields; callers permute accordingly.
    fn emit_mul_op(
        &mut self,
        cond: Condition,
        opcode: u32,
        rd: Register,
        rn: Register,
        rm: Register,
        rs: Register,
    ) {
        let encoding = opcode
            | (cond.encoding() << COND_SHIFT)
            | (rn.encoding() << RN_SHIFT)
            | (rd.encoding() << RD_SHIFT)
            | (rs.encoding() << 8)
            | B7
            | B4
            | rm.encoding();
        self.emit(encoding);
    }

    fn emit_vfp_sss(
        &mut self,
        cond: Condition,
        opcode: u32,
        sd: SRegister,
        sn: SRegister,
        sm: SRegister,
    ) {
        let (sd, sn, sm) = (sd.encoding(), sn.encoding(), sm.encoding());
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | B26
            | B25
            | B11
            | B9
            | opcode
            | ((sd & 1) << 22)
            | ((sn >> 1) << 16)
            | ((sd >> 1) << 12)
            | ((sn & 1) << 7)
            | ((sm & 1) << 5)
            | (sm >> 1);
        self.emit(encoding);
    }

    fn emit_vfp_ddd(
        &mut self,
        cond: Condition,
        opcode: u32,
        dd: DRegister,
        dn: DRegister,
        dm: DRegister,
    ) {
        let (dd, dn, dm) = (dd.encoding(), dn.encoding(), dm.encoding());
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | B26
            | B25
            | B11
            | B9
            | B8
            | opcode
            | ((dd >> 4) << 22)
            | ((dn & 0xF) << 16)
            | ((dd & 0xF) << 12)
            | ((dn >> 4) << 7)
            | ((dm >> 4) << 5)
            | (dm & 0xF);
        self.emit(encoding);
    }

    fn emit_vfp_sd(&mut self, cond: Condition, opcode: u32, sd: SRegister, dm: DRegister) {
        let (sd, dm) = (sd.encoding(), dm.encoding());
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | B26
            | B25
            | B11
            | B9
            | opcode
            | ((sd & 1) << 22)
            | ((sd >> 1) << 12)
            | ((dm >> 4) << 5)
            | (dm & 0xF);
        self.emit(encoding);
    }

    fn emit_vfp_ds(&mut self, cond: Condition, opcode: u32, dd: DRegister, sm: SRegister) {
        let (dd, sm) = (dd.encoding(), sm.encoding());
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | B26
            | B25
            | B11
            | B9
            | opcode
            | ((dd >> 4) << 22)
            | ((dd & 0xF) << 12)
            | ((sm & 1) << 5)
            | (sm >> 1);
        self.emit(encoding);
    }

    // ── Data-processing instructions ─────────────────────────────────────

    /// `and rd, rn, so`
    pub fn and(&mut self, rd: Register, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::And, false, rn, rd, so);
    }

    /// `eor rd, rn, so`
    pub fn eor(&mut self, rd: Register, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Eor, false, rn, rd, so);
    }

    /// `sub rd, rn, so`
    pub fn sub(&mut self, rd: Register, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Sub, false, rn, rd, so);
    }

    /// `subs rd, rn, so`
    pub fn subs(&mut self, rd: Register, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Sub, true, rn, rd, so);
    }

    /// `rsb rd, rn, so`
    pub fn rsb(&mut self, rd: Register, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Rsb, false, rn, rd, so);
    }

    /// `rsbs rd, rn, so`
    pub fn rsbs(&mut self, rd: Register, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Rsb, true, rn, rd, so);
    }

    /// `add rd, rn, so`
    pub fn add(&mut self, rd: Register, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Add, false, rn, rd, so);
    }

    /// `adds rd, rn, so`
    pub fn adds(&mut self, rd: Register, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Add, true, rn, rd, so);
    }

    /// `adc rd, rn, so`
    pub fn adc(&mut self, rd: Register, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Adc, false, rn, rd, so);
    }

    /// `sbc rd, rn, so`
    pub fn sbc(&mut self, rd: Register, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Sbc, false, rn, rd, so);
    }

    /// `rsc rd, rn, so`
    pub fn rsc(&mut self, rd: Register, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Rsc, false, rn, rd, so);
    }

    /// `tst rn, so` — AND, flags only.
    pub fn tst(&mut self, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Tst, true, rn, Register::R0, so);
    }

    /// `teq rn, so` — EOR, flags only.
    pub fn teq(&mut self, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Teq, true, rn, Register::R0, so);
    }

    /// `cmp rn, so`
    pub fn cmp(&mut self, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Cmp, true, rn, Register::R0, so);
    }

    /// `cmn rn, so`
    pub fn cmn(&mut self, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Cmn, true, rn, Register::R0, so);
    }

    /// `orr rd, rn, so`
    pub fn orr(&mut self, rd: Register, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Orr, false, rn, rd, so);
    }

    /// `orrs rd, rn, so`
    pub fn orrs(&mut self, rd: Register, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Orr, true, rn, rd, so);
    }

    /// `mov rd, so`
    pub fn mov(&mut self, rd: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Mov, false, Register::R0, rd, so);
    }

    /// `movs rd, so`
    pub fn movs(&mut self, rd: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Mov, true, Register::R0, rd, so);
    }

    /// `bic rd, rn, so`
    pub fn bic(&mut self, rd: Register, rn: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Bic, false, rn, rd, so);
    }

    /// `mvn rd, so`
    pub fn mvn(&mut self, rd: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Mvn, false, Register::R0, rd, so);
    }

    /// `mvns rd, so`
    pub fn mvns(&mut self, rd: Register, so: ShifterOperand, cond: Condition) {
        self.emit_type01(cond, Opcode::Mvn, true, Register::R0, rd, so);
    }

    // ── Miscellaneous data-processing ────────────────────────────────────

    /// `clz rd, rm` — count leading zeros.
    pub fn clz(&mut self, rd: Register, rm: Register, cond: Condition) {
        assert_ne!(rd, Register::PC, "clz cannot target pc");
        assert_ne!(rm, Register::PC, "clz cannot read pc");
        let encoding = (cond.encoding() << COND_SHIFT)
            | B24
            | B22
            | B21
            | (0xF << 16)
            | (rd.encoding() << RD_SHIFT)
            | (0xF << 8)
            | B4
            | rm.encoding();
        self.emit(encoding);
    }

    /// `movw rd, #imm16` — load the low half, zeroing the high half.
    pub fn movw(&mut self, rd: Register, imm16: u16, cond: Condition) {
        let imm16 = u32::from(imm16);
        let encoding = (cond.encoding() << COND_SHIFT)
            | B25
            | B24
            | ((imm16 >> 12) << 16)
            | (rd.encoding() << RD_SHIFT)
            | (imm16 & 0xFFF);
        self.emit(encoding);
    }

    /// `movt rd, #imm16` — load the high half, keeping the low half.
    pub fn movt(&mut self, rd: Register, imm16: u16, cond: Condition) {
        let imm16 = u32::from(imm16);
        let encoding = (cond.encoding() << COND_SHIFT)
            | B25
            | B24
            | B22
            | ((imm16 >> 12) << 16)
            | (rd.encoding() << RD_SHIFT)
            | (imm16 & 0xFFF);
        self.emit(encoding);
    }

    // ── Multiply ─────────────────────────────────────────────────────────

    /// `mul rd, rn, rm`
    pub fn mul(&mut self, rd: Register, rn: Register, rm: Register, cond: Condition) {
        self.emit_mul_op(cond, 0, Register::R0, rd, rn, rm);
    }

    /// `mla rd, rn, rm, ra` — `rd = rn * rm + ra`.
    pub fn mla(&mut self, rd: Register, rn: Register, rm: Register, ra: Register, cond: Condition) {
        self.emit_mul_op(cond, B21, ra, rd, rn, rm);
    }

    /// `mls rd, rn, rm, ra` — `rd = ra - rn * rm`.
    pub fn mls(&mut self, rd: Register, rn: Register, rm: Register, ra: Register, cond: Condition) {
        self.emit_mul_op(cond, B22 | B21, ra, rd, rn, rm);
    }

    /// `umull rd_lo, rd_hi, rn, rm` — 32×32 → 64 unsigned.
    pub fn umull(
        &mut self,
        rd_lo: Register,
        rd_hi: Register,
        rn: Register,
        rm: Register,
        cond: Condition,
    ) {
        self.emit_mul_op(cond, B23, rd_lo, rd_hi, rn, rm);
    }

    // ── Memory: single register ──────────────────────────────────────────

    /// `ldr rd, ad`
    pub fn ldr(&mut self, rd: Register, ad: Address, cond: Condition) {
        self.emit_mem_op(cond, true, false, rd, ad);
    }

    /// `str rd, ad`
    pub fn str(&mut self, rd: Register, ad: Address, cond: Condition) {
        self.emit_mem_op(cond, false, false, rd, ad);
    }

    /// `ldrb rd, ad`
    pub fn ldrb(&mut self, rd: Register, ad: Address, cond: Condition) {
        self.emit_mem_op(cond, true, true, rd, ad);
    }

    /// `strb rd, ad`
    pub fn strb(&mut self, rd: Register, ad: Address, cond: Condition) {
        self.emit_mem_op(cond, false, true, rd, ad);
    }

    /// `ldrh rd, ad`
    pub fn ldrh(&mut self, rd: Register, ad: Address, cond: Condition) {
        self.emit_mem_op_address_mode3(cond, L | B7 | H | B4, rd, ad);
    }

    /// `strh rd, ad`
    pub fn strh(&mut self, rd: Register, ad: Address, cond: Condition) {
        self.emit_mem_op_address_mode3(cond, B7 | H | B4, rd, ad);
    }

    /// `ldrsb rd, ad`
    pub fn ldrsb(&mut self, rd: Register, ad: Address, cond: Condition) {
        self.emit_mem_op_address_mode3(cond, L | B7 | B6 | B4, rd, ad);
    }

    /// `ldrsh rd, ad`
    pub fn ldrsh(&mut self, rd: Register, ad: Address, cond: Condition) {
        self.emit_mem_op_address_mode3(cond, L | B7 | B6 | H | B4, rd, ad);
    }

    /// `ldrd rd, rd+1, ad` — doubleword load; `rd` must be even.
    pub fn ldrd(&mut self, rd: Register, ad: Address, cond: Condition) {
        assert_eq!(rd.encoding() % 2, 0, "ldrd needs an even destination");
        self.emit_mem_op_address_mode3(cond, B7 | B6 | B4, rd, ad);
    }

    /// `strd rd, rd+1, ad` — doubleword store; `rd` must be even.
    pub fn strd(&mut self, rd: Register, ad: Address, cond: Condition) {
        assert_eq!(rd.encoding() % 2, 0, "strd needs an even source");
        self.emit_mem_op_address_mode3(cond, B7 | B6 | B5 | B4, rd, ad);
    }

    // ── Memory: multiple registers ───────────────────────────────────────

    /// `ldm<am> base, {regs}`
    pub fn ldm(&mut self, am: BlockAddressMode, base: Register, regs: RegList, cond: Condition) {
        self.emit_multi_mem_op(cond, am, true, base, regs);
    }

    /// `stm<am> base, {regs}`
    pub fn stm(&mut self, am: BlockAddressMode, base: Register, regs: RegList, cond: Condition) {
        self.emit_multi_mem_op(cond, am, false, base, regs);
    }

    // ── Exclusive monitor ────────────────────────────────────────────────

    /// `ldrex rt, [rn]`
    pub fn ldrex(&mut self, rt: Register, rn: Register, cond: Condition) {
        let encoding = (cond.encoding() << COND_SHIFT)
            | B24
            | B23
            | L
            | (rn.encoding() << RN_SHIFT)
            | (rt.encoding() << RD_SHIFT)
            | B11
            | B10
            | B9
            | B8
            | B7
            | B4
            | B3
            | B2
            | B1
            | B0;
        self.emit(encoding);
    }

    /// `strex rd, rt, [rn]` — `rd` receives 0 on success, 1 on failure.
    pub fn strex(&mut self, rd: Register, rt: Register, rn: Register, cond: Condition) {
        let encoding = (cond.encoding() << COND_SHIFT)
            | B24
            | B23
            | (rn.encoding() << RN_SHIFT)
            | (rd.encoding() << RD_SHIFT)
            | B11
            | B10
            | B9
            | B8
            | B7
            | B4
            | rt.encoding();
        self.emit(encoding);
    }

    /// `clrex` — clear the local exclusive monitor (unconditional).
    pub fn clrex(&mut self) {
        let encoding = (Condition::Special.encoding() << COND_SHIFT)
            | B26
            | B24
            | B22
            | B21
            | B20
            | (0xFF << 12)
            | B4
            | 0xF;
        self.emit(encoding);
    }

    // ── VFP: core ↔ float register transfers ─────────────────────────────

    /// `vmov sn, rt`
    pub fn vmovsr(&mut self, sn: SRegister, rt: Register, cond: Condition) {
        assert_ne!(rt, Register::SP, "vmovsr cannot use sp");
        assert_ne!(rt, Register::PC, "vmovsr cannot use pc");
        let sn = sn.encoding();
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | B26
            | B25
            | ((sn >> 1) << 16)
            | (rt.encoding() << RD_SHIFT)
            | B11
            | B9
            | ((sn & 1) << 7)
            | B4;
        self.emit(encoding);
    }

    /// `vmov rt, sn`
    pub fn vmovrs(&mut self, rt: Register, sn: SRegister, cond: Condition) {
        assert_ne!(rt, Register::SP, "vmovrs cannot use sp");
        assert_ne!(rt, Register::PC, "vmovrs cannot use pc");
        let sn = sn.encoding();
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | B26
            | B25
            | B20
            | ((sn >> 1) << 16)
            | (rt.encoding() << RD_SHIFT)
            | B11
            | B9
            | ((sn & 1) << 7)
            | B4;
        self.emit(encoding);
    }

    /// `vmov sm, sm+1, rt, rt2`
    pub fn vmovsrr(&mut self, sm: SRegister, rt: Register, rt2: Register, cond: Condition) {
        assert_ne!(sm, SRegister::S31, "vmovsrr needs a register pair");
        assert_ne!(rt, Register::SP, "vmovsrr cannot use sp");
        assert_ne!(rt, Register::PC, "vmovsrr cannot use pc");
        assert_ne!(rt2, Register::SP, "vmovsrr cannot use sp");
        assert_ne!(rt2, Register::PC, "vmovsrr cannot use pc");
        let sm = sm.encoding();
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | B26
            | B22
            | (rt2.encoding() << RN_SHIFT)
            | (rt.encoding() << RD_SHIFT)
            | B11
            | B9
            | ((sm & 1) << 5)
            | B4
            | (sm >> 1);
        self.emit(encoding);
    }

    /// `vmov rt, rt2, sm, sm+1`
    pub fn vmovrrs(&mut self, rt: Register, rt2: Register, sm: SRegister, cond: Condition) {
        assert_ne!(sm, SRegister::S31, "vmovrrs needs a register pair");
        assert_ne!(rt, Register::SP, "vmovrrs cannot use sp");
        assert_ne!(rt, Register::PC, "vmovrrs cannot use pc");
        assert_ne!(rt2, Register::SP, "vmovrrs cannot use sp");
        assert_ne!(rt2, Register::PC, "vmovrrs cannot use pc");
        assert_ne!(rt, rt2, "vmovrrs destinations must differ");
        let sm = sm.encoding();
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | B26
            | B22
            | B20
            | (rt2.encoding() << RN_SHIFT)
            | (rt.encoding() << RD_SHIFT)
            | B11
            | B9
            | ((sm & 1) << 5)
            | B4
            | (sm >> 1);
        self.emit(encoding);
    }

    /// `vmov dm, rt, rt2`
    pub fn vmovdrr(&mut self, dm: DRegister, rt: Register, rt2: Register, cond: Condition) {
        assert_ne!(rt, Register::SP, "vmovdrr cannot use sp");
        assert_ne!(rt, Register::PC, "vmovdrr cannot use pc");
        assert_ne!(rt2, Register::SP, "vmovdrr cannot use sp");
        assert_ne!(rt2, Register::PC, "vmovdrr cannot use pc");
        let dm = dm.encoding();
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | B26
            | B22
            | (rt2.encoding() << RN_SHIFT)
            | (rt.encoding() << RD_SHIFT)
            | B11
            | B9
            | B8
            | ((dm >> 4) << 5)
            | B4
            | (dm & 0xF);
        self.emit(encoding);
    }

    /// `vmov rt, rt2, dm`
    pub fn vmovrrd(&mut self, rt: Register, rt2: Register, dm: DRegister, cond: Condition) {
        assert_ne!(rt, Register::SP, "vmovrrd cannot use sp");
        assert_ne!(rt, Register::PC, "vmovrrd cannot use pc");
        assert_ne!(rt2, Register::SP, "vmovrrd cannot use sp");
        assert_ne!(rt2, Register::PC, "vmovrrd cannot use pc");
        assert_ne!(rt, rt2, "vmovrrd destinations must differ");
        let dm = dm.encoding();
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | B26
            | B22
            | B20
            | (rt2.encoding() << RN_SHIFT)
            | (rt.encoding() << RD_SHIFT)
            | B11
            | B9
            | B8
            | ((dm >> 4) << 5)
            | B4
            | (dm & 0xF);
        self.emit(encoding);
    }

    // ── VFP: memory ──────────────────────────────────────────────────────

    /// `vldr sd, ad`
    pub fn vldrs(&mut self, sd: SRegister, ad: Address, cond: Condition) {
        let sd = sd.encoding();
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | B26
            | B24
            | B20
            | ((sd & 1) << 22)
            | ((sd >> 1) << 12)
            | B11
            | B9
            | ad.vencoding();
        self.emit(encoding);
    }

    /// `vstr sd, ad`
    pub fn vstrs(&mut self, sd: SRegister, ad: Address, cond: Condition) {
        assert_ne!(ad.rn_field(), Register::PC.encoding(), "vstrs cannot be pc-relative");
        let sd = sd.encoding();
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | B26
            | B24
            | ((sd & 1) << 22)
            | ((sd >> 1) << 12)
            | B11
            | B9
            | ad.vencoding();
        self.emit(encoding);
    }

    /// `vldr dd, ad`
    pub fn vldrd(&mut self, dd: DRegister, ad: Address, cond: Condition) {
        let dd = dd.encoding();
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | B26
            | B24
            | B20
            | ((dd >> 4) << 22)
            | ((dd & 0xF) << 12)
            | B11
            | B9
            | B8
            | ad.vencoding();
        self.emit(encoding);
    }

    /// `vstr dd, ad`
    pub fn vstrd(&mut self, dd: DRegister, ad: Address, cond: Condition) {
        assert_ne!(ad.rn_field(), Register::PC.encoding(), "vstrd cannot be pc-relative");
        let dd = dd.encoding();
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | B26
            | B24
            | ((dd >> 4) << 22)
            | ((dd & 0xF) << 12)
            | B11
            | B9
            | B8
            | ad.vencoding();
        self.emit(encoding);
    }

    // ── VFP: moves and arithmetic ────────────────────────────────────────

    /// `vmov.f32 sd, sm`
    pub fn vmovs(&mut self, sd: SRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_sss(cond, B23 | B21 | B20 | B6, sd, SRegister::S0, sm);
    }

    /// `vmov.f64 dd, dm`
    pub fn vmovd(&mut self, dd: DRegister, dm: DRegister, cond: Condition) {
        self.emit_vfp_ddd(cond, B23 | B21 | B20 | B6, dd, DRegister::D0, dm);
    }

    /// `vmov.f32 sd, #imm` — succeeds only for the VFP 8-bit immediate
    /// form (±(16..=31) / 2^(0..=7), i.e. a small exponent around the
    /// bias and a 4-bit mantissa). Returns whether the value was emitted.
    pub fn vmovs_immediate(&mut self, sd: SRegister, value: f32, cond: Condition) -> bool {
        let imm32 = value.to_bits();
        let exp_field = (imm32 >> 25) & 0x3F;
        if (imm32 & ((1 << 19) - 1)) == 0 && (exp_field == 0x20 || exp_field == 0x1F) {
            let imm8 =
                ((imm32 >> 31) << 7) | (((imm32 >> 29) & 1) << 6) | ((imm32 >> 19) & 0x3F);
            self.emit_vfp_sss(
                cond,
                B23 | B21 | B20 | ((imm8 >> 4) << 16) | (imm8 & 0xF),
                sd,
                SRegister::S0,
                SRegister::S0,
            );
            true
        } else {
            false
        }
    }

    /// `vmov.f64 dd, #imm` — double analogue of
    /// [`vmovs_immediate`](Assembler::vmovs_immediate).
    pub fn vmovd_immediate(&mut self, dd: DRegister, value: f64, cond: Condition) -> bool {
        let imm64 = value.to_bits();
        let exp_field = (imm64 >> 54) & 0x1FF;
        if (imm64 & ((1u64 << 48) - 1)) == 0 && (exp_field == 0x100 || exp_field == 0xFF) {
            let imm8 = (((imm64 >> 63) << 7) | (((imm64 >> 61) & 1) << 6) | ((imm64 >> 48) & 0x3F))
                as u32;
            self.emit_vfp_ddd(
                cond,
                B23 | B21 | B20 | ((imm8 >> 4) << 16) | B8 | (imm8 & 0xF),
                dd,
                DRegister::D0,
                DRegister::D0,
            );
            true
        } else {
            false
        }
    }

    /// `vadd.f32 sd, sn, sm`
    pub fn vadds(&mut self, sd: SRegister, sn: SRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_sss(cond, B21 | B20, sd, sn, sm);
    }

    /// `vadd.f64 dd, dn, dm`
    pub fn vaddd(&mut self, dd: DRegister, dn: DRegister, dm: DRegister, cond: Condition) {
        self.emit_vfp_ddd(cond, B21 | B20, dd, dn, dm);
    }

    /// `vsub.f32 sd, sn, sm`
    pub fn vsubs(&mut self, sd: SRegister, sn: SRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_sss(cond, B21 | B20 | B6, sd, sn, sm);
    }

    /// `vsub.f64 dd, dn, dm`
    pub fn vsubd(&mut self, dd: DRegister, dn: DRegister, dm: DRegister, cond: Condition) {
        self.emit_vfp_ddd(cond, B21 | B20 | B6, dd, dn, dm);
    }

    /// `vmul.f32 sd, sn, sm`
    pub fn vmuls(&mut self, sd: SRegister, sn: SRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_sss(cond, B21, sd, sn, sm);
    }

    /// `vmul.f64 dd, dn, dm`
    pub fn vmuld(&mut self, dd: DRegister, dn: DRegister, dm: DRegister, cond: Condition) {
        self.emit_vfp_ddd(cond, B21, dd, dn, dm);
    }

    /// `vmla.f32 sd, sn, sm` — `sd += sn * sm`.
    pub fn vmlas(&mut self, sd: SRegister, sn: SRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_sss(cond, 0, sd, sn, sm);
    }

    /// `vmla.f64 dd, dn, dm`
    pub fn vmlad(&mut self, dd: DRegister, dn: DRegister, dm: DRegister, cond: Condition) {
        self.emit_vfp_ddd(cond, 0, dd, dn, dm);
    }

    /// `vmls.f32 sd, sn, sm` — `sd -= sn * sm`.
    pub fn vmlss(&mut self, sd: SRegister, sn: SRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_sss(cond, B6, sd, sn, sm);
    }

    /// `vmls.f64 dd, dn, dm`
    pub fn vmlsd(&mut self, dd: DRegister, dn: DRegister, dm: DRegister, cond: Condition) {
        self.emit_vfp_ddd(cond, B6, dd, dn, dm);
    }

    /// `vdiv.f32 sd, sn, sm`
    pub fn vdivs(&mut self, sd: SRegister, sn: SRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_sss(cond, B23, sd, sn, sm);
    }

    /// `vdiv.f64 dd, dn, dm`
    pub fn vdivd(&mut self, dd: DRegister, dn: DRegister, dm: DRegister, cond: Condition) {
        self.emit_vfp_ddd(cond, B23, dd, dn, dm);
    }

    /// `vabs.f32 sd, sm`
    pub fn vabss(&mut self, sd: SRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_sss(cond, B23 | B21 | B20 | B7 | B6, sd, SRegister::S0, sm);
    }

    /// `vabs.f64 dd, dm`
    pub fn vabsd(&mut self, dd: DRegister, dm: DRegister, cond: Condition) {
        self.emit_vfp_ddd(cond, B23 | B21 | B20 | B7 | B6, dd, DRegister::D0, dm);
    }

    /// `vneg.f32 sd, sm`
    pub fn vnegs(&mut self, sd: SRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_sss(cond, B23 | B21 | B20 | B16 | B6, sd, SRegister::S0, sm);
    }

    /// `vneg.f64 dd, dm`
    pub fn vnegd(&mut self, dd: DRegister, dm: DRegister, cond: Condition) {
        self.emit_vfp_ddd(cond, B23 | B21 | B20 | B16 | B6, dd, DRegister::D0, dm);
    }

    /// `vsqrt.f32 sd, sm`
    pub fn vsqrts(&mut self, sd: SRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_sss(cond, B23 | B21 | B20 | B16 | B7 | B6, sd, SRegister::S0, sm);
    }

    /// `vsqrt.f64 dd, dm`
    pub fn vsqrtd(&mut self, dd: DRegister, dm: DRegister, cond: Condition) {
        self.emit_vfp_ddd(cond, B23 | B21 | B20 | B16 | B7 | B6, dd, DRegister::D0, dm);
    }

    // ── VFP: conversions ─────────────────────────────────────────────────

    /// `vcvt.f32.f64 sd, dm`
    pub fn vcvtsd(&mut self, sd: SRegister, dm: DRegister, cond: Condition) {
        self.emit_vfp_sd(cond, B23 | B21 | B20 | B18 | B17 | B16 | B8 | B7 | B6, sd, dm);
    }

    /// `vcvt.f64.f32 dd, sm`
    pub fn vcvtds(&mut self, dd: DRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_ds(cond, B23 | B21 | B20 | B18 | B17 | B16 | B7 | B6, dd, sm);
    }

    /// `vcvt.s32.f32 sd, sm` — truncating.
    pub fn vcvtis(&mut self, sd: SRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_sss(
            cond,
            B23 | B21 | B20 | B19 | B18 | B16 | B7 | B6,
            sd,
            SRegister::S0,
            sm,
        );
    }

    /// `vcvt.s32.f64 sd, dm` — truncating.
    pub fn vcvtid(&mut self, sd: SRegister, dm: DRegister, cond: Condition) {
        self.emit_vfp_sd(
            cond,
            B23 | B21 | B20 | B19 | B18 | B16 | B8 | B7 | B6,
            sd,
            dm,
        );
    }

    /// `vcvt.f32.s32 sd, sm`
    pub fn vcvtsi(&mut self, sd: SRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_sss(cond, B23 | B21 | B20 | B19 | B7 | B6, sd, SRegister::S0, sm);
    }

    /// `vcvt.f64.s32 dd, sm`
    pub fn vcvtdi(&mut self, dd: DRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_ds(cond, B23 | B21 | B20 | B19 | B8 | B7 | B6, dd, sm);
    }

    /// `vcvt.u32.f32 sd, sm` — truncating.
    pub fn vcvtus(&mut self, sd: SRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_sss(
            cond,
            B23 | B21 | B20 | B19 | B18 | B7 | B6,
            sd,
            SRegister::S0,
            sm,
        );
    }

    /// `vcvt.u32.f64 sd, dm` — truncating.
    pub fn vcvtud(&mut self, sd: SRegister, dm: DRegister, cond: Condition) {
        self.emit_vfp_sd(cond, B23 | B21 | B20 | B19 | B18 | B8 | B7 | B6, sd, dm);
    }

    /// `vcvt.f32.u32 sd, sm`
    pub fn vcvtsu(&mut self, sd: SRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_sss(cond, B23 | B21 | B20 | B19 | B6, sd, SRegister::S0, sm);
    }

    /// `vcvt.f64.u32 dd, sm`
    pub fn vcvtdu(&mut self, dd: DRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_ds(cond, B23 | B21 | B20 | B19 | B8 | B6, dd, sm);
    }

    // ── VFP: comparison and status ───────────────────────────────────────

    /// `vcmp.f32 sd, sm`
    pub fn vcmps(&mut self, sd: SRegister, sm: SRegister, cond: Condition) {
        self.emit_vfp_sss(cond, B23 | B21 | B20 | B18 | B6, sd, SRegister::S0, sm);
    }

    /// `vcmp.f64 dd, dm`
    pub fn vcmpd(&mut self, dd: DRegister, dm: DRegister, cond: Condition) {
        self.emit_vfp_ddd(cond, B23 | B21 | B20 | B18 | B6, dd, DRegister::D0, dm);
    }

    /// `vcmp.f32 sd, #0.0`
    pub fn vcmpsz(&mut self, sd: SRegister, cond: Condition) {
        self.emit_vfp_sss(
            cond,
            B23 | B21 | B20 | B18 | B16 | B6,
            sd,
            SRegister::S0,
            SRegister::S0,
        );
    }

    /// `vcmp.f64 dd, #0.0`
    pub fn vcmpdz(&mut self, dd: DRegister, cond: Condition) {
        self.emit_vfp_ddd(
            cond,
            B23 | B21 | B20 | B18 | B16 | B6,
            dd,
            DRegister::D0,
            DRegister::D0,
        );
    }

    /// `vmrs APSR_nzcv, FPSCR` — copy the FP comparison flags to the CPSR.
    pub fn vmstat(&mut self, cond: Condition) {
        let encoding = (cond.encoding() << COND_SHIFT)
            | B27
            | B26
            | B25
            | B23
            | B22
            | B21
            | B20
            | B16
            | (Register::PC.encoding() << RD_SHIFT)
            | B11
            | B9
            | B4;
        self.emit(encoding);
    }

    // ── Control flow and system ──────────────────────────────────────────

    /// `b label`
    pub fn b(&mut self, label: &mut Label, cond: Condition) {
        self.emit_branch(cond, label, false);
    }

    /// `bl label`
    pub fn bl(&mut self, label: &mut Label, cond: Condition) {
        self.emit_branch(cond, label, true);
    }

    /// `blx rm` — call through a register.
    pub fn blx(&mut self, rm: Register, cond: Condition) {
        let encoding = (cond.encoding() << COND_SHIFT)
            | B24
            | B21
            | (0xFFF << 8)
            | B5
            | B4
            | rm.encoding();
        self.emit(encoding);
    }

    /// `svc #imm24` — supervisor call.
    pub fn svc(&mut self, imm24: u32) {
        assert!(imm24 < (1 << 24), "svc immediate out of range: {imm24}");
        let encoding = (Condition::Al.encoding() << COND_SHIFT) | B27 | B26 | B25 | B24 | imm24;
        self.emit(encoding);
    }

    /// `bkpt #imm16` — breakpoint.
    pub fn bkpt(&mut self, imm16: u16) {
        let imm16 = u32::from(imm16);
        let encoding = (Condition::Al.encoding() << COND_SHIFT)
            | B24
            | B21
            | ((imm16 >> 4) << 8)
            | B6
            | B5
            | B4
            | (imm16 & 0xF);
        self.emit(encoding);
    }

    /// `nop` — architected hint.
    pub fn nop(&mut self, cond: Condition) {
        let encoding = (cond.encoding() << COND_SHIFT) | B25 | B24 | B21 | (0xF << 12);
        self.emit(encoding);
    }

    // ── Labels ───────────────────────────────────────────────────────────

    /// Place `label` at the current buffer position and patch every
    /// branch that referenced it while unbound. Binding twice panics, as
    /// does a linked site farther than the 24-bit branch range.
    pub fn bind(&mut self, label: &mut Label) {
        assert!(!label.is_bound(), "label bound twice");
        let bound_pc = self.buffer.len() as i32;
        while label.is_linked() {
            let position = label.position();
            let next = self.buffer.load32(position as usize);
            self.buffer
                .store32(position as usize, encode_branch_offset(bound_pc - position, next));
            label.position = decode_branch_offset(next);
        }
        label.bind_to(bound_pc);
    }

    // ── Macro operations ─────────────────────────────────────────────────

    /// Materialize an arbitrary 32-bit constant in `rd`: one `mov` or
    /// `mvn` when a rotated immediate fits, else `movw` (+ `movt` when
    /// the high half is nonzero).
    pub fn load_immediate(&mut self, rd: Register, value: i32, cond: Condition) {
        if let Some(so) = ShifterOperand::try_from_immediate(value as u32) {
            self.mov(rd, so, cond);
        } else if let Some(so) = ShifterOperand::try_from_immediate(!(value as u32)) {
            self.mvn(rd, so, cond);
        } else {
            self.movw(rd, low_16_bits(value), cond);
            let value_high = high_16_bits(value);
            if value_high != 0 {
                self.movt(rd, value_high, cond);
            }
        }
    }

    /// Materialize a float constant in `sd`, preferring the VFP immediate
    /// form and falling back through `ip`.
    pub fn load_s_immediate(&mut self, sd: SRegister, value: f32, cond: Condition) {
        if !self.vmovs_immediate(sd, value, cond) {
            self.load_immediate(Register::IP, value.to_bits() as i32, cond);
            self.vmovsr(sd, Register::IP, cond);
        }
    }

    /// Materialize a double constant in `dd`. Values outside the VFP
    /// immediate form need `scratch` (≠ `ip`, ≠ `pc`) for the high word.
    pub fn load_d_immediate(
        &mut self,
        dd: DRegister,
        value: f64,
        scratch: Register,
        cond: Condition,
    ) {
        assert_ne!(scratch, Register::PC, "load_d_immediate cannot scratch pc");
        assert_ne!(scratch, Register::IP, "load_d_immediate scratch must differ from ip");
        if !self.vmovd_immediate(dd, value, cond) {
            assert_ne!(
                scratch,
                Register::NoRegister,
                "an arbitrary double needs a scratch register"
            );
            let imm64 = value.to_bits();
            self.load_immediate(Register::IP, imm64 as u32 as i32, cond);
            self.load_immediate(scratch, (imm64 >> 32) as u32 as i32, cond);
            self.vmovdrr(dd, Register::IP, scratch, cond);
        }
    }

    /// Load `reg` from `[base, #offset]` for any 32-bit offset; offsets
    /// the addressing mode cannot hold are summed into `ip` first.
    pub fn load_from_offset(
        &mut self,
        ty: LoadOperandType,
        reg: Register,
        mut base: Register,
        mut offset: i32,
        cond: Condition,
    ) {
        if !Address::can_hold_load_offset(ty, offset) {
            assert_ne!(base, Register::IP, "offset synthesis clobbers ip");
            self.load_immediate(Register::IP, offset, cond);
            self.add(Register::IP, Register::IP, ShifterOperand::from(base), cond);
            base = Register::IP;
            offset = 0;
        }
        debug_assert!(Address::can_hold_load_offset(ty, offset));
        match ty {
            LoadOperandType::SignedByte => self.ldrsb(reg, Address::new(base, offset), cond),
            LoadOperandType::UnsignedByte => self.ldrb(reg, Address::new(base, offset), cond),
            LoadOperandType::SignedHalfword => self.ldrsh(reg, Address::new(base, offset), cond),
            LoadOperandType::UnsignedHalfword => self.ldrh(reg, Address::new(base, offset), cond),
            LoadOperandType::Word => self.ldr(reg, Address::new(base, offset), cond),
            LoadOperandType::WordPair => self.ldrd(reg, Address::new(base, offset), cond),
            LoadOperandType::SWord | LoadOperandType::DWord => {
                panic!("use load_s_from_offset / load_d_from_offset for VFP loads")
            }
        }
    }

    /// Store `reg` to `[base, #offset]` for any 32-bit offset.
    pub fn store_to_offset(
        &mut self,
        ty: StoreOperandType,
        reg: Register,
        mut base: Register,
        mut offset: i32,
        cond: Condition,
    ) {
        if !Address::can_hold_store_offset(ty, offset) {
            assert_ne!(reg, Register::IP, "offset synthesis clobbers ip");
            assert_ne!(base, Register::IP, "offset synthesis clobbers ip");
            self.load_immediate(Register::IP, offset, cond);
            self.add(Register::IP, Register::IP, ShifterOperand::from(base), cond);
            base = Register::IP;
            offset = 0;
        }
        debug_assert!(Address::can_hold_store_offset(ty, offset));
        match ty {
            StoreOperandType::Byte => self.strb(reg, Address::new(base, offset), cond),
            StoreOperandType::Halfword => self.strh(reg, Address::new(base, offset), cond),
            StoreOperandType::Word => self.str(reg, Address::new(base, offset), cond),
            StoreOperandType::WordPair => self.strd(reg, Address::new(base, offset), cond),
            StoreOperandType::SWord | StoreOperandType::DWord => {
                panic!("use store_s_to_offset / store_d_to_offset for VFP stores")
            }
        }
    }

    /// `vldr sd, [base, #offset]` for any 32-bit offset.
    pub fn load_s_from_offset(
        &mut self,
        reg: SRegister,
        mut base: Register,
        mut offset: i32,
        cond: Condition,
    ) {
        if !Address::can_hold_load_offset(LoadOperandType::SWord, offset) {
            assert_ne!(base, Register::IP, "offset synthesis clobbers ip");
            self.load_immediate(Register::IP, offset, cond);
            self.add(Register::IP, Register::IP, ShifterOperand::from(base), cond);
            base = Register::IP;
            offset = 0;
        }
        self.vldrs(reg, Address::new(base, offset), cond);
    }

    /// `vstr sd, [base, #offset]` for any 32-bit offset.
    pub fn store_s_to_offset(
        &mut self,
        reg: SRegister,
        mut base: Register,
        mut offset: i32,
        cond: Condition,
    ) {
        if !Address::can_hold_store_offset(StoreOperandType::SWord, offset) {
            assert_ne!(base, Register::IP, "offset synthesis clobbers ip");
            self.load_immediate(Register::IP, offset, cond);
            self.add(Register::IP, Register::IP, ShifterOperand::from(base), cond);
            base = Register::IP;
            offset = 0;
        }
        self.vstrs(reg, Address::new(base, offset), cond);
    }

    /// `vldr dd, [base, #offset]` for any 32-bit offset.
    pub fn load_d_from_offset(
        &mut self,
        reg: DRegister,
        mut base: Register,
        mut offset: i32,
        cond: Condition,
    ) {
        if !Address::can_hold_load_offset(LoadOperandType::DWord, offset) {
            assert_ne!(base, Register::IP, "offset synthesis clobbers ip");
            self.load_immediate(Register::IP, offset, cond);
            self.add(Register::IP, Register::IP, ShifterOperand::from(base), cond);
            base = Register::IP;
            offset = 0;
        }
        self.vldrd(reg, Address::new(base, offset), cond);
    }

    /// `vstr dd, [base, #offset]` for any 32-bit offset.
    pub fn store_d_to_offset(
        &mut self,
        reg: DRegister,
        mut base: Register,
        mut offset: i32,
        cond: Condition,
    ) {
        if !Address::can_hold_store_offset(StoreOperandType::DWord, offset) {
            assert_ne!(base, Register::IP, "offset synthesis clobbers ip");
            self.load_immediate(Register::IP, offset, cond);
            self.add(Register::IP, Register::IP, ShifterOperand::from(base), cond);
            base = Register::IP;
            offset = 0;
        }
        self.vstrd(reg, Address::new(base, offset), cond);
    }

    /// `rd = rn + value` for any 32-bit constant, choosing the shortest
    /// of: one `add`/`sub` with a rotated immediate, `mvn ip` + one
    /// `add`/`sub`, or `movw`/`movt ip` + `add`. Clobbers `ip` except in
    /// the single-instruction cases.
    pub fn add_constant(&mut self, rd: Register, rn: Register, value: i32, cond: Condition) {
        if value == 0 {
            if rd != rn {
                self.mov(rd, ShifterOperand::from(rn), cond);
            }
            return;
        }
        // Prefer the shortest sequence over add-for-positive /
        // sub-for-negative readability.
        if let Some(so) = ShifterOperand::try_from_immediate(value as u32) {
            self.add(rd, rn, so, cond);
        } else if let Some(so) = ShifterOperand::try_from_immediate(value.wrapping_neg() as u32) {
            self.sub(rd, rn, so, cond);
        } else {
            assert_ne!(rn, Register::IP, "constant synthesis clobbers ip");
            if let Some(so) = ShifterOperand::try_from_immediate(!(value as u32)) {
                self.mvn(Register::IP, so, cond);
                self.add(rd, rn, ShifterOperand::from(Register::IP), cond);
            } else if let Some(so) =
                ShifterOperand::try_from_immediate(!(value.wrapping_neg() as u32))
            {
                self.mvn(Register::IP, so, cond);
                self.sub(rd, rn, ShifterOperand::from(Register::IP), cond);
            } else {
                self.movw(Register::IP, low_16_bits(value), cond);
                let value_high = high_16_bits(value);
                if value_high != 0 {
                    self.movt(Register::IP, value_high, cond);
                }
                self.add(rd, rn, ShifterOperand::from(Register::IP), cond);
            }
        }
    }

    /// [`add_constant`](Assembler::add_constant) with `adds`/`subs`, so
    /// the flags reflect the addition. Always emits (no zero shortcut).
    pub fn add_constant_set_flags(
        &mut self,
        rd: Register,
        rn: Register,
        value: i32,
        cond: Condition,
    ) {
        if let Some(so) = ShifterOperand::try_from_immediate(value as u32) {
            self.adds(rd, rn, so, cond);
        } else if let Some(so) = ShifterOperand::try_from_immediate(value.wrapping_neg() as u32) {
            self.subs(rd, rn, so, cond);
        } else {
            assert_ne!(rn, Register::IP, "constant synthesis clobbers ip");
            if let Some(so) = ShifterOperand::try_from_immediate(!(value as u32)) {
                self.mvn(Register::IP, so, cond);
                self.adds(rd, rn, ShifterOperand::from(Register::IP), cond);
            } else if let Some(so) =
                ShifterOperand::try_from_immediate(!(value.wrapping_neg() as u32))
            {
                self.mvn(Register::IP, so, cond);
                self.subs(rd, rn, ShifterOperand::from(Register::IP), cond);
            } else {
                self.movw(Register::IP, low_16_bits(value), cond);
                let value_high = high_16_bits(value);
                if value_high != 0 {
                    self.movt(Register::IP, value_high, cond);
                }
                self.adds(rd, rn, ShifterOperand::from(Register::IP), cond);
            }
        }
    }

    /// `rd = rn + value + carry` for any 32-bit constant, via
    /// `adc`/`sbc`. The subtractive probe uses `-value - 1` (the borrow
    /// bias of `sbc`).
    pub fn add_constant_with_carry(
        &mut self,
        rd: Register,
        rn: Register,
        value: i32,
        cond: Condition,
    ) {
        if let Some(so) = ShifterOperand::try_from_immediate(value as u32) {
            self.adc(rd, rn, so, cond);
        } else if let Some(so) =
            ShifterOperand::try_from_immediate(value.wrapping_neg().wrapping_sub(1) as u32)
        {
            self.sbc(rd, rn, so, cond);
        } else {
            assert_ne!(rn, Register::IP, "constant synthesis clobbers ip");
            if let Some(so) = ShifterOperand::try_from_immediate(!(value as u32)) {
                self.mvn(Register::IP, so, cond);
                self.adc(rd, rn, ShifterOperand::from(Register::IP), cond);
            } else {
                self.movw(Register::IP, low_16_bits(value), cond);
                let value_high = high_16_bits(value);
                if value_high != 0 {
                    self.movt(Register::IP, value_high, cond);
                }
                self.adc(rd, rn, ShifterOperand::from(Register::IP), cond);
            }
        }
    }

    // ── Stack, moves, shifts ─────────────────────────────────────────────

    /// `str rd, [sp, #-4]!`
    pub fn push(&mut self, rd: Register, cond: Condition) {
        self.str(
            rd,
            Address::with_mode(Register::SP, -WORD_SIZE, AddressMode::PreIndex),
            cond,
        );
    }

    /// `ldr rd, [sp], #4`
    pub fn pop(&mut self, rd: Register, cond: Condition) {
        self.ldr(
            rd,
            Address::with_mode(Register::SP, WORD_SIZE, AddressMode::PostIndex),
            cond,
        );
    }

    /// `stmdb sp!, {regs}`
    pub fn push_list(&mut self, regs: RegList, cond: Condition) {
        self.stm(BlockAddressMode::DbW, Register::SP, regs, cond);
    }

    /// `ldmia sp!, {regs}`
    pub fn pop_list(&mut self, regs: RegList, cond: Condition) {
        self.ldm(BlockAddressMode::IaW, Register::SP, regs, cond);
    }

    /// Register move; emits nothing when `rd == rm`.
    pub fn move_register(&mut self, rd: Register, rm: Register, cond: Condition) {
        if rd != rm {
            self.mov(rd, ShifterOperand::from(rm), cond);
        }
    }

    /// `lsl rd, rm, #shift_imm` with `1 <= shift_imm <= 31`. A zero shift
    /// is a plain move; use [`move_register`](Assembler::move_register).
    pub fn lsl(&mut self, rd: Register, rm: Register, shift_imm: u32, cond: Condition) {
        assert_ne!(shift_imm, 0, "lsl by zero: use move_register");
        self.mov(rd, ShifterOperand::shifted_imm(rm, Shift::Lsl, shift_imm), cond);
    }

    /// `lsr rd, rm, #shift_imm` with `1 <= shift_imm <= 32` (32 encodes
    /// as 0 per UAL).
    pub fn lsr(&mut self, rd: Register, rm: Register, mut shift_imm: u32, cond: Condition) {
        assert_ne!(shift_imm, 0, "lsr by zero: use move_register");
        if shift_imm == 32 {
            shift_imm = 0; // Comply to UAL syntax.
        }
        self.mov(rd, ShifterOperand::shifted_imm(rm, Shift::Lsr, shift_imm), cond);
    }

    /// `asr rd, rm, #shift_imm` with `1 <= shift_imm <= 32` (32 encodes
    /// as 0 per UAL).
    pub fn asr(&mut self, rd: Register, rm: Register, mut shift_imm: u32, cond: Condition) {
        assert_ne!(shift_imm, 0, "asr by zero: use move_register");
        if shift_imm == 32 {
            shift_imm = 0; // Comply to UAL syntax.
        }
        self.mov(rd, ShifterOperand::shifted_imm(rm, Shift::Asr, shift_imm), cond);
    }

    /// `ror rd, rm, #shift_imm` with `1 <= shift_imm <= 31`. A rotate by
    /// zero encodes RRX; use [`rrx`](Assembler::rrx).
    pub fn ror(&mut self, rd: Register, rm: Register, shift_imm: u32, cond: Condition) {
        assert_ne!(shift_imm, 0, "ror by zero: use rrx");
        self.mov(rd, ShifterOperand::shifted_imm(rm, Shift::Ror, shift_imm), cond);
    }

    /// `rrx rd, rm` — rotate right through carry by one bit.
    pub fn rrx(&mut self, rd: Register, rm: Register, cond: Condition) {
        self.mov(rd, ShifterOperand::shifted_imm(rm, Shift::Ror, 0), cond);
    }

    // ── Object pool access ───────────────────────────────────────────────

    /// Load a pooled heap object: `ldr rd, [cp, #offset]`, splitting the
    /// offset through `add_constant` when the pool has outgrown the
    /// 12-bit field.
    pub fn load_object(&mut self, rd: Register, object: Object) {
        let offset =
            POOL_DATA_OFFSET + WORD_SIZE * self.object_pool.add_object(object) - HEAP_OBJECT_TAG;
        if Address::can_hold_load_offset(LoadOperandType::Word, offset) {
            self.ldr(rd, Address::new(Register::CP, offset), Condition::Al);
        } else {
            let offset12_hi = offset & !OFFSET_12_MASK; // signed
            let offset12_lo = offset & OFFSET_12_MASK; // unsigned
            self.add_constant(rd, Register::CP, offset12_hi, Condition::Al);
            self.ldr(rd, Address::new(rd, offset12_lo), Condition::Al);
        }
    }

    // ── Calls out of the buffer ──────────────────────────────────────────

    /// Jump to a fixed runtime address (never patched): `ip = address;
    /// mov pc, ip`.
    pub fn branch(&mut self, label: &ExternalLabel) {
        self.load_immediate(Register::IP, label.address() as i32, Condition::Al);
        self.mov(Register::PC, ShifterOperand::from(Register::IP), Condition::Al);
    }

    /// Call a runtime entry point through the object pool: the target
    /// lives in a per-call-site pool slot so the code patcher can
    /// retarget it. Uses `blx` so return branch prediction works; the
    /// far-pool path materializes the high offset with a fixed-width
    /// `movw`/`movt` pair for the same reason.
    pub fn branch_link(&mut self, label: &ExternalLabel) {
        let offset = POOL_DATA_OFFSET + WORD_SIZE * self.object_pool.add_external_label(label)
            - HEAP_OBJECT_TAG;
        if Address::can_hold_load_offset(LoadOperandType::Word, offset) {
            self.ldr(Register::LR, Address::new(Register::CP, offset), Condition::Al);
        } else {
            let offset12_hi = offset & !OFFSET_12_MASK; // signed
            let offset12_lo = offset & OFFSET_12_MASK; // unsigned
            self.movw(Register::LR, low_16_bits(offset12_hi), Condition::Al);
            self.movt(Register::LR, high_16_bits(offset12_hi), Condition::Al);
            self.add(
                Register::LR,
                Register::CP,
                ShifterOperand::from(Register::LR),
                Condition::Al,
            );
            self.ldr(Register::LR, Address::new(Register::LR, offset12_lo), Condition::Al);
        }
        self.blx(Register::LR, Condition::Al);
    }

    /// [`branch_link`](Assembler::branch_link) variant for a fixed target
    /// (never patched) that first stores the return-site `pc` to `ad`.
    pub fn branch_link_store(&mut self, label: &ExternalLabel, ad: Address) {
        self.load_immediate(Register::IP, label.address() as i32, Condition::Al);
        self.str(Register::PC, ad, Condition::Al);
        self.blx(Register::IP, Condition::Al);
    }

    /// Call through a code pointer at `[base, #offset]`, splitting the
    /// offset when the field cannot hold it.
    pub fn branch_link_offset(&mut self, base: Register, offset: i32) {
        assert_ne!(base, Register::PC, "branch_link_offset cannot use pc");
        assert_ne!(base, Register::IP, "branch_link_offset clobbers ip");
        if Address::can_hold_load_offset(LoadOperandType::Word, offset) {
            self.ldr(Register::IP, Address::new(base, offset), Condition::Al);
        } else {
            let offset_hi = offset & !OFFSET_12_MASK; // signed
            let offset_lo = offset & OFFSET_12_MASK; // unsigned
            if let Some(so) = ShifterOperand::try_from_immediate(offset_hi as u32) {
                self.add(Register::IP, base, so, Condition::Al);
                self.ldr(Register::IP, Address::new(Register::IP, offset_lo), Condition::Al);
            } else {
                self.load_immediate(Register::IP, offset_hi, Condition::Al);
                self.add(Register::IP, Register::IP, ShifterOperand::from(base), Condition::Al);
                self.ldr(Register::IP, Address::new(Register::IP, offset_lo), Condition::Al);
            }
        }
        self.blx(Register::IP, Condition::Al);
    }

    // ── Debugging aids ───────────────────────────────────────────────────

    /// Halt with a message the simulator/debugger can recover: optionally
    /// call the print-stop-message stub, then branch over an inline word
    /// holding `message_address` into `svc STOP_MESSAGE_SVC_CODE`.
    pub fn stop(&mut self, message_address: u32) {
        if self.print_stop_messages {
            match self.stop_message_stub.clone() {
                Some(stub) => self.branch_link(&stub),
                None => unimplemented!(
                    "print_stop_messages is enabled but no stop-message stub is configured"
                ),
            }
        }
        // The message word sits before the svc so the handler can find it
        // at the faulting pc, and execution can be resumed past it.
        let mut stop = Label::new();
        self.b(&mut stop, Condition::Al);
        self.emit(message_address);
        self.bind(&mut stop);
        self.svc(STOP_MESSAGE_SVC_CODE);
    }

    /// Emit the exception-handler marker `tst pc, #0` (recognized by the
    /// stack unwinder), skipped over a live `b label` to the handler
    /// body so the marker itself never executes.
    pub fn mark_exception_handler(&mut self, label: &mut Label) {
        self.emit_type01(
            Condition::Al,
            Opcode::Tst,
            true,
            Register::PC,
            Register::R0,
            ShifterOperand::from(0u8),
        );
        let mut over = Label::new();
        self.b(&mut over, Condition::Al);
        self.emit_branch(Condition::Al, label, false);
        self.bind(&mut over);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::reg_list;
    use Condition::Al;
    use Register::{R0, R1, R2, R3, R4};

    /// Emit with `f`, then return the emitted words.
    fn emit(f: impl FnOnce(&mut Assembler)) -> Vec<u32> {
        let mut asm = Assembler::new();
        f(&mut asm);
        let bytes = asm.finalize().into_bytes();
        assert_eq!(bytes.len() % 4, 0);
        bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect()
    }

    /// Emit a single instruction and return its word.
    fn emit1(f: impl FnOnce(&mut Assembler)) -> u32 {
        let words = emit(f);
        assert_eq!(words.len(), 1);
        words[0]
    }

    #[test]
    fn data_processing_register_forms() {
        // MOV R0, R1 = 0xE1A00001
        assert_eq!(emit1(|a| a.mov(R0, ShifterOperand::from(R1), Al)), 0xE1A00001);
        // ADD R0, R1, R2 = 0xE0810002
        assert_eq!(emit1(|a| a.add(R0, R1, ShifterOperand::from(R2), Al)), 0xE0810002);
        // SUBS R0, R1, R2 = 0xE0510002
        assert_eq!(emit1(|a| a.subs(R0, R1, ShifterOperand::from(R2), Al)), 0xE0510002);
        // AND R3, R4, R3 = 0xE0043003
        assert_eq!(emit1(|a| a.and(R3, R4, ShifterOperand::from(R3), Al)), 0xE0043003);
        // MVN R0, R1 = 0xE1E00001
        assert_eq!(emit1(|a| a.mvn(R0, ShifterOperand::from(R1), Al)), 0xE1E00001);
    }

    #[test]
    fn data_processing_immediate_forms() {
        // ADD R2, R3, #0xFF = 0xE28320FF
        let so = ShifterOperand::try_from_immediate(0xFF).unwrap();
        assert_eq!(emit1(|a| a.add(R2, R3, so, Al)), 0xE28320FF);
        // CMP R1, #256 = 0xE3510C01 (0x01 ROR 24)
        let so = ShifterOperand::try_from_immediate(0x100).unwrap();
        assert_eq!(emit1(|a| a.cmp(R1, so, Al)), 0xE3510C01);
        // MOV R0, #0 = 0xE3A00000
        let so = ShifterOperand::try_from_immediate(0).unwrap();
        assert_eq!(emit1(|a| a.mov(R0, so, Al)), 0xE3A00000);
    }

    #[test]
    fn data_processing_shifted_forms() {
        // MOV R0, R1, LSL #3 = 0xE1A00181
        let so = ShifterOperand::shifted_imm(R1, Shift::Lsl, 3);
        assert_eq!(emit1(|a| a.mov(R0, so, Al)), 0xE1A00181);
        // ADD R0, R1, R2, LSR R3 = 0xE0810332
        let so = ShifterOperand::shifted_reg(R2, Shift::Lsr, R3);
        assert_eq!(emit1(|a| a.add(R0, R1, so, Al)), 0xE0810332);
    }

    #[test]
    fn conditional_execution() {
        // MOVEQ R0, R1 = 0x01A00001
        assert_eq!(
            emit1(|a| a.mov(R0, ShifterOperand::from(R1), Condition::Eq)),
            0x01A00001
        );
        // ADDNE R0, R1, R2 = 0x10810002
        assert_eq!(
            emit1(|a| a.add(R0, R1, ShifterOperand::from(R2), Condition::Ne)),
            0x10810002
        );
    }

    #[test]
    fn comparison_forms() {
        // TST R1, R2 = 0xE1110002
        assert_eq!(emit1(|a| a.tst(R1, ShifterOperand::from(R2), Al)), 0xE1110002);
        // TEQ R1, R2 = 0xE1310002
        assert_eq!(emit1(|a| a.teq(R1, ShifterOperand::from(R2), Al)), 0xE1310002);
        // CMP R1, R2 = 0xE1510002
        assert_eq!(emit1(|a| a.cmp(R1, ShifterOperand::from(R2), Al)), 0xE1510002);
        // CMN R1, R2 = 0xE1710002
        assert_eq!(emit1(|a| a.cmn(R1, ShifterOperand::from(R2), Al)), 0xE1710002);
    }

    #[test]
    fn move_wide_forms() {
        // MOVW R0, #0x5678 = 0xE3050678 (imm16 split into imm4:imm12)
        assert_eq!(emit1(|a| a.movw(R0, 0x5678, Al)), 0xE3050678);
        // MOVT R0, #0x1234 = 0xE3410234
        assert_eq!(emit1(|a| a.movt(R0, 0x1234, Al)), 0xE3410234);
        // MOVW R1, #0xFFFF = 0xE30F1FFF
        assert_eq!(emit1(|a| a.movw(R1, 0xFFFF, Al)), 0xE30F1FFF);
    }

    #[test]
    fn multiply_forms() {
        // MUL R0, R1, R2 = 0xE0000291
        assert_eq!(emit1(|a| a.mul(R0, R1, R2, Al)), 0xE0000291);
        // MLA R0, R1, R2, R3 = 0xE0203291
        assert_eq!(emit1(|a| a.mla(R0, R1, R2, R3, Al)), 0xE0203291);
        // MLS R0, R1, R2, R3 = 0xE0603291
        assert_eq!(emit1(|a| a.mls(R0, R1, R2, R3, Al)), 0xE0603291);
        // UMULL R0, R1, R2, R3 = 0xE0810392
        assert_eq!(emit1(|a| a.umull(R0, R1, R2, R3, Al)), 0xE0810392);
    }

    #[test]
    fn clz_word() {
        // CLZ R0, R1 = 0xE16F0F11
        assert_eq!(emit1(|a| a.clz(R0, R1, Al)), 0xE16F0F11);
    }

    #[test]
    #[should_panic(expected = "clz cannot target pc")]
    fn clz_rejects_pc() {
        let mut asm = Assembler::new();
        asm.clz(Register::PC, R1, Al);
    }

    #[test]
    fn memory_single_forms() {
        // LDR R0, [R1, #4] = 0xE5910004
        assert_eq!(emit1(|a| a.ldr(R0, Address::new(R1, 4), Al)), 0xE5910004);
        // STR R0, [R1, #-4] = 0xE5010004
        assert_eq!(emit1(|a| a.str(R0, Address::new(R1, -4), Al)), 0xE5010004);
        // LDRB R2, [R3] = 0xE5D32000
        assert_eq!(emit1(|a| a.ldrb(R2, Address::new(R3, 0), Al)), 0xE5D32000);
        // STRB R2, [R3, #1] = 0xE5C32001
        assert_eq!(emit1(|a| a.strb(R2, Address::new(R3, 1), Al)), 0xE5C32001);
    }

    #[test]
    fn memory_mode3_forms() {
        // LDRH R0, [R1, #2] = 0xE1D100B2
        assert_eq!(emit1(|a| a.ldrh(R0, Address::new(R1, 2), Al)), 0xE1D100B2);
        // STRH R0, [R1, #2] = 0xE1C100B2
        assert_eq!(emit1(|a| a.strh(R0, Address::new(R1, 2), Al)), 0xE1C100B2);
        // LDRSB R0, [R1] = 0xE1D100D0
        assert_eq!(emit1(|a| a.ldrsb(R0, Address::new(R1, 0), Al)), 0xE1D100D0);
        // LDRSH R0, [R1] = 0xE1D100F0
        assert_eq!(emit1(|a| a.ldrsh(R0, Address::new(R1, 0), Al)), 0xE1D100F0);
        // LDRD R2, R3, [R1, #8] = 0xE1C120D8
        assert_eq!(emit1(|a| a.ldrd(R2, Address::new(R1, 8), Al)), 0xE1C120D8);
        // STRD R2, R3, [R1, #8] = 0xE1C120F8
        assert_eq!(emit1(|a| a.strd(R2, Address::new(R1, 8), Al)), 0xE1C120F8);
    }

    #[test]
    #[should_panic(expected = "even destination")]
    fn ldrd_rejects_odd_register() {
        let mut asm = Assembler::new();
        asm.ldrd(R1, Address::new(R2, 0), Al);
    }

    #[test]
    fn memory_multiple_forms() {
        let regs = reg_list(&[R0, R1, R2]);
        // STMDB SP!, {R0,R1,R2} = 0xE92D0007
        assert_eq!(
            emit1(|a| a.stm(BlockAddressMode::DbW, Register::SP, regs, Al)),
            0xE92D0007
        );
        // LDMIA SP!, {R0,R1,R2} = 0xE8BD0007
        assert_eq!(
            emit1(|a| a.ldm(BlockAddressMode::IaW, Register::SP, regs, Al)),
            0xE8BD0007
        );
        // STMIA R4, {R0,R1} = 0xE8840003
        assert_eq!(
            emit1(|a| a.stm(BlockAddressMode::Ia, R4, reg_list(&[R0, R1]), Al)),
            0xE8840003
        );
    }

    #[test]
    fn exclusive_monitor_forms() {
        // LDREX R0, [R1] = 0xE1910F9F
        assert_eq!(emit1(|a| a.ldrex(R0, R1, Al)), 0xE1910F9F);
        // STREX R0, R1, [R2] = 0xE1820F91
        assert_eq!(emit1(|a| a.strex(R0, R1, R2, Al)), 0xE1820F91);
        // CLREX = 0xF57FF01F
        assert_eq!(emit1(|a| a.clrex()), 0xF57FF01F);
    }

    #[test]
    fn system_forms() {
        // NOP = 0xE320F000
        assert_eq!(emit1(|a| a.nop(Al)), 0xE320F000);
        // SVC #1 = 0xEF000001
        assert_eq!(emit1(|a| a.svc(1)), 0xEF000001);
        // BKPT #0xDEAD = 0xE12DEA7D
        assert_eq!(emit1(|a| a.bkpt(0xDEAD)), 0xE12DEA7D);
        // BLX R2 = 0xE12FFF32
        assert_eq!(emit1(|a| a.blx(R2, Al)), 0xE12FFF32);
    }

    #[test]
    #[should_panic(expected = "svc immediate out of range")]
    fn svc_rejects_wide_immediate() {
        let mut asm = Assembler::new();
        asm.svc(1 << 24);
    }

    #[test]
    fn vfp_arithmetic_words() {
        use DRegister::{D0, D1, D2};
        use SRegister::{S0, S1, S2};
        // VADD.F32 S0, S1, S2 = 0xEE300A81
        assert_eq!(emit1(|a| a.vadds(S0, S1, S2, Al)), 0xEE300A81);
        // VADD.F64 D0, D1, D2 = 0xEE310B02
        assert_eq!(emit1(|a| a.vaddd(D0, D1, D2, Al)), 0xEE310B02);
        // VSUB.F32 S0, S1, S2 = 0xEE300AC1
        assert_eq!(emit1(|a| a.vsubs(S0, S1, S2, Al)), 0xEE300AC1);
        // VMUL.F64 D0, D1, D2 = 0xEE210B02
        assert_eq!(emit1(|a| a.vmuld(D0, D1, D2, Al)), 0xEE210B02);
        // VDIV.F32 S0, S1, S2 = 0xEE800A81
        assert_eq!(emit1(|a| a.vdivs(S0, S1, S2, Al)), 0xEE800A81);
        // VABS.F64 D0, D1 = 0xEEB00BC1
        assert_eq!(emit1(|a| a.vabsd(D0, D1, Al)), 0xEEB00BC1);
        // VNEG.F32 S0, S1 = 0xEEB10A60
        assert_eq!(emit1(|a| a.vnegs(S0, S1, Al)), 0xEEB10A60);
        // VSQRT.F64 D0, D1 = 0xEEB10BC1
        assert_eq!(emit1(|a| a.vsqrtd(D0, D1, Al)), 0xEEB10BC1);
    }

    #[test]
    fn vfp_upper_bank_register_split() {
        use DRegister::{D16, D17, D18};
        // VADD.F64 D16, D17, D18 = 0xEE710BA2 (D bits set)
        assert_eq!(emit1(|a| a.vaddd(D16, D17, D18, Al)), 0xEE710BA2);
        use SRegister::{S1, S3, S5};
        // VADD.F32 S1, S3, S5 = 0xEE710AA2
        assert_eq!(emit1(|a| a.vadds(S1, S3, S5, Al)), 0xEE710AA2);
    }

    #[test]
    fn vfp_moves_and_transfers() {
        use DRegister::{D0, D1};
        use SRegister::{S0, S1};
        // VMOV.F32 S0, S1 = 0xEEB00A60
        assert_eq!(emit1(|a| a.vmovs(S0, S1, Al)), 0xEEB00A60);
        // VMOV.F64 D0, D1 = 0xEEB00B41
        assert_eq!(emit1(|a| a.vmovd(D0, D1, Al)), 0xEEB00B41);
        // VMOV S1, R0 = 0xEE000A90
        assert_eq!(emit1(|a| a.vmovsr(S1, R0, Al)), 0xEE000A90);
        // VMOV R0, S1 = 0xEE100A90
        assert_eq!(emit1(|a| a.vmovrs(R0, S1, Al)), 0xEE100A90);
        // VMOV S0, S1, R0, R1 = 0xEC410A10
        assert_eq!(emit1(|a| a.vmovsrr(S0, R0, R1, Al)), 0xEC410A10);
        // VMOV D0, R0, R1 = 0xEC410B10
        assert_eq!(emit1(|a| a.vmovdrr(D0, R0, R1, Al)), 0xEC410B10);
        // VMOV R0, R1, D0 = 0xEC510B10
        assert_eq!(emit1(|a| a.vmovrrd(R0, R1, D0, Al)), 0xEC510B10);
    }

    #[test]
    fn vfp_memory_words() {
        use DRegister::D1;
        use SRegister::S0;
        // VLDR S0, [R1, #8] = 0xED910A02
        assert_eq!(emit1(|a| a.vldrs(S0, Address::new(R1, 8), Al)), 0xED910A02);
        // VSTR S0, [R1, #8] = 0xED810A02
        assert_eq!(emit1(|a| a.vstrs(S0, Address::new(R1, 8), Al)), 0xED810A02);
        // VLDR D1, [R2, #-4] = 0xED121B01
        assert_eq!(emit1(|a| a.vldrd(D1, Address::new(R2, -4), Al)), 0xED121B01);
        // VSTR D1, [R2, #4] = 0xED821B01
        assert_eq!(emit1(|a| a.vstrd(D1, Address::new(R2, 4), Al)), 0xED821B01);
    }

    #[test]
    fn vfp_immediate_forms() {
        use DRegister::D0;
        use SRegister::S0;
        // VMOV.F64 D0, #1.0 = 0xEEB70B00
        assert_eq!(
            emit1(|a| assert!(a.vmovd_immediate(D0, 1.0, Al))),
            0xEEB70B00
        );
        // VMOV.F32 S0, #1.0 = 0xEEB70A00
        assert_eq!(
            emit1(|a| assert!(a.vmovs_immediate(S0, 1.0, Al))),
            0xEEB70A00
        );
        // VMOV.F32 S0, #-2.0 = 0xEEB80A00
        assert_eq!(
            emit1(|a| assert!(a.vmovs_immediate(S0, -2.0, Al))),
            0xEEB80A00
        );
    }

    #[test]
    fn vfp_immediate_rejections() {
        use DRegister::D0;
        use SRegister::S0;
        let mut asm = Assembler::new();
        assert!(!asm.vmovs_immediate(S0, 0.0, Al)); // zero exponent field
        assert!(!asm.vmovs_immediate(S0, 1.0 / 3.0, Al)); // repeating mantissa
        assert!(!asm.vmovd_immediate(D0, 1e308, Al)); // exponent too wide
        assert!(!asm.vmovd_immediate(D0, 1.0000001, Al)); // mantissa too wide
        assert_eq!(asm.code_size(), 0);
    }

    #[test]
    fn vfp_comparison_and_status() {
        use DRegister::{D0, D1};
        use SRegister::{S0, S1};
        // VCMP.F32 S0, S1 = 0xEEB40A60
        assert_eq!(emit1(|a| a.vcmps(S0, S1, Al)), 0xEEB40A60);
        // VCMP.F64 D0, D1 = 0xEEB40B41
        assert_eq!(emit1(|a| a.vcmpd(D0, D1, Al)), 0xEEB40B41);
        // VCMP.F32 S0, #0.0 = 0xEEB50A40
        assert_eq!(emit1(|a| a.vcmpsz(S0, Al)), 0xEEB50A40);
        // VCMP.F64 D0, #0.0 = 0xEEB50B40
        assert_eq!(emit1(|a| a.vcmpdz(D0, Al)), 0xEEB50B40);
        // VMRS APSR_nzcv, FPSCR = 0xEEF1FA10
        assert_eq!(emit1(|a| a.vmstat(Al)), 0xEEF1FA10);
    }

    #[test]
    fn vfp_conversion_words() {
        use DRegister::{D0, D1};
        use SRegister::{S0, S1};
        // VCVT.F32.F64 S0, D1 = 0xEEB70BC1
        assert_eq!(emit1(|a| a.vcvtsd(S0, D1, Al)), 0xEEB70BC1);
        // VCVT.F64.F32 D0, S1 = 0xEEB70AE0
        assert_eq!(emit1(|a| a.vcvtds(D0, S1, Al)), 0xEEB70AE0);
        // VCVT.S32.F32 S0, S1 = 0xEEBD0AE0
        assert_eq!(emit1(|a| a.vcvtis(S0, S1, Al)), 0xEEBD0AE0);
        // VCVT.S32.F64 S0, D1 = 0xEEBD0BC1
        assert_eq!(emit1(|a| a.vcvtid(S0, D1, Al)), 0xEEBD0BC1);
        // VCVT.F32.S32 S0, S1 = 0xEEB80AE0
        assert_eq!(emit1(|a| a.vcvtsi(S0, S1, Al)), 0xEEB80AE0);
        // VCVT.F64.S32 D0, S1 = 0xEEB80BE0
        assert_eq!(emit1(|a| a.vcvtdi(D0, S1, Al)), 0xEEB80BE0);
        // VCVT.U32.F32 S0, S1 = 0xEEBC0AE0
        assert_eq!(emit1(|a| a.vcvtus(S0, S1, Al)), 0xEEBC0AE0);
        // VCVT.U32.F64 S0, D1 = 0xEEBC0BC1
        assert_eq!(emit1(|a| a.vcvtud(S0, D1, Al)), 0xEEBC0BC1);
        // VCVT.F32.U32 S0, S1 = 0xEEB80A60
        assert_eq!(emit1(|a| a.vcvtsu(S0, S1, Al)), 0xEEB80A60);
        // VCVT.F64.U32 D0, S1 = 0xEEB80B60
        assert_eq!(emit1(|a| a.vcvtdu(D0, S1, Al)), 0xEEB80B60);
    }

    #[test]
    fn branch_offset_round_trip() {
        // The encodable span is [-2^25, 2^25) around the site, shifted by
        // the 8-byte PC bias folded in by the encoder.
        for offset in [-33554424i32, -4096, -8, 0, 8, 4096, 33554436] {
            let inst = encode_branch_offset(offset, 0xEA00_0000);
            assert_eq!(decode_branch_offset(inst), offset, "offset {offset}");
        }
    }

    #[test]
    #[should_panic(expected = "branch offset out of range")]
    fn branch_offset_overflow_panics() {
        let _ = encode_branch_offset(1 << 26, 0xEA00_0000);
    }

    #[test]
    #[should_panic(expected = "not 4-aligned")]
    fn branch_offset_misaligned_panics() {
        let _ = encode_branch_offset(2, 0xEA00_0000);
    }

    #[test]
    fn backward_branch_to_bound_label() {
        let words = emit(|a| {
            let mut target = Label::new();
            a.bind(&mut target);
            a.nop(Al);
            a.b(&mut target, Al);
        });
        // B at offset 4 back to 0: offset field = (0 - 4 - 8) >> 2 = -3.
        assert_eq!(words[1], 0xEAFFFFFD);
    }

    #[test]
    fn forward_branch_chain_is_patched_on_bind() {
        let mut asm = Assembler::new();
        let mut target = Label::new();
        asm.b(&mut target, Al); // site 0
        asm.b(&mut target, Al); // site 4
        asm.bind(&mut target); // bound at 8
        assert!(target.is_bound());
        assert_eq!(target.position(), 8);
        let bytes = asm.finalize().into_bytes();
        let w0 = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let w4 = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        // Both sites now branch to offset 8: decoded offset == target - site.
        assert_eq!(decode_branch_offset(w0), 8);
        assert_eq!(decode_branch_offset(w4), 4);
        // site + 8 bytes of PC bias + field << 2 lands on the target.
        assert_eq!(w0 & 0xFF00_0000, 0xEA00_0000);
        assert_eq!(w0 & BRANCH_OFFSET_MASK, 0);
        assert_eq!(w4 & BRANCH_OFFSET_MASK, 0x00FF_FFFF);
    }

    #[test]
    fn bl_sets_the_link_bit() {
        let words = emit(|a| {
            let mut target = Label::new();
            a.bl(&mut target, Al);
            a.bind(&mut target);
        });
        assert_eq!(words[0] & 0xFF00_0000, 0xEB00_0000);
    }

    #[test]
    #[should_panic(expected = "label bound twice")]
    fn double_bind_panics() {
        let mut asm = Assembler::new();
        let mut label = Label::new();
        asm.bind(&mut label);
        asm.bind(&mut label);
    }

    #[test]
    fn breakpoint_fill() {
        let mut region = [0u8; 16];
        Assembler::initialize_memory_with_breakpoints(&mut region);
        for chunk in region.chunks_exact(4) {
            assert_eq!(
                u32::from_le_bytes(chunk.try_into().unwrap()),
                BREAKPOINT_INSTRUCTION
            );
        }
    }

    #[test]
    #[should_panic(expected = "not 4-aligned")]
    fn breakpoint_fill_rejects_ragged_region() {
        let mut region = [0u8; 6];
        Assembler::initialize_memory_with_breakpoints(&mut region);
    }
}
