//! Forward branches and the constant pool.
//!
//! Emits a compare-and-branch diamond with a forward label, loads a pooled
//! object through the pool base register, and prints both the code and the
//! resulting pool layout.
//!
//! Run with: `cargo run --example labels_and_pool`

use arm_emit::{
    Assembler, Condition, ExternalLabel, Label, Object, Register, ShifterOperand,
};

use Register::{R0, R1};

fn main() {
    let mut asm = Assembler::new();
    let mut done = Label::new();

    asm.cmp(R0, ShifterOperand::from(R1), Condition::Al);
    asm.b(&mut done, Condition::Eq); // forward reference, patched at bind
    asm.load_object(R0, Object::from_raw(0x1000_0001));
    asm.branch_link(&ExternalLabel::new("runtime_helper", 0x0002_0000));
    asm.bind(&mut done);
    asm.mov(Register::PC, ShifterOperand::from(Register::LR), Condition::Al);

    let result = asm.finalize();
    println!("code ({} bytes):", result.len());
    for (i, chunk) in result.bytes().chunks_exact(4).enumerate() {
        let word = u32::from_le_bytes(chunk.try_into().unwrap());
        println!("  {:04X}: {:08X}", i * 4, word);
    }
    println!("pool ({} entries):", result.object_pool().len());
    for (i, entry) in result.object_pool().entries().iter().enumerate() {
        println!("  [{i}] {entry:?}");
    }
}
