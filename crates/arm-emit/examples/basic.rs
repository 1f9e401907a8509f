//! Emit a small leaf function and hex-dump the machine code.
//!
//! The function computes `r0 = (r0 + r1) * 2` and returns.
//!
//! Run with: `cargo run --example basic`

use arm_emit::{Assembler, Condition, Register, ShifterOperand};

use Condition::Al;
use Register::{R0, R1};

fn main() {
    let mut asm = Assembler::new();

    asm.add(R0, R0, ShifterOperand::from(R1), Al);
    asm.lsl(R0, R0, 1, Al);
    asm.mov(Register::PC, ShifterOperand::from(Register::LR), Al);

    let result = asm.finalize();
    println!("{} bytes:", result.len());
    for (i, chunk) in result.bytes().chunks_exact(4).enumerate() {
        let word = u32::from_le_bytes(chunk.try_into().unwrap());
        println!("  {:04X}: {:08X}", i * 4, word);
    }
}
