//! Performance benchmarks for `arm-emit`.
//!
//! Measures:
//! - Single-instruction emission latency
//! - Straight-line code throughput (instructions/second)
//! - Immediate-materialization (rotation search + movw/movt fallback)
//! - Label-heavy workloads (forward-branch linking and binding)
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use arm_emit::{Address, Assembler, Condition, Label, Register, ShifterOperand};

use Condition::Al;
use Register::{R0, R1, R2};

fn bench_single_instruction(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_instruction");

    group.bench_function("mov_register", |b| {
        b.iter(|| {
            let mut asm = Assembler::new();
            asm.mov(black_box(R0), ShifterOperand::from(R1), Al);
            asm.finalize()
        })
    });

    group.bench_function("add_immediate", |b| {
        let so = ShifterOperand::try_from_immediate(0xFF).unwrap();
        b.iter(|| {
            let mut asm = Assembler::new();
            asm.add(black_box(R0), R1, so, Al);
            asm.finalize()
        })
    });

    group.bench_function("ldr_offset", |b| {
        b.iter(|| {
            let mut asm = Assembler::new();
            asm.ldr(black_box(R0), Address::new(R1, 4), Al);
            asm.finalize()
        })
    });

    group.finish();
}

fn bench_straight_line(c: &mut Criterion) {
    const COUNT: usize = 1024;
    let mut group = c.benchmark_group("straight_line");
    group.throughput(Throughput::Elements(COUNT as u64));

    group.bench_function("mixed_alu_mem", |b| {
        b.iter(|| {
            let mut asm = Assembler::new();
            for i in 0..COUNT {
                match i % 4 {
                    0 => asm.add(R0, R1, ShifterOperand::from(R2), Al),
                    1 => asm.ldr(R0, Address::new(R1, (i % 128) as i32 * 4), Al),
                    2 => asm.mul(R0, R1, R2, Al),
                    _ => asm.str(R0, Address::new(R1, 8), Al),
                }
            }
            asm.finalize()
        })
    });

    group.finish();
}

fn bench_immediates(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_immediate");

    // One rotation step.
    group.bench_function("rotated", |b| {
        b.iter(|| {
            let mut asm = Assembler::new();
            asm.load_immediate(R0, black_box(0xFF00), Al);
            asm.finalize()
        })
    });

    // Full search failure → movw/movt.
    group.bench_function("movw_movt", |b| {
        b.iter(|| {
            let mut asm = Assembler::new();
            asm.load_immediate(R0, black_box(0x12345678), Al);
            asm.finalize()
        })
    });

    group.finish();
}

fn bench_labels(c: &mut Criterion) {
    const LABELS: usize = 128;
    let mut group = c.benchmark_group("labels");
    group.throughput(Throughput::Elements(LABELS as u64));

    // Each label is referenced by three forward branches before binding.
    group.bench_function("forward_branch_chains", |b| {
        b.iter(|| {
            let mut asm = Assembler::new();
            let mut labels: Vec<Label> = (0..LABELS).map(|_| Label::new()).collect();
            for label in &mut labels {
                asm.b(label, Al);
                asm.b(label, Condition::Eq);
                asm.bl(label, Al);
            }
            for label in &mut labels {
                asm.bind(label);
                asm.nop(Al);
            }
            asm.finalize()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_single_instruction,
    bench_straight_line,
    bench_immediates,
    bench_labels
);
criterion_main!(benches);
