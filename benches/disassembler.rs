//! Benchmarks for CIL decoding.

extern crate clrscope;

use clrscope::{
    disassembler::{decode_instruction, decode_stream, Instructions},
    Parser,
};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

/// A loop summing an array, repeated to a realistic method size
fn loop_body() -> Vec<u8> {
    #[rustfmt::skip]
    let block = [
        0x16,                               // ldc.i4.0
        0x0A,                               // stloc.0
        0x16,                               // ldc.i4.0
        0x0B,                               // stloc.1
        0x2B, 0x0A,                         // br.s +10
        0x06,                               // ldloc.0
        0x02,                               // ldarg.0
        0x07,                               // ldloc.1
        0x94,                               // ldelem.i4
        0x58,                               // add
        0x0A,                               // stloc.0
        0x07,                               // ldloc.1
        0x17,                               // ldc.i4.1
        0x58,                               // add
        0x0B,                               // stloc.1
        0x07,                               // ldloc.1
        0x02,                               // ldarg.0
        0x8E,                               // ldlen
        0x69,                               // conv.i4
        0x32, 0xEF,                         // blt.s -17
        0x28, 0x01, 0x00, 0x00, 0x0A,       // call 0x0A000001
        0x20, 0x39, 0x05, 0x00, 0x00,       // ldc.i4 1337
        0x26,                               // pop
        0xFE, 0x16, 0x01, 0x00, 0x00, 0x02, // constrained. 0x02000001
        0x00,                               // nop
    ];

    block.iter().copied().cycle().take(block.len() * 64).collect()
}

fn bench_single_instruction(c: &mut Criterion) {
    let code = [0x28, 0x01, 0x00, 0x00, 0x0A];

    c.bench_function("cil_decode_call", |b| {
        b.iter(|| {
            let mut parser = Parser::new(black_box(&code));
            black_box(decode_instruction(&mut parser, &()).unwrap())
        });
    });
}

fn bench_stream(c: &mut Criterion) {
    let code = loop_body();

    let mut group = c.benchmark_group("cil_stream");
    group.throughput(Throughput::Bytes(code.len() as u64));
    group.bench_function("decode_stream", |b| {
        b.iter(|| black_box(decode_stream(black_box(&code), &()).unwrap()));
    });
    group.bench_function("lazy_count", |b| {
        b.iter(|| black_box(Instructions::new(black_box(&code), &()).count()));
    });
    group.finish();
}

fn bench_switch(c: &mut Criterion) {
    let mut code = vec![0x45];
    code.extend_from_slice(&256_u32.to_le_bytes());
    for case in 0..256_i32 {
        code.extend_from_slice(&case.to_le_bytes());
    }
    code.extend(std::iter::repeat(0x00).take(256));

    c.bench_function("cil_decode_switch_256", |b| {
        b.iter(|| {
            let mut parser = Parser::new(black_box(&code));
            black_box(decode_instruction(&mut parser, &()).unwrap())
        });
    });
}

criterion_group!(
    benches,
    bench_single_instruction,
    bench_stream,
    bench_switch
);
criterion_main!(benches);
