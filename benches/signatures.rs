//! Benchmarks for signature decoding.
//!
//! Covers the blob kinds found in real images:
//! - Method signatures (simple, instance, generic, varargs)
//! - Field signatures (primitives, arrays, generic instantiations)
//! - Local variable signatures
//! - Type and method specifications

extern crate clrscope;

use clrscope::metadata::signatures::SignatureDecoder;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// Signature: void Method()
fn bench_method_void(c: &mut Criterion) {
    let signature = [0x00, 0x00, 0x01];

    c.bench_function("sig_method_void", |b| {
        b.iter(|| {
            let sig = SignatureDecoder::new(black_box(&signature)).decode().unwrap();
            black_box(sig)
        });
    });
}

/// Signature: int Instance.Method(int a, string b, bool c)
fn bench_method_instance(c: &mut Criterion) {
    let signature = [0x20, 0x03, 0x08, 0x08, 0x0E, 0x02];

    c.bench_function("sig_method_instance", |b| {
        b.iter(|| {
            let sig = SignatureDecoder::new(black_box(&signature)).decode().unwrap();
            black_box(sig)
        });
    });
}

/// Signature: TResult Method<T, TResult>(T input)
fn bench_method_generic(c: &mut Criterion) {
    let signature = [0x30, 0x02, 0x01, 0x1E, 0x01, 0x1E, 0x00];

    c.bench_function("sig_method_generic", |b| {
        b.iter(|| {
            let sig = SignatureDecoder::new(black_box(&signature)).decode().unwrap();
            black_box(sig)
        });
    });
}

/// Call site signature: void Method(int, ...; string, float64)
fn bench_method_vararg(c: &mut Criterion) {
    let signature = [0x05, 0x03, 0x01, 0x08, 0x41, 0x0E, 0x0D];

    c.bench_function("sig_method_vararg", |b| {
        b.iter(|| {
            let sig = SignatureDecoder::new(black_box(&signature)).decode().unwrap();
            black_box(sig)
        });
    });
}

/// Field: Dictionary<string, List<int>>[]
fn bench_field_nested_generic(c: &mut Criterion) {
    #[rustfmt::skip]
    let signature = [
        0x06, 0x1D,
        0x15, 0x12, 0x09, 0x02,
            0x0E,
            0x15, 0x12, 0x0D, 0x01, 0x08,
    ];

    c.bench_function("sig_field_nested_generic", |b| {
        b.iter(|| {
            let sig = SignatureDecoder::new(black_box(&signature)).decode().unwrap();
            black_box(sig)
        });
    });
}

/// Locals: int, string, pinned byte&, object[]
fn bench_local_vars(c: &mut Criterion) {
    let signature = [0x07, 0x04, 0x08, 0x0E, 0x45, 0x10, 0x05, 0x1D, 0x1C];

    c.bench_function("sig_local_vars", |b| {
        b.iter(|| {
            let sig = SignatureDecoder::new(black_box(&signature))
                .decode_local_var()
                .unwrap();
            black_box(sig)
        });
    });
}

/// TypeSpec: int[0...,0...] and MethodSpec: <string, int>
fn bench_specs(c: &mut Criterion) {
    let type_spec = [0x14, 0x08, 0x02, 0x00, 0x02, 0x00, 0x00];
    let method_spec = [0x0A, 0x02, 0x0E, 0x08];

    c.bench_function("sig_type_spec_array", |b| {
        b.iter(|| {
            let sig = SignatureDecoder::new(black_box(&type_spec))
                .decode_type_spec()
                .unwrap();
            black_box(sig)
        });
    });

    c.bench_function("sig_method_spec", |b| {
        b.iter(|| {
            let sig = SignatureDecoder::new(black_box(&method_spec))
                .decode_method_spec()
                .unwrap();
            black_box(sig)
        });
    });
}

criterion_group!(
    benches,
    bench_method_void,
    bench_method_instance,
    bench_method_generic,
    bench_method_vararg,
    bench_field_nested_generic,
    bench_local_vars,
    bench_specs,
);
criterion_main!(benches);
