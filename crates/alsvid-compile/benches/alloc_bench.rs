//! Allocator benchmarks on a small GHZ-like workload.

use criterion::{Criterion, criterion_group, criterion_main};

use alsvid_arch::presets;
use alsvid_compile::{AllocatorKind, CompileSettings, compile};

fn ghz_source() -> String {
    let mut src = String::from("OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[5];\ncreg c[5];\nh q[0];\n");
    for i in 1..5 {
        src.push_str(&format!("cx q[0], q[{i}];\n"));
    }
    for i in 0..5 {
        src.push_str(&format!("measure q[{i}] -> c[{i}];\n"));
    }
    src
}

fn bench_allocators(c: &mut Criterion) {
    let src = ghz_source();
    let arch = presets::square5();

    let mut group = c.benchmark_group("allocate_ghz5");
    for &kind in &[AllocatorKind::Bmt, AllocatorKind::Sabre, AllocatorKind::Greedy] {
        group.bench_function(kind.key(), |b| {
            b.iter(|| {
                let m = alsvid_qasm::parse(&src).unwrap();
                let settings = CompileSettings {
                    allocator: kind,
                    ..CompileSettings::default()
                };
                compile(m, &arch, &settings).unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_allocators);
criterion_main!(benches);
