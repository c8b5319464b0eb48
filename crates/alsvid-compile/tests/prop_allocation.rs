//! Allocation contract properties over random CX programs.

use proptest::prelude::*;

use alsvid_arch::presets;
use alsvid_compile::{AllocatorKind, CompileSettings, compile};

/// A random sequence of CX statements over 5 virtual qubits.
fn cx_program() -> impl Strategy<Value = String> {
    proptest::collection::vec((0u32..5, 0u32..5), 1..8).prop_map(|pairs| {
        let mut src = String::from("OPENQASM 2.0;\nqreg q[5];\n");
        for (a, b) in pairs {
            if a != b {
                src.push_str(&format!("CX q[{a}], q[{b}];\n"));
            }
        }
        src
    })
}

fn check(src: &str, allocator: AllocatorKind) {
    let arch = presets::square5();
    let m = alsvid_qasm::parse(src).expect("generated source parses");
    let settings = CompileSettings {
        allocator,
        verify: true,
        seed: 3,
        ..CompileSettings::default()
    };
    let out = compile(m, &arch, &settings).expect("compilation succeeds");
    let report = out.verify.expect("verification ran");
    assert!(report.arch_ok, "[{allocator:?}] illegal output for:\n{src}");
    assert!(
        report.semantic_ok,
        "[{allocator:?}] semantic drift for:\n{src}"
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn bmt_output_is_legal_and_faithful(src in cx_program()) {
        check(&src, AllocatorKind::Bmt);
    }

    #[test]
    fn sabre_output_is_legal_and_faithful(src in cx_program()) {
        check(&src, AllocatorKind::Sabre);
    }

    #[test]
    fn greedy_output_is_legal_and_faithful(src in cx_program()) {
        check(&src, AllocatorKind::Greedy);
    }
}
