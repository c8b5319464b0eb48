//! Emit/parse round-trip properties.

use proptest::prelude::*;

use alsvid_ir::{Arg, BinOp, Cond, Expr, QModule, Qop, RegKind, Stmt};
use alsvid_qasm::{emit, parse};

const QREG: u32 = 4;
const CREG: u32 = 2;

fn arg(i: u32) -> Arg {
    Arg::idx("q", i % QREG)
}

fn expr_strategy() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (-16i64..16).prop_map(Expr::Int),
        Just(Expr::Pi),
        (1u32..8).prop_map(|d| Expr::binary(BinOp::Div, Expr::Pi, Expr::Int(d as i64))),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        (inner.clone(), inner).prop_map(|(l, r)| Expr::binary(BinOp::Add, l, r))
    })
}

fn qop_strategy() -> impl Strategy<Value = Qop> {
    prop_oneof![
        (expr_strategy(), expr_strategy(), expr_strategy(), 0..QREG).prop_map(
            |(theta, phi, lambda, q)| Qop::U {
                theta,
                phi,
                lambda,
                target: arg(q),
            }
        ),
        (0..QREG, 1..QREG).prop_map(|(c, off)| Qop::Cx {
            control: arg(c),
            target: arg(c + off),
        }),
        (0..QREG).prop_map(|q| Qop::Reset { target: arg(q) }),
        (0..QREG.min(CREG)).prop_map(|i| Qop::Measure {
            qarg: arg(i),
            carg: Arg::idx("c", i % CREG),
        }),
        (0..QREG, 1..QREG).prop_map(|(a, off)| Qop::Barrier {
            qargs: vec![arg(a), arg(a + off)],
        }),
    ]
}

fn stmt_strategy() -> impl Strategy<Value = Stmt> {
    (qop_strategy(), proptest::option::of(0u64..4)).prop_map(|(qop, cond)| Stmt {
        cond: cond.map(|value| Cond {
            reg: "c".into(),
            value,
        }),
        qop,
    })
}

fn module_strategy() -> impl Strategy<Value = QModule> {
    proptest::collection::vec(stmt_strategy(), 0..12).prop_map(|stmts| {
        let mut m = QModule::new();
        m.add_reg("q", QREG, RegKind::Quantum).unwrap();
        m.add_reg("c", CREG, RegKind::Classical).unwrap();
        for stmt in stmts {
            m.push_statement(stmt);
        }
        m
    })
}

proptest! {
    #[test]
    fn emitted_modules_reparse(m in module_strategy()) {
        let text = emit(&m);
        let reparsed = parse(&text).expect("emitted module must parse");
        prop_assert_eq!(text, emit(&reparsed), "emit must be a fixed point");
    }

    #[test]
    fn clone_emits_identically(m in module_strategy()) {
        prop_assert_eq!(emit(&m), emit(&m.clone_module()));
    }
}
