//! The allocator's intrinsic gates.
//!
//! Allocators emit three marker gates with fixed semantics; a downstream
//! basis pass may expand them, and the bundled declarations keep the
//! emitted program self-contained:
//!
//! - `intrinsic_swap__ a, b` — three-CX swap;
//! - `intrinsic_rev_cx__ a, b` — CX with a basis change on both sides;
//! - `intrinsic_lcx__ a, w, b` — CX bridged through `w`.

use alsvid_ir::{Arg, BinOp, Expr, GateDecl, IrResult, QModule, Qop};

/// Name of the swap intrinsic.
pub const SWAP: &str = "intrinsic_swap__";

/// Name of the reverse-CX intrinsic.
pub const REV_CX: &str = "intrinsic_rev_cx__";

/// Name of the bridged-CX intrinsic.
pub const LCX: &str = "intrinsic_lcx__";

/// True for any of the intrinsic gate names.
pub fn is_intrinsic(name: &str) -> bool {
    name == SWAP || name == REV_CX || name == LCX
}

/// A call to `intrinsic_swap__ a, b`.
pub fn swap_call(a: Arg, b: Arg) -> Qop {
    Qop::Call {
        name: SWAP.into(),
        params: vec![],
        qargs: vec![a, b],
    }
}

/// A call to `intrinsic_rev_cx__ a, b`.
pub fn rev_cx_call(a: Arg, b: Arg) -> Qop {
    Qop::Call {
        name: REV_CX.into(),
        params: vec![],
        qargs: vec![a, b],
    }
}

/// A call to `intrinsic_lcx__ a, w, b`.
pub fn lcx_call(a: Arg, w: Arg, b: Arg) -> Qop {
    Qop::Call {
        name: LCX.into(),
        params: vec![],
        qargs: vec![a, w, b],
    }
}

fn hadamard(target: &str) -> Qop {
    Qop::U {
        theta: Expr::binary(BinOp::Div, Expr::Pi, Expr::Int(2)),
        phi: Expr::Int(0),
        lambda: Expr::Pi,
        target: Arg::id(target),
    }
}

fn cx(control: &str, target: &str) -> Qop {
    Qop::Cx {
        control: Arg::id(control),
        target: Arg::id(target),
    }
}

/// Insert the intrinsic gate declarations into a module, if absent.
///
/// Keeps output programs parseable without special-casing the intrinsic
/// names downstream.
pub fn ensure_declared(m: &mut QModule) -> IrResult<()> {
    if !m.has_gate(SWAP) {
        m.add_gate(GateDecl {
            name: SWAP.into(),
            params: vec![],
            qargs: vec!["a".into(), "b".into()],
            body: Some(vec![cx("a", "b"), cx("b", "a"), cx("a", "b")]),
        })?;
    }
    if !m.has_gate(REV_CX) {
        m.add_gate(GateDecl {
            name: REV_CX.into(),
            params: vec![],
            qargs: vec!["a".into(), "b".into()],
            body: Some(vec![
                hadamard("a"),
                hadamard("b"),
                cx("b", "a"),
                hadamard("b"),
                hadamard("a"),
            ]),
        })?;
    }
    if !m.has_gate(LCX) {
        m.add_gate(GateDecl {
            name: LCX.into(),
            params: vec![],
            qargs: vec!["a".into(), "w".into(), "b".into()],
            body: Some(vec![cx("w", "b"), cx("a", "w"), cx("w", "b"), cx("a", "w")]),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsic_names() {
        assert!(is_intrinsic(SWAP));
        assert!(is_intrinsic(REV_CX));
        assert!(is_intrinsic(LCX));
        assert!(!is_intrinsic("cx"));
    }

    #[test]
    fn test_calls_render() {
        let call = swap_call(Arg::idx("q", 0), Arg::idx("q", 1));
        assert_eq!(call.to_string(), "intrinsic_swap__ q[0], q[1];");

        let call = lcx_call(Arg::idx("q", 0), Arg::idx("q", 1), Arg::idx("q", 2));
        assert_eq!(call.to_string(), "intrinsic_lcx__ q[0], q[1], q[2];");
    }

    #[test]
    fn test_ensure_declared_idempotent() {
        let mut m = QModule::new();
        ensure_declared(&mut m).unwrap();
        ensure_declared(&mut m).unwrap();
        assert!(m.has_gate(SWAP));
        assert!(m.has_gate(REV_CX));
        assert!(m.has_gate(LCX));
        assert_eq!(m.gates().len(), 3);
    }
}
