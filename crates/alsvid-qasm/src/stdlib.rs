//! The bundled standard gate library.
//!
//! Only `qelib1.inc` is recognised; its gates are defined over the `U` and
//! `CX` built-ins so that inlining to any basis terminates.

/// Source of the bundled `qelib1.inc`.
pub const QELIB1: &str = r#"
gate u3(theta, phi, lambda) q { U(theta, phi, lambda) q; }
gate u2(phi, lambda) q { U(pi / 2, phi, lambda) q; }
gate u1(lambda) q { U(0, 0, lambda) q; }
gate cx c, t { CX c, t; }
gate id a { U(0, 0, 0) a; }
gate x a { u3(pi, 0, pi) a; }
gate y a { u3(pi, pi / 2, pi / 2) a; }
gate z a { u1(pi) a; }
gate h a { u2(0, pi) a; }
gate s a { u1(pi / 2) a; }
gate sdg a { u1(-pi / 2) a; }
gate t a { u1(pi / 4) a; }
gate tdg a { u1(-pi / 4) a; }
gate rx(theta) a { u3(theta, -pi / 2, pi / 2) a; }
gate ry(theta) a { u3(theta, 0, 0) a; }
gate rz(phi) a { u1(phi) a; }
gate cz a, b { h b; cx a, b; h b; }
gate cy a, b { sdg b; cx a, b; s b; }
gate swap a, b { cx a, b; cx b, a; cx a, b; }
gate ccx a, b, c { h c; cx b, c; tdg c; cx a, c; t c; cx b, c; tdg c; cx a, c; t b; t c; h c; cx a, b; t a; tdg b; cx a, b; }
gate crz(lambda) a, b { u1(lambda / 2) b; cx a, b; u1(-(lambda / 2)) b; cx a, b; }
gate cu1(lambda) a, b { u1(lambda / 2) a; cx a, b; u1(-(lambda / 2)) b; cx a, b; u1(lambda / 2) b; }
"#;

/// The include file names the front end recognises.
pub fn is_known_include(name: &str) -> bool {
    name == "qelib1.inc"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_include() {
        assert!(is_known_include("qelib1.inc"));
        assert!(!is_known_include("qelib2.inc"));
    }

    #[test]
    fn test_library_parses() {
        let gates = crate::parser::parse_gate_library(QELIB1).unwrap();
        assert!(gates.iter().any(|g| g.name == "h"));
        assert!(gates.iter().any(|g| g.name == "ccx"));
        assert!(gates.iter().all(|g| !g.is_opaque()));
    }
}
