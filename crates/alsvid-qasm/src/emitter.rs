//! Emitter producing canonical OpenQASM 2.0 source.

use alsvid_ir::QModule;

/// Emit a module as OpenQASM 2.0 source.
///
/// The output is the canonical form: header, includes, register and gate
/// declarations, then one statement per line. Parsing the result yields a
/// structurally equal module.
pub fn emit(m: &QModule) -> String {
    m.to_string()
}
