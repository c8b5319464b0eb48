//! Qubit and classical-bit numbering.

use rustc_hash::FxHashMap;

use alsvid_ir::{Arg, QModule, RegKind};

/// Flat numbering of the program's quantum and classical bits.
///
/// Registers are walked in declaration order; quantum bits take the
/// indices `0..q_size`, classical bits `0..c_size` in their own space.
/// The combined "xbit" space used by the circuit DAG numbers quantum bits
/// first: a classical bit `c` has real id `q_size + c`.
///
/// Gate declarations get local maps from their formal qubit names to
/// positional indices.
#[derive(Debug, Clone, Default)]
pub struct XbitTable {
    q_ids: FxHashMap<String, u32>,
    c_ids: FxHashMap<String, u32>,
    q_args: Vec<Arg>,
    c_args: Vec<Arg>,
    reg_uids: FxHashMap<String, Vec<u32>>,
    locals: FxHashMap<String, FxHashMap<String, u32>>,
}

impl XbitTable {
    /// Number the bits of a module.
    pub fn build(m: &QModule) -> Self {
        let mut table = XbitTable::default();

        for reg in m.regs() {
            let mut uids = Vec::with_capacity(reg.size as usize);
            for i in 0..reg.size {
                let arg = Arg::idx(reg.name.clone(), i);
                let key = arg.to_string();
                match reg.kind {
                    RegKind::Quantum => {
                        let uid = table.q_args.len() as u32;
                        table.q_ids.insert(key, uid);
                        table.q_args.push(arg);
                        uids.push(uid);
                    }
                    RegKind::Classical => {
                        let uid = table.c_args.len() as u32;
                        table.c_ids.insert(key, uid);
                        table.c_args.push(arg);
                        uids.push(uid);
                    }
                }
            }
            table.reg_uids.insert(reg.name.clone(), uids);
        }

        for gate in m.gates() {
            let locals = gate
                .qargs
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i as u32))
                .collect();
            table.locals.insert(gate.name.clone(), locals);
        }

        table
    }

    /// Number of quantum bits.
    pub fn q_size(&self) -> u32 {
        self.q_args.len() as u32
    }

    /// Number of classical bits.
    pub fn c_size(&self) -> u32 {
        self.c_args.len() as u32
    }

    /// Number of xbits (quantum + classical).
    pub fn size(&self) -> u32 {
        self.q_size() + self.c_size()
    }

    /// Quantum uid of a `reg[idx]` key.
    pub fn q_uid(&self, key: &str) -> Option<u32> {
        self.q_ids.get(key).copied()
    }

    /// Classical uid of a `reg[idx]` key.
    pub fn c_uid(&self, key: &str) -> Option<u32> {
        self.c_ids.get(key).copied()
    }

    /// Quantum uid of an argument node.
    pub fn arg_q_uid(&self, arg: &Arg) -> Option<u32> {
        self.q_uid(&arg.to_string())
    }

    /// Classical uid of an argument node.
    pub fn arg_c_uid(&self, arg: &Arg) -> Option<u32> {
        self.c_uid(&arg.to_string())
    }

    /// The argument node naming quantum bit `uid`.
    pub fn q_arg(&self, uid: u32) -> &Arg {
        &self.q_args[uid as usize]
    }

    /// The uids of a register's bits (within their own space).
    pub fn reg_uids(&self, name: &str) -> Option<&[u32]> {
        self.reg_uids.get(name).map(Vec::as_slice)
    }

    /// Local index of a formal qubit inside a gate declaration.
    pub fn local_uid(&self, gate: &str, formal: &str) -> Option<u32> {
        self.locals.get(gate).and_then(|m| m.get(formal)).copied()
    }
}
