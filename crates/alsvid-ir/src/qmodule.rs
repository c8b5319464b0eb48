//! The `QModule` program container.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ast::{GateDecl, RegDecl, RegKind, Stmt};
use crate::error::{IrError, IrResult};

/// Stable reference to a top-level statement of one [`QModule`].
///
/// Ids are unique within a module for its whole lifetime: rewrites assign
/// fresh ids to inserted statements and never reuse removed ones. A clone
/// of a module gets entirely fresh ids, so a `StmtId` can never alias
/// across the original and the clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StmtId(pub u32);

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// An ordered OpenQASM 2.0 program.
///
/// Holds the version tag, includes, register declarations (unique by name,
/// in declaration order), gate declarations (unique by name), and the
/// ordered top-level statements.
///
/// Every mutating operation bumps an internal version counter; analyses
/// key their caches on [`QModule::version_counter`] to detect staleness.
#[derive(Debug)]
pub struct QModule {
    version: String,
    includes: Vec<String>,
    regs: Vec<RegDecl>,
    reg_index: FxHashMap<String, usize>,
    gates: Vec<GateDecl>,
    gate_index: FxHashMap<String, usize>,
    /// Gates provided by an include file: resolvable, but not printed
    /// (the include line stands for them).
    include_gates: rustc_hash::FxHashSet<String>,
    stmts: Vec<(StmtId, Stmt)>,
    next_stmt: u32,
    version_counter: u64,
}

impl Default for QModule {
    fn default() -> Self {
        Self::new()
    }
}

impl QModule {
    /// Create an empty module with version `2.0`.
    pub fn new() -> Self {
        QModule {
            version: "2.0".to_string(),
            includes: vec![],
            regs: vec![],
            reg_index: FxHashMap::default(),
            gates: vec![],
            gate_index: FxHashMap::default(),
            include_gates: rustc_hash::FxHashSet::default(),
            stmts: vec![],
            next_stmt: 0,
            version_counter: 0,
        }
    }

    /// The OpenQASM version tag.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Monotonic counter bumped by every mutation. Cache key for analyses.
    pub fn version_counter(&self) -> u64 {
        self.version_counter
    }

    fn bump(&mut self) {
        self.version_counter += 1;
    }

    /// Record an include by file name.
    pub fn add_include(&mut self, path: impl Into<String>) {
        self.includes.push(path.into());
        self.bump();
    }

    /// The recorded includes.
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    // ---- registers ------------------------------------------------------

    /// Declare a register. Fails on duplicate names.
    pub fn add_reg(&mut self, name: impl Into<String>, size: u32, kind: RegKind) -> IrResult<()> {
        let name = name.into();
        if self.reg_index.contains_key(&name) {
            return Err(IrError::DuplicateRegister(name));
        }
        self.reg_index.insert(name.clone(), self.regs.len());
        self.regs.push(RegDecl { name, size, kind });
        self.bump();
        Ok(())
    }

    /// All register declarations, in declaration order.
    pub fn regs(&self) -> &[RegDecl] {
        &self.regs
    }

    /// Look up a register by name.
    pub fn get_reg(&self, name: &str) -> Option<&RegDecl> {
        self.reg_index.get(name).map(|&i| &self.regs[i])
    }

    /// Remove every quantum register declaration, keeping classical ones.
    pub fn remove_qregs(&mut self) {
        self.regs.retain(|r| r.kind == RegKind::Classical);
        self.reg_index.clear();
        for (i, r) in self.regs.iter().enumerate() {
            self.reg_index.insert(r.name.clone(), i);
        }
        self.bump();
    }

    // ---- gates ----------------------------------------------------------

    /// Declare a gate. Fails on duplicate names.
    pub fn add_gate(&mut self, gate: GateDecl) -> IrResult<()> {
        if self.gate_index.contains_key(&gate.name) {
            return Err(IrError::DuplicateGate(gate.name));
        }
        self.gate_index.insert(gate.name.clone(), self.gates.len());
        self.gates.push(gate);
        self.bump();
        Ok(())
    }

    /// Declare a gate provided by an include file.
    ///
    /// The gate resolves like any other, but is not printed; the include
    /// line stands for it in the emitted program.
    pub fn add_include_gate(&mut self, gate: GateDecl) -> IrResult<()> {
        let name = gate.name.clone();
        self.add_gate(gate)?;
        self.include_gates.insert(name);
        Ok(())
    }

    /// All gate declarations, in declaration order.
    pub fn gates(&self) -> &[GateDecl] {
        &self.gates
    }

    /// Look up a gate by name.
    pub fn get_gate(&self, name: &str) -> Option<&GateDecl> {
        self.gate_index.get(name).map(|&i| &self.gates[i])
    }

    /// True if a gate with this name is declared (opaque or not).
    pub fn has_gate(&self, name: &str) -> bool {
        self.gate_index.contains_key(name)
    }

    // ---- statements -----------------------------------------------------

    fn fresh_id(&mut self) -> StmtId {
        let id = StmtId(self.next_stmt);
        self.next_stmt += 1;
        id
    }

    /// Number of top-level statements.
    pub fn num_statements(&self) -> usize {
        self.stmts.len()
    }

    /// Iterate over `(id, statement)` pairs in program order.
    pub fn statements(&self) -> impl Iterator<Item = (StmtId, &Stmt)> {
        self.stmts.iter().map(|(id, s)| (*id, s))
    }

    /// The ids of all statements, in program order.
    pub fn statement_ids(&self) -> Vec<StmtId> {
        self.stmts.iter().map(|(id, _)| *id).collect()
    }

    /// Get a statement by id.
    pub fn statement(&self, id: StmtId) -> Option<&Stmt> {
        self.find_statement(id).map(|i| &self.stmts[i].1)
    }

    /// The position of a statement in program order.
    pub fn find_statement(&self, id: StmtId) -> Option<usize> {
        self.stmts.iter().position(|(sid, _)| *sid == id)
    }

    /// Append a statement; returns its fresh id.
    pub fn push_statement(&mut self, stmt: Stmt) -> StmtId {
        let id = self.fresh_id();
        self.stmts.push((id, stmt));
        self.bump();
        id
    }

    /// Append many statements; returns their fresh ids.
    pub fn push_statements(&mut self, stmts: impl IntoIterator<Item = Stmt>) -> Vec<StmtId> {
        stmts.into_iter().map(|s| self.push_statement(s)).collect()
    }

    /// Insert a statement before `id`.
    pub fn insert_before(&mut self, id: StmtId, stmt: Stmt) -> IrResult<StmtId> {
        let pos = self
            .find_statement(id)
            .ok_or(IrError::StatementNotFound(id))?;
        let new_id = self.fresh_id();
        self.stmts.insert(pos, (new_id, stmt));
        self.bump();
        Ok(new_id)
    }

    /// Insert a statement after `id`.
    pub fn insert_after(&mut self, id: StmtId, stmt: Stmt) -> IrResult<StmtId> {
        let pos = self
            .find_statement(id)
            .ok_or(IrError::StatementNotFound(id))?;
        let new_id = self.fresh_id();
        self.stmts.insert(pos + 1, (new_id, stmt));
        self.bump();
        Ok(new_id)
    }

    /// Remove a statement, returning it.
    pub fn remove_statement(&mut self, id: StmtId) -> IrResult<Stmt> {
        let pos = self
            .find_statement(id)
            .ok_or(IrError::StatementNotFound(id))?;
        let (_, stmt) = self.stmts.remove(pos);
        self.bump();
        Ok(stmt)
    }

    /// Replace a statement with a sequence of statements.
    ///
    /// The replacements take the original's position; their fresh ids are
    /// returned in order. The replaced id becomes invalid.
    pub fn replace_statement(
        &mut self,
        id: StmtId,
        replacements: Vec<Stmt>,
    ) -> IrResult<Vec<StmtId>> {
        let pos = self
            .find_statement(id)
            .ok_or(IrError::StatementNotFound(id))?;
        self.stmts.remove(pos);
        let mut ids = Vec::with_capacity(replacements.len());
        for (off, stmt) in replacements.into_iter().enumerate() {
            let new_id = self.fresh_id();
            self.stmts.insert(pos + off, (new_id, stmt));
            ids.push(new_id);
        }
        self.bump();
        Ok(ids)
    }

    /// Mutable access to one statement.
    pub fn statement_mut(&mut self, id: StmtId) -> Option<&mut Stmt> {
        self.bump();
        self.stmts
            .iter_mut()
            .find(|(sid, _)| *sid == id)
            .map(|(_, s)| s)
    }

    /// Drop all statements, keeping declarations.
    pub fn clear_statements(&mut self) {
        self.stmts.clear();
        self.bump();
    }

    /// Reorder statements to the given id sequence.
    ///
    /// Ids keep referring to the same statements. Every current statement
    /// must appear exactly once in `order`.
    pub fn reorder_statements(&mut self, order: &[StmtId]) -> IrResult<()> {
        let mut by_id: FxHashMap<StmtId, Stmt> = self.stmts.drain(..).collect();
        let mut reordered = Vec::with_capacity(order.len());
        for &id in order {
            let stmt = by_id.remove(&id).ok_or(IrError::StatementNotFound(id))?;
            reordered.push((id, stmt));
        }
        debug_assert!(by_id.is_empty(), "reorder must cover every statement");
        self.stmts = reordered;
        self.bump();
        Ok(())
    }

    /// Deep copy with fresh statement ids.
    ///
    /// Statement correspondence between a module and its clone is by
    /// traversal order only; no id of the clone resolves in the source.
    pub fn clone_module(&self) -> QModule {
        let mut m = QModule {
            version: self.version.clone(),
            includes: self.includes.clone(),
            regs: self.regs.clone(),
            reg_index: self.reg_index.clone(),
            gates: self.gates.clone(),
            gate_index: self.gate_index.clone(),
            include_gates: self.include_gates.clone(),
            stmts: vec![],
            next_stmt: 0,
            version_counter: 0,
        };
        for (_, stmt) in &self.stmts {
            m.push_statement(stmt.clone());
        }
        m
    }
}

impl fmt::Display for QModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "OPENQASM {};", self.version)?;
        for inc in &self.includes {
            writeln!(f, "include \"{inc}\";")?;
        }
        for reg in &self.regs {
            writeln!(f, "{reg}")?;
        }
        for gate in &self.gates {
            if !self.include_gates.contains(&gate.name) {
                writeln!(f, "{gate}")?;
            }
        }
        for (_, stmt) in &self.stmts {
            writeln!(f, "{stmt}")?;
        }
        Ok(())
    }
}
