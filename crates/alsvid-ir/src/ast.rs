//! AST node types for the OpenQASM 2.0 subset.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operators allowed in parameter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Exponentiation.
    Pow,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "^",
        }
    }

    /// Binding strength used when printing with minimal parentheses.
    fn precedence(self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div => 2,
            BinOp::Pow => 3,
        }
    }
}

/// Unary operators and scientific functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// Arithmetic negation.
    Neg,
    /// Sine.
    Sin,
    /// Cosine.
    Cos,
    /// Tangent.
    Tan,
    /// Natural logarithm.
    Ln,
    /// Square root.
    Sqrt,
    /// Exponential.
    Exp,
}

impl UnOp {
    fn name(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Sin => "sin",
            UnOp::Cos => "cos",
            UnOp::Tan => "tan",
            UnOp::Ln => "ln",
            UnOp::Sqrt => "sqrt",
            UnOp::Exp => "exp",
        }
    }
}

/// A parameter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Integer literal.
    Int(i64),
    /// Real literal.
    Real(f64),
    /// Identifier (a gate formal parameter).
    Ident(String),
    /// The pi constant.
    Pi,
    /// Unary operator application.
    Unary(UnOp, Box<Expr>),
    /// Binary operator application.
    Binary {
        /// The operator.
        op: BinOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Convenience constructor for a binary node.
    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Convenience constructor for a unary node.
    pub fn unary(op: UnOp, operand: Expr) -> Self {
        Expr::Unary(op, Box::new(operand))
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        match self {
            Expr::Int(v) => write!(f, "{v}"),
            Expr::Real(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            Expr::Ident(s) => write!(f, "{s}"),
            Expr::Pi => write!(f, "pi"),
            Expr::Unary(UnOp::Neg, e) => {
                write!(f, "-")?;
                e.fmt_prec(f, 4)
            }
            Expr::Unary(op, e) => {
                write!(f, "{}(", op.name())?;
                e.fmt_prec(f, 0)?;
                write!(f, ")")
            }
            Expr::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                let parens = prec < parent;
                if parens {
                    write!(f, "(")?;
                }
                lhs.fmt_prec(f, prec)?;
                write!(f, " {} ", op.symbol())?;
                // Left-associative operators need the right operand one level up.
                rhs.fmt_prec(f, prec + 1)?;
                if parens {
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}

/// A quantum or classical argument position.
///
/// `Id` names a whole register (or a gate-local formal qubit); `IdRef`
/// names one element of a register.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arg {
    /// A bare identifier: `q`.
    Id(String),
    /// An indexed identifier: `q[3]`.
    IdRef(String, u32),
}

impl Arg {
    /// Create an indexed argument.
    pub fn idx(name: impl Into<String>, index: u32) -> Self {
        Arg::IdRef(name.into(), index)
    }

    /// Create a bare-identifier argument.
    pub fn id(name: impl Into<String>) -> Self {
        Arg::Id(name.into())
    }

    /// The register (or formal) name this argument refers to.
    pub fn name(&self) -> &str {
        match self {
            Arg::Id(n) | Arg::IdRef(n, _) => n,
        }
    }

    /// True if this argument names a whole register.
    pub fn is_register(&self) -> bool {
        matches!(self, Arg::Id(_))
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Id(n) => write!(f, "{n}"),
            Arg::IdRef(n, i) => write!(f, "{n}[{i}]"),
        }
    }
}

/// A quantum operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Qop {
    /// The built-in single-qubit gate `U(theta, phi, lambda) q;`.
    U {
        /// Rotation angle theta.
        theta: Expr,
        /// Rotation angle phi.
        phi: Expr,
        /// Rotation angle lambda.
        lambda: Expr,
        /// Target qubit.
        target: Arg,
    },
    /// The built-in two-qubit gate `CX control, target;`.
    Cx {
        /// Control qubit.
        control: Arg,
        /// Target qubit.
        target: Arg,
    },
    /// A call to a declared or opaque gate.
    Call {
        /// Gate name.
        name: String,
        /// Classical parameters.
        params: Vec<Expr>,
        /// Quantum arguments.
        qargs: Vec<Arg>,
    },
    /// `measure q -> c;`
    Measure {
        /// Measured qubit.
        qarg: Arg,
        /// Classical destination.
        carg: Arg,
    },
    /// `reset q;`
    Reset {
        /// Target qubit.
        target: Arg,
    },
    /// `barrier q, ...;`
    Barrier {
        /// Quantum arguments.
        qargs: Vec<Arg>,
    },
}

impl Qop {
    /// The quantum arguments of this operation, in positional order.
    pub fn qargs(&self) -> Vec<&Arg> {
        match self {
            Qop::U { target, .. } | Qop::Reset { target } => vec![target],
            Qop::Cx { control, target } => vec![control, target],
            Qop::Call { qargs, .. } | Qop::Barrier { qargs } => qargs.iter().collect(),
            Qop::Measure { qarg, .. } => vec![qarg],
        }
    }

    /// Mutable view of the quantum arguments.
    pub fn qargs_mut(&mut self) -> Vec<&mut Arg> {
        match self {
            Qop::U { target, .. } | Qop::Reset { target } => vec![target],
            Qop::Cx { control, target } => vec![control, target],
            Qop::Call { qargs, .. } | Qop::Barrier { qargs } => qargs.iter_mut().collect(),
            Qop::Measure { qarg, .. } => vec![qarg],
        }
    }

    /// A printable name for this operation kind.
    pub fn name(&self) -> &str {
        match self {
            Qop::U { .. } => "U",
            Qop::Cx { .. } => "CX",
            Qop::Call { name, .. } => name,
            Qop::Measure { .. } => "measure",
            Qop::Reset { .. } => "reset",
            Qop::Barrier { .. } => "barrier",
        }
    }

    /// True if this is a call to the named gate.
    pub fn is_call_to(&self, gate: &str) -> bool {
        matches!(self, Qop::Call { name, .. } if name == gate)
    }
}

impl fmt::Display for Qop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qop::U {
                theta,
                phi,
                lambda,
                target,
            } => write!(f, "U({theta}, {phi}, {lambda}) {target};"),
            Qop::Cx { control, target } => write!(f, "CX {control}, {target};"),
            Qop::Call {
                name,
                params,
                qargs,
            } => {
                write!(f, "{name}")?;
                if !params.is_empty() {
                    write!(f, "(")?;
                    for (i, p) in params.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{p}")?;
                    }
                    write!(f, ")")?;
                }
                write!(f, " ")?;
                for (i, q) in qargs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{q}")?;
                }
                write!(f, ";")
            }
            Qop::Measure { qarg, carg } => write!(f, "measure {qarg} -> {carg};"),
            Qop::Reset { target } => write!(f, "reset {target};"),
            Qop::Barrier { qargs } => {
                write!(f, "barrier ")?;
                for (i, q) in qargs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{q}")?;
                }
                write!(f, ";")
            }
        }
    }
}

/// A classical condition: `if (reg == value)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cond {
    /// The classical register compared.
    pub reg: String,
    /// The value compared against.
    pub value: u64,
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if ({} == {})", self.reg, self.value)
    }
}

/// A top-level statement: a quantum operation with an optional condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// The classical guard, if any.
    pub cond: Option<Cond>,
    /// The guarded operation.
    pub qop: Qop,
}

impl Stmt {
    /// An unconditional statement.
    pub fn bare(qop: Qop) -> Self {
        Stmt { cond: None, qop }
    }

    /// A conditional statement.
    pub fn guarded(cond: Cond, qop: Qop) -> Self {
        Stmt {
            cond: Some(cond),
            qop,
        }
    }

    /// Re-wrap an operation in this statement's condition.
    pub fn rewrap(&self, qop: Qop) -> Stmt {
        Stmt {
            cond: self.cond.clone(),
            qop,
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cond) = &self.cond {
            write!(f, "{cond} ")?;
        }
        write!(f, "{}", self.qop)
    }
}

/// The kind of a register declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegKind {
    /// A quantum register (`qreg`).
    Quantum,
    /// A classical register (`creg`).
    Classical,
}

/// A register declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegDecl {
    /// Register name.
    pub name: String,
    /// Register size.
    pub size: u32,
    /// Quantum or classical.
    pub kind: RegKind,
}

impl fmt::Display for RegDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kw = match self.kind {
            RegKind::Quantum => "qreg",
            RegKind::Classical => "creg",
        };
        write!(f, "{kw} {}[{}];", self.name, self.size)
    }
}

/// A gate declaration (with a body) or an opaque gate signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecl {
    /// Gate name.
    pub name: String,
    /// Formal classical parameters.
    pub params: Vec<String>,
    /// Formal quantum arguments.
    pub qargs: Vec<String>,
    /// Body operations; `None` marks an opaque gate.
    pub body: Option<Vec<Qop>>,
}

impl GateDecl {
    /// True if this gate has no body.
    pub fn is_opaque(&self) -> bool {
        self.body.is_none()
    }
}

impl fmt::Display for GateDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kw = if self.is_opaque() { "opaque" } else { "gate" };
        write!(f, "{kw} {}", self.name)?;
        if !self.params.is_empty() {
            write!(f, "({})", self.params.join(", "))?;
        }
        write!(f, " {}", self.qargs.join(", "))?;
        match &self.body {
            None => write!(f, ";"),
            Some(body) => {
                writeln!(f, " {{")?;
                for op in body {
                    writeln!(f, "  {op}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
