//! Recursive-descent parser for the OpenQASM 2.0 subset.

use alsvid_ir::{Arg, BinOp, Cond, Expr, GateDecl, QModule, Qop, RegKind, Stmt, UnOp};

use crate::error::{ParseError, ParseResult};
use crate::lexer::{SpannedToken, Token, tokenize};
use crate::stdlib;

/// Parse an OpenQASM 2.0 source string into a [`QModule`].
pub fn parse(source: &str) -> ParseResult<QModule> {
    let mut parser = Parser::new(source)?;
    parser.parse_module()
}

/// Parse a source string containing only gate declarations.
///
/// Used for the bundled include files.
pub fn parse_gate_library(source: &str) -> ParseResult<Vec<GateDecl>> {
    let mut parser = Parser::new(source)?;
    let mut m = QModule::new();
    while !parser.is_eof() {
        let gate = parser.parse_gate_decl(&m)?;
        m.add_gate(gate)?;
    }
    Ok(m.gates().to_vec())
}

/// Parser state.
struct Parser<'s> {
    source: &'s str,
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str) -> ParseResult<Self> {
        let mut tokens = Vec::new();
        for result in tokenize(source) {
            match result {
                Ok(t) => tokens.push(t),
                Err((span, message)) => {
                    let line = source[..span.start].matches('\n').count() + 1;
                    return Err(ParseError::LexerError { line, message });
                }
            }
        }
        Ok(Parser {
            source,
            tokens,
            pos: 0,
        })
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Line number of the current token, for diagnostics.
    fn line(&self) -> usize {
        let offset = self
            .tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map_or(self.source.len(), |t| t.span.start);
        self.source[..offset].matches('\n').count() + 1
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<Token> {
        if self.is_eof() {
            return None;
        }
        let token = self.tokens[self.pos].token.clone();
        self.pos += 1;
        Some(token)
    }

    fn expect(&mut self, expected: &Token) -> ParseResult<()> {
        let line = self.line();
        let found = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof(expected.to_string()))?;
        if std::mem::discriminant(&found) != std::mem::discriminant(expected) {
            return Err(ParseError::UnexpectedToken {
                line,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&mut self, expected: &str) -> ParseError {
        let line = self.line();
        match self.advance() {
            Some(found) => ParseError::UnexpectedToken {
                line,
                expected: expected.into(),
                found: found.to_string(),
            },
            None => ParseError::UnexpectedEof(expected.into()),
        }
    }

    fn parse_identifier(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(Token::Identifier(_)) => match self.advance() {
                Some(Token::Identifier(s)) => Ok(s),
                _ => unreachable!(),
            },
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn parse_int(&mut self) -> ParseResult<u64> {
        match self.peek() {
            Some(Token::IntLiteral(_)) => match self.advance() {
                Some(Token::IntLiteral(v)) => Ok(v),
                _ => unreachable!(),
            },
            _ => Err(self.unexpected("integer")),
        }
    }

    // ---- module ---------------------------------------------------------

    fn parse_module(&mut self) -> ParseResult<QModule> {
        self.expect(&Token::OpenQasm)?;
        match self.advance() {
            Some(Token::RealLiteral(v)) if (v - 2.0).abs() < 1e-9 => {}
            Some(other) => return Err(ParseError::InvalidVersion(other.to_string())),
            None => return Err(ParseError::UnexpectedEof("version number".into())),
        }
        self.expect(&Token::Semicolon)?;

        let mut m = QModule::new();

        while !self.is_eof() {
            match self.peek() {
                Some(Token::Include) => self.parse_include(&mut m)?,
                Some(Token::QReg) => self.parse_reg_decl(&mut m, RegKind::Quantum)?,
                Some(Token::CReg) => self.parse_reg_decl(&mut m, RegKind::Classical)?,
                Some(Token::Gate) | Some(Token::Opaque) => {
                    let gate = self.parse_gate_decl(&m)?;
                    m.add_gate(gate)?;
                }
                Some(Token::If) => {
                    let stmt = self.parse_conditional(&m)?;
                    m.push_statement(stmt);
                }
                _ => {
                    let qop = self.parse_qop(&m, None)?;
                    m.push_statement(Stmt::bare(qop));
                }
            }
        }

        Ok(m)
    }

    fn parse_include(&mut self, m: &mut QModule) -> ParseResult<()> {
        self.expect(&Token::Include)?;
        let name = match self.advance() {
            Some(Token::StringLiteral(s)) => s,
            Some(found) => {
                return Err(ParseError::UnexpectedToken {
                    line: self.line(),
                    expected: "string".into(),
                    found: found.to_string(),
                });
            }
            None => return Err(ParseError::UnexpectedEof("string".into())),
        };
        self.expect(&Token::Semicolon)?;

        if !stdlib::is_known_include(&name) {
            return Err(ParseError::UnknownInclude(name));
        }
        for gate in parse_gate_library(stdlib::QELIB1)? {
            if !m.has_gate(&gate.name) {
                m.add_include_gate(gate)?;
            }
        }
        m.add_include(name);
        Ok(())
    }

    fn parse_reg_decl(&mut self, m: &mut QModule, kind: RegKind) -> ParseResult<()> {
        self.advance();
        let name = self.parse_identifier()?;
        self.expect(&Token::LBracket)?;
        let size = self.parse_int()?;
        self.expect(&Token::RBracket)?;
        self.expect(&Token::Semicolon)?;
        m.add_reg(name, size as u32, kind)?;
        Ok(())
    }

    fn parse_gate_decl(&mut self, m: &QModule) -> ParseResult<GateDecl> {
        let opaque = match self.advance() {
            Some(Token::Gate) => false,
            Some(Token::Opaque) => true,
            Some(found) => {
                return Err(ParseError::UnexpectedToken {
                    line: self.line(),
                    expected: "gate or opaque".into(),
                    found: found.to_string(),
                });
            }
            None => return Err(ParseError::UnexpectedEof("gate declaration".into())),
        };

        let name = self.parse_identifier()?;
        if m.has_gate(&name) {
            return Err(ParseError::DuplicateDeclaration(name));
        }

        let mut params = vec![];
        if self.consume(&Token::LParen) {
            if !self.check(&Token::RParen) {
                params.push(self.parse_identifier()?);
                while self.consume(&Token::Comma) {
                    params.push(self.parse_identifier()?);
                }
            }
            self.expect(&Token::RParen)?;
        }

        let mut qargs = vec![self.parse_identifier()?];
        while self.consume(&Token::Comma) {
            qargs.push(self.parse_identifier()?);
        }

        if opaque {
            self.expect(&Token::Semicolon)?;
            return Ok(GateDecl {
                name,
                params,
                qargs,
                body: None,
            });
        }

        self.expect(&Token::LBrace)?;
        let mut body = vec![];
        let ctx = GateContext {
            params: &params,
            qargs: &qargs,
        };
        while !self.check(&Token::RBrace) {
            if self.is_eof() {
                return Err(ParseError::UnexpectedEof("}".into()));
            }
            body.push(self.parse_qop(m, Some(&ctx))?);
        }
        self.expect(&Token::RBrace)?;

        Ok(GateDecl {
            name,
            params,
            qargs,
            body: Some(body),
        })
    }

    fn parse_conditional(&mut self, m: &QModule) -> ParseResult<Stmt> {
        self.expect(&Token::If)?;
        self.expect(&Token::LParen)?;
        let line = self.line();
        let reg = self.parse_identifier()?;
        match m.get_reg(&reg) {
            Some(decl) if decl.kind == RegKind::Classical => {}
            Some(_) => {
                return Err(ParseError::WrongRegisterKind {
                    name: reg,
                    expected: "classical".into(),
                });
            }
            None => return Err(ParseError::UndefinedIdentifier { name: reg, line }),
        }
        self.expect(&Token::EqEq)?;
        let value = self.parse_int()?;
        self.expect(&Token::RParen)?;

        let qop = self.parse_qop(m, None)?;
        Ok(Stmt::guarded(Cond { reg, value }, qop))
    }

    // ---- quantum operations --------------------------------------------

    fn parse_qop(&mut self, m: &QModule, ctx: Option<&GateContext<'_>>) -> ParseResult<Qop> {
        match self.peek() {
            Some(Token::GateU) => {
                self.advance();
                self.expect(&Token::LParen)?;
                let theta = self.parse_expr()?;
                self.expect(&Token::Comma)?;
                let phi = self.parse_expr()?;
                self.expect(&Token::Comma)?;
                let lambda = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                let target = self.parse_quantum_arg(m, ctx)?;
                self.expect(&Token::Semicolon)?;
                Ok(Qop::U {
                    theta,
                    phi,
                    lambda,
                    target,
                })
            }
            Some(Token::GateCX) => {
                self.advance();
                let control = self.parse_quantum_arg(m, ctx)?;
                self.expect(&Token::Comma)?;
                let target = self.parse_quantum_arg(m, ctx)?;
                self.expect(&Token::Semicolon)?;
                Ok(Qop::Cx { control, target })
            }
            Some(Token::Measure) => {
                self.advance();
                let qarg = self.parse_quantum_arg(m, ctx)?;
                self.expect(&Token::Arrow)?;
                let carg = self.parse_classical_arg(m)?;
                self.expect(&Token::Semicolon)?;
                Ok(Qop::Measure { qarg, carg })
            }
            Some(Token::Reset) => {
                self.advance();
                let target = self.parse_quantum_arg(m, ctx)?;
                self.expect(&Token::Semicolon)?;
                Ok(Qop::Reset { target })
            }
            Some(Token::Barrier) => {
                self.advance();
                let mut qargs = vec![self.parse_quantum_arg(m, ctx)?];
                while self.consume(&Token::Comma) {
                    qargs.push(self.parse_quantum_arg(m, ctx)?);
                }
                self.expect(&Token::Semicolon)?;
                Ok(Qop::Barrier { qargs })
            }
            Some(Token::Identifier(_)) => self.parse_call(m, ctx),
            _ => Err(self.unexpected("quantum operation")),
        }
    }

    fn parse_call(&mut self, m: &QModule, ctx: Option<&GateContext<'_>>) -> ParseResult<Qop> {
        let name = self.parse_identifier()?;

        let decl = m
            .get_gate(&name)
            .ok_or_else(|| ParseError::UnknownGate(name.clone()))?;
        let (expected_params, expected_qargs) = (decl.params.len(), decl.qargs.len());

        let mut params = vec![];
        if self.consume(&Token::LParen) {
            if !self.check(&Token::RParen) {
                params.push(self.parse_expr()?);
                while self.consume(&Token::Comma) {
                    params.push(self.parse_expr()?);
                }
            }
            self.expect(&Token::RParen)?;
        }

        let mut qargs = vec![self.parse_quantum_arg(m, ctx)?];
        while self.consume(&Token::Comma) {
            qargs.push(self.parse_quantum_arg(m, ctx)?);
        }
        self.expect(&Token::Semicolon)?;

        if params.len() != expected_params {
            return Err(ParseError::WrongParameterCount {
                gate: name,
                expected: expected_params,
                got: params.len(),
            });
        }
        if qargs.len() != expected_qargs {
            return Err(ParseError::WrongQubitCount {
                gate: name,
                expected: expected_qargs,
                got: qargs.len(),
            });
        }

        Ok(Qop::Call {
            name,
            params,
            qargs,
        })
    }

    /// Parse a quantum argument and check it resolves in scope.
    ///
    /// Inside a gate body only the declared formals are visible and
    /// indexing is not allowed; at top level the argument must name a
    /// quantum register, optionally indexed within bounds.
    fn parse_quantum_arg(
        &mut self,
        m: &QModule,
        ctx: Option<&GateContext<'_>>,
    ) -> ParseResult<Arg> {
        let line = self.line();
        let name = self.parse_identifier()?;

        if let Some(ctx) = ctx {
            if !ctx.qargs.contains(&name) {
                return Err(ParseError::UndefinedIdentifier { name, line });
            }
            return Ok(Arg::Id(name));
        }

        let decl = m
            .get_reg(&name)
            .ok_or_else(|| ParseError::UndefinedIdentifier {
                name: name.clone(),
                line,
            })?;
        if decl.kind != RegKind::Quantum {
            return Err(ParseError::WrongRegisterKind {
                name,
                expected: "quantum".into(),
            });
        }
        let size = decl.size;

        if self.consume(&Token::LBracket) {
            let index = self.parse_int()? as u32;
            self.expect(&Token::RBracket)?;
            if index >= size {
                return Err(ParseError::IndexOutOfBounds {
                    register: name,
                    index,
                    size,
                });
            }
            Ok(Arg::IdRef(name, index))
        } else {
            Ok(Arg::Id(name))
        }
    }

    fn parse_classical_arg(&mut self, m: &QModule) -> ParseResult<Arg> {
        let line = self.line();
        let name = self.parse_identifier()?;
        let decl = m
            .get_reg(&name)
            .ok_or_else(|| ParseError::UndefinedIdentifier {
                name: name.clone(),
                line,
            })?;
        if decl.kind != RegKind::Classical {
            return Err(ParseError::WrongRegisterKind {
                name,
                expected: "classical".into(),
            });
        }
        let size = decl.size;

        if self.consume(&Token::LBracket) {
            let index = self.parse_int()? as u32;
            self.expect(&Token::RBracket)?;
            if index >= size {
                return Err(ParseError::IndexOutOfBounds {
                    register: name,
                    index,
                    size,
                });
            }
            Ok(Arg::IdRef(name, index))
        } else {
            Ok(Arg::Id(name))
        }
    }

    // ---- expressions ----------------------------------------------------

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.consume(&Token::Plus) {
                BinOp::Add
            } else if self.consume(&Token::Minus) {
                BinOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.consume(&Token::Star) {
                BinOp::Mul
            } else if self.consume(&Token::Slash) {
                BinOp::Div
            } else {
                break;
            };
            let rhs = self.parse_unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.consume(&Token::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::unary(UnOp::Neg, operand));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_atom()?;
        if self.consume(&Token::Caret) {
            // Right-associative.
            let exponent = self.parse_unary()?;
            return Ok(Expr::binary(BinOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> ParseResult<Expr> {
        match self.peek() {
            Some(Token::IntLiteral(_)) => match self.advance() {
                Some(Token::IntLiteral(v)) => Ok(Expr::Int(v as i64)),
                _ => unreachable!(),
            },
            Some(Token::RealLiteral(_)) => match self.advance() {
                Some(Token::RealLiteral(v)) => Ok(Expr::Real(v)),
                _ => unreachable!(),
            },
            Some(Token::Pi) => {
                self.advance();
                Ok(Expr::Pi)
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Identifier(_)) => {
                let name = self.parse_identifier()?;
                if let Some(op) = unary_fn(&name) {
                    self.expect(&Token::LParen)?;
                    let operand = self.parse_expr()?;
                    self.expect(&Token::RParen)?;
                    Ok(Expr::unary(op, operand))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}

/// Gate-body scope: the visible formal names.
struct GateContext<'a> {
    #[allow(dead_code)]
    params: &'a [String],
    qargs: &'a [String],
}

fn unary_fn(name: &str) -> Option<UnOp> {
    match name {
        "sin" => Some(UnOp::Sin),
        "cos" => Some(UnOp::Cos),
        "tan" => Some(UnOp::Tan),
        "ln" => Some(UnOp::Ln),
        "sqrt" => Some(UnOp::Sqrt),
        "exp" => Some(UnOp::Exp),
        _ => None,
    }
}
