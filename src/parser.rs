use crate::bytecode::layout::DATA_CAPACITY;
use crate::lang::{Instr, Operand, TEMP_PREFIX};
use crate::lexer::{Span, Spanned};
use crate::parser_error::ParserError;
use crate::token::Token;

/// Binary operators of the expression grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
}

impl BinaryOp {
    fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        }
    }

    /// Binding power. `+` and `-` share one level, which together with the
    /// strict `>` test in `parse_expr` makes chains left-associative.
    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
        }
    }
}

/// Precedence-climbing parser that lowers statements straight into IR.
///
/// The parser consumes the lexer's `Spanned` tokens and appends [`Instr`]s
/// in program order. Every expression primary is materialized in a fresh
/// temporary (`__temp__N`); operators combine temporaries into new ones.
///
/// Notes:
/// - One token of lookahead (`peek_next`) decides whether a statement that
///   starts with an identifier is a label, an assignment or an array store.
/// - There is no error recovery: the first mismatch aborts parsing.
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    temp_count: usize,
    ir: Vec<Instr>,
}

impl Parser {
    /// Creates a parser from lexer output. A missing trailing `Eof` is added.
    pub fn new(mut tokens: Vec<Spanned>) -> Self {
        if tokens.last().map(|t| t.token != Token::Eof).unwrap_or(true) {
            let span = tokens
                .last()
                .map(|t| Span {
                    line: t.span.line,
                    col: t.span.col + t.lexeme.chars().count(),
                })
                .unwrap_or(Span { line: 1, col: 1 });
            tokens.push(Spanned {
                token: Token::Eof,
                lexeme: String::new(),
                span,
            });
        }

        Parser {
            tokens,
            pos: 0,
            temp_count: 0,
            ir: Vec::new(),
        }
    }

    fn current(&self) -> &Spanned {
        // `new` guarantees a trailing Eof and `advance` never moves past it.
        &self.tokens[self.pos]
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn peek_next(&self) -> &Token {
        let next = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[next].token
    }

    fn advance(&mut self) -> Spanned {
        let spanned = self.current().clone();
        if spanned.token != Token::Eof {
            self.pos += 1;
        }
        spanned
    }

    /// Builds an error located at the current token.
    fn error(&self, message: impl Into<String>) -> ParserError {
        let span = self.current().span;
        ParserError {
            message: message.into(),
            line: span.line,
            col: span.col,
        }
    }

    fn found(&self) -> String {
        match self.peek() {
            Token::Eof => "end of input".to_string(),
            token => format!("{} '{}'", token.kind(), token),
        }
    }

    fn expect(&mut self, expected: Token, context: &str) -> Result<Spanned, ParserError> {
        if *self.peek() == expected {
            Ok(self.advance())
        } else {
            Err(self.error(format!(
                "expected '{}' {}, found {}",
                expected,
                context,
                self.found()
            )))
        }
    }

    fn expect_ident(&mut self, context: &str) -> Result<String, ParserError> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(format!(
                "expected identifier {}, found {}",
                context,
                self.found()
            ))),
        }
    }

    /// Converts a numeric literal to a machine byte.
    fn byte(&self, value: u32) -> Result<u8, ParserError> {
        u8::try_from(value).map_err(|_| {
            self.error(format!(
                "integer literal {} does not fit in 8 bits (0..=255)",
                value
            ))
        })
    }

    fn temp(&mut self) -> String {
        let name = format!("{}{}", TEMP_PREFIX, self.temp_count);
        self.temp_count += 1;
        name
    }

    fn emit(&mut self, instr: Instr) {
        self.ir.push(instr);
    }

    /// The IR emitted so far.
    pub fn ir(&self) -> &[Instr] {
        &self.ir
    }

    pub fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    /// Parses statements until `Eof` and returns the complete IR.
    pub fn parse(&mut self) -> Result<Vec<Instr>, ParserError> {
        while !self.is_at_end() {
            self.parse_statement()?;
        }
        Ok(std::mem::take(&mut self.ir))
    }

    /// Parses exactly one statement, appending its IR.
    pub fn parse_statement(&mut self) -> Result<(), ParserError> {
        match self.peek() {
            Token::Let => self.parse_let(),
            Token::Out => self.parse_out(),
            Token::In => self.parse_in(),
            Token::If => self.parse_if_leq(),
            Token::Goto => self.parse_goto(),
            Token::Halt => self.parse_halt(),
            Token::Ident(_) => match self.peek_next() {
                Token::Colon => self.parse_label(),
                Token::Assign => self.parse_assignment(),
                Token::LBracket => self.parse_array_assignment(),
                _ => {
                    self.advance();
                    Err(self.error(format!(
                        "expected ':', '=' or '[' after identifier, found {}",
                        self.found()
                    )))
                }
            },
            _ => Err(self.error(format!(
                "expected a statement, found {}",
                self.found()
            ))),
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// `let name = expr;` or `let name[N];`
    fn parse_let(&mut self) -> Result<(), ParserError> {
        self.advance(); // consume 'let'
        let name = self.expect_ident("after 'let'")?;

        if matches!(self.peek(), Token::LBracket) {
            self.advance(); // consume '['
            let len = match *self.peek() {
                Token::Number(n) => n,
                _ => {
                    return Err(self.error(format!(
                        "expected array length, found {}",
                        self.found()
                    )));
                }
            };
            let len = u16::try_from(len)
                .ok()
                .filter(|len| *len > 0 && *len as usize <= DATA_CAPACITY)
                .ok_or_else(|| {
                    self.error(format!(
                        "array length {} must be in 1..={}",
                        len, DATA_CAPACITY
                    ))
                })?;
            self.advance();
            self.expect(Token::RBracket, "after array length")?;
            self.expect(Token::Semicolon, "after array declaration")?;
            self.emit(Instr::ArrayDecl { name, len });
            return Ok(());
        }

        self.expect(Token::Assign, "after variable name")?;
        let value = self.parse_expr(0)?;
        self.expect(Token::Semicolon, "after expression")?;
        self.emit(Instr::Store {
            src: Operand::Variable(value),
            dst: name,
        });
        Ok(())
    }

    /// `name = expr;`
    fn parse_assignment(&mut self) -> Result<(), ParserError> {
        let name = self.expect_ident("as assignment target")?;
        self.expect(Token::Assign, "after assignment target")?;
        let value = self.parse_expr(0)?;
        self.expect(Token::Semicolon, "after expression")?;
        self.emit(Instr::Store {
            src: Operand::Variable(value),
            dst: name,
        });
        Ok(())
    }

    /// `name[index] = expr;`
    fn parse_array_assignment(&mut self) -> Result<(), ParserError> {
        let array = self.expect_ident("as array name")?;
        self.advance(); // consume '['
        let index = self.parse_index()?;
        self.expect(Token::Assign, "after array element")?;
        let value = self.parse_expr(0)?;
        self.expect(Token::Semicolon, "after expression")?;
        self.emit(Instr::StoreIndexed {
            array,
            index,
            src: Operand::Variable(value),
        });
        Ok(())
    }

    /// `name:`
    fn parse_label(&mut self) -> Result<(), ParserError> {
        let name = self.expect_ident("as label")?;
        self.expect(Token::Colon, "after label")?;
        self.emit(Instr::Label { name });
        Ok(())
    }

    /// `out 5;`, `out x;` or `out arr[i];`
    fn parse_out(&mut self) -> Result<(), ParserError> {
        self.advance(); // consume 'out'

        let src = match self.peek().clone() {
            Token::Number(n) => {
                let value = self.byte(n)?;
                self.advance();
                Operand::Literal(value)
            }
            Token::Ident(name) if matches!(self.peek_next(), Token::LBracket) => {
                self.advance(); // array name
                self.advance(); // '['
                let index = self.parse_index()?;
                let dst = self.temp();
                self.emit(Instr::LoadIndexed {
                    array: name,
                    index,
                    dst: dst.clone(),
                });
                Operand::Variable(dst)
            }
            Token::Ident(name) => {
                self.advance();
                Operand::Variable(name)
            }
            _ => {
                return Err(self.error(format!(
                    "expected number or identifier after 'out', found {}",
                    self.found()
                )));
            }
        };

        self.expect(Token::Semicolon, "after 'out' operand")?;
        self.emit(Instr::Out { src });
        Ok(())
    }

    /// `in name;`
    fn parse_in(&mut self) -> Result<(), ParserError> {
        self.advance(); // consume 'in'
        let dst = self.expect_ident("after 'in'")?;
        self.expect(Token::Semicolon, "after 'in' target")?;
        self.emit(Instr::In { dst });
        Ok(())
    }

    /// `if a <= b goto label;`
    fn parse_if_leq(&mut self) -> Result<(), ParserError> {
        self.advance(); // consume 'if'
        let lhs = self.parse_atom("after 'if'")?;
        self.expect(Token::LtEq, "in condition")?;
        let rhs = self.parse_atom("after '<='")?;
        self.expect(Token::Goto, "after condition")?;
        let target = self.expect_ident("as jump target")?;
        self.expect(Token::Semicolon, "after jump target")?;
        self.emit(Instr::IfLeq { lhs, rhs, target });
        Ok(())
    }

    /// `goto label;`
    fn parse_goto(&mut self) -> Result<(), ParserError> {
        self.advance(); // consume 'goto'
        let target = self.expect_ident("after 'goto'")?;
        self.expect(Token::Semicolon, "after jump target")?;
        self.emit(Instr::Goto { target });
        Ok(())
    }

    /// `halt;`
    fn parse_halt(&mut self) -> Result<(), ParserError> {
        self.advance(); // consume 'halt'
        self.expect(Token::Semicolon, "after 'halt'")?;
        self.emit(Instr::Halt);
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// A bare identifier or number, used directly without a temporary.
    fn parse_atom(&mut self, context: &str) -> Result<Operand, ParserError> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(Operand::Variable(name))
            }
            Token::Number(n) => {
                let value = self.byte(n)?;
                self.advance();
                Ok(Operand::Literal(value))
            }
            _ => Err(self.error(format!(
                "expected identifier or number {}, found {}",
                context,
                self.found()
            ))),
        }
    }

    /// Parses an index after `[` has been consumed, including the closing `]`.
    ///
    /// A bare number stays a literal so the compiler can bounds-check it
    /// statically; anything else is evaluated into a temporary.
    fn parse_index(&mut self) -> Result<Operand, ParserError> {
        let index = match (self.peek().clone(), self.peek_next()) {
            (Token::Number(n), Token::RBracket) => {
                let value = self.byte(n)?;
                self.advance();
                Operand::Literal(value)
            }
            _ => Operand::Variable(self.parse_expr(0)?),
        };
        self.expect(Token::RBracket, "after array index")?;
        Ok(index)
    }

    /// Parses one primary and returns the temporary (or inner result) holding it.
    fn parse_prefix_expr(&mut self) -> Result<String, ParserError> {
        match self.peek().clone() {
            Token::Number(n) => {
                let value = self.byte(n)?;
                self.advance();
                let dst = self.temp();
                self.emit(Instr::LoadConst {
                    value,
                    dst: dst.clone(),
                });
                Ok(dst)
            }
            Token::Ident(array) if matches!(self.peek_next(), Token::LBracket) => {
                self.advance(); // array name
                self.advance(); // '['
                let index = self.parse_index()?;
                let dst = self.temp();
                self.emit(Instr::LoadIndexed {
                    array,
                    index,
                    dst: dst.clone(),
                });
                Ok(dst)
            }
            Token::Ident(src) => {
                self.advance();
                let dst = self.temp();
                self.emit(Instr::LoadVar {
                    src,
                    dst: dst.clone(),
                });
                Ok(dst)
            }
            Token::LParen => {
                self.advance(); // consume '('
                let inner = self.parse_expr(0)?;
                self.expect(Token::RParen, "to close '('")?;
                Ok(inner)
            }
            _ => Err(self.error(format!(
                "expected number, identifier or '(' in expression, found {}",
                self.found()
            ))),
        }
    }

    /// Precedence climbing: consumes operators binding tighter than `min_prec`.
    fn parse_expr(&mut self, min_prec: u8) -> Result<String, ParserError> {
        let mut left = self.parse_prefix_expr()?;

        while let Some(op) = BinaryOp::from_token(self.peek()) {
            let prec = op.precedence();
            if prec <= min_prec {
                break;
            }
            self.advance(); // consume operator

            let right = self.parse_expr(prec)?;
            let dst = self.temp();
            let (lhs, rhs) = (Operand::Variable(left), Operand::Variable(right));
            self.emit(match op {
                BinaryOp::Add => Instr::Add {
                    lhs,
                    rhs,
                    dst: dst.clone(),
                },
                BinaryOp::Sub => Instr::Sub {
                    lhs,
                    rhs,
                    dst: dst.clone(),
                },
            });
            left = dst;
        }

        Ok(left)
    }
}
