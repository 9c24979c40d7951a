//! Recursive descent parser for block scripts.
//!
//! Accepts the statement subset the block generators emit: variable
//! declarations, assignments, counted `for` loops and `api.<op>(...)` calls.

use super::ast::*;
use super::lexer::{SpannedToken, Token, tokenize};
use crate::error::ScriptError;

/// Name of the only object scripts can reach
const HOST_OBJECT: &str = "api";

/// Deepest statement/expression tree a script may build
pub const MAX_NESTING: usize = 128;

pub fn parse(source: &str) -> Result<Program, ScriptError> {
    let tokens = tokenize(source)?;
    Parser::new(&tokens, source.len()).program()
}

struct Parser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
    end: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [SpannedToken], end: usize) -> Self {
        Parser {
            tokens,
            pos: 0,
            end,
            depth: 0,
        }
    }

    /// One level deeper into the tree; callers restore `depth` on the way out
    fn descend(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error(format!("program nests deeper than {} levels", MAX_NESTING)));
        }
        Ok(())
    }

    #[inline]
    fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).map(|t| &t.value)
    }

    #[inline]
    fn peek(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.value)
    }

    #[inline]
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.start)
            .unwrap_or(self.end)
    }

    #[inline]
    fn check(&self, token: &Token) -> bool {
        self.current() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), ScriptError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        let message = message.into();
        match self.current() {
            Some(_) => ScriptError::parse(self.offset(), message),
            None => ScriptError::parse(self.end, format!("{} before end of program", message)),
        }
    }

    fn ident(&mut self) -> Result<String, ScriptError> {
        match self.current() {
            Some(Token::Ident(name)) => {
                self.pos += 1;
                Ok(name.clone())
            }
            _ => Err(self.error("expected a name")),
        }
    }

    fn program(mut self) -> Result<Program, ScriptError> {
        let mut body = Vec::new();
        while self.current().is_some() {
            body.push(self.statement()?);
        }
        Ok(Program { body })
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        match self.current() {
            Some(Token::Semi) => {
                self.pos += 1;
                Ok(Stmt::Empty)
            }
            Some(Token::LBrace) => Ok(Stmt::Block(self.block()?)),
            Some(Token::For) => self.for_loop(),
            Some(Token::Var) => {
                let decl = self.var_decl()?;
                self.eat(&Token::Semi);
                Ok(decl)
            }
            _ => {
                let stmt = self.simple()?;
                self.eat(&Token::Semi);
                Ok(stmt)
            }
        }
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.expect(&Token::LBrace, "'{'")?;
        self.descend()?;
        let mut body = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.current().is_none() {
                return Err(self.error("expected '}'"));
            }
            body.push(self.statement()?);
        }
        self.pos += 1;
        self.depth -= 1;
        Ok(body)
    }

    fn var_decl(&mut self) -> Result<Stmt, ScriptError> {
        self.expect(&Token::Var, "'var'")?;
        let mut decls = Vec::new();
        loop {
            let name = self.ident()?;
            let init = if self.eat(&Token::Assign) {
                Some(self.expr()?)
            } else {
                None
            };
            decls.push((name, init));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(Stmt::Var(decls))
    }

    fn for_loop(&mut self) -> Result<Stmt, ScriptError> {
        self.expect(&Token::For, "'for'")?;
        self.expect(&Token::LParen, "'(' after 'for'")?;
        self.descend()?;

        let init = match self.current() {
            Some(Token::Semi) => None,
            Some(Token::Var) => Some(Box::new(self.var_decl()?)),
            _ => Some(Box::new(self.simple()?)),
        };
        self.expect(&Token::Semi, "';' in loop header")?;

        let cond = if self.check(&Token::Semi) {
            None
        } else {
            Some(self.expr()?)
        };
        self.expect(&Token::Semi, "';' in loop header")?;

        let update = if self.check(&Token::RParen) {
            None
        } else {
            Some(Box::new(self.simple()?))
        };
        self.expect(&Token::RParen, "')' after loop header")?;

        let body = if self.check(&Token::LBrace) {
            self.block()?
        } else {
            vec![self.statement()?]
        };

        self.depth -= 1;
        Ok(Stmt::For {
            init,
            cond,
            update,
            body,
        })
    }

    /// Assignment, increment, or bare expression
    fn simple(&mut self) -> Result<Stmt, ScriptError> {
        if let (Some(Token::PlusPlus | Token::MinusMinus), Some(Token::Ident(name))) =
            (self.current(), self.peek(1))
        {
            let delta = if self.check(&Token::PlusPlus) { 1.0 } else { -1.0 };
            self.pos += 2;
            return Ok(Stmt::Step {
                name: name.clone(),
                delta,
            });
        }

        if let Some(Token::Ident(name)) = self.current() {
            let assign = match self.peek(1) {
                Some(Token::Assign) => Some(AssignOp::Set),
                Some(Token::PlusAssign) => Some(AssignOp::Add),
                Some(Token::MinusAssign) => Some(AssignOp::Sub),
                Some(Token::PlusPlus) => {
                    self.pos += 2;
                    return Ok(Stmt::Step {
                        name: name.clone(),
                        delta: 1.0,
                    });
                }
                Some(Token::MinusMinus) => {
                    self.pos += 2;
                    return Ok(Stmt::Step {
                        name: name.clone(),
                        delta: -1.0,
                    });
                }
                _ => None,
            };
            if let Some(op) = assign {
                self.pos += 2;
                let value = self.expr()?;
                return Ok(Stmt::Assign {
                    name: name.clone(),
                    op,
                    value,
                });
            }
        }

        Ok(Stmt::Expr(self.expr()?))
    }

    fn expr(&mut self) -> Result<Expr, ScriptError> {
        self.equality()
    }

    fn equality(&mut self) -> Result<Expr, ScriptError> {
        let depth = self.depth;
        let mut lhs = self.comparison()?;
        loop {
            let op = match self.current() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                _ => {
                    self.depth = depth;
                    return Ok(lhs);
                }
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.comparison()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn comparison(&mut self) -> Result<Expr, ScriptError> {
        let depth = self.depth;
        let mut lhs = self.additive()?;
        loop {
            let op = match self.current() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::LtEq) => BinaryOp::LtEq,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::GtEq) => BinaryOp::GtEq,
                _ => {
                    self.depth = depth;
                    return Ok(lhs);
                }
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.additive()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        let depth = self.depth;
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.current() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => {
                    self.depth = depth;
                    return Ok(lhs);
                }
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ScriptError> {
        let depth = self.depth;
        let mut lhs = self.unary()?;
        loop {
            let op = match self.current() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => {
                    self.depth = depth;
                    return Ok(lhs);
                }
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        let op = match self.current() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.primary(),
        };
        self.pos += 1;
        self.descend()?;
        let expr = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let pos = self.offset();
        let expr = match self.current() {
            Some(Token::Number(n)) => Expr::Number(*n),
            Some(Token::Str(s)) => Expr::Str(s.clone()),
            Some(Token::True) => Expr::Bool(true),
            Some(Token::False) => Expr::Bool(false),
            Some(Token::Undefined) => Expr::Undefined,
            Some(Token::Null) => Expr::Null,
            Some(Token::LParen) => {
                self.pos += 1;
                self.descend()?;
                let inner = self.expr()?;
                self.expect(&Token::RParen, "')'")?;
                self.depth -= 1;
                return Ok(inner);
            }
            Some(Token::Ident(name)) => {
                if self.peek(1) == Some(&Token::Dot) {
                    return self.host_call();
                }
                if self.peek(1) == Some(&Token::LParen) {
                    return Err(ScriptError::UnknownOperation(name.clone()));
                }
                Expr::Ident {
                    name: name.clone(),
                    pos,
                }
            }
            _ => return Err(self.error("expected a value")),
        };
        self.pos += 1;
        Ok(expr)
    }

    fn host_call(&mut self) -> Result<Expr, ScriptError> {
        let pos = self.offset();
        let object = self.ident()?;
        self.expect(&Token::Dot, "'.'")?;
        let member = self.ident()?;

        let op = match HostOp::from_name(&member) {
            Some(op) if object == HOST_OBJECT => op,
            _ => return Err(ScriptError::UnknownOperation(format!("{}.{}", object, member))),
        };

        self.expect(&Token::LParen, "'(' after operation name")?;
        self.descend()?;
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.expr()?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(&Token::Comma, "',' or ')' in arguments")?;
            }
        }

        self.depth -= 1;
        Ok(Expr::Call(HostCall { op, args, pos }))
    }
}

#[inline]
fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(op: HostOp, args: Vec<Expr>, pos: usize) -> Stmt {
        Stmt::Expr(Expr::Call(HostCall { op, args, pos }))
    }

    #[test]
    fn test_parse_generated_program() {
        let program = parse("api.createBall(30);\napi.setBallPosition(10, 50);\napi.dropBall();\n")
            .unwrap();
        assert_eq!(
            program.body,
            vec![
                call(HostOp::CreateBall, vec![Expr::Number(30.0)], 0),
                call(
                    HostOp::SetBallPosition,
                    vec![Expr::Number(10.0), Expr::Number(50.0)],
                    20
                ),
                call(HostOp::DropBall, vec![], 49),
            ]
        );
    }

    #[test]
    fn test_parse_repeat_block() {
        let program = parse(
            "var count;\nfor (var count = 0; count < 3; count++) {\n  api.print('hi');\n}\n",
        )
        .unwrap();
        assert_eq!(program.body.len(), 2);
        let Stmt::For {
            init,
            cond,
            update,
            body,
        } = &program.body[1]
        else {
            panic!("expected a for loop");
        };
        assert!(matches!(init.as_deref(), Some(Stmt::Var(_))));
        assert!(matches!(
            cond,
            Some(Expr::Binary {
                op: BinaryOp::Lt,
                ..
            })
        ));
        assert_eq!(
            update.as_deref(),
            Some(&Stmt::Step {
                name: "count".into(),
                delta: 1.0
            })
        );
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_precedence() {
        let program = parse("api.print('a' + 1 * 2);").unwrap();
        let Stmt::Expr(Expr::Call(call)) = &program.body[0] else {
            panic!("expected a call");
        };
        assert_eq!(
            call.args[0],
            binary(
                BinaryOp::Add,
                Expr::Str("a".into()),
                binary(BinaryOp::Mul, Expr::Number(1.0), Expr::Number(2.0))
            )
        );
    }

    #[test]
    fn test_long_operator_chain_is_rejected() {
        let source = format!("api.print({}1);", "1+".repeat(200_000));
        let err = parse(&source).unwrap_err();
        assert!(
            matches!(&err, ScriptError::Parse { message, .. } if message.contains("nests deeper")),
            "{err:?}"
        );
    }

    #[test]
    fn test_deep_parentheses_are_rejected() {
        let source = format!("api.print({}1);", "(".repeat(100_000));
        assert!(matches!(parse(&source), Err(ScriptError::Parse { .. })));

        let source = format!("{}api.dropBall();", "for (;;) ".repeat(10_000));
        assert!(matches!(parse(&source), Err(ScriptError::Parse { .. })));
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let chain = format!("api.print({}1);", "1+".repeat(MAX_NESTING - 10));
        assert!(parse(&chain).is_ok());

        let parens = format!(
            "api.print({}1{});",
            "(".repeat(MAX_NESTING / 2),
            ")".repeat(MAX_NESTING / 2)
        );
        assert!(parse(&parens).is_ok());
    }

    #[test]
    fn test_rejects_calls_outside_host() {
        assert_eq!(
            parse("window.alert('x');").unwrap_err(),
            ScriptError::UnknownOperation("window.alert".into())
        );
        assert_eq!(
            parse("api.launchRocket();").unwrap_err(),
            ScriptError::UnknownOperation("api.launchRocket".into())
        );
        assert_eq!(
            parse("eval('1');").unwrap_err(),
            ScriptError::UnknownOperation("eval".into())
        );
    }

    #[test]
    fn test_unterminated_call() {
        let err = parse("api.createBall(20").unwrap_err();
        assert!(matches!(err, ScriptError::Parse { pos: 17, .. }));
    }

    #[test]
    fn test_empty_and_comment_only() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("// nothing here\n;;").unwrap().is_empty());
    }
}
