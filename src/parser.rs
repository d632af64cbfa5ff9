// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::errors::Result;
use crate::lexer::*;

use std::rc::Rc;

#[derive(Clone)]
pub struct Parser<'source> {
    source: Source,
    lexer: Lexer<'source>,
    tok: Token,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            tok,
        })
    }

    fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::Symbol | TokenKind::Number | TokenKind::Ident | TokenKind::Eof => {
                self.tok.1.text()
            }
            TokenKind::String => "",
        }
    }

    fn next_token(&mut self) -> Result<()> {
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<()> {
        if self.token_text() == text {
            self.next_token()
        } else {
            Err(self
                .tok
                .1
                .error(&format!("expecting `{text}` {context}")))
        }
    }

    /// Parse a complete expression; trailing input is a parse error.
    pub fn parse(&mut self) -> Result<ExprRef> {
        let expr = self.parse_expr()?;
        if self.tok.0 != TokenKind::Eof {
            return Err(self.tok.1.error("expecting end of expression"));
        }
        Ok(expr)
    }

    fn parse_expr(&mut self) -> Result<ExprRef> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<ExprRef> {
        let mut expr = self.parse_and_expr()?;
        while self.token_text() == "||" {
            let span = self.tok.1.clone();
            self.next_token()?;
            let rhs = self.parse_and_expr()?;
            expr = Rc::new(Expr::BinExpr {
                span,
                op: BinOp::Or,
                lhs: expr,
                rhs,
            });
        }
        Ok(expr)
    }

    fn parse_and_expr(&mut self) -> Result<ExprRef> {
        let mut expr = self.parse_cmp_expr()?;
        while self.token_text() == "&&" {
            let span = self.tok.1.clone();
            self.next_token()?;
            let rhs = self.parse_cmp_expr()?;
            expr = Rc::new(Expr::BinExpr {
                span,
                op: BinOp::And,
                lhs: expr,
                rhs,
            });
        }
        Ok(expr)
    }

    fn parse_cmp_expr(&mut self) -> Result<ExprRef> {
        let expr = self.parse_add_expr()?;
        let op = match self.token_text() {
            "<" => BoolOp::Lt,
            "<=" => BoolOp::Le,
            "==" => BoolOp::Eq,
            "!=" => BoolOp::Ne,
            ">=" => BoolOp::Ge,
            ">" => BoolOp::Gt,
            "=" => {
                return Err(self
                    .tok
                    .1
                    .error("unexpected `=`; use `==` for comparison"))
            }
            _ => return Ok(expr),
        };
        let span = self.tok.1.clone();
        self.next_token()?;
        let rhs = self.parse_add_expr()?;
        Ok(Rc::new(Expr::BoolExpr {
            span,
            op,
            lhs: expr,
            rhs,
        }))
    }

    fn parse_add_expr(&mut self) -> Result<ExprRef> {
        let mut expr = self.parse_mul_expr()?;
        loop {
            let op = match self.token_text() {
                "+" => ArithOp::Add,
                "-" => ArithOp::Sub,
                _ => break,
            };
            let span = self.tok.1.clone();
            self.next_token()?;
            let rhs = self.parse_mul_expr()?;
            expr = Rc::new(Expr::ArithExpr {
                span,
                op,
                lhs: expr,
                rhs,
            });
        }
        Ok(expr)
    }

    fn parse_mul_expr(&mut self) -> Result<ExprRef> {
        let mut expr = self.parse_unary_expr()?;
        loop {
            let op = match self.token_text() {
                "*" => ArithOp::Mul,
                "/" => ArithOp::Div,
                "%" => ArithOp::Mod,
                _ => break,
            };
            let span = self.tok.1.clone();
            self.next_token()?;
            let rhs = self.parse_unary_expr()?;
            expr = Rc::new(Expr::ArithExpr {
                span,
                op,
                lhs: expr,
                rhs,
            });
        }
        Ok(expr)
    }

    fn parse_unary_expr(&mut self) -> Result<ExprRef> {
        match self.token_text() {
            "!" => {
                let span = self.tok.1.clone();
                self.next_token()?;
                let expr = self.parse_unary_expr()?;
                Ok(Rc::new(Expr::Not { span, expr }))
            }
            // Negation is subtraction from zero; ints are the only
            // numeric kind.
            "-" => {
                let span = self.tok.1.clone();
                self.next_token()?;
                let rhs = self.parse_unary_expr()?;
                Ok(Rc::new(Expr::ArithExpr {
                    span: span.clone(),
                    op: ArithOp::Sub,
                    lhs: Rc::new(Expr::Int { span, value: 0 }),
                    rhs,
                }))
            }
            _ => self.parse_postfix_expr(),
        }
    }

    fn parse_postfix_expr(&mut self) -> Result<ExprRef> {
        let mut expr = self.parse_primary_expr()?;
        while self.token_text() == "[" {
            let span = self.tok.1.clone();
            self.next_token()?;
            let index = self.parse_expr()?;
            self.expect("]", "to close index expression")?;
            expr = Rc::new(Expr::Index {
                span,
                array: expr,
                index,
            });
        }
        Ok(expr)
    }

    fn parse_primary_expr(&mut self) -> Result<ExprRef> {
        let span = self.tok.1.clone();
        match &self.tok.0 {
            TokenKind::Number => {
                let value: i64 = span
                    .text()
                    .parse()
                    .map_err(|_| span.error("integer literal out of range"))?;
                self.next_token()?;
                Ok(Rc::new(Expr::Int { span, value }))
            }
            TokenKind::String => {
                let value = unescape(span.text());
                self.next_token()?;
                Ok(Rc::new(Expr::String {
                    span,
                    value: value.into(),
                }))
            }
            TokenKind::Ident => {
                let text = span.text();
                match text {
                    "true" | "false" => {
                        let value = text == "true";
                        self.next_token()?;
                        Ok(Rc::new(Expr::Bool { span, value }))
                    }
                    _ if text.starts_with('$') => {
                        let name: Rc<str> = text.into();
                        self.next_token()?;
                        if self.token_text() == "(" {
                            self.parse_call(span, name)
                        } else {
                            Ok(Rc::new(Expr::Variable { span, name }))
                        }
                    }
                    _ => Err(span.error("unexpected identifier")),
                }
            }
            TokenKind::Symbol if span.text() == "[" => self.parse_array(span),
            TokenKind::Symbol if span.text() == "(" => self.parse_group_or_lambda(span),
            _ => Err(span.error("expecting expression")),
        }
    }

    fn parse_call(&mut self, span: Span, name: Rc<str>) -> Result<ExprRef> {
        // Registry names are stored without the sigil.
        let name: Rc<str> = name.trim_start_matches('$').into();
        self.expect("(", "in call expression")?;
        let mut args = vec![];
        if self.token_text() != ")" {
            loop {
                args.push(self.parse_expr()?);
                if self.token_text() != "," {
                    break;
                }
                self.next_token()?;
            }
        }
        self.expect(")", "to close call arguments")?;
        Ok(Rc::new(Expr::Call { span, name, args }))
    }

    fn parse_array(&mut self, span: Span) -> Result<ExprRef> {
        self.expect("[", "in array literal")?;
        let mut items = vec![];
        if self.token_text() != "]" {
            loop {
                items.push(self.parse_expr()?);
                if self.token_text() != "," {
                    break;
                }
                self.next_token()?;
            }
        }
        self.expect("]", "to close array literal")?;
        Ok(Rc::new(Expr::Array { span, items }))
    }

    // `(` opens either a parenthesized expression or a lambda literal
    // `($x, $y: body)`. Probe for the lambda parameter list and backtrack
    // when the probe fails.
    fn parse_group_or_lambda(&mut self, span: Span) -> Result<ExprRef> {
        let state = self.clone();
        self.expect("(", "in expression")?;

        if let Some(params) = self.try_parse_lambda_params()? {
            let body = self.parse_expr()?;
            self.expect(")", "to close lambda")?;
            return Ok(Rc::new(Expr::Lambda { span, params, body }));
        }

        *self = state;
        self.expect("(", "in expression")?;
        let expr = self.parse_expr()?;
        self.expect(")", "to close expression")?;
        Ok(expr)
    }

    // Returns Some(params) when positioned after the `:` of a lambda header,
    // None when the input is not a lambda header at all.
    fn try_parse_lambda_params(&mut self) -> Result<Option<Vec<Rc<str>>>> {
        let mut params: Vec<Rc<str>> = vec![];
        loop {
            if self.tok.0 != TokenKind::Ident || !self.tok.1.text().starts_with('$') {
                return Ok(None);
            }
            params.push(self.tok.1.text().into());
            self.next_token()?;
            match self.token_text() {
                "," => self.next_token()?,
                ":" => {
                    self.next_token()?;
                    return Ok(Some(params));
                }
                _ => return Ok(None),
            }
        }
    }
}

/// Parse one expression string.
pub fn parse_expression(file: &str, expr: &str) -> Result<ExprRef> {
    let source = Source::from_contents(file.to_string(), expr.to_string())?;
    Parser::new(&source)?.parse()
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut iter = text.chars();
    while let Some(ch) = iter.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match iter.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(c) => out.push(c),
            None => (),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(expr: &str) -> Result<ExprRef> {
        parse_expression("<test>", expr)
    }

    #[test]
    fn precedence() -> Result<()> {
        // `&&` binds tighter than `||`; comparison tighter than `&&`.
        let expr = parse("1 < 2 && false || true")?;
        match expr.as_ref() {
            Expr::BinExpr { op: BinOp::Or, .. } => Ok(()),
            e => panic!("expected top-level ||, got {e:?}"),
        }
    }

    #[test]
    fn call_and_array() -> Result<()> {
        let expr = parse(r#"$assignReviewer(["john", "marie"], 2)"#)?;
        match expr.as_ref() {
            Expr::Call { name, args, .. } => {
                assert_eq!(name.as_ref(), "assignReviewer");
                assert_eq!(args.len(), 2);
                Ok(())
            }
            e => panic!("expected call, got {e:?}"),
        }
    }

    #[test]
    fn lambda_literal() -> Result<()> {
        let expr = parse(r#"($dev: $pullRequestCountBy($dev) < 10)"#)?;
        match expr.as_ref() {
            Expr::Lambda { params, .. } => {
                assert_eq!(params.len(), 1);
                assert_eq!(params[0].as_ref(), "$dev");
                Ok(())
            }
            e => panic!("expected lambda, got {e:?}"),
        }
    }

    #[test]
    fn parenthesized_expression_is_not_a_lambda() -> Result<()> {
        let expr = parse("($size() + 1) * 2")?;
        match expr.as_ref() {
            Expr::ArithExpr {
                op: ArithOp::Mul, ..
            } => Ok(()),
            e => panic!("expected *, got {e:?}"),
        }
    }

    #[test]
    fn subtraction_needs_no_whitespace() -> Result<()> {
        for expr in ["1-2", "1 - 2", "$size()-1"] {
            match parse(expr)?.as_ref() {
                Expr::ArithExpr {
                    op: ArithOp::Sub, ..
                } => (),
                e => panic!("expected subtraction for {expr}, got {e:?}"),
            }
        }
        Ok(())
    }

    #[test]
    fn unary_minus() -> Result<()> {
        // A leading `-` negates its operand.
        match parse("-42")?.as_ref() {
            Expr::ArithExpr {
                op: ArithOp::Sub,
                lhs,
                rhs,
                ..
            } => {
                assert!(matches!(lhs.as_ref(), Expr::Int { value: 0, .. }));
                assert!(matches!(rhs.as_ref(), Expr::Int { value: 42, .. }));
            }
            e => panic!("expected negation, got {e:?}"),
        }
        assert!(parse("-$size()").is_ok());
        Ok(())
    }

    #[test]
    fn trailing_input_is_rejected() {
        assert!(parse("1 + 2 3").is_err());
    }

    #[test]
    fn single_equals_is_rejected() {
        assert!(parse("1 = 2").is_err());
    }

    #[test]
    fn unterminated_call_is_rejected() {
        assert!(parse(r#"$addLabel("small""#).is_err());
    }
}
