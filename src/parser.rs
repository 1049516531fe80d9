// ABOUTME: Hand-written recursive-descent parser turning a token stream into the AST

use crate::ast::*;
use crate::builtins::BUILTIN_NAMES;
use crate::error::ParseError;
use crate::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let tok = self.peek();
        ParseError {
            line: tok.line,
            column: tok.column,
            message: message.into(),
        }
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> PResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!(
                "expected {:?} {}, found {:?}",
                kind,
                context,
                self.peek_kind()
            )))
        }
    }

    fn expect_ident(&mut self, context: &str) -> PResult<String> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected identifier {}, found {:?}", context, other))),
        }
    }

    pub fn parse_program(&mut self) -> PResult<Block> {
        let mut stmts = Vec::new();
        while !self.at_eof() {
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_block(&mut self) -> PResult<Block> {
        self.expect(TokenKind::LBrace, "to start block")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            stmts.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace, "to close block")?;
        Ok(stmts)
    }

    fn parse_params(&mut self) -> PResult<Vec<String>> {
        self.expect(TokenKind::LParen, "before parameter list")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.expect_ident("in parameter list")?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "after parameter list")?;
        Ok(params)
    }

    fn parse_statement(&mut self) -> PResult<Stmt> {
        match self.peek_kind().clone() {
            TokenKind::Let => self.parse_let(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Async | TokenKind::Func => self.parse_function_decl(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semicolon, "after break")?;
                Ok(Stmt::Break)
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Semicolon, "after continue")?;
                Ok(Stmt::Continue)
            }
            TokenKind::Print => self.parse_print(),
            TokenKind::Channel => self.parse_channel_decl(),
            TokenKind::Send => self.parse_send(),
            TokenKind::Receive => self.parse_receive(),
            TokenKind::Macro => self.parse_macro_decl(),
            TokenKind::Extern => self.parse_extern_decl(),
            TokenKind::Match => self.parse_match(),
            TokenKind::Alloc => self.parse_alloc(),
            TokenKind::Free => self.parse_free(),
            TokenKind::At => self.parse_annotated(),
            _ => self.parse_expr_or_assign_statement(),
        }
    }

    fn parse_let(&mut self) -> PResult<Stmt> {
        self.advance();
        let mutable = self.matches(&TokenKind::Mut);
        let name = self.expect_ident("after let")?;
        self.expect(TokenKind::Eq, "in let binding")?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::Semicolon, "after let binding")?;
        Ok(Stmt::Let {
            name,
            mutable,
            value,
        })
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        self.advance();
        let condition = self.parse_expression()?;
        let then_block = self.parse_block()?;
        let else_block = if self.matches(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_block,
            else_block,
        })
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        self.advance();
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { condition, body })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        self.advance();
        let var = self.expect_ident("after for")?;
        self.expect(TokenKind::In, "in for loop")?;
        let iterable = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::For {
            var,
            iterable,
            body,
        })
    }

    fn parse_function_decl(&mut self) -> PResult<Stmt> {
        let is_async = self.matches(&TokenKind::Async);
        self.expect(TokenKind::Func, "to start function declaration")?;
        let name = self.expect_ident("after function")?;
        let generics = self.parse_optional_generics()?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(Stmt::FunctionDecl {
            name,
            is_async,
            generics,
            params,
            body,
        })
    }

    /// Optional `<T1, T2>` generic parameter list. Recorded on the
    /// declaration, discarded at compile/runtime — Flow has no type checker.
    fn parse_optional_generics(&mut self) -> PResult<Vec<String>> {
        if !self.matches(&TokenKind::Less) {
            return Ok(Vec::new());
        }
        let mut generics = Vec::new();
        if !self.check(&TokenKind::Greater) {
            loop {
                generics.push(self.expect_ident("in generic parameter list")?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::Greater, "to close generic parameter list")?;
        Ok(generics)
    }

    fn parse_return(&mut self) -> PResult<Stmt> {
        self.advance();
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon, "after return")?;
        Ok(Stmt::Return(value))
    }

    fn parse_print(&mut self) -> PResult<Stmt> {
        self.advance();
        let mut args = vec![self.parse_expression()?];
        while self.matches(&TokenKind::Comma) {
            args.push(self.parse_expression()?);
        }
        self.expect(TokenKind::Semicolon, "after print")?;
        Ok(Stmt::Print(args))
    }

    fn parse_channel_decl(&mut self) -> PResult<Stmt> {
        self.advance();
        let name = self.expect_ident("after channel")?;
        self.expect(TokenKind::Semicolon, "after channel declaration")?;
        Ok(Stmt::ChannelDecl { name })
    }

    fn parse_send(&mut self) -> PResult<Stmt> {
        self.advance();
        let channel = self.expect_ident("after send")?;
        self.expect(TokenKind::Comma, "between channel and value in send")?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::Semicolon, "after send")?;
        Ok(Stmt::Send { channel, value })
    }

    fn parse_receive(&mut self) -> PResult<Stmt> {
        self.advance();
        let channel = self.expect_ident("after receive")?;
        self.expect(TokenKind::FatArrow, "between channel and target in receive")?;
        let target = self.expect_ident("as receive target")?;
        self.expect(TokenKind::Semicolon, "after receive")?;
        Ok(Stmt::Receive { channel, target })
    }

    fn parse_macro_decl(&mut self) -> PResult<Stmt> {
        self.advance();
        let name = self.expect_ident("after macro")?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(Stmt::Macro { name, params, body })
    }

    fn parse_extern_decl(&mut self) -> PResult<Stmt> {
        self.advance();
        let name = self.expect_ident("after extern")?;
        let lib_path = match self.peek_kind().clone() {
            TokenKind::Str(s) => {
                self.advance();
                Some(s)
            }
            _ => None,
        };
        let params = self.parse_params()?;
        let return_type = if self.matches(&TokenKind::Colon) {
            Some(self.expect_ident("as extern return type")?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "after extern declaration")?;
        Ok(Stmt::Extern {
            name,
            params,
            return_type,
            lib_path,
        })
    }

    fn parse_alloc(&mut self) -> PResult<Stmt> {
        self.advance();
        let name = self.expect_ident("after alloc")?;
        self.expect(TokenKind::Comma, "between name and size in alloc")?;
        let size = self.parse_expression()?;
        self.expect(TokenKind::Semicolon, "after alloc")?;
        Ok(Stmt::Alloc { name, size })
    }

    fn parse_free(&mut self) -> PResult<Stmt> {
        self.advance();
        let name = self.expect_ident("after free")?;
        self.expect(TokenKind::Semicolon, "after free")?;
        Ok(Stmt::Free { name })
    }

    fn parse_annotated(&mut self) -> PResult<Stmt> {
        self.advance();
        let name = self.expect_ident("after '@'")?;
        let inner = self.parse_statement()?;
        Ok(Stmt::Annotated {
            name,
            inner: Box::new(inner),
        })
    }

    /// Handles plain assignment, index-assignment, and expression statements
    /// with a single pass: parse a full expression, then check for `=`
    /// rather than doing fixed-depth lookahead.
    fn parse_expr_or_assign_statement(&mut self) -> PResult<Stmt> {
        let expr = self.parse_expression()?;
        if self.matches(&TokenKind::Eq) {
            let value = self.parse_expression()?;
            self.expect(TokenKind::Semicolon, "after assignment")?;
            match expr {
                Expr::Ident(name) => Ok(Stmt::Assign { name, value }),
                Expr::Index { target, index } => Ok(Stmt::IndexAssign {
                    target: *target,
                    index: *index,
                    value,
                }),
                _ => Err(self.error("invalid assignment target")),
            }
        } else {
            self.expect(TokenKind::Semicolon, "after expression statement")?;
            Ok(Stmt::ExprStmt(expr))
        }
    }

    // ----- expression grammar -----

    pub fn parse_expression(&mut self) -> PResult<Expr> {
        self.parse_pipeline()
    }

    fn parse_pipeline(&mut self) -> PResult<Expr> {
        let mut left = self.parse_logical_or()?;
        while self.matches(&TokenKind::Pipeline) {
            let right = self.parse_logical_or()?;
            left = Expr::Pipeline {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_logical_or(&mut self) -> PResult<Expr> {
        let mut left = self.parse_logical_and()?;
        while self.matches(&TokenKind::Or) {
            let right = self.parse_logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> PResult<Expr> {
        let mut left = self.parse_bitwise()?;
        while self.matches(&TokenKind::And) {
            let right = self.parse_bitwise()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_bitwise(&mut self) -> PResult<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Amp => BinOp::BitAnd,
                TokenKind::Pipe => BinOp::BitOr,
                TokenKind::Caret => BinOp::BitXor,
                TokenKind::Shl => BinOp::Shl,
                TokenKind::Shr => BinOp::Shr,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => CompareOp::Eq,
                TokenKind::NotEq => CompareOp::Ne,
                TokenKind::Less => CompareOp::Lt,
                TokenKind::LessEq => CompareOp::Le,
                TokenKind::Greater => CompareOp::Gt,
                TokenKind::GreaterEq => CompareOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> PResult<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// `unary := '-' unary | 'not' unary | '~' unary | power`
    fn parse_unary(&mut self) -> PResult<Expr> {
        match self.peek_kind() {
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Not | TokenKind::Bang => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Tilde => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::BitNot,
                    operand: Box::new(operand),
                })
            }
            _ => self.parse_power(),
        }
    }

    /// `power := postfix ('**' unary)?`, right-associative, binds tighter
    /// than unary minus (`-2 ** 2 == -4`).
    fn parse_power(&mut self) -> PResult<Expr> {
        let base = self.parse_postfix()?;
        if self.matches(&TokenKind::StarStar) {
            let exponent = self.parse_unary()?;
            Ok(Expr::Binary {
                op: BinOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            })
        } else {
            Ok(base)
        }
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "to close index expression")?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> PResult<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "after call arguments")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        match self.peek_kind().clone() {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr::Int(n))
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(Expr::Float(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(Expr::Nil)
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.check(&TokenKind::LParen) && BUILTIN_NAMES.contains(&name.as_str()) {
                    self.advance();
                    let args = self.parse_call_args()?;
                    Ok(Expr::BuiltinCall { name, args })
                } else if self.matches(&TokenKind::Walrus) {
                    let value = self.parse_expression()?;
                    Ok(Expr::Walrus {
                        name,
                        value: Box::new(value),
                    })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let first = self.parse_expression()?;
                if self.matches(&TokenKind::Comma) {
                    let mut items = vec![first];
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            items.push(self.parse_expression()?);
                            if !self.matches(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen, "to close tuple literal")?;
                    Ok(Expr::TupleLiteral(items))
                } else {
                    self.expect(TokenKind::RParen, "to close grouped expression")?;
                    Ok(first)
                }
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if !self.check(&TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_expression()?);
                        if !self.matches(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBracket, "to close list literal")?;
                Ok(Expr::ListLiteral(items))
            }
            TokenKind::Lambda => {
                self.advance();
                let params = self.parse_params()?;
                self.expect(TokenKind::FatArrow, "after lambda parameter list")?;
                let body = self.parse_expression()?;
                Ok(Expr::Lambda {
                    params,
                    body: Box::new(body),
                })
            }
            TokenKind::Map => {
                self.advance();
                self.expect(TokenKind::LParen, "after map")?;
                let func = self.parse_expression()?;
                self.expect(TokenKind::Comma, "between map arguments")?;
                let iterable = self.parse_expression()?;
                self.expect(TokenKind::RParen, "after map arguments")?;
                Ok(Expr::MapCall {
                    func: Box::new(func),
                    iterable: Box::new(iterable),
                })
            }
            TokenKind::Filter => {
                self.advance();
                self.expect(TokenKind::LParen, "after filter")?;
                let func = self.parse_expression()?;
                self.expect(TokenKind::Comma, "between filter arguments")?;
                let iterable = self.parse_expression()?;
                self.expect(TokenKind::RParen, "after filter arguments")?;
                Ok(Expr::FilterCall {
                    func: Box::new(func),
                    iterable: Box::new(iterable),
                })
            }
            TokenKind::Reduce => {
                self.advance();
                self.expect(TokenKind::LParen, "after reduce")?;
                let func = self.parse_expression()?;
                self.expect(TokenKind::Comma, "between reduce arguments")?;
                let iterable = self.parse_expression()?;
                self.expect(TokenKind::Comma, "between reduce arguments")?;
                let initial = self.parse_expression()?;
                self.expect(TokenKind::RParen, "after reduce arguments")?;
                Ok(Expr::ReduceCall {
                    func: Box::new(func),
                    iterable: Box::new(iterable),
                    initial: Box::new(initial),
                })
            }
            TokenKind::Spawn => {
                self.advance();
                let expr = self.parse_expression()?;
                Ok(Expr::Spawn(Box::new(expr)))
            }
            TokenKind::Await => {
                self.advance();
                let expr = self.parse_expression()?;
                Ok(Expr::Await(Box::new(expr)))
            }
            other => Err(self.error(format!("unexpected token {:?} in expression", other))),
        }
    }

    /// `match <expr> { ( 'case' pattern ':' stmt* )* ( 'default' ':' stmt* )? }`
    /// A statement, not an expression: each arm runs until the next `case`,
    /// `default`, or the closing brace.
    fn parse_match(&mut self) -> PResult<Stmt> {
        self.advance();
        let subject = self.parse_expression()?;
        self.expect(TokenKind::LBrace, "to start match arms")?;
        let mut arms = Vec::new();
        let mut default = None;
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            if self.matches(&TokenKind::Case) {
                let pattern = self.parse_match_pattern()?;
                self.expect(TokenKind::Colon, "after case pattern")?;
                let body = self.parse_case_body()?;
                arms.push(MatchArm { pattern, body });
            } else if self.matches(&TokenKind::Default) {
                self.expect(TokenKind::Colon, "after default")?;
                default = Some(self.parse_case_body()?);
            } else {
                return Err(self.error(format!(
                    "expected 'case' or 'default' in match arms, found {:?}",
                    self.peek_kind()
                )));
            }
        }
        self.expect(TokenKind::RBrace, "to close match arms")?;
        Ok(Stmt::Match {
            subject,
            arms,
            default,
        })
    }

    /// Statements belonging to a `case`/`default` arm, stopping at the next
    /// `case`, `default`, or the closing brace of the match.
    fn parse_case_body(&mut self) -> PResult<Block> {
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::Case)
            && !self.check(&TokenKind::Default)
            && !self.check(&TokenKind::RBrace)
            && !self.at_eof()
        {
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_match_pattern(&mut self) -> PResult<MatchPattern> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) if name == "_" => {
                self.advance();
                Ok(MatchPattern::Wildcard)
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.matches(&TokenKind::LParen) {
                    let mut fields = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            fields.push(self.parse_match_pattern()?);
                            if !self.matches(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen, "to close constructor pattern")?;
                    Ok(MatchPattern::Constructor { tag: name, fields })
                } else {
                    Ok(MatchPattern::Variable(name))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let mut items = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        items.push(self.parse_match_pattern()?);
                        if !self.matches(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "to close tuple pattern")?;
                Ok(MatchPattern::Tuple(items))
            }
            TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::Str(_)
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Nil => {
                let expr = self.parse_primary()?;
                Ok(MatchPattern::Literal(expr))
            }
            other => Err(self.error(format!("unexpected token {:?} in match pattern", other))),
        }
    }
}

pub fn parse(tokens: Vec<Token>) -> PResult<Block> {
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_source(source: &str) -> Block {
        parse(tokenize(source).unwrap()).unwrap()
    }

    #[test]
    fn parses_let_and_print() {
        let block = parse_source("let x = 1 + 2; print x;");
        assert_eq!(block.len(), 2);
        assert!(matches!(block[0], Stmt::Let { .. }));
        assert!(matches!(block[1], Stmt::Print(_)));
    }

    #[test]
    fn power_binds_tighter_than_unary_minus() {
        let block = parse_source("let x = -2 ** 2;");
        if let Stmt::Let { value, .. } = &block[0] {
            assert!(matches!(value, Expr::Unary { op: UnaryOp::Neg, .. }));
        } else {
            panic!("expected let");
        }
    }

    #[test]
    fn if_else_if_chains() {
        let block = parse_source("if a { print 1; } else if b { print 2; } else { print 3; }");
        assert_eq!(block.len(), 1);
    }

    #[test]
    fn builtin_call_is_dispatched_at_parse_time() {
        let block = parse_source("let x = sqrt(4);");
        if let Stmt::Let { value, .. } = &block[0] {
            assert!(matches!(value, Expr::BuiltinCall { .. }));
        } else {
            panic!("expected let");
        }
    }

    #[test]
    fn regular_call_is_not_a_builtin_call() {
        let block = parse_source("function f() { return 1; } let x = f();");
        if let Stmt::Let { value, .. } = &block[1] {
            assert!(matches!(value, Expr::Call { .. }));
        } else {
            panic!("expected let");
        }
    }

    #[test]
    fn index_assignment_parses() {
        let block = parse_source("xs[0] = 5;");
        assert!(matches!(block[0], Stmt::IndexAssign { .. }));
    }

    #[test]
    fn match_with_constructor_pattern() {
        let block = parse_source(
            "match x { case Some(v) : print v; default : print 0; }",
        );
        assert_eq!(block.len(), 1);
        if let Stmt::Match { arms, default, .. } = &block[0] {
            assert_eq!(arms.len(), 1);
            assert!(matches!(
                arms[0].pattern,
                MatchPattern::Constructor { .. }
            ));
            assert!(default.is_some());
        } else {
            panic!("expected match statement");
        }
    }
}
