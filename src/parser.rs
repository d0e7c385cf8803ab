use crate::ast::{Expression, FunctionDeclaration, Statement};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::token::{Literal, Token, TokenType};
use crate::value::Value;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

const MAX_ARGUMENTS: usize = 255;

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ParseError {
    token: Token,
    message: String,
}

impl From<ParseError> for Diagnostic {
    fn from(e: ParseError) -> Diagnostic {
        Diagnostic::parse(&e.token, &e.message)
    }
}

type ParseResult<T> = Result<T, ParseError>;

pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    errors: Vec<Diagnostic>,
}

/// Parses a whole program. Every syntax error is reported to `diagnostics`;
/// statements that failed to parse are left out of the result.
pub fn parse(tokens: &[Token], diagnostics: &mut Diagnostics) -> Vec<Statement> {
    let mut parser = Parser::new(tokens);
    let statements = parser.parse();
    debug!(
        count = statements.len(),
        errors = parser.errors.len(),
        "parsed statements"
    );
    for error in parser.errors.drain(..) {
        diagnostics.report(error);
    }
    statements
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Parser<'a> {
        Parser {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }
    pub fn parse(&mut self) -> Vec<Statement> {
        let mut statements: Vec<Statement> = Vec::new();
        if self.tokens.is_empty() {
            return statements;
        }
        while !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        statements
    }
    /// Statement-level recovery point: a failed declaration is reported and
    /// skipped up to the next likely statement boundary.
    fn declaration(&mut self) -> Option<Statement> {
        let result = match self.peek().tokentype {
            TokenType::Var => {
                self.advance();
                self.var_declaration()
            }
            TokenType::Fun => {
                self.advance();
                self.function()
            }
            _ => self.statement(),
        };
        match result {
            Ok(statement) => Some(statement),
            Err(e) => {
                self.errors.push(e.into());
                self.synchronize();
                None
            }
        }
    }
    fn var_declaration(&mut self) -> ParseResult<Statement> {
        let name = self.consume(TokenType::Identifier, "Expect variable name.")?;
        let initializer = match self.peek().tokentype {
            TokenType::Equal => {
                self.advance();
                Some(self.expression()?)
            }
            _ => None,
        };
        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Statement::Var { name, initializer })
    }
    fn function(&mut self) -> ParseResult<Statement> {
        let name = self.consume(TokenType::Identifier, "Expect function name.")?;
        self.consume(TokenType::LeftParen, "Expect '(' after function name.")?;
        let mut params: Vec<Token> = Vec::new();
        if self.peek().tokentype != TokenType::RightParen {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    let error = self.error_at_current("Can't have more than 255 parameters.");
                    self.errors.push(error.into());
                }
                params.push(self.consume(TokenType::Identifier, "Expect parameter name.")?);
                if !self.next_if(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;
        self.consume(TokenType::LeftBrace, "Expect '{' before function body.")?;
        let body = self.block()?;
        Ok(Statement::Function(Rc::new(FunctionDeclaration {
            name,
            params,
            body,
        })))
    }
    fn statement(&mut self) -> ParseResult<Statement> {
        match self.peek().tokentype {
            TokenType::If => {
                self.advance();
                self.if_statement()
            }
            TokenType::Print => {
                self.advance();
                self.print_statement()
            }
            TokenType::Return => {
                self.advance();
                self.return_statement()
            }
            TokenType::LeftBrace => {
                self.advance();
                Ok(Statement::Block(self.block()?))
            }
            TokenType::While => {
                self.advance();
                self.while_statement()
            }
            TokenType::For => {
                self.advance();
                self.for_statement()
            }
            _ => self.expression_statement(),
        }
    }
    /// `for` has no node of its own: it becomes an optional initializer and a
    /// `while` loop whose body runs the increment after the original body.
    fn for_statement(&mut self) -> ParseResult<Statement> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;
        let initializer: Option<Statement> = match self.peek().tokentype {
            TokenType::Semicolon => {
                self.advance();
                None
            }
            TokenType::Var => {
                self.advance();
                Some(self.var_declaration()?)
            }
            _ => Some(self.expression_statement()?),
        };

        let condition = match self.peek().tokentype {
            TokenType::Semicolon => Expression::Literal(Value::Boolean(true)),
            _ => self.expression()?,
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment: Option<Expression> = match self.peek().tokentype {
            TokenType::RightParen => None,
            _ => Some(self.expression()?),
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(x) = increment {
            body = Statement::Block(vec![body, Statement::Expression(x)])
        }
        body = Statement::While {
            condition,
            body: Box::new(body),
        };
        match initializer {
            None => Ok(body),
            Some(x) => Ok(Statement::Block(vec![x, body])),
        }
    }
    fn while_statement(&mut self) -> ParseResult<Statement> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after condition.")?;
        let body = self.statement()?;
        Ok(Statement::While {
            condition,
            body: Box::new(body),
        })
    }
    fn if_statement(&mut self) -> ParseResult<Statement> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;
        let then_branch = self.statement()?;
        // The else binds to the nearest if.
        let else_branch = match self.peek().tokentype {
            TokenType::Else => {
                self.advance();
                Some(Box::new(self.statement()?))
            }
            _ => None,
        };
        Ok(Statement::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }
    fn block(&mut self) -> ParseResult<Vec<Statement>> {
        let mut statements: Vec<Statement> = Vec::new();
        while !self.is_at_end() && self.peek().tokentype != TokenType::RightBrace {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }
    fn print_statement(&mut self) -> ParseResult<Statement> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Statement::Print(expr))
    }
    fn return_statement(&mut self) -> ParseResult<Statement> {
        let keyword = self.previous().clone();
        let value = match self.peek().tokentype {
            TokenType::Semicolon => None,
            _ => Some(self.expression()?),
        };
        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
        Ok(Statement::Return { keyword, value })
    }
    fn expression_statement(&mut self) -> ParseResult<Statement> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Statement::Expression(expr))
    }
    fn expression(&mut self) -> ParseResult<Expression> {
        self.assignment()
    }
    fn assignment(&mut self) -> ParseResult<Expression> {
        let expr = self.or()?;
        match self.peek().tokentype {
            TokenType::Equal => {
                let equals = self.advance().clone();
                let value = self.assignment()?;
                match expr {
                    Expression::Variable(name) => Ok(Expression::Assign {
                        name,
                        value: Box::new(value),
                    }),
                    _ => Err(ParseError {
                        token: equals,
                        message: "Invalid assignment target.".to_string(),
                    }),
                }
            }
            _ => Ok(expr),
        }
    }
    fn or(&mut self) -> ParseResult<Expression> {
        let mut expr = self.and()?;
        while self.next_if(TokenType::Or) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }
    fn and(&mut self) -> ParseResult<Expression> {
        let mut expr = self.equality()?;
        while self.next_if(TokenType::And) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }
    fn equality(&mut self) -> ParseResult<Expression> {
        let mut expr = self.comparison()?;
        loop {
            match self.peek().tokentype {
                TokenType::BangEqual | TokenType::EqualEqual => {
                    let operator = self.advance().clone();
                    let right = self.comparison()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn comparison(&mut self) -> ParseResult<Expression> {
        let mut expr = self.addition()?;
        loop {
            match self.peek().tokentype {
                TokenType::Greater
                | TokenType::GreaterEqual
                | TokenType::Less
                | TokenType::LessEqual => {
                    let operator = self.advance().clone();
                    let right = self.addition()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn addition(&mut self) -> ParseResult<Expression> {
        let mut expr = self.multiplication()?;
        loop {
            match self.peek().tokentype {
                TokenType::Minus | TokenType::Plus => {
                    let operator = self.advance().clone();
                    let right = self.multiplication()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn multiplication(&mut self) -> ParseResult<Expression> {
        let mut expr = self.unary()?;
        loop {
            match self.peek().tokentype {
                TokenType::Slash | TokenType::Star => {
                    let operator = self.advance().clone();
                    let right = self.unary()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn unary(&mut self) -> ParseResult<Expression> {
        match self.peek().tokentype {
            TokenType::Bang | TokenType::Minus => {
                let operator = self.advance().clone();
                let right = self.unary()?;
                Ok(Expression::Unary {
                    operator,
                    right: Box::new(right),
                })
            }
            _ => self.call(),
        }
    }
    fn call(&mut self) -> ParseResult<Expression> {
        let mut expr = self.primary()?;
        while self.next_if(TokenType::LeftParen) {
            expr = self.finish_call(expr)?;
        }
        Ok(expr)
    }
    fn finish_call(&mut self, callee: Expression) -> ParseResult<Expression> {
        let mut arguments: Vec<Expression> = Vec::new();
        if self.peek().tokentype != TokenType::RightParen {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    let error = self.error_at_current("Can't have more than 255 arguments.");
                    self.errors.push(error.into());
                }
                arguments.push(self.expression()?);
                if !self.next_if(TokenType::Comma) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenType::RightParen, "Expect ')' after arguments.")?;
        Ok(Expression::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }
    fn primary(&mut self) -> ParseResult<Expression> {
        match self.peek().tokentype {
            TokenType::False => {
                self.advance();
                Ok(Expression::Literal(Value::Boolean(false)))
            }
            TokenType::True => {
                self.advance();
                Ok(Expression::Literal(Value::Boolean(true)))
            }
            TokenType::Nil => {
                self.advance();
                Ok(Expression::Literal(Value::Nil))
            }
            TokenType::Number | TokenType::String => {
                let value = match &self.advance().literal {
                    Some(Literal::Number(x)) => Value::Number(*x),
                    Some(Literal::String(x)) => Value::String(x.clone()),
                    None => Value::Nil,
                };
                Ok(Expression::Literal(value))
            }
            TokenType::Identifier => Ok(Expression::Variable(self.advance().clone())),
            TokenType::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
                Ok(Expression::Grouping(Box::new(expr)))
            }
            _ => Err(self.error_at_current("Expect expression.")),
        }
    }
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if let TokenType::Semicolon = self.previous().tokentype {
                return;
            }
            match self.peek().tokentype {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => (),
            }
            self.advance();
        }
    }
    fn consume(&mut self, expected: TokenType, message: &str) -> ParseResult<Token> {
        if self.peek().tokentype == expected {
            Ok(self.advance().clone())
        } else {
            Err(self.error_at_current(message))
        }
    }
    fn next_if(&mut self, expected: TokenType) -> bool {
        if self.peek().tokentype == expected {
            self.advance();
            true
        } else {
            false
        }
    }
    fn advance(&mut self) -> &'a Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }
    fn is_at_end(&self) -> bool {
        self.peek().tokentype == TokenType::EOF
    }
    // The scanner always terminates the stream with EOF, and `advance` never
    // moves past it, so `current` is always in bounds.
    fn peek(&self) -> &'a Token {
        let tokens: &'a [Token] = self.tokens;
        &tokens[self.current.min(tokens.len().saturating_sub(1))]
    }
    fn previous(&self) -> &'a Token {
        let tokens: &'a [Token] = self.tokens;
        &tokens[self.current.saturating_sub(1)]
    }
    fn error_at_current(&self, message: &str) -> ParseError {
        ParseError {
            token: self.peek().clone(),
            message: message.to_string(),
        }
    }
}
