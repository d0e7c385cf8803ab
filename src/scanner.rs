use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::token::{Literal, Token, TokenType};
use phf::phf_map;
use std::iter::Peekable;
use std::str::CharIndices;
use tracing::debug;

// Note: current becomes self.iter.peek()?.0
struct Scanner<'a> {
    source: &'a str,
    iter: Peekable<CharIndices<'a>>,
    start: usize,
    line: usize,
}

/// Scans the whole source. Lexical errors are reported to `diagnostics` and the
/// offending input is skipped; the result always ends with a single EOF token.
pub fn scan_tokens(source: &str, diagnostics: &mut Diagnostics) -> Vec<Token> {
    let mut scanner = Scanner {
        source,
        iter: source.char_indices().peekable(),
        start: 0,
        line: 1,
    };
    let mut tokens: Vec<Token> = Vec::new();

    while let Some((idx, _)) = scanner.iter.peek() {
        scanner.start = *idx;
        match scanner.scan_token() {
            Ok(Some(token)) => tokens.push(token),
            Ok(None) => (),
            Err(e) => diagnostics.report(e),
        }
    }
    tokens.push(Token::new(TokenType::EOF, "", None, scanner.line));
    debug!(count = tokens.len(), "scanned tokens");
    tokens
}

impl<'a> Scanner<'a> {
    fn scan_token(&mut self) -> Result<Option<Token>, Diagnostic> {
        let c = match self.iter.next() {
            Some((_, c)) => c,
            None => return Ok(None),
        };
        match c {
            '(' => Ok(Some(self.token(TokenType::LeftParen))),
            ')' => Ok(Some(self.token(TokenType::RightParen))),
            '{' => Ok(Some(self.token(TokenType::LeftBrace))),
            '}' => Ok(Some(self.token(TokenType::RightBrace))),
            ',' => Ok(Some(self.token(TokenType::Comma))),
            '.' => Ok(Some(self.token(TokenType::Dot))),
            '-' => Ok(Some(self.token(TokenType::Minus))),
            '+' => Ok(Some(self.token(TokenType::Plus))),
            ';' => Ok(Some(self.token(TokenType::Semicolon))),
            '*' => Ok(Some(self.token(TokenType::Star))),
            '!' => Ok(Some(self.either('=', TokenType::BangEqual, TokenType::Bang))),
            '=' => Ok(Some(self.either('=', TokenType::EqualEqual, TokenType::Equal))),
            '<' => Ok(Some(self.either('=', TokenType::LessEqual, TokenType::Less))),
            '>' => Ok(Some(self.either('=', TokenType::GreaterEqual, TokenType::Greater))),
            '/' => {
                if self.next_if('/') {
                    while let Some((_, c)) = self.iter.peek() {
                        if *c == '\n' {
                            break;
                        }
                        self.iter.next();
                    }
                    Ok(None)
                } else {
                    Ok(Some(self.token(TokenType::Slash)))
                }
            }
            ' ' | '\r' | '\t' => Ok(None),
            '\n' => {
                self.line += 1;
                Ok(None)
            }
            '"' => self.string().map(Some),
            '0'..='9' => Ok(Some(self.number())),
            'a'..='z' | 'A'..='Z' | '_' => Ok(Some(self.identifier())),
            _ => Err(Diagnostic::lexical(self.line, "Unexpected character.")),
        }
    }
    fn current(&mut self) -> usize {
        match self.iter.peek() {
            None => self.source.len(),
            Some((idx, _)) => *idx,
        }
    }
    fn token(&mut self, token_type: TokenType) -> Token {
        self.literal_token(token_type, None)
    }
    fn literal_token(&mut self, token_type: TokenType, literal: Option<Literal>) -> Token {
        let current = self.current();
        Token::new(
            token_type,
            &self.source[self.start..current],
            literal,
            self.line,
        )
    }
    fn either(&mut self, expected: char, matched: TokenType, otherwise: TokenType) -> Token {
        if self.next_if(expected) {
            self.token(matched)
        } else {
            self.token(otherwise)
        }
    }
    fn next_if(&mut self, expected: char) -> bool {
        self.iter.next_if(|(_, c)| *c == expected).is_some()
    }
    fn peek_is_digit(&mut self) -> bool {
        matches!(self.iter.peek(), Some((_, '0'..='9')))
    }
    fn string(&mut self) -> Result<Token, Diagnostic> {
        while let Some((_, c)) = self.iter.peek() {
            match c {
                '"' => break,
                '\n' => {
                    self.line += 1;
                    self.iter.next();
                }
                _ => {
                    self.iter.next();
                }
            }
        }
        if self.iter.next().is_none() {
            return Err(Diagnostic::lexical(self.line, "Unterminated string."));
        }
        let current = self.current();
        let value = self.source[self.start + 1..current - 1].to_string();
        Ok(self.literal_token(TokenType::String, Some(Literal::String(value))))
    }
    fn number(&mut self) -> Token {
        while self.peek_is_digit() {
            self.iter.next();
        }

        if let Some((_, '.')) = self.iter.peek() {
            let mut lookahead = self.iter.clone();
            lookahead.next();
            if let Some((_, '0'..='9')) = lookahead.peek() {
                self.iter.next();
                while self.peek_is_digit() {
                    self.iter.next();
                }
            }
        }

        let current = self.current();
        // Only ASCII digits and at most one interior '.' were consumed.
        let value = self.source[self.start..current].parse().unwrap_or(0.0);
        self.literal_token(TokenType::Number, Some(Literal::Number(value)))
    }
    fn identifier(&mut self) -> Token {
        while let Some((_, c)) = self.iter.peek() {
            match c {
                '0'..='9' | 'a'..='z' | 'A'..='Z' | '_' => {
                    self.iter.next();
                }
                _ => break,
            }
        }
        let current = self.current();
        match KEYWORDS.get(&self.source[self.start..current]) {
            None => self.token(TokenType::Identifier),
            Some(x) => self.token(*x),
        }
    }
}

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and" => TokenType::And,
    "class" => TokenType::Class,
    "else" => TokenType::Else,
    "false" => TokenType::False,
    "for" => TokenType::For,
    "fun" => TokenType::Fun,
    "if" => TokenType::If,
    "nil" => TokenType::Nil,
    "or" => TokenType::Or,
    "print" => TokenType::Print,
    "return" => TokenType::Return,
    "super" => TokenType::Super,
    "this" => TokenType::This,
    "true" => TokenType::True,
    "var" => TokenType::Var,
    "while" => TokenType::While,
};

#[cfg(test)]
mod scanner_tests {
    use crate::diagnostics::Diagnostics;
    use crate::scanner;
    use crate::token::{Literal, Token, TokenType};
    use pretty_assertions::assert_eq;

    fn scan(source: &str) -> (Vec<Token>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = scanner::scan_tokens(source, &mut diagnostics);
        (tokens, diagnostics)
    }

    fn types(tokens: &[Token]) -> Vec<TokenType> {
        tokens.iter().map(|t| t.tokentype).collect()
    }

    #[test]
    fn basic_scanner_test() {
        let (tokens, diagnostics) = scan("x = 2");
        assert!(diagnostics.is_empty());
        assert_eq!(
            types(&tokens),
            vec![
                TokenType::Identifier,
                TokenType::Equal,
                TokenType::Number,
                TokenType::EOF
            ]
        );
        assert_eq!(tokens[0].lexeme, "x");
        assert_eq!(tokens[2].literal, Some(Literal::Number(2.0)));
    }

    #[test]
    fn single_lexemes() {
        let cases = vec![
            ("(", TokenType::LeftParen),
            (")", TokenType::RightParen),
            ("{", TokenType::LeftBrace),
            ("}", TokenType::RightBrace),
            (",", TokenType::Comma),
            (".", TokenType::Dot),
            ("-", TokenType::Minus),
            ("+", TokenType::Plus),
            (";", TokenType::Semicolon),
            ("/", TokenType::Slash),
            ("*", TokenType::Star),
            ("!", TokenType::Bang),
            ("!=", TokenType::BangEqual),
            ("=", TokenType::Equal),
            ("==", TokenType::EqualEqual),
            (">", TokenType::Greater),
            (">=", TokenType::GreaterEqual),
            ("<", TokenType::Less),
            ("<=", TokenType::LessEqual),
            ("name", TokenType::Identifier),
            ("\"str\"", TokenType::String),
            ("42", TokenType::Number),
            ("and", TokenType::And),
            ("class", TokenType::Class),
            ("else", TokenType::Else),
            ("false", TokenType::False),
            ("for", TokenType::For),
            ("fun", TokenType::Fun),
            ("if", TokenType::If),
            ("nil", TokenType::Nil),
            ("or", TokenType::Or),
            ("print", TokenType::Print),
            ("return", TokenType::Return),
            ("super", TokenType::Super),
            ("this", TokenType::This),
            ("true", TokenType::True),
            ("var", TokenType::Var),
            ("while", TokenType::While),
        ];
        for (source, expected) in cases {
            let (tokens, diagnostics) = scan(source);
            assert!(diagnostics.is_empty(), "{}", source);
            assert_eq!(types(&tokens), vec![expected, TokenType::EOF], "{}", source);
            assert_eq!(tokens[0].lexeme, source);
            assert_eq!(tokens[0].line, 1);
            assert_eq!(tokens[1].line, 1);
        }
    }

    #[test]
    fn number_parsing() {
        let (tokens, _) = scan("123");
        assert_eq!(tokens[0].literal, Some(Literal::Number(123.0)));

        let (tokens, _) = scan("123.456");
        assert_eq!(types(&tokens), vec![TokenType::Number, TokenType::EOF]);
        assert_eq!(tokens[0].literal, Some(Literal::Number(123.456)));

        let (tokens, _) = scan(".456");
        assert_eq!(
            types(&tokens),
            vec![TokenType::Dot, TokenType::Number, TokenType::EOF]
        );
        assert_eq!(tokens[1].literal, Some(Literal::Number(456.0)));

        let (tokens, _) = scan("123.");
        assert_eq!(
            types(&tokens),
            vec![TokenType::Number, TokenType::Dot, TokenType::EOF]
        );
        assert_eq!(tokens[0].literal, Some(Literal::Number(123.0)));
        assert_eq!(tokens[0].lexeme, "123");
    }

    #[test]
    fn strings_span_lines() {
        let (tokens, diagnostics) = scan("\"one\ntwo\" x");
        assert!(diagnostics.is_empty());
        assert_eq!(
            tokens[0].literal,
            Some(Literal::String("one\ntwo".to_string()))
        );
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn unterminated_string() {
        let (tokens, diagnostics) = scan("\"abc\n");
        assert_eq!(diagnostics.len(), 1);
        let error = diagnostics.iter().next().unwrap();
        assert_eq!(error.to_string(), "[2] Error : Unterminated string.");
        assert_eq!(types(&tokens), vec![TokenType::EOF]);
        assert_eq!(tokens[0].line, 2);
    }

    #[test]
    fn comments_and_lines() {
        let (tokens, diagnostics) = scan("// nothing here\nprint 1; // trailing\n\n");
        assert!(diagnostics.is_empty());
        assert_eq!(
            types(&tokens),
            vec![
                TokenType::Print,
                TokenType::Number,
                TokenType::Semicolon,
                TokenType::EOF
            ]
        );
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[3].line, 4);
    }

    #[test]
    fn unexpected_characters_are_skipped() {
        let (tokens, diagnostics) = scan("1 @ 2 #");
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.had_error());
        assert_eq!(
            types(&tokens),
            vec![TokenType::Number, TokenType::Number, TokenType::EOF]
        );
    }

    #[test]
    fn identifiers_with_keyword_prefix() {
        let (tokens, _) = scan("orchid _under var1");
        assert_eq!(
            types(&tokens),
            vec![
                TokenType::Identifier,
                TokenType::Identifier,
                TokenType::Identifier,
                TokenType::EOF
            ]
        );
    }
}
