use num_enum::IntoPrimitive;
use std::slice::Iter;
use strum_macros::Display;
use thiserror::Error;
use tracing::debug;

use crate::token::{Token, TokenType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DiagnosticKind {
    Lexical,
    Parse,
    Runtime,
}

/// A single user-visible error, rendered as `[line] Error <location>: <message>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{line}] Error {location}: {message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub line: usize,
    pub location: String,
    pub message: String,
}

impl Diagnostic {
    pub fn lexical(line: usize, message: &str) -> Diagnostic {
        Diagnostic {
            kind: DiagnosticKind::Lexical,
            line,
            location: String::new(),
            message: message.to_string(),
        }
    }
    pub fn parse(token: &Token, message: &str) -> Diagnostic {
        let location = match token.tokentype {
            TokenType::EOF => "at end".to_string(),
            _ => format!("at '{}'", token.lexeme),
        };
        Diagnostic {
            kind: DiagnosticKind::Parse,
            line: token.line,
            location,
            message: message.to_string(),
        }
    }
    pub fn runtime(line: usize, message: &str) -> Diagnostic {
        Diagnostic {
            kind: DiagnosticKind::Runtime,
            line,
            location: String::new(),
            message: message.to_string(),
        }
    }
}

/// Process exit status expected by the command-line shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(i32)]
pub enum ExitCode {
    Ok = 0,
    Usage = 64,
    DataError = 65,
    NoInput = 66,
    Software = 70,
}

/// Collects the diagnostics raised by each pipeline stage of a single run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics {
            entries: Vec::new(),
        }
    }
    pub fn report(&mut self, diagnostic: Diagnostic) {
        debug!(kind = %diagnostic.kind, line = diagnostic.line, "{}", diagnostic.message);
        self.entries.push(diagnostic);
    }
    /// True if a lexical or parse diagnostic was reported.
    pub fn had_error(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.kind != DiagnosticKind::Runtime)
    }
    pub fn had_runtime_error(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.kind == DiagnosticKind::Runtime)
    }
    pub fn exit_code(&self) -> ExitCode {
        if self.had_error() {
            ExitCode::DataError
        } else if self.had_runtime_error() {
            ExitCode::Software
        } else {
            ExitCode::Ok
        }
    }
    pub fn iter(&self) -> Iter<'_, Diagnostic> {
        self.entries.iter()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
