pub mod ast;
pub mod callable;
pub mod diagnostics;
pub mod environment;
pub mod interpreter;
pub mod parser;
pub mod printer;
pub mod scanner;
pub mod token;
pub mod value;

use crate::diagnostics::Diagnostics;
use crate::interpreter::Interpreter;
use std::io::Write;
use tracing::debug;

/// The Source -> Tokens -> AST -> Result pipeline. One `Lox` keeps its global
/// scope between runs, which is what the interactive prompt relies on.
pub struct Lox {
    interpreter: Interpreter,
}

impl Lox {
    pub fn new() -> Lox {
        Lox {
            interpreter: Interpreter::new(),
        }
    }
    pub fn with_output(output: Box<dyn Write>) -> Lox {
        Lox {
            interpreter: Interpreter::with_output(output),
        }
    }
    /// Runs `source` and returns everything that went wrong. Each stage only
    /// runs if the previous ones reported nothing.
    pub fn run(&mut self, source: &str) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let tokens = scanner::scan_tokens(source, &mut diagnostics);
        if diagnostics.had_error() {
            debug!("lexical errors, not parsing");
            return diagnostics;
        }
        let statements = parser::parse(&tokens, &mut diagnostics);
        if diagnostics.had_error() {
            debug!("parse errors, not interpreting");
            return diagnostics;
        }
        self.interpreter.interpret(&statements, &mut diagnostics);
        diagnostics
    }
}

impl Default for Lox {
    fn default() -> Lox {
        Lox::new()
    }
}
