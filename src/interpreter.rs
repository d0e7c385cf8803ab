use crate::ast::{Expression, Statement};
use crate::callable::{natives, Callable, LoxFunction};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::environment::Environment;
use crate::token::{Token, TokenType};
use crate::value::Value;
use std::io::{self, Write};
use std::mem;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub line: usize,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: &Token, message: &str) -> RuntimeError {
        RuntimeError {
            line: token.line,
            message: message.to_string(),
        }
    }
    pub fn undefined_variable(name: &Token) -> RuntimeError {
        RuntimeError::new(name, &format!("Undefined variable '{}'.", name.lexeme))
    }
}

impl From<RuntimeError> for Diagnostic {
    fn from(e: RuntimeError) -> Diagnostic {
        Diagnostic::runtime(e.line, &e.message)
    }
}

/// How control leaves a statement. `Return` unwinds to the nearest function
/// call and is never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: Environment,
    environment: Environment,
    output: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter::with_output(Box::new(io::stdout()))
    }
    pub fn with_output(output: Box<dyn Write>) -> Interpreter {
        let globals = Environment::new();
        for native in natives() {
            globals.define(native.name, Value::Callable(Callable::Native(native)));
        }
        Interpreter {
            environment: globals.clone(),
            globals,
            output,
        }
    }
    pub fn globals(&self) -> &Environment {
        &self.globals
    }
    /// Runs a program. The first runtime error aborts the remaining statements
    /// and is reported to `diagnostics`.
    pub fn interpret(&mut self, statements: &[Statement], diagnostics: &mut Diagnostics) {
        debug!(count = statements.len(), "interpreting statements");
        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => (),
                // A top-level return ends the program quietly.
                Ok(Flow::Return(_)) => return,
                Err(e) => {
                    diagnostics.report(e.into());
                    return;
                }
            }
        }
    }
    pub fn execute(&mut self, stmt: &Statement) -> Result<Flow, RuntimeError> {
        match stmt {
            Statement::Print(e) => {
                let val = self.evaluate(e)?;
                writeln!(self.output, "{}", val).map_err(|e| RuntimeError {
                    line: 0,
                    message: format!("Failed to write output: {}", e),
                })?;
                Ok(Flow::Normal)
            }
            Statement::Expression(e) => {
                self.evaluate(e)?;
                Ok(Flow::Normal)
            }
            Statement::Var { name, initializer } => {
                let val = match initializer {
                    Some(e) => self.evaluate(e)?,
                    None => Value::Nil,
                };
                self.environment.define(&name.lexeme, val);
                Ok(Flow::Normal)
            }
            Statement::Block(stmts) => {
                let environment = self.environment.new_child();
                self.execute_block(stmts, environment)
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Statement::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(x) = self.execute(body)? {
                        return Ok(Flow::Return(x));
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Function(declaration) => {
                let function = LoxFunction::new(declaration.clone(), self.environment.clone());
                self.environment.define(
                    &declaration.name.lexeme,
                    Value::Callable(Callable::Function(function)),
                );
                Ok(Flow::Normal)
            }
            Statement::Return { keyword: _, value } => {
                let val = match value {
                    Some(e) => self.evaluate(e)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(val))
            }
        }
    }
    /// Executes `statements` in `environment`, restoring the current
    /// environment on every exit path.
    pub fn execute_block(
        &mut self,
        statements: &[Statement],
        environment: Environment,
    ) -> Result<Flow, RuntimeError> {
        trace!("entering scope");
        let previous = mem::replace(&mut self.environment, environment);
        let result = self.execute_statements(statements);
        self.environment = previous;
        result
    }
    fn execute_statements(&mut self, statements: &[Statement]) -> Result<Flow, RuntimeError> {
        for stmt in statements {
            if let Flow::Return(x) = self.execute(stmt)? {
                return Ok(Flow::Return(x));
            }
        }
        Ok(Flow::Normal)
    }
    pub fn evaluate(&mut self, expr: &Expression) -> Result<Value, RuntimeError> {
        match expr {
            Expression::Literal(x) => Ok(x.clone()),
            Expression::Grouping(x) => self.evaluate(x),
            Expression::Unary { operator, right } => {
                let rv = self.evaluate(right)?;
                match operator.tokentype {
                    TokenType::Minus => match rv {
                        Value::Number(r) => Ok(Value::Number(-r)),
                        _ => Err(RuntimeError::new(operator, "Operand must be a number.")),
                    },
                    _ => Ok(Value::Boolean(!rv.is_truthy())),
                }
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let lv = self.evaluate(left)?;
                let rv = self.evaluate(right)?;
                binary(operator, lv, rv)
            }
            Expression::Variable(name) => self.environment.get(name),
            Expression::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.environment.assign(name, value.clone())?;
                Ok(value)
            }
            Expression::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuit = match operator.tokentype {
                    TokenType::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            Expression::Call {
                callee,
                paren,
                arguments,
            } => {
                let evaluated_callee = self.evaluate(callee)?;
                let mut evaluated_arguments: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    evaluated_arguments.push(self.evaluate(argument)?);
                }
                match evaluated_callee {
                    Value::Callable(function) => {
                        if function.arity() != evaluated_arguments.len() {
                            Err(RuntimeError::new(
                                paren,
                                &format!(
                                    "Expected {} arguments but got {}.",
                                    function.arity(),
                                    evaluated_arguments.len()
                                ),
                            ))
                        } else {
                            function.call(self, evaluated_arguments)
                        }
                    }
                    _ => Err(RuntimeError::new(
                        paren,
                        "Can only call functions and classes.",
                    )),
                }
            }
        }
    }
}

impl Default for Interpreter {
    fn default() -> Interpreter {
        Interpreter::new()
    }
}

fn binary(operator: &Token, lv: Value, rv: Value) -> Result<Value, RuntimeError> {
    match operator.tokentype {
        TokenType::EqualEqual => return Ok(Value::Boolean(lv.equals(&rv))),
        TokenType::BangEqual => return Ok(Value::Boolean(!lv.equals(&rv))),
        TokenType::Plus => {
            return match (lv, rv) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                (Value::String(l), Value::String(r)) => {
                    let mut joined = l;
                    joined.push_str(r.as_str());
                    Ok(Value::String(joined))
                }
                _ => Err(RuntimeError::new(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            }
        }
        _ => (),
    }
    let (l, r) = match (lv, rv) {
        (Value::Number(l), Value::Number(r)) => (l, r),
        _ => return Err(RuntimeError::new(operator, "Operands must be numbers.")),
    };
    match operator.tokentype {
        TokenType::Minus => Ok(Value::Number(l - r)),
        TokenType::Slash => Ok(Value::Number(l / r)),
        TokenType::Star => Ok(Value::Number(l * r)),
        TokenType::Greater => Ok(Value::Boolean(l > r)),
        TokenType::GreaterEqual => Ok(Value::Boolean(l >= r)),
        TokenType::Less => Ok(Value::Boolean(l < r)),
        _ => Ok(Value::Boolean(l <= r)),
    }
}

#[cfg(test)]
mod interpreter_tests {
    use super::Interpreter;
    use crate::diagnostics::Diagnostics;
    use crate::parser;
    use crate::scanner;
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn run(source: &str) -> (String, Diagnostics, Interpreter) {
        let buffer = SharedBuffer::default();
        let mut interpreter = Interpreter::with_output(Box::new(buffer.clone()));
        let mut diagnostics = Diagnostics::new();
        let tokens = scanner::scan_tokens(source, &mut diagnostics);
        let statements = parser::parse(&tokens, &mut diagnostics);
        assert!(!diagnostics.had_error(), "unexpected static errors");
        interpreter.interpret(&statements, &mut diagnostics);
        let output = String::from_utf8(buffer.0.borrow().clone()).unwrap();
        (output, diagnostics, interpreter)
    }

    fn output(source: &str) -> String {
        let (output, diagnostics, _) = run(source);
        assert!(diagnostics.is_empty(), "unexpected runtime error");
        output
    }

    fn runtime_error(source: &str) -> String {
        let (_, diagnostics, _) = run(source);
        assert!(diagnostics.had_runtime_error());
        diagnostics.iter().next().unwrap().to_string()
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(output("print 1 + 2 * 3;"), "7\n");
        assert_eq!(output("print (1 + 2) * 3;"), "9\n");
        assert_eq!(output("print 10 - 4 - 3;"), "3\n");
        assert_eq!(output("print 7 / 2;"), "3.5\n");
        assert_eq!(output("print -(3);"), "-3\n");
        assert_eq!(output("print 1 < 2 == true;"), "true\n");
    }

    #[test]
    fn plus_operands() {
        assert_eq!(output("print 1 + 2;"), "3\n");
        assert_eq!(output("print \"a\" + \"b\";"), "ab\n");
        assert_eq!(
            runtime_error("print 1 + \"a\";"),
            "[1] Error : Operands must be two numbers or two strings."
        );
    }

    #[test]
    fn operand_type_errors() {
        assert_eq!(
            runtime_error("print -\"x\";"),
            "[1] Error : Operand must be a number."
        );
        assert_eq!(
            runtime_error("print 1 < nil;"),
            "[1] Error : Operands must be numbers."
        );
        assert_eq!(
            runtime_error("\n\nprint \"a\" * 2;"),
            "[3] Error : Operands must be numbers."
        );
    }

    #[test]
    fn equality_and_truthiness() {
        assert_eq!(output("print nil == nil;"), "true\n");
        assert_eq!(output("print nil == false;"), "false\n");
        assert_eq!(output("print 1 == \"1\";"), "false\n");
        assert_eq!(output("print \"a\" != \"b\";"), "true\n");
        assert_eq!(output("print !0;"), "false\n");
        assert_eq!(output("print !nil;"), "true\n");
        assert_eq!(output("if (\"\") print \"yes\";"), "yes\n");
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(output("print false and (1/0);"), "false\n");
        assert_eq!(output("print false and undefined;"), "false\n");
        assert_eq!(output("print true or undefined;"), "true\n");
        assert_eq!(output("print nil or \"fallback\";"), "fallback\n");
        assert_eq!(output("print 1 and 2;"), "2\n");
    }

    #[test]
    fn variables_and_blocks() {
        assert_eq!(output("var a; print a;"), "nil\n");
        assert_eq!(
            output("var x = \"outer\"; { var x = \"inner\"; print x; } print x;"),
            "inner\nouter\n"
        );
        assert_eq!(output("var a = 1; { a = 2; } print a;"), "2\n");
        assert_eq!(output("var a; var b; a = b = 3; print a + b;"), "6\n");
    }

    #[test]
    fn undefined_variables() {
        assert_eq!(
            runtime_error("print missing;"),
            "[1] Error : Undefined variable 'missing'."
        );
        assert_eq!(
            runtime_error("missing = 1;"),
            "[1] Error : Undefined variable 'missing'."
        );
    }

    #[test]
    fn runtime_error_aborts_remaining_statements() {
        let (output, diagnostics, _) = run("print 1; print nope; print 2;");
        assert_eq!(output, "1\n");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn environment_restored_after_error_in_block() {
        let (_, diagnostics, mut interpreter) = run("var a = 1; { var a = 2; a = nope; }");
        assert!(diagnostics.had_runtime_error());
        assert!(interpreter.environment.equals(interpreter.globals()));
        let mut diagnostics = Diagnostics::new();
        let tokens = scanner::scan_tokens("a;", &mut diagnostics);
        let statements = parser::parse(&tokens, &mut diagnostics);
        match &statements[0] {
            crate::ast::Statement::Expression(e) => {
                assert_eq!(interpreter.evaluate(e).unwrap(), Value::Number(1.0))
            }
            _ => panic!("expected an expression statement"),
        }
    }

    #[test]
    fn control_flow() {
        assert_eq!(
            output("if (1 > 2) print \"a\"; else print \"b\";"),
            "b\n"
        );
        assert_eq!(
            output("if (true) if (false) print \"a\"; else print \"b\";"),
            "b\n"
        );
        assert_eq!(
            output("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
        assert_eq!(output("while (false) print \"never\";"), "");
        assert_eq!(
            output("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn for_loop_variable_is_scoped() {
        assert_eq!(
            runtime_error("for (var i = 0; i < 1; i = i + 1) {} print i;"),
            "[1] Error : Undefined variable 'i'."
        );
    }

    #[test]
    fn functions_and_returns() {
        assert_eq!(
            output("fun add(a, b) { return a + b; } print add(1, 2);"),
            "3\n"
        );
        assert_eq!(output("fun f() {} print f();"), "nil\n");
        assert_eq!(output("fun f() { return; } print f();"), "nil\n");
        assert_eq!(output("fun f() {} print f;"), "<fn f>\n");
        assert_eq!(output("print clock;"), "<native fn>\n");
        assert_eq!(
            output(
                "fun first() { var i = 0; while (true) { i = i + 1; if (i == 3) return i; } print \"unreachable\"; }
                 print first();"
            ),
            "3\n"
        );
        assert_eq!(
            output("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
            "55\n"
        );
    }

    #[test]
    fn closures_capture_by_reference() {
        let source = "
            fun makeCounter() {
                var count = 0;
                fun increment() {
                    count = count + 1;
                    return count;
                }
                return increment;
            }
            var counter = makeCounter();
            print counter();
            print counter();
            var other = makeCounter();
            print other();
        ";
        assert_eq!(output(source), "1\n2\n1\n");
    }

    #[test]
    fn closures_see_defining_scope_not_call_site() {
        let source = "
            var a = \"global\";
            fun show() { print a; }
            { var a = \"block\"; show(); }
        ";
        assert_eq!(output(source), "global\n");
    }

    #[test]
    fn call_errors() {
        assert_eq!(
            runtime_error("fun f(a) {} f(1, 2);"),
            "[1] Error : Expected 1 arguments but got 2."
        );
        assert_eq!(
            runtime_error("clock(1);"),
            "[1] Error : Expected 0 arguments but got 1."
        );
        assert_eq!(
            runtime_error("\"text\"();"),
            "[1] Error : Can only call functions and classes."
        );
    }

    #[test]
    fn clock_returns_a_number() {
        assert_eq!(output("print clock() > 0;"), "true\n");
    }
}
