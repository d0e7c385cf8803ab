use crate::ast::FunctionDeclaration;
use crate::environment::Environment;
use crate::interpreter::{Flow, Interpreter, RuntimeError};
use crate::value::Value;
use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

/// Anything that can appear on the left of a call expression.
#[derive(Clone, Debug)]
pub enum Callable {
    Function(LoxFunction),
    Native(NativeFunction),
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(f) => f.arity(),
            Callable::Native(f) => f.arity,
        }
    }
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        match self {
            Callable::Function(f) => f.call(interpreter, arguments),
            Callable::Native(f) => {
                trace!(name = f.name, "calling native function");
                Ok((f.call)(&arguments))
            }
        }
    }
    pub fn equals(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b)) => a.equals(b),
            (Callable::Native(a), Callable::Native(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(x) => write!(f, "{}", x),
            Callable::Native(x) => write!(f, "{}", x),
        }
    }
}

/// A user-defined function together with the environment it was declared in.
#[derive(Clone)]
pub struct LoxFunction {
    declaration: Rc<FunctionDeclaration>,
    closure: Environment,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDeclaration>, closure: Environment) -> LoxFunction {
        LoxFunction {
            declaration,
            closure,
        }
    }
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        trace!(name = %self.declaration.name.lexeme, "calling function");
        let environment = self.closure.new_child();
        for (param, value) in self.declaration.params.iter().zip(arguments.into_iter()) {
            environment.define(&param.lexeme, value);
        }
        match interpreter.execute_block(&self.declaration.body, environment)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }
    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }
    pub fn equals(&self, other: &LoxFunction) -> bool {
        Rc::ptr_eq(&self.declaration, &other.declaration) && self.closure.equals(&other.closure)
    }
}

// The closure may (indirectly) contain this function, so it is never printed.
impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoxFunction({})", self.name())
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub call: fn(&[Value]) -> Value,
    pub arity: usize,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

fn clock(_arguments: &[Value]) -> Value {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    Value::Number(seconds)
}

/// Built-ins installed in the global scope of every interpreter.
pub fn natives() -> Vec<NativeFunction> {
    vec![NativeFunction {
        name: "clock",
        call: clock,
        arity: 0,
    }]
}
