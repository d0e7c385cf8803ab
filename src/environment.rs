use crate::interpreter::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// A handle to one scope frame. Cloning the handle shares the frame, which is
/// how closures keep their defining scope alive.
#[derive(Clone, Debug)]
pub struct Environment {
    frame: Rc<RefCell<Frame>>,
}

#[derive(Debug)]
struct Frame {
    values: BTreeMap<String, Value>,
    enclosing: Option<Environment>,
}

impl Environment {
    /// A global scope with no enclosing frame.
    pub fn new() -> Environment {
        Environment {
            frame: Rc::new(RefCell::new(Frame {
                values: BTreeMap::new(),
                enclosing: None,
            })),
        }
    }
    pub fn new_child(&self) -> Environment {
        Environment {
            frame: Rc::new(RefCell::new(Frame {
                values: BTreeMap::new(),
                enclosing: Some(self.clone()),
            })),
        }
    }
    pub fn define(&self, name: &str, value: Value) {
        self.frame
            .borrow_mut()
            .values
            .insert(name.to_string(), value);
    }
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        let frame = self.frame.borrow();
        if let Some(x) = frame.values.get(&name.lexeme) {
            return Ok(x.clone());
        }
        match &frame.enclosing {
            Some(enclosing) => enclosing.get(name),
            None => Err(RuntimeError::undefined_variable(name)),
        }
    }
    pub fn assign(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        let mut frame = self.frame.borrow_mut();
        if let Some(x) = frame.values.get_mut(&name.lexeme) {
            *x = value;
            return Ok(());
        }
        match &frame.enclosing {
            Some(enclosing) => enclosing.assign(name, value),
            None => Err(RuntimeError::undefined_variable(name)),
        }
    }
    pub fn equals(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.frame, &other.frame)
    }
}

impl Default for Environment {
    fn default() -> Environment {
        Environment::new()
    }
}

#[cfg(test)]
mod environment_tests {
    use super::Environment;
    use crate::token::{Token, TokenType};
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn name(x: &str) -> Token {
        Token::new(TokenType::Identifier, x, None, 1)
    }

    #[test]
    fn define_and_get() {
        let globals = Environment::new();
        globals.define("a", Value::Number(1.0));
        globals.define("a", Value::Number(2.0));
        assert_eq!(globals.get(&name("a")).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn lookups_walk_the_chain() {
        let globals = Environment::new();
        globals.define("a", Value::Number(1.0));
        let inner = globals.new_child().new_child();
        assert_eq!(inner.get(&name("a")).unwrap(), Value::Number(1.0));
        inner.assign(&name("a"), Value::Number(5.0)).unwrap();
        assert_eq!(globals.get(&name("a")).unwrap(), Value::Number(5.0));
    }

    #[test]
    fn shadowing_leaves_outer_frame_alone() {
        let globals = Environment::new();
        globals.define("a", Value::String("outer".to_string()));
        let inner = globals.new_child();
        inner.define("a", Value::String("inner".to_string()));
        inner.assign(&name("a"), Value::Nil).unwrap();
        assert_eq!(inner.get(&name("a")).unwrap(), Value::Nil);
        assert_eq!(
            globals.get(&name("a")).unwrap(),
            Value::String("outer".to_string())
        );
    }

    #[test]
    fn undefined_names_fail() {
        let globals = Environment::new();
        let inner = globals.new_child();
        let err = inner.get(&name("missing")).unwrap_err();
        assert_eq!(err.to_string(), "Undefined variable 'missing'.");
        assert!(inner.assign(&name("missing"), Value::Nil).is_err());
        assert!(globals.get(&name("missing")).is_err());
    }
}
