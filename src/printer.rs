use crate::ast::{Expression, Statement};

/// Renders syntax trees in a parenthesized prefix form, e.g.
/// `(* (- 123) (group 45.67))`.
pub struct AstPrinter;

impl AstPrinter {
    fn parenthesize(&self, name: &str, parts: Vec<String>) -> String {
        let mut x = String::from("(");
        x.push_str(name);
        for part in parts {
            x.push(' ');
            x.push_str(part.as_str());
        }
        x.push(')');
        x
    }
    pub fn expression(&self, n: &Expression) -> String {
        match n {
            Expression::Binary {
                left,
                operator,
                right,
            }
            | Expression::Logical {
                left,
                operator,
                right,
            } => self.parenthesize(
                &operator.lexeme,
                vec![self.expression(left), self.expression(right)],
            ),
            Expression::Grouping(x) => self.parenthesize("group", vec![self.expression(x)]),
            Expression::Literal(x) => x.to_string(),
            Expression::Unary { operator, right } => {
                self.parenthesize(&operator.lexeme, vec![self.expression(right)])
            }
            Expression::Variable(x) => x.lexeme.clone(),
            Expression::Assign { name, value } => {
                self.parenthesize("=", vec![name.lexeme.clone(), self.expression(value)])
            }
            Expression::Call {
                callee,
                paren: _,
                arguments,
            } => {
                let mut parts = vec![self.expression(callee)];
                parts.extend(arguments.iter().map(|a| self.expression(a)));
                self.parenthesize("call", parts)
            }
        }
    }
    pub fn statement(&self, n: &Statement) -> String {
        match n {
            Statement::Print(e) => self.parenthesize("print", vec![self.expression(e)]),
            Statement::Expression(e) => self.parenthesize(";", vec![self.expression(e)]),
            Statement::Var { name, initializer } => {
                let mut parts = vec![name.lexeme.clone()];
                if let Some(e) = initializer {
                    parts.push(self.expression(e));
                }
                self.parenthesize("var", parts)
            }
            Statement::Block(stmts) => self.parenthesize("block", self.statements(stmts)),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut parts = vec![self.expression(condition), self.statement(then_branch)];
                if let Some(e) = else_branch {
                    parts.push(self.statement(e));
                }
                self.parenthesize("if", parts)
            }
            Statement::While { condition, body } => self.parenthesize(
                "while",
                vec![self.expression(condition), self.statement(body)],
            ),
            Statement::Function(declaration) => {
                let params: Vec<&str> = declaration
                    .params
                    .iter()
                    .map(|p| p.lexeme.as_str())
                    .collect();
                let mut parts = vec![
                    declaration.name.lexeme.clone(),
                    format!("({})", params.join(" ")),
                ];
                parts.extend(self.statements(&declaration.body));
                self.parenthesize("fun", parts)
            }
            Statement::Return { keyword: _, value } => match value {
                Some(e) => self.parenthesize("return", vec![self.expression(e)]),
                None => self.parenthesize("return", Vec::new()),
            },
        }
    }
    fn statements(&self, stmts: &[Statement]) -> Vec<String> {
        stmts.iter().map(|s| self.statement(s)).collect()
    }
}
