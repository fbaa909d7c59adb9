//! Tree-walking evaluator for compiled fields
//!
//! A field runs its statements for their side effects on the host's
//! environment, then evaluates the trailing expression; that value, not yet
//! stringified, is the field's result.

use crate::environment::Environment;
use crate::error::FormatError;
use crate::interpreter::builtins::{self, FunctionTable};
use crate::interpreter::methods;
use crate::interpreter::value::Value;
use crate::parser::ast::{
    Argument, BinaryOp, Expr, Literal, LogicalOp, Program, Stmt, Target,
};

/// What the evaluator needs from the formatter that runs it
pub trait Host {
    fn environment(&self) -> &Environment;

    fn environment_mut(&mut self) -> &mut Environment;

    fn functions(&self) -> &FunctionTable;

    /// Format `template` with the current bindings plus `vars`
    fn format_nested(
        &mut self,
        template: String,
        vars: Vec<(String, Value)>,
    ) -> Result<String, FormatError>;
}

/// How a statement finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
    Continue,
}

/// Assignable location, with its object and index already evaluated
enum Place {
    Name(String),
    Item { object: Value, index: Value },
}

pub struct Evaluator<'a, H: Host + ?Sized> {
    host: &'a mut H,
    /// Field code, reported by unbound-name errors
    code: &'a str,
}

impl<'a, H: Host + ?Sized> Evaluator<'a, H> {
    pub fn new(host: &'a mut H, code: &'a str) -> Self {
        Self { host, code }
    }

    /// Run the statements, then evaluate the result expression
    pub fn run(&mut self, program: &Program) -> Result<Value, FormatError> {
        match self.exec_block(program.statements())? {
            Flow::Normal => self.eval(program.result()),
            Flow::Break => Err(FormatError::evaluation("'break' outside loop")),
            Flow::Continue => Err(FormatError::evaluation("'continue' not properly in loop")),
        }
    }

    fn exec_block(&mut self, statements: &[Stmt]) -> Result<Flow, FormatError> {
        for statement in statements {
            let flow = self.exec(statement)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, statement: &Stmt) -> Result<Flow, FormatError> {
        match statement {
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
            Stmt::Assign { target, value } => {
                let value = self.eval(value)?;
                let place = self.place(target)?;
                self.store(place, value)?;
            }
            Stmt::AugAssign { target, op, value } => {
                let place = self.place(target)?;
                let current = self.load(&place)?;
                let rhs = self.eval(value)?;
                let updated = match (&current, op) {
                    // `+=` extends a list in place, so aliases see the change
                    (Value::List(items), BinaryOp::Add) => {
                        let extra = rhs.iterate()?;
                        items.borrow_mut().extend(extra);
                        current.clone()
                    }
                    _ => current.binary(*op, &rhs)?,
                };
                self.store(place, updated)?;
            }
            Stmt::If {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches {
                    if self.eval(condition)?.is_truthy() {
                        return self.exec_block(body);
                    }
                }
                if let Some(body) = otherwise {
                    return self.exec_block(body);
                }
            }
            Stmt::For {
                targets,
                iterable,
                body,
            } => {
                for item in self.eval(iterable)?.iterate()? {
                    self.bind(targets, item)?;
                    if self.exec_block(body)? == Flow::Break {
                        break;
                    }
                }
            }
            Stmt::While { condition, body } => {
                while self.eval(condition)?.is_truthy() {
                    if self.exec_block(body)? == Flow::Break {
                        break;
                    }
                }
            }
            Stmt::Pass => {}
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
        }
        Ok(Flow::Normal)
    }

    fn place(&mut self, target: &Target) -> Result<Place, FormatError> {
        Ok(match target {
            Target::Name(name) => Place::Name(name.clone()),
            Target::Index { object, index } => Place::Item {
                object: self.eval(object)?,
                index: self.eval(index)?,
            },
        })
    }

    fn load(&self, place: &Place) -> Result<Value, FormatError> {
        match place {
            Place::Name(name) => self.lookup(name),
            Place::Item { object, index } => builtins::index(object, index),
        }
    }

    fn store(&mut self, place: Place, value: Value) -> Result<(), FormatError> {
        match place {
            Place::Name(name) => {
                self.host.environment_mut().set(name, value);
                Ok(())
            }
            Place::Item {
                object: Value::List(items),
                index,
            } => {
                let mut items = items.borrow_mut();
                let i = index
                    .as_int()
                    .and_then(|i| methods::normalize_index(i, items.len()))
                    .ok_or_else(|| {
                        FormatError::evaluation("list assignment index out of range")
                    })?;
                items[i] = value;
                Ok(())
            }
            Place::Item {
                object: Value::Dict(entries),
                index,
            } => match index {
                Value::Str(key) => {
                    entries.borrow_mut().insert(key, value);
                    Ok(())
                }
                other => Err(FormatError::evaluation(format!(
                    "dict keys must be str, not {}",
                    other.type_name()
                ))),
            },
            Place::Item { object, .. } => Err(FormatError::evaluation(format!(
                "'{}' object does not support item assignment",
                object.type_name()
            ))),
        }
    }

    /// Bind loop targets, unpacking when there is more than one
    fn bind(&mut self, targets: &[String], item: Value) -> Result<(), FormatError> {
        if let [single] = targets {
            self.host.environment_mut().set(single.clone(), item);
            return Ok(());
        }
        let values = item.iterate()?;
        if values.len() != targets.len() {
            return Err(FormatError::evaluation(format!(
                "cannot unpack: expected {} values, got {}",
                targets.len(),
                values.len()
            )));
        }
        let env = self.host.environment_mut();
        for (name, value) in targets.iter().zip(values) {
            env.set(name.clone(), value);
        }
        Ok(())
    }

    /// Environment first, then the function table
    fn lookup(&self, name: &str) -> Result<Value, FormatError> {
        if let Some(value) = self.host.environment().get(name) {
            return Ok(value.clone());
        }
        if let Some(function) = self.host.functions().get(name) {
            return Ok(Value::Function(function.clone()));
        }
        Err(FormatError::UnboundName {
            name: name.to_string(),
            bound: self.host.environment().names(),
            code: self.code.to_string(),
        })
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, FormatError> {
        match expr {
            Expr::Name(name) => self.lookup(name),
            Expr::Literal(literal) => Ok(match literal {
                Literal::None => Value::None,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(i) => Value::Int(*i),
                Literal::Float(f) => Value::Float(*f),
                Literal::Str(s) => Value::Str(s.clone()),
            }),
            Expr::List(items) => Ok(Value::list(self.eval_all(items)?)),
            Expr::Tuple(items) => Ok(Value::tuple(self.eval_all(items)?)),
            Expr::Dict(pairs) => {
                let mut entries = std::collections::BTreeMap::new();
                for (key, value) in pairs {
                    let key = match self.eval(key)? {
                        Value::Str(key) => key,
                        other => {
                            return Err(FormatError::evaluation(format!(
                                "dict keys must be str, not {}",
                                other.type_name()
                            )))
                        }
                    };
                    entries.insert(key, self.eval(value)?);
                }
                Ok(Value::dict(entries))
            }
            Expr::ListComp {
                element,
                targets,
                iterable,
                condition,
            } => self.comprehension(element, targets, iterable, condition.as_deref()),
            Expr::Unary { op, operand } => self.eval(operand)?.unary(*op),
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                left.binary(*op, &right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left)?;
                match (op, left.is_truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }
            Expr::Compare { left, links } => {
                let mut left = self.eval(left)?;
                for (op, right) in links {
                    let right = self.eval(right)?;
                    if !left.compare(*op, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Call { callee, args } => self.call(callee, args),
            Expr::Attribute { object, name } => {
                let object = self.eval(object)?;
                Err(FormatError::evaluation(format!(
                    "attribute '{}' of '{}' object can only be called",
                    name,
                    object.type_name()
                )))
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                builtins::index(&object, &index)
            }
            Expr::Slice {
                object,
                start,
                stop,
            } => {
                let object = self.eval(object)?;
                let start = start.as_deref().map(|e| self.eval(e)).transpose()?;
                let stop = stop.as_deref().map(|e| self.eval(e)).transpose()?;
                builtins::slice(&object, start.as_ref(), stop.as_ref())
            }
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, FormatError> {
        exprs.iter().map(|expr| self.eval(expr)).collect()
    }

    /// Comprehension variables do not outlive the comprehension
    fn comprehension(
        &mut self,
        element: &Expr,
        targets: &[String],
        iterable: &Expr,
        condition: Option<&Expr>,
    ) -> Result<Value, FormatError> {
        let items = self.eval(iterable)?.iterate()?;
        let shadowed: Vec<(String, Option<Value>)> = targets
            .iter()
            .map(|name| (name.clone(), self.host.environment().get(name).cloned()))
            .collect();

        let result = self.collect(element, targets, items, condition);

        let env = self.host.environment_mut();
        for (name, previous) in shadowed {
            match previous {
                Some(value) => env.set(name, value),
                None => {
                    env.remove(&name);
                }
            }
        }
        result.map(Value::list)
    }

    fn collect(
        &mut self,
        element: &Expr,
        targets: &[String],
        items: Vec<Value>,
        condition: Option<&Expr>,
    ) -> Result<Vec<Value>, FormatError> {
        let mut out = Vec::new();
        for item in items {
            self.bind(targets, item)?;
            let keep = match condition {
                Some(condition) => self.eval(condition)?.is_truthy(),
                None => true,
            };
            if keep {
                out.push(self.eval(element)?);
            }
        }
        Ok(out)
    }

    fn call(&mut self, callee: &Expr, args: &[Argument]) -> Result<Value, FormatError> {
        // Method calls: `object.name(...)`
        if let Expr::Attribute { object, name } = callee {
            let object = self.eval(object)?;
            let (positional, keywords) = self.arguments(args)?;
            reject_keywords(name, &keywords)?;
            return methods::call_method(&object, name, &positional);
        }

        let function = self.eval(callee)?;
        let (positional, keywords) = self.arguments(args)?;
        match function {
            Value::Function(function) => {
                reject_keywords(function.name(), &keywords)?;
                function.call(&positional)
            }
            Value::Format => self.call_format(positional, keywords),
            other => Err(FormatError::evaluation(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn arguments(
        &mut self,
        args: &[Argument],
    ) -> Result<(Vec<Value>, Vec<(String, Value)>), FormatError> {
        let mut positional = Vec::new();
        let mut keywords = Vec::new();
        for arg in args {
            match arg {
                Argument::Positional(expr) => positional.push(self.eval(expr)?),
                Argument::Keyword(name, expr) => keywords.push((name.clone(), self.eval(expr)?)),
            }
        }
        Ok((positional, keywords))
    }

    /// `format(template[, variables], **keywords)`. The template arrives with
    /// string-literal braces already collapsed; a literal brace needs `{{{{`.
    fn call_format(
        &mut self,
        positional: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> Result<Value, FormatError> {
        let name = self.host.environment().self_name().to_string();
        methods::arity(&name, &positional, 1, 2)?;
        let mut positional = positional.into_iter();

        let template = match positional.next() {
            Some(Value::Str(text)) => text,
            Some(lines @ (Value::List(_) | Value::Tuple(_))) => lines
                .iterate()?
                .iter()
                .map(|line| methods::str_arg(&name, line).map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?
                .join("\n"),
            other => {
                return Err(FormatError::evaluation(format!(
                    "{}() template must be str or a list of lines, not {}",
                    name,
                    other.as_ref().map(Value::type_name).unwrap_or("nothing")
                )))
            }
        };

        let mut vars = match positional.next() {
            None => Vec::new(),
            Some(Value::Dict(entries)) => entries
                .borrow()
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            Some(other) => {
                return Err(FormatError::evaluation(format!(
                    "{}() variables must be a dict, not {}",
                    name,
                    other.type_name()
                )))
            }
        };
        vars.extend(keywords);

        self.host.format_nested(template, vars).map(Value::Str)
    }
}

fn reject_keywords(name: &str, keywords: &[(String, Value)]) -> Result<(), FormatError> {
    match keywords.first() {
        Some((keyword, _)) => Err(FormatError::evaluation(format!(
            "{}() got an unexpected keyword argument '{}'",
            name, keyword
        ))),
        None => Ok(()),
    }
}
