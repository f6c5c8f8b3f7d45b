//! The tree-walking interpreter.

mod expressions;
mod methods;

use crate::ast::*;
use crate::builtins;
use crate::runtime::environment::SetOutcome;
use crate::runtime::function::{FunctionBody, FunctionKind};
use crate::runtime::object::JsObject;
use crate::runtime::{Environment, FunctionRef, JsFunction, Value};
use crate::Error;

/// Completion record for control flow.
#[derive(Debug)]
pub enum Completion {
    /// Normal completion carrying the statement's value
    Normal(Value),
    /// A `return` unwinding to the nearest function boundary
    Return(Value),
    /// A `break` unwinding to the nearest loop
    Break,
    /// A `continue` unwinding to the nearest loop iteration
    Continue,
}

/// The interpreter state.
pub struct Interpreter {
    /// The current lexical environment
    pub env: Environment,
    this_stack: Vec<Value>,
    thrown: Option<Value>,
}

impl Interpreter {
    /// Creates an interpreter with a fresh global environment and the
    /// default builtins (console writes to stdio).
    pub fn new() -> Self {
        let global = Environment::new();
        builtins::install(&global, builtins::ConsoleSink::stdio());
        Self::with_scope(global.child())
    }

    /// Creates an interpreter that executes against a prepared scope chain.
    /// No builtins are installed; the caller owns the chain.
    pub fn with_scope(env: Environment) -> Self {
        Self {
            env,
            this_stack: Vec::new(),
            thrown: None,
        }
    }

    /// Runs a program with REPL semantics: the value of the last normally
    /// completed statement is the result.
    pub fn run(&mut self, program: &Program) -> Result<Value, Error> {
        self.hoist_functions(&program.body);

        let mut result = Value::Undefined;
        for stmt in &program.body {
            match self.execute_statement(stmt)? {
                Completion::Normal(value) => result = value,
                Completion::Return(value) => return Ok(value),
                Completion::Break | Completion::Continue => {
                    return Err(Error::SyntaxError(
                        "Illegal break or continue at top level".into(),
                    ));
                }
            }
        }
        Ok(result)
    }

    /// Runs a program with module semantics: only an explicit top-level
    /// `return` produces a value; anything else is `undefined`.
    pub fn run_module(&mut self, program: &Program) -> Result<Value, Error> {
        self.hoist_functions(&program.body);

        for stmt in &program.body {
            match self.execute_statement(stmt)? {
                Completion::Normal(_) => {}
                Completion::Return(value) => return Ok(value),
                Completion::Break | Completion::Continue => {
                    return Err(Error::SyntaxError(
                        "Illegal break or continue at top level".into(),
                    ));
                }
            }
        }
        Ok(Value::Undefined)
    }

    /// Takes the value of the most recent uncaught `throw`, if any.
    pub fn take_thrown(&mut self) -> Option<Value> {
        self.thrown.take()
    }

    /// Records a thrown value and returns the marker error that unwinds to
    /// the nearest `try`.
    pub fn throw(&mut self, value: Value) -> Error {
        self.thrown = Some(value);
        Error::Thrown
    }

    /// Declares function declarations ahead of execution so that earlier
    /// statements can call later ones.
    fn hoist_functions(&mut self, body: &[Statement]) {
        for stmt in body {
            if let Statement::FunctionDeclaration(decl) = stmt {
                let func = self.make_function(
                    Some(decl.id.name.clone()),
                    decl.params.clone(),
                    decl.body.clone(),
                );
                self.env.declare(decl.id.name.clone(), Value::Function(func), true);
            }
        }
    }

    /// Executes a statement.
    pub fn execute_statement(&mut self, stmt: &Statement) -> Result<Completion, Error> {
        match stmt {
            Statement::Expression(stmt) => {
                let value = self.evaluate(&stmt.expression)?;
                Ok(Completion::Normal(value))
            }

            Statement::VariableDeclaration(decl) => {
                self.execute_variable_declaration(decl)?;
                Ok(Completion::Normal(Value::Undefined))
            }

            Statement::FunctionDeclaration(decl) => {
                // Already hoisted when this body was entered; re-declare so
                // later redefinitions win.
                let func = self.make_function(
                    Some(decl.id.name.clone()),
                    decl.params.clone(),
                    decl.body.clone(),
                );
                self.env.declare(decl.id.name.clone(), Value::Function(func), true);
                Ok(Completion::Normal(Value::Undefined))
            }

            Statement::ClassDeclaration(class) => {
                let value = self.instantiate_class(class)?;
                if let Some(id) = &class.id {
                    self.env.declare(id.name.clone(), value, true);
                }
                Ok(Completion::Normal(Value::Undefined))
            }

            Statement::Block(block) => {
                let saved = self.env.clone();
                self.env = saved.child();
                let result = self.execute_statements(&block.body);
                self.env = saved;
                result
            }

            Statement::If(stmt) => {
                let test = self.evaluate(&stmt.test)?;
                if test.to_boolean() {
                    self.execute_statement(&stmt.consequent)
                } else if let Some(alternate) = &stmt.alternate {
                    self.execute_statement(alternate)
                } else {
                    Ok(Completion::Normal(Value::Undefined))
                }
            }

            Statement::While(stmt) => {
                loop {
                    if !self.evaluate(&stmt.test)?.to_boolean() {
                        break;
                    }
                    match self.execute_statement(&stmt.body)? {
                        Completion::Break => break,
                        Completion::Continue | Completion::Normal(_) => {}
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                    }
                }
                Ok(Completion::Normal(Value::Undefined))
            }

            Statement::DoWhile(stmt) => {
                loop {
                    match self.execute_statement(&stmt.body)? {
                        Completion::Break => break,
                        Completion::Continue | Completion::Normal(_) => {}
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                    }
                    if !self.evaluate(&stmt.test)?.to_boolean() {
                        break;
                    }
                }
                Ok(Completion::Normal(Value::Undefined))
            }

            Statement::For(stmt) => self.execute_for(stmt),
            Statement::ForIn(stmt) => self.execute_for_in(stmt),
            Statement::ForOf(stmt) => self.execute_for_of(stmt),

            Statement::Return(stmt) => {
                let value = match &stmt.argument {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }

            Statement::Break => Ok(Completion::Break),
            Statement::Continue => Ok(Completion::Continue),

            Statement::Throw(stmt) => {
                let value = self.evaluate(&stmt.argument)?;
                Err(self.throw(value))
            }

            Statement::Try(stmt) => self.execute_try(stmt),

            Statement::Empty => Ok(Completion::Normal(Value::Undefined)),

            Statement::Import(_) | Statement::ExportNamed(_) | Statement::ExportDefault(_) => {
                Err(Error::SyntaxError(
                    "import/export syntax must be rewritten before execution".into(),
                ))
            }
        }
    }

    fn execute_statements(&mut self, body: &[Statement]) -> Result<Completion, Error> {
        let mut result = Value::Undefined;
        for stmt in body {
            match self.execute_statement(stmt)? {
                Completion::Normal(value) => result = value,
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal(result))
    }

    fn execute_variable_declaration(&mut self, decl: &VariableDeclaration) -> Result<(), Error> {
        let mutable = decl.kind != VariableKind::Const;
        for declarator in &decl.declarations {
            let value = match &declarator.init {
                Some(init) => self.evaluate(init)?,
                None => Value::Undefined,
            };
            self.env.declare(declarator.id.name.clone(), value, mutable);
        }
        Ok(())
    }

    fn execute_for(&mut self, stmt: &ForStatement) -> Result<Completion, Error> {
        let saved = self.env.clone();
        self.env = saved.child();

        let result = (|| -> Result<Completion, Error> {
            match &stmt.init {
                Some(ForInit::Declaration(decl)) => self.execute_variable_declaration(decl)?,
                Some(ForInit::Expression(expr)) => {
                    self.evaluate(expr)?;
                }
                None => {}
            }

            loop {
                if let Some(test) = &stmt.test {
                    if !self.evaluate(test)?.to_boolean() {
                        break;
                    }
                }
                match self.execute_statement(&stmt.body)? {
                    Completion::Break => break,
                    Completion::Continue | Completion::Normal(_) => {}
                    Completion::Return(value) => return Ok(Completion::Return(value)),
                }
                if let Some(update) = &stmt.update {
                    self.evaluate(update)?;
                }
            }
            Ok(Completion::Normal(Value::Undefined))
        })();

        self.env = saved;
        result
    }

    fn execute_for_in(&mut self, stmt: &ForInStatement) -> Result<Completion, Error> {
        let object = self.evaluate(&stmt.right)?;
        let keys = match &object {
            Value::Object(obj) => obj.borrow().keys(),
            _ => Vec::new(),
        };

        for key in keys {
            match self.run_iteration(&stmt.left, Value::String(key), &stmt.body)? {
                Completion::Break => break,
                Completion::Continue | Completion::Normal(_) => {}
                Completion::Return(value) => return Ok(Completion::Return(value)),
            }
        }
        Ok(Completion::Normal(Value::Undefined))
    }

    fn execute_for_of(&mut self, stmt: &ForOfStatement) -> Result<Completion, Error> {
        let iterable = self.evaluate(&stmt.right)?;
        let items: Vec<Value> = match &iterable {
            Value::Object(obj) if obj.borrow().is_array() => obj.borrow().elements.clone(),
            Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
            other => {
                return Err(Error::TypeError(format!(
                    "{} is not iterable",
                    other.type_of()
                )))
            }
        };

        for item in items {
            match self.run_iteration(&stmt.left, item, &stmt.body)? {
                Completion::Break => break,
                Completion::Continue | Completion::Normal(_) => {}
                Completion::Return(value) => return Ok(Completion::Return(value)),
            }
        }
        Ok(Completion::Normal(Value::Undefined))
    }

    fn run_iteration(
        &mut self,
        target: &ForTarget,
        value: Value,
        body: &Statement,
    ) -> Result<Completion, Error> {
        let saved = self.env.clone();
        self.env = saved.child();

        let bound = match target.kind {
            Some(kind) => {
                self.env
                    .declare(target.id.name.clone(), value, kind != VariableKind::Const);
                Ok(())
            }
            None => match self.env.set(&target.id.name, value) {
                SetOutcome::Assigned => Ok(()),
                SetOutcome::Immutable => Err(Error::TypeError(
                    "Assignment to constant variable.".into(),
                )),
                SetOutcome::NotFound => Err(Error::ReferenceError(format!(
                    "{} is not defined",
                    target.id.name
                ))),
            },
        };

        let result = bound.and_then(|_| self.execute_statement(body));
        self.env = saved;
        result
    }

    fn execute_try(&mut self, stmt: &TryStatement) -> Result<Completion, Error> {
        let result = {
            let saved = self.env.clone();
            self.env = saved.child();
            let r = self.execute_statements(&stmt.block.body);
            self.env = saved;
            r
        };

        let result = match result {
            Ok(completion) => Ok(completion),
            // Host-level failures are not catchable from user code.
            Err(err @ (Error::Internal(_) | Error::Io(_))) => Err(err),
            Err(err) => {
                if let Some(handler) = &stmt.handler {
                    let error_value = match err {
                        Error::Thrown => self.thrown.take().unwrap_or(Value::Undefined),
                        other => Value::Object(JsObject::error(other.kind_name(), &other.message())),
                    };

                    let saved = self.env.clone();
                    self.env = saved.child();
                    if let Some(param) = &handler.param {
                        self.env.declare(param.name.clone(), error_value, true);
                    }
                    let r = self.execute_statements(&handler.body.body);
                    self.env = saved;
                    r
                } else {
                    Err(err)
                }
            }
        };

        if let Some(finalizer) = &stmt.finalizer {
            let saved = self.env.clone();
            self.env = saved.child();
            let finalized = self.execute_statements(&finalizer.body);
            self.env = saved;
            finalized?;
        }

        result
    }

    /// Calls a function value with an explicit `this`.
    pub fn call_function(
        &mut self,
        func: &FunctionRef,
        this: Value,
        args: &[Value],
    ) -> Result<Value, Error> {
        match &func.kind {
            FunctionKind::Native(f) => {
                let f = f.clone();
                f(self, &this, args)
            }
            FunctionKind::Declared(decl) => {
                let scope = decl.closure.child();
                for (i, param) in decl.params.iter().enumerate() {
                    scope.declare(
                        param.clone(),
                        args.get(i).cloned().unwrap_or(Value::Undefined),
                        true,
                    );
                }

                let effective_this = if decl.is_arrow {
                    decl.captured_this
                        .as_deref()
                        .cloned()
                        .unwrap_or(Value::Undefined)
                } else {
                    this
                };

                let saved_env = std::mem::replace(&mut self.env, scope);
                self.this_stack.push(effective_this);

                let body = decl.body.clone();
                let result = match &*body {
                    FunctionBody::Expression(expr) => self.evaluate(expr),
                    FunctionBody::Block(stmts) => {
                        self.hoist_functions(stmts);
                        match self.execute_statements(stmts) {
                            Ok(Completion::Return(value)) => Ok(value),
                            Ok(_) => Ok(Value::Undefined),
                            Err(err) => Err(err),
                        }
                    }
                };

                self.this_stack.pop();
                self.env = saved_env;
                result
            }
        }
    }

    /// Constructs a new instance via `new`.
    pub fn construct(&mut self, func: &FunctionRef, args: &[Value]) -> Result<Value, Error> {
        let instance = JsObject::plain();
        if let Some(Value::Object(proto)) = func.get_property("prototype") {
            instance.borrow_mut().prototype = Some(proto);
        }

        let result = self.call_function(func, Value::Object(instance.clone()), args)?;
        Ok(match result {
            Value::Object(_) => result,
            _ => Value::Object(instance),
        })
    }

    /// The current `this` binding.
    pub fn current_this(&self) -> Value {
        self.this_stack.last().cloned().unwrap_or(Value::Undefined)
    }

    pub(crate) fn make_function(
        &self,
        name: Option<String>,
        params: Vec<Identifier>,
        body: Vec<Statement>,
    ) -> FunctionRef {
        JsFunction::declared(
            name,
            params.into_iter().map(|p| p.name).collect(),
            FunctionBody::Block(body),
            self.env.clone(),
        )
    }

    /// Builds the class constructor function with its prototype object.
    fn instantiate_class(&mut self, class: &ClassDeclaration) -> Result<Value, Error> {
        let proto = JsObject::plain();
        let class_name = class.id.as_ref().map(|id| id.name.clone());
        let mut constructor: Option<FunctionRef> = None;
        let mut statics: Vec<(String, FunctionRef)> = Vec::new();

        for method in &class.body {
            let func = self.make_function(
                Some(method.name.clone()),
                method.params.clone(),
                method.body.clone(),
            );
            if method.is_constructor {
                constructor = Some(func);
            } else if method.is_static {
                statics.push((method.name.clone(), func));
            } else {
                proto
                    .borrow_mut()
                    .set(&method.name, Value::Function(func));
            }
        }

        let constructor = constructor
            .unwrap_or_else(|| self.make_function(class_name.clone(), Vec::new(), Vec::new()));
        *constructor.name.borrow_mut() = class_name;
        constructor.set_property("prototype", Value::Object(proto));
        for (name, func) in statics {
            constructor.set_property(&name, Value::Function(func));
        }

        Ok(Value::Function(constructor))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
