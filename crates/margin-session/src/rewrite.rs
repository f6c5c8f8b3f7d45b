// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The source rewriter.
//!
//! Takes a parsed fragment and produces an executable script with the module
//! syntax reified:
//!
//! - every top-level binding gets a registration call after the statement
//!   that introduces it
//! - export declarations become registration calls against the namespace
//! - import declarations register import records during the rewrite (before
//!   any body code runs) and are dropped from the output
//! - the trailing expression statement of the original fragment becomes a
//!   `return`, which is how the REPL value gets out
//! - `import(expr)` becomes a call to the dynamic-import runtime helper
//!
//! The registration calls target stub names that the scope synthesizer
//! binds to native functions, so registration happens at run time, in
//! source order, against the live store.

use margin_engine::ast::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::resolver::Resolution;
use crate::store::{ImportKind, ImportRecord, ImportTarget};
use crate::Session;

/// Scope-stub name for binding registration.
pub(crate) const PUT_BINDING: &str = "__putBinding";
/// Scope-stub name for named-export registration.
pub(crate) const PUT_EXPORT: &str = "__putExport";
/// Scope-stub name for default-export registration.
pub(crate) const PUT_DEFAULT_EXPORT: &str = "__putDefaultExport";
/// Scope-stub name for the dynamic-import helper.
pub(crate) const DYNAMIC_IMPORT: &str = "__dynamicImport";

/// The rewriter's output.
pub(crate) struct Rewritten {
    /// The executable program (no module syntax left)
    pub program: Program,
    /// User modules that still need recursive evaluation, in import order
    pub pending_imports: Vec<PathBuf>,
}

/// Rewrites a parsed fragment for the given namespace.
pub(crate) fn rewrite_program(
    session: &Session,
    namespace: &Path,
    program: Program,
    eval_imports: bool,
) -> Result<Rewritten> {
    let mut rewriter = Rewriter {
        session,
        namespace,
        ns_text: namespace.display().to_string(),
        eval_imports,
        exported_seen: HashSet::new(),
        pending: Vec::new(),
        pending_seen: HashSet::new(),
        default_counter: 0,
        out: Vec::new(),
    };

    let mut body = program.body;
    let trailing = match body.last() {
        Some(Statement::Expression(_)) => body.pop(),
        _ => None,
    };

    for stmt in body {
        rewriter.transform_statement(stmt)?;
    }

    if let Some(Statement::Expression(stmt)) = trailing {
        let expression = rewrite_expression(stmt.expression, &rewriter.ns_text);
        rewriter.out.push(Statement::Return(ReturnStatement {
            argument: Some(expression),
        }));
    }

    Ok(Rewritten {
        program: Program { body: rewriter.out },
        pending_imports: rewriter.pending,
    })
}

struct Rewriter<'a> {
    session: &'a Session,
    namespace: &'a Path,
    ns_text: String,
    eval_imports: bool,
    exported_seen: HashSet<String>,
    pending: Vec<PathBuf>,
    pending_seen: HashSet<PathBuf>,
    default_counter: usize,
    out: Vec<Statement>,
}

impl<'a> Rewriter<'a> {
    fn transform_statement(&mut self, stmt: Statement) -> Result<()> {
        let stmt = rewrite_statement(stmt, &self.ns_text);
        match stmt {
            Statement::Import(decl) => self.register_import(decl),

            Statement::ExportNamed(export) => self.transform_export_named(export),
            Statement::ExportDefault(export) => self.transform_export_default(export),

            Statement::VariableDeclaration(decl) => {
                let names: Vec<String> = decl
                    .declarations
                    .iter()
                    .map(|declarator| declarator.id.name.clone())
                    .collect();
                self.out.push(Statement::VariableDeclaration(decl));
                // One registration per name, after the whole declaration
                // statement (never between declarators).
                for name in names {
                    self.emit_put_binding(&name);
                }
                Ok(())
            }

            Statement::FunctionDeclaration(decl) => {
                let name = decl.id.name.clone();
                self.out.push(Statement::FunctionDeclaration(decl));
                self.emit_put_binding(&name);
                Ok(())
            }

            Statement::ClassDeclaration(class) => {
                let name = class.id.as_ref().map(|id| id.name.clone());
                self.out.push(Statement::ClassDeclaration(class));
                if let Some(name) = name {
                    self.emit_put_binding(&name);
                }
                Ok(())
            }

            other => {
                self.out.push(other);
                Ok(())
            }
        }
    }

    /// Registers import records in the store now (enter time), and queues
    /// unevaluated user targets for the evaluator's recursive pass. The
    /// statement itself produces no output.
    fn register_import(&mut self, decl: ImportDeclaration) -> Result<()> {
        let resolution = self.session.resolve(&decl.source, self.namespace)?;
        let target = match resolution {
            Resolution::User(path) => ImportTarget::User(path),
            Resolution::BuiltIn(id) => ImportTarget::BuiltIn(id),
        };

        for specifier in decl.specifiers {
            let (local, kind) = match specifier {
                ImportSpecifier::Named { imported, local } => (local, ImportKind::Named(imported)),
                ImportSpecifier::Default { local } => (local, ImportKind::Default),
                ImportSpecifier::Namespace { local } => (local, ImportKind::Namespace),
            };
            self.session.store_mut().put_import(
                self.namespace,
                ImportRecord {
                    local,
                    kind,
                    target: target.clone(),
                },
            );
        }

        if self.eval_imports {
            if let ImportTarget::User(path) = target {
                // A namespace already present in the store is evaluated or
                // mid-evaluation; skipping it is what terminates cycles.
                if !self.session.store().has_been_evaluated(&path)
                    && self.pending_seen.insert(path.clone())
                {
                    self.pending.push(path);
                }
            }
        }

        Ok(())
    }

    fn transform_export_named(&mut self, export: ExportNamedDeclaration) -> Result<()> {
        if let Some(declaration) = export.declaration {
            let names = bound_names(&declaration);
            self.transform_statement(*declaration)?;
            for name in names {
                if self.exported_seen.insert(name.clone()) {
                    self.emit_put_export(&name, &name);
                }
            }
        }

        for specifier in export.specifiers {
            if specifier.exported == "default" {
                self.emit_put_default_export(&specifier.local);
            } else {
                self.emit_put_export(&specifier.local, &specifier.exported);
            }
        }

        Ok(())
    }

    fn transform_export_default(&mut self, export: ExportDefaultDeclaration) -> Result<()> {
        match export.declaration {
            ExportDefaultKind::Function(func) => {
                let name = match &func.id {
                    Some(id) => id.name.clone(),
                    None => self.fresh_default_id(),
                };
                self.out
                    .push(Statement::FunctionDeclaration(FunctionDeclaration {
                        id: Identifier::new(name.clone()),
                        params: func.params,
                        body: func.body,
                        is_async: func.is_async,
                    }));
                self.emit_put_binding(&name);
                self.emit_put_default_export(&name);
            }

            ExportDefaultKind::Class(mut class) => {
                let name = match &class.id {
                    Some(id) => id.name.clone(),
                    None => self.fresh_default_id(),
                };
                class.id = Some(Identifier::new(name.clone()));
                self.out.push(Statement::ClassDeclaration(class));
                self.emit_put_binding(&name);
                self.emit_put_default_export(&name);
            }

            ExportDefaultKind::Expression(Expression::Identifier(id)) => {
                self.emit_put_default_export(&id.name);
            }

            // Arbitrary expressions get bound to a synthesized identifier
            // and exported through it.
            ExportDefaultKind::Expression(expr) => {
                let name = self.fresh_default_id();
                self.out
                    .push(Statement::VariableDeclaration(VariableDeclaration {
                        kind: VariableKind::Const,
                        declarations: vec![VariableDeclarator {
                            id: Identifier::new(name.clone()),
                            init: Some(expr),
                        }],
                    }));
                self.emit_put_binding(&name);
                self.emit_put_default_export(&name);
            }
        }

        Ok(())
    }

    fn fresh_default_id(&mut self) -> String {
        let id = format!("__defaultExport_{}", self.default_counter);
        self.default_counter += 1;
        id
    }

    fn emit_put_binding(&mut self, name: &str) {
        self.out.push(stub_call(
            PUT_BINDING,
            vec![
                string_literal(&self.ns_text),
                string_literal(name),
                Expression::Identifier(Identifier::new(name)),
            ],
        ));
    }

    fn emit_put_export(&mut self, local: &str, exported: &str) {
        self.out.push(stub_call(
            PUT_EXPORT,
            vec![
                string_literal(&self.ns_text),
                string_literal(local),
                string_literal(exported),
            ],
        ));
    }

    fn emit_put_default_export(&mut self, local: &str) {
        self.out.push(stub_call(
            PUT_DEFAULT_EXPORT,
            vec![string_literal(&self.ns_text), string_literal(local)],
        ));
    }
}

/// Names introduced at the top level by a declaration statement.
fn bound_names(stmt: &Statement) -> Vec<String> {
    match stmt {
        Statement::VariableDeclaration(decl) => decl
            .declarations
            .iter()
            .map(|declarator| declarator.id.name.clone())
            .collect(),
        Statement::FunctionDeclaration(decl) => vec![decl.id.name.clone()],
        Statement::ClassDeclaration(class) => {
            class.id.iter().map(|id| id.name.clone()).collect()
        }
        _ => Vec::new(),
    }
}

fn stub_call(stub: &str, arguments: Vec<Expression>) -> Statement {
    Statement::Expression(ExpressionStatement {
        expression: Expression::Call(CallExpression {
            callee: Box::new(Expression::Identifier(Identifier::new(stub))),
            arguments,
        }),
    })
}

fn string_literal(text: &str) -> Expression {
    Expression::Literal(Literal::String(text.to_string()))
}

// --- Dynamic-import rewriting -------------------------------------------
//
// `import(expr)` can appear anywhere an expression can, including inside
// function bodies, so this is a whole-tree map.

fn rewrite_statement(stmt: Statement, ns: &str) -> Statement {
    match stmt {
        Statement::Expression(s) => Statement::Expression(ExpressionStatement {
            expression: rewrite_expression(s.expression, ns),
        }),
        Statement::VariableDeclaration(decl) => {
            Statement::VariableDeclaration(rewrite_variable_declaration(decl, ns))
        }
        Statement::FunctionDeclaration(decl) => {
            Statement::FunctionDeclaration(FunctionDeclaration {
                id: decl.id,
                params: decl.params,
                body: rewrite_statements(decl.body, ns),
                is_async: decl.is_async,
            })
        }
        Statement::ClassDeclaration(class) => Statement::ClassDeclaration(rewrite_class(class, ns)),
        Statement::Block(block) => Statement::Block(BlockStatement {
            body: rewrite_statements(block.body, ns),
        }),
        Statement::If(s) => Statement::If(IfStatement {
            test: rewrite_expression(s.test, ns),
            consequent: Box::new(rewrite_statement(*s.consequent, ns)),
            alternate: s.alternate.map(|alt| Box::new(rewrite_statement(*alt, ns))),
        }),
        Statement::While(s) => Statement::While(WhileStatement {
            test: rewrite_expression(s.test, ns),
            body: Box::new(rewrite_statement(*s.body, ns)),
        }),
        Statement::DoWhile(s) => Statement::DoWhile(DoWhileStatement {
            body: Box::new(rewrite_statement(*s.body, ns)),
            test: rewrite_expression(s.test, ns),
        }),
        Statement::For(s) => Statement::For(ForStatement {
            init: s.init.map(|init| match init {
                ForInit::Declaration(decl) => {
                    ForInit::Declaration(Box::new(rewrite_variable_declaration(*decl, ns)))
                }
                ForInit::Expression(expr) => ForInit::Expression(rewrite_expression(expr, ns)),
            }),
            test: s.test.map(|test| rewrite_expression(test, ns)),
            update: s.update.map(|update| rewrite_expression(update, ns)),
            body: Box::new(rewrite_statement(*s.body, ns)),
        }),
        Statement::ForIn(s) => Statement::ForIn(ForInStatement {
            left: s.left,
            right: rewrite_expression(s.right, ns),
            body: Box::new(rewrite_statement(*s.body, ns)),
        }),
        Statement::ForOf(s) => Statement::ForOf(ForOfStatement {
            left: s.left,
            right: rewrite_expression(s.right, ns),
            body: Box::new(rewrite_statement(*s.body, ns)),
        }),
        Statement::Return(s) => Statement::Return(ReturnStatement {
            argument: s.argument.map(|argument| rewrite_expression(argument, ns)),
        }),
        Statement::Throw(s) => Statement::Throw(ThrowStatement {
            argument: rewrite_expression(s.argument, ns),
        }),
        Statement::Try(s) => Statement::Try(TryStatement {
            block: BlockStatement {
                body: rewrite_statements(s.block.body, ns),
            },
            handler: s.handler.map(|handler| CatchClause {
                param: handler.param,
                body: BlockStatement {
                    body: rewrite_statements(handler.body.body, ns),
                },
            }),
            finalizer: s.finalizer.map(|finalizer| BlockStatement {
                body: rewrite_statements(finalizer.body, ns),
            }),
        }),
        Statement::ExportNamed(export) => Statement::ExportNamed(ExportNamedDeclaration {
            declaration: export
                .declaration
                .map(|decl| Box::new(rewrite_statement(*decl, ns))),
            specifiers: export.specifiers,
        }),
        Statement::ExportDefault(export) => Statement::ExportDefault(ExportDefaultDeclaration {
            declaration: match export.declaration {
                ExportDefaultKind::Function(func) => {
                    ExportDefaultKind::Function(FunctionExpression {
                        id: func.id,
                        params: func.params,
                        body: rewrite_statements(func.body, ns),
                        is_async: func.is_async,
                    })
                }
                ExportDefaultKind::Class(class) => {
                    ExportDefaultKind::Class(rewrite_class(class, ns))
                }
                ExportDefaultKind::Expression(expr) => {
                    ExportDefaultKind::Expression(rewrite_expression(expr, ns))
                }
            },
        }),
        other @ (Statement::Break
        | Statement::Continue
        | Statement::Empty
        | Statement::Import(_)) => other,
    }
}

fn rewrite_statements(body: Vec<Statement>, ns: &str) -> Vec<Statement> {
    body.into_iter()
        .map(|stmt| rewrite_statement(stmt, ns))
        .collect()
}

fn rewrite_variable_declaration(decl: VariableDeclaration, ns: &str) -> VariableDeclaration {
    VariableDeclaration {
        kind: decl.kind,
        declarations: decl
            .declarations
            .into_iter()
            .map(|declarator| VariableDeclarator {
                id: declarator.id,
                init: declarator.init.map(|init| rewrite_expression(init, ns)),
            })
            .collect(),
    }
}

fn rewrite_class(class: ClassDeclaration, ns: &str) -> ClassDeclaration {
    ClassDeclaration {
        id: class.id,
        body: class
            .body
            .into_iter()
            .map(|method| ClassMethod {
                name: method.name,
                is_static: method.is_static,
                is_constructor: method.is_constructor,
                params: method.params,
                body: rewrite_statements(method.body, ns),
            })
            .collect(),
    }
}

fn rewrite_expression(expr: Expression, ns: &str) -> Expression {
    match expr {
        Expression::DynamicImport(specifier) => Expression::Call(CallExpression {
            callee: Box::new(Expression::Identifier(Identifier::new(DYNAMIC_IMPORT))),
            arguments: vec![
                string_literal(ns),
                rewrite_expression(*specifier, ns),
            ],
        }),

        Expression::Array(array) => Expression::Array(ArrayExpression {
            elements: array
                .elements
                .into_iter()
                .map(|element| element.map(|e| rewrite_expression(e, ns)))
                .collect(),
        }),
        Expression::Object(object) => Expression::Object(ObjectExpression {
            properties: object
                .properties
                .into_iter()
                .map(|property| Property {
                    key: match property.key {
                        PropertyKey::Computed(key) => {
                            PropertyKey::Computed(Box::new(rewrite_expression(*key, ns)))
                        }
                        other => other,
                    },
                    value: rewrite_expression(property.value, ns),
                    shorthand: property.shorthand,
                })
                .collect(),
        }),
        Expression::Binary(binary) => Expression::Binary(BinaryExpression {
            operator: binary.operator,
            left: Box::new(rewrite_expression(*binary.left, ns)),
            right: Box::new(rewrite_expression(*binary.right, ns)),
        }),
        Expression::Unary(unary) => Expression::Unary(UnaryExpression {
            operator: unary.operator,
            argument: Box::new(rewrite_expression(*unary.argument, ns)),
        }),
        Expression::Assignment(assign) => Expression::Assignment(AssignmentExpression {
            operator: assign.operator,
            left: Box::new(rewrite_expression(*assign.left, ns)),
            right: Box::new(rewrite_expression(*assign.right, ns)),
        }),
        Expression::Call(call) => Expression::Call(CallExpression {
            callee: Box::new(rewrite_expression(*call.callee, ns)),
            arguments: call
                .arguments
                .into_iter()
                .map(|argument| rewrite_expression(argument, ns))
                .collect(),
        }),
        Expression::Member(member) => Expression::Member(MemberExpression {
            object: Box::new(rewrite_expression(*member.object, ns)),
            property: match member.property {
                MemberProperty::Expression(property) => {
                    MemberProperty::Expression(Box::new(rewrite_expression(*property, ns)))
                }
                other => other,
            },
        }),
        Expression::Conditional(cond) => Expression::Conditional(ConditionalExpression {
            test: Box::new(rewrite_expression(*cond.test, ns)),
            consequent: Box::new(rewrite_expression(*cond.consequent, ns)),
            alternate: Box::new(rewrite_expression(*cond.alternate, ns)),
        }),
        Expression::Function(func) => Expression::Function(FunctionExpression {
            id: func.id,
            params: func.params,
            body: rewrite_statements(func.body, ns),
            is_async: func.is_async,
        }),
        Expression::Arrow(arrow) => Expression::Arrow(ArrowFunctionExpression {
            params: arrow.params,
            body: match arrow.body {
                ArrowBody::Expression(body) => {
                    ArrowBody::Expression(Box::new(rewrite_expression(*body, ns)))
                }
                ArrowBody::Block(body) => ArrowBody::Block(rewrite_statements(body, ns)),
            },
            is_async: arrow.is_async,
        }),
        Expression::New(new_expr) => Expression::New(NewExpression {
            callee: Box::new(rewrite_expression(*new_expr.callee, ns)),
            arguments: new_expr
                .arguments
                .into_iter()
                .map(|argument| rewrite_expression(argument, ns))
                .collect(),
        }),
        Expression::Update(update) => Expression::Update(UpdateExpression {
            operator: update.operator,
            argument: Box::new(rewrite_expression(*update.argument, ns)),
            prefix: update.prefix,
        }),
        Expression::Sequence(seq) => Expression::Sequence(SequenceExpression {
            expressions: seq
                .expressions
                .into_iter()
                .map(|expression| rewrite_expression(expression, ns))
                .collect(),
        }),

        leaf @ (Expression::Literal(_) | Expression::Identifier(_) | Expression::This) => leaf,
    }
}
