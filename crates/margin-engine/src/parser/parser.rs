//! The main parser implementation.
//!
//! A recursive descent parser over the scanner's token stream. Semicolons are
//! optional everywhere a statement can end, which is what an editor-bound
//! REPL needs: fragments are frequently submitted without their terminators.

use crate::ast::*;
use crate::lexer::{Scanner, Span, Token, TokenKind};
use crate::Error;

/// A saved parser position, used for bounded backtracking (arrow-function
/// parameter lists, `import(` vs `import ... from`, contextual keywords).
pub(super) struct ParserState<'a> {
    scanner: Scanner<'a>,
    current: Token,
    previous: Token,
}

/// A recursive descent parser for JavaScript and TypeScript.
pub struct Parser<'a> {
    pub(super) scanner: Scanner<'a>,
    pub(super) current: Token,
    pub(super) previous: Token,
    pub(super) typescript: bool,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for JavaScript source.
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self {
            scanner,
            current,
            previous: Token::new(TokenKind::Eof, Span::new(0, 0)),
            typescript: false,
        }
    }

    /// Creates a new parser that erases TypeScript type syntax while parsing.
    pub fn new_typescript(source: &'a str) -> Self {
        let mut parser = Self::new(source);
        parser.typescript = true;
        parser
    }

    /// Parses the source code into a Program AST node.
    pub fn parse_program(&mut self) -> Result<Program, Error> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        Ok(Program { body })
    }

    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Result<Statement, Error> {
        match &self.current.kind {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let decl = self.parse_variable_declaration()?;
                self.eat_semicolon();
                Ok(Statement::VariableDeclaration(decl))
            }
            TokenKind::Function => {
                let func = self.parse_function(false, true)?;
                Ok(Statement::FunctionDeclaration(function_declaration(func)?))
            }
            TokenKind::Class => {
                let class = self.parse_class(true)?;
                Ok(Statement::ClassDeclaration(class))
            }
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Break => {
                self.advance();
                self.eat_semicolon();
                Ok(Statement::Break)
            }
            TokenKind::Continue => {
                self.advance();
                self.eat_semicolon();
                Ok(Statement::Continue)
            }
            TokenKind::Throw => {
                self.advance();
                let argument = self.parse_expression()?;
                self.eat_semicolon();
                Ok(Statement::Throw(ThrowStatement { argument }))
            }
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::LeftBrace => self.parse_block_statement(),
            TokenKind::Semicolon => {
                self.advance();
                Ok(Statement::Empty)
            }
            TokenKind::Import => self.parse_import_statement(),
            TokenKind::Export => self.parse_export_statement(),
            TokenKind::Identifier(word) if word == "async" => {
                // `async function f() {}` — anything else falls through to
                // an expression statement.
                let state = self.save();
                self.advance();
                if self.check(&TokenKind::Function) {
                    let func = self.parse_function(true, true)?;
                    return Ok(Statement::FunctionDeclaration(function_declaration(func)?));
                }
                self.restore(state);
                self.parse_expression_statement()
            }
            TokenKind::Identifier(word)
                if self.typescript && (word == "type" || word == "interface") =>
            {
                self.parse_type_declaration()
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_variable_declaration(&mut self) -> Result<VariableDeclaration, Error> {
        let kind = match &self.current.kind {
            TokenKind::Var => VariableKind::Var,
            TokenKind::Let => VariableKind::Let,
            TokenKind::Const => VariableKind::Const,
            _ => return Err(Error::SyntaxError("Expected variable keyword".into())),
        };
        self.advance();

        let mut declarations = Vec::new();

        loop {
            let id = self.expect_identifier()?;
            if self.typescript {
                // Definite-assignment assertion `x!: T`
                if self.check(&TokenKind::Bang) {
                    self.advance();
                }
                self.skip_type_annotation();
            }
            let init = if self.check(&TokenKind::Equal) {
                self.advance();
                Some(self.parse_assignment()?)
            } else {
                None
            };

            declarations.push(VariableDeclarator { id, init });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(VariableDeclaration { kind, declarations })
    }

    /// Parses `function name?(params) { body }` with TypeScript trivia
    /// (generics, annotations) erased. The `function` keyword must be
    /// current; `async` has already been consumed by the caller.
    pub(super) fn parse_function(
        &mut self,
        is_async: bool,
        require_name: bool,
    ) -> Result<FunctionExpression, Error> {
        self.expect(&TokenKind::Function)?;

        let id = if let TokenKind::Identifier(_) = &self.current.kind {
            Some(self.expect_identifier()?)
        } else if require_name {
            return Err(Error::SyntaxError("Expected function name".into()));
        } else {
            None
        };

        if self.typescript && self.check(&TokenKind::LessThan) {
            self.skip_type_parameters();
        }

        self.expect(&TokenKind::LeftParen)?;
        let params = self.parse_parameters()?;
        self.expect(&TokenKind::RightParen)?;

        if self.typescript {
            self.skip_type_annotation();
        }

        self.expect(&TokenKind::LeftBrace)?;
        let body = self.parse_until_right_brace()?;
        self.expect(&TokenKind::RightBrace)?;

        Ok(FunctionExpression {
            id,
            params,
            body,
            is_async,
        })
    }

    /// Parses a parenthesized parameter list body (after `(`, up to `)`).
    pub(super) fn parse_parameters(&mut self) -> Result<Vec<Identifier>, Error> {
        let mut params = Vec::new();

        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.parse_parameter()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        Ok(params)
    }

    pub(super) fn parse_parameter(&mut self) -> Result<Identifier, Error> {
        let id = self.expect_identifier()?;
        if self.typescript {
            if self.check(&TokenKind::Question) {
                self.advance();
            }
            self.skip_type_annotation();
        }
        Ok(id)
    }

    fn parse_class(&mut self, require_name: bool) -> Result<ClassDeclaration, Error> {
        self.expect(&TokenKind::Class)?;

        let id = if let TokenKind::Identifier(_) = &self.current.kind {
            Some(self.expect_identifier()?)
        } else if require_name {
            return Err(Error::SyntaxError("Expected class name".into()));
        } else {
            None
        };

        if self.typescript && self.check(&TokenKind::LessThan) {
            self.skip_type_parameters();
        }
        if self.check_ident("extends") {
            return Err(Error::SyntaxError(
                "class inheritance is not supported".into(),
            ));
        }
        if self.typescript && self.eat_ident("implements") {
            self.skip_type();
            while self.check(&TokenKind::Comma) {
                self.advance();
                self.skip_type();
            }
        }

        self.expect(&TokenKind::LeftBrace)?;

        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            if self.check(&TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            body.push(self.parse_class_method()?);
        }

        self.expect(&TokenKind::RightBrace)?;

        Ok(ClassDeclaration { id, body })
    }

    fn parse_class_method(&mut self) -> Result<ClassMethod, Error> {
        if self.typescript {
            while self.check_ident("public")
                || self.check_ident("private")
                || self.check_ident("protected")
                || self.check_ident("readonly")
            {
                self.advance();
            }
        }

        let mut is_static = false;
        if self.check_ident("static") {
            // `static` itself can be a method name; only treat it as a
            // modifier when a name follows.
            let state = self.save();
            self.advance();
            if self.check(&TokenKind::LeftParen) {
                self.restore(state);
            } else {
                is_static = true;
            }
        }

        let name = self.property_name()?;

        if self.typescript && self.check(&TokenKind::LessThan) {
            self.skip_type_parameters();
        }

        if !self.check(&TokenKind::LeftParen) {
            return Err(Error::SyntaxError(format!(
                "class fields are not supported (near '{}')",
                name
            )));
        }

        self.expect(&TokenKind::LeftParen)?;
        let params = self.parse_parameters()?;
        self.expect(&TokenKind::RightParen)?;

        if self.typescript {
            self.skip_type_annotation();
        }

        self.expect(&TokenKind::LeftBrace)?;
        let body = self.parse_until_right_brace()?;
        self.expect(&TokenKind::RightBrace)?;

        Ok(ClassMethod {
            is_constructor: name == "constructor",
            name,
            is_static,
            params,
            body,
        })
    }

    fn parse_if_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'if'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::If(IfStatement {
            test,
            consequent,
            alternate,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'while'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);

        Ok(Statement::While(WhileStatement { test, body }))
    }

    fn parse_do_while_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'do'
        let body = Box::new(self.parse_statement()?);
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        self.eat_semicolon();

        Ok(Statement::DoWhile(DoWhileStatement { body, test }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'for'
        self.expect(&TokenKind::LeftParen)?;

        // for (x in obj), for (const x of xs)
        if let Some(stmt) = self.try_parse_for_in_of()? {
            return Ok(stmt);
        }

        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else if matches!(
            self.current.kind,
            TokenKind::Var | TokenKind::Let | TokenKind::Const
        ) {
            Some(ForInit::Declaration(Box::new(
                self.parse_variable_declaration()?,
            )))
        } else {
            Some(ForInit::Expression(self.parse_sequence()?))
        };
        self.expect(&TokenKind::Semicolon)?;

        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_sequence()?)
        };
        self.expect(&TokenKind::RightParen)?;

        let body = Box::new(self.parse_statement()?);

        Ok(Statement::For(ForStatement {
            init,
            test,
            update,
            body,
        }))
    }

    fn try_parse_for_in_of(&mut self) -> Result<Option<Statement>, Error> {
        let state = self.save();

        let kind = match &self.current.kind {
            TokenKind::Var => Some(VariableKind::Var),
            TokenKind::Let => Some(VariableKind::Let),
            TokenKind::Const => Some(VariableKind::Const),
            _ => None,
        };
        if kind.is_some() {
            self.advance();
        }

        let id = match &self.current.kind {
            TokenKind::Identifier(name) => {
                let id = Identifier::new(name.clone());
                self.advance();
                id
            }
            _ => {
                self.restore(state);
                return Ok(None);
            }
        };

        let is_in = self.check(&TokenKind::In);
        let is_of = self.check_ident("of");
        if !is_in && !is_of {
            self.restore(state);
            return Ok(None);
        }
        self.advance();

        let right = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);

        let left = ForTarget { kind, id };
        Ok(Some(if is_in {
            Statement::ForIn(ForInStatement { left, right, body })
        } else {
            Statement::ForOf(ForOfStatement { left, right, body })
        }))
    }

    fn parse_return_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'return'
        let argument = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RightBrace)
            || self.is_at_end()
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.eat_semicolon();

        Ok(Statement::Return(ReturnStatement { argument }))
    }

    fn parse_try_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'try'
        let block = self.parse_braced_block()?;

        let handler = if self.check(&TokenKind::Catch) {
            self.advance();
            let param = if self.check(&TokenKind::LeftParen) {
                self.advance();
                let id = self.expect_identifier()?;
                if self.typescript {
                    self.skip_type_annotation();
                }
                self.expect(&TokenKind::RightParen)?;
                Some(id)
            } else {
                None
            };
            let body = self.parse_braced_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.check(&TokenKind::Finally) {
            self.advance();
            Some(self.parse_braced_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(Error::SyntaxError(
                "Missing catch or finally after try".into(),
            ));
        }

        Ok(Statement::Try(TryStatement {
            block,
            handler,
            finalizer,
        }))
    }

    fn parse_block_statement(&mut self) -> Result<Statement, Error> {
        Ok(Statement::Block(self.parse_braced_block()?))
    }

    fn parse_braced_block(&mut self) -> Result<BlockStatement, Error> {
        self.expect(&TokenKind::LeftBrace)?;
        let body = self.parse_until_right_brace()?;
        self.expect(&TokenKind::RightBrace)?;
        Ok(BlockStatement { body })
    }

    pub(super) fn parse_until_right_brace(&mut self) -> Result<Vec<Statement>, Error> {
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, Error> {
        let expression = self.parse_expression()?;
        self.eat_semicolon();
        Ok(Statement::Expression(ExpressionStatement { expression }))
    }

    // --- Module syntax ---

    fn parse_import_statement(&mut self) -> Result<Statement, Error> {
        // `import(` is a dynamic-import expression statement, not a
        // declaration.
        let state = self.save();
        self.advance();
        if self.check(&TokenKind::LeftParen) {
            self.restore(state);
            return self.parse_expression_statement();
        }

        // `import type ...` (TypeScript) is erased entirely, unless `type`
        // is itself the imported binding (`import type from './x'`).
        if self.typescript && self.check_ident("type") {
            let inner = self.save();
            self.advance();
            if !self.check_ident("from") {
                // Erase through the module specifier string.
                while !self.is_at_end() {
                    match &self.current.kind {
                        TokenKind::String(_) => {
                            self.advance();
                            break;
                        }
                        TokenKind::Semicolon => break,
                        _ => self.advance(),
                    }
                }
                self.eat_semicolon();
                return Ok(Statement::Empty);
            }
            self.restore(inner);
        }

        // Side-effect-only import: `import './module'`
        if let TokenKind::String(source) = self.current.kind.clone() {
            self.advance();
            self.eat_semicolon();
            return Ok(Statement::Import(ImportDeclaration {
                specifiers: Vec::new(),
                source,
            }));
        }

        let mut specifiers = Vec::new();

        // Default import
        if let TokenKind::Identifier(_) = &self.current.kind {
            if !self.check_ident("from") {
                let local = self.expect_identifier()?.name;
                specifiers.push(ImportSpecifier::Default { local });
                if self.check(&TokenKind::Comma) {
                    self.advance();
                }
            }
        }

        // Namespace import
        if self.check(&TokenKind::Star) {
            self.advance();
            if !self.eat_ident("as") {
                return Err(Error::SyntaxError("Expected 'as' after 'import *'".into()));
            }
            let local = self.expect_identifier()?.name;
            specifiers.push(ImportSpecifier::Namespace { local });
        }

        // Named imports
        if self.check(&TokenKind::LeftBrace) {
            self.advance();
            while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
                if self.typescript {
                    // `import { type Foo }` — erased
                    if self.check_ident("type") {
                        let inner = self.save();
                        self.advance();
                        if let TokenKind::Identifier(_) = &self.current.kind {
                            self.advance();
                            if self.eat_ident("as") {
                                self.advance();
                            }
                            if self.check(&TokenKind::Comma) {
                                self.advance();
                            }
                            continue;
                        }
                        self.restore(inner);
                    }
                }
                let imported = self.property_name()?;
                let local = if self.eat_ident("as") {
                    self.expect_identifier()?.name
                } else {
                    imported.clone()
                };
                specifiers.push(ImportSpecifier::Named { imported, local });
                if self.check(&TokenKind::Comma) {
                    self.advance();
                }
            }
            self.expect(&TokenKind::RightBrace)?;
        }

        if !self.eat_ident("from") {
            return Err(Error::SyntaxError(
                "Expected 'from' in import declaration".into(),
            ));
        }
        let source = match self.current.kind.clone() {
            TokenKind::String(s) => {
                self.advance();
                s
            }
            _ => {
                return Err(Error::SyntaxError(
                    "Expected module specifier string".into(),
                ))
            }
        };
        self.eat_semicolon();

        Ok(Statement::Import(ImportDeclaration { specifiers, source }))
    }

    fn parse_export_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'export'

        match &self.current.kind {
            TokenKind::Default => {
                self.advance();
                let declaration = match &self.current.kind {
                    TokenKind::Function => {
                        ExportDefaultKind::Function(self.parse_function(false, false)?)
                    }
                    TokenKind::Identifier(word) if word == "async" => {
                        let state = self.save();
                        self.advance();
                        if self.check(&TokenKind::Function) {
                            ExportDefaultKind::Function(self.parse_function(true, false)?)
                        } else {
                            self.restore(state);
                            let expr = self.parse_assignment()?;
                            self.eat_semicolon();
                            ExportDefaultKind::Expression(expr)
                        }
                    }
                    TokenKind::Class => ExportDefaultKind::Class(self.parse_class(false)?),
                    _ => {
                        let expr = self.parse_assignment()?;
                        self.eat_semicolon();
                        ExportDefaultKind::Expression(expr)
                    }
                };
                Ok(Statement::ExportDefault(ExportDefaultDeclaration {
                    declaration,
                }))
            }
            TokenKind::LeftBrace => {
                self.advance();
                let mut specifiers = Vec::new();
                while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
                    let local = self.property_name()?;
                    let exported = if self.eat_ident("as") {
                        self.property_name()?
                    } else {
                        local.clone()
                    };
                    specifiers.push(ExportSpecifier { local, exported });
                    if self.check(&TokenKind::Comma) {
                        self.advance();
                    }
                }
                self.expect(&TokenKind::RightBrace)?;
                if self.check_ident("from") {
                    return Err(Error::SyntaxError(
                        "`export ... from` re-exports are not supported".into(),
                    ));
                }
                self.eat_semicolon();
                Ok(Statement::ExportNamed(ExportNamedDeclaration {
                    declaration: None,
                    specifiers,
                }))
            }
            TokenKind::Star => Err(Error::SyntaxError(
                "`export *` re-exports are not supported".into(),
            )),
            TokenKind::Var
            | TokenKind::Let
            | TokenKind::Const
            | TokenKind::Function
            | TokenKind::Class => {
                let declaration = self.parse_statement()?;
                Ok(Statement::ExportNamed(ExportNamedDeclaration {
                    declaration: Some(Box::new(declaration)),
                    specifiers: Vec::new(),
                }))
            }
            TokenKind::Identifier(word) if word == "async" => {
                let declaration = self.parse_statement()?;
                Ok(Statement::ExportNamed(ExportNamedDeclaration {
                    declaration: Some(Box::new(declaration)),
                    specifiers: Vec::new(),
                }))
            }
            TokenKind::Identifier(word)
                if self.typescript && (word == "type" || word == "interface") =>
            {
                self.parse_type_declaration()
            }
            _ => Err(Error::SyntaxError(format!(
                "Unexpected token after 'export': {:?}",
                self.current.kind
            ))),
        }
    }

    // --- Helper methods ---

    pub(super) fn save(&self) -> ParserState<'a> {
        ParserState {
            scanner: self.scanner.clone(),
            current: self.current.clone(),
            previous: self.previous.clone(),
        }
    }

    pub(super) fn restore(&mut self, state: ParserState<'a>) {
        self.scanner = state.scanner;
        self.current = state.current;
        self.previous = state.previous;
    }

    pub(super) fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.scanner.next_token());
    }

    pub(super) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    /// True if the current token is the given contextual keyword.
    pub(super) fn check_ident(&self, word: &str) -> bool {
        matches!(&self.current.kind, TokenKind::Identifier(name) if name == word)
    }

    /// Consumes the given contextual keyword if present.
    pub(super) fn eat_ident(&mut self, word: &str) -> bool {
        if self.check_ident(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn expect(&mut self, kind: &TokenKind) -> Result<(), Error> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(Error::SyntaxError(format!(
                "Expected {:?}, found {:?}",
                kind, self.current.kind
            )))
        }
    }

    pub(super) fn expect_identifier(&mut self) -> Result<Identifier, Error> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let id = Identifier::new(name.clone());
            self.advance();
            Ok(id)
        } else {
            Err(Error::SyntaxError(format!(
                "Expected identifier, found {:?}",
                self.current.kind
            )))
        }
    }

    /// Reads a property-position name: an identifier or any keyword used as
    /// one (`obj.default`, `{ new: 1 }`, `export { x as default }`).
    pub(super) fn property_name(&mut self) -> Result<String, Error> {
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::String(s) => s.clone(),
            TokenKind::Number(n) => crate::runtime::value::format_number(*n),
            other => match keyword_word(other) {
                Some(word) => word.to_string(),
                None => {
                    return Err(Error::SyntaxError(format!(
                        "Expected property name, found {:?}",
                        other
                    )))
                }
            },
        };
        self.advance();
        Ok(name)
    }

    /// Consumes a `;` if present. Statement terminators are optional.
    pub(super) fn eat_semicolon(&mut self) {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// Skips to the end of the current statement (used when erasing
    /// TypeScript-only declarations).
    pub(super) fn skip_to_statement_end(&mut self) {
        let mut depth = 0usize;
        loop {
            match &self.current.kind {
                TokenKind::Eof => break,
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    break;
                }
                TokenKind::LeftBrace | TokenKind::LeftParen | TokenKind::LeftBracket => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RightBrace | TokenKind::RightParen | TokenKind::RightBracket => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        self.eat_semicolon();
                        break;
                    }
                }
                _ => self.advance(),
            }
        }
    }

    pub(super) fn is_at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }
}

/// Converts a parsed (necessarily named) function into a declaration node.
fn function_declaration(func: FunctionExpression) -> Result<FunctionDeclaration, Error> {
    let id = func
        .id
        .ok_or_else(|| Error::SyntaxError("Expected function name".into()))?;
    Ok(FunctionDeclaration {
        id,
        params: func.params,
        body: func.body,
        is_async: func.is_async,
    })
}

/// Maps a keyword token back to its source word, for property positions.
fn keyword_word(kind: &TokenKind) -> Option<&'static str> {
    let word = match kind {
        TokenKind::Var => "var",
        TokenKind::Let => "let",
        TokenKind::Const => "const",
        TokenKind::Function => "function",
        TokenKind::Class => "class",
        TokenKind::Return => "return",
        TokenKind::If => "if",
        TokenKind::Else => "else",
        TokenKind::While => "while",
        TokenKind::Do => "do",
        TokenKind::For => "for",
        TokenKind::Break => "break",
        TokenKind::Continue => "continue",
        TokenKind::Throw => "throw",
        TokenKind::Try => "try",
        TokenKind::Catch => "catch",
        TokenKind::Finally => "finally",
        TokenKind::New => "new",
        TokenKind::Delete => "delete",
        TokenKind::Typeof => "typeof",
        TokenKind::Void => "void",
        TokenKind::In => "in",
        TokenKind::Instanceof => "instanceof",
        TokenKind::This => "this",
        TokenKind::True => "true",
        TokenKind::False => "false",
        TokenKind::Null => "null",
        TokenKind::Undefined => "undefined",
        TokenKind::Import => "import",
        TokenKind::Export => "export",
        TokenKind::Default => "default",
        _ => return None,
    };
    Some(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variable_declaration() {
        let mut parser = Parser::new("let x = 42;");
        let program = parser.parse_program().unwrap();
        assert_eq!(program.body.len(), 1);
        assert!(matches!(program.body[0], Statement::VariableDeclaration(_)));
    }

    #[test]
    fn test_parse_without_semicolons() {
        let mut parser = Parser::new("const x = 1\nconst y = 2\nx + y");
        let program = parser.parse_program().unwrap();
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn test_parse_function_declaration() {
        let mut parser = Parser::new("function add(a, b) { return a + b; }");
        let program = parser.parse_program().unwrap();
        assert_eq!(program.body.len(), 1);
        assert!(matches!(program.body[0], Statement::FunctionDeclaration(_)));
    }

    #[test]
    fn test_parse_class_declaration() {
        let mut parser = Parser::new(
            "class Counter { constructor() { this.n = 0 } tick() { this.n++ } static make() { return new Counter() } }",
        );
        let program = parser.parse_program().unwrap();
        match &program.body[0] {
            Statement::ClassDeclaration(class) => {
                assert_eq!(class.id.as_ref().unwrap().name, "Counter");
                assert_eq!(class.body.len(), 3);
                assert!(class.body[0].is_constructor);
                assert!(class.body[2].is_static);
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_import_forms() {
        let source = r#"
            import './side-effect';
            import def from './a';
            import * as ns from './b';
            import { x, y as z } from './c';
            import def2, { w } from './d';
        "#;
        let program = Parser::new(source).parse_program().unwrap();
        assert_eq!(program.body.len(), 5);
        for stmt in &program.body {
            assert!(matches!(stmt, Statement::Import(_)));
        }
        match &program.body[3] {
            Statement::Import(import) => {
                assert_eq!(import.source, "./c");
                assert_eq!(import.specifiers.len(), 2);
                assert_eq!(
                    import.specifiers[1],
                    ImportSpecifier::Named {
                        imported: "y".into(),
                        local: "z".into()
                    }
                );
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_export_forms() {
        let source = r#"
            export const a = 1, b = 2;
            export function f() {}
            export { a, b as c };
            export default function g() {}
        "#;
        let program = Parser::new(source).parse_program().unwrap();
        assert_eq!(program.body.len(), 4);
        assert!(matches!(program.body[0], Statement::ExportNamed(_)));
        assert!(matches!(program.body[1], Statement::ExportNamed(_)));
        assert!(matches!(program.body[2], Statement::ExportNamed(_)));
        assert!(matches!(program.body[3], Statement::ExportDefault(_)));
    }

    #[test]
    fn test_parse_export_default_expression() {
        let program = Parser::new("export default { a: 1 };").parse_program().unwrap();
        match &program.body[0] {
            Statement::ExportDefault(export) => {
                assert!(matches!(
                    export.declaration,
                    ExportDefaultKind::Expression(_)
                ));
            }
            _ => panic!("expected default export"),
        }
    }

    #[test]
    fn test_reexport_is_rejected() {
        assert!(Parser::new("export * from './a';").parse_program().is_err());
        assert!(Parser::new("export { x } from './a';")
            .parse_program()
            .is_err());
    }

    #[test]
    fn test_parse_for_of() {
        let program = Parser::new("for (const x of xs) { x; }").parse_program().unwrap();
        assert!(matches!(program.body[0], Statement::ForOf(_)));
    }

    #[test]
    fn test_parse_dynamic_import_statement() {
        let program = Parser::new("import('./mod');").parse_program().unwrap();
        match &program.body[0] {
            Statement::Expression(stmt) => {
                assert!(matches!(stmt.expression, Expression::DynamicImport(_)));
            }
            other => panic!("expected expression statement, got {:?}", other),
        }
    }
}
