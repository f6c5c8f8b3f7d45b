//! TypeScript type erasure.
//!
//! The parser does not build a type representation: TypeScript syntax is
//! recognized and skipped, producing the same AST the equivalent JavaScript
//! would. Covered here: `: type` annotations, optional-parameter `?`,
//! generic parameter/argument lists, `as` assertions, and whole
//! `type`/`interface` declarations. Enums, namespaces and decorators are not
//! handled.

use crate::ast::Statement;
use crate::lexer::TokenKind;
use crate::Error;

use super::parser::Parser;

impl<'a> Parser<'a> {
    /// Skips `: type` if present.
    pub(super) fn skip_type_annotation(&mut self) {
        if self.check(&TokenKind::Colon) {
            self.advance();
            self.skip_type();
        }
    }

    /// Skips one complete type expression: atoms joined by `|`, `&` and
    /// `=>`, each with optional generic-argument and array suffixes.
    pub(super) fn skip_type(&mut self) {
        loop {
            self.skip_type_atom();

            // Array suffixes: `number[]`, `string[][]`
            while self.check(&TokenKind::LeftBracket) {
                self.skip_balanced(&TokenKind::LeftBracket, &TokenKind::RightBracket);
            }

            match &self.current.kind {
                TokenKind::Pipe | TokenKind::Ampersand | TokenKind::Arrow => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn skip_type_atom(&mut self) {
        match &self.current.kind {
            TokenKind::LeftParen => {
                self.skip_balanced(&TokenKind::LeftParen, &TokenKind::RightParen);
            }
            TokenKind::LeftBrace => {
                self.skip_balanced(&TokenKind::LeftBrace, &TokenKind::RightBrace);
            }
            TokenKind::LeftBracket => {
                self.skip_balanced(&TokenKind::LeftBracket, &TokenKind::RightBracket);
            }
            TokenKind::String(_)
            | TokenKind::Number(_)
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::Undefined
            | TokenKind::Void
            | TokenKind::This
            | TokenKind::New
            | TokenKind::Typeof => {
                self.advance();
                // `typeof x`, `new () => T`
                if matches!(self.previous.kind, TokenKind::Typeof)
                    && matches!(self.current.kind, TokenKind::Identifier(_))
                {
                    self.advance();
                }
            }
            TokenKind::Identifier(_) => {
                self.advance();
                // Qualified names: `ns.Type`
                while self.check(&TokenKind::Dot) {
                    self.advance();
                    if matches!(self.current.kind, TokenKind::Identifier(_)) {
                        self.advance();
                    }
                }
                // Generic arguments: `Map<string, number>`
                if self.check(&TokenKind::LessThan) {
                    self.skip_type_parameters();
                }
            }
            _ => {
                // Defensive single-token skip so malformed types cannot hang
                // the parser; the next real token produces the actual error.
                self.advance();
            }
        }
    }

    /// Skips a `<...>` generic parameter or argument list. The scanner folds
    /// `>>` and `>>>` into shift tokens, so depth is adjusted accordingly.
    pub(super) fn skip_type_parameters(&mut self) {
        debug_assert!(self.check(&TokenKind::LessThan));
        let mut depth: isize = 0;
        loop {
            match &self.current.kind {
                TokenKind::Eof => break,
                TokenKind::LessThan => depth += 1,
                TokenKind::GreaterThan => depth -= 1,
                TokenKind::GreaterGreater => depth -= 2,
                TokenKind::GreaterGreaterGreater => depth -= 3,
                _ => {}
            }
            self.advance();
            if depth <= 0 {
                break;
            }
        }
    }

    fn skip_balanced(&mut self, open: &TokenKind, close: &TokenKind) {
        debug_assert!(self.check(open));
        let mut depth = 0usize;
        loop {
            if self.check(open) {
                depth += 1;
            } else if self.check(close) {
                depth -= 1;
            } else if self.is_at_end() {
                break;
            }
            self.advance();
            if depth == 0 {
                break;
            }
        }
    }

    /// Erases a whole `type Foo = ...;` or `interface Foo { ... }`
    /// declaration, yielding an empty statement.
    pub(super) fn parse_type_declaration(&mut self) -> Result<Statement, Error> {
        self.skip_to_statement_end();
        Ok(Statement::Empty)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Program, Statement};
    use crate::parser::Parser;

    fn parse_ts(src: &str) -> Program {
        let mut parser = Parser::new_typescript(src);
        parser.parse_program().expect("Should parse")
    }

    #[test]
    fn test_parse_ts_variable_annotation() {
        let program = parse_ts("let x: number = 42;");
        assert_eq!(program.body.len(), 1);
        assert!(matches!(program.body[0], Statement::VariableDeclaration(_)));
    }

    #[test]
    fn test_parse_ts_function_types() {
        let program = parse_ts("function add(a: number, b: number): number { return a + b; }");
        assert_eq!(program.body.len(), 1);
        assert!(matches!(program.body[0], Statement::FunctionDeclaration(_)));
    }

    #[test]
    fn test_parse_ts_generic_function() {
        let program = parse_ts("function identity<T>(x: T): T { return x; }");
        assert_eq!(program.body.len(), 1);
        assert!(matches!(program.body[0], Statement::FunctionDeclaration(_)));
    }

    #[test]
    fn test_parse_ts_type_alias_skipped() {
        let program = parse_ts("type ID = string | number;");
        assert_eq!(program.body.len(), 1);
        assert!(matches!(program.body[0], Statement::Empty));
    }

    #[test]
    fn test_parse_ts_interface_skipped() {
        let program = parse_ts("interface User { name: string; age: number; }");
        assert_eq!(program.body.len(), 1);
        assert!(matches!(program.body[0], Statement::Empty));
    }

    #[test]
    fn test_parse_ts_union_type() {
        let program = parse_ts("let value: string | number = 'hello';");
        assert_eq!(program.body.len(), 1);
        assert!(matches!(program.body[0], Statement::VariableDeclaration(_)));
    }

    #[test]
    fn test_parse_ts_object_type() {
        let program = parse_ts("let obj: { x: number; y: string } = { x: 1, y: 'a' };");
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn test_parse_ts_function_type() {
        let program = parse_ts("let fn: (x: number) => string = (x) => 'n';");
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn test_parse_ts_generic_arguments() {
        let program = parse_ts("let pairs: Map<string, Array<number>> = x;");
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn test_parse_ts_as_assertion() {
        let program = parse_ts("let x = value as string;");
        assert_eq!(program.body.len(), 1);
        assert!(matches!(program.body[0], Statement::VariableDeclaration(_)));
    }

    #[test]
    fn test_parse_ts_optional_param() {
        let program = parse_ts("function greet(name?: string) { }");
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn test_parse_ts_type_only_import_erased() {
        let program = parse_ts("import type { Foo } from './types';");
        assert_eq!(program.body.len(), 1);
        assert!(matches!(program.body[0], Statement::Empty));
    }

    #[test]
    fn test_parse_ts_mixed_with_js() {
        let program = parse_ts(
            r#"
            type ID = number;
            interface User { name: string; }

            function greet(name: string): void {
                console.log('Hello, ' + name);
            }

            greet('World');
        "#,
        );
        assert_eq!(program.body.len(), 4);
        assert!(matches!(program.body[2], Statement::FunctionDeclaration(_)));
    }
}
