//! Expression parsing.

use crate::ast::*;
use crate::lexer::TokenKind;
use crate::Error;

use super::parser::Parser;

impl<'a> Parser<'a> {
    /// Parses an expression (assignment level; no comma operator).
    pub fn parse_expression(&mut self) -> Result<Expression, Error> {
        self.parse_assignment()
    }

    /// Parses an expression including the comma operator.
    pub(super) fn parse_sequence(&mut self) -> Result<Expression, Error> {
        let first = self.parse_assignment()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut expressions = vec![first];
        while self.check(&TokenKind::Comma) {
            self.advance();
            expressions.push(self.parse_assignment()?);
        }
        Ok(Expression::Sequence(SequenceExpression { expressions }))
    }

    pub(super) fn parse_assignment(&mut self) -> Result<Expression, Error> {
        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }

        let expr = self.parse_conditional()?;

        let operator = match &self.current.kind {
            TokenKind::Equal => AssignmentOperator::Assign,
            TokenKind::PlusEqual => AssignmentOperator::AddAssign,
            TokenKind::MinusEqual => AssignmentOperator::SubtractAssign,
            TokenKind::StarEqual => AssignmentOperator::MultiplyAssign,
            TokenKind::SlashEqual => AssignmentOperator::DivideAssign,
            TokenKind::PercentEqual => AssignmentOperator::ModuloAssign,
            _ => return Ok(expr),
        };

        if !matches!(expr, Expression::Identifier(_) | Expression::Member(_)) {
            return Err(Error::SyntaxError(
                "Invalid assignment target".into(),
            ));
        }

        self.advance();
        let value = self.parse_assignment()?;
        Ok(Expression::Assignment(AssignmentExpression {
            operator,
            left: Box::new(expr),
            right: Box::new(value),
        }))
    }

    /// Attempts to parse an arrow function at the current position,
    /// backtracking on failure. Covers `x => e`, `() => e`, and
    /// `(a, b) => e` with TypeScript parameter trivia.
    fn try_parse_arrow(&mut self) -> Result<Option<Expression>, Error> {
        let start = self.save();
        let is_async = if self.check_ident("async") {
            self.advance();
            true
        } else {
            false
        };

        match self.current.kind.clone() {
            TokenKind::Identifier(name) => {
                let param = Identifier::new(name);
                self.advance();
                if self.check(&TokenKind::Arrow) {
                    self.advance();
                    let body = self.parse_arrow_body()?;
                    return Ok(Some(Expression::Arrow(ArrowFunctionExpression {
                        params: vec![param],
                        body,
                        is_async,
                    })));
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                if let Ok(params) = self.try_finish_arrow_params() {
                    if self.check(&TokenKind::Arrow) {
                        self.advance();
                        let body = self.parse_arrow_body()?;
                        return Ok(Some(Expression::Arrow(ArrowFunctionExpression {
                            params,
                            body,
                            is_async,
                        })));
                    }
                }
            }
            _ => {}
        }

        self.restore(start);
        Ok(None)
    }

    /// Parses the inside of a candidate arrow parameter list, including the
    /// closing parenthesis and an optional return-type annotation.
    fn try_finish_arrow_params(&mut self) -> Result<Vec<Identifier>, Error> {
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
        self.expect(&TokenKind::RightParen)?;
        if self.typescript && self.check(&TokenKind::Colon) {
            self.skip_type_annotation();
        }
        Ok(params)
    }

    fn parse_arrow_body(&mut self) -> Result<ArrowBody, Error> {
        if self.check(&TokenKind::LeftBrace) {
            self.advance();
            let body = self.parse_until_right_brace()?;
            self.expect(&TokenKind::RightBrace)?;
            Ok(ArrowBody::Block(body))
        } else {
            Ok(ArrowBody::Expression(Box::new(self.parse_assignment()?)))
        }
    }

    fn parse_conditional(&mut self) -> Result<Expression, Error> {
        let test = self.parse_nullish()?;

        if self.check(&TokenKind::Question) {
            self.advance();
            let consequent = self.parse_assignment()?;
            self.expect(&TokenKind::Colon)?;
            let alternate = self.parse_assignment()?;
            return Ok(Expression::Conditional(ConditionalExpression {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            }));
        }

        Ok(test)
    }

    fn parse_nullish(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_logical_or()?;
        while self.check(&TokenKind::QuestionQuestion) {
            self.advance();
            let right = self.parse_logical_or()?;
            left = binary(BinaryOperator::NullishCoalescing, left, right);
        }
        Ok(left)
    }

    fn parse_logical_or(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_logical_and()?;
        while self.check(&TokenKind::PipePipe) {
            self.advance();
            let right = self.parse_logical_and()?;
            left = binary(BinaryOperator::LogicalOr, left, right);
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_bitwise_or()?;
        while self.check(&TokenKind::AmpersandAmpersand) {
            self.advance();
            let right = self.parse_bitwise_or()?;
            left = binary(BinaryOperator::LogicalAnd, left, right);
        }
        Ok(left)
    }

    fn parse_bitwise_or(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_bitwise_xor()?;
        while self.check(&TokenKind::Pipe) {
            self.advance();
            let right = self.parse_bitwise_xor()?;
            left = binary(BinaryOperator::BitwiseOr, left, right);
        }
        Ok(left)
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_bitwise_and()?;
        while self.check(&TokenKind::Caret) {
            self.advance();
            let right = self.parse_bitwise_and()?;
            left = binary(BinaryOperator::BitwiseXor, left, right);
        }
        Ok(left)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_equality()?;
        while self.check(&TokenKind::Ampersand) {
            self.advance();
            let right = self.parse_equality()?;
            left = binary(BinaryOperator::BitwiseAnd, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_relational()?;
        loop {
            let operator = match &self.current.kind {
                TokenKind::EqualEqual => BinaryOperator::Equal,
                TokenKind::NotEqual => BinaryOperator::NotEqual,
                TokenKind::StrictEqual => BinaryOperator::StrictEqual,
                TokenKind::StrictNotEqual => BinaryOperator::StrictNotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_shift()?;
        loop {
            let operator = match &self.current.kind {
                TokenKind::LessThan => BinaryOperator::LessThan,
                TokenKind::LessThanEqual => BinaryOperator::LessThanEqual,
                TokenKind::GreaterThan => BinaryOperator::GreaterThan,
                TokenKind::GreaterThanEqual => BinaryOperator::GreaterThanEqual,
                TokenKind::In => BinaryOperator::In,
                TokenKind::Instanceof => BinaryOperator::InstanceOf,
                _ => break,
            };
            self.advance();
            let right = self.parse_shift()?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_additive()?;
        loop {
            let operator = match &self.current.kind {
                TokenKind::LessLess => BinaryOperator::LeftShift,
                TokenKind::GreaterGreater => BinaryOperator::RightShift,
                TokenKind::GreaterGreaterGreater => BinaryOperator::UnsignedRightShift,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let operator = match &self.current.kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_exponent()?;
        loop {
            let operator = match &self.current.kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_exponent()?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    fn parse_exponent(&mut self) -> Result<Expression, Error> {
        let left = self.parse_unary()?;
        if self.check(&TokenKind::StarStar) {
            self.advance();
            // Right-associative
            let right = self.parse_exponent()?;
            return Ok(binary(BinaryOperator::Exponent, left, right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, Error> {
        let operator = match &self.current.kind {
            TokenKind::Bang => Some(UnaryOperator::LogicalNot),
            TokenKind::Minus => Some(UnaryOperator::Minus),
            TokenKind::Plus => Some(UnaryOperator::Plus),
            TokenKind::Tilde => Some(UnaryOperator::BitwiseNot),
            TokenKind::Typeof => Some(UnaryOperator::Typeof),
            TokenKind::Void => Some(UnaryOperator::Void),
            TokenKind::Delete => Some(UnaryOperator::Delete),
            _ => None,
        };

        if let Some(op) = operator {
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(Expression::Unary(UnaryExpression {
                operator: op,
                argument: Box::new(argument),
            }));
        }

        if self.check(&TokenKind::PlusPlus) || self.check(&TokenKind::MinusMinus) {
            let operator = if self.check(&TokenKind::PlusPlus) {
                UpdateOperator::Increment
            } else {
                UpdateOperator::Decrement
            };
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(Expression::Update(UpdateExpression {
                operator,
                argument: Box::new(argument),
                prefix: true,
            }));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_call()?;

        if self.check(&TokenKind::PlusPlus) || self.check(&TokenKind::MinusMinus) {
            let operator = if self.check(&TokenKind::PlusPlus) {
                UpdateOperator::Increment
            } else {
                UpdateOperator::Decrement
            };
            self.advance();
            expr = Expression::Update(UpdateExpression {
                operator,
                argument: Box::new(expr),
                prefix: false,
            });
        }

        // `value as Type` assertions are erased
        while self.typescript && self.check_ident("as") {
            self.advance();
            self.skip_type();
        }

        Ok(expr)
    }

    fn parse_call(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(&TokenKind::LeftParen) {
                self.advance();
                let arguments = self.parse_arguments()?;
                self.expect(&TokenKind::RightParen)?;
                expr = Expression::Call(CallExpression {
                    callee: Box::new(expr),
                    arguments,
                });
            } else if self.check(&TokenKind::Dot) {
                self.advance();
                let property = self.property_name()?;
                expr = Expression::Member(MemberExpression {
                    object: Box::new(expr),
                    property: MemberProperty::Identifier(Identifier::new(property)),
                });
            } else if self.check(&TokenKind::LeftBracket) {
                self.advance();
                let property = self.parse_sequence()?;
                self.expect(&TokenKind::RightBracket)?;
                expr = Expression::Member(MemberExpression {
                    object: Box::new(expr),
                    property: MemberProperty::Expression(Box::new(property)),
                });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, Error> {
        let mut args = Vec::new();

        if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.parse_assignment()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        match self.current.kind.clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expression::Literal(Literal::Number(n)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expression::Literal(Literal::String(s)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expression::Literal(Literal::Null))
            }
            TokenKind::Undefined => {
                self.advance();
                Ok(Expression::Literal(Literal::Undefined))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expression::Identifier(Identifier::new(name)))
            }
            TokenKind::This => {
                self.advance();
                Ok(Expression::This)
            }
            TokenKind::Function => {
                let func = self.parse_function(false, false)?;
                Ok(Expression::Function(func))
            }
            TokenKind::New => {
                self.advance();
                let callee = self.parse_new_callee()?;
                let arguments = if self.check(&TokenKind::LeftParen) {
                    self.advance();
                    let args = self.parse_arguments()?;
                    self.expect(&TokenKind::RightParen)?;
                    args
                } else {
                    Vec::new()
                };
                Ok(Expression::New(NewExpression {
                    callee: Box::new(callee),
                    arguments,
                }))
            }
            TokenKind::Import => {
                self.advance();
                self.expect(&TokenKind::LeftParen)?;
                let specifier = self.parse_assignment()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(Expression::DynamicImport(Box::new(specifier)))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_sequence()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expr)
            }
            TokenKind::LeftBracket => self.parse_array_literal(),
            TokenKind::LeftBrace => self.parse_object_literal(),
            other => Err(Error::SyntaxError(format!(
                "Unexpected token: {:?}",
                other
            ))),
        }
    }

    /// Parses the callee of a `new` expression: member chains only, so that
    /// `new Foo().bar()` groups as `(new Foo()).bar()`.
    fn parse_new_callee(&mut self) -> Result<Expression, Error> {
        let mut expr = match self.current.kind.clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Expression::Identifier(Identifier::new(name))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_sequence()?;
                self.expect(&TokenKind::RightParen)?;
                inner
            }
            other => {
                return Err(Error::SyntaxError(format!(
                    "Unexpected token after 'new': {:?}",
                    other
                )))
            }
        };

        loop {
            if self.check(&TokenKind::Dot) {
                self.advance();
                let property = self.property_name()?;
                expr = Expression::Member(MemberExpression {
                    object: Box::new(expr),
                    property: MemberProperty::Identifier(Identifier::new(property)),
                });
            } else if self.check(&TokenKind::LeftBracket) {
                self.advance();
                let property = self.parse_sequence()?;
                self.expect(&TokenKind::RightBracket)?;
                expr = Expression::Member(MemberExpression {
                    object: Box::new(expr),
                    property: MemberProperty::Expression(Box::new(property)),
                });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_array_literal(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume '['
        let mut elements = Vec::new();

        while !self.check(&TokenKind::RightBracket) && !self.is_at_end() {
            if self.check(&TokenKind::Comma) {
                elements.push(None); // Hole in array
                self.advance();
                continue;
            }
            elements.push(Some(self.parse_assignment()?));
            if !self.check(&TokenKind::RightBracket) {
                self.expect(&TokenKind::Comma)?;
            }
        }

        self.expect(&TokenKind::RightBracket)?;

        Ok(Expression::Array(ArrayExpression { elements }))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume '{'
        let mut properties = Vec::new();

        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            let property = match self.current.kind.clone() {
                TokenKind::String(s) => {
                    self.advance();
                    self.expect(&TokenKind::Colon)?;
                    let value = self.parse_assignment()?;
                    Property {
                        key: PropertyKey::Literal(Literal::String(s)),
                        value,
                        shorthand: false,
                    }
                }
                TokenKind::Number(n) => {
                    self.advance();
                    self.expect(&TokenKind::Colon)?;
                    let value = self.parse_assignment()?;
                    Property {
                        key: PropertyKey::Literal(Literal::Number(n)),
                        value,
                        shorthand: false,
                    }
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let key = self.parse_assignment()?;
                    self.expect(&TokenKind::RightBracket)?;
                    self.expect(&TokenKind::Colon)?;
                    let value = self.parse_assignment()?;
                    Property {
                        key: PropertyKey::Computed(Box::new(key)),
                        value,
                        shorthand: false,
                    }
                }
                _ => {
                    let name = self.property_name()?;
                    if self.check(&TokenKind::Colon) {
                        self.advance();
                        let value = self.parse_assignment()?;
                        Property {
                            key: PropertyKey::Identifier(Identifier::new(name)),
                            value,
                            shorthand: false,
                        }
                    } else {
                        // Shorthand `{ a }`
                        Property {
                            key: PropertyKey::Identifier(Identifier::new(name.clone())),
                            value: Expression::Identifier(Identifier::new(name)),
                            shorthand: true,
                        }
                    }
                }
            };
            properties.push(property);

            if !self.check(&TokenKind::RightBrace) {
                self.expect(&TokenKind::Comma)?;
            }
        }

        self.expect(&TokenKind::RightBrace)?;

        Ok(Expression::Object(ObjectExpression { properties }))
    }
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn expr(source: &str) -> Expression {
        let mut parser = Parser::new(source);
        let program = parser.parse_program().unwrap();
        match program.body.into_iter().next().unwrap() {
            Statement::Expression(stmt) => stmt.expression,
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_binary_precedence() {
        match expr("1 + 2 * 3") {
            Expression::Binary(b) => {
                assert_eq!(b.operator, BinaryOperator::Add);
                assert!(matches!(*b.right, Expression::Binary(_)));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_arrow_functions() {
        assert!(matches!(expr("x => x + 1"), Expression::Arrow(_)));
        assert!(matches!(expr("() => 1"), Expression::Arrow(_)));
        assert!(matches!(expr("(a, b) => { return a; }"), Expression::Arrow(_)));
    }

    #[test]
    fn test_parenthesized_is_not_arrow() {
        assert!(matches!(expr("(a + b) * 2"), Expression::Binary(_)));
    }

    #[test]
    fn test_parse_member_chain() {
        assert!(matches!(expr("a.b.c[0]"), Expression::Member(_)));
    }

    #[test]
    fn test_parse_object_shorthand() {
        match expr("({ a, b: 2 })") {
            Expression::Object(obj) => {
                assert_eq!(obj.properties.len(), 2);
                assert!(obj.properties[0].shorthand);
                assert!(!obj.properties[1].shorthand);
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_conditional() {
        assert!(matches!(expr("a ? 1 : 2"), Expression::Conditional(_)));
    }

    #[test]
    fn test_parse_new_member_grouping() {
        // `new Counter().tick()` calls tick on the new instance
        match expr("new Counter().tick()") {
            Expression::Call(call) => {
                assert!(matches!(*call.callee, Expression::Member(_)));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }
}
