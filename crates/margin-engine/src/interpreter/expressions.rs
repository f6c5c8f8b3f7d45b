//! Expression evaluation.

use std::rc::Rc;

use crate::ast::*;
use crate::runtime::environment::SetOutcome;
use crate::runtime::function::FunctionBody;
use crate::runtime::object::{self, JsObject};
use crate::runtime::{JsFunction, Value};
use crate::Error;

use super::methods;
use super::Interpreter;

impl Interpreter {
    /// Evaluates an expression.
    pub fn evaluate(&mut self, expr: &Expression) -> Result<Value, Error> {
        match expr {
            Expression::Literal(literal) => Ok(evaluate_literal(literal)),

            Expression::Identifier(id) => self.env.get(&id.name).ok_or_else(|| {
                Error::ReferenceError(format!("{} is not defined", id.name))
            }),

            Expression::This => Ok(self.current_this()),

            Expression::Array(array) => {
                let mut elements = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    elements.push(match element {
                        Some(expr) => self.evaluate(expr)?,
                        None => Value::Undefined,
                    });
                }
                Ok(Value::Object(JsObject::array(elements)))
            }

            Expression::Object(object) => {
                let result = JsObject::plain();
                for property in &object.properties {
                    let key = match &property.key {
                        PropertyKey::Identifier(id) => id.name.clone(),
                        PropertyKey::Literal(literal) => evaluate_literal(literal).to_js_string(),
                        PropertyKey::Computed(expr) => self.evaluate(expr)?.to_js_string(),
                    };
                    let value = self.evaluate(&property.value)?;
                    result.borrow_mut().set(&key, value);
                }
                Ok(Value::Object(result))
            }

            Expression::Binary(binary) => self.evaluate_binary(binary),
            Expression::Unary(unary) => self.evaluate_unary(unary),
            Expression::Assignment(assign) => self.evaluate_assignment(assign),
            Expression::Update(update) => self.evaluate_update(update),

            Expression::Conditional(cond) => {
                if self.evaluate(&cond.test)?.to_boolean() {
                    self.evaluate(&cond.consequent)
                } else {
                    self.evaluate(&cond.alternate)
                }
            }

            Expression::Sequence(seq) => {
                let mut result = Value::Undefined;
                for expr in &seq.expressions {
                    result = self.evaluate(expr)?;
                }
                Ok(result)
            }

            Expression::Member(member) => {
                let object = self.evaluate(&member.object)?;
                let key = self.member_key(&member.property)?;
                self.get_member(&object, &key)
            }

            Expression::Call(call) => self.evaluate_call(call),

            Expression::New(new_expr) => {
                let callee = self.evaluate(&new_expr.callee)?;
                let mut args = Vec::with_capacity(new_expr.arguments.len());
                for arg in &new_expr.arguments {
                    args.push(self.evaluate(arg)?);
                }
                match callee {
                    Value::Function(func) => self.construct(&func, &args),
                    other => Err(Error::TypeError(format!(
                        "{} is not a constructor",
                        other.to_js_string()
                    ))),
                }
            }

            Expression::Function(func) => {
                let value = self.make_function(
                    func.id.as_ref().map(|id| id.name.clone()),
                    func.params.clone(),
                    func.body.clone(),
                );
                Ok(Value::Function(value))
            }

            Expression::Arrow(arrow) => {
                let body = match &arrow.body {
                    ArrowBody::Expression(expr) => FunctionBody::Expression((**expr).clone()),
                    ArrowBody::Block(stmts) => FunctionBody::Block(stmts.clone()),
                };
                Ok(Value::Function(JsFunction::arrow(
                    arrow.params.iter().map(|p| p.name.clone()).collect(),
                    body,
                    self.env.clone(),
                    self.current_this(),
                )))
            }

            Expression::DynamicImport(_) => Err(Error::Internal(
                "import() is only available through module evaluation".into(),
            )),
        }
    }

    fn evaluate_binary(&mut self, binary: &BinaryExpression) -> Result<Value, Error> {
        // Short-circuiting operators evaluate the right side conditionally.
        match binary.operator {
            BinaryOperator::LogicalAnd => {
                let left = self.evaluate(&binary.left)?;
                if !left.to_boolean() {
                    return Ok(left);
                }
                return self.evaluate(&binary.right);
            }
            BinaryOperator::LogicalOr => {
                let left = self.evaluate(&binary.left)?;
                if left.to_boolean() {
                    return Ok(left);
                }
                return self.evaluate(&binary.right);
            }
            BinaryOperator::NullishCoalescing => {
                let left = self.evaluate(&binary.left)?;
                if !left.is_nullish() {
                    return Ok(left);
                }
                return self.evaluate(&binary.right);
            }
            _ => {}
        }

        let left = self.evaluate(&binary.left)?;
        let right = self.evaluate(&binary.right)?;
        apply_binary(binary.operator, left, right)
    }

    fn evaluate_unary(&mut self, unary: &UnaryExpression) -> Result<Value, Error> {
        match unary.operator {
            UnaryOperator::Typeof => {
                // `typeof missing` is "undefined", not a ReferenceError
                if let Expression::Identifier(id) = &*unary.argument {
                    return Ok(Value::String(
                        self.env
                            .get(&id.name)
                            .map(|v| v.type_of())
                            .unwrap_or("undefined")
                            .to_string(),
                    ));
                }
                let value = self.evaluate(&unary.argument)?;
                Ok(Value::String(value.type_of().to_string()))
            }
            UnaryOperator::Delete => {
                if let Expression::Member(member) = &*unary.argument {
                    let object = self.evaluate(&member.object)?;
                    let key = self.member_key(&member.property)?;
                    if let Value::Object(obj) = object {
                        let mut borrowed = obj.borrow_mut();
                        if borrowed.is_array() {
                            if let Ok(index) = key.parse::<usize>() {
                                if index < borrowed.elements.len() {
                                    borrowed.elements[index] = Value::Undefined;
                                }
                            }
                        }
                        borrowed.properties.remove(&key);
                    }
                }
                Ok(Value::Boolean(true))
            }
            UnaryOperator::Void => {
                self.evaluate(&unary.argument)?;
                Ok(Value::Undefined)
            }
            operator => {
                let value = self.evaluate(&unary.argument)?;
                Ok(match operator {
                    UnaryOperator::Minus => Value::Number(-value.to_number()),
                    UnaryOperator::Plus => Value::Number(value.to_number()),
                    UnaryOperator::LogicalNot => Value::Boolean(!value.to_boolean()),
                    UnaryOperator::BitwiseNot => Value::Number(!to_int32(value.to_number()) as f64),
                    _ => unreachable!("handled above"),
                })
            }
        }
    }

    fn evaluate_assignment(&mut self, assign: &AssignmentExpression) -> Result<Value, Error> {
        let value = match assign.operator {
            AssignmentOperator::Assign => self.evaluate(&assign.right)?,
            compound => {
                let current = self.evaluate(&assign.left)?;
                let right = self.evaluate(&assign.right)?;
                let operator = match compound {
                    AssignmentOperator::AddAssign => BinaryOperator::Add,
                    AssignmentOperator::SubtractAssign => BinaryOperator::Subtract,
                    AssignmentOperator::MultiplyAssign => BinaryOperator::Multiply,
                    AssignmentOperator::DivideAssign => BinaryOperator::Divide,
                    AssignmentOperator::ModuloAssign => BinaryOperator::Modulo,
                    AssignmentOperator::Assign => unreachable!(),
                };
                apply_binary(operator, current, right)?
            }
        };

        match &*assign.left {
            Expression::Identifier(id) => match self.env.set(&id.name, value.clone()) {
                SetOutcome::Assigned => Ok(value),
                SetOutcome::Immutable => Err(Error::TypeError(
                    "Assignment to constant variable.".into(),
                )),
                SetOutcome::NotFound => Err(Error::ReferenceError(format!(
                    "{} is not defined",
                    id.name
                ))),
            },
            Expression::Member(member) => {
                let object = self.evaluate(&member.object)?;
                let key = self.member_key(&member.property)?;
                match object {
                    Value::Object(obj) => {
                        object::set_property(&obj, &key, value.clone());
                        Ok(value)
                    }
                    Value::Function(func) => {
                        func.set_property(&key, value.clone());
                        Ok(value)
                    }
                    other => Err(Error::TypeError(format!(
                        "Cannot set properties of {}",
                        other.type_of()
                    ))),
                }
            }
            _ => Err(Error::SyntaxError("Invalid assignment target".into())),
        }
    }

    fn evaluate_update(&mut self, update: &UpdateExpression) -> Result<Value, Error> {
        let old = self.evaluate(&update.argument)?.to_number();
        let delta = match update.operator {
            UpdateOperator::Increment => 1.0,
            UpdateOperator::Decrement => -1.0,
        };
        let new = Value::Number(old + delta);

        let write = AssignmentExpression {
            operator: AssignmentOperator::Assign,
            left: update.argument.clone(),
            right: Box::new(Expression::Literal(Literal::Number(old + delta))),
        };
        self.evaluate_assignment(&write)?;

        Ok(if update.prefix {
            new
        } else {
            Value::Number(old)
        })
    }

    fn evaluate_call(&mut self, call: &CallExpression) -> Result<Value, Error> {
        let mut args = Vec::with_capacity(call.arguments.len());

        if let Expression::Member(member) = &*call.callee {
            let object = self.evaluate(&member.object)?;
            let key = self.member_key(&member.property)?;
            for arg in &call.arguments {
                args.push(self.evaluate(arg)?);
            }
            return self.call_method(object, &key, &args);
        }

        let callee = self.evaluate(&call.callee)?;
        for arg in &call.arguments {
            args.push(self.evaluate(arg)?);
        }
        match callee {
            Value::Function(func) => self.call_function(&func, Value::Undefined, &args),
            other => Err(Error::TypeError(format!(
                "{} is not a function",
                other.to_js_string()
            ))),
        }
    }

    /// Invokes `object.key(args)`, dispatching to builtin methods for
    /// primitives and arrays when no own property matches.
    pub fn call_method(
        &mut self,
        object: Value,
        key: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match &object {
            Value::Object(obj) => {
                if let Some(member) = object::get_property(obj, key) {
                    return match member {
                        Value::Function(func) => self.call_function(&func, object.clone(), args),
                        other => Err(Error::TypeError(format!(
                            "{} is not a function",
                            other.to_js_string()
                        ))),
                    };
                }
                if obj.borrow().is_array() {
                    return methods::call_array_method(self, obj, key, args);
                }
                Err(Error::TypeError(format!("{} is not a function", key)))
            }
            Value::String(s) => methods::call_string_method(s, key, args),
            Value::Number(n) => methods::call_number_method(*n, key, args),
            Value::Function(func) => {
                if let Some(Value::Function(member)) = func.get_property(key) {
                    return self.call_function(&member, object.clone(), args);
                }
                match key {
                    "call" => {
                        let this = args.first().cloned().unwrap_or(Value::Undefined);
                        self.call_function(func, this, args.get(1..).unwrap_or(&[]))
                    }
                    "apply" => {
                        let this = args.first().cloned().unwrap_or(Value::Undefined);
                        let rest = match args.get(1) {
                            Some(Value::Object(arr)) if arr.borrow().is_array() => {
                                arr.borrow().elements.clone()
                            }
                            _ => Vec::new(),
                        };
                        self.call_function(func, this, &rest)
                    }
                    _ => Err(Error::TypeError(format!("{} is not a function", key))),
                }
            }
            Value::Undefined | Value::Null => Err(Error::TypeError(format!(
                "Cannot read properties of {} (reading '{}')",
                object.to_js_string(),
                key
            ))),
            other => Err(Error::TypeError(format!(
                "{}.{} is not a function",
                other.to_js_string(),
                key
            ))),
        }
    }

    /// Resolves a member-access key to a property name.
    pub(super) fn member_key(&mut self, property: &MemberProperty) -> Result<String, Error> {
        match property {
            MemberProperty::Identifier(id) => Ok(id.name.clone()),
            MemberProperty::Expression(expr) => Ok(self.evaluate(expr)?.to_js_string()),
        }
    }

    /// Reads `object[key]`, covering primitives, functions, and prototype
    /// chains.
    pub fn get_member(&mut self, object: &Value, key: &str) -> Result<Value, Error> {
        match object {
            Value::Object(obj) => {
                Ok(object::get_property(obj, key).unwrap_or(Value::Undefined))
            }
            Value::String(s) => {
                if key == "length" {
                    return Ok(Value::Number(s.chars().count() as f64));
                }
                if let Ok(index) = key.parse::<usize>() {
                    return Ok(s
                        .chars()
                        .nth(index)
                        .map(|c| Value::String(c.to_string()))
                        .unwrap_or(Value::Undefined));
                }
                Ok(Value::Undefined)
            }
            Value::Function(func) => {
                if key == "name" {
                    return Ok(Value::String(
                        func.name.borrow().clone().unwrap_or_default(),
                    ));
                }
                Ok(func.get_property(key).unwrap_or(Value::Undefined))
            }
            Value::Undefined | Value::Null => Err(Error::TypeError(format!(
                "Cannot read properties of {} (reading '{}')",
                object.to_js_string(),
                key
            ))),
            _ => Ok(Value::Undefined),
        }
    }
}

fn evaluate_literal(literal: &Literal) -> Value {
    match literal {
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Null => Value::Null,
        Literal::Undefined => Value::Undefined,
    }
}

/// Applies a non-short-circuiting binary operator.
pub(super) fn apply_binary(
    operator: BinaryOperator,
    left: Value,
    right: Value,
) -> Result<Value, Error> {
    let value = match operator {
        BinaryOperator::Add => match (&left, &right) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                Value::String(format!("{}{}", left.to_js_string(), right.to_js_string()))
            }
            (Value::Object(_), _) | (_, Value::Object(_)) => {
                Value::String(format!("{}{}", left.to_js_string(), right.to_js_string()))
            }
            _ => Value::Number(left.to_number() + right.to_number()),
        },
        BinaryOperator::Subtract => Value::Number(left.to_number() - right.to_number()),
        BinaryOperator::Multiply => Value::Number(left.to_number() * right.to_number()),
        BinaryOperator::Divide => Value::Number(left.to_number() / right.to_number()),
        BinaryOperator::Modulo => Value::Number(left.to_number() % right.to_number()),
        BinaryOperator::Exponent => Value::Number(left.to_number().powf(right.to_number())),

        BinaryOperator::Equal => Value::Boolean(left.loose_equals(&right)),
        BinaryOperator::NotEqual => Value::Boolean(!left.loose_equals(&right)),
        BinaryOperator::StrictEqual => Value::Boolean(left.strict_equals(&right)),
        BinaryOperator::StrictNotEqual => Value::Boolean(!left.strict_equals(&right)),

        BinaryOperator::LessThan => compare(&left, &right, |o| o == std::cmp::Ordering::Less),
        BinaryOperator::LessThanEqual => {
            compare(&left, &right, |o| o != std::cmp::Ordering::Greater)
        }
        BinaryOperator::GreaterThan => {
            compare(&left, &right, |o| o == std::cmp::Ordering::Greater)
        }
        BinaryOperator::GreaterThanEqual => {
            compare(&left, &right, |o| o != std::cmp::Ordering::Less)
        }

        BinaryOperator::BitwiseAnd => {
            Value::Number((to_int32(left.to_number()) & to_int32(right.to_number())) as f64)
        }
        BinaryOperator::BitwiseOr => {
            Value::Number((to_int32(left.to_number()) | to_int32(right.to_number())) as f64)
        }
        BinaryOperator::BitwiseXor => {
            Value::Number((to_int32(left.to_number()) ^ to_int32(right.to_number())) as f64)
        }
        BinaryOperator::LeftShift => Value::Number(
            (to_int32(left.to_number()) << (to_uint32(right.to_number()) & 31)) as f64,
        ),
        BinaryOperator::RightShift => Value::Number(
            (to_int32(left.to_number()) >> (to_uint32(right.to_number()) & 31)) as f64,
        ),
        BinaryOperator::UnsignedRightShift => Value::Number(
            (to_uint32(left.to_number()) >> (to_uint32(right.to_number()) & 31)) as f64,
        ),

        BinaryOperator::In => match &right {
            Value::Object(obj) => Value::Boolean(obj.borrow().has(&left.to_js_string())),
            other => {
                return Err(Error::TypeError(format!(
                    "Cannot use 'in' operator to search for '{}' in {}",
                    left.to_js_string(),
                    other.to_js_string()
                )))
            }
        },
        BinaryOperator::InstanceOf => match &right {
            Value::Function(func) => {
                let proto = func.get_property("prototype");
                Value::Boolean(match (&left, proto) {
                    (Value::Object(obj), Some(Value::Object(class_proto))) => {
                        let mut current = obj.borrow().prototype.clone();
                        let mut found = false;
                        while let Some(p) = current {
                            if Rc::ptr_eq(&p, &class_proto) {
                                found = true;
                                break;
                            }
                            current = p.borrow().prototype.clone();
                        }
                        found
                    }
                    _ => false,
                })
            }
            other => {
                return Err(Error::TypeError(format!(
                    "Right-hand side of 'instanceof' is not callable: {}",
                    other.to_js_string()
                )))
            }
        },

        BinaryOperator::LogicalAnd
        | BinaryOperator::LogicalOr
        | BinaryOperator::NullishCoalescing => {
            unreachable!("short-circuit operators are handled before evaluation")
        }
    };
    Ok(value)
}

fn compare(left: &Value, right: &Value, check: impl Fn(std::cmp::Ordering) -> bool) -> Value {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Value::Boolean(check(a.cmp(b))),
        _ => {
            let a = left.to_number();
            let b = right.to_number();
            match a.partial_cmp(&b) {
                Some(ordering) => Value::Boolean(check(ordering)),
                None => Value::Boolean(false), // NaN
            }
        }
    }
}

pub(super) fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    n as i64 as i32
}

pub(super) fn to_uint32(n: f64) -> u32 {
    to_int32(n) as u32
}
