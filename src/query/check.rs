//! Static type check of relations against a binding's declarations
//!
//! cel-interpreter compares values of different types as unequal rather
//! than failing, so `version == 22.04` on a string fact would silently be
//! `false`. Before executing, every relation whose two operands have a
//! concrete static type (a literal, or a bound name declared as a scalar)
//! is checked for compatibility. Ints and doubles compare with each other;
//! every other pairing must match exactly.

use std::collections::BTreeMap;

use cel_parser::{Atom, Expression, Member, RelationOp};

use super::binding::DeclaredType;

/// Macros whose first argument introduces a comprehension variable.
const COMPREHENSIONS: &[&str] = &["all", "exists", "exists_one", "map", "filter"];

/// First incompatible relation in `expr`, rendered for diagnostics.
pub fn first_mismatch(
    expr: &Expression,
    declarations: &BTreeMap<&str, DeclaredType>,
) -> Option<String> {
    Checker {
        declarations,
        locals: Vec::new(),
    }
    .visit(expr)
}

struct Checker<'a> {
    declarations: &'a BTreeMap<&'a str, DeclaredType>,
    /// Comprehension variables in scope; they shadow bound names.
    locals: Vec<String>,
}

impl Checker<'_> {
    fn visit(&mut self, expr: &Expression) -> Option<String> {
        match expr {
            Expression::Relation(lhs, op, rhs) => {
                if !matches!(op, RelationOp::In) {
                    if let (Some(l), Some(r)) = (self.static_type(lhs), self.static_type(rhs)) {
                        if !comparable(l, r) {
                            return Some(format!(
                                "no matching overload for {l} {} {r}",
                                relation_symbol(op)
                            ));
                        }
                    }
                }
                self.visit(lhs).or_else(|| self.visit(rhs))
            }
            Expression::Arithmetic(lhs, _, rhs)
            | Expression::Or(lhs, rhs)
            | Expression::And(lhs, rhs) => self.visit(lhs).or_else(|| self.visit(rhs)),
            Expression::Ternary(cond, then, otherwise) => self
                .visit(cond)
                .or_else(|| self.visit(then))
                .or_else(|| self.visit(otherwise)),
            Expression::Unary(_, inner) => self.visit(inner),
            Expression::Member(target, member) => {
                self.visit(target).or_else(|| match member.as_ref() {
                    Member::Index(index) => self.visit(index),
                    _ => None,
                })
            }
            Expression::FunctionCall(func, target, args) => {
                if let Some(found) = target.as_deref().and_then(|t| self.visit(t)) {
                    return Some(found);
                }
                let local = comprehension_variable(func, args);
                if let Some(name) = &local {
                    self.locals.push(name.clone());
                }
                let found = args.iter().find_map(|arg| self.visit(arg));
                if local.is_some() {
                    self.locals.pop();
                }
                found
            }
            Expression::List(items) => items.iter().find_map(|item| self.visit(item)),
            Expression::Map(entries) => entries
                .iter()
                .find_map(|(key, value)| self.visit(key).or_else(|| self.visit(value))),
            _ => None,
        }
    }

    /// Concrete type of `expr` if it is known without evaluating it.
    fn static_type(&self, expr: &Expression) -> Option<DeclaredType> {
        match expr {
            Expression::Atom(atom) => match atom {
                Atom::Int(_) | Atom::UInt(_) => Some(DeclaredType::Int),
                Atom::Float(_) => Some(DeclaredType::Double),
                Atom::String(_) => Some(DeclaredType::String),
                Atom::Bool(_) => Some(DeclaredType::Bool),
                _ => None,
            },
            Expression::Ident(name) => {
                if self.locals.iter().any(|local| local.as_str() == name.as_str()) {
                    return None;
                }
                self.declarations
                    .get(name.as_str())
                    .copied()
                    .filter(|ty| *ty != DeclaredType::Dyn)
            }
            // negated numeric literals
            Expression::Unary(_, inner) => self
                .static_type(inner)
                .filter(|ty| matches!(ty, DeclaredType::Int | DeclaredType::Double)),
            _ => None,
        }
    }
}

fn comparable(a: DeclaredType, b: DeclaredType) -> bool {
    a == b
        || matches!(
            (a, b),
            (DeclaredType::Int, DeclaredType::Double) | (DeclaredType::Double, DeclaredType::Int)
        )
}

fn comprehension_variable(func: &Expression, args: &[Expression]) -> Option<String> {
    let Expression::Ident(name) = func else {
        return None;
    };
    if !COMPREHENSIONS.contains(&name.as_str()) {
        return None;
    }
    match args.first() {
        Some(Expression::Ident(var)) => Some(var.to_string()),
        _ => None,
    }
}

const fn relation_symbol(op: &RelationOp) -> &'static str {
    match op {
        RelationOp::LessThan => "<",
        RelationOp::LessThanEq => "<=",
        RelationOp::GreaterThan => ">",
        RelationOp::GreaterThanEq => ">=",
        RelationOp::Equals => "==",
        RelationOp::NotEquals => "!=",
        RelationOp::In => "in",
    }
}
