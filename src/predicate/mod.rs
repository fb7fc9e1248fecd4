//! String cut expressions compiled once into a boolean test over one object.
//!
//! The language covers what selection cuts are written in: attribute names,
//! numeric literals, arithmetic, comparisons, `&&`/`||`/`!` (or `and`/`or`/`not`),
//! `abs`, `sqrt`, `min`, `max` and `has(name)`. An empty expression accepts
//! every object.

pub mod ast;
mod lexer;
mod parser;

use crate::{
    error::{CleaningError, configuration_error},
    event::ports::PhysicsView,
};

use ast::BoolExpr;

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    expression: String,
    root: Option<BoolExpr>,
}

impl Predicate {
    pub fn compile(expression: &str) -> Result<Self, CleaningError> {
        if expression.trim().is_empty() {
            return Ok(Self::accept_all());
        }

        let tokens = lexer::tokenize(expression)?;
        let root = parser::Parser::new(expression, tokens).parse()?;
        Ok(Self {
            expression: expression.to_string(),
            root: Some(root),
        })
    }

    pub fn accept_all() -> Self {
        Self {
            expression: String::new(),
            root: None,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn is_accept_all(&self) -> bool {
        self.root.is_none()
    }

    pub fn evaluate<V: PhysicsView + ?Sized>(&self, object: &V) -> bool {
        self.root.as_ref().is_none_or(|root| root.eval(object))
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::accept_all()
    }
}

pub(crate) fn syntax_error(expression: &str, offset: usize, reason: &str) -> CleaningError {
    configuration_error(format!(
        "invalid cut expression \"{expression}\": {reason} at offset {offset}"
    ))
}
