//! Evaluator for cvscript
//!
//! Walks a parsed program against a [`Context`] and produces the ordered
//! fragments of the output document. No file I/O happens here: resources and
//! lookups are emitted as names for a renderer to resolve.

use crate::dsl::ast::*;
use crate::dsl::context::Context;
use crate::error::ResolutionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

type EvalResult<T> = std::result::Result<T, ResolutionError>;

/// One unit of output in emission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fragment {
    /// Literal text from `WRITE "..."`
    Text { text: String },
    /// Resolved `WRITE entity.`field``
    Attribute {
        entity: String,
        field: String,
        value: String,
    },
    /// `WRITE file.png`; the renderer embeds the file
    Resource { name: String },
    /// `SEARCH_FILE`; the renderer finds a file by this key
    Lookup { key: String },
}

impl Fragment {
    /// Text content for text and attribute fragments
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Fragment::Text { text } => Some(text),
            Fragment::Attribute { value, .. } => Some(value),
            Fragment::Resource { .. } | Fragment::Lookup { .. } => None,
        }
    }
}

/// Evaluate `program` with a fresh evaluator
pub fn evaluate(program: &Program, context: &mut Context) -> EvalResult<Vec<Fragment>> {
    Evaluator::new().execute_program(program, context)
}

/// Tree-walking evaluator
#[derive(Debug, Default)]
pub struct Evaluator {
    /// Registered function definitions
    functions: BTreeMap<String, FunctionDef>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Functions registered by the last program run. They are never called:
    /// the language has no call statement.
    pub fn functions(&self) -> &BTreeMap<String, FunctionDef> {
        &self.functions
    }

    /// Execute a program
    pub fn execute_program(
        &mut self,
        program: &Program,
        context: &mut Context,
    ) -> EvalResult<Vec<Fragment>> {
        // First pass: collect function definitions
        self.functions.clear();
        for func in program.functions() {
            tracing::debug!("Registering function '{}'", func.name);
            self.functions.insert(func.name.clone(), func.clone());
        }

        // Second pass: execute top-level statements in order
        let mut output = Vec::new();
        for statement in program.statements() {
            self.execute_statement(statement, context, &mut output)?;
        }

        tracing::debug!("Program produced {} fragment(s)", output.len());
        Ok(output)
    }

    fn execute_block(
        &self,
        statements: &[Statement],
        context: &mut Context,
        output: &mut Vec<Fragment>,
    ) -> EvalResult<()> {
        for statement in statements {
            self.execute_statement(statement, context, output)?;
        }
        Ok(())
    }

    fn execute_statement(
        &self,
        statement: &Statement,
        context: &mut Context,
        output: &mut Vec<Fragment>,
    ) -> EvalResult<()> {
        match statement {
            Statement::Write(payload) => {
                output.push(self.execute_write(payload, context)?);
                Ok(())
            }
            Statement::If(if_stmt) => {
                if self.evaluate_condition(&if_stmt.condition, context)? {
                    self.execute_block(&if_stmt.then_branch, context, output)
                } else if let Some(else_branch) = &if_stmt.else_branch {
                    self.execute_block(else_branch, context, output)
                } else {
                    Ok(())
                }
            }
            Statement::Loop(loop_stmt) => self.execute_loop(loop_stmt, context, output),
            Statement::Search(search) => {
                let key = context.resolve(&search.target)?;
                output.push(Fragment::Lookup { key });
                Ok(())
            }
        }
    }

    fn execute_write(&self, payload: &WritePayload, context: &Context) -> EvalResult<Fragment> {
        Ok(match payload {
            WritePayload::Text(text) => Fragment::Text { text: text.clone() },
            WritePayload::Attribute(attribute) => Fragment::Attribute {
                entity: attribute.entity.clone(),
                field: attribute.field.clone(),
                value: context.resolve(attribute)?,
            },
            WritePayload::Resource(name) => Fragment::Resource { name: name.clone() },
        })
    }

    /// Run the body once per record. The binding is popped before any error
    /// from the body propagates.
    fn execute_loop(
        &self,
        loop_stmt: &LoopStatement,
        context: &mut Context,
        output: &mut Vec<Fragment>,
    ) -> EvalResult<()> {
        let count = context.records(&loop_stmt.entity)?.len();
        tracing::debug!(
            "Looping '{}' over {} ({} records)",
            loop_stmt.alias,
            loop_stmt.entity,
            count
        );

        for index in 0..count {
            context.push_binding(&loop_stmt.alias, &loop_stmt.entity, index);
            let result = self.execute_block(&loop_stmt.body, context, output);
            context.pop_binding();
            result?;
        }

        Ok(())
    }

    fn evaluate_condition(&self, condition: &Condition, context: &Context) -> EvalResult<bool> {
        match condition {
            Condition::Empty(attribute) => {
                let value = context.lookup(attribute)?;
                Ok(value.map_or(true, str::is_empty))
            }
        }
    }
}
