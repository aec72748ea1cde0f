//! Canonical source form of a program
//!
//! Re-parsing the printed text yields the same AST.

use crate::dsl::ast::*;
use std::fmt::{self, Write};

const INDENT: &str = "    ";

/// Print `program` in canonical form
pub fn print_program(program: &Program) -> String {
    program.to_string()
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            match item {
                Item::Function(func) => {
                    if i > 0 {
                        f.write_char('\n')?;
                    }
                    writeln!(f, "FUNCTION : {}", func.name)?;
                    write_block(f, &func.body, 1)?;
                    writeln!(f, "END FUNCTION")?;
                }
                Item::Statement(stmt) => write_statement(f, stmt, 0)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.`{}`", self.entity, self.field)
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, statements: &[Statement], depth: usize) -> fmt::Result {
    for stmt in statements {
        write_statement(f, stmt, depth)?;
    }
    Ok(())
}

fn write_statement(f: &mut fmt::Formatter<'_>, statement: &Statement, depth: usize) -> fmt::Result {
    let pad = INDENT.repeat(depth);
    match statement {
        Statement::Write(WritePayload::Text(text)) => {
            writeln!(f, "{}WRITE \"{}\"", pad, escape(text))
        }
        Statement::Write(WritePayload::Attribute(attribute)) => {
            writeln!(f, "{}WRITE {}", pad, attribute)
        }
        Statement::Write(WritePayload::Resource(name)) => writeln!(f, "{}WRITE {}", pad, name),
        Statement::If(if_stmt) => {
            let Condition::Empty(attribute) = &if_stmt.condition;
            writeln!(f, "{}IF EMPTY({})", pad, attribute)?;
            write_block(f, &if_stmt.then_branch, depth + 1)?;
            if let Some(else_branch) = &if_stmt.else_branch {
                writeln!(f, "{}ELSE", pad)?;
                write_block(f, else_branch, depth + 1)?;
            }
            writeln!(f, "{}END IF", pad)
        }
        Statement::Loop(loop_stmt) => {
            writeln!(
                f,
                "{}DO FOR EACH {} IN {}",
                pad, loop_stmt.alias, loop_stmt.entity
            )?;
            write_block(f, &loop_stmt.body, depth + 1)?;
            writeln!(f, "{}END DO", pad)
        }
        Statement::Search(search) => writeln!(f, "{}SEARCH_FILE name={}", pad, search.target),
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
