//! Abstract Syntax Tree definitions for cvscript

use serde::{Deserialize, Serialize};

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

/// Root AST node representing a complete script
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub items: Vec<Item>,
}

impl Program {
    /// Function definitions in declaration order
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(func) => Some(func),
            Item::Statement(_) => None,
        })
    }

    /// Top-level statements in execution order
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.items.iter().filter_map(|item| match item {
            Item::Statement(stmt) => Some(stmt),
            Item::Function(_) => None,
        })
    }
}

/// Top-level items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Function(FunctionDef),
    Statement(Statement),
}

/// `FUNCTION : name` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub body: Vec<Statement>,
}

/// Statement types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Write(WritePayload),
    If(IfStatement),
    Loop(LoopStatement),
    Search(SearchStatement),
}

/// What a `WRITE` statement emits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WritePayload {
    Text(String),
    Attribute(AttributeRef),
    Resource(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    pub condition: Condition,
    pub then_branch: Vec<Statement>,
    pub else_branch: Option<Vec<Statement>>,
}

/// `DO FOR EACH alias IN entity`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopStatement {
    pub alias: String,
    pub entity: String,
    pub body: Vec<Statement>,
}

/// `SEARCH_FILE name=entity.`field``
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStatement {
    pub target: AttributeRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// True iff the attribute is absent or the empty string
    Empty(AttributeRef),
}

/// `entity.`field`` reference; `entity` may also name a loop alias
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeRef {
    pub entity: String,
    pub field: String,
}

impl AttributeRef {
    pub fn new(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            field: field.into(),
        }
    }
}
