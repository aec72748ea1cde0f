//! Parser for cvscript
//!
//! Recursive descent over the token stream, one method per grammar rule.
//! Converts a stream of tokens into an Abstract Syntax Tree (AST).

use crate::config::EntityTable;
use crate::dsl::ast::*;
use crate::dsl::lexer::{Keyword, Token, TokenType};
use crate::error::ParseError;
use std::collections::BTreeSet;

type ParseResult<T> = std::result::Result<T, ParseError>;

/// Parse tokens with the default entity table
pub fn parse(tokens: Vec<Token>) -> ParseResult<Program> {
    Parser::new(tokens).parse()
}

/// Parser for cvscript
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    /// Entity names accepted after `IN`
    entities: BTreeSet<String>,
    /// Function names seen so far
    functions: BTreeSet<String>,
}

impl Parser {
    /// Create a parser that recognizes the default entity table
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_entities(tokens, EntityTable::default().names())
    }

    /// Create a parser that recognizes the given entity names
    pub fn with_entities<I, S>(mut tokens: Vec<Token>, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let needs_eof = !matches!(
            tokens.last().map(|t| &t.token_type),
            Some(TokenType::Eof)
        );
        if needs_eof {
            let (line, column, offset) = tokens
                .last()
                .map(|t| (t.line, t.column + t.length, t.offset + t.length))
                .unwrap_or((1, 1, 0));
            tokens.push(Token {
                token_type: TokenType::Eof,
                lexeme: String::new(),
                line,
                column,
                offset,
                length: 0,
            });
        }

        Self {
            tokens,
            current: 0,
            entities: entities.into_iter().map(Into::into).collect(),
            functions: BTreeSet::new(),
        }
    }

    /// Parse the tokens into a program AST
    pub fn parse(&mut self) -> ParseResult<Program> {
        let mut items = Vec::new();

        self.skip_newlines();
        while !self.is_at_end() {
            items.push(self.parse_item()?);
            self.skip_newlines();
        }

        Ok(Program { items })
    }

    /// Parse a top-level item
    fn parse_item(&mut self) -> ParseResult<Item> {
        if self.check_keyword(Keyword::Function) {
            Ok(Item::Function(self.parse_function_definition()?))
        } else {
            Ok(Item::Statement(self.parse_statement()?))
        }
    }

    /// `FUNCTION : name NEWLINE { statement } [END FUNCTION]`
    ///
    /// Without `END FUNCTION` the body runs to the next `FUNCTION` header or
    /// the end of input.
    fn parse_function_definition(&mut self) -> ParseResult<FunctionDef> {
        self.advance(); // FUNCTION
        self.consume(TokenType::Colon, "':' after 'FUNCTION'")?;

        let name_token = self.peek().clone();
        let name = self.parse_identifier("function name")?;
        if !self.functions.insert(name.clone()) {
            return Err(ParseError {
                expected: "unique function name".to_string(),
                found: format!("duplicate function '{}'", name),
                location: name_token.location(),
            });
        }
        self.end_of_statement()?;

        let mut body = Vec::new();
        loop {
            self.skip_newlines();
            if self.check_keyword(Keyword::EndFunction) {
                self.advance();
                self.end_of_statement()?;
                break;
            }
            if self.check_keyword(Keyword::Function) || self.is_at_end() {
                break;
            }
            body.push(self.parse_statement()?);
        }

        Ok(FunctionDef { name, body })
    }

    /// Parse one statement including its terminating newline
    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let statement = match &self.peek().token_type {
            TokenType::Keyword(Keyword::Write) => self.parse_write()?,
            TokenType::Keyword(Keyword::If) => Statement::If(self.parse_if()?),
            TokenType::Keyword(Keyword::DoForEach) => Statement::Loop(self.parse_loop()?),
            TokenType::Keyword(Keyword::SearchFile) => Statement::Search(self.parse_search()?),
            _ => return Err(self.error_here("statement (WRITE, IF, DO FOR EACH or SEARCH_FILE)")),
        };

        self.end_of_statement()?;
        Ok(statement)
    }

    /// `WRITE ( text | attribute | resource )`
    fn parse_write(&mut self) -> ParseResult<Statement> {
        self.advance(); // WRITE

        let payload = match self.peek().token_type.clone() {
            TokenType::String(text) => {
                self.advance();
                WritePayload::Text(text)
            }
            TokenType::Filename(name) => {
                self.advance();
                WritePayload::Resource(name)
            }
            TokenType::Identifier(_) => WritePayload::Attribute(self.parse_attribute()?),
            _ => return Err(self.error_here("text, attribute or resource after 'WRITE'")),
        };

        Ok(Statement::Write(payload))
    }

    /// `IF condition NEWLINE { statement } [ ELSE [NEWLINE] { statement } ] END IF`
    fn parse_if(&mut self) -> ParseResult<IfStatement> {
        self.advance(); // IF
        let condition = self.parse_condition()?;
        self.end_of_statement()?;

        let then_branch = self.parse_block(&[Keyword::Else, Keyword::EndIf])?;

        // The else body may start on the `ELSE` line itself
        let else_branch = if self.check_keyword(Keyword::Else) {
            self.advance();
            Some(self.parse_block(&[Keyword::EndIf])?)
        } else {
            None
        };

        self.consume(TokenType::Keyword(Keyword::EndIf), "'END IF'")?;

        Ok(IfStatement {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// `DO FOR EACH alias IN entity NEWLINE { statement } END DO`
    fn parse_loop(&mut self) -> ParseResult<LoopStatement> {
        self.advance(); // DO FOR EACH
        let alias = self.parse_identifier("loop variable")?;
        self.consume(TokenType::Keyword(Keyword::In), "'IN' after loop variable")?;

        let entity = match &self.peek().token_type {
            TokenType::Identifier(name) if self.entities.contains(name) => name.clone(),
            _ => {
                let known: Vec<&str> = self.entities.iter().map(String::as_str).collect();
                return Err(self.error_here(&format!("entity name ({})", known.join(", "))));
            }
        };
        self.advance();
        self.end_of_statement()?;

        let body = self.parse_block(&[Keyword::EndDo])?;
        self.consume(TokenType::Keyword(Keyword::EndDo), "'END DO'")?;

        Ok(LoopStatement {
            alias,
            entity,
            body,
        })
    }

    /// `SEARCH_FILE name= attribute`
    fn parse_search(&mut self) -> ParseResult<SearchStatement> {
        self.advance(); // SEARCH_FILE

        let names_file = matches!(
            &self.peek().token_type,
            TokenType::Identifier(word) if word == "name"
        );
        if !names_file {
            return Err(self.error_here("'name=' after 'SEARCH_FILE'"));
        }
        self.advance();
        self.consume(TokenType::Equals, "'=' after 'name'")?;

        Ok(SearchStatement {
            target: self.parse_attribute()?,
        })
    }

    /// `EMPTY ( attribute )`
    fn parse_condition(&mut self) -> ParseResult<Condition> {
        self.consume(TokenType::Keyword(Keyword::Empty), "condition 'EMPTY('")?;
        self.consume(TokenType::LeftParen, "'(' after 'EMPTY'")?;
        let attribute = self.parse_attribute()?;
        self.consume(TokenType::RightParen, "')' after attribute")?;
        Ok(Condition::Empty(attribute))
    }

    /// `entity . `field``
    fn parse_attribute(&mut self) -> ParseResult<AttributeRef> {
        let entity = self.parse_identifier("entity name")?;
        self.consume(TokenType::Dot, "'.' after entity name")?;

        match self.peek().token_type.clone() {
            TokenType::Backtick(field) if !field.trim().is_empty() => {
                self.advance();
                Ok(AttributeRef { entity, field })
            }
            _ => Err(self.error_here("backtick-quoted field name")),
        }
    }

    /// Statements up to (not including) one of `terminators`
    fn parse_block(&mut self, terminators: &[Keyword]) -> ParseResult<Vec<Statement>> {
        let mut statements = Vec::new();

        loop {
            self.skip_newlines();

            if let TokenType::Keyword(keyword) = &self.peek().token_type {
                if terminators.contains(keyword) {
                    return Ok(statements);
                }
                if is_block_closer(*keyword) {
                    return Err(self.expected_terminator(terminators));
                }
            }
            if self.is_at_end() {
                return Err(self.expected_terminator(terminators));
            }

            statements.push(self.parse_statement()?);
        }
    }

    fn parse_identifier(&mut self, what: &str) -> ParseResult<String> {
        match self.peek().token_type.clone() {
            TokenType::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_here(what)),
        }
    }

    /// A statement ends at a newline or the end of input
    fn end_of_statement(&mut self) -> ParseResult<()> {
        match self.peek().token_type {
            TokenType::Newline => {
                self.advance();
                Ok(())
            }
            TokenType::Eof => Ok(()),
            _ => Err(self.error_here("end of line")),
        }
    }

    // Helper methods

    fn expected_terminator(&self, terminators: &[Keyword]) -> ParseError {
        let names: Vec<String> = terminators.iter().map(|k| format!("'{}'", k)).collect();
        self.error_here(&names.join(" or "))
    }

    fn error_here(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError {
            expected: expected.to_string(),
            found: token.token_type.describe(),
            location: token.location(),
        }
    }

    fn consume(&mut self, expected: TokenType, description: &str) -> ParseResult<Token> {
        if self.peek().token_type == expected {
            Ok(self.advance())
        } else {
            Err(self.error_here(description))
        }
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.peek().token_type == TokenType::Keyword(keyword)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::Eof)
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.current.min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek().token_type, TokenType::Newline) {
            self.advance();
        }
    }
}

fn is_block_closer(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::Else | Keyword::EndIf | Keyword::EndDo | Keyword::EndFunction | Keyword::Function
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::lexer::tokenize;

    fn parse_source(source: &str) -> ParseResult<Program> {
        let tokens = tokenize(source).unwrap();
        Parser::new(tokens).parse()
    }

    #[test]
    fn test_write_forms() {
        let program = parse_source(
            "WRITE \"Curriculum Vitae\"\nWRITE PERSONAL.`name`\nWRITE logo-header.png\n",
        )
        .unwrap();
        let statements: Vec<&Statement> = program.statements().collect();
        assert_eq!(statements.len(), 3);
        assert_eq!(
            statements[0],
            &Statement::Write(WritePayload::Text("Curriculum Vitae".to_string()))
        );
        assert_eq!(
            statements[1],
            &Statement::Write(WritePayload::Attribute(AttributeRef::new("PERSONAL", "name")))
        );
        assert_eq!(
            statements[2],
            &Statement::Write(WritePayload::Resource("logo-header.png".to_string()))
        );
    }

    #[test]
    fn test_if_else() {
        let source = r#"
IF EMPTY(PERSONAL.`phone`)
    WRITE "no phone"
ELSE
    WRITE PERSONAL.`phone`
END IF
"#;
        let program = parse_source(source).unwrap();
        assert_eq!(program.items.len(), 1);

        if let Item::Statement(Statement::If(stmt)) = &program.items[0] {
            assert_eq!(
                stmt.condition,
                Condition::Empty(AttributeRef::new("PERSONAL", "phone"))
            );
            assert_eq!(stmt.then_branch.len(), 1);
            assert_eq!(stmt.else_branch.as_ref().map(Vec::len), Some(1));
        } else {
            panic!("Expected if statement");
        }
    }

    #[test]
    fn test_else_body_on_same_line() {
        let program =
            parse_source("IF EMPTY(BLOCK.`x`)\nWRITE \"a\"\nELSE WRITE \"b\"\nEND IF").unwrap();
        let Some(Statement::If(stmt)) = program.statements().next() else {
            panic!("Expected if statement");
        };
        assert_eq!(
            stmt.else_branch,
            Some(vec![Statement::Write(WritePayload::Text("b".to_string()))])
        );

        let err = parse_source("IF EMPTY(BLOCK.`x`)\nELSE WRITE \"b\" WRITE \"c\"\nEND IF")
            .unwrap_err();
        assert_eq!(err.expected, "end of line");
    }

    #[test]
    fn test_nested_loops() {
        let source = r#"
DO FOR EACH e IN EDUCATION
    WRITE e.`name`
    DO FOR EACH b IN BLOCK
        WRITE b.`title`
    END DO
END DO
"#;
        let program = parse_source(source).unwrap();
        if let Some(Statement::Loop(outer)) = program.statements().next() {
            assert_eq!(outer.alias, "e");
            assert_eq!(outer.entity, "EDUCATION");
            assert_eq!(outer.body.len(), 2);
            assert!(matches!(&outer.body[1], Statement::Loop(inner) if inner.alias == "b"));
        } else {
            panic!("Expected loop statement");
        };
    }

    #[test]
    fn test_search_statement() {
        let program = parse_source("SEARCH_FILE name=BLOCK.`name`").unwrap();
        assert_eq!(
            program.statements().next(),
            Some(&Statement::Search(SearchStatement {
                target: AttributeRef::new("BLOCK", "name")
            }))
        );
    }

    #[test]
    fn test_function_with_terminator() {
        let source = "FUNCTION : header\nWRITE \"x\"\nEND FUNCTION\nWRITE \"y\"\n";
        let program = parse_source(source).unwrap();
        assert_eq!(program.items.len(), 2);
        let func = program.functions().next().unwrap();
        assert_eq!(func.name, "header");
        assert_eq!(func.body.len(), 1);
    }

    #[test]
    fn test_function_ends_at_next_function_or_eof() {
        let source = "FUNCTION : a\nWRITE \"1\"\nFUNCTION : b\nWRITE \"2\"\nWRITE \"3\"";
        let program = parse_source(source).unwrap();
        let funcs: Vec<&FunctionDef> = program.functions().collect();
        assert_eq!(funcs.len(), 2);
        assert_eq!(funcs[0].body.len(), 1);
        assert_eq!(funcs[1].body.len(), 2);
        assert_eq!(program.statements().count(), 0);
    }

    #[test]
    fn test_duplicate_function_rejected() {
        let err = parse_source("FUNCTION : a\nEND FUNCTION\nFUNCTION : a\n").unwrap_err();
        assert_eq!(err.expected, "unique function name");
        assert_eq!(err.location.line, 3);
    }

    #[test]
    fn test_missing_end_if() {
        let err = parse_source("IF EMPTY(PERSONAL.`phone`)\nWRITE \"x\"\n").unwrap_err();
        assert_eq!(err.expected, "'ELSE' or 'END IF'");
        assert_eq!(err.found, "end of input");
    }

    #[test]
    fn test_stray_else_and_end_if() {
        let err = parse_source("ELSE\n").unwrap_err();
        assert_eq!(err.found, "'ELSE'");

        let err = parse_source("WRITE \"a\"\nEND IF\n").unwrap_err();
        assert_eq!(err.found, "'END IF'");
        assert_eq!(err.location.line, 2);
    }

    #[test]
    fn test_mismatched_block_closer() {
        let err = parse_source("DO FOR EACH e IN EDUCATION\nEND IF\n").unwrap_err();
        assert_eq!(err.expected, "'END DO'");
        assert_eq!(err.found, "'END IF'");
    }

    #[test]
    fn test_loop_requires_recognized_entity() {
        let err = parse_source("DO FOR EACH g IN GHOST\nEND DO\n").unwrap_err();
        assert!(err.expected.starts_with("entity name"));
        assert_eq!(err.found, "identifier 'GHOST'");
    }

    #[test]
    fn test_custom_entity_table() {
        let tokens = tokenize("DO FOR EACH p IN PROJECTS\nEND DO\n").unwrap();
        let program = Parser::with_entities(tokens, ["PROJECTS"]).parse().unwrap();
        assert_eq!(program.items.len(), 1);
    }

    #[test]
    fn test_malformed_attribute() {
        let err = parse_source("WRITE BLOCK `title`").unwrap_err();
        assert_eq!(err.expected, "'.' after entity name");

        let err = parse_source("WRITE BLOCK.title").unwrap_err();
        assert_eq!(err.expected, "backtick-quoted field name");

        let err = parse_source("WRITE BLOCK.``").unwrap_err();
        assert_eq!(err.expected, "backtick-quoted field name");
    }

    #[test]
    fn test_unknown_statement_keyword() {
        let err = parse_source("PRINT \"x\"").unwrap_err();
        assert_eq!(err.found, "identifier 'PRINT'");
        assert_eq!(err.location.column, 1);
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse_source("WRITE \"a\" \"b\"").unwrap_err();
        assert_eq!(err.expected, "end of line");
    }

    #[test]
    fn test_search_requires_name_assignment() {
        let err = parse_source("SEARCH_FILE file=BLOCK.`x`").unwrap_err();
        assert_eq!(err.expected, "'name=' after 'SEARCH_FILE'");
    }

    #[test]
    fn test_nested_function_rejected() {
        let err = parse_source("IF EMPTY(BLOCK.`x`)\nFUNCTION : f\nEND IF\n").unwrap_err();
        assert_eq!(err.found, "'FUNCTION'");
    }

    #[test]
    fn test_tokens_without_eof() {
        let mut tokens = tokenize("WRITE \"x\"").unwrap();
        tokens.pop();
        let program = Parser::new(tokens).parse().unwrap();
        assert_eq!(program.items.len(), 1);
    }
}
