//! Lexer for cvscript
//!
//! Converts raw text input into a stream of tokens for parsing. Newlines are
//! significant: they terminate statements.

use crate::config::ResourcesConfig;
use crate::dsl::ast::SourceLocation;
use crate::error::LexError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Token types recognized by the lexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    // Literals
    String(String),
    /// Raw field name between backticks
    Backtick(String),
    /// Bare resource file name such as `logo-header.jpg`
    Filename(String),

    // Identifiers and keywords
    Identifier(String),
    Keyword(Keyword),

    // Punctuation
    Colon,
    Dot,
    LeftParen,
    RightParen,
    Equals,

    // Special
    Newline,
    Eof,
}

impl TokenType {
    /// Human-readable description used in parse errors
    pub fn describe(&self) -> String {
        match self {
            TokenType::String(s) => format!("string \"{}\"", s),
            TokenType::Backtick(s) => format!("field `{}`", s),
            TokenType::Filename(s) => format!("file name '{}'", s),
            TokenType::Identifier(s) => format!("identifier '{}'", s),
            TokenType::Keyword(k) => format!("'{}'", k),
            TokenType::Colon => "':'".to_string(),
            TokenType::Dot => "'.'".to_string(),
            TokenType::LeftParen => "'('".to_string(),
            TokenType::RightParen => "')'".to_string(),
            TokenType::Equals => "'='".to_string(),
            TokenType::Newline => "newline".to_string(),
            TokenType::Eof => "end of input".to_string(),
        }
    }
}

/// Reserved words. Multi-word keywords are single tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    Function,
    EndFunction,
    Write,
    If,
    Else,
    EndIf,
    DoForEach,
    In,
    EndDo,
    SearchFile,
    Empty,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Function => "FUNCTION",
            Keyword::EndFunction => "END FUNCTION",
            Keyword::Write => "WRITE",
            Keyword::If => "IF",
            Keyword::Else => "ELSE",
            Keyword::EndIf => "END IF",
            Keyword::DoForEach => "DO FOR EACH",
            Keyword::In => "IN",
            Keyword::EndDo => "END DO",
            Keyword::SearchFile => "SEARCH_FILE",
            Keyword::Empty => "EMPTY",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token with location information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token_type: TokenType,
    /// Source text the token was read from
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub length: usize,
}

impl Token {
    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }
}

/// Tokenize `source` in one call, recognizing the default resource extensions
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

/// Tokenize `source`, treating `stem.ext` as a file name only for the given
/// extensions
pub fn tokenize_with_extensions(
    source: &str,
    extensions: &[String],
) -> Result<Vec<Token>, LexError> {
    Lexer::new(source)
        .with_resource_extensions(extensions.iter().cloned())
        .tokenize()
}

/// Lexer for cvscript
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    keywords: HashMap<&'static str, Keyword>,
    /// Lowercase suffixes that make `stem.ext` a file name
    resource_extensions: Vec<String>,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        let mut keywords = HashMap::new();
        keywords.insert("FUNCTION", Keyword::Function);
        keywords.insert("WRITE", Keyword::Write);
        keywords.insert("IF", Keyword::If);
        keywords.insert("ELSE", Keyword::Else);
        keywords.insert("IN", Keyword::In);
        keywords.insert("SEARCH_FILE", Keyword::SearchFile);
        keywords.insert("EMPTY", Keyword::Empty);

        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            keywords,
            resource_extensions: ResourcesConfig::default().extensions,
        }
    }

    /// Replace the suffixes that mark a dotted word as a file name
    pub fn with_resource_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_extensions = extensions
            .into_iter()
            .map(|ext| ext.into().to_lowercase())
            .collect();
        self
    }

    /// Tokenize the entire input. The last token is always `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.token_type, TokenType::Eof);
            tokens.push(token);

            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments();

        let start = self.location();

        let ch = match self.current_char() {
            Some(ch) => ch,
            None => return Ok(self.make_token(TokenType::Eof, start)),
        };

        let token_type = match ch {
            '"' => TokenType::String(self.read_string(start)?),
            '`' => TokenType::Backtick(self.read_backtick(start)?),

            c if c.is_alphabetic() || c == '_' => self.read_word(),
            c if c.is_ascii_digit() => {
                let word = self.read_filename_chars();
                if word.contains('.') || word.contains('-') {
                    TokenType::Filename(word)
                } else {
                    return Err(LexError::new(
                        format!("Unexpected number '{}'", word),
                        start,
                    ));
                }
            }

            ':' => { self.advance(); TokenType::Colon }
            '.' => { self.advance(); TokenType::Dot }
            '(' => { self.advance(); TokenType::LeftParen }
            ')' => { self.advance(); TokenType::RightParen }
            '=' => { self.advance(); TokenType::Equals }

            '\n' => {
                self.advance();
                self.line += 1;
                self.column = 1;
                TokenType::Newline
            }

            _ => {
                return Err(LexError::new(
                    format!("Unexpected character '{}'", ch),
                    start,
                ));
            }
        };

        Ok(self.make_token(token_type, start))
    }

    fn make_token(&self, token_type: TokenType, start: SourceLocation) -> Token {
        let lexeme: String = self.input[start.offset..self.position].iter().collect();
        Token {
            token_type,
            length: self.position - start.offset,
            lexeme,
            line: start.line,
            column: start.column,
            offset: start.offset,
        }
    }

    /// Skip blanks (but not newlines) and `//` comments
    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch == '/' && self.peek_char() == Some('/') {
                while let Some(c) = self.current_char() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else if ch.is_whitespace() && ch != '\n' {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read an identifier, keyword (possibly multi-word) or bare file name
    fn read_word(&mut self) -> TokenType {
        let word = self.read_identifier();

        let continues_as_filename = match self.current_char() {
            Some('-') => true,
            Some('.') => self.peek_char().is_some_and(|c| c.is_alphanumeric()),
            _ => false,
        };
        if continues_as_filename {
            let saved = (self.position, self.column);
            let name = format!("{}{}", word, self.read_filename_chars());
            if self.is_resource_name(&name) {
                return TokenType::Filename(name);
            }
            // `entity.field` without backticks; leave the dot to the parser
            (self.position, self.column) = saved;
        }

        match word.as_str() {
            "END" => {
                if self.match_following_word("IF") {
                    return TokenType::Keyword(Keyword::EndIf);
                }
                if self.match_following_word("DO") {
                    return TokenType::Keyword(Keyword::EndDo);
                }
                if self.match_following_word("FUNCTION") {
                    return TokenType::Keyword(Keyword::EndFunction);
                }
            }
            "DO" => {
                let saved = (self.position, self.column);
                if self.match_following_word("FOR") && self.match_following_word("EACH") {
                    return TokenType::Keyword(Keyword::DoForEach);
                }
                (self.position, self.column) = saved;
            }
            _ => {}
        }

        match self.keywords.get(word.as_str()) {
            Some(keyword) => TokenType::Keyword(*keyword),
            None => TokenType::Identifier(word),
        }
    }

    /// A dashed word, or a dotted one ending in a known resource extension
    fn is_resource_name(&self, name: &str) -> bool {
        if name.contains('-') {
            return true;
        }
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                let ext = ext.to_lowercase();
                self.resource_extensions.iter().any(|known| *known == ext)
            }
            _ => false,
        }
    }

    /// Consume blanks followed by exactly `expected` as a whole word.
    /// Leaves the position untouched when the next word differs.
    fn match_following_word(&mut self, expected: &str) -> bool {
        let saved = (self.position, self.column);

        let mut saw_blank = false;
        while let Some(ch) = self.current_char() {
            if ch == ' ' || ch == '\t' {
                saw_blank = true;
                self.advance();
            } else {
                break;
            }
        }

        if saw_blank {
            let starts_word = self
                .current_char()
                .is_some_and(|c| c.is_alphabetic() || c == '_');
            if starts_word && self.read_identifier() == expected {
                return true;
            }
        }

        (self.position, self.column) = saved;
        false
    }

    /// Read a double-quoted string literal
    fn read_string(&mut self, start: SourceLocation) -> Result<String, LexError> {
        self.advance(); // Skip opening quote
        let mut string = String::new();

        while let Some(ch) = self.current_char() {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(string);
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => string.push('\n'),
                        Some('t') => string.push('\t'),
                        Some('\\') => string.push('\\'),
                        Some('"') => string.push('"'),
                        Some('\n') | None => break,
                        Some(other) => {
                            string.push('\\');
                            string.push(other);
                        }
                    }
                    self.advance();
                }
                '\n' => break,
                _ => {
                    string.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::new("Unterminated string literal", start))
    }

    /// Read a backtick-delimited field name; it may not span lines
    fn read_backtick(&mut self, start: SourceLocation) -> Result<String, LexError> {
        self.advance(); // Skip opening backtick
        let mut name = String::new();

        while let Some(ch) = self.current_char() {
            match ch {
                '`' => {
                    self.advance();
                    return Ok(name);
                }
                '\n' => break,
                _ => {
                    name.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::new("Unterminated backtick span", start))
    }

    fn read_identifier(&mut self) -> String {
        let mut identifier = String::new();

        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        identifier
    }

    fn read_filename_chars(&mut self) -> String {
        let mut name = String::new();

        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.') {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        name
    }

    fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            offset: self.position,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        if self.position < self.input.len() {
            self.position += 1;
            self.column += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenType> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_write_attribute_tokens() {
        let tokens = kinds("WRITE BLOCK.`title`");
        assert_eq!(
            tokens,
            vec![
                TokenType::Keyword(Keyword::Write),
                TokenType::Identifier("BLOCK".to_string()),
                TokenType::Dot,
                TokenType::Backtick("title".to_string()),
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_multi_word_keywords() {
        let tokens = kinds("DO FOR EACH e IN EDUCATION\nEND DO\nEND IF\nEND   FUNCTION");
        assert_eq!(tokens[0], TokenType::Keyword(Keyword::DoForEach));
        assert_eq!(tokens[2], TokenType::Keyword(Keyword::In));
        assert_eq!(tokens[5], TokenType::Keyword(Keyword::EndDo));
        assert_eq!(tokens[7], TokenType::Keyword(Keyword::EndIf));
        assert_eq!(tokens[9], TokenType::Keyword(Keyword::EndFunction));
    }

    #[test]
    fn test_partial_multi_word_falls_back_to_identifier() {
        let tokens = kinds("DO FOR x");
        assert_eq!(tokens[0], TokenType::Identifier("DO".to_string()));
        assert_eq!(tokens[1], TokenType::Identifier("FOR".to_string()));
        assert_eq!(tokens[2], TokenType::Identifier("x".to_string()));
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        let tokens = kinds("write If");
        assert_eq!(tokens[0], TokenType::Identifier("write".to_string()));
        assert_eq!(tokens[1], TokenType::Identifier("If".to_string()));
    }

    #[test]
    fn test_filename_literal() {
        let tokens = kinds("WRITE logo-header.jpg\nWRITE photo.png");
        assert_eq!(tokens[1], TokenType::Filename("logo-header.jpg".to_string()));
        assert_eq!(tokens[4], TokenType::Filename("photo.png".to_string()));
    }

    #[test]
    fn test_dotted_word_without_known_extension_is_not_a_filename() {
        let tokens = kinds("WRITE BLOCK.title");
        assert_eq!(
            tokens,
            vec![
                TokenType::Keyword(Keyword::Write),
                TokenType::Identifier("BLOCK".to_string()),
                TokenType::Dot,
                TokenType::Identifier("title".to_string()),
                TokenType::Eof,
            ]
        );
        assert_eq!(kinds("WRITE Logo.PNG")[1], TokenType::Filename("Logo.PNG".to_string()));
    }

    #[test]
    fn test_configured_resource_extensions() {
        let tokens = tokenize_with_extensions("WRITE cv.pdf\nWRITE photo.png", &["pdf".to_string()])
            .unwrap();
        assert_eq!(tokens[1].token_type, TokenType::Filename("cv.pdf".to_string()));
        assert_eq!(tokens[4].token_type, TokenType::Identifier("photo".to_string()));
        assert_eq!(tokens[5].token_type, TokenType::Dot);
    }

    #[test]
    fn test_search_file_tokens() {
        let tokens = kinds("SEARCH_FILE name=BLOCK.`name`");
        assert_eq!(tokens[0], TokenType::Keyword(Keyword::SearchFile));
        assert_eq!(tokens[1], TokenType::Identifier("name".to_string()));
        assert_eq!(tokens[2], TokenType::Equals);
        assert_eq!(tokens[3], TokenType::Identifier("BLOCK".to_string()));
    }

    #[test]
    fn test_string_escapes() {
        let tokens = kinds(r#"WRITE "a\"b\n""#);
        assert_eq!(tokens[1], TokenType::String("a\"b\n".to_string()));
    }

    #[test]
    fn test_comments_are_dropped() {
        let tokens = kinds("// heading\nWRITE \"x\" // trailing");
        assert_eq!(tokens[0], TokenType::Newline);
        assert_eq!(tokens[1], TokenType::Keyword(Keyword::Write));
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("WRITE \"a\"\n  IF").unwrap();
        let if_token = &tokens[3];
        assert_eq!(if_token.line, 2);
        assert_eq!(if_token.column, 3);
        assert_eq!(if_token.lexeme, "IF");
    }

    #[test]
    fn test_unterminated_backtick() {
        let err = tokenize("WRITE BLOCK.`title\n").unwrap_err();
        assert_eq!(err.location.line, 1);
        assert_eq!(err.location.column, 13);
        assert!(err.message.contains("backtick"));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("\nWRITE \"oops").unwrap_err();
        assert_eq!(err.location.line, 2);
        assert_eq!(err.location.column, 7);
        assert!(err.message.contains("string"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("WRITE $").unwrap_err();
        assert!(err.message.contains('$'));
    }

    #[test]
    fn test_empty_input_is_eof() {
        assert_eq!(kinds(""), vec![TokenType::Eof]);
    }
}
