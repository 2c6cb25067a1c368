//! Strict single-grammar schema parser.
//!
//! ```text
//! Schema    = Definition*
//! Definition = Table | Enum | Ref
//! Table     = "Table" ident ("as" ident)? "{" Attribute* Note? Attribute* "}"
//! Note      = "Note" ":" string
//! Enum      = "Enum" ident "{" (ident | string)* "}"
//! Ref       = "Ref" ident? ":" Path ("<" | ">") Path
//! Attribute = ident Type ("[" Property ("," Property)* "]")?
//! Type      = ident ("(" num ("," num)* ")")?
//! Property  = "pk" | "primary" "key" | "nn" | "not" "null"
//!           | "note" ":" string | "ref" ":" ("<" | ">") Path
//! Path      = ident "." ident
//! ```
//!
//! References are collected while parsing and bound once every table exists,
//! so declaration order does not matter. `a < b` makes `a` the referencing
//! column, `a > b` makes `b` the referencing column.

use crate::enums::{self, EnumRegistry};
use crate::lexer::{LexError, Lexer, Token};
use crate::model::{Column, ColumnRef, Table};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),
    #[error("Unexpected token: {0:?}, expected {1}")]
    Unexpected(Token, &'static str),
    #[error("Unexpected end of input")]
    UnexpectedEof,
}

/// Parse a whole document with the strict grammar.
pub fn parse_strict(input: &str) -> Result<Vec<Table>, ParseError> {
    Parser::new(input)?.parse()
}

#[derive(Debug, Clone, PartialEq)]
struct PendingRef {
    name: Option<String>,
    source: ColumnRef,
    target: ColumnRef,
}

/// Scratch state for one parse call.
#[derive(Debug, Default)]
struct ParseContext {
    refs: Vec<PendingRef>,
    enums: EnumRegistry,
}

impl ParseContext {
    fn push_ref(&mut self, name: Option<String>, arrow: Arrow, left: ColumnRef, right: ColumnRef) {
        let (source, target) = match arrow {
            Arrow::Lt => (left, right),
            Arrow::Gt => (right, left),
        };
        self.refs.push(PendingRef {
            name,
            source,
            target,
        });
    }

    /// Bind collected references, then attach enum members.
    fn finish(self, mut tables: Vec<Table>) -> Vec<Table> {
        for pending in self.refs {
            let column = tables
                .iter_mut()
                .find(|t| t.name == pending.source.table)
                .and_then(|t| t.column_mut(&pending.source.column));

            let Some(column) = column else {
                log::debug!(
                    "dropping reference {} -> {}",
                    pending.source,
                    pending.target
                );
                continue;
            };

            column.foreign_key = Some(pending.target);
            if let Some(name) = pending.name {
                column.foreign_key_name = Some(name);
            }
        }

        enums::propagate(&mut tables, &self.enums);
        tables
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arrow {
    Lt,
    Gt,
}

#[derive(Debug, Default)]
struct Properties {
    pk: bool,
    nn: bool,
    note: Option<String>,
    reference: Option<(Arrow, ColumnRef)>,
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    ctx: ParseContext,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self {
            tokens,
            pos: 0,
            ctx: ParseContext::default(),
        })
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> &Token {
        let tok = self.tokens.get(self.pos).unwrap_or(&Token::Eof);
        self.pos += 1;
        tok
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.advance().clone() {
            Token::Ident(s) => Ok(s),
            Token::Eof => Err(ParseError::UnexpectedEof),
            tok => Err(ParseError::Unexpected(tok, "identifier")),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        match self.advance().clone() {
            Token::Str(s) => Ok(s),
            Token::Eof => Err(ParseError::UnexpectedEof),
            tok => Err(ParseError::Unexpected(tok, "string")),
        }
    }

    fn expect(&mut self, expected: Token, what: &'static str) -> Result<(), ParseError> {
        let tok = self.advance().clone();
        if tok == expected {
            Ok(())
        } else if tok == Token::Eof {
            Err(ParseError::UnexpectedEof)
        } else {
            Err(ParseError::Unexpected(tok, what))
        }
    }

    /// Keywords match case-insensitively (`Table`, `table`, `TABLE`).
    fn check_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s.eq_ignore_ascii_case(keyword))
    }

    pub fn parse(mut self) -> Result<Vec<Table>, ParseError> {
        let mut tables = Vec::new();

        while *self.peek() != Token::Eof {
            if self.check_keyword("table") {
                self.advance();
                tables.push(self.parse_table()?);
            } else if self.check_keyword("enum") {
                self.advance();
                self.parse_enum()?;
            } else if self.check_keyword("ref") {
                self.advance();
                self.parse_relation()?;
            } else {
                return Err(ParseError::Unexpected(self.peek().clone(), "Table, Enum, or Ref"));
            }
        }

        log::debug!(
            "strict parse: {} tables, {} enums, {} references",
            tables.len(),
            self.ctx.enums.len(),
            self.ctx.refs.len()
        );
        Ok(self.ctx.finish(tables))
    }

    fn parse_table(&mut self) -> Result<Table, ParseError> {
        let mut table = Table::new(self.expect_ident()?);

        if self.check_keyword("as") {
            self.advance();
            table.alias = Some(self.expect_ident()?);
        }

        self.expect(Token::LBrace, "{")?;

        while *self.peek() != Token::RBrace {
            if self.check_keyword("note") && *self.peek_at(1) == Token::Colon {
                if table.note.is_some() {
                    return Err(ParseError::Unexpected(self.peek().clone(), "attribute"));
                }
                self.advance();
                self.advance();
                table.note = Some(self.expect_string()?);
            } else {
                let column = self.parse_attribute(&table.name)?;
                table.columns.push(column);
            }
        }

        self.expect(Token::RBrace, "}")?;
        Ok(table)
    }

    fn parse_attribute(&mut self, table: &str) -> Result<Column, ParseError> {
        let name = self.expect_ident()?;
        let typ = self.parse_type()?;

        let props = if *self.peek() == Token::LBracket {
            self.advance();
            self.parse_properties()?
        } else {
            Properties::default()
        };

        if let Some((arrow, target)) = props.reference {
            let this = ColumnRef::new(table, name.as_str());
            self.ctx.push_ref(None, arrow, this, target);
        }

        let mut column = Column::new(name, typ);
        column.is_primary_key = props.pk;
        column.is_nullable = !props.nn;
        column.note = props.note;
        Ok(column)
    }

    fn parse_type(&mut self) -> Result<String, ParseError> {
        let mut typ = self.expect_ident()?;

        if *self.peek() == Token::LParen {
            self.advance();
            typ.push('(');
            loop {
                match self.advance().clone() {
                    Token::Num(digits) => typ.push_str(&digits),
                    Token::Eof => return Err(ParseError::UnexpectedEof),
                    tok => return Err(ParseError::Unexpected(tok, "type precision")),
                }
                match self.advance().clone() {
                    Token::Comma => typ.push(','),
                    Token::RParen => break,
                    Token::Eof => return Err(ParseError::UnexpectedEof),
                    tok => return Err(ParseError::Unexpected(tok, ", or )")),
                }
            }
            typ.push(')');
        }

        Ok(typ)
    }

    /// Properties after the opening `[`, through the closing `]`.
    fn parse_properties(&mut self) -> Result<Properties, ParseError> {
        let mut props = Properties::default();

        loop {
            if self.check_keyword("pk") {
                self.advance();
                props.pk = true;
            } else if self.check_keyword("primary") {
                self.advance();
                if !self.check_keyword("key") {
                    return Err(ParseError::Unexpected(self.peek().clone(), "key"));
                }
                self.advance();
                props.pk = true;
            } else if self.check_keyword("nn") {
                self.advance();
                props.nn = true;
            } else if self.check_keyword("not") {
                self.advance();
                if !self.check_keyword("null") {
                    return Err(ParseError::Unexpected(self.peek().clone(), "null"));
                }
                self.advance();
                props.nn = true;
            } else if self.check_keyword("note") {
                self.advance();
                self.expect(Token::Colon, ":")?;
                props.note = Some(self.expect_string()?);
            } else if self.check_keyword("ref") {
                self.advance();
                self.expect(Token::Colon, ":")?;
                let arrow = self.parse_arrow()?;
                let target = self.parse_path()?;
                props.reference = Some((arrow, target));
            } else {
                return Err(ParseError::Unexpected(self.peek().clone(), "pk, nn, note, or ref"));
            }

            match self.advance().clone() {
                Token::Comma => continue,
                Token::RBracket => break,
                Token::Eof => return Err(ParseError::UnexpectedEof),
                tok => return Err(ParseError::Unexpected(tok, ", or ]")),
            }
        }

        Ok(props)
    }

    fn parse_enum(&mut self) -> Result<(), ParseError> {
        let name = self.expect_ident()?;
        self.expect(Token::LBrace, "{")?;

        let mut members = Vec::new();
        loop {
            match self.advance().clone() {
                Token::Ident(s) | Token::Str(s) => members.push(s),
                Token::Comma => {}
                Token::RBrace => break,
                Token::Eof => return Err(ParseError::UnexpectedEof),
                tok => return Err(ParseError::Unexpected(tok, "enum member")),
            }
        }

        self.ctx.enums.insert(name, members);
        Ok(())
    }

    fn parse_relation(&mut self) -> Result<(), ParseError> {
        let name = if matches!(self.peek(), Token::Ident(_)) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect(Token::Colon, ":")?;

        let left = self.parse_path()?;
        let arrow = self.parse_arrow()?;
        let right = self.parse_path()?;

        self.ctx.push_ref(name, arrow, left, right);
        Ok(())
    }

    fn parse_arrow(&mut self) -> Result<Arrow, ParseError> {
        match self.advance().clone() {
            Token::Lt => Ok(Arrow::Lt),
            Token::Gt => Ok(Arrow::Gt),
            Token::Eof => Err(ParseError::UnexpectedEof),
            tok => Err(ParseError::Unexpected(tok, "< or >")),
        }
    }

    fn parse_path(&mut self) -> Result<ColumnRef, ParseError> {
        let table = self.expect_ident()?;
        self.expect(Token::Dot, ".")?;
        let column = self.expect_ident()?;
        Ok(ColumnRef::new(table, column))
    }
}
