//! Parser for the catalogue's field type syntax.
//!
//! ```text
//! type   := member ("|" member)*
//! member := NAME ("[" args "]")?
//! args   := arg ("," arg)*
//! arg    := type | STRING | INTEGER | "..."
//! ```
//!
//! | Syntax | Type |
//! |--------|------|
//! | `int`, `float`, `decimal`, `str`, `bool`, `bytes` | primitives |
//! | `uuid`, `date`, `time`, `datetime`, `Any`, `Never`, `None` | primitives |
//! | `list[T]`, `dict[K, V]`, `tuple[A, B]`, `tuple[T, ...]` | containers |
//! | `Optional[T]`, `A \| B`, `Union[A, B]` | unions |
//! | `Literal["a", 1]` | literal values |
//! | `Page[int]` | generic record application |
//! | `T` | type parameter of the enclosing record |
//! | anything else | reference to a catalogue record or enum |

use std::collections::HashMap;
use std::sync::Arc;

use typeforge::expr::Scalar;
use typeforge::{RecordDef, TypeExpr};

use crate::error::TypeParseError;

type Result<T> = std::result::Result<T, TypeParseError>;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Str(String),
    Int(i64),
    Ellipsis,
    Open,
    Close,
    Comma,
    Pipe,
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '[' | ']' | ',' | '|' => {
                chars.next();
                let token = match c {
                    '[' => Token::Open,
                    ']' => Token::Close,
                    ',' => Token::Comma,
                    _ => Token::Pipe,
                };
                tokens.push((offset, token));
            }
            '.' => {
                let dots: String = std::iter::from_fn(|| chars.next_if(|&(_, c)| c == '.'))
                    .map(|(_, c)| c)
                    .collect();
                if dots != "..." {
                    return Err(TypeParseError::new(offset, "expected '...'"));
                }
                tokens.push((offset, Token::Ellipsis));
            }
            '"' | '\'' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, ch)) if ch == c => break,
                        Some((_, ch)) => value.push(ch),
                        None => return Err(TypeParseError::new(offset, "unterminated string")),
                    }
                }
                tokens.push((offset, Token::Str(value)));
            }
            c if c == '-' || c.is_ascii_digit() => {
                let mut digits = String::new();
                if c == '-' {
                    digits.push(c);
                    chars.next();
                }
                digits.extend(
                    std::iter::from_fn(|| chars.next_if(|&(_, c)| c.is_ascii_digit()))
                        .map(|(_, c)| c),
                );
                let value = digits
                    .parse::<i64>()
                    .map_err(|_| TypeParseError::new(offset, "invalid integer"))?;
                tokens.push((offset, Token::Int(value)));
            }
            c if c.is_alphabetic() || c == '_' => {
                let name: String = std::iter::from_fn(|| {
                    chars.next_if(|&(_, c)| c.is_alphanumeric() || c == '_' || c == '.')
                })
                .map(|(_, c)| c)
                .collect();
                tokens.push((offset, Token::Name(name)));
            }
            other => {
                return Err(TypeParseError::new(
                    offset,
                    format!("unexpected character '{other}'"),
                ))
            }
        }
    }
    Ok(tokens)
}

/// Parses type text in the scope of one record declaration.
pub struct TypeParser<'a> {
    generics: &'a HashMap<String, Arc<RecordDef>>,
    params: &'a [String],
}

impl<'a> TypeParser<'a> {
    /// `generics` are the generic records declared so far; `params` are the
    /// type parameters of the record whose fields are being parsed.
    pub fn new(generics: &'a HashMap<String, Arc<RecordDef>>, params: &'a [String]) -> Self {
        Self { generics, params }
    }

    pub fn parse(&self, text: &str) -> Result<TypeExpr> {
        let tokens = tokenize(text)?;
        let mut cursor = Cursor {
            tokens: &tokens,
            pos: 0,
            end: text.len(),
        };
        let ty = self.parse_type(&mut cursor)?;
        match cursor.peek() {
            None => Ok(ty),
            Some(_) => Err(cursor.error("unexpected trailing input")),
        }
    }

    fn parse_type(&self, cursor: &mut Cursor<'_>) -> Result<TypeExpr> {
        let mut members = vec![self.parse_member(cursor)?];
        while cursor.eat(&Token::Pipe) {
            members.push(self.parse_member(cursor)?);
        }
        Ok(match members.len() {
            1 => members.remove(0),
            _ => TypeExpr::union(members),
        })
    }

    fn parse_member(&self, cursor: &mut Cursor<'_>) -> Result<TypeExpr> {
        let name = match cursor.peek() {
            Some(Token::Name(name)) => {
                cursor.advance();
                name.clone()
            }
            _ => return Err(cursor.error("expected a type name")),
        };

        if !cursor.eat(&Token::Open) {
            return Ok(self.bare(&name));
        }

        if name == "Literal" {
            let values = self.parse_scalars(cursor)?;
            return Ok(TypeExpr::Literal(values));
        }

        let mut args = Vec::new();
        let mut variadic = false;
        loop {
            if cursor.eat(&Token::Ellipsis) {
                variadic = true;
            } else {
                args.push(self.parse_type(cursor)?);
            }
            if cursor.eat(&Token::Close) {
                break;
            }
            if !cursor.eat(&Token::Comma) {
                return Err(cursor.error("expected ',' or ']'"));
            }
        }
        self.apply(&name, args, variadic, cursor)
    }

    fn parse_scalars(&self, cursor: &mut Cursor<'_>) -> Result<Vec<Scalar>> {
        let mut values = Vec::new();
        loop {
            match cursor.peek() {
                Some(Token::Str(s)) => values.push(Scalar::Str(s.clone())),
                Some(Token::Int(i)) => values.push(Scalar::Int(*i)),
                _ => return Err(cursor.error("Literal accepts only strings and integers")),
            }
            cursor.advance();
            if cursor.eat(&Token::Close) {
                return Ok(values);
            }
            if !cursor.eat(&Token::Comma) {
                return Err(cursor.error("expected ',' or ']'"));
            }
        }
    }

    fn bare(&self, name: &str) -> TypeExpr {
        match name {
            "int" => TypeExpr::Int,
            "float" => TypeExpr::Float,
            "decimal" | "Decimal" => TypeExpr::Decimal,
            "str" => TypeExpr::Str,
            "bool" => TypeExpr::Bool,
            "bytes" => TypeExpr::Bytes,
            "uuid" | "UUID" => TypeExpr::Uuid,
            "date" => TypeExpr::Date,
            "time" => TypeExpr::Time,
            "datetime" => TypeExpr::DateTime,
            "Any" => TypeExpr::Any,
            "Never" => TypeExpr::Never,
            "None" => TypeExpr::None,
            name if self.params.iter().any(|p| p == name) => TypeExpr::param(name),
            name => TypeExpr::forward(name),
        }
    }

    fn apply(
        &self,
        name: &str,
        mut args: Vec<TypeExpr>,
        variadic: bool,
        cursor: &Cursor<'_>,
    ) -> Result<TypeExpr> {
        let count = args.len();
        let arity = |expected: usize| {
            if count == expected && !variadic {
                Ok(())
            } else {
                Err(cursor.error(format!("{name} takes {expected} argument(s)")))
            }
        };
        match name {
            "list" | "List" => {
                arity(1)?;
                Ok(TypeExpr::list(args.remove(0)))
            }
            "dict" | "Dict" => {
                arity(2)?;
                let value = args.remove(1);
                Ok(TypeExpr::dict(args.remove(0), value))
            }
            "Optional" => {
                arity(1)?;
                Ok(TypeExpr::optional(args.remove(0)))
            }
            "tuple" | "Tuple" if variadic => match args.as_slice() {
                [_] => Ok(TypeExpr::VarTuple(Box::new(args.remove(0)))),
                _ => Err(cursor.error("'...' must follow exactly one type")),
            },
            "tuple" | "Tuple" => Ok(TypeExpr::tuple(args)),
            "Union" if !variadic => Ok(TypeExpr::union(args)),
            name => match self.generics.get(name) {
                Some(def) if !variadic => Ok(TypeExpr::generic(def, args)),
                Some(_) => Err(cursor.error("'...' is only allowed in tuple[...]")),
                None => Err(cursor.error(format!("'{name}' is not a generic type"))),
            },
        }
    }
}

struct Cursor<'t> {
    tokens: &'t [(usize, Token)],
    pos: usize,
    end: usize,
}

impl<'t> Cursor<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos).map(|(_, token)| token)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Offset of the next unconsumed token, or the end of the text.
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.end, |(offset, _)| *offset)
    }

    fn error(&self, message: impl Into<String>) -> TypeParseError {
        TypeParseError::new(self.offset(), message)
    }
}
