use super::Error;
use crate::mach::object::{self, Obj};
use crate::mach::runtime::Runtime;

type Result<T> = std::result::Result<T, Error>;

/// ## Parser
///
/// A cursor over a character source. Each type's parser either consumes a
/// prefix and returns an object, or returns `None` so the dispatcher can
/// try the next candidate. The precedence field disambiguates `+`/`-`
/// inside algebraic expressions: zero means command context, non-zero
/// means an expression is being parsed and signs belong to operators.

pub struct Parser<'a> {
    pub source: &'a str,
    pub pos: usize,
    pub precedence: i32,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Parser<'a> {
        Parser {
            source,
            pos: 0,
            precedence: 0,
        }
    }

    pub fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn advance(&mut self, bytes: usize) {
        self.pos += bytes;
    }

    pub fn take(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    /// True when the character cannot be part of a name or keyword, so a
    /// keyword match ending before it is a whole-word match.
    pub fn is_separator(c: char) -> bool {
        !(c.is_alphanumeric() || c == '_')
    }

    /// Case-insensitive whole-keyword match; consumes it when found.
    pub fn match_keyword(&mut self, keyword: &str) -> bool {
        let rest = self.rest();
        if rest.len() < keyword.len() || !rest.is_char_boundary(keyword.len()) {
            return false;
        }
        let (head, tail) = rest.split_at(keyword.len());
        if !head.eq_ignore_ascii_case(keyword) {
            return false;
        }
        match tail.chars().next() {
            Some(c) if !Parser::is_separator(c) => return false,
            _ => {}
        }
        self.pos += keyword.len();
        true
    }

    /// Exact punctuation match (no word-boundary requirement).
    pub fn match_str(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }
}

/// Try every candidate parser in order. A candidate that returns `None`
/// must not have consumed anything it can't put back: the cursor rewinds
/// before the next attempt.
pub fn parse_object(rt: &mut Runtime, p: &mut Parser) -> Result<Obj> {
    p.skip_whitespace();
    if p.at_end() {
        return Err(error!(SyntaxError, p.pos));
    }
    rt.trace.record("parse", &format!("at {}: {:.16}", p.pos, p.rest()));
    for parse in object::PARSERS {
        let start = p.pos;
        let precedence = p.precedence;
        match parse(rt, p) {
            Ok(Some(obj)) => return Ok(obj),
            Ok(None) => {
                p.pos = start;
                p.precedence = precedence;
            }
            Err(e) => return Err(e.at(start)),
        }
    }
    Err(error!(SyntaxError, p.pos))
}
