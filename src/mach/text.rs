use super::leb128::read_uleb;
use super::object::{self, Id, Obj};
use super::runtime::Runtime;
use crate::lang::parse::Parser;
use crate::lang::render::Renderer;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Texts and symbols
///
/// Both store a ULEB byte length followed by UTF-8 bytes. Texts render
/// quoted with `""` doubling; symbols are bare names and evaluate by
/// resolution: locals frames first, then the directory chain, executing
/// programs and pushing anything else.

pub fn size(mem: &[u8], offset: usize) -> Result<usize> {
    object::size_prefixed(mem, offset)
}

pub fn make_text(rt: &mut Runtime, text: &str) -> Result<Obj> {
    rt.emit_prefixed(Id::Text, text.as_bytes())
}

pub fn make_symbol(rt: &mut Runtime, name: &str) -> Result<Obj> {
    rt.emit_prefixed(Id::Symbol, name.as_bytes())
}

/// The UTF-8 content of a text or symbol.
pub fn text_of(rt: &Runtime, obj: Obj) -> Result<Vec<u8>> {
    let at = rt.payload(obj)?;
    let (len, llen) =
        read_uleb(rt.mem(), at).ok_or_else(|| error!(InternalError; "truncated text"))?;
    let start = at + llen;
    Ok(rt.mem()[start..start + len as usize].to_vec())
}

// ============================================================================
//
//   Parsing
//
// ============================================================================

pub fn parse_text(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    if p.peek() != Some('"') {
        return Ok(None);
    }
    let start = p.pos;
    p.advance(1);
    let mut content = String::new();
    loop {
        match p.take() {
            Some('"') => {
                // A doubled quote is an escaped quote
                if p.peek() == Some('"') {
                    p.advance(1);
                    content.push('"');
                } else {
                    return Ok(Some(make_text(rt, &content)?));
                }
            }
            Some(c) => content.push(c),
            None => return Err(error!(Unterminated, start; "text")),
        }
    }
}

pub fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn parse_symbol(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    match p.peek() {
        Some(c) if is_name_start(c) => {}
        _ => return Ok(None),
    }
    let start = p.pos;
    while let Some(c) = p.peek() {
        if is_name_char(c) {
            p.advance(c.len_utf8());
        } else {
            break;
        }
    }
    let name = &p.source[start..p.pos];
    Ok(Some(make_symbol(rt, name)?))
}

// ============================================================================
//
//   Rendering
//
// ============================================================================

pub fn render_text(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    let bytes = text_of(rt, obj)?;
    let content = String::from_utf8_lossy(&bytes).into_owned();
    r.put_char('"');
    for c in content.chars() {
        if c == '"' {
            r.put("\"\"");
        } else {
            r.put_char(c);
        }
    }
    r.put_char('"');
    Ok(())
}

pub fn render_symbol(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    let bytes = text_of(rt, obj)?;
    r.put(&String::from_utf8_lossy(&bytes));
    Ok(())
}

// ============================================================================
//
//   Evaluation
//
// ============================================================================

/// Resolve a name: locals frames innermost first, then the directory
/// chain. A directory value that is a program runs; everything else is
/// pushed. An unbound name is an error.
pub fn eval_symbol(rt: &mut Runtime, obj: Obj) -> Result<()> {
    let name = text_of(rt, obj)?;
    if let Some(value) = rt.lookup_local(&name)? {
        return rt.push(value);
    }
    if let Some(value) = super::directory::recall(rt, &name)? {
        if rt.tag(value)? == Id::Program {
            return rt.exec(value);
        }
        return rt.push(value);
    }
    Err(error!(UndefinedName; &String::from_utf8_lossy(&name)))
}
