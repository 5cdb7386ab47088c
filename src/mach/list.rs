use super::leb128::read_uleb;
use super::object::{self, Id, Obj};
use super::runtime::Runtime;
use crate::lang::parse::{self, Parser};
use crate::lang::render::Renderer;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Programs, blocks, lists and expressions
///
/// All four share the same payload: a ULEB byte length followed by the
/// concatenated inline sub-objects. A block is the anonymous body of a
/// control construct and renders without delimiters. An expression is an
/// RPN-ordered sequence entered and shown in infix form.
///
/// Parsing accumulates each committed sub-object into the scratchpad and
/// emits one object over those bytes; sub-parses may collect garbage, so
/// objects are tracked through handles while being copied.

/// Payload bounds (first, end) of the inline object run.
pub fn content(rt: &Runtime, obj: Obj) -> Result<(usize, usize)> {
    let at = rt.payload(obj)?;
    let (len, llen) =
        read_uleb(rt.mem(), at).ok_or_else(|| error!(InternalError; "truncated composite"))?;
    Ok((at + llen, at + llen + len as usize))
}

// ============================================================================
//
//   Parsing
//
// ============================================================================

fn parse_delimited(
    rt: &mut Runtime,
    p: &mut Parser,
    open: &[&str],
    close: &[&str],
    id: Id,
) -> Result<Option<Obj>> {
    if !open.iter().any(|d| p.match_str(d)) {
        return Ok(None);
    }
    let start = p.pos;
    let precedence = p.precedence;
    p.precedence = 0;
    let mark = rt.scratch_mark();
    let result = (|| loop {
        p.skip_whitespace();
        if p.at_end() {
            return Err(error!(Unterminated, start));
        }
        if close.iter().any(|d| p.match_str(d)) {
            return Ok(Some(rt.scratch_commit(id, mark, true)?));
        }
        let obj = parse::parse_object(rt, p)?;
        rt.scratch_put_obj(obj)?;
    })();
    p.precedence = precedence;
    if result.is_err() {
        rt.scratch_free(mark);
    }
    result
}

pub fn parse_program(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    parse_delimited(rt, p, &["«", "<<"], &["»", ">>"], Id::Program)
}

pub fn parse_list(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    parse_delimited(rt, p, &["{"], &["}"], Id::List)
}

// ============================================================================
//
//   Expressions: infix text, RPN storage
//
// ============================================================================

/// Binary operators by descending precedence tier; unary minus and
/// parentheses are handled in the primary parser.
static BINARY_OPS: &[(&str, Id, bool)] = &[
    ("==", Id::Eq, false),
    ("!=", Id::NotEq, false),
    ("<=", Id::LtEq, false),
    (">=", Id::GtEq, false),
    ("≠", Id::NotEq, false),
    ("≤", Id::LtEq, false),
    ("≥", Id::GtEq, false),
    ("<", Id::Lt, false),
    (">", Id::Gt, false),
    ("+", Id::Add, false),
    ("-", Id::Sub, false),
    ("*", Id::Mul, false),
    ("/", Id::Div, false),
    ("and", Id::And, true),
    ("or", Id::Or, true),
];

pub fn parse_expression(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    if !p.match_str("'") {
        return Ok(None);
    }
    let start = p.pos;
    let precedence = p.precedence;
    p.precedence = 1;
    let mark = rt.scratch_mark();
    let result = (|| {
        parse_infix(rt, p, 0)?;
        p.skip_whitespace();
        if !p.match_str("'") {
            return Err(error!(Unterminated, start; "expression"));
        }
        Ok(Some(rt.scratch_commit(Id::Expression, mark, true)?))
    })();
    p.precedence = precedence;
    if result.is_err() {
        rt.scratch_free(mark);
    }
    result
}

/// Precedence climbing; emits operands then operators into the scratch,
/// which is exactly evaluation order.
fn parse_infix(rt: &mut Runtime, p: &mut Parser, min_prec: u8) -> Result<()> {
    parse_primary(rt, p)?;
    loop {
        p.skip_whitespace();
        let mut matched = None;
        for &(pat, id, word) in BINARY_OPS {
            let prec = object::ops(id).precedence;
            if prec < min_prec {
                continue;
            }
            let hit = if word {
                p.match_keyword(pat)
            } else {
                p.match_str(pat)
            };
            if hit {
                matched = Some((id, prec));
                break;
            }
        }
        let (id, prec) = match matched {
            Some(m) => m,
            None => return Ok(()),
        };
        parse_infix(rt, p, prec + 1)?;
        rt.scratch_put(&[id as u8])?;
    }
}

fn parse_primary(rt: &mut Runtime, p: &mut Parser) -> Result<()> {
    p.skip_whitespace();
    if p.match_str("(") {
        parse_infix(rt, p, 0)?;
        p.skip_whitespace();
        if !p.match_str(")") {
            return Err(error!(SyntaxError, p.pos; "expected closing parenthesis"));
        }
        return Ok(());
    }
    if p.match_str("-") {
        parse_primary(rt, p)?;
        return rt.scratch_put(&[Id::Neg as u8]);
    }
    // A number or a name
    if let Some(obj) = super::integer::parse(rt, p)? {
        return rt.scratch_put_obj(obj);
    }
    if let Some(obj) = super::decimal::parse(rt, p)? {
        return rt.scratch_put_obj(obj);
    }
    if let Some(obj) = super::text::parse_symbol(rt, p)? {
        return rt.scratch_put_obj(obj);
    }
    Err(error!(SyntaxError, p.pos; "expected an operand"))
}

// ============================================================================
//
//   Rendering
//
// ============================================================================

fn render_items(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    let (mut at, end) = content(rt, obj)?;
    let mut first = true;
    while at < end {
        if !first {
            r.put_char(' ');
        }
        first = false;
        object::render(rt, Obj(at), r)?;
        at = object::skip_at(rt.mem(), at)?;
    }
    Ok(())
}

pub fn render_program(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    r.put("« ");
    render_items(rt, obj, r)?;
    r.space();
    r.put("»");
    Ok(())
}

pub fn render_block(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    render_items(rt, obj, r)
}

pub fn render_list(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    r.put("{ ");
    render_items(rt, obj, r)?;
    r.space();
    r.put("}");
    Ok(())
}

/// Rebuild infix text from the RPN run with a small precedence-tracking
/// stack, parenthesizing only where re-parsing would bind differently.
pub fn render_expression(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    let (mut at, end) = content(rt, obj)?;
    let mut stack: Vec<(String, u8)> = vec![];
    while at < end {
        let id = rt.tag(Obj(at))?;
        if id.is_command() {
            let ops = object::ops(id);
            match ops.arity {
                1 => {
                    let (x, xp) = stack.pop().ok_or_else(
                        || error!(InternalError; "malformed expression"),
                    )?;
                    let body = if xp < 10 { format!("({})", x) } else { x };
                    stack.push((format!("-{}", body), 10));
                }
                _ => {
                    let (y, yp) = stack.pop().ok_or_else(
                        || error!(InternalError; "malformed expression"),
                    )?;
                    let (x, xp) = stack.pop().ok_or_else(
                        || error!(InternalError; "malformed expression"),
                    )?;
                    let prec = ops.precedence;
                    let lhs = if xp < prec { format!("({})", x) } else { x };
                    let rhs = if yp <= prec { format!("({})", y) } else { y };
                    let spaced = ops.name.chars().any(|c| c.is_alphabetic());
                    let text = if spaced {
                        format!("{} {} {}", lhs, ops.name, rhs)
                    } else {
                        format!("{}{}{}", lhs, ops.name, rhs)
                    };
                    stack.push((text, prec));
                }
            }
        } else {
            let mut sub = Renderer::new(r.settings.clone());
            object::render(rt, Obj(at), &mut sub)?;
            stack.push((sub.take(), u8::MAX));
        }
        at = object::skip_at(rt.mem(), at)?;
    }
    r.put_char('\'');
    if let Some((text, _)) = stack.pop() {
        r.put(&text);
    }
    r.put_char('\'');
    Ok(())
}

// ============================================================================
//
//   Execution
//
// ============================================================================

/// Run the inline objects left to right. The composite may move during
/// garbage collection, so the cursor is a relative offset under a handle.
pub fn exec_block(rt: &mut Runtime, obj: Obj) -> Result<()> {
    rt.call(|rt| {
        rt.with_guard(obj, |rt, h| {
            let base = rt.guarded(h);
            let (first, end) = content(rt, base)?;
            let mut rel = first - base.0;
            let len = end - base.0;
            while rel < len {
                let base = rt.guarded(h);
                let item = Obj(base.0 + rel);
                let size = rt.size(item)?;
                rt.eval(item)?;
                rel += size;
            }
            Ok(())
        })
    })
}
