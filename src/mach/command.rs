use super::arith;
use super::directory;
use super::integer;
use super::object::{self, Id, Obj};
use super::runtime::Runtime;
use super::settings::Mode;
use super::text;
use crate::lang::parse::Parser;
use crate::lang::render::Renderer;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Commands
///
/// A command object is nothing but its type tag: one byte in memory.
/// Evaluating one runs its handler, which reads operands from the top of
/// the operand stack and pushes results.

/// Punctuation spellings, longest first so `==` wins over `=` parses.
static PUNCT: &[(&str, Id)] = &[
    ("==", Id::Eq),
    ("!=", Id::NotEq),
    ("<=", Id::LtEq),
    (">=", Id::GtEq),
    ("≠", Id::NotEq),
    ("≤", Id::LtEq),
    ("≥", Id::GtEq),
    ("<", Id::Lt),
    (">", Id::Gt),
    ("+", Id::Add),
    ("-", Id::Sub),
    ("*", Id::Mul),
    ("/", Id::Div),
];

static WORDS: &[(&str, Id)] = &[
    ("dup", Id::Dup),
    ("drop", Id::Drop),
    ("swap", Id::Swap),
    ("over", Id::Over),
    ("rot", Id::Rot),
    ("depth", Id::Depth),
    ("neg", Id::Neg),
    ("inv", Id::Inv),
    ("and", Id::And),
    ("or", Id::Or),
    ("not", Id::Not),
    ("sto", Id::Sto),
    ("rcl", Id::Rcl),
    ("purge", Id::Purge),
    ("eval", Id::Eval),
    ("std", Id::Std),
    ("fix", Id::Fix),
    ("sci", Id::Sci),
    ("eng", Id::Eng),
    ("precision", Id::Precision),
];

pub fn parse(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    if p.precedence != 0 {
        // Inside an expression, operators belong to the infix parser
        return Ok(None);
    }
    for &(pat, id) in PUNCT {
        if p.match_str(pat) {
            return Ok(Some(rt.emit(id, &[])?));
        }
    }
    for &(word, id) in WORDS {
        if p.match_keyword(word) {
            return Ok(Some(rt.emit(id, &[])?));
        }
    }
    Ok(None)
}

pub fn render(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    r.put(object::ops(rt.tag(obj)?).name);
    Ok(())
}

// ============================================================================
//
//   Handlers
//
// ============================================================================

pub fn evaluate(rt: &mut Runtime, obj: Obj) -> Result<()> {
    match rt.tag(obj)? {
        Id::Dup => {
            let top = rt.peek(0)?;
            rt.push(top)
        }
        Id::Drop => rt.drop(1),
        Id::Swap => {
            let a = rt.peek(0)?;
            let b = rt.peek(1)?;
            rt.poke(0, b)?;
            rt.poke(1, a)
        }
        Id::Over => {
            let under = rt.peek(1)?;
            rt.push(under)
        }
        Id::Rot => {
            let third = rt.peek(2)?;
            let second = rt.peek(1)?;
            let first = rt.peek(0)?;
            rt.poke(2, second)?;
            rt.poke(1, first)?;
            rt.poke(0, third)
        }
        Id::Depth => {
            let depth = rt.depth();
            let obj = integer::make(rt, depth as i128)?;
            rt.push(obj)
        }

        Id::Add => binary(rt, arith::add),
        Id::Sub => binary(rt, arith::sub),
        Id::Mul => binary(rt, arith::mul),
        Id::Div => binary(rt, arith::div),
        Id::Neg => unary(rt, arith::neg),
        Id::Inv => unary(rt, arith::inv),

        Id::Eq => {
            let y = rt.peek(0)?;
            let x = rt.peek(1)?;
            let truth = arith::equal(rt, x, y)?;
            push_truth(rt, truth)
        }
        Id::NotEq => {
            let y = rt.peek(0)?;
            let x = rt.peek(1)?;
            let truth = !arith::equal(rt, x, y)?;
            push_truth(rt, truth)
        }
        Id::Lt => comparison(rt, |c| c < 0),
        Id::LtEq => comparison(rt, |c| c <= 0),
        Id::Gt => comparison(rt, |c| c > 0),
        Id::GtEq => comparison(rt, |c| c >= 0),

        Id::And => {
            let y = arith::as_truth(rt, rt.peek(0)?)?;
            let x = arith::as_truth(rt, rt.peek(1)?)?;
            push_truth(rt, x && y)
        }
        Id::Or => {
            let y = arith::as_truth(rt, rt.peek(0)?)?;
            let x = arith::as_truth(rt, rt.peek(1)?)?;
            push_truth(rt, x || y)
        }
        Id::Not => {
            let x = arith::as_truth(rt, rt.peek(0)?)?;
            rt.drop(1)?;
            let obj = integer::make_unsigned(rt, Id::Integer, !x as u64)?;
            rt.push(obj)
        }

        Id::Sto => {
            let name = quoted_name(rt, rt.peek(0)?)?;
            let value = rt.peek(1)?;
            directory::store(rt, &name, value)?;
            rt.drop(2)
        }
        Id::Rcl => {
            let name = quoted_name(rt, rt.peek(0)?)?;
            let mut value = rt.lookup_local(&name)?;
            if value.is_none() {
                value = directory::recall(rt, &name)?;
            }
            match value {
                Some(value) => {
                    rt.drop(1)?;
                    rt.push(value)
                }
                None => Err(error!(UndefinedName; &String::from_utf8_lossy(&name))),
            }
        }
        Id::Purge => {
            let name = quoted_name(rt, rt.peek(0)?)?;
            directory::purge(rt, &name)?;
            rt.drop(1)
        }

        Id::Eval => {
            let obj = rt.pop()?;
            rt.exec(obj)
        }

        Id::Std => {
            rt.settings.mode = Mode::Std;
            Ok(())
        }
        Id::Fix => set_mode(rt, Mode::Fix),
        Id::Sci => set_mode(rt, Mode::Sci),
        Id::Eng => set_mode(rt, Mode::Eng),
        Id::Precision => {
            let digits = small_argument(rt, 3, 9999)?;
            rt.settings.precision = digits as usize;
            Ok(())
        }

        other => Err(error!(InternalError; object::ops(other).name)),
    }
}

fn binary(rt: &mut Runtime, f: fn(&mut Runtime, Obj, Obj) -> Result<Obj>) -> Result<()> {
    // Operands stay on the stack while the result is computed, so they
    // remain garbage collection roots throughout
    let y = rt.peek(0)?;
    let x = rt.peek(1)?;
    let result = f(rt, x, y)?;
    rt.drop(2)?;
    rt.push(result)
}

fn unary(rt: &mut Runtime, f: fn(&mut Runtime, Obj) -> Result<Obj>) -> Result<()> {
    let x = rt.peek(0)?;
    let result = f(rt, x)?;
    rt.drop(1)?;
    rt.push(result)
}

fn comparison(rt: &mut Runtime, test: fn(i32) -> bool) -> Result<()> {
    let y = rt.peek(0)?;
    let x = rt.peek(1)?;
    let c = arith::compare(rt, x, y)?;
    push_truth(rt, test(c))
}

fn push_truth(rt: &mut Runtime, truth: bool) -> Result<()> {
    rt.drop(2)?;
    let obj = integer::make_unsigned(rt, Id::Integer, truth as u64)?;
    rt.push(obj)
}

/// A variable designator: a bare symbol, or an expression quoting one.
fn quoted_name(rt: &Runtime, obj: Obj) -> Result<Vec<u8>> {
    match rt.tag(obj)? {
        Id::Symbol => text::text_of(rt, obj),
        Id::Expression => {
            let (at, end) = super::list::content(rt, obj)?;
            let inner = Obj(at);
            if rt.tag(inner)? == Id::Symbol && rt.skip(inner)?.0 == end {
                return text::text_of(rt, inner);
            }
            Err(error!(TypeMismatch; "expected a variable name"))
        }
        _ => Err(error!(TypeMismatch; "expected a variable name")),
    }
}

fn set_mode(rt: &mut Runtime, mode: Mode) -> Result<()> {
    let digits = small_argument(rt, 0, 99)?;
    rt.settings.mode = mode;
    rt.settings.digits = digits as usize;
    Ok(())
}

fn small_argument(rt: &mut Runtime, min: u64, max: u64) -> Result<u64> {
    let obj = rt.pop()?;
    let value = match integer::as_i64(rt, obj)? {
        Some(v) if v >= 0 => v as u64,
        _ => return Err(error!(BadArgumentValue)),
    };
    if value < min || value > max {
        return Err(error!(BadArgumentValue));
    }
    Ok(value)
}
