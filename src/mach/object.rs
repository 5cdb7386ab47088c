use super::leb128::read_uleb;
use super::runtime::Runtime;
use super::{command, complex, decimal, directory, fraction, integer, list, loops, text};
use crate::lang::parse::Parser;
use crate::lang::render::Renderer;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## The RPL object model
///
/// An object is a contiguous byte sequence in the arena, starting with an
/// LEB128 type tag. The payload layout is per-type, and every type can
/// compute its exact byte count from the payload alone, so objects can be
/// walked linearly in memory. Sub-objects are stored inline and are
/// themselves well-formed objects.
///
/// Dispatch is a table of operation vectors indexed by the type tag, so
/// adding a type means adding a row. Contiguous tag ranges provide the
/// cheap category tests (integer, real, complex, symbolic, command).

/// A reference to an object: a byte offset into the arena low region.
/// Only stable until the next allocation; anything that must survive a
/// garbage collection goes through a runtime handle instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obj(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Id {
    // Reals: integers first, then fractions, then decimals
    Integer,
    NegInteger,
    Based,
    Bignum,
    NegBignum,
    Fraction,
    NegFraction,
    Decimal,
    NegDecimal,
    // Complex numbers
    Rectangular,
    Polar,
    // Symbolic
    Symbol,
    Expression,
    // Aggregates
    Text,
    Program,
    Block,
    List,
    Directory,
    // Control flow
    DoUntil,
    WhileRepeat,
    StartNext,
    StartStep,
    ForNext,
    ForStep,
    IfThen,
    IfThenElse,
    // Commands
    Dup,
    Drop,
    Swap,
    Over,
    Rot,
    Depth,
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Inv,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Not,
    Sto,
    Rcl,
    Purge,
    Eval,
    Std,
    Fix,
    Sci,
    Eng,
    Precision,
}

pub const NUM_IDS: usize = Id::Precision as usize + 1;

static ALL_IDS: [Id; NUM_IDS] = [
    Id::Integer,
    Id::NegInteger,
    Id::Based,
    Id::Bignum,
    Id::NegBignum,
    Id::Fraction,
    Id::NegFraction,
    Id::Decimal,
    Id::NegDecimal,
    Id::Rectangular,
    Id::Polar,
    Id::Symbol,
    Id::Expression,
    Id::Text,
    Id::Program,
    Id::Block,
    Id::List,
    Id::Directory,
    Id::DoUntil,
    Id::WhileRepeat,
    Id::StartNext,
    Id::StartStep,
    Id::ForNext,
    Id::ForStep,
    Id::IfThen,
    Id::IfThenElse,
    Id::Dup,
    Id::Drop,
    Id::Swap,
    Id::Over,
    Id::Rot,
    Id::Depth,
    Id::Add,
    Id::Sub,
    Id::Mul,
    Id::Div,
    Id::Neg,
    Id::Inv,
    Id::Eq,
    Id::NotEq,
    Id::Lt,
    Id::LtEq,
    Id::Gt,
    Id::GtEq,
    Id::And,
    Id::Or,
    Id::Not,
    Id::Sto,
    Id::Rcl,
    Id::Purge,
    Id::Eval,
    Id::Std,
    Id::Fix,
    Id::Sci,
    Id::Eng,
    Id::Precision,
];

pub fn all_ids() -> impl Iterator<Item = Id> {
    ALL_IDS.iter().copied()
}

impl Id {
    pub fn from_tag(tag: u64) -> Option<Id> {
        ALL_IDS.get(tag as usize).copied()
    }

    pub fn is_integer(self) -> bool {
        Id::Integer <= self && self <= Id::NegBignum
    }

    pub fn is_bignum(self) -> bool {
        Id::Bignum <= self && self <= Id::NegBignum
    }

    pub fn is_fraction(self) -> bool {
        Id::Fraction <= self && self <= Id::NegFraction
    }

    pub fn is_decimal(self) -> bool {
        Id::Decimal <= self && self <= Id::NegDecimal
    }

    pub fn is_real(self) -> bool {
        Id::Integer <= self && self <= Id::NegDecimal
    }

    pub fn is_complex(self) -> bool {
        Id::Rectangular <= self && self <= Id::Polar
    }

    pub fn is_numeric(self) -> bool {
        Id::Integer <= self && self <= Id::Polar
    }

    pub fn is_strictly_symbolic(self) -> bool {
        Id::Symbol <= self && self <= Id::Expression
    }

    /// Acceptable as part of an algebraic expression.
    pub fn is_symbolic(self) -> bool {
        Id::Integer <= self && self <= Id::Expression
    }

    pub fn is_command(self) -> bool {
        Id::Dup <= self && self <= Id::Precision
    }

    /// Negative types carry their sign in the tag, not the payload.
    pub fn negated(self) -> Id {
        match self {
            Id::Integer => Id::NegInteger,
            Id::NegInteger => Id::Integer,
            Id::Bignum => Id::NegBignum,
            Id::NegBignum => Id::Bignum,
            Id::Fraction => Id::NegFraction,
            Id::NegFraction => Id::Fraction,
            Id::Decimal => Id::NegDecimal,
            Id::NegDecimal => Id::Decimal,
            other => other,
        }
    }

    pub fn is_negative_tag(self) -> bool {
        matches!(
            self,
            Id::NegInteger | Id::NegBignum | Id::NegFraction | Id::NegDecimal
        )
    }
}

/// Per-type operation vector. One row per type tag; new types are a new
/// row, not a new match arm scattered over the crate.
pub struct Ops {
    pub name: &'static str,
    pub size: fn(&[u8], usize) -> Result<usize>,
    pub render: fn(&Runtime, Obj, &mut Renderer) -> Result<()>,
    pub eval: fn(&mut Runtime, Obj) -> Result<()>,
    pub exec: fn(&mut Runtime, Obj) -> Result<()>,
    pub insert: &'static str,
    pub help: &'static str,
    pub marker: char,
    pub arity: u8,
    pub precedence: u8,
}

/// Parsers are tried in this order; each one either consumes a prefix and
/// returns an object, or returns `None` to let the next candidate try.
/// Symbols come last so keywords and command names win.
pub static PARSERS: &[fn(&mut Runtime, &mut Parser) -> Result<Option<Obj>>] = &[
    list::parse_program,
    list::parse_list,
    text::parse_text,
    list::parse_expression,
    complex::parse,
    directory::parse,
    loops::parse_do_until,
    loops::parse_while_repeat,
    loops::parse_start,
    loops::parse_for,
    loops::parse_if,
    integer::parse,
    decimal::parse,
    command::parse,
    text::parse_symbol,
];

macro_rules! ops {
    ($name:expr, $size:expr, $render:expr, $eval:expr, $exec:expr,
     $insert:expr, $help:expr, $marker:expr, $arity:expr, $prec:expr) => {
        Ops {
            name: $name,
            size: $size,
            render: $render,
            eval: $eval,
            exec: $exec,
            insert: $insert,
            help: $help,
            marker: $marker,
            arity: $arity,
            precedence: $prec,
        }
    };
}

macro_rules! literal {
    ($name:expr, $size:expr, $render:expr, $help:expr) => {
        ops!($name, $size, $render, eval_push, eval_push, "", $help, ' ', 0, 0)
    };
}

macro_rules! cmd {
    ($name:expr, $help:expr, $arity:expr, $prec:expr) => {
        ops!(
            $name,
            size_tag_only,
            command::render,
            command::evaluate,
            command::evaluate,
            "",
            $help,
            ' ',
            $arity,
            $prec
        )
    };
}

macro_rules! looping {
    ($name:expr, $size:expr, $render:expr, $eval:expr, $insert:expr, $help:expr) => {
        ops!($name, $size, $render, $eval, $eval, $insert, $help, ' ', 0, 0)
    };
}

static TABLE: [Ops; NUM_IDS] = [
    literal!("Integer", integer::size, integer::render, "Integers"),
    literal!("NegInteger", integer::size, integer::render, "Integers"),
    literal!("Based", integer::size_based, integer::render_based, "Based integers"),
    literal!("Bignum", integer::size_bignum, integer::render, "Big integers"),
    literal!("NegBignum", integer::size_bignum, integer::render, "Big integers"),
    literal!("Fraction", size_two_subs, fraction::render, "Fractions"),
    literal!("NegFraction", size_two_subs, fraction::render, "Fractions"),
    literal!("Decimal", decimal::size, decimal::render, "Decimal numbers"),
    literal!("NegDecimal", decimal::size, decimal::render, "Decimal numbers"),
    literal!("Rectangular", size_two_subs, complex::render, "Complex numbers"),
    literal!("Polar", size_two_subs, complex::render, "Complex numbers"),
    ops!(
        "Symbol",
        text::size,
        text::render_symbol,
        text::eval_symbol,
        text::eval_symbol,
        "",
        "Names",
        ' ',
        0,
        0
    ),
    ops!(
        "Expression",
        size_prefixed,
        list::render_expression,
        eval_push,
        list::exec_block,
        "''",
        "Expressions",
        ' ',
        0,
        0
    ),
    literal!("Text", text::size, text::render_text, "Text"),
    ops!(
        "Program",
        size_prefixed,
        list::render_program,
        eval_push,
        list::exec_block,
        "« »",
        "Programs",
        ' ',
        0,
        0
    ),
    ops!(
        "Block",
        size_prefixed,
        list::render_block,
        list::exec_block,
        list::exec_block,
        "",
        "Programs",
        ' ',
        0,
        0
    ),
    literal!("List", size_prefixed, list::render_list, "Lists"),
    ops!(
        "Directory",
        size_prefixed,
        directory::render,
        eval_push,
        eval_push,
        "",
        "Directories",
        ' ',
        0,
        0
    ),
    looping!(
        "DoUntil",
        size_two_subs,
        loops::render_do_until,
        loops::eval_do_until,
        "do  until  end",
        "Loops"
    ),
    looping!(
        "WhileRepeat",
        size_two_subs,
        loops::render_while_repeat,
        loops::eval_while_repeat,
        "while  repeat  end",
        "Loops"
    ),
    looping!(
        "StartNext",
        size_one_sub,
        loops::render_start_next,
        loops::eval_start_next,
        "start  next",
        "Loops"
    ),
    looping!(
        "StartStep",
        size_one_sub,
        loops::render_start_step,
        loops::eval_start_step,
        "start  step",
        "Loops"
    ),
    looping!(
        "ForNext",
        loops::size_for,
        loops::render_for_next,
        loops::eval_for_next,
        "for  next",
        "Loops"
    ),
    looping!(
        "ForStep",
        loops::size_for,
        loops::render_for_step,
        loops::eval_for_step,
        "for  step",
        "Loops"
    ),
    looping!(
        "IfThen",
        size_two_subs,
        loops::render_if_then,
        loops::eval_if_then,
        "if  then  end",
        "Tests"
    ),
    looping!(
        "IfThenElse",
        size_three_subs,
        loops::render_if_then_else,
        loops::eval_if_then_else,
        "if  then  else  end",
        "Tests"
    ),
    cmd!("dup", "Stack manipulation", 1, 0),
    cmd!("drop", "Stack manipulation", 1, 0),
    cmd!("swap", "Stack manipulation", 2, 0),
    cmd!("over", "Stack manipulation", 2, 0),
    cmd!("rot", "Stack manipulation", 3, 0),
    cmd!("depth", "Stack manipulation", 0, 0),
    cmd!("+", "Arithmetic", 2, 6),
    cmd!("-", "Arithmetic", 2, 6),
    cmd!("*", "Arithmetic", 2, 8),
    cmd!("/", "Arithmetic", 2, 8),
    cmd!("neg", "Arithmetic", 1, 10),
    cmd!("inv", "Arithmetic", 1, 10),
    cmd!("==", "Comparisons", 2, 4),
    cmd!("≠", "Comparisons", 2, 4),
    cmd!("<", "Comparisons", 2, 4),
    cmd!("≤", "Comparisons", 2, 4),
    cmd!(">", "Comparisons", 2, 4),
    cmd!("≥", "Comparisons", 2, 4),
    cmd!("and", "Logic", 2, 2),
    cmd!("or", "Logic", 2, 2),
    cmd!("not", "Logic", 1, 10),
    cmd!("sto", "Variables", 2, 0),
    cmd!("rcl", "Variables", 1, 0),
    cmd!("purge", "Variables", 1, 0),
    cmd!("eval", "Evaluation", 1, 0),
    cmd!("std", "Display settings", 0, 0),
    cmd!("fix", "Display settings", 1, 0),
    cmd!("sci", "Display settings", 1, 0),
    cmd!("eng", "Display settings", 1, 0),
    cmd!("precision", "Display settings", 1, 0),
];

pub fn ops(id: Id) -> &'static Ops {
    &TABLE[id as usize]
}

fn eval_push(rt: &mut Runtime, obj: Obj) -> Result<()> {
    rt.push(obj)
}

// ============================================================================
//
//   Reading objects from raw arena bytes
//
// ============================================================================

/// Read the type tag at `offset`, returning the id and tag byte count.
pub fn tag_at(mem: &[u8], offset: usize) -> Result<(Id, usize)> {
    let (tag, len) =
        read_uleb(mem, offset).ok_or_else(|| error!(InternalError; "truncated object"))?;
    match Id::from_tag(tag) {
        Some(id) => Ok((id, len)),
        None => Err(error!(InternalError; &format!("corrupt object tag {}", tag))),
    }
}

/// Total byte count of the object at `offset`, tag included.
pub fn size_at(mem: &[u8], offset: usize) -> Result<usize> {
    let (id, _) = tag_at(mem, offset)?;
    (ops(id).size)(mem, offset)
}

pub fn skip_at(mem: &[u8], offset: usize) -> Result<usize> {
    Ok(offset + size_at(mem, offset)?)
}

fn size_tag_only(mem: &[u8], offset: usize) -> Result<usize> {
    let (_, tlen) = tag_at(mem, offset)?;
    Ok(tlen)
}

/// Payload is a ULEB byte length followed by that many bytes.
/// Covers texts, symbols, programs, lists, expressions and directories.
pub fn size_prefixed(mem: &[u8], offset: usize) -> Result<usize> {
    let (_, tlen) = tag_at(mem, offset)?;
    let (len, llen) = read_uleb(mem, offset + tlen)
        .ok_or_else(|| error!(InternalError; "truncated size prefix"))?;
    Ok(tlen + llen + len as usize)
}

fn size_one_sub(mem: &[u8], offset: usize) -> Result<usize> {
    let (_, tlen) = tag_at(mem, offset)?;
    let end = skip_at(mem, offset + tlen)?;
    Ok(end - offset)
}

fn size_two_subs(mem: &[u8], offset: usize) -> Result<usize> {
    let (_, tlen) = tag_at(mem, offset)?;
    let end = skip_at(mem, skip_at(mem, offset + tlen)?)?;
    Ok(end - offset)
}

fn size_three_subs(mem: &[u8], offset: usize) -> Result<usize> {
    let (_, tlen) = tag_at(mem, offset)?;
    let end = skip_at(mem, skip_at(mem, skip_at(mem, offset + tlen)?)?)?;
    Ok(end - offset)
}

pub fn render(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    let id = rt.tag(obj)?;
    (ops(id).render)(rt, obj, r)
}
