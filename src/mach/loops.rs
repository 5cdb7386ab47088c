use super::arith;
use super::decimal::{self, Dec};
use super::integer;
use super::leb128::{read_uleb, write_uleb};
use super::object::{self, Id, Obj};
use super::runtime::{Handle, Runtime};
use super::text;
use crate::lang::parse::{self, Parser};
use crate::lang::render::Renderer;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Control-flow constructs
///
/// Each construct is one composite object with its condition and body
/// stored inline as blocks. Parsing is driven by a generic scanner that
/// accumulates objects into the scratchpad until it meets one of the
/// expected case-insensitive keywords. A for-loop additionally embeds a
/// one-entry locals name table (count byte, length-prefixed name) so the
/// body can read the counter by name.

pub fn size_for(mem: &[u8], offset: usize) -> Result<usize> {
    let (_, tlen) = object::tag_at(mem, offset)?;
    let at = offset + tlen + 1; // name count, always 1
    let (len, llen) =
        read_uleb(mem, at).ok_or_else(|| error!(InternalError; "truncated loop"))?;
    let body = at + llen + len as usize;
    let end = object::skip_at(mem, body)?;
    Ok(end - offset)
}

// ============================================================================
//
//   Parsing
//
// ============================================================================

/// Accumulate objects until one of `stops` appears; returns which stop
/// matched and the block built from the scratchpad bytes.
fn scan_block(rt: &mut Runtime, p: &mut Parser, stops: &[&str]) -> Result<(usize, Obj)> {
    let start = p.pos;
    let mark = rt.scratch_mark();
    let result = (|| loop {
        p.skip_whitespace();
        if p.at_end() {
            return Err(error!(Unterminated, start));
        }
        for (index, stop) in stops.iter().enumerate() {
            if p.match_keyword(stop) {
                let block = rt.scratch_commit(Id::Block, mark, true)?;
                return Ok((index, block));
            }
        }
        let obj = parse::parse_object(rt, p)?;
        rt.scratch_put_obj(obj)?;
    })();
    if result.is_err() {
        rt.scratch_free(mark);
    }
    result
}

/// Combine two already-built blocks into one construct.
fn emit_pair(rt: &mut Runtime, id: Id, first: Obj, second: Obj) -> Result<Obj> {
    rt.with_guard(second, |rt, h| {
        let mut payload = rt.obj_vec(first)?;
        payload.extend(rt.obj_vec(rt.guarded(h))?);
        rt.emit(id, &payload)
    })
}

pub fn parse_do_until(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    if !p.match_keyword("do") {
        return Ok(None);
    }
    let (_, body) = scan_block(rt, p, &["until"])?;
    rt.with_guard(body, |rt, h| {
        let (_, cond) = scan_block(rt, p, &["end"])?;
        let body = rt.guarded(h);
        Ok(Some(emit_pair(rt, Id::DoUntil, body, cond)?))
    })
}

pub fn parse_while_repeat(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    if !p.match_keyword("while") {
        return Ok(None);
    }
    let (_, cond) = scan_block(rt, p, &["repeat"])?;
    rt.with_guard(cond, |rt, h| {
        let (_, body) = scan_block(rt, p, &["end"])?;
        let cond = rt.guarded(h);
        Ok(Some(emit_pair(rt, Id::WhileRepeat, cond, body)?))
    })
}

pub fn parse_start(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    if !p.match_keyword("start") {
        return Ok(None);
    }
    let (stop, body) = scan_block(rt, p, &["next", "step"])?;
    let id = if stop == 0 { Id::StartNext } else { Id::StartStep };
    let payload = rt.obj_vec(body)?;
    Ok(Some(rt.emit(id, &payload)?))
}

pub fn parse_for(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    if !p.match_keyword("for") {
        return Ok(None);
    }
    p.skip_whitespace();
    let name_at = p.pos;
    let name = match text::parse_symbol(rt, p)? {
        Some(symbol) => text::text_of(rt, symbol)?,
        None => return Err(error!(MissingVariable, name_at)),
    };
    let (stop, body) = scan_block(rt, p, &["next", "step"])?;
    let id = if stop == 0 { Id::ForNext } else { Id::ForStep };
    let mut payload = vec![1u8];
    write_uleb(&mut payload, name.len() as u64);
    payload.extend_from_slice(&name);
    payload.extend(rt.obj_vec(body)?);
    Ok(Some(rt.emit(id, &payload)?))
}

pub fn parse_if(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    if !p.match_keyword("if") {
        return Ok(None);
    }
    let (_, cond) = scan_block(rt, p, &["then"])?;
    rt.with_guard(cond, |rt, hc| {
        let (stop, then_branch) = scan_block(rt, p, &["else", "end"])?;
        if stop == 1 {
            let cond = rt.guarded(hc);
            return Ok(Some(emit_pair(rt, Id::IfThen, cond, then_branch)?));
        }
        rt.with_guard(then_branch, |rt, ht| {
            let (_, else_branch) = scan_block(rt, p, &["end"])?;
            rt.with_guard(else_branch, |rt, he| {
                let mut payload = rt.obj_vec(rt.guarded(hc))?;
                payload.extend(rt.obj_vec(rt.guarded(ht))?);
                payload.extend(rt.obj_vec(rt.guarded(he))?);
                rt.emit(Id::IfThenElse, &payload)
            })
            .map(Some)
        })
    })
}

// ============================================================================
//
//   Evaluation
//
// ============================================================================

fn pop_truth(rt: &mut Runtime) -> Result<bool> {
    let obj = rt.pop()?;
    arith::as_truth(rt, obj)
}

/// Payload offsets of the two sub-objects, relative to the object start
/// so they survive relocation.
fn pair_offsets(rt: &Runtime, obj: Obj) -> Result<(usize, usize)> {
    let first = Obj(rt.payload(obj)?);
    let second = rt.skip(first)?;
    Ok((first.0 - obj.0, second.0 - obj.0))
}

pub fn eval_do_until(rt: &mut Runtime, obj: Obj) -> Result<()> {
    rt.with_guard(obj, |rt, h| {
        let (body_rel, cond_rel) = pair_offsets(rt, rt.guarded(h))?;
        loop {
            let base = rt.guarded(h).0;
            rt.eval(Obj(base + body_rel))?;
            let base = rt.guarded(h).0;
            rt.eval(Obj(base + cond_rel))?;
            if pop_truth(rt)? {
                return Ok(());
            }
        }
    })
}

pub fn eval_while_repeat(rt: &mut Runtime, obj: Obj) -> Result<()> {
    rt.with_guard(obj, |rt, h| {
        let (cond_rel, body_rel) = pair_offsets(rt, rt.guarded(h))?;
        loop {
            let base = rt.guarded(h).0;
            rt.eval(Obj(base + cond_rel))?;
            if !pop_truth(rt)? {
                return Ok(());
            }
            let base = rt.guarded(h).0;
            rt.eval(Obj(base + body_rel))?;
        }
    })
}

pub fn eval_if_then(rt: &mut Runtime, obj: Obj) -> Result<()> {
    rt.with_guard(obj, |rt, h| {
        let (cond_rel, body_rel) = pair_offsets(rt, rt.guarded(h))?;
        let base = rt.guarded(h).0;
        rt.eval(Obj(base + cond_rel))?;
        if pop_truth(rt)? {
            let base = rt.guarded(h).0;
            rt.eval(Obj(base + body_rel))?;
        }
        Ok(())
    })
}

pub fn eval_if_then_else(rt: &mut Runtime, obj: Obj) -> Result<()> {
    rt.with_guard(obj, |rt, h| {
        let base = rt.guarded(h);
        let cond = Obj(rt.payload(base)?);
        let then_branch = rt.skip(cond)?;
        let else_branch = rt.skip(then_branch)?;
        let (cond_rel, then_rel, else_rel) = (
            cond.0 - base.0,
            then_branch.0 - base.0,
            else_branch.0 - base.0,
        );
        let base = rt.guarded(h).0;
        rt.eval(Obj(base + cond_rel))?;
        let taken = if pop_truth(rt)? { then_rel } else { else_rel };
        let base = rt.guarded(h).0;
        rt.eval(Obj(base + taken))
    })
}

// ============================================================================
//
//   Counted loops
//
// ============================================================================

enum Bounds {
    Int(i64, i64),
    Real(Dec, Dec),
}

fn small_int(rt: &Runtime, obj: Obj) -> Result<Option<i64>> {
    match rt.tag(obj)? {
        Id::Integer | Id::NegInteger => integer::as_i64(rt, obj),
        _ => Ok(None),
    }
}

fn dec_from_i64(value: i64) -> Dec {
    let mut dec = Dec::from_u64(value.unsigned_abs());
    dec.neg = value < 0 && !dec.is_zero();
    dec
}

/// Shared driver for START and FOR loops. Pops the end then start
/// bounds; integer bounds run on machine words until a non-integer STEP
/// value degrades the loop to the decimal engine. A NEXT loop with
/// start > end runs zero times; a STEP loop always runs its first
/// iteration, since the step's sign is only known afterwards.
fn counted(
    rt: &mut Runtime,
    h: Handle,
    body_rel: usize,
    stepping: bool,
    named: bool,
) -> Result<()> {
    let finish = rt.peek(0)?;
    let start = rt.peek(1)?;
    let bounds = match (small_int(rt, start)?, small_int(rt, finish)?) {
        (Some(s), Some(f)) => Bounds::Int(s, f),
        _ => {
            if !rt.tag(start)?.is_real() || !rt.tag(finish)?.is_real() {
                return Err(error!(TypeMismatch));
            }
            Bounds::Real(arith::to_dec(rt, start)?, arith::to_dec(rt, finish)?)
        }
    };
    rt.drop(2)?;

    let (mut cnt, last) = match bounds {
        Bounds::Real(cnt, last) => {
            let one = Dec::from_u64(1);
            return real_counted(rt, h, body_rel, stepping, named, cnt, last, one, false);
        }
        Bounds::Int(cnt, last) => (cnt, last),
    };

    let mut incr: i64 = 1;
    if !stepping && cnt > last {
        return Ok(());
    }
    loop {
        if named {
            let value = integer::make(rt, cnt as i128)?;
            rt.local_set(0, value)?;
        }
        let base = rt.guarded(h).0;
        rt.eval(Obj(base + body_rel))?;

        if stepping {
            let step = rt.pop()?;
            match rt.tag(step)? {
                Id::Integer => {
                    incr = match integer::as_i64(rt, step)? {
                        Some(v) => v,
                        None => return Err(error!(Overflow)),
                    };
                }
                id if id.is_real() => {
                    // Degrade to the decimal engine; this iteration
                    // already ran, so skip the first body evaluation
                    let step = arith::to_dec(rt, step)?;
                    return real_counted(
                        rt,
                        h,
                        body_rel,
                        stepping,
                        named,
                        dec_from_i64(cnt),
                        dec_from_i64(last),
                        step,
                        true,
                    );
                }
                _ => return Err(error!(TypeMismatch)),
            }
        }

        cnt = match cnt.checked_add(incr) {
            Some(next) => next,
            None => return Ok(()),
        };
        let done = if incr >= 0 { cnt > last } else { cnt < last };
        if done {
            return Ok(());
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn real_counted(
    rt: &mut Runtime,
    h: Handle,
    body_rel: usize,
    stepping: bool,
    named: bool,
    mut cnt: Dec,
    last: Dec,
    mut step: Dec,
    mut skip: bool,
) -> Result<()> {
    let precision = rt.settings.precision;
    if !skip && !stepping && decimal::compare(&cnt, &last) > 0 {
        return Ok(());
    }
    loop {
        if skip {
            skip = false;
        } else {
            if named {
                let value = decimal::make(rt, cnt.clone())?;
                rt.local_set(0, value)?;
            }
            let base = rt.guarded(h).0;
            rt.eval(Obj(base + body_rel))?;
            if stepping {
                let popped = rt.pop()?;
                if !rt.tag(popped)?.is_real() {
                    return Err(error!(TypeMismatch));
                }
                step = arith::to_dec(rt, popped)?;
            }
        }
        cnt = decimal::add(&cnt, &step, precision);
        let countdown = stepping && step.neg;
        let done = if countdown {
            decimal::compare(&cnt, &last) < 0
        } else {
            decimal::compare(&cnt, &last) > 0
        };
        if done {
            return Ok(());
        }
    }
}

pub fn eval_start_next(rt: &mut Runtime, obj: Obj) -> Result<()> {
    eval_start(rt, obj, false)
}

pub fn eval_start_step(rt: &mut Runtime, obj: Obj) -> Result<()> {
    eval_start(rt, obj, true)
}

fn eval_start(rt: &mut Runtime, obj: Obj, stepping: bool) -> Result<()> {
    rt.with_guard(obj, |rt, h| {
        let base = rt.guarded(h);
        let body_rel = rt.payload(base)? - base.0;
        counted(rt, h, body_rel, stepping, false)
    })
}

pub fn eval_for_next(rt: &mut Runtime, obj: Obj) -> Result<()> {
    eval_for(rt, obj, false)
}

pub fn eval_for_step(rt: &mut Runtime, obj: Obj) -> Result<()> {
    eval_for(rt, obj, true)
}

fn eval_for(rt: &mut Runtime, obj: Obj, stepping: bool) -> Result<()> {
    rt.with_guard(obj, |rt, h| {
        let base = rt.guarded(h);
        let names_at = rt.payload(base)?;
        let (len, llen) = read_uleb(rt.mem(), names_at + 1)
            .ok_or_else(|| error!(InternalError; "truncated loop"))?;
        let body_rel = names_at + 1 + llen + len as usize - base.0;

        // The counter lives in local slot 0, initially the start bound
        let start = rt.peek(1)?;
        rt.frame_enter(Obj(names_at), vec![start])?;
        let result = counted(rt, h, body_rel, stepping, true);
        rt.frame_exit();
        result
    })
}

// ============================================================================
//
//   Rendering
//
// ============================================================================

fn render_construct(
    rt: &Runtime,
    obj: Obj,
    r: &mut Renderer,
    open: &str,
    middle: Option<&str>,
    close: &str,
    loopvar: bool,
) -> Result<()> {
    let mut at = rt.payload(obj)?;
    r.put(open);
    if loopvar {
        let (len, llen) = read_uleb(rt.mem(), at + 1)
            .ok_or_else(|| error!(InternalError; "truncated loop"))?;
        let name = &rt.mem()[at + 1 + llen..at + 1 + llen + len as usize];
        r.put_char(' ');
        r.put(&String::from_utf8_lossy(name).into_owned());
        at += 1 + llen + len as usize;
    }
    r.put_char(' ');
    object::render(rt, Obj(at), r)?;
    r.space();
    if let Some(middle) = middle {
        at = object::skip_at(rt.mem(), at)?;
        r.put(middle);
        r.put_char(' ');
        object::render(rt, Obj(at), r)?;
        r.space();
    }
    r.put(close);
    Ok(())
}

pub fn render_do_until(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    render_construct(rt, obj, r, "do", Some("until"), "end", false)
}

pub fn render_while_repeat(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    render_construct(rt, obj, r, "while", Some("repeat"), "end", false)
}

pub fn render_start_next(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    render_construct(rt, obj, r, "start", None, "next", false)
}

pub fn render_start_step(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    render_construct(rt, obj, r, "start", None, "step", false)
}

pub fn render_for_next(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    render_construct(rt, obj, r, "for", None, "next", true)
}

pub fn render_for_step(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    render_construct(rt, obj, r, "for", None, "step", true)
}

pub fn render_if_then(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    render_construct(rt, obj, r, "if", Some("then"), "end", false)
}

pub fn render_if_then_else(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    let cond = Obj(rt.payload(obj)?);
    let then_branch = rt.skip(cond)?;
    let else_branch = rt.skip(then_branch)?;
    r.put("if ");
    object::render(rt, cond, r)?;
    r.put(" then ");
    object::render(rt, then_branch, r)?;
    r.put(" else ");
    object::render(rt, else_branch, r)?;
    r.put(" end");
    Ok(())
}
