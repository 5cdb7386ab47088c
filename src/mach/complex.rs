use super::arith;
use super::integer;
use super::object::{self, Id, Obj};
use super::runtime::{Handle, Runtime};
use crate::lang::parse::Parser;
use crate::lang::render::Renderer;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Complex numbers
///
/// Two inline real sub-objects. Rectangular stores (re, im) and parses
/// as `(re,im)`; polar stores (magnitude, angle) and parses as
/// `(mag∠angle)`. Arithmetic works in rectangular form; polar values
/// multiply and divide by magnitude/angle arithmetic, and otherwise
/// require a zero angle, since the numeric core carries no trigonometry.

pub fn parts(rt: &Runtime, obj: Obj) -> Result<(Obj, Obj)> {
    let first = Obj(rt.payload(obj)?);
    let second = rt.skip(first)?;
    Ok((first, second))
}

fn first_part(rt: &Runtime, h: Handle) -> Result<Obj> {
    Ok(parts(rt, rt.guarded(h))?.0)
}

fn second_part(rt: &Runtime, h: Handle) -> Result<Obj> {
    Ok(parts(rt, rt.guarded(h))?.1)
}

fn make(rt: &mut Runtime, id: Id, first: Obj, second: Obj) -> Result<Obj> {
    rt.with_guard(second, |rt, h| {
        let mut payload = rt.obj_vec(first)?;
        payload.extend(rt.obj_vec(rt.guarded(h))?);
        rt.emit(id, &payload)
    })
}

pub fn make_rect(rt: &mut Runtime, re: Obj, im: Obj) -> Result<Obj> {
    make(rt, Id::Rectangular, re, im)
}

/// Promote a real to a rectangular complex with a zero imaginary part.
pub fn from_real(rt: &mut Runtime, re: Obj) -> Result<Obj> {
    rt.with_guard(re, |rt, h| {
        let zero = integer::make_unsigned(rt, Id::Integer, 0)?;
        let re = rt.guarded(h);
        make(rt, Id::Rectangular, re, zero)
    })
}

pub fn is_zero(rt: &Runtime, obj: Obj) -> Result<bool> {
    let (first, second) = parts(rt, obj)?;
    Ok(arith::is_zero(rt, first)? && arith::is_zero(rt, second)?)
}

// ============================================================================
//
//   Parsing
//
// ============================================================================

pub fn parse(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    if p.precedence != 0 || !p.match_str("(") {
        return Ok(None);
    }
    let start = p.pos;
    p.skip_whitespace();
    let first = match try_real(rt, p)? {
        Some(obj) => obj,
        None => return Ok(None),
    };
    p.skip_whitespace();
    let id = if p.match_str(",") || p.match_str(";") {
        Id::Rectangular
    } else if p.match_str("∠") {
        Id::Polar
    } else {
        return Ok(None);
    };
    rt.with_guard(first, |rt, h| {
        p.skip_whitespace();
        let second = match try_real(rt, p)? {
            Some(obj) => obj,
            None => return Err(error!(SyntaxError, p.pos; "expected a real part")),
        };
        p.skip_whitespace();
        if !p.match_str(")") {
            return Err(error!(Unterminated, start; "complex number"));
        }
        let first = rt.guarded(h);
        Ok(Some(make(rt, id, first, second)?))
    })
}

fn try_real(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    let start = p.pos;
    if let Some(obj) = integer::parse(rt, p)? {
        return Ok(Some(obj));
    }
    p.pos = start;
    if let Some(obj) = super::decimal::parse(rt, p)? {
        return Ok(Some(obj));
    }
    p.pos = start;
    Ok(None)
}

// ============================================================================
//
//   Rendering
//
// ============================================================================

pub fn render(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    let (first, second) = parts(rt, obj)?;
    r.put_char('(');
    object::render(rt, first, r)?;
    if rt.tag(obj)? == Id::Polar {
        r.put_char('∠');
    } else {
        r.put_char(',');
    }
    object::render(rt, second, r)?;
    r.put_char(')');
    Ok(())
}

// ============================================================================
//
//   Arithmetic
//
// ============================================================================

/// A polar operand participates in rectangular arithmetic only when its
/// angle is zero, in which case it reads as (magnitude, 0).
fn check_rect(rt: &Runtime, h: Handle) -> Result<()> {
    if rt.tag(rt.guarded(h))? == Id::Polar {
        let angle = second_part(rt, h)?;
        if !arith::is_zero(rt, angle)? {
            return Err(error!(DomainError; "polar arithmetic needs a zero angle"));
        }
    }
    Ok(())
}

fn binary(
    rt: &mut Runtime,
    x: Obj,
    y: Obj,
    f: fn(&mut Runtime, Handle, Handle) -> Result<Obj>,
) -> Result<Obj> {
    rt.with_guard(x, |rt, hx| rt.with_guard(y, |rt, hy| f(rt, hx, hy)))
}

pub fn add(rt: &mut Runtime, x: Obj, y: Obj) -> Result<Obj> {
    binary(rt, x, y, |rt, hx, hy| {
        check_rect(rt, hx)?;
        check_rect(rt, hy)?;
        let re = arith::add(rt, first_part(rt, hx)?, first_part(rt, hy)?)?;
        rt.with_guard(re, |rt, hre| {
            let im = arith::add(rt, second_part(rt, hx)?, second_part(rt, hy)?)?;
            let re = rt.guarded(hre);
            make(rt, Id::Rectangular, re, im)
        })
    })
}

pub fn sub(rt: &mut Runtime, x: Obj, y: Obj) -> Result<Obj> {
    binary(rt, x, y, |rt, hx, hy| {
        check_rect(rt, hx)?;
        check_rect(rt, hy)?;
        let re = arith::sub(rt, first_part(rt, hx)?, first_part(rt, hy)?)?;
        rt.with_guard(re, |rt, hre| {
            let im = arith::sub(rt, second_part(rt, hx)?, second_part(rt, hy)?)?;
            let re = rt.guarded(hre);
            make(rt, Id::Rectangular, re, im)
        })
    })
}

pub fn neg(rt: &mut Runtime, obj: Obj) -> Result<Obj> {
    let id = rt.tag(obj)?;
    rt.with_guard(obj, |rt, h| {
        if id == Id::Polar {
            check_rect(rt, h)?;
        }
        let re = arith::neg(rt, first_part(rt, h)?)?;
        rt.with_guard(re, |rt, hre| {
            let im = arith::neg(rt, second_part(rt, h)?)?;
            let re = rt.guarded(hre);
            make(rt, Id::Rectangular, re, im)
        })
    })
}

pub fn mul(rt: &mut Runtime, x: Obj, y: Obj) -> Result<Obj> {
    if rt.tag(x)? == Id::Polar && rt.tag(y)? == Id::Polar {
        // (r₁∠a₁)(r₂∠a₂) = r₁r₂ ∠ a₁+a₂
        return binary(rt, x, y, |rt, hx, hy| {
            let mag = arith::mul(rt, first_part(rt, hx)?, first_part(rt, hy)?)?;
            rt.with_guard(mag, |rt, hm| {
                let angle = arith::add(rt, second_part(rt, hx)?, second_part(rt, hy)?)?;
                let mag = rt.guarded(hm);
                make(rt, Id::Polar, mag, angle)
            })
        });
    }
    binary(rt, x, y, |rt, hx, hy| {
        check_rect(rt, hx)?;
        check_rect(rt, hy)?;
        // (a,b)(c,d) = (ac - bd, ad + bc)
        let ac = arith::mul(rt, first_part(rt, hx)?, first_part(rt, hy)?)?;
        let re = rt.with_guard(ac, |rt, hac| {
            let bd = arith::mul(rt, second_part(rt, hx)?, second_part(rt, hy)?)?;
            let ac = rt.guarded(hac);
            arith::sub(rt, ac, bd)
        })?;
        rt.with_guard(re, |rt, hre| {
            let ad = arith::mul(rt, first_part(rt, hx)?, second_part(rt, hy)?)?;
            let im = rt.with_guard(ad, |rt, had| {
                let bc = arith::mul(rt, second_part(rt, hx)?, first_part(rt, hy)?)?;
                let ad = rt.guarded(had);
                arith::add(rt, ad, bc)
            })?;
            let re = rt.guarded(hre);
            make(rt, Id::Rectangular, re, im)
        })
    })
}

pub fn div(rt: &mut Runtime, x: Obj, y: Obj) -> Result<Obj> {
    if rt.tag(x)? == Id::Polar && rt.tag(y)? == Id::Polar {
        return binary(rt, x, y, |rt, hx, hy| {
            let mag = arith::div(rt, first_part(rt, hx)?, first_part(rt, hy)?)?;
            rt.with_guard(mag, |rt, hm| {
                let angle = arith::sub(rt, second_part(rt, hx)?, second_part(rt, hy)?)?;
                let mag = rt.guarded(hm);
                make(rt, Id::Polar, mag, angle)
            })
        });
    }
    binary(rt, x, y, |rt, hx, hy| {
        check_rect(rt, hx)?;
        check_rect(rt, hy)?;
        // (a,b)/(c,d) = ((ac+bd) + (bc-ad)i) / (c²+d²)
        let cc = arith::mul(rt, first_part(rt, hy)?, first_part(rt, hy)?)?;
        let norm = rt.with_guard(cc, |rt, hcc| {
            let dd = arith::mul(rt, second_part(rt, hy)?, second_part(rt, hy)?)?;
            let cc = rt.guarded(hcc);
            arith::add(rt, cc, dd)
        })?;
        if arith::is_zero(rt, norm)? {
            return Err(error!(DivisionByZero));
        }
        rt.with_guard(norm, |rt, hn| {
            let ac = arith::mul(rt, first_part(rt, hx)?, first_part(rt, hy)?)?;
            let re_num = rt.with_guard(ac, |rt, hac| {
                let bd = arith::mul(rt, second_part(rt, hx)?, second_part(rt, hy)?)?;
                let ac = rt.guarded(hac);
                arith::add(rt, ac, bd)
            })?;
            let re = arith::div(rt, re_num, rt.guarded(hn))?;
            rt.with_guard(re, |rt, hre| {
                let bc = arith::mul(rt, second_part(rt, hx)?, first_part(rt, hy)?)?;
                let im_num = rt.with_guard(bc, |rt, hbc| {
                    let ad = arith::mul(rt, first_part(rt, hx)?, second_part(rt, hy)?)?;
                    let bc = rt.guarded(hbc);
                    arith::sub(rt, bc, ad)
                })?;
                let im = arith::div(rt, im_num, rt.guarded(hn))?;
                let re = rt.guarded(hre);
                make(rt, Id::Rectangular, re, im)
            })
        })
    })
}
