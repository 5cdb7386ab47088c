use super::complex;
use super::decimal::{self, Dec};
use super::fraction;
use super::integer::{self, mag_add, mag_cmp, mag_is_zero, mag_mul, mag_sub};
use super::object::{Id, Obj};
use super::runtime::Runtime;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Mixed-type arithmetic
///
/// The promotion ladder unifies the numeric tower: integer → bignum →
/// fraction → decimal → complex. Every operation reads its operands into
/// owned values before allocating the result, so no arena offsets are
/// held across a collection.

/// A real number in its widest exact form.
enum Real {
    /// Sign and integer magnitude over a unit denominator.
    Exact(bool, Vec<u8>, Vec<u8>),
    Dec(Dec),
}

fn read_real(rt: &Runtime, obj: Obj) -> Result<Real> {
    let id = rt.tag(obj)?;
    match id {
        Id::Integer | Id::NegInteger | Id::Based | Id::Bignum | Id::NegBignum => Ok(Real::Exact(
            id.is_negative_tag(),
            integer::magnitude(rt, obj)?,
            vec![1],
        )),
        Id::Fraction | Id::NegFraction => {
            let (neg, num, den) = fraction::to_mags(rt, obj)?;
            Ok(Real::Exact(neg, num, den))
        }
        Id::Decimal | Id::NegDecimal => Ok(Real::Dec(decimal::read(rt, obj)?)),
        _ => Err(error!(TypeMismatch)),
    }
}

pub fn to_dec(rt: &Runtime, obj: Obj) -> Result<Dec> {
    let id = rt.tag(obj)?;
    match id {
        Id::Integer | Id::NegInteger | Id::Based | Id::Bignum | Id::NegBignum => {
            decimal::from_integer(rt, obj)
        }
        Id::Fraction | Id::NegFraction => {
            decimal::from_fraction(rt, obj, rt.settings.precision)
        }
        Id::Decimal | Id::NegDecimal => decimal::read(rt, obj),
        _ => Err(error!(TypeMismatch)),
    }
}

pub fn is_zero(rt: &Runtime, obj: Obj) -> Result<bool> {
    let id = rt.tag(obj)?;
    match id {
        Id::Integer | Id::NegInteger | Id::Based | Id::Bignum | Id::NegBignum => {
            integer::is_zero(rt, obj)
        }
        Id::Fraction | Id::NegFraction => Ok(false), // reduced, so never zero
        Id::Decimal | Id::NegDecimal => Ok(decimal::read(rt, obj)?.is_zero()),
        Id::Rectangular | Id::Polar => complex::is_zero(rt, obj),
        _ => Err(error!(TypeMismatch)),
    }
}

/// Uniform boolean coercion: numeric types are true iff non-zero.
pub fn as_truth(rt: &Runtime, obj: Obj) -> Result<bool> {
    Ok(!is_zero(rt, obj)?)
}

// ============================================================================
//
//   Exact rational kernels (sign, numerator, denominator magnitudes)
//
// ============================================================================

type Rational = (bool, Vec<u8>, Vec<u8>);

fn rat_add(x: &Rational, y: &Rational, subtract: bool) -> Rational {
    let (xn, xnum, xden) = x;
    let (yn0, ynum, yden) = y;
    let yn = yn0 != &subtract;
    // x ± y = (xnum·yden ± ynum·xden) / (xden·yden)
    let a = mag_mul(xnum, yden);
    let b = mag_mul(ynum, xden);
    let den = mag_mul(xden, yden);
    if *xn == yn {
        (*xn, mag_add(&a, &b), den)
    } else {
        match mag_cmp(&a, &b) {
            std::cmp::Ordering::Less => (yn, mag_sub(&b, &a), den),
            _ => (*xn, mag_sub(&a, &b), den),
        }
    }
}

fn rat_mul(x: &Rational, y: &Rational) -> Rational {
    (
        x.0 != y.0,
        mag_mul(&x.1, &y.1),
        mag_mul(&x.2, &y.2),
    )
}

fn rat_div(x: &Rational, y: &Rational) -> Result<Rational> {
    if mag_is_zero(&y.1) {
        return Err(error!(DivisionByZero));
    }
    Ok((
        x.0 != y.0,
        mag_mul(&x.1, &y.2),
        mag_mul(&x.2, &y.1),
    ))
}

// ============================================================================
//
//   Binary operations
//
// ============================================================================

#[derive(Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

fn binary(rt: &mut Runtime, op: BinOp, x: Obj, y: Obj) -> Result<Obj> {
    let xid = rt.tag(x)?;
    let yid = rt.tag(y)?;

    // Complex wins the promotion ladder
    if xid.is_complex() || yid.is_complex() {
        if !(xid.is_complex() || xid.is_real()) || !(yid.is_complex() || yid.is_real()) {
            return Err(error!(TypeMismatch));
        }
        return rt.with_guard(y, |rt, hy| {
            let x = if xid.is_complex() {
                x
            } else {
                complex::from_real(rt, x)?
            };
            rt.with_guard(x, |rt, hx| {
                let y = rt.guarded(hy);
                let y = if yid.is_complex() {
                    y
                } else {
                    complex::from_real(rt, y)?
                };
                let x = rt.guarded(hx);
                match op {
                    BinOp::Add => complex::add(rt, x, y),
                    BinOp::Sub => complex::sub(rt, x, y),
                    BinOp::Mul => complex::mul(rt, x, y),
                    BinOp::Div => complex::div(rt, x, y),
                }
            })
        });
    }

    if !xid.is_real() || !yid.is_real() {
        return Err(error!(TypeMismatch));
    }

    // Any decimal forces the decimal engine
    if xid.is_decimal() || yid.is_decimal() {
        let precision = rt.settings.precision;
        let xd = to_dec(rt, x)?;
        let yd = to_dec(rt, y)?;
        let result = match op {
            BinOp::Add => decimal::add(&xd, &yd, precision),
            BinOp::Sub => decimal::sub(&xd, &yd, precision),
            BinOp::Mul => decimal::mul(&xd, &yd, precision),
            BinOp::Div => decimal::div(&xd, &yd, precision)?,
        };
        return decimal::make(rt, result);
    }

    // Both-based arithmetic stays based, wrapping on the machine word
    if xid == Id::Based && yid == Id::Based {
        let base = integer::based_base(rt, x)?;
        let xv = integer::value_u64(rt, x)?;
        let yv = integer::value_u64(rt, y)?;
        let value = match op {
            BinOp::Add => xv.wrapping_add(yv),
            BinOp::Sub => xv.wrapping_sub(yv),
            BinOp::Mul => xv.wrapping_mul(yv),
            BinOp::Div => {
                if yv == 0 {
                    return Err(error!(DivisionByZero));
                }
                xv / yv
            }
        };
        return integer::make_based(rt, base, value);
    }

    // Exact path: integers and fractions
    let xr = match read_real(rt, x)? {
        Real::Exact(n, num, den) => (n, num, den),
        Real::Dec(_) => unreachable!(),
    };
    let yr = match read_real(rt, y)? {
        Real::Exact(n, num, den) => (n, num, den),
        Real::Dec(_) => unreachable!(),
    };
    let (neg, num, den) = match op {
        BinOp::Add => rat_add(&xr, &yr, false),
        BinOp::Sub => rat_add(&xr, &yr, true),
        BinOp::Mul => rat_mul(&xr, &yr),
        BinOp::Div => rat_div(&xr, &yr)?,
    };
    fraction::make_from_mags(rt, neg, &num, &den)
}

pub fn add(rt: &mut Runtime, x: Obj, y: Obj) -> Result<Obj> {
    binary(rt, BinOp::Add, x, y)
}

pub fn sub(rt: &mut Runtime, x: Obj, y: Obj) -> Result<Obj> {
    binary(rt, BinOp::Sub, x, y)
}

pub fn mul(rt: &mut Runtime, x: Obj, y: Obj) -> Result<Obj> {
    binary(rt, BinOp::Mul, x, y)
}

pub fn div(rt: &mut Runtime, x: Obj, y: Obj) -> Result<Obj> {
    binary(rt, BinOp::Div, x, y)
}

pub fn neg(rt: &mut Runtime, obj: Obj) -> Result<Obj> {
    let id = rt.tag(obj)?;
    match id {
        Id::Integer | Id::NegInteger | Id::Bignum | Id::NegBignum | Id::Fraction
        | Id::NegFraction | Id::Decimal | Id::NegDecimal => {
            if is_zero(rt, obj)? {
                return rt.clone_obj(obj);
            }
            // The sign lives in the tag, and every numeric tag fits a byte
            let payload = rt.obj_vec(obj)?[1..].to_vec();
            rt.emit(id.negated(), &payload)
        }
        Id::Based => {
            let neg = integer::value_u64(rt, obj)?.wrapping_neg();
            let base = integer::based_base(rt, obj)?;
            integer::make_based(rt, base, neg)
        }
        Id::Rectangular | Id::Polar => complex::neg(rt, obj),
        _ => Err(error!(TypeMismatch)),
    }
}

pub fn inv(rt: &mut Runtime, obj: Obj) -> Result<Obj> {
    rt.with_guard(obj, |rt, h| {
        let one = integer::make_unsigned(rt, Id::Integer, 1)?;
        let obj = rt.guarded(h);
        binary(rt, BinOp::Div, one, obj)
    })
}

// ============================================================================
//
//   Comparison
//
// ============================================================================

/// Total order over the reals: −1, 0 or +1. Exact when both operands
/// are exact; through the decimal engine otherwise.
pub fn compare(rt: &Runtime, x: Obj, y: Obj) -> Result<i32> {
    let xid = rt.tag(x)?;
    let yid = rt.tag(y)?;
    if !xid.is_real() || !yid.is_real() {
        return Err(error!(TypeMismatch));
    }
    if xid.is_decimal() || yid.is_decimal() {
        let xd = to_dec(rt, x)?;
        let yd = to_dec(rt, y)?;
        return Ok(decimal::compare(&xd, &yd));
    }
    let (xn, xnum, xden) = match read_real(rt, x)? {
        Real::Exact(n, num, den) => (n, num, den),
        Real::Dec(_) => unreachable!(),
    };
    let (yn, ynum, yden) = match read_real(rt, y)? {
        Real::Exact(n, num, den) => (n, num, den),
        Real::Dec(_) => unreachable!(),
    };
    let xzero = mag_is_zero(&xnum);
    let yzero = mag_is_zero(&ynum);
    if xzero && yzero {
        return Ok(0);
    }
    if xzero {
        return Ok(if yn { 1 } else { -1 });
    }
    if yzero {
        return Ok(if xn { -1 } else { 1 });
    }
    if xn != yn {
        return Ok(if xn { -1 } else { 1 });
    }
    // Cross-multiply: x <> y  ⇔  xnum·yden <> ynum·xden
    let a = mag_mul(&xnum, &yden);
    let b = mag_mul(&ynum, &xden);
    let sign = if xn { -1 } else { 1 };
    Ok(match mag_cmp(&a, &b) {
        std::cmp::Ordering::Less => -sign,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => sign,
    })
}

/// Equality test that also covers non-numeric objects by canonical byte
/// comparison.
pub fn equal(rt: &Runtime, x: Obj, y: Obj) -> Result<bool> {
    let xid = rt.tag(x)?;
    let yid = rt.tag(y)?;
    if xid.is_real() && yid.is_real() {
        return Ok(compare(rt, x, y)? == 0);
    }
    rt.obj_eq(x, y)
}
