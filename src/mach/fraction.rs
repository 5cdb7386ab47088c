use super::integer::{self, mag_cmp, mag_divmod, mag_gcd, mag_is_zero};
use super::object::{self, Id, Obj};
use super::runtime::Runtime;
use crate::lang::render::Renderer;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Fractions
///
/// A fraction is two inline unsigned integer objects, numerator then
/// denominator; the sign lives in the type tag. Fractions are stored
/// reduced: construction divides through the GCD, and a denominator of
/// one demotes the result to a plain integer, so a fraction object is
/// never an integer in disguise.

/// Build a reduced fraction from two integer objects.
pub fn make(rt: &mut Runtime, num: Obj, den: Obj) -> Result<Obj> {
    let num_neg = rt.tag(num)?.is_negative_tag();
    let den_neg = rt.tag(den)?.is_negative_tag();
    let num_mag = integer::magnitude(rt, num)?;
    let den_mag = integer::magnitude(rt, den)?;
    make_from_mags(rt, num_neg != den_neg, &num_mag, &den_mag)
}

pub fn make_from_mags(
    rt: &mut Runtime,
    negative: bool,
    num_mag: &[u8],
    den_mag: &[u8],
) -> Result<Obj> {
    if mag_is_zero(den_mag) {
        return Err(error!(DivisionByZero));
    }
    if mag_is_zero(num_mag) {
        return integer::make_unsigned(rt, Id::Integer, 0);
    }
    let gcd = mag_gcd(num_mag, den_mag);
    let (num, _) = mag_divmod(num_mag, &gcd);
    let (den, _) = mag_divmod(den_mag, &gcd);
    if mag_cmp(&den, &[1]) == std::cmp::Ordering::Equal {
        return integer::make_signed_mag(rt, negative, &num);
    }
    let id = if negative { Id::NegFraction } else { Id::Fraction };
    let mut payload = integer::unsigned_bytes(&num);
    payload.extend_from_slice(&integer::unsigned_bytes(&den));
    rt.emit(id, &payload)
}

/// The two inline sub-objects.
pub fn parts(rt: &Runtime, obj: Obj) -> Result<(Obj, Obj)> {
    let num = Obj(rt.payload(obj)?);
    let den = rt.skip(num)?;
    Ok((num, den))
}

/// Sign and magnitudes, for the promotion paths.
pub fn to_mags(rt: &Runtime, obj: Obj) -> Result<(bool, Vec<u8>, Vec<u8>)> {
    let negative = rt.tag(obj)?.is_negative_tag();
    let (num, den) = parts(rt, obj)?;
    Ok((
        negative,
        integer::magnitude(rt, num)?,
        integer::magnitude(rt, den)?,
    ))
}

pub fn render(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    if rt.tag(obj)?.is_negative_tag() {
        r.put_char('-');
    }
    let (num, den) = parts(rt, obj)?;
    object::render(rt, num, r)?;
    r.put_char('/');
    object::render(rt, den, r)
}
