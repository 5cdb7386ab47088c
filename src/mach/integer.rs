use std::convert::TryFrom;

use super::fraction;
use super::leb128::{read_uleb, write_uleb};
use super::object::{self, Id, Obj};
use super::runtime::Runtime;
use crate::lang::parse::Parser;
use crate::lang::render::Renderer;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Integers
///
/// Small integers store a ULEB magnitude; the sign lives in the type tag.
/// Magnitudes beyond the machine word promote to bignums: a ULEB byte
/// count followed by the big-endian magnitude. Based integers carry a
/// base byte before the magnitude and render as `#...b`/`#...o`/`#...d`/
/// `#...h`. All three families are canonical: a bignum that fits the
/// machine word is stored as a small integer instead.

pub fn size(mem: &[u8], offset: usize) -> Result<usize> {
    let (_, tlen) = object::tag_at(mem, offset)?;
    let (_, mlen) =
        read_uleb(mem, offset + tlen).ok_or_else(|| error!(InternalError; "truncated integer"))?;
    Ok(tlen + mlen)
}

pub fn size_based(mem: &[u8], offset: usize) -> Result<usize> {
    let (_, tlen) = object::tag_at(mem, offset)?;
    let (_, mlen) = read_uleb(mem, offset + tlen + 1)
        .ok_or_else(|| error!(InternalError; "truncated integer"))?;
    Ok(tlen + 1 + mlen)
}

pub fn size_bignum(mem: &[u8], offset: usize) -> Result<usize> {
    let (_, tlen) = object::tag_at(mem, offset)?;
    let (count, clen) =
        read_uleb(mem, offset + tlen).ok_or_else(|| error!(InternalError; "truncated bignum"))?;
    Ok(tlen + clen + count as usize)
}

// ============================================================================
//
//   Construction
//
// ============================================================================

pub fn make(rt: &mut Runtime, value: i128) -> Result<Obj> {
    let id = if value < 0 { Id::NegInteger } else { Id::Integer };
    let magnitude = value.unsigned_abs();
    if magnitude <= u64::MAX as u128 {
        make_unsigned(rt, id, magnitude as u64)
    } else {
        let id = if value < 0 { Id::NegBignum } else { Id::Bignum };
        make_bignum(rt, id, &mag_from_u128(magnitude))
    }
}

pub fn make_unsigned(rt: &mut Runtime, id: Id, magnitude: u64) -> Result<Obj> {
    let mut payload = vec![];
    write_uleb(&mut payload, magnitude);
    rt.emit(id, &payload)
}

pub fn make_based(rt: &mut Runtime, base: u8, magnitude: u64) -> Result<Obj> {
    let mut payload = vec![base];
    write_uleb(&mut payload, magnitude);
    rt.emit(Id::Based, &payload)
}

/// Build a bignum from a big-endian magnitude, demoting to a small
/// integer when the value fits the machine word.
pub fn make_bignum(rt: &mut Runtime, id: Id, magnitude: &[u8]) -> Result<Obj> {
    let mag = mag_trim(magnitude);
    if let Some(small) = mag_to_u64(mag) {
        let id = if id == Id::NegBignum && small != 0 {
            Id::NegInteger
        } else {
            Id::Integer
        };
        return make_unsigned(rt, id, small);
    }
    let mut payload = vec![];
    write_uleb(&mut payload, mag.len() as u64);
    payload.extend_from_slice(mag);
    rt.emit(id, &payload)
}

/// Build an integer from a sign and a big-endian magnitude of any width.
pub fn make_signed_mag(rt: &mut Runtime, negative: bool, magnitude: &[u8]) -> Result<Obj> {
    let id = if negative { Id::NegBignum } else { Id::Bignum };
    make_bignum(rt, id, magnitude)
}

// ============================================================================
//
//   Access
//
// ============================================================================

/// Magnitude of a small integer.
pub fn value_u64(rt: &Runtime, obj: Obj) -> Result<u64> {
    let at = rt.payload(obj)?;
    let at = if rt.tag(obj)? == Id::Based { at + 1 } else { at };
    let (v, _) =
        read_uleb(rt.mem(), at).ok_or_else(|| error!(InternalError; "truncated integer"))?;
    Ok(v)
}

pub fn based_base(rt: &Runtime, obj: Obj) -> Result<u8> {
    let at = rt.payload(obj)?;
    Ok(rt.mem()[at])
}

/// Signed machine value when the object is a small integer in range.
pub fn as_i64(rt: &Runtime, obj: Obj) -> Result<Option<i64>> {
    match rt.tag(obj)? {
        Id::Integer | Id::Based => {
            let v = value_u64(rt, obj)?;
            Ok(i64::try_from(v).ok())
        }
        Id::NegInteger => {
            let v = value_u64(rt, obj)?;
            if v <= i64::MAX as u64 {
                Ok(Some(-(v as i64)))
            } else if v == i64::MAX as u64 + 1 {
                Ok(Some(i64::MIN))
            } else {
                Ok(None)
            }
        }
        _ => Ok(None),
    }
}

/// Big-endian magnitude of any integer object.
pub fn magnitude(rt: &Runtime, obj: Obj) -> Result<Vec<u8>> {
    match rt.tag(obj)? {
        Id::Integer | Id::NegInteger | Id::Based => {
            Ok(mag_trim(&value_u64(rt, obj)?.to_be_bytes()).to_vec())
        }
        Id::Bignum | Id::NegBignum => {
            let at = rt.payload(obj)?;
            let (count, clen) = read_uleb(rt.mem(), at)
                .ok_or_else(|| error!(InternalError; "truncated bignum"))?;
            let start = at + clen;
            Ok(rt.mem()[start..start + count as usize].to_vec())
        }
        _ => Err(error!(TypeMismatch)),
    }
}

pub fn is_zero(rt: &Runtime, obj: Obj) -> Result<bool> {
    match rt.tag(obj)? {
        Id::Integer | Id::NegInteger | Id::Based => Ok(value_u64(rt, obj)? == 0),
        Id::Bignum | Id::NegBignum => Ok(false), // would have demoted
        _ => Err(error!(TypeMismatch)),
    }
}

// ============================================================================
//
//   Parsing
//
// ============================================================================

/// Parses every contiguous numeric literal that is not a decimal:
/// integers, based integers, bignums and fractions. Decimal literals
/// (a separator or exponent follows the digits) are skipped so the
/// decimal parser can claim them.
pub fn parse(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    if p.peek() == Some('#') {
        return parse_based(rt, p);
    }

    let mut negative = false;
    if let Some(sign) = p.peek() {
        if sign == '+' || sign == '-' {
            // Inside an expression the sign belongs to the operator
            if p.precedence != 0 {
                return Ok(None);
            }
            match p.rest()[1..].chars().next() {
                Some(c) if c.is_ascii_digit() => {
                    negative = sign == '-';
                    p.advance(1);
                }
                _ => return Ok(None),
            }
        }
    }

    let digits = scan_digits(p);
    if digits.is_empty() {
        return Ok(None);
    }

    // A decimal separator or an exponent makes this a decimal literal
    match p.peek() {
        Some(c) if c == '.' || c == rt.settings.decimal_separator => return Ok(None),
        Some(c) if c == 'e' || c == 'E' || c == '⁳' => {
            let mut look = p.rest().chars().skip(1);
            if let Some(next) = look.next() {
                let next = if next == '+' || next == '-' {
                    look.next().unwrap_or(' ')
                } else {
                    next
                };
                if next.is_ascii_digit() {
                    return Ok(None);
                }
            }
        }
        _ => {}
    }

    // `num/den` with no spaces is a fraction
    if p.peek() == Some('/') {
        let den_digits = match p.rest()[1..].chars().next() {
            Some(c) if c.is_ascii_digit() => {
                p.advance(1);
                scan_digits(p)
            }
            _ => String::new(),
        };
        if !den_digits.is_empty() {
            let num = digits_to_obj(rt, negative, &digits)?;
            return rt.with_guard(num, |rt, h| {
                let den = digits_to_obj(rt, false, &den_digits)?;
                let num = rt.guarded(h);
                Ok(Some(fraction::make(rt, num, den)?))
            });
        }
    }

    Ok(Some(digits_to_obj(rt, negative, &digits)?))
}

fn scan_digits(p: &mut Parser) -> String {
    let mut digits = String::new();
    while let Some(c) = p.peek() {
        if c.is_ascii_digit() {
            digits.push(c);
            p.advance(1);
        } else {
            break;
        }
    }
    digits
}

fn digits_to_obj(rt: &mut Runtime, negative: bool, digits: &str) -> Result<Obj> {
    if let Ok(small) = digits.parse::<u64>() {
        let id = if negative && small != 0 {
            Id::NegInteger
        } else {
            Id::Integer
        };
        return make_unsigned(rt, id, small);
    }
    // Too wide for the machine word: accumulate a magnitude
    let mut mag: Vec<u8> = vec![];
    for c in digits.chars() {
        mag = mag_mul_small(&mag, 10);
        mag = mag_add_small(&mag, (c as u8 - b'0') as u64);
    }
    make_signed_mag(rt, negative, &mag)
}

fn parse_based(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    p.advance(1); // '#'
    let mut digits = String::new();
    while let Some(c) = p.peek() {
        if c.is_ascii_hexdigit() {
            digits.push(c.to_ascii_lowercase());
            p.advance(1);
        } else {
            break;
        }
    }
    if digits.is_empty() {
        return Ok(None);
    }
    // The base letter may have been swallowed as a hex digit
    let base: u64 = match p.peek() {
        Some('h') | Some('H') => {
            p.advance(1);
            16
        }
        Some('o') | Some('O') => {
            p.advance(1);
            8
        }
        _ => match digits.pop() {
            Some('b') => 2,
            Some('d') => 10,
            Some(c) => {
                digits.push(c);
                16
            }
            None => 16,
        },
    };
    if digits.is_empty() {
        return Err(error!(SyntaxError, p.pos; "based number without digits"));
    }
    let mut value: u64 = 0;
    for c in digits.chars() {
        let digit = c.to_digit(16).unwrap() as u64;
        if digit >= base {
            return Err(error!(SyntaxError, p.pos; "digit out of range for base"));
        }
        value = value
            .checked_mul(base)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| error!(Overflow))?;
    }
    Ok(Some(make_based(rt, base as u8, value)?))
}

// ============================================================================
//
//   Rendering
//
// ============================================================================

pub fn render(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    let id = rt.tag(obj)?;
    if id.is_negative_tag() {
        r.put_char('-');
    }
    match id {
        Id::Integer | Id::NegInteger => {
            r.put(&value_u64(rt, obj)?.to_string());
        }
        _ => {
            r.put(&mag_to_decimal(&magnitude(rt, obj)?));
        }
    }
    Ok(())
}

pub fn render_based(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    let base = based_base(rt, obj)?;
    let value = value_u64(rt, obj)?;
    let (digits, suffix) = match base {
        2 => (to_radix(value, 2), 'b'),
        8 => (to_radix(value, 8), 'o'),
        10 => (value.to_string(), 'd'),
        _ => (to_radix(value, 16), 'h'),
    };
    r.put_char('#');
    r.put(&digits);
    r.put_char(suffix);
    Ok(())
}

fn to_radix(mut value: u64, base: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut out = vec![];
    while value > 0 {
        out.push(std::char::from_digit((value % base) as u32, base as u32).unwrap());
        value /= base;
    }
    out.iter().rev().collect()
}

/// Byte encoding of an unsigned integer object with the given magnitude,
/// for inlining inside fractions and complex numbers.
pub fn unsigned_bytes(mag: &[u8]) -> Vec<u8> {
    let mut out = vec![];
    if let Some(small) = mag_to_u64(mag_trim(mag)) {
        write_uleb(&mut out, Id::Integer as u64);
        write_uleb(&mut out, small);
    } else {
        write_uleb(&mut out, Id::Bignum as u64);
        write_uleb(&mut out, mag_trim(mag).len() as u64);
        out.extend_from_slice(mag_trim(mag));
    }
    out
}

// ============================================================================
//
//   Big-endian magnitude arithmetic
//
// ============================================================================

pub fn mag_trim(mag: &[u8]) -> &[u8] {
    let mut start = 0;
    while start < mag.len() && mag[start] == 0 {
        start += 1;
    }
    &mag[start..]
}

pub fn mag_from_u128(value: u128) -> Vec<u8> {
    mag_trim(&value.to_be_bytes()).to_vec()
}

pub fn mag_to_u64(mag: &[u8]) -> Option<u64> {
    if mag.len() > 8 {
        return None;
    }
    let mut value: u64 = 0;
    for &b in mag {
        value = value << 8 | b as u64;
    }
    Some(value)
}

pub fn mag_is_zero(mag: &[u8]) -> bool {
    mag.iter().all(|&b| b == 0)
}

pub fn mag_cmp(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    let a = mag_trim(a);
    let b = mag_trim(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

pub fn mag_add(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; a.len().max(b.len()) + 1];
    let mut carry = 0u16;
    for i in 0..out.len() {
        let av = a.len().checked_sub(i + 1).map_or(0, |j| a[j]) as u16;
        let bv = b.len().checked_sub(i + 1).map_or(0, |j| b[j]) as u16;
        let sum = av + bv + carry;
        let idx = out.len() - 1 - i;
        out[idx] = sum as u8;
        carry = sum >> 8;
    }
    mag_trim(&out).to_vec()
}

/// a - b, requiring a >= b.
pub fn mag_sub(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; a.len()];
    let mut borrow = 0i16;
    for i in 0..a.len() {
        let av = a[a.len() - 1 - i] as i16;
        let bv = b.len().checked_sub(i + 1).map_or(0, |j| b[j]) as i16;
        let mut diff = av - bv - borrow;
        if diff < 0 {
            diff += 256;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out[a.len() - 1 - i] = diff as u8;
    }
    debug_assert_eq!(borrow, 0);
    mag_trim(&out).to_vec()
}

pub fn mag_mul(a: &[u8], b: &[u8]) -> Vec<u8> {
    let a = mag_trim(a);
    let b = mag_trim(b);
    if a.is_empty() || b.is_empty() {
        return vec![];
    }
    let mut out = vec![0u8; a.len() + b.len()];
    for (i, &av) in a.iter().rev().enumerate() {
        let mut carry = 0u32;
        for (j, &bv) in b.iter().rev().enumerate() {
            let k = out.len() - 1 - i - j;
            let cur = out[k] as u32 + av as u32 * bv as u32 + carry;
            out[k] = cur as u8;
            carry = cur >> 8;
        }
        let mut k = out.len() - 1 - i - b.len();
        loop {
            if carry == 0 {
                break;
            }
            let cur = out[k] as u32 + carry;
            out[k] = cur as u8;
            carry = cur >> 8;
            if k == 0 {
                break;
            }
            k -= 1;
        }
    }
    mag_trim(&out).to_vec()
}

pub fn mag_mul_small(a: &[u8], m: u64) -> Vec<u8> {
    mag_mul(a, mag_trim(&m.to_be_bytes()))
}

pub fn mag_add_small(a: &[u8], v: u64) -> Vec<u8> {
    mag_add(a, mag_trim(&v.to_be_bytes()))
}

/// Binary long division: returns (quotient, remainder). Division by zero
/// is the caller's problem and is checked there.
pub fn mag_divmod(a: &[u8], b: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let a = mag_trim(a);
    let b = mag_trim(b);
    debug_assert!(!b.is_empty());
    if mag_cmp(a, b) == std::cmp::Ordering::Less {
        return (vec![], a.to_vec());
    }
    let bits = a.len() * 8;
    let mut quotient = vec![0u8; a.len()];
    let mut rem: Vec<u8> = vec![];
    for bit in 0..bits {
        // rem = rem * 2 + next bit of a
        rem = mag_add(&rem, &rem);
        let byte = a[bit / 8];
        if byte >> (7 - bit % 8) & 1 != 0 {
            rem = mag_add_small(&rem, 1);
        }
        if mag_cmp(&rem, b) != std::cmp::Ordering::Less {
            rem = mag_sub(&rem, b);
            quotient[bit / 8] |= 1 << (7 - bit % 8);
        }
    }
    (mag_trim(&quotient).to_vec(), rem)
}

pub fn mag_gcd(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut a = mag_trim(a).to_vec();
    let mut b = mag_trim(b).to_vec();
    while !b.is_empty() {
        let (_, r) = mag_divmod(&a, &b);
        a = b;
        b = r;
    }
    a
}

pub fn mag_to_decimal(mag: &[u8]) -> String {
    if mag_is_zero(mag) {
        return "0".to_string();
    }
    let mut digits = String::new();
    let mut rest = mag_trim(mag).to_vec();
    let billion = mag_trim(&1_000_000_000u64.to_be_bytes()).to_vec();
    let mut chunks = vec![];
    while !rest.is_empty() {
        let (q, r) = mag_divmod(&rest, &billion);
        chunks.push(mag_to_u64(&r).unwrap_or(0));
        rest = q;
    }
    for (i, chunk) in chunks.iter().rev().enumerate() {
        if i == 0 {
            digits.push_str(&chunk.to_string());
        } else {
            digits.push_str(&format!("{:09}", chunk));
        }
    }
    digits
}

/// Decimal digits of a magnitude, most significant first.
pub fn mag_digits(mag: &[u8]) -> Vec<u8> {
    mag_to_decimal(mag)
        .bytes()
        .map(|b| b - b'0')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mag_round_trip() {
        for &v in &[0u64, 1, 255, 256, 65535, u64::MAX] {
            let mag = mag_trim(&v.to_be_bytes()).to_vec();
            assert_eq!(mag_to_u64(&mag), Some(v));
        }
    }

    #[test]
    fn test_mag_divmod() {
        let a = mag_from_u128(123456789012345678901234567890u128);
        let b = mag_from_u128(987654321u128);
        let (q, r) = mag_divmod(&a, &b);
        let qv = 123456789012345678901234567890u128 / 987654321u128;
        let rv = 123456789012345678901234567890u128 % 987654321u128;
        assert_eq!(mag_cmp(&q, &mag_from_u128(qv)), std::cmp::Ordering::Equal);
        assert_eq!(mag_cmp(&r, &mag_from_u128(rv)), std::cmp::Ordering::Equal);
    }

    #[test]
    fn test_mag_to_decimal() {
        let a = mag_from_u128(123456789012345678901234567890u128);
        assert_eq!(mag_to_decimal(&a), "123456789012345678901234567890");
        assert_eq!(mag_to_decimal(&[]), "0");
    }

    #[test]
    fn test_mag_gcd() {
        let a = mag_from_u128(48);
        let b = mag_from_u128(36);
        assert_eq!(mag_to_u64(&mag_gcd(&a, &b)), Some(12));
    }
}
