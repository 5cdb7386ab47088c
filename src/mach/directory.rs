use super::leb128::{read_uleb, write_uleb};
use super::object::{self, Id, Obj};
use super::runtime::Runtime;
use super::text;
use crate::lang::parse::{self, Parser};
use crate::lang::render::Renderer;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Directories
///
/// The global variable store. A directory's payload is a ULEB byte
/// length followed by (symbol, value) pairs laid end to end; nested
/// directories are just values, and the search path walks from the
/// current directory out to home. The home directory sits at the bottom
/// of the arena and never moves; storing rewrites it in place, shifting
/// everything above and fixing up the roots.

fn content(rt: &Runtime, dir: Obj) -> Result<(usize, usize)> {
    let at = rt.payload(dir)?;
    let (len, llen) =
        read_uleb(rt.mem(), at).ok_or_else(|| error!(InternalError; "truncated directory"))?;
    Ok((at + llen, at + llen + len as usize))
}

/// All (name, value) entry pairs.
pub fn entries(rt: &Runtime, dir: Obj) -> Result<Vec<(Obj, Obj)>> {
    let (mut at, end) = content(rt, dir)?;
    let mut out = vec![];
    while at < end {
        let name = Obj(at);
        let value = rt.skip(name)?;
        let next = rt.skip(value)?;
        if next.0 > end {
            return Err(error!(InternalError; "malformed directory"));
        }
        out.push((name, value));
        at = next.0;
    }
    Ok(out)
}

fn find(rt: &Runtime, dir: Obj, name: &[u8]) -> Result<Option<(Obj, Obj)>> {
    for (entry_name, value) in entries(rt, dir)? {
        if rt.tag(entry_name)? == Id::Symbol && text::text_of(rt, entry_name)? == name {
            return Ok(Some((entry_name, value)));
        }
    }
    Ok(None)
}

/// Resolve a name through the directory chain, innermost first.
pub fn recall(rt: &Runtime, name: &[u8]) -> Result<Option<Obj>> {
    for &dir in rt.dir_path().iter().rev() {
        if let Some((_, value)) = find(rt, dir, name)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Grow or shrink every directory on the path by `delta` content bytes,
/// innermost first; a length prefix changing width shifts the outer
/// directories a little more.
fn adjust_path_sizes(rt: &mut Runtime, mut delta: isize) -> Result<()> {
    for i in (0..rt.dir_path().len()).rev() {
        let dir = rt.dir_path()[i];
        delta += rt.resize_prefix(dir, delta)?;
    }
    Ok(())
}

/// Store a value under a name in the current directory, replacing any
/// existing entry.
pub fn store(rt: &mut Runtime, name: &[u8], value: Obj) -> Result<()> {
    rt.with_guard(value, |rt, hval| {
        let dir = rt.current_dir();
        if let Some((_, existing)) = find(rt, dir, name)? {
            let es = rt.size(existing)?;
            let vs = rt.size(rt.guarded(hval))?;
            if vs > es {
                // May collect garbage; the directory itself won't move
                rt.reserve(vs - es)?;
            }
            // Anything on the stack still using the old value keeps a
            // private copy
            rt.clone_global(existing)?;
            if vs > es {
                rt.globals_insert(existing.0 + es, vs - es)?;
            } else if es > vs {
                rt.globals_remove(existing.0 + vs, es - vs);
            }
            let bytes = rt.obj_vec(rt.guarded(hval))?;
            rt.write_bytes(existing.0, &bytes);
            adjust_path_sizes(rt, vs as isize - es as isize)
        } else {
            let mut name_bytes = vec![];
            write_uleb(&mut name_bytes, Id::Symbol as u64);
            write_uleb(&mut name_bytes, name.len() as u64);
            name_bytes.extend_from_slice(name);
            let ns = name_bytes.len();
            let vs = rt.size(rt.guarded(hval))?;
            rt.reserve(ns + vs)?;
            let dir = rt.current_dir();
            let (_, end) = content(rt, dir)?;
            rt.globals_insert(end, ns + vs)?;
            rt.write_bytes(end, &name_bytes);
            let bytes = rt.obj_vec(rt.guarded(hval))?;
            rt.write_bytes(end + ns, &bytes);
            adjust_path_sizes(rt, (ns + vs) as isize)
        }
    })
}

/// Remove a name from the current directory. Returns whether anything
/// was purged; a missing name is not an error.
pub fn purge(rt: &mut Runtime, name: &[u8]) -> Result<bool> {
    let dir = rt.current_dir();
    if let Some((entry_name, value)) = find(rt, dir, name)? {
        rt.clone_global(value)?;
        rt.clone_global(entry_name)?;
        let purged = rt.size(entry_name)? + rt.size(value)?;
        rt.globals_remove(entry_name.0, purged);
        adjust_path_sizes(rt, -(purged as isize))?;
        Ok(true)
    } else {
        Ok(false)
    }
}

// ============================================================================
//
//   Parsing and rendering
//
// ============================================================================

pub fn parse(rt: &mut Runtime, p: &mut Parser) -> Result<Option<Obj>> {
    if !p.match_keyword("directory") {
        return Ok(None);
    }
    p.skip_whitespace();
    let start = p.pos;
    if !p.match_str("{") {
        return Err(error!(SyntaxError, p.pos; "expected { after directory"));
    }
    let mark = rt.scratch_mark();
    let result = (|| {
        let mut expecting_name = true;
        loop {
            p.skip_whitespace();
            if p.at_end() {
                return Err(error!(Unterminated, start; "directory"));
            }
            if p.match_str("}") {
                if !expecting_name {
                    return Err(error!(SyntaxError, p.pos; "directory entry without value"));
                }
                return Ok(Some(rt.scratch_commit(Id::Directory, mark, true)?));
            }
            let obj = parse::parse_object(rt, p)?;
            if expecting_name && rt.tag(obj)? != Id::Symbol {
                return Err(error!(SyntaxError, p.pos; "expected a name"));
            }
            expecting_name = !expecting_name;
            rt.scratch_put_obj(obj)?;
        }
    })();
    if result.is_err() {
        rt.scratch_free(mark);
    }
    result
}

pub fn render(rt: &Runtime, obj: Obj, r: &mut Renderer) -> Result<()> {
    r.put("Directory {");
    for (name, value) in entries(rt, obj)? {
        r.put_char(' ');
        object::render(rt, name, r)?;
        r.put_char(' ');
        object::render(rt, value, r)?;
    }
    r.put(" }");
    Ok(())
}
