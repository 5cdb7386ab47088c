use super::leb128::{uleb_size, write_uleb};
use super::object::{self, Id, Obj};
use super::settings::Settings;
use super::stack::Stack;
use super::trace::Trace;
use crate::lang::parse::{self, Parser};
use crate::lang::render::Renderer;
use crate::lang::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Result<T> = std::result::Result<T, Error>;

/// ## The RPL runtime
///
/// One contiguous byte arena owns every object. Objects are allocated end
/// to end from the base (the home directory sits permanently at offset 0);
/// the scratchpad sits immediately above the last object and is used to
/// accumulate bytes before committing them as a single object. The operand
/// stack, the locals frames and the registered handles hold object offsets
/// and are the garbage collector roots: collection slides live objects
/// toward the base and rewrites every root.

const STACK_LIMIT: usize = u16::MAX as usize;
const LOCALS_LIMIT: usize = 256;
const CALL_LIMIT: usize = 256;

pub const DEFAULT_MEMORY: usize = 100 * 1024;

/// A registered root that survives garbage collection. Obtained from
/// [`Runtime::guard`]; the referenced offset is rewritten when objects
/// move, so `Runtime::guarded` is always current.
#[derive(Debug, Clone, Copy)]
pub struct Handle(usize);

/// A locals frame: a name table (count byte, then length-prefixed names,
/// normally pointing inside the loop object being evaluated) plus the
/// index of the frame's first value slot.
struct Frame {
    names: Obj,
    base: usize,
}

pub struct Runtime {
    mem: Vec<u8>,
    low: usize,
    scratch: usize,
    stack: Stack,
    locals: Vec<Obj>,
    frames: Vec<Frame>,
    guards: Vec<Option<Obj>>,
    free_guards: Vec<usize>,
    path: Vec<Obj>,
    call_depth: usize,
    last_error: Option<Error>,
    interrupted: Arc<AtomicBool>,
    pub settings: Settings,
    pub trace: Trace,
}

impl Default for Runtime {
    fn default() -> Runtime {
        Runtime::new(DEFAULT_MEMORY)
    }
}

impl Runtime {
    pub fn new(memory: usize) -> Runtime {
        let mut rt = Runtime {
            mem: vec![0; memory],
            low: 0,
            scratch: 0,
            stack: Stack::new(STACK_LIMIT),
            locals: vec![],
            frames: vec![],
            guards: vec![],
            free_guards: vec![],
            path: vec![],
            call_depth: 0,
            last_error: None,
            interrupted: Arc::new(AtomicBool::new(false)),
            settings: Settings::default(),
            trace: Trace::from_env(),
        };
        rt.install_home();
        rt
    }

    /// Reset to the initial state: empty home directory, empty stacks.
    /// The settings survive; state load replays them as commands.
    pub fn clear(&mut self) {
        self.low = 0;
        self.scratch = 0;
        self.stack.clear();
        self.locals.clear();
        self.frames.clear();
        self.guards.clear();
        self.free_guards.clear();
        self.path.clear();
        self.call_depth = 0;
        self.last_error = None;
        self.install_home();
    }

    fn install_home(&mut self) {
        // Empty directory: tag, then a zero byte length
        let mut bytes = vec![];
        write_uleb(&mut bytes, Id::Directory as u64);
        write_uleb(&mut bytes, 0);
        self.mem[0..bytes.len()].copy_from_slice(&bytes);
        self.low = bytes.len();
        self.path.push(Obj(0));
    }

    // ========================================================================
    //
    //   Interruption
    //
    // ========================================================================

    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn check_interrupt(&mut self) -> Result<()> {
        if self.interrupted.swap(false, Ordering::SeqCst) {
            return Err(error!(Interrupted));
        }
        Ok(())
    }

    // ========================================================================
    //
    //   Arena access
    //
    // ========================================================================

    pub fn mem(&self) -> &[u8] {
        &self.mem
    }

    pub fn tag(&self, obj: Obj) -> Result<Id> {
        Ok(object::tag_at(&self.mem, obj.0)?.0)
    }

    /// Offset of the object's payload, right after the type tag.
    pub fn payload(&self, obj: Obj) -> Result<usize> {
        Ok(obj.0 + object::tag_at(&self.mem, obj.0)?.1)
    }

    pub fn size(&self, obj: Obj) -> Result<usize> {
        object::size_at(&self.mem, obj.0)
    }

    pub fn skip(&self, obj: Obj) -> Result<Obj> {
        Ok(Obj(obj.0 + self.size(obj)?))
    }

    pub fn obj_bytes(&self, obj: Obj) -> Result<&[u8]> {
        let size = self.size(obj)?;
        Ok(&self.mem[obj.0..obj.0 + size])
    }

    pub fn obj_vec(&self, obj: Obj) -> Result<Vec<u8>> {
        Ok(self.obj_bytes(obj)?.to_vec())
    }

    /// Type-aware equality degrades to byte equality: objects are stored
    /// in canonical form.
    pub fn obj_eq(&self, a: Obj, b: Obj) -> Result<bool> {
        if a == b {
            return Ok(true);
        }
        Ok(self.obj_bytes(a)? == self.obj_bytes(b)?)
    }

    // ========================================================================
    //
    //   Allocation
    //
    // ========================================================================

    pub fn available(&self) -> usize {
        self.mem.len() - self.low - self.scratch
    }

    /// Ensure at least `size` bytes are available, collecting garbage if
    /// needed. Returns the available size.
    pub fn reserve(&mut self, size: usize) -> Result<usize> {
        if self.available() < size {
            self.gc()?;
            if self.available() < size {
                return Err(error!(OutOfMemory));
            }
        }
        Ok(self.available())
    }

    fn alloc(&mut self, size: usize) -> Result<usize> {
        self.reserve(size)?;
        let at = self.low;
        // The scratchpad moves up to make room below it
        self.mem.copy_within(at..at + self.scratch, at + size);
        self.low += size;
        Ok(at)
    }

    /// Create an object from a type tag and raw payload bytes.
    pub fn emit(&mut self, id: Id, payload: &[u8]) -> Result<Obj> {
        let mut head = vec![];
        write_uleb(&mut head, id as u64);
        let total = head.len() + payload.len();
        let at = self.alloc(total)?;
        self.mem[at..at + head.len()].copy_from_slice(&head);
        self.mem[at + head.len()..at + total].copy_from_slice(payload);
        Ok(Obj(at))
    }

    /// Create an object whose payload is a ULEB byte length followed by
    /// the given bytes (texts, symbols, programs, lists, directories).
    pub fn emit_prefixed(&mut self, id: Id, bytes: &[u8]) -> Result<Obj> {
        let mut payload = vec![];
        write_uleb(&mut payload, bytes.len() as u64);
        payload.extend_from_slice(bytes);
        self.emit(id, &payload)
    }

    /// Copy an existing object into fresh temporary space.
    pub fn clone_obj(&mut self, obj: Obj) -> Result<Obj> {
        self.with_guard(obj, |rt, h| {
            let size = rt.size(rt.guarded(h))?;
            rt.reserve(size)?;
            let src = rt.guarded(h);
            let bytes = rt.obj_vec(src)?;
            let at = rt.alloc(bytes.len())?;
            rt.mem[at..at + bytes.len()].copy_from_slice(&bytes);
            Ok(Obj(at))
        })
    }

    // ========================================================================
    //
    //   Scratchpad
    //
    // ========================================================================

    /// Watermark for a scoped scratchpad build: free back to it when the
    /// bytes were not committed.
    pub fn scratch_mark(&self) -> usize {
        self.scratch
    }

    pub fn scratch_free(&mut self, mark: usize) {
        if self.scratch > mark {
            self.scratch = mark;
        }
    }

    pub fn scratch_put(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?;
        let at = self.low + self.scratch;
        self.mem[at..at + bytes.len()].copy_from_slice(bytes);
        self.scratch += bytes.len();
        Ok(())
    }

    /// Append a whole object to the scratchpad. Reserving room may move
    /// the object, so it is tracked through a handle.
    pub fn scratch_put_obj(&mut self, obj: Obj) -> Result<()> {
        self.with_guard(obj, |rt, h| {
            let size = rt.size(rt.guarded(h))?;
            rt.reserve(size)?;
            let src = rt.guarded(h).0;
            let at = rt.low + rt.scratch;
            rt.mem.copy_within(src..src + size, at);
            rt.scratch += size;
            Ok(())
        })
    }

    /// Commit the scratchpad bytes above `mark` as one object, with a
    /// ULEB byte length prefix when `prefixed` is set.
    pub fn scratch_commit(&mut self, id: Id, mark: usize, prefixed: bool) -> Result<Obj> {
        let base = self.low + mark;
        let bytes = self.mem[base..self.low + self.scratch].to_vec();
        self.scratch = mark;
        if prefixed {
            self.emit_prefixed(id, &bytes)
        } else {
            self.emit(id, &bytes)
        }
    }

    // ========================================================================
    //
    //   Handles
    //
    // ========================================================================

    pub fn guard(&mut self, obj: Obj) -> Handle {
        if let Some(slot) = self.free_guards.pop() {
            self.guards[slot] = Some(obj);
            Handle(slot)
        } else {
            self.guards.push(Some(obj));
            Handle(self.guards.len() - 1)
        }
    }

    pub fn unguard(&mut self, handle: Handle) {
        self.guards[handle.0] = None;
        self.free_guards.push(handle.0);
    }

    pub fn guarded(&self, handle: Handle) -> Obj {
        self.guards[handle.0].expect("released handle")
    }

    pub fn with_guard<T>(
        &mut self,
        obj: Obj,
        f: impl FnOnce(&mut Runtime, Handle) -> Result<T>,
    ) -> Result<T> {
        let h = self.guard(obj);
        let r = f(self, h);
        self.unguard(h);
        r
    }

    // ========================================================================
    //
    //   Garbage collection
    //
    // ========================================================================

    /// Compact the temporaries: a single linear pass over the objects
    /// above the home directory. An object is live when any root points
    /// into it; survivors slide toward the base and all roots move with
    /// them. Returns the number of bytes recycled.
    pub fn gc(&mut self) -> Result<usize> {
        let first = object::size_at(&self.mem, 0)?;
        let mut obj = first;
        let mut free = first;
        let mut recycled = 0;
        while obj < self.low {
            let next = object::skip_at(&self.mem, obj)?;
            if next <= obj || next > self.low {
                return Err(error!(InternalError; "corrupt object during collection"));
            }
            if self.any_root_in(obj, next) {
                if free != obj {
                    let delta = obj - free;
                    self.mem.copy_within(obj..next, free);
                    self.adjust_roots(obj, next, -(delta as isize));
                }
                free += next - obj;
            } else {
                recycled += next - obj;
            }
            obj = next;
        }
        // The scratchpad rides just above the last object
        if recycled > 0 && self.scratch > 0 {
            self.mem.copy_within(self.low..self.low + self.scratch, free);
        }
        self.low = free;
        self.trace.record("gc", &format!("recycled {} bytes", recycled));
        Ok(recycled)
    }

    fn any_root_in(&self, start: usize, end: usize) -> bool {
        self.stack.iter().any(|o| o.0 >= start && o.0 < end)
            || self.locals.iter().any(|o| o.0 >= start && o.0 < end)
            || self.guards.iter().flatten().any(|o| o.0 >= start && o.0 < end)
            || self.frames.iter().any(|f| f.names.0 >= start && f.names.0 < end)
            || self.path.iter().any(|o| o.0 >= start && o.0 < end)
    }

    fn adjust_roots(&mut self, start: usize, end: usize, delta: isize) {
        let fix = |o: &mut Obj| {
            if o.0 >= start && o.0 < end {
                o.0 = (o.0 as isize + delta) as usize;
            }
        };
        self.stack.iter_mut().for_each(fix);
        self.locals.iter_mut().for_each(fix);
        self.guards.iter_mut().flatten().for_each(fix);
        self.frames.iter_mut().for_each(|f| fix(&mut f.names));
        self.path.iter_mut().for_each(fix);
    }

    // ========================================================================
    //
    //   Globals area surgery (for directory store/purge)
    //
    // ========================================================================

    /// Open a gap of `len` bytes at `at`, shifting every byte above it
    /// (including the scratchpad) upward and adjusting roots. The caller
    /// must have reserved the space.
    pub(crate) fn globals_insert(&mut self, at: usize, len: usize) -> Result<()> {
        if self.available() < len {
            return Err(error!(OutOfMemory));
        }
        self.mem.copy_within(at..self.low + self.scratch, at + len);
        self.low += len;
        self.adjust_roots(at, usize::MAX, len as isize);
        Ok(())
    }

    /// Remove `len` bytes at `at`, shifting everything above downward.
    pub(crate) fn globals_remove(&mut self, at: usize, len: usize) {
        self.mem.copy_within(at + len..self.low + self.scratch, at);
        self.low -= len;
        // The store/purge paths clone anything still referencing the
        // removed range before calling this
        self.adjust_roots(at + len, usize::MAX, -(len as isize));
    }

    pub(crate) fn write_bytes(&mut self, at: usize, bytes: &[u8]) {
        self.mem[at..at + bytes.len()].copy_from_slice(bytes);
    }

    /// If any stack or local slot references this exact object (typically
    /// a directory value about to be overwritten), clone it into the
    /// temporaries and repoint the slots to the clone.
    pub(crate) fn clone_global(&mut self, global: Obj) -> Result<()> {
        let referenced = self.stack.iter().any(|&o| o == global)
            || self.locals.iter().any(|&o| o == global)
            || self.guards.iter().flatten().any(|&o| o == global);
        if !referenced {
            return Ok(());
        }
        let cloned = self.clone_obj(global)?;
        let fix = |o: &mut Obj| {
            if *o == global {
                *o = cloned;
            }
        };
        self.stack.iter_mut().for_each(fix);
        self.locals.iter_mut().for_each(fix);
        self.guards.iter_mut().flatten().for_each(fix);
        Ok(())
    }

    /// Rewrite a directory's ULEB byte-length prefix after its content
    /// grew or shrank by `delta`, moving memory when the prefix itself
    /// changes width. Returns the extra shift introduced by the prefix.
    pub(crate) fn resize_prefix(&mut self, obj: Obj, delta: isize) -> Result<isize> {
        let at = self.payload(obj)?;
        let (old, old_width) = super::leb128::read_uleb(&self.mem, at)
            .ok_or_else(|| error!(InternalError; "truncated directory"))?;
        let new = (old as isize + delta) as u64;
        let new_width = uleb_size(new);
        let mut extra = 0isize;
        if new_width > old_width {
            let grow = new_width - old_width;
            self.reserve(grow)?;
            self.globals_insert(at + old_width, grow)?;
            extra = grow as isize;
        } else if new_width < old_width {
            let shrink = old_width - new_width;
            self.globals_remove(at + new_width, shrink);
            extra = -(shrink as isize);
        }
        let mut prefix = vec![];
        write_uleb(&mut prefix, new);
        self.write_bytes(at, &prefix);
        Ok(extra)
    }

    // ========================================================================
    //
    //   Operand stack
    //
    // ========================================================================

    pub fn push(&mut self, obj: Obj) -> Result<()> {
        self.stack.push(obj)
    }

    pub fn pop(&mut self) -> Result<Obj> {
        self.stack.pop()
    }

    pub fn pop_2(&mut self) -> Result<(Obj, Obj)> {
        self.stack.pop_2()
    }

    pub fn peek(&self, level: usize) -> Result<Obj> {
        self.stack.get(level)
    }

    pub fn poke(&mut self, level: usize, obj: Obj) -> Result<()> {
        self.stack.set(level, obj)
    }

    pub fn drop(&mut self, count: usize) -> Result<()> {
        self.stack.drop(count)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn stack_iter(&self) -> std::slice::Iter<'_, Obj> {
        self.stack.iter()
    }

    pub fn clear_stack(&mut self) {
        self.stack.clear()
    }

    // ========================================================================
    //
    //   Locals
    //
    // ========================================================================

    /// Open a locals frame. `names` points at a name table (count byte,
    /// then length-prefixed names); `values` are the initial slots, in
    /// name order.
    pub fn frame_enter(&mut self, names: Obj, values: Vec<Obj>) -> Result<()> {
        if self.locals.len() + values.len() > LOCALS_LIMIT {
            return Err(error!(TooManyLocals));
        }
        let base = self.locals.len();
        self.locals.extend(values);
        self.frames.push(Frame { names, base });
        Ok(())
    }

    pub fn frame_exit(&mut self) {
        if let Some(frame) = self.frames.pop() {
            self.locals.truncate(frame.base);
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn locals_count(&self) -> usize {
        self.locals.len()
    }

    /// Read or write a slot of the innermost frame.
    pub fn local(&self, index: usize) -> Result<Obj> {
        let frame = self.frames.last().ok_or_else(|| error!(InvalidLocal))?;
        self.locals
            .get(frame.base + index)
            .copied()
            .ok_or_else(|| error!(InvalidLocal))
    }

    pub fn local_set(&mut self, index: usize, obj: Obj) -> Result<()> {
        let frame = self.frames.last().ok_or_else(|| error!(InvalidLocal))?;
        let slot = frame.base + index;
        if slot >= self.locals.len() {
            return Err(error!(InvalidLocal));
        }
        self.locals[slot] = obj;
        Ok(())
    }

    /// Resolve a name in the locals frames, innermost first.
    pub fn lookup_local(&self, name: &[u8]) -> Result<Option<Obj>> {
        for frame in self.frames.iter().rev() {
            let table = frame.names.0;
            let count = *self
                .mem
                .get(table)
                .ok_or_else(|| error!(InternalError; "bad name table"))? as usize;
            let mut at = table + 1;
            for index in 0..count {
                let (len, llen) = super::leb128::read_uleb(&self.mem, at)
                    .ok_or_else(|| error!(InternalError; "bad name table"))?;
                let start = at + llen;
                let end = start + len as usize;
                if self.mem.get(start..end) == Some(name) {
                    return Ok(Some(self.locals[frame.base + index]));
                }
                at = end;
            }
        }
        Ok(None)
    }

    // ========================================================================
    //
    //   Directories
    //
    // ========================================================================

    /// The current directory, innermost of the search path.
    pub fn current_dir(&self) -> Obj {
        *self.path.last().expect("empty directory path")
    }

    pub fn home(&self) -> Obj {
        self.path[0]
    }

    pub fn dir_path(&self) -> &[Obj] {
        &self.path
    }

    // ========================================================================
    //
    //   Evaluation
    //
    // ========================================================================

    pub fn eval(&mut self, obj: Obj) -> Result<()> {
        self.check_interrupt()?;
        let id = self.tag(obj)?;
        self.trace.record("eval", object::ops(id).name);
        (object::ops(id).eval)(self, obj)
    }

    pub fn exec(&mut self, obj: Obj) -> Result<()> {
        self.check_interrupt()?;
        let id = self.tag(obj)?;
        self.trace.record("eval", object::ops(id).name);
        (object::ops(id).exec)(self, obj)
    }

    /// Bracket for nested program execution: bounds the native call depth
    /// the way a returns stack would.
    pub fn call<T>(&mut self, f: impl FnOnce(&mut Runtime) -> Result<T>) -> Result<T> {
        if self.call_depth >= CALL_LIMIT {
            return Err(error!(OutOfMemory; "too many nested calls"));
        }
        self.call_depth += 1;
        let r = f(self);
        self.call_depth -= 1;
        r
    }

    /// Parse and evaluate a command line. On error, the unwound stack is
    /// left as is for the user to inspect.
    pub fn enter(&mut self, source: &str) -> Result<()> {
        let result = self.enter_inner(source);
        if let Err(error) = &result {
            self.last_error = Some(error.clone());
        }
        result
    }

    fn enter_inner(&mut self, source: &str) -> Result<()> {
        let mut p = Parser::new(source);
        loop {
            p.skip_whitespace();
            if p.at_end() {
                return Ok(());
            }
            let obj = parse::parse_object(self, &mut p)?;
            self.eval(obj)?;
        }
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    // ========================================================================
    //
    //   Rendering helpers
    //
    // ========================================================================

    pub fn render_obj(&self, obj: Obj) -> Result<String> {
        let mut r = Renderer::new(self.settings.clone());
        object::render(self, obj, &mut r)?;
        Ok(r.take())
    }

    /// Canonical form for state files: period separator, no grouping, no
    /// fancy exponents, maximum digits.
    pub fn render_canonical(&self, obj: Obj) -> Result<String> {
        let mut r = Renderer::file(self.settings.clone());
        object::render(self, obj, &mut r)?;
        Ok(r.take())
    }
}
