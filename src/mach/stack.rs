use super::object::Obj;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Operand stack
///
/// A stack of object references. Level 0 is the top. Underflow is a user
/// error (`Too Few Arguments`), overflow a resource error.

#[derive(Debug)]
pub struct Stack {
    depth_limit: usize,
    stack: Vec<Obj>,
}

impl Stack {
    pub fn new(depth_limit: usize) -> Stack {
        Stack {
            depth_limit,
            stack: vec![],
        }
    }

    fn overflow_check(&self) -> Result<()> {
        if self.stack.len() > self.depth_limit {
            Err(error!(OutOfMemory; "stack overflow"))
        } else {
            Ok(())
        }
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear()
    }

    pub fn push(&mut self, obj: Obj) -> Result<()> {
        self.stack.push(obj);
        self.overflow_check()
    }

    pub fn pop(&mut self) -> Result<Obj> {
        match self.stack.pop() {
            Some(v) => Ok(v),
            None => Err(error!(TooFewArguments)),
        }
    }

    pub fn pop_2(&mut self) -> Result<(Obj, Obj)> {
        let one = self.pop()?;
        let two = self.pop()?;
        Ok((one, two))
    }

    /// Object at the given level, 0 being the top of the stack.
    pub fn get(&self, level: usize) -> Result<Obj> {
        let len = self.stack.len();
        if level >= len {
            return Err(error!(TooFewArguments));
        }
        Ok(self.stack[len - 1 - level])
    }

    pub fn set(&mut self, level: usize, obj: Obj) -> Result<()> {
        let len = self.stack.len();
        if level >= len {
            return Err(error!(TooFewArguments));
        }
        self.stack[len - 1 - level] = obj;
        Ok(())
    }

    pub fn drop(&mut self, count: usize) -> Result<()> {
        if count > self.stack.len() {
            return Err(error!(TooFewArguments));
        }
        let keep = self.stack.len() - count;
        self.stack.truncate(keep);
        Ok(())
    }

    /// Bottom-to-top iteration, for rendering and state save.
    pub fn iter(&self) -> std::slice::Iter<'_, Obj> {
        self.stack.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Obj> {
        self.stack.iter_mut()
    }
}
