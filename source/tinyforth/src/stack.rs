use alloc::vec::Vec;

/// A bounded stack. The bottom of the stack is index zero.
pub struct Stack<T: Copy> {
    items: Vec<T>,
    capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// The operation needed `required` items, but fewer were present.
    Underflow { required: usize },
    /// The stack is at capacity.
    Overflow,
}

impl<T: Copy> Stack<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn push(&mut self, item: T) -> Result<(), StackError> {
        if self.items.len() >= self.capacity {
            return Err(StackError::Overflow);
        }
        self.items.push(item);
        Ok(())
    }

    /// Checks that `n` more items would fit, without pushing anything.
    ///
    /// Words that consume some items and push back more call this first, so
    /// an overflow leaves the stack as it was.
    #[inline]
    pub fn ensure_room(&self, n: usize) -> Result<(), StackError> {
        if self.capacity - self.items.len() < n {
            return Err(StackError::Overflow);
        }
        Ok(())
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn try_pop(&mut self) -> Result<T, StackError> {
        self.pop().ok_or(StackError::Underflow { required: 1 })
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Pops the top `N` items, returned in bottom-to-top order.
    ///
    /// Nothing is popped if fewer than `N` items are present.
    #[inline]
    pub fn try_pop_n<const N: usize>(&mut self) -> Result<[T; N], StackError> {
        let out = self.try_peek_n::<N>()?;
        self.items.truncate(self.items.len() - N);
        Ok(out)
    }

    #[inline]
    pub fn try_peek(&self) -> Result<T, StackError> {
        self.peek().ok_or(StackError::Underflow { required: 1 })
    }

    #[inline]
    pub fn peek(&self) -> Option<T> {
        self.items.last().copied()
    }

    #[inline]
    pub fn peek_mut(&mut self) -> Option<&mut T> {
        self.items.last_mut()
    }

    /// Copies the top `N` items, in bottom-to-top order, without popping.
    #[inline]
    pub fn try_peek_n<const N: usize>(&self) -> Result<[T; N], StackError> {
        let depth = self.items.len();
        if depth < N {
            return Err(StackError::Underflow { required: N });
        }
        let start = depth - N;
        Ok(core::array::from_fn(|i| self.items[start + i]))
    }

    /// Iterates from the bottom of the stack to the top.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
pub mod test {
    use super::{Stack, StackError};
    use crate::Cell;

    #[test]
    fn stack() {
        const ITEMS: usize = 16;
        let mut stack = Stack::<Cell>::new(ITEMS);

        for _ in 0..3 {
            for i in 0..(ITEMS as Cell) {
                assert!(stack.push(i).is_ok());
            }
            assert_eq!(stack.push(100), Err(StackError::Overflow));
            assert_eq!(stack.depth(), ITEMS);
            for i in (0..(ITEMS as Cell)).rev() {
                assert_eq!(stack.pop().unwrap(), i);
            }
            assert!(stack.pop().is_none());
        }
    }

    #[test]
    fn pop_n() {
        let mut stack = Stack::<Cell>::new(8);
        stack.push(1).unwrap();
        stack.push(2).unwrap();
        stack.push(3).unwrap();

        assert_eq!(stack.try_peek_n::<2>(), Ok([2, 3]));
        assert_eq!(stack.depth(), 3);

        assert_eq!(
            stack.try_pop_n::<4>(),
            Err(StackError::Underflow { required: 4 })
        );
        // Nothing was consumed by the failed pop
        assert_eq!(stack.depth(), 3);

        assert_eq!(stack.try_pop_n::<2>(), Ok([2, 3]));
        assert_eq!(stack.iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(stack.try_pop(), Ok(1));
        assert_eq!(stack.try_pop(), Err(StackError::Underflow { required: 1 }));
        assert_eq!(stack.try_peek(), Err(StackError::Underflow { required: 1 }));
    }

    #[test]
    fn room() {
        let mut stack = Stack::<Cell>::new(3);
        assert_eq!(stack.ensure_room(3), Ok(()));
        stack.push(1).unwrap();
        stack.push(2).unwrap();
        assert_eq!(stack.ensure_room(1), Ok(()));
        assert_eq!(stack.ensure_room(2), Err(StackError::Overflow));
        assert_eq!(stack.capacity(), 3);
    }

    #[test]
    fn peek_mut() {
        let mut stack = Stack::<Cell>::new(2);
        assert!(stack.peek_mut().is_none());
        stack.push(10).unwrap();
        *stack.peek_mut().unwrap() += 1;
        assert_eq!(stack.peek(), Some(11));
        stack.clear();
        assert!(stack.is_empty());
    }
}
