use core::fmt::Write;

use tracing::debug;

use crate::{
    cell::{flag, floored_divmod, CELL, FALSE, TRUE},
    dictionary::{BuiltinEntry, EntryKind},
    fastr::{comptime_fastr, FaStr},
    stack::StackError,
    Cell, Error, Forth,
};

// NOTE: This macro exists because we can't have const constructors that include
// "mut" items, which unfortunately covers things like `fn(&mut T)`. Use a macro
// until this is resolved.
macro_rules! builtin {
    ($name:literal, $func:expr) => {
        BuiltinEntry {
            name: comptime_fastr($name),
            func: $func,
        }
    };
}

impl<T: 'static> Forth<T> {
    pub const FULL_BUILTINS: &'static [BuiltinEntry<T>] = &[
        //
        // Math operations
        //
        builtin!("+", Self::add),
        builtin!("-", Self::minus),
        builtin!("*", Self::mul),
        builtin!("/", Self::div),
        builtin!("mod", Self::modu),
        builtin!("/mod", Self::div_mod),
        builtin!("1+", Self::one_plus),
        builtin!("1-", Self::one_minus),
        builtin!("2+", Self::two_plus),
        builtin!("2-", Self::two_minus),
        builtin!("2*", Self::two_mul),
        builtin!("2/", Self::two_div),
        builtin!("negate", Self::negate),
        builtin!("sqr", Self::sqr),
        builtin!("cube", Self::cube),
        //
        // Comparison
        //
        builtin!("=", Self::equal),
        builtin!("<", Self::less),
        builtin!(">", Self::greater),
        //
        // Stack operations
        //
        builtin!("dup", Self::dup),
        builtin!("drop", Self::ds_drop),
        builtin!("swap", Self::swap),
        builtin!("over", Self::over),
        builtin!("rot", Self::rot),
        builtin!("-rot", Self::minus_rot),
        builtin!("nip", Self::nip),
        builtin!("tuck", Self::tuck),
        builtin!("2dup", Self::dup_2),
        builtin!("2drop", Self::ds_drop_2),
        //
        // Memory operations
        //
        builtin!("cells", Self::cells),
        builtin!("cell+", Self::cell_plus),
        builtin!("!", Self::store),
        builtin!("@", Self::fetch),
        //
        // Output
        //
        builtin!(".", Self::pop_print),
        builtin!(".s", Self::print_stack),
        builtin!("emit", Self::emit),
        builtin!(".cr", Self::cr),
        builtin!("words", Self::words),
        //
        // Defining words
        //
        builtin!("variable", Self::variable),
        builtin!("constant", Self::constant),
        builtin!(":", Self::colon),
        builtin!(";", Self::semicolon),
    ];

    /// Constants defined right after the builtins.
    pub const SEED_CONSTANTS: &'static [(FaStr, Cell)] = &[
        (comptime_fastr("cell"), CELL),
        (comptime_fastr("true"), TRUE),
        (comptime_fastr("false"), FALSE),
    ];

    fn binary(&mut self, f: impl FnOnce(Cell, Cell) -> Cell) -> Result<(), Error> {
        let [a, b] = self.data_stack.try_pop_n::<2>()?;
        self.data_stack.push(f(a, b))?;
        Ok(())
    }

    fn unary(&mut self, f: impl FnOnce(Cell) -> Cell) -> Result<(), Error> {
        let a = self
            .data_stack
            .peek_mut()
            .ok_or(StackError::Underflow { required: 1 })?;
        *a = f(*a);
        Ok(())
    }

    /// Pops the two operands, then fails if the divisor is zero.
    fn divide(&mut self) -> Result<(Cell, Cell), Error> {
        let [a, b] = self.data_stack.try_pop_n::<2>()?;
        floored_divmod(a, b).ok_or(Error::DivisionByZero)
    }

    pub fn add(&mut self) -> Result<(), Error> {
        self.binary(Cell::wrapping_add)
    }

    pub fn minus(&mut self) -> Result<(), Error> {
        self.binary(Cell::wrapping_sub)
    }

    pub fn mul(&mut self) -> Result<(), Error> {
        self.binary(Cell::wrapping_mul)
    }

    pub fn div(&mut self) -> Result<(), Error> {
        let (quot, _rem) = self.divide()?;
        self.data_stack.push(quot)?;
        Ok(())
    }

    pub fn modu(&mut self) -> Result<(), Error> {
        let (_quot, rem) = self.divide()?;
        self.data_stack.push(rem)?;
        Ok(())
    }

    pub fn div_mod(&mut self) -> Result<(), Error> {
        let (quot, rem) = self.divide()?;
        self.data_stack.push(rem)?;
        self.data_stack.push(quot)?;
        Ok(())
    }

    pub fn one_plus(&mut self) -> Result<(), Error> {
        self.unary(|a| a.wrapping_add(1))
    }

    pub fn one_minus(&mut self) -> Result<(), Error> {
        self.unary(|a| a.wrapping_sub(1))
    }

    pub fn two_plus(&mut self) -> Result<(), Error> {
        self.unary(|a| a.wrapping_add(2))
    }

    pub fn two_minus(&mut self) -> Result<(), Error> {
        self.unary(|a| a.wrapping_sub(2))
    }

    pub fn two_mul(&mut self) -> Result<(), Error> {
        self.unary(|a| a.wrapping_mul(2))
    }

    /// Arithmetic shift, which floors like `/` does.
    pub fn two_div(&mut self) -> Result<(), Error> {
        self.unary(|a| a >> 1)
    }

    pub fn negate(&mut self) -> Result<(), Error> {
        self.unary(Cell::wrapping_neg)
    }

    pub fn sqr(&mut self) -> Result<(), Error> {
        self.unary(|a| a.wrapping_mul(a))
    }

    pub fn cube(&mut self) -> Result<(), Error> {
        self.unary(|a| a.wrapping_mul(a).wrapping_mul(a))
    }

    pub fn equal(&mut self) -> Result<(), Error> {
        self.binary(|a, b| flag(a == b))
    }

    pub fn less(&mut self) -> Result<(), Error> {
        self.binary(|a, b| flag(a < b))
    }

    pub fn greater(&mut self) -> Result<(), Error> {
        self.binary(|a, b| flag(a > b))
    }

    pub fn dup(&mut self) -> Result<(), Error> {
        let val = self.data_stack.try_peek()?;
        self.data_stack.push(val)?;
        Ok(())
    }

    pub fn ds_drop(&mut self) -> Result<(), Error> {
        let _a = self.data_stack.try_pop()?;
        Ok(())
    }

    pub fn swap(&mut self) -> Result<(), Error> {
        let [a, b] = self.data_stack.try_pop_n::<2>()?;
        self.data_stack.push(b)?;
        self.data_stack.push(a)?;
        Ok(())
    }

    pub fn over(&mut self) -> Result<(), Error> {
        let [a, _b] = self.data_stack.try_peek_n::<2>()?;
        self.data_stack.push(a)?;
        Ok(())
    }

    // ( a b c -- b c a )
    pub fn rot(&mut self) -> Result<(), Error> {
        let [a, b, c] = self.data_stack.try_pop_n::<3>()?;
        self.data_stack.push(b)?;
        self.data_stack.push(c)?;
        self.data_stack.push(a)?;
        Ok(())
    }

    // ( a b c -- c a b )
    pub fn minus_rot(&mut self) -> Result<(), Error> {
        let [a, b, c] = self.data_stack.try_pop_n::<3>()?;
        self.data_stack.push(c)?;
        self.data_stack.push(a)?;
        self.data_stack.push(b)?;
        Ok(())
    }

    // ( a b -- b )
    pub fn nip(&mut self) -> Result<(), Error> {
        let [_a, b] = self.data_stack.try_pop_n::<2>()?;
        self.data_stack.push(b)?;
        Ok(())
    }

    // ( a b -- b a b )
    pub fn tuck(&mut self) -> Result<(), Error> {
        self.data_stack.ensure_room(1)?;
        let [a, b] = self.data_stack.try_pop_n::<2>()?;
        self.data_stack.push(b)?;
        self.data_stack.push(a)?;
        self.data_stack.push(b)?;
        Ok(())
    }

    pub fn dup_2(&mut self) -> Result<(), Error> {
        let [a, b] = self.data_stack.try_peek_n::<2>()?;
        self.data_stack.ensure_room(2)?;
        self.data_stack.push(a)?;
        self.data_stack.push(b)?;
        Ok(())
    }

    pub fn ds_drop_2(&mut self) -> Result<(), Error> {
        let _ = self.data_stack.try_pop_n::<2>()?;
        Ok(())
    }

    pub fn cells(&mut self) -> Result<(), Error> {
        self.unary(|n| n.wrapping_mul(CELL))
    }

    pub fn cell_plus(&mut self) -> Result<(), Error> {
        self.unary(|addr| addr.wrapping_add(CELL))
    }

    // ( value addr -- )
    pub fn store(&mut self) -> Result<(), Error> {
        let [val, addr] = self.data_stack.try_pop_n::<2>()?;
        self.memory.store(addr, val)?;
        Ok(())
    }

    // ( addr -- value )
    pub fn fetch(&mut self) -> Result<(), Error> {
        let addr = self.data_stack.try_pop()?;
        let val = self.memory.fetch(addr)?;
        self.data_stack.push(val)?;
        Ok(())
    }

    pub fn pop_print(&mut self) -> Result<(), Error> {
        let a = self.data_stack.try_pop()?;
        self.output.separate()?;
        write!(&mut self.output, "{a}")?;
        Ok(())
    }

    pub fn print_stack(&mut self) -> Result<(), Error> {
        self.output.separate()?;
        write!(&mut self.output, "<{}>", self.data_stack.depth())?;
        for val in self.data_stack.iter() {
            write!(&mut self.output, " {val}")?;
        }
        Ok(())
    }

    pub fn emit(&mut self) -> Result<(), Error> {
        let val = self.data_stack.try_pop()?;
        self.output.push_bstr(&[val as u8])?;
        Ok(())
    }

    pub fn cr(&mut self) -> Result<(), Error> {
        self.output.push_bstr(b"\n")?;
        Ok(())
    }

    pub fn words(&mut self) -> Result<(), Error> {
        self.output.separate()?;
        for (i, name) in self.dict.live_names().enumerate() {
            if i != 0 {
                self.output.push_bstr(b" ")?;
            }
            self.output.push_bstr(name.as_bytes())?;
        }
        Ok(())
    }

    // VARIABLE NAME
    pub fn variable(&mut self) -> Result<(), Error> {
        let name = self.munch_name("VARIABLE")?;
        // Don't use up an address for an entry that can't be made
        self.dict.ensure_room()?;
        let addr = self.memory.allot()?;
        self.dict.push(name, EntryKind::Variable(addr))?;
        debug!(%name, addr, "variable");
        Ok(())
    }

    // VALUE CONSTANT NAME
    pub fn constant(&mut self) -> Result<(), Error> {
        // Underflow is reported before a missing name
        let _ = self.data_stack.try_peek()?;
        let name = self.munch_name("CONSTANT")?;
        let val = self.data_stack.try_pop()?;
        self.dict.push(name, EntryKind::Constant(val))?;
        debug!(%name, val, "constant");
        Ok(())
    }

    // : NAME
    pub fn colon(&mut self) -> Result<(), Error> {
        let name = self.munch_name(":")?;
        self.start_colon(name);
        Ok(())
    }

    /// Inside a definition, `;` is handled by the compiler. Anywhere else
    /// it's an error.
    pub fn semicolon(&mut self) -> Result<(), Error> {
        Err(Error::CompileOnly(";"))
    }
}
