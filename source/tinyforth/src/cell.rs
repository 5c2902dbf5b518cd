/// The unit of stack and memory storage.
///
/// Cells are always 32 bits wide, regardless of the native word size, so
/// the interpreter behaves the same on 32- and 64-bit targets.
pub type Cell = i32;

/// Size of a [`Cell`] in bytes, as reported by `CELL`.
pub const CELL: Cell = core::mem::size_of::<Cell>() as Cell;

/// The canonical forth "true" flag.
pub const TRUE: Cell = -1;

/// The canonical forth "false" flag.
pub const FALSE: Cell = 0;

#[inline]
pub fn flag(b: bool) -> Cell {
    if b {
        TRUE
    } else {
        FALSE
    }
}

/// Parses a signed decimal literal: an optional leading `-` followed by one
/// or more ASCII digits.
///
/// Literals that don't fit in a [`Cell`] wrap around.
pub fn parse_cell(word: &str) -> Option<Cell> {
    let (neg, digits) = match word.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, word),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mag = digits.bytes().fold(0 as Cell, |acc, b| {
        acc.wrapping_mul(10).wrapping_add(Cell::from(b - b'0'))
    });
    Some(if neg { mag.wrapping_neg() } else { mag })
}

/// Floored division: the quotient rounds toward negative infinity and the
/// remainder takes the sign of the divisor, so `a == b * q + r` holds.
///
/// Returns `None` when `b` is zero.
pub fn floored_divmod(a: Cell, b: Cell) -> Option<(Cell, Cell)> {
    if b == 0 {
        return None;
    }
    let mut quot = a.wrapping_div(b);
    let mut rem = a.wrapping_rem(b);
    if rem != 0 && ((rem < 0) != (b < 0)) {
        rem = rem.wrapping_add(b);
        quot = quot.wrapping_sub(1);
    }
    Some((quot, rem))
}
