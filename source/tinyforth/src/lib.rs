#![cfg_attr(not(any(test, feature = "use-std")), no_std)]

extern crate alloc;

pub mod cell;
pub mod dictionary;
pub mod fastr;
pub mod input;
pub mod memory;
pub mod output;
pub mod params;
pub mod repl;
pub mod stack;
pub mod vm;

#[cfg(any(test, feature = "_force_test_utils"))]
pub mod testutil;

use alloc::string::String;
use core::fmt;

pub use crate::{
    cell::{Cell, CELL},
    params::ForthParams,
    repl::{Repl, ReplSettings},
    vm::Forth,
};
use crate::{
    dictionary::{DictionaryError, EntryId},
    fastr::FaStr,
    input::InputError,
    memory::MemoryError,
    output::OutputError,
    stack::StackError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Run,
    /// Between `: NAME` and `;`. Compiled cells are appended to the code
    /// space from `start` on.
    Compile { name: FaStr, start: u16 },
}

/// Everything that can abort a line.
///
/// The `Display` impl produces the message the REPL prints for the error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Stack(StackError),
    Memory(MemoryError),
    Dictionary(DictionaryError),
    Output(OutputError),
    Input(InputError),
    DivisionByZero,
    /// Neither a dictionary entry nor a number. Holds the token as typed.
    UnknownWord(String),
    /// A defining word was at the end of the line.
    MissingName(&'static str),
    NameTooLong,
    NestedDefinition,
    /// The line ended inside a colon definition.
    UnterminatedDefinition(FaStr),
    CompileOnly(&'static str),
    CallStackOverflow,
}

impl From<StackError> for Error {
    fn from(se: StackError) -> Self {
        Error::Stack(se)
    }
}

impl From<MemoryError> for Error {
    fn from(me: MemoryError) -> Self {
        Error::Memory(me)
    }
}

impl From<DictionaryError> for Error {
    fn from(de: DictionaryError) -> Self {
        Error::Dictionary(de)
    }
}

impl From<OutputError> for Error {
    fn from(oe: OutputError) -> Self {
        Error::Output(oe)
    }
}

impl From<InputError> for Error {
    fn from(ie: InputError) -> Self {
        Error::Input(ie)
    }
}

// `OutputBuf`'s `fmt::Write` impl only fails when it runs out of room.
impl From<core::fmt::Error> for Error {
    fn from(_: core::fmt::Error) -> Self {
        Error::Output(OutputError::OutputFull)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Stack(StackError::Underflow { required: 1 }) => f.write_str("requires 1 item"),
            Error::Stack(StackError::Underflow { required }) => {
                write!(f, "requires {required} items")
            }
            Error::Stack(StackError::Overflow) => f.write_str("Error: stack overflow"),
            Error::Memory(MemoryError::InvalidStoreAddress(_)) => {
                f.write_str("invalid store address")
            }
            Error::Memory(MemoryError::InvalidFetchAddress(_)) => {
                f.write_str("invalid fetch address")
            }
            Error::Memory(MemoryError::Full) => f.write_str("Error: out of variable space"),
            Error::Dictionary(DictionaryError::Full) => f.write_str("Error: dictionary full"),
            Error::Dictionary(DictionaryError::CodeSpaceFull) => {
                f.write_str("Error: code space full")
            }
            Error::Dictionary(DictionaryError::InvalidEntry) => {
                f.write_str("Error: invalid dictionary entry")
            }
            Error::Output(OutputError::OutputFull) => f.write_str("Error: output buffer full"),
            Error::Input(InputError::TooLong) => f.write_str("Error: input line too long"),
            Error::Input(InputError::NonAscii) => f.write_str("Error: input is not ASCII"),
            Error::DivisionByZero => f.write_str("Error: division by zero"),
            Error::UnknownWord(word) => write!(f, "Unknown word: {word}"),
            Error::MissingName(word) => write!(f, "Error: {word} requires a name"),
            Error::NameTooLong => f.write_str("Error: name too long"),
            Error::NestedDefinition => f.write_str("Error: nested definition"),
            Error::UnterminatedDefinition(name) => {
                write!(f, "Error: unterminated definition of {name}")
            }
            Error::CompileOnly(word) => {
                write!(f, "Error: {word} is only valid inside a definition")
            }
            Error::CallStackOverflow => f.write_str("Error: return stack overflow"),
        }
    }
}

#[cfg(feature = "use-std")]
impl std::error::Error for Error {}

/// `WordFunc` represents a function that can be used as part of a dictionary word.
///
/// It takes the current "full context" (e.g. `Forth`), including the input
/// buffer, so defining words can read the name that follows them.
pub type WordFunc<T> = fn(&mut Forth<T>) -> Result<(), Error>;

/// What a token resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Entry(EntryId),
    Literal(Cell),
}

trait ReplaceErr {
    type OK;
    fn replace_err<NE>(self, t: NE) -> Result<Self::OK, NE>;
}

impl<T, OE> ReplaceErr for Result<T, OE> {
    type OK = T;
    #[inline]
    fn replace_err<NE>(self, e: NE) -> Result<Self::OK, NE> {
        match self {
            Ok(t) => Ok(t),
            Err(_e) => Err(e),
        }
    }
}

#[cfg(test)]
pub mod test {
    use crate::{stack::StackError, Error, Forth, ForthParams};

    #[derive(Default)]
    struct TestContext {
        contents: Vec<i32>,
    }

    #[test]
    fn forth() {
        let mut forth = Forth::new(
            ForthParams::default(),
            TestContext::default(),
            Forth::<TestContext>::FULL_BUILTINS,
        )
        .unwrap();
        let lines = &[
            ("2 3 + .", "5"),
            (": yay 2 3 + . ;", ""),
            ("yay yay yay", "5 5 5"),
            (": boop yay yay ;", ""),
            ("boop", "5 5"),
            ("42 emit", "*"),
            (": star 42 emit ;", ""),
            ("star star star", "***"),
            (": sq dup * ;", ""),
            ("7 sq .", "49"),
            ("123 constant x", ""),
            ("x .", "123"),
            ("4 x + .", "127"),
            ("variable y", ""),
            ("y @ .", "0"),
            ("10 y !", ""),
            ("y @ .", "10"),
            ("1 . .cr 2 .", "1\n2"),
        ];

        for (line, out) in lines {
            println!("{}", line);
            forth.input.fill(line).unwrap();
            forth.process_line().unwrap();
            println!(" => {}", forth.output.as_str());
            assert_eq!(forth.output.as_str(), *out);
            forth.output.clear();
        }

        forth.input.fill(": derp boop yay").unwrap();
        assert!(matches!(
            forth.process_line(),
            Err(Error::UnterminatedDefinition(_))
        ));
        assert!(!forth.is_compiling());

        forth.input.fill(": doot yay yaay ;").unwrap();
        assert_eq!(
            forth.process_line(),
            Err(Error::UnknownWord("yaay".into()))
        );
        assert!(!forth.is_compiling());

        forth.output.clear();
        forth.input.fill("boop yay").unwrap();
        forth.process_line().unwrap();
        assert_eq!(forth.output.as_str(), "5 5 5");
        forth.output.clear();

        forth.input.fill("derp").unwrap();
        assert_eq!(forth.process_line(), Err(Error::UnknownWord("derp".into())));
        forth.output.clear();

        assert!(forth.data_stack.is_empty());

        // Takes one value off the stack, and stores it in the vec
        fn squirrel(forth: &mut Forth<TestContext>) -> Result<(), crate::Error> {
            let val = forth.data_stack.try_pop()?;
            forth.host_ctxt.contents.push(val);
            Ok(())
        }
        forth.add_builtin("squirrel", squirrel).unwrap();

        let lines = &[
            ("5 6 squirrel squirrel", ""),
            (": sq3 1 squirrel 2 squirrel 3 squirrel ;", ""),
            ("sq3 sq3", ""),
        ];

        for (line, out) in lines {
            println!("{}", line);
            forth.input.fill(line).unwrap();
            forth.process_line().unwrap();
            assert_eq!(forth.output.as_str(), *out);
            forth.output.clear();
        }

        forth.input.fill("squirrel").unwrap();
        assert_eq!(
            forth.process_line(),
            Err(Error::Stack(StackError::Underflow { required: 1 }))
        );

        let context = forth.release();
        assert_eq!(&context.contents, &[6, 5, 1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn messages() {
        use crate::{fastr::FaStr, memory::MemoryError};

        let cases: &[(Error, &str)] = &[
            (
                Error::Stack(StackError::Underflow { required: 1 }),
                "requires 1 item",
            ),
            (
                Error::Stack(StackError::Underflow { required: 2 }),
                "requires 2 items",
            ),
            (
                Error::Memory(MemoryError::InvalidStoreAddress(-1)),
                "invalid store address",
            ),
            (
                Error::Memory(MemoryError::InvalidFetchAddress(-5)),
                "invalid fetch address",
            ),
            (Error::DivisionByZero, "Error: division by zero"),
            (Error::UnknownWord("FOO".into()), "Unknown word: FOO"),
            (
                Error::UnterminatedDefinition(FaStr::new("x").unwrap()),
                "Error: unterminated definition of X",
            ),
            (
                Error::CompileOnly(";"),
                "Error: ; is only valid inside a definition",
            ),
        ];
        for (err, msg) in cases {
            assert_eq!(err.to_string(), *msg);
        }
    }
}
