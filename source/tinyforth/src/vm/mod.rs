use tracing::{debug, trace};

use crate::{
    cell::parse_cell,
    dictionary::{BuiltinEntry, Code, Dictionary, DictionaryError, EntryId, EntryKind},
    fastr::FaStr,
    input::WordStrBuf,
    memory::Memory,
    output::OutputBuf,
    params::ForthParams,
    stack::Stack,
    Cell, Error, Lookup, Mode, ReplaceErr, WordFunc,
};

pub mod builtins;

/// A colon definition being executed: the next cell to run, and one past
/// the last cell of its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frame {
    ip: u16,
    end: u16,
}

/// Forth is the "context" of the VM/interpreter.
///
/// It owns every piece of interpreter state, so any number of independent
/// VMs can coexist. `T` is a host context, available to host builtins
/// registered with [`Forth::add_builtin`].
pub struct Forth<T: 'static> {
    mode: Mode,
    pub data_stack: Stack<Cell>,
    pub(crate) call_stack: Stack<Frame>,
    pub memory: Memory,
    pub(crate) dict: Dictionary<T>,
    pub input: WordStrBuf,
    pub output: OutputBuf,
    pub host_ctxt: T,
}

impl<T: 'static> Forth<T> {
    /// Creates a VM with the given capacities.
    ///
    /// `builtins` are added to the dictionary first, in order, followed by
    /// the constants in [`Forth::SEED_CONSTANTS`].
    pub fn new(
        params: ForthParams,
        host_ctxt: T,
        builtins: &'static [BuiltinEntry<T>],
    ) -> Result<Self, Error> {
        let mut dict = Dictionary::new(params.dict_entries, params.code_cells);
        for bi in builtins {
            dict.push(bi.name, EntryKind::Primitive(bi.func))?;
        }
        for (name, val) in Self::SEED_CONSTANTS {
            dict.push(*name, EntryKind::Constant(*val))?;
        }
        debug!(entries = dict.len(), "dictionary seeded");

        Ok(Self {
            mode: Mode::Run,
            data_stack: Stack::new(params.data_stack_elems),
            call_stack: Stack::new(params.call_stack_elems),
            memory: Memory::new(params.memory_cells, params.variable_base),
            dict,
            input: WordStrBuf::new(params.input_buf_elems),
            output: OutputBuf::new(params.output_buf_elems),
            host_ctxt,
        })
    }

    /// Adds a native word. Like any other definition, it shadows existing
    /// words with the same name.
    pub fn add_builtin(&mut self, name: &str, bi: WordFunc<T>) -> Result<(), Error> {
        let name = FaStr::new(name).ok_or(Error::NameTooLong)?;
        self.dict.push(name, EntryKind::Primitive(bi))?;
        Ok(())
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn is_compiling(&self) -> bool {
        matches!(self.mode, Mode::Compile { .. })
    }

    pub fn dictionary(&self) -> &Dictionary<T> {
        &self.dict
    }

    /// Resolves a token: the newest dictionary entry with that name, or
    /// failing that, a number.
    pub fn lookup(&self, word: &str) -> Result<Lookup, Error> {
        if let Some(id) = FaStr::new(word).and_then(|name| self.dict.find(&name)) {
            return Ok(Lookup::Entry(id));
        }
        if let Some(val) = parse_cell(word) {
            return Ok(Lookup::Literal(val));
        }
        Err(Error::UnknownWord(word.into()))
    }

    /// Runs every word in the input buffer.
    ///
    /// Stops at the first error. The data stack and memory keep whatever
    /// state the line had reached, but the rest of the line is discarded,
    /// and a definition in progress is abandoned. A definition still open
    /// at the end of the line is abandoned too.
    pub fn process_line(&mut self) -> Result<(), Error> {
        let res = self.process_words().and_then(|()| match self.mode {
            Mode::Compile { name, .. } => Err(Error::UnterminatedDefinition(name)),
            Mode::Run => Ok(()),
        });
        if let Err(e) = &res {
            debug!(error = %e, "line aborted");
            self.call_stack.clear();
            self.input.clear();
            self.abort_pending();
        }
        res
    }

    fn process_words(&mut self) -> Result<(), Error> {
        loop {
            self.input.advance();
            let word = match self.input.cur_word() {
                Some(w) => w,
                None => return Ok(()),
            };
            trace!(word, compiling = self.is_compiling(), "token");

            if self.is_compiling() {
                match word {
                    ";" => {
                        self.finish_colon()?;
                        continue;
                    }
                    ":" => return Err(Error::NestedDefinition),
                    _ => {}
                }
            }

            match (self.lookup(word)?, self.mode) {
                (Lookup::Entry(id), Mode::Run) => self.execute(id)?,
                (Lookup::Literal(val), Mode::Run) => self.data_stack.push(val)?,
                (Lookup::Entry(id), Mode::Compile { .. }) => self.dict.push_code(Code::Call(id))?,
                (Lookup::Literal(val), Mode::Compile { .. }) => {
                    self.dict.push_code(Code::Literal(val))?
                }
            }
        }
    }

    fn entry_kind(&self, id: EntryId) -> Result<EntryKind<T>, Error> {
        self.dict
            .kind(id)
            .ok_or(Error::Dictionary(DictionaryError::InvalidEntry))
    }

    /// Runs a single dictionary entry to completion.
    pub fn execute(&mut self, id: EntryId) -> Result<(), Error> {
        match self.entry_kind(id)? {
            EntryKind::Primitive(func) => func(self),
            EntryKind::Constant(val) | EntryKind::Variable(val) => {
                self.data_stack.push(val)?;
                Ok(())
            }
            EntryKind::Colon { start, len } => self.run_colon(start, len),
        }
    }

    fn push_frame(&mut self, start: u16, len: u16) -> Result<(), Error> {
        self.call_stack
            .push(Frame {
                ip: start,
                end: start + len,
            })
            .replace_err(Error::CallStackOverflow)
    }

    /// Runs a colon definition body. Nested colon definitions get a frame on
    /// the call stack instead of a native call, so the nesting depth is
    /// bounded by `call_stack_elems`.
    fn run_colon(&mut self, start: u16, len: u16) -> Result<(), Error> {
        let base = self.call_stack.depth();
        self.push_frame(start, len)?;

        while self.call_stack.depth() > base {
            let ip = match self.call_stack.peek_mut() {
                Some(frame) if frame.ip < frame.end => {
                    frame.ip += 1;
                    frame.ip - 1
                }
                _ => {
                    let _ = self.call_stack.pop();
                    continue;
                }
            };
            let code = self
                .dict
                .code_at(ip)
                .ok_or(Error::Dictionary(DictionaryError::InvalidEntry))?;

            match code {
                Code::Literal(val) => self.data_stack.push(val)?,
                Code::Call(id) => match self.entry_kind(id)? {
                    EntryKind::Colon { start, len } => self.push_frame(start, len)?,
                    EntryKind::Primitive(func) => func(self)?,
                    EntryKind::Constant(val) | EntryKind::Variable(val) => {
                        self.data_stack.push(val)?
                    }
                },
            }
        }
        Ok(())
    }

    /// Take the next token off of the input buffer as the name of a new
    /// definition. `word` is the defining word asking, for the error message.
    fn munch_name(&mut self, word: &'static str) -> Result<FaStr, Error> {
        self.input.advance();
        let name = self.input.cur_word().ok_or(Error::MissingName(word))?;
        FaStr::new(name).ok_or(Error::NameTooLong)
    }

    fn start_colon(&mut self, name: FaStr) {
        debug!(%name, "compiling");
        self.mode = Mode::Compile {
            name,
            start: self.dict.here(),
        };
    }

    fn finish_colon(&mut self) -> Result<(), Error> {
        let (name, start) = match self.mode {
            Mode::Compile { name, start } => (name, start),
            Mode::Run => return Err(Error::CompileOnly(";")),
        };
        let len = self.dict.here() - start;
        self.dict.push(name, EntryKind::Colon { start, len })?;
        self.mode = Mode::Run;
        debug!(%name, len, "defined");
        Ok(())
    }

    /// Drops a definition in progress, along with any code compiled for it.
    fn abort_pending(&mut self) {
        if let Mode::Compile { name, start } = core::mem::replace(&mut self.mode, Mode::Run) {
            self.dict.truncate_code(start);
            debug!(%name, "definition abandoned");
        }
    }

    pub fn release(self) -> T {
        self.host_ctxt
    }
}

#[cfg(test)]
pub mod test {
    use crate::{
        dictionary::{Code, DictionaryError, EntryKind},
        fastr::FaStr,
        stack::StackError,
        Error, Forth, ForthParams, Lookup,
    };

    fn forth() -> Forth<()> {
        Forth::new(ForthParams::default(), (), Forth::FULL_BUILTINS).unwrap()
    }

    fn run(forth: &mut Forth<()>, line: &str) -> Result<(), Error> {
        forth.output.clear();
        forth.input.fill(line).unwrap();
        forth.process_line()
    }

    fn stack(forth: &Forth<()>) -> Vec<i32> {
        forth.data_stack.iter().copied().collect()
    }

    #[test]
    fn lookup() {
        let forth = forth();
        assert!(matches!(forth.lookup("dup"), Ok(Lookup::Entry(_))));
        assert_eq!(forth.lookup("dup"), forth.lookup("DuP"));
        assert_eq!(forth.lookup("-17"), Ok(Lookup::Literal(-17)));
        assert_eq!(
            forth.lookup("dupe"),
            Err(Error::UnknownWord("dupe".into()))
        );
        // Too long to be a name, but still a number
        assert_eq!(
            forth.lookup("00000000000000000000000000000000042"),
            Ok(Lookup::Literal(42))
        );
    }

    #[test]
    fn seeded() {
        let mut forth = forth();
        run(&mut forth, "CELL TRUE FALSE").unwrap();
        assert_eq!(stack(&forth), [4, -1, 0]);
    }

    #[test]
    fn early_binding() {
        let mut forth = forth();
        run(&mut forth, ": A 1 ; : B A A + ;").unwrap();
        run(&mut forth, ": A 100 ;").unwrap();
        run(&mut forth, "B A").unwrap();
        assert_eq!(stack(&forth), [2, 100]);

        // A definition that uses its own name gets the previous definition
        run(&mut forth, ": A A 1 + ; A").unwrap();
        assert_eq!(stack(&forth), [2, 100, 101]);

        // `B` still calls the first `A`
        let dict = forth.dictionary();
        let b = dict.find(&FaStr::new("B").unwrap()).unwrap();
        let first_a = dict.entries().position(|de| de.name.as_str() == "A").unwrap();
        match dict.body(b) {
            Some([Code::Call(x), Code::Call(y), Code::Call(_)]) => {
                assert_eq!(x.index(), first_a);
                assert_eq!(y.index(), first_a);
            }
            other => panic!("unexpected body {other:?}"),
        }
        assert_eq!(dict.entries().filter(|de| de.name.as_str() == "A").count(), 3);
    }

    #[test]
    fn abandoned_definitions() {
        let mut forth = forth();
        let used = forth.dictionary().code_used();
        let entries = forth.dictionary().len();

        assert_eq!(
            run(&mut forth, ": X 1 2"),
            Err(Error::UnterminatedDefinition(FaStr::new("X").unwrap()))
        );
        assert!(!forth.is_compiling());
        assert_eq!(forth.dictionary().code_used(), used);
        assert_eq!(forth.dictionary().len(), entries);

        assert_eq!(run(&mut forth, ": Y 1 : Z ;"), Err(Error::NestedDefinition));
        assert_eq!(run(&mut forth, ": Y 1 NOPE ;"), Err(Error::UnknownWord("NOPE".into())));
        assert_eq!(forth.dictionary().code_used(), used);
        assert_eq!(run(&mut forth, "X"), Err(Error::UnknownWord("X".into())));

        // The rest of an aborted line is dropped
        assert_eq!(run(&mut forth, "1 2 FOO 3"), Err(Error::UnknownWord("FOO".into())));
        assert_eq!(stack(&forth), [1, 2]);
        assert_eq!(forth.input.remaining(), "");

        run(&mut forth, ": W 7 ; W").unwrap();
        assert_eq!(stack(&forth), [1, 2, 7]);
    }

    #[test]
    fn call_stack_depth() {
        let params = ForthParams {
            call_stack_elems: 3,
            ..ForthParams::default()
        };
        let mut forth = Forth::<()>::new(params, (), Forth::FULL_BUILTINS).unwrap();
        run(&mut forth, ": A 1 ; : B A ; : C B ; : D C ;").unwrap();
        run(&mut forth, "C").unwrap();
        assert_eq!(stack(&forth), [1]);
        assert_eq!(run(&mut forth, "D"), Err(Error::CallStackOverflow));
        assert!(forth.call_stack.is_empty());
        run(&mut forth, "C").unwrap();
        assert_eq!(stack(&forth), [1, 1]);
    }

    #[test]
    fn capacities() {
        let params = ForthParams {
            data_stack_elems: 2,
            dict_entries: Forth::<()>::FULL_BUILTINS.len() + Forth::<()>::SEED_CONSTANTS.len() + 1,
            code_cells: 4,
            ..ForthParams::default()
        };
        let mut forth = Forth::<()>::new(params, (), Forth::FULL_BUILTINS).unwrap();

        assert_eq!(
            run(&mut forth, "1 2 3"),
            Err(Error::Stack(StackError::Overflow))
        );
        assert_eq!(stack(&forth), [1, 2]);
        run(&mut forth, "2DROP").unwrap();

        assert_eq!(
            run(&mut forth, ": X 1 2 3 4 5 ;"),
            Err(Error::Dictionary(DictionaryError::CodeSpaceFull))
        );
        assert_eq!(forth.dictionary().code_used(), 0);
        run(&mut forth, ": X 1 ;").unwrap();
        assert_eq!(
            run(&mut forth, ": Y 2 ;"),
            Err(Error::Dictionary(DictionaryError::Full))
        );
        assert_eq!(forth.dictionary().code_used(), 1);
        assert!(matches!(
            forth.dictionary().kind(forth.dictionary().find(&FaStr::new("X").unwrap()).unwrap()),
            Some(EntryKind::Colon { start: 0, len: 1 })
        ));
    }
}
