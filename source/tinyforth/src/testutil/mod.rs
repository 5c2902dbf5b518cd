//! # Test Utilities
//!
//! For now, mostly just helpers for running "ui tests", or executing forth code at
//! test time.
//!
//! ## UI Tests
//!
//! Generally, forth code provided as a str will have one of the following things
//! for each line:
//!
//! * Configuration values for the VM, specified as "frontmatter comments".
//!   These must appear before any other non-comment lines. Any field of
//!   [`ForthParams`] is accepted, e.g. `( data_stack_elems USIZE )`.
//! * Comment lines. These are any lines just containing a `( ... )` style forth comment.
//! * Successful input lines, starting with `> ...`.
//! * Successful output lines, starting with `< ...`.
//!     * Any successful input line can have zero or more output lines
//!     * If *no* output lines are specified, ANY successful output is accepted/ignored.
//! * Unsuccessful input lines, starting with `x ...`.
//!     * This line is expected to cause an "exception" - basically `process_line` returns
//!       an `Err()`.
//!     * Unsuccessful input lines may not have any successful output
//! * Expected error messages, starting with `! ...`, following an input line.
//!     * The input line is expected to fail, and the error to print as the given
//!       message.
//!
//! ### Example
//!
//! ```text
//! ( specify VM settings with frontmatter )
//! ( data_stack_elems 1 )
//!
//! ( specify input with no output )
//! > : star 42 emit ;
//!
//! ( specify input and output )
//! > star
//! < *
//!
//! ( specify lines that cause exceptions/errors )
//! x starb
//!
//! ( or the exact error )
//! > 1 2
//! ! Error: stack overflow
//! ```

use crate::{Error, Forth, ForthParams, Repl, ReplSettings};

/// Run the given forth ui test against the VM directly, and again through
/// a [`Repl`], checking the text a user would see.
///
/// A good default to use for unit tests.
pub fn all_runtest(contents: &str) {
    blocking_runtest(contents);
    repl_runtest(contents);
}

/// Run the given forth ui test against the default forth vm
///
/// Does accept any/all/none of the following configuration frontmatter (see above
/// for listing of frontmatter kinds)
pub fn blocking_runtest(contents: &str) {
    let tokd = tokenize(contents, true).unwrap();
    let mut forth = Forth::new(tokd.settings, (), Forth::FULL_BUILTINS).unwrap();
    blocking_steps_with(tokd.steps.as_slice(), &mut forth);
}

/// Run the given forth ui-test against the given forth vm.
///
/// Does not accept ui-tests with frontmatter configuration (will panic)
pub fn blocking_runtest_with<T>(forth: &mut Forth<T>, contents: &str) {
    let tokd = tokenize(contents, false).unwrap();
    blocking_steps_with(tokd.steps.as_slice(), forth);
}

/// Run the given forth ui test through a [`Repl`] with default settings,
/// comparing the text it writes.
pub fn repl_runtest(contents: &str) {
    let tokd = tokenize(contents, true).unwrap();
    let forth = Forth::new(tokd.settings, (), Forth::FULL_BUILTINS).unwrap();
    let mut repl = Repl::new(forth, ReplSettings::default());

    let mut out = Vec::new();
    repl.start(&mut out);
    assert_eq!(out, b"Simple Forth Interpreter\nok>\n");

    for Step { input, output: outcome } in tokd.steps.iter() {
        #[cfg(not(miri))]
        println!("> {input}");
        out.clear();
        let res = repl.process_line(input, &mut out);

        let text = std::str::from_utf8(&out).unwrap();
        let mut lines = text
            .strip_suffix("ok>\n")
            .expect("every line ends with a prompt")
            .lines()
            .collect::<Vec<&str>>();
        let printed = match &res {
            Err(e) => {
                assert_eq!(lines.pop(), Some(e.to_string().as_str()));
                String::new()
            }
            Ok(()) => lines.join("\n"),
        };
        check_output(res, outcome, &printed);
    }
}

fn check_output(res: Result<(), Error>, outcome: &Outcome, output: &str) {
    #[cfg(not(miri))]
    println!("< {output}");
    match (res, outcome) {
        (Ok(()), Outcome::OkAnyOutput) => {}
        (Ok(()), Outcome::OkWithOutput(exp)) => {
            let act_lines = output.lines().collect::<Vec<&str>>();
            assert_eq!(act_lines.len(), exp.len(), "output: {output:?}");
            act_lines.iter().zip(exp.iter()).for_each(|(a, e)| {
                assert_eq!(a.trim_end(), e.trim_end());
            })
        }
        (Err(_e), Outcome::FatalError) => {}
        (Err(e), Outcome::ErrorMessage(msg)) => {
            assert_eq!(e.to_string(), *msg);
        }
        (res, exp) => {
            eprintln!("Error!");
            eprintln!("Expected: {exp:?}");
            eprintln!("Got: {res:?}");
            if res.is_ok() {
                eprintln!("Output:\n{}", output);
            }
            panic!();
        }
    }
}

// Runs the given steps against the given forth VM.
//
// Panics on any mismatch
fn blocking_steps_with<T>(steps: &[Step], forth: &mut Forth<T>) {
    for Step { input, output: outcome } in steps {
        #[cfg(not(miri))]
        println!("> {input}");
        forth.input.fill(input).unwrap();
        let res = forth.process_line();
        check_output(res, outcome, forth.output.as_str());
        forth.output.clear();
    }
}

#[derive(Debug)]
enum Outcome {
    OkAnyOutput,
    OkWithOutput(Vec<String>),
    FatalError,
    ErrorMessage(String),
}

#[derive(Debug)]
struct Step {
    input: String,
    output: Outcome,
}

#[derive(Default, Debug)]
struct Tokenized {
    settings: ForthParams,
    steps: Vec<Step>,
}

fn tokenize(contents: &str, allow_frontmatter: bool) -> Result<Tokenized, ()> {
    let mut output = Tokenized::default();
    let mut frontmatter_done = !allow_frontmatter;

    for line in contents.lines() {
        let (tok, remain) = if let Some(t) = line.trim_start().split_once(' ') {
            t
        } else {
            continue;
        };

        match tok {
            ">" => {
                frontmatter_done = true;
                output.steps.push(Step {
                    input: remain.to_string(),
                    output: Outcome::OkAnyOutput,
                });
            }
            "<" => {
                frontmatter_done = true;
                let cur_step = output.steps.last_mut().unwrap();
                let expected_out = remain.to_string();
                match &mut cur_step.output {
                    Outcome::OkAnyOutput => {
                        cur_step.output = Outcome::OkWithOutput(vec![expected_out]);
                    }
                    Outcome::OkWithOutput(o) => {
                        o.push(expected_out);
                    }
                    Outcome::FatalError | Outcome::ErrorMessage(_) => {
                        panic!("Fatal error can't set output")
                    }
                }
            }
            "x" => {
                frontmatter_done = true;
                output.steps.push(Step {
                    input: remain.to_string(),
                    output: Outcome::FatalError,
                });
            }
            "!" => {
                frontmatter_done = true;
                let cur_step = output.steps.last_mut().unwrap();
                match cur_step.output {
                    Outcome::OkAnyOutput | Outcome::FatalError => {
                        cur_step.output = Outcome::ErrorMessage(remain.to_string());
                    }
                    _ => panic!("Error message must directly follow its input line"),
                }
            }
            "(" => {
                let mut split = remain.split_whitespace();
                let key = split.next().unwrap();
                let field = match key {
                    "data_stack_elems" => &mut output.settings.data_stack_elems,
                    "call_stack_elems" => &mut output.settings.call_stack_elems,
                    "input_buf_elems" => &mut output.settings.input_buf_elems,
                    "output_buf_elems" => &mut output.settings.output_buf_elems,
                    "dict_entries" => &mut output.settings.dict_entries,
                    "code_cells" => &mut output.settings.code_cells,
                    "memory_cells" => &mut output.settings.memory_cells,
                    "variable_base" => &mut output.settings.variable_base,
                    _ => continue,
                };
                *field = split.next().unwrap().parse::<usize>().unwrap();
                assert!(!frontmatter_done, "Unexpected frontmatter settings!");
                assert_eq!(Some(")"), split.next());
            }
            _ => {}
        }
    }

    Ok(output)
}
