use std::{
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use clap::Parser;
use miette::{Context, IntoDiagnostic};
use serde::Deserialize;
use tinyforth::{Forth, ForthParams, Repl, ReplSettings};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Targets, prelude::*};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// a TOML file with interpreter settings.
    ///
    /// the `[vm]` table sets capacities (`data_stack_elems`, `memory_cells`,
    /// ...) and the `[repl]` table sets the `banner`, `prompt` and `echo`.
    /// missing keys keep their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// echo input bytes back to stdout.
    ///
    /// a terminal or PTY usually echoes input itself, so this is off by
    /// default.
    #[arg(short, long)]
    echo: bool,

    /// a comma-separated list of `tracing` targets and levels to enable.
    ///
    /// for example, `tinyforth=debug` logs every definition and every aborted
    /// line, and `tinyforth=trace` logs each token as it runs. logs are
    /// written to stderr.
    ///
    /// see <https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/targets/struct.Targets.html#filtering-with-targets>
    /// for more details on this syntax.
    #[arg(
        short,
        long = "trace",
        env = "TFREPL_TRACE",
        default_value_t = Targets::new().with_default(LevelFilter::OFF),
    )]
    trace_filter: Targets,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    #[serde(default)]
    vm: ForthParams,
    #[serde(default)]
    repl: ReplSettings,
}

impl Config {
    fn from_toml(s: &str) -> miette::Result<Self> {
        toml::from_str(s).into_diagnostic()
    }

    fn load(path: &Path) -> miette::Result<Self> {
        let text = std::fs::read_to_string(path)
            .into_diagnostic()
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config file {}", path.display()))
    }
}

fn main() -> miette::Result<()> {
    let Args {
        config,
        echo,
        trace_filter,
    } = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .without_time()
                .with_filter(trace_filter),
        )
        .init();

    let Config { vm, mut repl } = match config {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    repl.echo |= echo;
    tracing::debug!(?vm, ?repl, "starting");

    let forth = Forth::new(vm, (), Forth::FULL_BUILTINS)
        .into_diagnostic()
        .context("failed to create the interpreter")?;
    let mut repl = Repl::new(forth, repl);
    run(&mut repl, io::stdin().lock(), io::stdout().lock())
}

/// Feeds `input` through the REPL until it closes, writing the REPL's
/// output after every chunk read.
fn run<T>(repl: &mut Repl<T>, mut input: impl Read, mut output: impl Write) -> miette::Result<()> {
    let mut out = Vec::new();
    repl.start(&mut out);
    flush(&mut output, &mut out)?;

    let mut buf = [0u8; 256];
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).into_diagnostic().context("failed to read input"),
        };
        for &byte in &buf[..n] {
            if let Some(Err(error)) = repl.push_byte(byte, &mut out) {
                tracing::debug!(%error, "line failed");
            }
        }
        flush(&mut output, &mut out)?;
    }

    // A last line without a newline still counts
    if let Some(Err(error)) = repl.finish(&mut out) {
        tracing::debug!(%error, "line failed");
    }
    flush(&mut output, &mut out)
}

fn flush(output: &mut impl Write, out: &mut Vec<u8>) -> miette::Result<()> {
    if out.is_empty() {
        return Ok(());
    }
    output
        .write_all(out)
        .and_then(|()| output.flush())
        .into_diagnostic()
        .context("failed to write output")?;
    out.clear();
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{run, Config};
    use tinyforth::{Forth, ForthParams, Repl, ReplSettings};

    fn session(config: Config, input: &[u8]) -> String {
        let forth = Forth::new(config.vm, (), Forth::FULL_BUILTINS).unwrap();
        let mut repl = Repl::new(forth, config.repl);
        let mut output = Vec::new();
        run(&mut repl, input, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn lines() {
        assert_eq!(
            session(Config::default(), b"2 3 + .\n: sq dup * ;\n7 sq .\nfoo\n"),
            "Simple Forth Interpreter\nok>\n\
             5\nok>\n\
             ok>\n\
             49\nok>\n\
             Unknown word: foo\nok>\n",
        );
        assert_eq!(session(Config::default(), b""), "Simple Forth Interpreter\nok>\n");
    }

    #[test]
    fn line_endings() {
        // CR LF makes one line, and a final line needs no terminator
        assert_eq!(
            session(Config::default(), b"1 .\r\n2 .\r\n\r\n3 ."),
            "Simple Forth Interpreter\nok>\n1\nok>\n2\nok>\nok>\n3\nok>\n",
        );
    }

    #[test]
    fn rejected_bytes() {
        assert_eq!(
            session(Config::default(), b"caf\xc3\xa9 .\n1 .\n"),
            "Simple Forth Interpreter\nok>\n\
             Error: input is not ASCII\nok>\n\
             1\nok>\n",
        );
    }

    #[test]
    fn config() {
        let config = Config::from_toml(
            r#"
            [vm]
            data_stack_elems = 2

            [repl]
            prompt = "ready"
            echo = true
            "#,
        )
        .unwrap();
        assert_eq!(config.vm.data_stack_elems, 2);
        assert_eq!(config.vm.memory_cells, ForthParams::default().memory_cells);
        assert_eq!(config.repl.banner, ReplSettings::default().banner);
        assert_eq!(
            session(config, b"1 2 3\n"),
            "Simple Forth Interpreter\nready\n1 2 3\nError: stack overflow\nready\n",
        );

        assert!(Config::from_toml("[vm]\nstack_size = 3\n").is_err());
        assert!(Config::from_toml("[colors]\n").is_err());
        let empty = Config::from_toml("").unwrap();
        assert_eq!(empty.vm, ForthParams::default());
        assert_eq!(empty.repl, ReplSettings::default());
    }
}
