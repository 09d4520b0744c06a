//! Token processing and the parse driver.

use crate::args::{try_dup, Args};
use crate::escape::{add_opt_escaped, split_group};
use crate::table::{Dest, Key, OptSpec, OptTable};
use crate::template::{conversion, is_spaced, value_part};
use crate::value::{ConvError, Conversion, Value};
use std::collections::TryReserveError;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("memory allocation failed")]
    Alloc(#[from] TryReserveError),

    #[error("missing argument after `{0}'")]
    MissingArgument(String),

    #[error("invalid parameter in option `{token}'")]
    InvalidConversion {
        token: String,
        #[source]
        source: ConvError,
    },

    #[error("unsupported conversion in template `{0}'")]
    BadTemplate(String),

    #[error("option group `{0}' does not decode to valid UTF-8")]
    InvalidUtf8(String),

    #[error("insert position {pos} is past the end of {len} arguments")]
    InvalidPosition { pos: usize, len: usize },

    #[error(transparent)]
    Callback(anyhow::Error),
}

/// What the callback wants done with a token it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Re-emit the token: raw into the output vector, or into the `-o`
    /// string for fields of an option group.
    Keep,
    /// Drop the token.
    Discard,
}

/// Callback result. An error aborts the parse.
pub type ProcResult = anyhow::Result<Disposition>;

/// Callback for keyed rows, unmatched options and positional arguments.
///
/// Receives the caller data, the token, its key and the output vector
/// (which it may append to directly).
pub type OptProc<'p, D> = dyn FnMut(&mut D, &str, Key, &mut Args<'static>) -> ProcResult + 'p;

/// How a token was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gopt {
    Positional,
    Flag,
    /// One field of an `-o` group.
    Option,
}

/// Parse `args` against `table`.
///
/// The first token is the program name and is passed through. Matched field
/// rows write into `data` and are consumed. Keyed rows, unmatched options and
/// positional arguments go to `proc`; without a callback they are kept.
/// Kept `-o` fields are gathered into one `-o` argument right after the
/// program name.
///
/// `args` is always consumed. On error nothing built during the call
/// survives.
pub fn parse<D>(
    args: Args<'_>,
    data: &mut D,
    table: &OptTable<D>,
    proc: Option<&mut OptProc<'_, D>>,
) -> Result<Args<'static>, ParseError> {
    if args.is_empty() {
        return Ok(Args::new());
    }

    let out = {
        let mut ctx = Context::new(args.as_slice(), data, table, proc);
        ctx.run()?
    };
    drop(args);
    Ok(out)
}

/// State of one parse call.
struct Context<'a, 'p, D> {
    table: &'a OptTable<D>,
    proc: Option<&'a mut OptProc<'p, D>>,
    data: &'a mut D,
    input: &'a [String],
    out: Args<'static>,
    /// Index of the token being processed.
    argctr: usize,
    /// Kept `-o` fields, comma-joined.
    opts: Option<String>,
    /// Output index of the first token after `--`.
    nonopt: Option<usize>,
}

impl<'a, 'p, D> Context<'a, 'p, D> {
    fn new(
        input: &'a [String],
        data: &'a mut D,
        table: &'a OptTable<D>,
        proc: Option<&'a mut OptProc<'p, D>>,
    ) -> Self {
        Self {
            table,
            proc,
            data,
            input,
            out: Args::new(),
            argctr: 0,
            opts: None,
            nonopt: None,
        }
    }

    fn run(&mut self) -> Result<Args<'static>, ParseError> {
        let input = self.input;
        if let Some(prog) = input.first() {
            self.out.add_arg(prog)?;
            self.argctr = 1;
        }
        while self.argctr < input.len() {
            self.process_one(&input[self.argctr])?;
            self.argctr += 1;
        }

        if let Some(opts) = self.opts.take() {
            self.out.insert_arg(1, "-o")?;
            self.out.insert_arg(2, &opts)?;
            if let Some(nonopt) = self.nonopt.as_mut() {
                *nonopt += 2;
            }
        }
        // A `--` with nothing after it is redundant.
        if self.nonopt == Some(self.out.len()) && self.out.last() == Some("--") {
            self.out.pop()?;
        }

        Ok(std::mem::take(&mut self.out))
    }

    /// Consume and return the token after the current one.
    fn next_arg(&mut self) -> Option<&'a str> {
        let input = self.input;
        if self.argctr + 1 < input.len() {
            self.argctr += 1;
            Some(&input[self.argctr])
        } else {
            None
        }
    }

    fn process_one(&mut self, arg: &'a str) -> Result<(), ParseError> {
        if self.nonopt.is_some() || !arg.starts_with('-') {
            debug!(arg, "positional argument");
            self.call_proc(arg, Key::NONOPT, Gopt::Positional)
        } else if let Some(attached) = arg.strip_prefix("-o") {
            let group = if !attached.is_empty() {
                attached
            } else {
                self.next_arg()
                    .ok_or_else(|| ParseError::MissingArgument(arg.to_string()))?
            };
            debug!(group, "option group");
            for field in split_group(group) {
                self.process_gopt(&field?, Gopt::Option)?;
            }
            Ok(())
        } else if arg == "--" {
            self.out.add_arg(arg)?;
            self.nonopt = Some(self.out.len());
            Ok(())
        } else {
            self.process_gopt(arg, Gopt::Flag)
        }
    }

    /// Apply every table row matching `arg`, in order.
    fn process_gopt(&mut self, arg: &str, kind: Gopt) -> Result<(), ParseError> {
        let table = self.table;
        let mut matches = table.matches(arg).peekable();
        if matches.peek().is_none() {
            debug!(arg, ?kind, "unmatched option");
            return self.call_proc(arg, Key::OPT, kind);
        }

        // The value token of a spaced template is taken at most once, and
        // every matching row sees the same merged token.
        let mut pending: Option<&'a str> = None;
        for (spec, sep) in matches {
            if is_spaced(spec.template(), sep) && arg.len() == sep {
                // Name and value arrive as two tokens: join them into the
                // attached form, e.g. `-p` `123` into `-p123`.
                let value = match pending {
                    Some(value) => value,
                    None => {
                        let next = self
                            .next_arg()
                            .ok_or_else(|| ParseError::MissingArgument(arg.to_string()))?;
                        *pending.insert(next)
                    }
                };
                let mut merged = String::new();
                merged.try_reserve_exact(sep + value.len())?;
                merged.push_str(&arg[..sep]);
                merged.push_str(value);
                self.process_opt(spec, sep, &merged, kind)?;
            } else {
                self.process_opt(spec, sep, arg, kind)?;
            }
        }
        Ok(())
    }

    fn process_opt(
        &mut self,
        spec: &OptSpec<D>,
        sep: usize,
        arg: &str,
        kind: Gopt,
    ) -> Result<(), ParseError> {
        match spec.dest() {
            Dest::Key(key) => self.call_proc(arg, *key, kind),
            Dest::Field { field, value } => {
                let templ = spec.template();
                let stored = match conversion(templ, sep) {
                    Some(directive) => {
                        let param = value_part(templ, sep, arg);
                        match Conversion::parse(directive) {
                            Some(Conversion::Str) => Value::Str(try_dup(param)?),
                            Some(conv) => conv.convert(param).map_err(|source| {
                                ParseError::InvalidConversion {
                                    token: arg.to_string(),
                                    source,
                                }
                            })?,
                            None => return Err(ParseError::BadTemplate(templ.to_string())),
                        }
                    }
                    None => Value::Int(*value),
                };
                debug!(template = templ, arg, value = %stored, "storing field");
                field
                    .set(self.data, stored)
                    .map_err(|source| ParseError::InvalidConversion {
                        token: arg.to_string(),
                        source,
                    })
            }
        }
    }

    /// Hand `arg` to the callback and re-emit it if kept.
    fn call_proc(&mut self, arg: &str, key: Key, kind: Gopt) -> Result<(), ParseError> {
        if key == Key::DISCARD {
            return Ok(());
        }
        if key != Key::KEEP {
            if let Some(proc) = self.proc.as_deref_mut() {
                let disposition =
                    proc(&mut *self.data, arg, key, &mut self.out).map_err(ParseError::Callback)?;
                if disposition == Disposition::Discard {
                    return Ok(());
                }
            }
        }
        match kind {
            Gopt::Option => add_opt_escaped(&mut self.opts, arg),
            Gopt::Flag | Gopt::Positional => self.out.add_arg(arg),
        }
    }
}
