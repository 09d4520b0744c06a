//! Option specification tables.
//!
//! A table is an ordered list of [`OptSpec`] rows. Each row pairs a template
//! (see [`crate::template`]) with a destination: either a [`Key`] handed to
//! the parse callback, or a typed [`Field`] in the caller's data.
//!
//! Tables are built once, up front, either with the builder methods on
//! [`OptTable`] or as a data literal through `OptTable::from(vec![...])`.
//! They are read-only while parsing and can be shared between threads.

use crate::template::match_template;
use crate::value::{ConvError, FromValue, Value};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Symbolic key passed to the parse callback.
///
/// Non-negative keys belong to the table. The negative values are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(pub i32);

impl Key {
    /// An unmatched flag or `-o` option.
    pub const OPT: Key = Key(-1);
    /// A positional argument.
    pub const NONOPT: Key = Key(-2);
    /// Skip the callback and keep the token.
    pub const KEEP: Key = Key(-3);
    /// Skip the callback and drop the token.
    pub const DISCARD: Key = Key(-4);

    pub fn is_reserved(self) -> bool {
        self.0 < 0
    }
}

type Setter<D> = dyn Fn(&mut D, Value) -> Result<(), ConvError> + Send + Sync;

/// Typed write access to one field of the caller's data.
pub struct Field<D> {
    set: Arc<Setter<D>>,
}

impl<D: 'static> Field<D> {
    /// A field reached through a projection such as `|m: &mut Mount| &mut m.uid`.
    pub fn of<T: FromValue + 'static>(access: fn(&mut D) -> &mut T) -> Self {
        Self::setter(move |data, value| {
            *access(data) = T::from_value(value)?;
            Ok(())
        })
    }

    /// A field with an arbitrary store function.
    pub fn setter<F>(set: F) -> Self
    where
        F: Fn(&mut D, Value) -> Result<(), ConvError> + Send + Sync + 'static,
    {
        Self { set: Arc::new(set) }
    }
}

impl<D> Field<D> {
    pub fn set(&self, data: &mut D, value: Value) -> Result<(), ConvError> {
        (self.set)(data, value)
    }
}

impl<D> Clone for Field<D> {
    fn clone(&self) -> Self {
        Self {
            set: Arc::clone(&self.set),
        }
    }
}

impl<D> fmt::Debug for Field<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Field")
    }
}

/// Where a matched token goes.
#[derive(Debug)]
pub enum Dest<D> {
    /// Hand the token to the callback under this key.
    Key(Key),
    /// Store into a field. Without a value part, `value` is stored.
    Field { field: Field<D>, value: i64 },
}

/// One row of an option table.
#[derive(Debug)]
pub struct OptSpec<D> {
    templ: Cow<'static, str>,
    dest: Dest<D>,
}

impl<D> OptSpec<D> {
    pub fn key(templ: impl Into<Cow<'static, str>>, key: Key) -> Self {
        Self {
            templ: templ.into(),
            dest: Dest::Key(key),
        }
    }

    pub fn field(templ: impl Into<Cow<'static, str>>, field: Field<D>) -> Self {
        Self::value(templ, field, 0)
    }

    pub fn value(templ: impl Into<Cow<'static, str>>, field: Field<D>, value: i64) -> Self {
        Self {
            templ: templ.into(),
            dest: Dest::Field { field, value },
        }
    }

    pub fn template(&self) -> &str {
        &self.templ
    }

    pub fn dest(&self) -> &Dest<D> {
        &self.dest
    }
}

/// An ordered option table.
#[derive(Debug)]
pub struct OptTable<D> {
    specs: Vec<OptSpec<D>>,
    next_key: i32,
}

impl<D> Default for OptTable<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> OptTable<D> {
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            next_key: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn specs(&self) -> &[OptSpec<D>] {
        &self.specs
    }

    pub fn push(&mut self, spec: OptSpec<D>) -> &mut Self {
        if let Dest::Key(key) = spec.dest {
            if !key.is_reserved() && key.0 >= self.next_key {
                self.next_key = key.0 + 1;
            }
        }
        self.specs.push(spec);
        self
    }

    /// Add a callback row under a freshly assigned key and return the key.
    pub fn key(&mut self, templ: impl Into<Cow<'static, str>>) -> Key {
        let key = Key(self.next_key);
        self.push(OptSpec::key(templ, key));
        key
    }

    /// Add a callback row under an existing key, e.g. `-h` next to `--help`.
    pub fn key_for(&mut self, templ: impl Into<Cow<'static, str>>, key: Key) -> &mut Self {
        self.push(OptSpec::key(templ, key))
    }

    /// Matching tokens are re-emitted without calling the callback.
    pub fn keep(&mut self, templ: impl Into<Cow<'static, str>>) -> &mut Self {
        self.push(OptSpec::key(templ, Key::KEEP))
    }

    /// Matching tokens are dropped without calling the callback.
    pub fn discard(&mut self, templ: impl Into<Cow<'static, str>>) -> &mut Self {
        self.push(OptSpec::key(templ, Key::DISCARD))
    }

    pub fn field(&mut self, templ: impl Into<Cow<'static, str>>, field: Field<D>) -> &mut Self {
        self.push(OptSpec::field(templ, field))
    }

    pub fn value(
        &mut self,
        templ: impl Into<Cow<'static, str>>,
        field: Field<D>,
        value: i64,
    ) -> &mut Self {
        self.push(OptSpec::value(templ, field, value))
    }

    /// Add the `[no]name` pair: `name` stores 1 and `noname` stores 0.
    /// The `[no]` prefix on `templ` is optional.
    pub fn toggle(&mut self, templ: &str, field: Field<D>) -> &mut Self {
        let name = templ.strip_prefix("[no]").unwrap_or(templ);
        self.push(OptSpec::value(name.to_string(), field.clone(), 1));
        self.push(OptSpec::value(format!("no{}", name), field, 0))
    }

    /// Every row matching `arg`, in table order, with its separator index.
    pub fn matches<'t, 'a>(&'t self, arg: &'a str) -> Lookup<'t, 'a, D> {
        Lookup {
            specs: self.specs.iter(),
            arg,
        }
    }

    /// The first row matching `arg`.
    pub fn find(&self, arg: &str) -> Option<(&OptSpec<D>, usize)> {
        self.matches(arg).next()
    }

    /// Whether any row matches `arg`.
    pub fn is_match(&self, arg: &str) -> bool {
        self.find(arg).is_some()
    }
}

impl<D> From<Vec<OptSpec<D>>> for OptTable<D> {
    fn from(specs: Vec<OptSpec<D>>) -> Self {
        let mut table = OptTable::new();
        for spec in specs {
            table.push(spec);
        }
        table
    }
}

/// Resumable lookup over a table. Each call to `next` continues scanning
/// after the previous match.
pub struct Lookup<'t, 'a, D> {
    specs: std::slice::Iter<'t, OptSpec<D>>,
    arg: &'a str,
}

impl<'t, 'a, D> Iterator for Lookup<'t, 'a, D> {
    type Item = (&'t OptSpec<D>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        for spec in self.specs.by_ref() {
            if let Some(sep) = match_template(spec.template(), self.arg) {
                trace!(template = spec.template(), arg = self.arg, sep, "template matched");
                return Some((spec, sep));
            }
        }
        None
    }
}
