//! Owned argument vectors.

use crate::parser::ParseError;
use std::borrow::Cow;

/// An ordered vector of argument strings.
///
/// A vector is either *owned* (its storage and every element belong to it)
/// or *borrowed* from the caller. A borrowed vector is never changed in
/// place: the first mutation copies it into freshly owned storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args<'a> {
    argv: Cow<'a, [String]>,
}

impl Args<'static> {
    /// An empty, owned vector.
    pub fn new() -> Self {
        Self {
            argv: Cow::Owned(Vec::new()),
        }
    }
}

impl<'a> Args<'a> {
    /// Wrap caller tokens without copying them.
    pub fn borrowed(argv: &'a [String]) -> Self {
        Self {
            argv: Cow::Borrowed(argv),
        }
    }

    /// Whether this vector owns its storage.
    pub fn is_owned(&self) -> bool {
        matches!(self.argv, Cow::Owned(_))
    }

    pub fn len(&self) -> usize {
        self.argv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.argv
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.argv.get(index).map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.argv.last().map(String::as_str)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.argv.iter()
    }

    /// Append an owned copy of `arg`.
    ///
    /// If an allocation fails the vector is left exactly as it was.
    pub fn add_arg(&mut self, arg: &str) -> Result<(), ParseError> {
        let copy = try_dup(arg)?;
        let argv = self.owned_mut(1)?;
        argv.try_reserve(1)?;
        argv.push(copy);
        Ok(())
    }

    /// Insert an owned copy of `arg` at `pos`, shifting later elements up.
    pub fn insert_arg(&mut self, pos: usize, arg: &str) -> Result<(), ParseError> {
        let len = self.len();
        if pos > len {
            return Err(ParseError::InvalidPosition { pos, len });
        }
        let copy = try_dup(arg)?;
        let argv = self.owned_mut(1)?;
        argv.try_reserve(1)?;
        argv.insert(pos, copy);
        Ok(())
    }

    /// Release every element and the storage. Safe to call repeatedly.
    pub fn free(&mut self) {
        self.argv = Cow::Owned(Vec::new());
    }

    pub(crate) fn pop(&mut self) -> Result<Option<String>, ParseError> {
        Ok(self.owned_mut(0)?.pop())
    }

    /// Detach from any borrowed storage.
    pub fn into_owned(self) -> Args<'static> {
        Args {
            argv: Cow::Owned(self.argv.into_owned()),
        }
    }

    pub fn into_vec(self) -> Vec<String> {
        self.argv.into_owned()
    }

    /// Owned storage with room for `extra` more elements, copying out of
    /// borrowed storage first if needed.
    fn owned_mut(&mut self, extra: usize) -> Result<&mut Vec<String>, ParseError> {
        if let Cow::Borrowed(argv) = self.argv {
            let mut copy = Vec::new();
            copy.try_reserve(argv.len() + extra)?;
            for arg in argv {
                copy.push(try_dup(arg)?);
            }
            self.argv = Cow::Owned(copy);
        }
        // Already owned here, so this never clones.
        Ok(self.argv.to_mut())
    }
}

impl From<Vec<String>> for Args<'static> {
    fn from(argv: Vec<String>) -> Self {
        Self {
            argv: Cow::Owned(argv),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for Args<'static> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from(iter.into_iter().map(Into::into).collect::<Vec<_>>())
    }
}

impl<'s, 'a> IntoIterator for &'s Args<'a> {
    type Item = &'s String;
    type IntoIter = std::slice::Iter<'s, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.argv.iter()
    }
}

/// Copy `s` into a new string, reporting allocation failure instead of
/// aborting.
pub(crate) fn try_dup(s: &str) -> Result<String, ParseError> {
    let mut copy = String::new();
    copy.try_reserve_exact(s.len())?;
    copy.push_str(s);
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_is_empty_and_owned() {
        let args = Args::new();
        assert!(args.is_empty());
        assert!(args.is_owned());
    }

    #[test]
    fn test_add_arg_appends() {
        let mut args = Args::new();
        args.add_arg("prog").unwrap();
        args.add_arg("-v").unwrap();
        assert_eq!(args.as_slice(), strings(&["prog", "-v"]).as_slice());
    }

    #[test]
    fn test_borrowed_copies_on_write() {
        let input = strings(&["prog", "a"]);
        let mut args = Args::borrowed(&input);
        assert!(!args.is_owned());

        args.add_arg("b").unwrap();
        assert!(args.is_owned());
        assert_eq!(args.as_slice(), strings(&["prog", "a", "b"]).as_slice());
        // The caller's tokens are untouched.
        assert_eq!(input, strings(&["prog", "a"]));
    }

    #[test]
    fn test_insert_into_borrowed_copies_on_write() {
        let input = strings(&["prog", "mnt"]);
        let mut args = Args::borrowed(&input);

        // A rejected position leaves the borrow in place.
        assert!(args.insert_arg(3, "x").is_err());
        assert!(!args.is_owned());

        args.insert_arg(1, "-o").unwrap();
        args.insert_arg(2, "ro").unwrap();
        assert!(args.is_owned());
        assert_eq!(args.as_slice(), strings(&["prog", "-o", "ro", "mnt"]).as_slice());
        assert_eq!(input, strings(&["prog", "mnt"]));
    }

    #[test]
    fn test_insert_arg_preserves_order() {
        let mut args: Args = ["prog", "x", "y"].into_iter().collect();
        args.insert_arg(1, "-o").unwrap();
        args.insert_arg(2, "ro").unwrap();
        args.insert_arg(5, "end").unwrap();
        assert_eq!(
            args.as_slice(),
            strings(&["prog", "-o", "ro", "x", "y", "end"]).as_slice()
        );
    }

    #[test]
    fn test_insert_arg_out_of_range() {
        let mut args: Args = ["prog"].into_iter().collect();
        let err = args.insert_arg(3, "x").unwrap_err();
        assert!(matches!(err, ParseError::InvalidPosition { pos: 3, len: 1 }));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_free_is_idempotent() {
        let mut args: Args = ["prog", "a"].into_iter().collect();
        args.free();
        assert!(args.is_empty());
        args.free();
        assert!(args.is_empty());
        assert!(args.is_owned());
    }

    #[test]
    fn test_pop_from_borrowed() {
        let input = strings(&["a", "--"]);
        let mut args = Args::borrowed(&input);
        assert_eq!(args.pop().unwrap(), Some("--".to_string()));
        assert_eq!(args.as_slice(), strings(&["a"]).as_slice());
        assert_eq!(input.len(), 2);
    }
}
