//! Matching a single token against an option template.
//!
//! Templates take one of these shapes:
//!
//! - `name`: matches `name` exactly
//! - `name=`: matches any token starting with `name=`
//! - `name=%conv`: as above, the text after `=` is the value
//! - `name %conv`: matches `name` followed by the value, either attached
//!   (`-p123`) or as the next token (`-p 123`)
//!
//! The separator is the first `=` in the template, or failing that the first
//! space. It only counts when what follows it is empty or a `%` conversion,
//! so a template like `foo bar` matches the token `foo bar` literally.

/// Position of the template's value separator, if it has a valid one.
pub fn separator(templ: &str) -> Option<usize> {
    let sep = templ.find('=').or_else(|| templ.find(' '))?;
    let rest = &templ[sep + 1..];
    (rest.is_empty() || rest.starts_with('%')).then_some(sep)
}

/// Match `arg` against `templ`.
///
/// Returns `None` when they don't match. On a match returns the separator
/// index, which is `0` when the template has no value part.
pub fn match_template(templ: &str, arg: &str) -> Option<usize> {
    if let Some(sep) = separator(templ) {
        let stem_len = if templ.as_bytes()[sep] == b'=' { sep + 1 } else { sep };
        if arg.as_bytes().starts_with(&templ.as_bytes()[..stem_len]) {
            return Some(sep);
        }
    }
    (templ == arg).then_some(0)
}

/// Whether the template's separator at `sep` is a space, meaning the value
/// may arrive as the following token.
pub fn is_spaced(templ: &str, sep: usize) -> bool {
    sep > 0 && templ.as_bytes().get(sep) == Some(&b' ')
}

/// The conversion directive after the separator, e.g. `%u` for `uid=%u`.
/// `None` when the template carries no conversion.
pub fn conversion(templ: &str, sep: usize) -> Option<&str> {
    if sep == 0 {
        return None;
    }
    templ.get(sep + 1..).filter(|rest| !rest.is_empty())
}

/// The value part of a token that matched at separator `sep`.
pub fn value_part<'a>(templ: &str, sep: usize, arg: &'a str) -> &'a str {
    let start = if templ.as_bytes().get(sep) == Some(&b'=') { sep + 1 } else { sep };
    arg.get(start..).unwrap_or("")
}
