//! Splitting and re-joining `-o` option groups.
//!
//! In `-o ro,uid=1000,fsname=a\,b` the fields are separated by unescaped
//! commas. Inside a field, `\` followed by three octal digits (`\054`) stands
//! for that byte and `\` before any other character stands for the character
//! itself. When fields are joined back into an `-o` string only `,` and `\`
//! are escaped, never with octal.

use crate::parser::ParseError;

/// Split `group` into decoded fields.
///
/// A trailing comma yields a trailing empty field, and an empty group yields
/// one empty field.
pub fn split_group(group: &str) -> Fields<'_> {
    Fields {
        group,
        rest: Some(group),
    }
}

/// Iterator over the decoded fields of an `-o` group.
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    group: &'a str,
    rest: Option<&'a str>,
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<String, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.rest.take()?;
        let bytes = text.as_bytes();
        let mut field = Vec::new();
        if let Err(err) = field.try_reserve(text.len()) {
            return Some(Err(err.into()));
        }

        let mut i = 0;
        while let Some(&b) = bytes.get(i) {
            match b {
                b',' => {
                    self.rest = Some(&text[i + 1..]);
                    break;
                }
                b'\\' if i + 1 < bytes.len() => {
                    if let Some(byte) = octal(&bytes[i + 1..]) {
                        field.push(byte);
                        i += 4;
                    } else {
                        field.push(bytes[i + 1]);
                        i += 2;
                    }
                }
                _ => {
                    field.push(b);
                    i += 1;
                }
            }
        }

        let decoded = String::from_utf8(field);
        Some(decoded.map_err(|_| ParseError::InvalidUtf8(self.group.to_string())))
    }
}

/// Decode a `\ooo` escape body: first digit `0`-`3`, the others `0`-`7`.
fn octal(digits: &[u8]) -> Option<u8> {
    match digits {
        [a @ b'0'..=b'3', b @ b'0'..=b'7', c @ b'0'..=b'7', ..] => {
            Some(((a - b'0') << 6) | ((b - b'0') << 3) | (c - b'0'))
        }
        _ => None,
    }
}

/// Escape `,` and `\` in `opt` so it survives a later [`split_group`].
pub fn escape_opt(opt: &str) -> String {
    let mut escaped = String::with_capacity(opt.len());
    push_escaped(&mut escaped, opt);
    escaped
}

fn push_escaped(out: &mut String, opt: &str) {
    for c in opt.chars() {
        if c == ',' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Append `opt` verbatim to a comma-separated option string, creating the
/// string on first use.
pub fn add_opt(opts: &mut Option<String>, opt: &str) -> Result<(), ParseError> {
    add_opt_common(opts, opt, false)
}

/// Append `opt` with `,` and `\` escaped to a comma-separated option string,
/// creating the string on first use.
pub fn add_opt_escaped(opts: &mut Option<String>, opt: &str) -> Result<(), ParseError> {
    add_opt_common(opts, opt, true)
}

fn add_opt_common(opts: &mut Option<String>, opt: &str, esc: bool) -> Result<(), ParseError> {
    let needed = 1 + if esc { opt.len() * 2 } else { opt.len() };
    let push = |s: &mut String| {
        if esc {
            push_escaped(s, opt);
        } else {
            s.push_str(opt);
        }
    };

    match opts {
        Some(s) => {
            s.try_reserve(needed)?;
            s.push(',');
            push(s);
        }
        None => {
            let mut s = String::new();
            s.try_reserve(needed)?;
            push(&mut s);
            *opts = Some(s);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(group: &str) -> Vec<String> {
        split_group(group).collect::<Result<_, _>>().unwrap()
    }

    #[test]
    fn test_split_plain() {
        assert_eq!(fields("ro,uid=1000,allow_other"), vec!["ro", "uid=1000", "allow_other"]);
    }

    #[test]
    fn test_split_escaped_comma() {
        assert_eq!(fields(r"ro,uid=1\,5"), vec!["ro", "uid=1,5"]);
    }

    #[test]
    fn test_split_trailing_and_empty() {
        assert_eq!(fields("a,"), vec!["a", ""]);
        assert_eq!(fields(""), vec![""]);
        assert_eq!(fields(",,"), vec!["", "", ""]);
    }

    #[test]
    fn test_octal_escape() {
        assert_eq!(fields(r"a\054b"), vec!["a,b"]);
        assert_eq!(fields(r"\101\102"), vec!["AB"]);
        // First digit above 3 is not an octal escape.
        assert_eq!(fields(r"\477"), vec!["477"]);
        // Too few digits.
        assert_eq!(fields(r"\05"), vec!["05"]);
    }

    #[test]
    fn test_octal_escape_multibyte() {
        assert_eq!(fields(r"caf\303\251"), vec!["café"]);
    }

    #[test]
    fn test_octal_escape_invalid_utf8() {
        let result: Result<Vec<_>, _> = split_group(r"ok,\377").collect();
        assert!(matches!(result, Err(ParseError::InvalidUtf8(g)) if g == r"ok,\377"));
    }

    #[test]
    fn test_backslash_other() {
        assert_eq!(fields(r"a\\b"), vec![r"a\b"]);
        assert_eq!(fields(r"\x"), vec!["x"]);
        // A lone trailing backslash is kept.
        assert_eq!(fields(r"a\"), vec![r"a\"]);
    }

    #[test]
    fn test_escape_opt() {
        assert_eq!(escape_opt("a,b"), r"a\,b");
        assert_eq!(escape_opt(r"c:\x"), r"c:\\x");
        assert_eq!(escape_opt("plain"), "plain");
    }

    #[test]
    fn test_escape_never_emits_octal() {
        for text in ["054", "a,054", r"\054", "x\\,y"] {
            let decoded = fields(&escape_opt(text));
            assert_eq!(decoded, vec![text.to_string()]);
        }
    }

    #[test]
    fn test_add_opt_joins_with_commas() {
        let mut opts = None;
        add_opt(&mut opts, "ro").unwrap();
        add_opt(&mut opts, "a,b").unwrap();
        assert_eq!(opts.as_deref(), Some("ro,a,b"));
    }

    #[test]
    fn test_add_opt_escaped() {
        let mut opts = None;
        add_opt_escaped(&mut opts, "fsname=a,b").unwrap();
        add_opt_escaped(&mut opts, "rw").unwrap();
        assert_eq!(opts.as_deref(), Some(r"fsname=a\,b,rw"));
    }

    #[test]
    fn test_add_opt_keeps_empty_fields() {
        let mut opts = None;
        add_opt_escaped(&mut opts, "").unwrap();
        assert_eq!(opts.as_deref(), Some(""));
        add_opt_escaped(&mut opts, "a").unwrap();
        assert_eq!(opts.as_deref(), Some(",a"));
    }
}
