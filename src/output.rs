//! Temporary file generation with shell export statements.
//!
//! Sourcing the generated file exports every recorded value and resets the
//! positional parameters (`$@`) to the rebuilt argument vector.

use crate::args::Args;
use crate::config::Matches;
use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Escape a string for safe use in a shell double-quoted context.
///
/// Escapes: $, `, \, ", and !
fn escape_shell_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '$' => escaped.push_str("\\$"),
            '`' => escaped.push_str("\\`"),
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '!' => escaped.push_str("\\!"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Quote a word for the shell with single quotes.
fn quote_word(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

/// Convert an option name to a valid shell variable name.
///
/// Converts to uppercase and replaces anything that is not alphanumeric
/// with underscores.
fn to_shell_var_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Generate a temporary file with the parse result.
///
/// Returns the path to the temporary file. The file will persist
/// until the process exits or it's manually deleted.
pub fn generate_output(matches: &Matches, argv: &Args, prefix: &str) -> Result<PathBuf> {
    let content = generate_output_string(matches, argv, prefix);
    write_temp_file(&content)
}

/// Generate the output content as a string (for testing).
///
/// The program name (first element of `argv`) is left out of `set --`.
pub fn generate_output_string(matches: &Matches, argv: &Args, prefix: &str) -> String {
    let mut output = String::new();

    // BTreeMap keeps the exports sorted
    for (name, value) in &matches.values {
        let var_name = format!("{}{}", prefix, to_shell_var_name(name));
        let escaped_value = escape_shell_value(&value.to_string());
        output.push_str(&format!("export {}=\"{}\"\n", var_name, escaped_value));
    }

    let positionals: Vec<String> = matches.positionals.iter().map(|p| quote_word(p)).collect();
    output.push_str(&format!(
        "export {}POSITIONALS=\"{}\"\n",
        prefix,
        escape_shell_value(&positionals.join(" "))
    ));

    let words: Vec<String> = argv.iter().skip(1).map(|a| quote_word(a)).collect();
    if words.is_empty() {
        output.push_str("set --\n");
    } else {
        output.push_str(&format!("set -- {}\n", words.join(" ")));
    }

    output
}

/// Generate an error output file.
///
/// When sourced, the file will print the error message to stderr and exit 1.
pub fn generate_error_output(message: &str) -> Result<PathBuf> {
    let content = generate_error_string(message);
    write_temp_file(&content)
}

/// Generate an error output as a string (for testing).
pub fn generate_error_string(message: &str) -> String {
    // Escape the message for safe use in double quotes
    let escaped = escape_shell_value(message);
    format!("echo \"gopt: {}\" >&2\nexit 1\n", escaped)
}

/// Write content to a temporary file and return its path.
fn write_temp_file(content: &str) -> Result<PathBuf> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    let path = file.into_temp_path().keep()?;
    Ok(path)
}
