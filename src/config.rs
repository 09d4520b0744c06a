//! JSON option-set descriptions.
//!
//! A [`Config`] lists tagged option declarations. [`Config::compile`] turns
//! them into an [`OptTable`] plus the dispatch logic the parser calls for
//! keyed rows, unmatched options and positional arguments. Everything a
//! parse collects lands in [`Matches`].

use crate::args::Args;
use crate::parser::{parse, Disposition, ParseError, ProcResult};
use crate::table::{Field, Key, OptTable};
use crate::template::{conversion, separator};
use crate::value::{Conversion, Value};
use anyhow::anyhow;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Prefix for exported variables when the config sets none.
pub const DEFAULT_PREFIX: &str = "GOPT_";
/// Program name placed in front of the parsed arguments.
pub const DEFAULT_PROGRAM: &str = "gopt";

/// Errors that can occur during config parsing and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse JSON config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("option #{0} has an empty template")]
    EmptyTemplate(usize),

    #[error("template '{0}' has no name to store its value under")]
    EmptyName(String),

    #[error("template '{0}' needs a conversion such as %s or %u")]
    MissingConversion(String),

    #[error("template '{0}' has an unsupported conversion")]
    UnsupportedConversion(String),

    #[error("set template '{0}' stores a fixed value and cannot have a conversion")]
    ConversionOnSet(String),

    #[error("toggle template '{0}' must look like [no]name")]
    InvalidToggle(String),

    #[error("'error' policy cannot be used on flag '{0}'")]
    ErrorPolicyOnFlag(String),

    #[error("template '{0}' can never match: such tokens are always parsed as '--' or an -o group")]
    UnreachableTemplate(String),
}

/// What happens to a token once it has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Pass it on in the rebuilt arguments
    #[default]
    Keep,
    /// Drop it from the rebuilt arguments
    Discard,
    /// Fail the parse
    Error,
}

/// One option declaration, tagged by `kind`.
///
/// `name` is where results are stored. When omitted it is derived from the
/// template: the part before the separator, without leading dashes or a
/// `[no]` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OptionDecl {
    /// Counted under `name`; the token follows `policy`.
    Flag {
        template: String,
        name: Option<String>,
        #[serde(default)]
        policy: Policy,
    },
    /// Converted value part stored under `name` (e.g. `uid=%u`).
    Value {
        template: String,
        name: Option<String>,
    },
    /// Fixed `value` stored under `name` when the template matches.
    Set {
        template: String,
        name: Option<String>,
        value: i64,
    },
    /// `[no]name` pair storing 1 or 0.
    Toggle {
        template: String,
        name: Option<String>,
    },
    /// Passed on without being recorded.
    Keep { template: String },
    /// Dropped without being recorded.
    Discard { template: String },
}

impl OptionDecl {
    pub fn template(&self) -> &str {
        match self {
            OptionDecl::Flag { template, .. }
            | OptionDecl::Value { template, .. }
            | OptionDecl::Set { template, .. }
            | OptionDecl::Toggle { template, .. }
            | OptionDecl::Keep { template }
            | OptionDecl::Discard { template } => template,
        }
    }

    /// The storage name, explicit or derived from the template.
    pub fn name(&self) -> Option<String> {
        let explicit = match self {
            OptionDecl::Flag { name, .. }
            | OptionDecl::Value { name, .. }
            | OptionDecl::Set { name, .. }
            | OptionDecl::Toggle { name, .. } => name.as_deref(),
            OptionDecl::Keep { .. } | OptionDecl::Discard { .. } => return None,
        };
        Some(explicit.map_or_else(|| derive_name(self.template()), str::to_string))
    }
}

fn derive_name(templ: &str) -> String {
    let stem = separator(templ).map_or(templ, |sep| &templ[..sep]);
    let stem = stem.strip_prefix("[no]").unwrap_or(stem);
    stem.trim_start_matches('-').to_string()
}

/// Top-level option-set configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Program name put in front of the parsed arguments
    pub name: Option<String>,
    /// Environment variable prefix (default: "GOPT_")
    pub prefix: Option<String>,
    /// Option declarations, in table order
    #[serde(default)]
    pub options: Vec<OptionDecl>,
    /// What to do with positional arguments
    #[serde(default)]
    pub positional: Policy,
    /// What to do with options no declaration matches
    #[serde(default)]
    pub unmatched: Policy,
}

impl Config {
    /// Parse a JSON string into a Config.
    pub fn from_json(json: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Get the effective prefix (from config or default).
    pub fn effective_prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(DEFAULT_PREFIX)
    }

    /// Get the program name (from config or default).
    pub fn program_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_PROGRAM)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, decl) in self.options.iter().enumerate() {
            Self::validate_decl(index, decl)?;
        }
        Ok(())
    }

    fn validate_decl(index: usize, decl: &OptionDecl) -> Result<(), ConfigError> {
        let templ = decl.template();
        if templ.is_empty() {
            return Err(ConfigError::EmptyTemplate(index));
        }
        if templ == "--" || templ.starts_with("-o") {
            return Err(ConfigError::UnreachableTemplate(templ.to_string()));
        }
        if decl.name().is_some_and(|name| name.is_empty()) {
            return Err(ConfigError::EmptyName(templ.to_string()));
        }

        match decl {
            OptionDecl::Value { .. } => {
                let directive = separator(templ)
                    .and_then(|sep| conversion(templ, sep))
                    .ok_or_else(|| ConfigError::MissingConversion(templ.to_string()))?;
                if Conversion::parse(directive).is_none() {
                    return Err(ConfigError::UnsupportedConversion(templ.to_string()));
                }
            }
            OptionDecl::Set { .. } => {
                if separator(templ).and_then(|sep| conversion(templ, sep)).is_some() {
                    return Err(ConfigError::ConversionOnSet(templ.to_string()));
                }
            }
            OptionDecl::Toggle { .. } => {
                let valid = templ
                    .strip_prefix("[no]")
                    .is_some_and(|rest| !rest.is_empty() && separator(rest).is_none());
                if !valid {
                    return Err(ConfigError::InvalidToggle(templ.to_string()));
                }
            }
            OptionDecl::Flag { policy, .. } if *policy == Policy::Error => {
                return Err(ConfigError::ErrorPolicyOnFlag(templ.to_string()));
            }
            _ => {}
        }
        Ok(())
    }

    /// Validate and build the option table.
    pub fn compile(&self) -> Result<OptionSet, ConfigError> {
        self.validate()?;

        let mut table = OptTable::new();
        let mut flags = HashMap::new();
        for decl in &self.options {
            let name = decl.name().unwrap_or_default();
            match decl {
                OptionDecl::Flag {
                    template, policy, ..
                } => {
                    let key = table.key(template.clone());
                    flags.insert(key, (name, *policy));
                }
                OptionDecl::Value { template, .. } => {
                    table.field(template.clone(), store_under(name));
                }
                OptionDecl::Set {
                    template, value, ..
                } => {
                    table.value(template.clone(), store_under(name), *value);
                }
                OptionDecl::Toggle { template, .. } => {
                    table.toggle(template, store_under(name));
                }
                OptionDecl::Keep { template } => {
                    table.keep(template.clone());
                }
                OptionDecl::Discard { template } => {
                    table.discard(template.clone());
                }
            }
        }

        Ok(OptionSet {
            table,
            flags,
            positional: self.positional,
            unmatched: self.unmatched,
        })
    }
}

fn store_under(name: String) -> Field<Matches> {
    Field::setter(move |matches: &mut Matches, value| {
        matches.values.insert(name.clone(), value);
        Ok(())
    })
}

/// Everything a parse recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matches {
    /// Stored values and flag counts, by name
    pub values: BTreeMap<String, Value>,
    /// Positional arguments, in order
    pub positionals: Vec<String>,
}

impl Matches {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// A compiled [`Config`].
#[derive(Debug)]
pub struct OptionSet {
    table: OptTable<Matches>,
    flags: HashMap<Key, (String, Policy)>,
    positional: Policy,
    unmatched: Policy,
}

impl OptionSet {
    pub fn table(&self) -> &OptTable<Matches> {
        &self.table
    }

    /// Parse `args` (program name first), returning what was recorded and
    /// the rebuilt arguments.
    pub fn parse(&self, args: Args<'_>) -> Result<(Matches, Args<'static>), ParseError> {
        let mut matches = Matches::default();
        let mut dispatch =
            |m: &mut Matches, arg: &str, key: Key, _out: &mut Args<'static>| -> ProcResult {
                self.dispatch(m, arg, key)
            };
        let out = parse(args, &mut matches, &self.table, Some(&mut dispatch))?;
        Ok((matches, out))
    }

    fn dispatch(&self, matches: &mut Matches, arg: &str, key: Key) -> ProcResult {
        match key {
            Key::NONOPT => {
                let disposition = apply(self.positional, "unexpected positional argument", arg)?;
                matches.positionals.push(arg.to_string());
                Ok(disposition)
            }
            Key::OPT => apply(self.unmatched, "unknown option", arg),
            key => match self.flags.get(&key) {
                Some((name, policy)) => {
                    let count = match matches.values.get(name) {
                        Some(Value::Uint(n)) => n + 1,
                        _ => 1,
                    };
                    matches.values.insert(name.clone(), Value::Uint(count));
                    apply(*policy, "unexpected option", arg)
                }
                None => Ok(Disposition::Keep),
            },
        }
    }
}

fn apply(policy: Policy, what: &str, arg: &str) -> ProcResult {
    match policy {
        Policy::Keep => Ok(Disposition::Keep),
        Policy::Discard => Ok(Disposition::Discard),
        Policy::Error => Err(anyhow!("{}: {}", what, arg)),
    }
}
