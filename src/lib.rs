//! gopt - option parsing for CLI flags and mount-style `-o` option groups.
//!
//! This library matches a flat argument vector against a table of option
//! templates (`-v`, `uid=%u`, `-p %u`, ...), writes matched values into the
//! caller's data, hands everything else to a callback, and rebuilds an
//! argument vector suitable for passing on to another program. Options given
//! as `-o a,b=c` groups are split, decoded and re-joined along the way.

pub mod args;
pub mod config;
pub mod escape;
pub mod output;
pub mod parser;
pub mod table;
pub mod template;
pub mod value;

pub use args::Args;
pub use config::{Config, ConfigError, Matches, OptionDecl, OptionSet, Policy};
pub use escape::{add_opt, add_opt_escaped, escape_opt, split_group};
pub use output::{generate_error_output, generate_output, generate_output_string};
pub use parser::{parse, Disposition, OptProc, ParseError, ProcResult};
pub use table::{Dest, Field, Key, OptSpec, OptTable};
pub use template::match_template;
pub use value::{ConvError, Conversion, FromValue, Value};
