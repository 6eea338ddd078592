//! CLI domain: parse, route, output, and presentation only.
//! Generation state lives in the lifecycle controller; route only drives it.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{
    AspectArg, Cli, Commands, EncodingArg, ModeArg, ModelArg, PositionArg, QualityArg,
    SelectionArgs,
};
pub use presentation::{
    format_check_json, format_check_text, format_config_toml, format_outcome_line,
};
pub use route::{build_editor, RunContext};
