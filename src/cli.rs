//! CLI domain: parse, route, output, and presentation only.
//! No snapshot logic lives here; the route table dispatches to the engine.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, LogFormat};
pub use presentation::{
    format_log_json, format_log_text, format_merge_result, format_snapshot_result,
};
pub use route::RunContext;
