use atty::Stream;
use color_eyre::Result;
use gove_core::{CommandGroup, CommandInfo, CommandStatus, ExecutionOutcome};
use serde_json::Value;

use crate::style::Style;

#[derive(Clone, Copy, Debug)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
    pub no_color: bool,
}

pub fn emit_output(opts: &OutputOptions, info: CommandInfo, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.status.exit_code();

    if opts.json {
        let payload = gove_core::to_json_response(info, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    if let CommandStatus::Ok = outcome.status {
        if opts.quiet {
            return Ok(code);
        }
        let style = Style::new(opts.no_color, atty::is(Stream::Stdout));
        if is_listing(info) {
            println!("{}", render_listing(&style, &outcome.message));
        } else {
            let message = gove_core::format_status_message(info, &outcome.message);
            println!("{}", style.status(&outcome.status, &message));
        }
        if let Some(hint) = hint_from_details(&outcome.details) {
            println!("{}", style.info(&format!("Hint: {hint}")));
        }
    } else {
        let style = Style::new(opts.no_color, atty::is(Stream::Stderr));
        let message = gove_core::format_status_message(info, &outcome.message);
        eprintln!("{}", style.status(&outcome.status, &message));
        if let Some(hint) = hint_from_details(&outcome.details) {
            eprintln!("{}", style.info(&format!("Hint: {hint}")));
        }
    }

    Ok(code)
}

fn is_listing(info: CommandInfo) -> bool {
    matches!(info.group, CommandGroup::List | CommandGroup::Lsenvs)
}

/// Unindented lines are section headings; entries are indented.
fn render_listing(style: &Style, message: &str) -> String {
    message
        .lines()
        .map(|line| {
            if line.starts_with(' ') {
                line.to_string()
            } else {
                style.heading(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hints_are_read_from_details() {
        assert_eq!(
            hint_from_details(&json!({ "hint": "run `gove install 1.3.2`" })),
            Some("run `gove install 1.3.2`")
        );
        assert_eq!(hint_from_details(&json!({ "hint": 3 })), None);
        assert_eq!(hint_from_details(&Value::Null), None);
    }

    #[test]
    fn listings_keep_entries_verbatim() {
        let style = Style::new(true, false);
        let rendered = render_listing(&style, "Installed\n    1.3.2\nAvailable for installation");
        assert_eq!(rendered, "Installed\n    1.3.2\nAvailable for installation");
    }
}
