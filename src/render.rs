//! Terminal presentation of the result slot.
//!
//! Every function here is a pure mapping from state to text.

use crate::models::InputMode;
use crate::session::ResultView;

pub const TITLE: &str = "Formula Forge";
pub const SUBMIT_LABEL: &str = "Solve with Gemini";
pub const BUSY_LABEL: &str = "Solving...";

pub fn render_header() -> String {
    let rule = "=".repeat(TITLE.len() + 4);
    format!("{}\n  {}\n{}", rule, TITLE, rule)
}

/// Mode selector with the active tab bracketed, e.g. `[Text]  Image   Draw`.
pub fn render_tabs(active: InputMode) -> String {
    InputMode::ALL
        .iter()
        .map(|mode| {
            if *mode == active {
                format!("[{}]", mode.label())
            } else {
                format!(" {} ", mode.label())
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn submit_label(busy: bool) -> &'static str {
    if busy {
        BUSY_LABEL
    } else {
        SUBMIT_LABEL
    }
}

/// Render the result pane. Busy wins over any stale content; an idle view
/// renders as an empty string.
pub fn render_result(view: &ResultView) -> String {
    if view.busy {
        return format!("... {}", BUSY_LABEL);
    }
    if let Some(error) = &view.error {
        return format!("Error: {}", error);
    }
    match &view.solution {
        Some(solution) => format_solution(solution),
        None => String::new(),
    }
}

/// Normalise the service's markdown for a terminal while keeping its block
/// structure. Blank-line runs collapse to one outside code fences; inside a
/// fence lines are kept verbatim.
pub fn format_solution(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<&str> = Vec::new();
    let mut in_fence = false;
    for raw in normalized.lines() {
        let fence = raw.trim_start().starts_with("```");
        let line = if in_fence && !fence {
            raw
        } else {
            raw.trim_end()
        };

        if !in_fence && line.is_empty() && lines.last().is_some_and(|l| l.is_empty()) {
            continue;
        }
        lines.push(line);

        if fence {
            in_fence = !in_fence;
        }
    }

    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}
