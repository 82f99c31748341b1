//! Line-based lint for WebGAL scene scripts.
//!
//! The validator never fails: every problem becomes a diagnostic and the
//! caller receives the full list.

use crate::sandbox::PathSandbox;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Closed command vocabulary of the scene script dialect.
pub const ALLOWED_COMMANDS: &[&str] = &[
    "intro",
    "say",
    "changeBg",
    "changeFigure",
    "miniAvatar",
    "bgm",
    "playEffect",
    "playVocal",
    "changeScene",
    "callScene",
    "choose",
    "label",
    "jumpLabel",
    "setVar",
    "setTextbox",
    "pixiInit",
    "pixiPerform",
    "setAnimation",
    "setFilter",
    "setTransform",
    "video",
    "filmMode",
    "comment",
    "end",
    "getUserInput",
    "setComplexAnimation",
    "unlockCg",
    "unlockBgm",
];

/// Commands whose argument references an on-disk asset: (command, directory,
/// label).
const RESOURCE_COMMANDS: &[(&str, &str, &str)] = &[
    ("changeBg", "game/background", "background"),
    ("changeFigure", "game/figure", "figure"),
    ("bgm", "game/bgm", "BGM"),
    ("playVocal", "game/vocal", "vocal"),
    ("changeScene", "game/scene", "scene"),
    ("callScene", "game/scene", "scene"),
];

/// A left-hand side shaped like a command; anything else is a speaker name.
static COMMAND_CANDIDATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][A-Za-z0-9_]*$").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Syntax,
    Resource,
    Style,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub line: usize,
    pub kind: DiagnosticKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lint `content` line by line. Comment lines start with `;`.
pub fn validate_script(content: &str, sandbox: &PathSandbox) -> ValidationReport {
    let mut diagnostics = Vec::new();

    for (idx, raw) in content.split('\n').enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }

        if !trimmed.ends_with(';') {
            diagnostics.push(Diagnostic {
                line: line_no,
                kind: DiagnosticKind::Syntax,
                message: "statement must end with ;".to_string(),
                fix_hint: Some("append ;".to_string()),
            });
        }

        let body = trimmed.strip_suffix(';').unwrap_or(trimmed);
        let (left, arg) = match body.split_once(':') {
            Some((l, r)) => (l.trim(), Some(r.trim())),
            None => (body.trim(), None),
        };

        if !COMMAND_CANDIDATE_RE.is_match(left) {
            // Speaker name or narration; nothing to check.
            continue;
        }

        if !ALLOWED_COMMANDS.contains(&left) {
            diagnostics.push(Diagnostic {
                line: line_no,
                kind: DiagnosticKind::Syntax,
                message: format!("unknown command: {left}"),
                fix_hint: None,
            });
            continue;
        }

        let resource = RESOURCE_COMMANDS.iter().find(|(cmd, _, _)| *cmd == left);
        if let Some((_, dir, label)) = resource
            && let Some(arg) = arg
        {
            let file = arg.split(" -").next().unwrap_or("").trim();
            if !file.is_empty() && file != "none" && !resource_exists(sandbox, dir, file) {
                diagnostics.push(Diagnostic {
                    line: line_no,
                    kind: DiagnosticKind::Resource,
                    message: format!("{label} file missing: {file}"),
                    fix_hint: None,
                });
            }
        }
    }

    ValidationReport {
        valid: diagnostics.is_empty(),
        diagnostics,
    }
}

fn resource_exists(sandbox: &PathSandbox, dir: &str, file: &str) -> bool {
    match sandbox.validate(&format!("{dir}/{file}")) {
        Ok(abs) => abs.is_file(),
        Err(_) => false,
    }
}
