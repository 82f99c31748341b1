//! Static prompt templates exposed through the prompts capability.

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize)]
pub struct PromptArgument {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: &'static [PromptArgument],
    #[serde(skip)]
    template: &'static str,
}

const CREATE_SCENE: &str = "\
Create a new WebGAL scene named {{scene_name}}.\n\
Synopsis: {{synopsis}}\n\
\n\
Work in two phases: first call write_to_file with dry_run=true on \
game/scene/{{scene_name}}.txt and review the diff, then apply. Every \
statement must end with ';'. Reference only assets that \
list_project_resources reports, then run validate_script on the result.";

const REFACTOR_SCENE: &str = "\
Refactor the scene at {{scene_path}}.\n\
Goal: {{goal}}\n\
\n\
Read the scene first, prefer replace_in_file for targeted edits, and keep \
the dialogue and branching intact unless the goal says otherwise. Finish by \
validating the script and previewing it if execution is enabled.";

const FIX_VALIDATION: &str = "\
Fix the validation problems in {{scene_path}}.\n\
Diagnostics:\n{{diagnostics}}\n\
\n\
Address every diagnostic: append missing ';' terminators, correct unknown \
commands against the script vocabulary, and repoint missing resources at \
files that list_project_resources actually reports. Re-validate until the \
script is clean.";

static TEMPLATES: &[PromptTemplate] = &[
    PromptTemplate {
        name: "create_scene",
        description: "Author a new scene file from a synopsis",
        arguments: &[
            PromptArgument {
                name: "scene_name",
                description: "Scene name without extension",
                required: true,
            },
            PromptArgument {
                name: "synopsis",
                description: "What happens in the scene",
                required: true,
            },
        ],
        template: CREATE_SCENE,
    },
    PromptTemplate {
        name: "refactor_scene",
        description: "Rework an existing scene toward a stated goal",
        arguments: &[
            PromptArgument {
                name: "scene_path",
                description: "Project-relative scene file",
                required: true,
            },
            PromptArgument {
                name: "goal",
                description: "What the refactor should achieve",
                required: true,
            },
        ],
        template: REFACTOR_SCENE,
    },
    PromptTemplate {
        name: "fix_validation",
        description: "Resolve validator diagnostics for a scene",
        arguments: &[
            PromptArgument {
                name: "scene_path",
                description: "Project-relative scene file",
                required: true,
            },
            PromptArgument {
                name: "diagnostics",
                description: "Validator output to address",
                required: true,
            },
        ],
        template: FIX_VALIDATION,
    },
];

pub fn list() -> &'static [PromptTemplate] {
    TEMPLATES
}

/// Interpolate `{{arg}}` placeholders; unknown prompt names return `None`.
/// Missing arguments stay as their placeholder text.
pub fn render(name: &str, arguments: &Map<String, Value>) -> Option<(String, String)> {
    let template = TEMPLATES.iter().find(|t| t.name == name)?;
    let mut text = template.template.to_string();
    for argument in template.arguments {
        if let Some(value) = arguments.get(argument.name).and_then(Value::as_str) {
            text = text.replace(&format!("{{{{{}}}}}", argument.name), value);
        }
    }
    Some((template.description.to_string(), text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lists_the_three_templates() {
        let names: Vec<&str> = list().iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["create_scene", "refactor_scene", "fix_validation"]);
    }

    #[test]
    fn renders_with_interpolation() {
        let mut args = Map::new();
        args.insert("scene_name".to_string(), json!("chapter2"));
        args.insert("synopsis".to_string(), json!("the rooftop confession"));
        let (description, text) = render("create_scene", &args).unwrap();
        assert!(!description.is_empty());
        assert!(text.contains("game/scene/chapter2.txt"));
        assert!(text.contains("the rooftop confession"));
        assert!(!text.contains("{{scene_name}}"));
    }

    #[test]
    fn unknown_prompt_is_none() {
        assert!(render("nope", &Map::new()).is_none());
    }

    #[test]
    fn missing_arguments_keep_placeholders() {
        let (_, text) = render("refactor_scene", &Map::new()).unwrap();
        assert!(text.contains("{{scene_path}}"));
    }
}
