//! Typed asset enumeration over the five project resource directories.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::Path;

use crate::error::ToolError;
use crate::tools::{Tool, ToolContext, ToolDefinition};

const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];
const AUDIO_EXTS: &[&str] = &["mp3", "ogg", "wav", "m4a", "flac"];
const SCENE_EXTS: &[&str] = &["txt"];

/// (result key, directory, extension allow-list)
const CATEGORIES: &[(&str, &str, &[&str])] = &[
    ("backgrounds", "game/background", IMAGE_EXTS),
    ("figures", "game/figure", IMAGE_EXTS),
    ("bgm", "game/bgm", AUDIO_EXTS),
    ("vocals", "game/vocal", AUDIO_EXTS),
    ("scenes", "game/scene", SCENE_EXTS),
];

pub struct ListProjectResourcesTool;

#[async_trait]
impl Tool for ListProjectResourcesTool {
    fn name(&self) -> &'static str {
        "list_project_resources"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Enumerate backgrounds, figures, BGM, vocals and scenes by \
                          extension. Missing directories yield empty lists."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    async fn call(&self, _args: Value, context: &ToolContext) -> Result<Value, ToolError> {
        let mut result = serde_json::Map::new();
        for (key, dir, exts) in CATEGORIES {
            let abs = context.sandbox.validate(dir)?;
            result.insert(key.to_string(), json!(list_by_extension(&abs, exts).await));
        }
        Ok(Value::Object(result))
    }
}

async fn list_by_extension(dir: &Path, allowed: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    let Ok(mut reader) = tokio::fs::read_dir(dir).await else {
        return out;
    };
    while let Ok(Some(entry)) = reader.next_entry().await {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
        if ext.is_some_and(|e| allowed.contains(&e.as_str())) {
            out.push(name);
        }
    }
    out.sort();
    out
}
