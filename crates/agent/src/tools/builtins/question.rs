//! Follow-up question tool: a structured echo the orchestrating client
//! renders to its user.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::tools::builtins::helpers::{optional_str_vec, required_str};
use crate::tools::{Tool, ToolContext, ToolDefinition};

pub struct AskFollowupQuestionTool;

#[async_trait]
impl Tool for AskFollowupQuestionTool {
    fn name(&self) -> &'static str {
        "ask_followup_question"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: "Ask the user a clarifying question. The hosting client \
                          presents it and feeds the answer back as a new request."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "The question to put to the user."
                    },
                    "options": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Optional suggested answers."
                    }
                },
                "required": ["question"]
            }),
        }
    }

    async fn call(&self, args: Value, _context: &ToolContext) -> Result<Value, ToolError> {
        let question = required_str(&args, "question")?;
        let options = optional_str_vec(&args, "options")?.unwrap_or_default();
        Ok(json!({ "question": question, "options": options }))
    }
}
