pub mod browser;
pub mod completion;
pub mod exec_tool;
pub mod helpers;
pub mod ls;
pub mod preview;
pub mod question;
pub mod read_file;
pub mod replace;
pub mod resources;
pub mod runtime_info;
pub mod search;
pub mod snapshots;
pub mod validate;
pub mod write_file;

pub use browser::BrowserActionTool;
pub use completion::AttemptCompletionTool;
pub use exec_tool::ExecuteCommandTool;
pub use ls::ListFilesTool;
pub use preview::PreviewSceneTool;
pub use question::AskFollowupQuestionTool;
pub use read_file::ReadFileTool;
pub use replace::ReplaceInFileTool;
pub use resources::ListProjectResourcesTool;
pub use runtime_info::GetRuntimeInfoTool;
pub use search::SearchFilesTool;
pub use snapshots::{ListSnapshotsTool, RestoreSnapshotTool};
pub use validate::ValidateScriptTool;
pub use write_file::WriteToFileTool;
