//! Document handler: file operations inside named base folders.
//!
//! Files are addressed by folder name plus file name. Lookups match the
//! lowercase file stem, so "report" finds `Report.txt`. Nothing outside the
//! configured folders is ever read or written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};

use aura_core::types::{Intent, ModuleKind};
use aura_llm::SharedModel;

use super::{command_of, expand_home, safe_file_name, ModuleHandler};
use crate::error::ModuleError;
use crate::types::{HandlerContext, SafetyLevel};

const DEFAULT_FOLDER: &str = "documents";

/// Operation keywords, checked in order.
const OPERATIONS: &[(Operation, &[&str])] = &[
    (Operation::Create, &["create", "add", "make"]),
    (Operation::Edit, &["edit", "append", "update", "modify"]),
    (Operation::Delete, &["delete", "remove", "erase", "trash"]),
    (Operation::Summarize, &["summarize", "summary", "abstract"]),
    (Operation::Classify, &["classify", "category", "categorize"]),
    (Operation::Move, &["move", "transfer", "shift"]),
    (
        Operation::Retrieve,
        &["retrieve", "get", "open", "read", "show", "display", "look"],
    ),
    (Operation::List, &["list"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Create,
    Edit,
    Delete,
    Summarize,
    Classify,
    Move,
    Retrieve,
    List,
}

fn operation_of(intent: &Intent) -> Option<Operation> {
    let command = command_of(intent);
    OPERATIONS
        .iter()
        .find(|(_, words)| words.iter().any(|w| command.contains(w)))
        .map(|(op, _)| *op)
}

/// Standard user folders, overridden by any configured entries.
pub fn resolve_folders(overrides: &BTreeMap<String, String>) -> BTreeMap<String, PathBuf> {
    let mut folders = BTreeMap::new();
    let standard = [
        ("documents", dirs::document_dir()),
        ("downloads", dirs::download_dir()),
        ("desktop", dirs::desktop_dir()),
        ("pictures", dirs::picture_dir()),
        ("videos", dirs::video_dir()),
        ("music", dirs::audio_dir()),
    ];
    for (name, dir) in standard {
        if let Some(dir) = dir {
            folders.insert(name.to_string(), dir);
        }
    }
    for (name, path) in overrides {
        folders.insert(name.to_lowercase(), expand_home(path));
    }
    folders
}

/// Find a file in `dir` whose lowercase stem equals `name`'s.
pub(crate) async fn find_by_stem(dir: &Path, name: &str) -> Result<Option<PathBuf>, ModuleError> {
    let wanted = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase());
        if stem.as_deref() == Some(wanted.as_str()) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

pub struct DocumentHandler {
    folders: BTreeMap<String, PathBuf>,
    model: SharedModel,
}

impl DocumentHandler {
    pub fn new(folders: BTreeMap<String, PathBuf>, model: SharedModel) -> Self {
        Self { folders, model }
    }

    fn folder(&self, name: &str) -> Result<&PathBuf, String> {
        self.folders
            .get(&name.to_lowercase())
            .ok_or_else(|| format!("Unknown folder '{name}'."))
    }

    async fn existing(&self, folder: &str, file_name: &str) -> Result<Result<PathBuf, Value>, ModuleError> {
        let dir = match self.folder(folder) {
            Ok(dir) => dir,
            Err(message) => return Ok(Err(json!({ "error": message }))),
        };
        match find_by_stem(dir, safe_file_name(file_name)?).await? {
            Some(path) => Ok(Ok(path)),
            None => Ok(Err(json!({
                "error": format!("File '{file_name}' not found in {folder}.")
            }))),
        }
    }

    async fn run(&self, op: Operation, intent: &Intent) -> Result<Value, ModuleError> {
        let folder = intent.payload_str_or("folder", DEFAULT_FOLDER);

        if op == Operation::List {
            let dir = match self.folder(folder) {
                Ok(dir) => dir,
                Err(message) => return Ok(json!({ "error": message })),
            };
            let mut files = Vec::new();
            let mut entries = tokio::fs::read_dir(dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_file() {
                    files.push(entry.file_name().to_string_lossy().into_owned());
                }
            }
            files.sort();
            return Ok(json!({ "folder": folder, "files": files }));
        }

        let file_name = intent
            .payload_str("file_name")
            .ok_or_else(|| ModuleError::InvalidPayload("file_name is required".to_string()))?;

        if op == Operation::Create {
            let dir = match self.folder(folder) {
                Ok(dir) => dir,
                Err(message) => return Ok(json!({ "error": message })),
            };
            let name = safe_file_name(file_name)?;
            let name = if Path::new(name).extension().is_some() {
                name.to_string()
            } else {
                format!("{name}.txt")
            };
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(dir.join(&name), intent.payload_str_or("content", "")).await?;
            tracing::info!(folder, file = %name, "Document created");
            return Ok(json!({
                "status": "success",
                "message": format!("File '{name}' created in {folder}."),
            }));
        }

        let path = match self.existing(folder, file_name).await? {
            Ok(path) => path,
            Err(error) => return Ok(error),
        };
        let shown = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());

        match op {
            Operation::Edit => {
                tokio::fs::write(&path, intent.payload_str_or("content", "")).await?;
                Ok(json!({ "status": "success", "message": format!("File '{shown}' updated.") }))
            }
            Operation::Delete => {
                tokio::fs::remove_file(&path).await?;
                tracing::info!(folder, file = %shown, "Document deleted");
                Ok(json!({ "status": "success", "message": format!("File '{shown}' deleted.") }))
            }
            Operation::Summarize => {
                let content = tokio::fs::read_to_string(&path).await?;
                let summary = self
                    .model
                    .generate(&format!("Summarize the following file content: {content}"))
                    .await?;
                Ok(json!({ "file": shown, "summary": summary.trim() }))
            }
            Operation::Classify => {
                let content = tokio::fs::read_to_string(&path).await?;
                let reply = self
                    .model
                    .generate(&format!(
                        "Classify this file content to a category, say only work or personal: {content}"
                    ))
                    .await?;
                let category = if reply.to_lowercase().contains("work") {
                    "work"
                } else {
                    "personal"
                };
                Ok(json!({ "file": shown, "category": category }))
            }
            Operation::Move => {
                let destination = intent
                    .payload_str("destination")
                    .ok_or_else(|| ModuleError::InvalidPayload("destination is required".to_string()))?;
                let target_dir = match self.folder(destination) {
                    Ok(dir) => dir,
                    Err(message) => return Ok(json!({ "error": message })),
                };
                tokio::fs::create_dir_all(target_dir).await?;
                tokio::fs::rename(&path, target_dir.join(&shown)).await?;
                Ok(json!({
                    "status": "success",
                    "message": format!("File '{shown}' moved to {destination}."),
                }))
            }
            Operation::Retrieve => {
                let content = tokio::fs::read_to_string(&path).await?;
                Ok(json!({ "file": shown, "content": content }))
            }
            Operation::Create | Operation::List => Ok(json!({ "error": "Document action not recognized." })),
        }
    }
}

#[async_trait]
impl ModuleHandler for DocumentHandler {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Document
    }

    fn safety_level(&self) -> SafetyLevel {
        SafetyLevel::Active
    }

    async fn execute(&self, intent: &Intent, _ctx: &HandlerContext) -> Result<Value, ModuleError> {
        match operation_of(intent) {
            Some(op) => self.run(op, intent).await,
            None => Ok(json!({ "error": "Document action not recognized." })),
        }
    }

    fn describe(&self, intent: &Intent) -> String {
        format!(
            "Document {} '{}' in {}",
            command_of(intent),
            intent.payload_str_or("file_name", ""),
            intent.payload_str_or("folder", DEFAULT_FOLDER)
        )
    }
}
