//! Program metadata banner

use serde::{Deserialize, Serialize};

/// Metadata shown by `--version` style output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramInfo {
    pub program: String,
    pub author: String,
    pub contact: String,
    pub version: String,
}

impl ProgramInfo {
    /// Metadata of this crate for the named program
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            author: env!("CARGO_PKG_AUTHORS").to_string(),
            contact: String::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_contact(mut self, contact: &str) -> Self {
        self.contact = contact.to_string();
        self
    }
}

/// Four-line version banner
pub fn format_version_info(info: &ProgramInfo) -> String {
    format!(
        "Program: {}\nAuthor: {:>10}\nContact: {}\nVersion: {}",
        info.program, info.author, info.contact, info.version
    )
}
