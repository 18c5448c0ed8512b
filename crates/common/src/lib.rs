//! SelfHeal Common Library
//!
//! Page audit engine, configuration and shared types for the SelfHeal
//! toolkit.

pub mod audit;
pub mod autofix;
pub mod config;
pub mod error;
pub mod llm;
pub mod types;

// Re-export commonly used types
pub use audit::{classify_page, AuditRequest, PageAuditor};
pub use autofix::{auto_fix_issues, FileFixApplier, FixApplier};
pub use config::{LocatorConfig, PatternThresholds, SelfHealConfig};
pub use error::{Error, Result};
pub use llm::{decode_llm_issues, ChatClient, ChatMessage, DecodeError, HttpChatClient};
pub use types::*;

/// SelfHeal version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
