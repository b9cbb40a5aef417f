//! # docsync-prompt
//!
//! Tera-based prompt builder for the documentation generator.
//!
//! Templates are embedded at compile time and may be overridden per install
//! by dropping `*.tera` files with the same name into a templates directory.
//! A built prompt is a plain `String`; callers hand it to the generator as a
//! single process argument.
//!
//! ```rust,no_run
//! use docsync_prompt::{PromptBuilder, PromptContext, PromptKind};
//!
//! fn build(transcript: String) -> Option<String> {
//!     let builder = PromptBuilder::new(None).ok()?;
//!     let ctx = PromptContext::for_session("/code/app", "CLAUDE.md", vec![], "1..40", transcript);
//!     builder.build(PromptKind::SessionUpdate, &ctx).ok()
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{ArtifactCtx, PromptContext};
pub use engine::{PromptBuilder, PromptKind};
pub use error::PromptError;
