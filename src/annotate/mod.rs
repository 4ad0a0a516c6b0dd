pub mod error;
pub mod diagnostics;
pub mod config;
pub mod knowledge;
pub mod matcher;
pub mod resolver;
pub mod span;
pub mod pipeline;
pub mod document;
pub mod fingerprint;
pub mod scheduler;
pub mod reconciler;
pub mod navigator;
pub mod preview;
pub mod conductor;

pub use error::*;
pub use config::*;
pub use knowledge::*;
pub use matcher::*;
pub use resolver::*;
pub use span::*;
pub use pipeline::*;
pub use document::*;
pub use fingerprint::*;
pub use scheduler::*;
pub use reconciler::*;
pub use navigator::*;
pub use preview::*;
pub use conductor::*;
