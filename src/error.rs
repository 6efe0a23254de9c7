use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebfontError {
    #[error("No SVG icons were found under {context:?}")]
    NoIconsAvailable { context: PathBuf },

    #[error("generate_files received invalid file types: {}", .values.join(", "))]
    InvalidGenerateFiles { values: Vec<String> },

    #[error("Font generation failed: {0}")]
    Generator(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Invalid icon glob: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("IO Error: {0}")]
    IO(#[from] io::Error),
}
