use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("index template name must not be empty")]
    EmptyTemplateName,

    #[error("index template '{0}' has an empty source document")]
    EmptyTemplateSource(String),

    #[error("index template '{name}' is not valid JSON: {source}")]
    InvalidTemplateSource {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read index template from {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("truncated frame: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("frame checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    Checksum { expected: u32, computed: u32 },

    #[error("failed to encode frame: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode frame: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}
