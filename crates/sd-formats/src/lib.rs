//! Sample file formats for stepdeck.
//!
//! Decodes WAV files into [`sd_ir::Sample`]s and encodes rendered frames
//! as 16-bit stereo WAV.

mod wav_format;

pub use wav_format::{frames_to_wav, load_wav, load_wav_file, write_wav};

/// Error type for format parsing.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("invalid file header")]
    InvalidHeader,
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("unsupported encoding: format {format}, {bits} bits, {channels} channels")]
    Unsupported { format: u16, bits: u16, channels: u16 },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
