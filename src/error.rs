use std::{io, path::PathBuf};

use thiserror::Error;

use crate::format::Format;

pub const USAGE: &str = "Usage: convert from_path to_path [append] [--max-score <score>]";

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("{0}")]
    Usage(#[from] UsageError),
    #[error("Input file does not exist.")]
    InputNotFound(PathBuf),
    #[error("Conversion between files of these types is not supported.")]
    UnsupportedConversion { from: Option<Format>, to: Option<Format> },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("{0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("Invalid arguments.\n{USAGE}")]
    InvalidArguments,
    #[error("Invalid number for score filtering")]
    InvalidScore(String),
    #[error("score used for sign filtering must be positive")]
    NegativeScore(i64),
}

/// A single malformed token. The record it belongs to can be skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid score token '{0}'")]
    Score(String),
    #[error("score '{0}' does not fit a training record")]
    ScoreRange(i32),
    #[error("invalid result token '{0}'")]
    Result(String),
    #[error("invalid ply '{0}'")]
    Ply(String),
    #[error("invalid move '{0}'")]
    Move(String),
}

/// Corrupt input. The conversion stops at the first one.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{0} occupied squares, at most 32 fit a record")]
    TooManyPieces(u32),
    #[error("unknown piece code {code} in slot {slot}")]
    UnknownPieceCode { slot: usize, code: u8 },
    #[error("piece data present past the last occupied square")]
    StrayPieceData,
    #[error("king square {0} does not hold the side to move's king")]
    OurKingSquare(u8),
    #[error("king square {0} does not hold the opponent's king")]
    OppKingSquare(u8),
    #[error("invalid game result {0}")]
    BadResult(u8),
    #[error("record buffer holds {len} bytes, expected {stride}")]
    BadLength { len: usize, stride: usize },
    #[error("stream ends {0} bytes into a record")]
    Truncated(usize),
    #[error("file size {len} is not a multiple of the {stride}-byte record size")]
    Misaligned { len: u64, stride: usize },
    #[error("position is missing the {0} king")]
    MissingKing(&'static str),
    #[error("invalid fen '{0}'")]
    Fen(String),
    #[error("rules engine rejected '{0}'")]
    IllegalPosition(String),
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("binpack: {0}")]
    Binpack(String),
}
