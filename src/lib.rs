/// Tokenised `convert` command.
pub mod command;
/// Conversion dispatch and the read, filter, write loop.
pub mod convert;
/// Error types shared by every stage.
pub mod error;
/// Record filtering policy.
pub mod filter;
/// Readers and writers for each training data format.
pub mod format;
/// pgn-extract score and result tokens.
pub mod parse;
/// The in-memory training record.
pub mod record;
/// Check, capture and legality answers backed by the `chess` crate.
pub mod rules;

pub use convert::{convert, run_convert, ConvertRequest, ConvertStats, Conversion, Converter};
pub use error::{ConvertError, DecodeError, ParseError, UsageError};
pub use filter::{should_keep, ParserSettings, PositionContext};
pub use format::{BinLayout, Format, OpenMode};
pub use record::{GameResult, Move, Position, TrainingRecord};
