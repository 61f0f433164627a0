use std::path::Path;

use sfbinpack::{
    chess::{piecetype::PieceType as SfPieceType, r#move::MoveType},
    CompressedTrainingDataEntryReader, TrainingDataEntry,
};

use crate::{
    error::{ConvertError, DecodeError},
    record::{GameResult, Move, PieceType, Position, TrainingRecord},
};

use super::RecordResult;

/// Access to the packed training data format. Records come out one at a time
/// and in file order; a corrupt entry ends the stream with a decode error.
pub trait PackedCodec {
    type Reader: Iterator<Item = RecordResult>;

    fn decode_stream(&self, path: &Path) -> Result<Self::Reader, ConvertError>;
}

/// Stockfish binpack, decoded by `sfbinpack`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SfBinpack;

impl PackedCodec for SfBinpack {
    type Reader = BinpackReader;

    fn decode_stream(&self, path: &Path) -> Result<Self::Reader, ConvertError> {
        BinpackReader::open(path)
    }
}

pub struct BinpackReader {
    reader: CompressedTrainingDataEntryReader,
    done: bool,
}

impl BinpackReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let name = path.to_str().ok_or_else(|| DecodeError::Binpack(format!("{} is not valid UTF-8", path.display())))?;

        let reader = CompressedTrainingDataEntryReader::new(name)
            .map_err(|err| DecodeError::Binpack(format!("failed to open {name}: {err:?}")))?;

        Ok(Self { reader, done: false })
    }
}

impl Iterator for BinpackReader {
    type Item = RecordResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || !self.reader.has_next() {
            self.done = true;
            return None;
        }

        let record = convert_entry(&self.reader.next());
        if record.is_err() {
            self.done = true;
        }

        Some(record)
    }
}

/// Binpack stores castling as the king capturing its own rook.
pub fn castle_destination(king: u8, rook: u8) -> u8 {
    let rank = king / 8;
    if rook % 8 > king % 8 {
        8 * rank + 6
    } else {
        8 * rank + 2
    }
}

fn promotion_type(pt: SfPieceType) -> Result<PieceType, DecodeError> {
    match pt {
        SfPieceType::Knight => Ok(PieceType::Knight),
        SfPieceType::Bishop => Ok(PieceType::Bishop),
        SfPieceType::Rook => Ok(PieceType::Rook),
        SfPieceType::Queen => Ok(PieceType::Queen),
        _ => Err(DecodeError::Binpack("promotion to a non-promotable piece".to_string())),
    }
}

fn convert_entry(entry: &TrainingDataEntry) -> RecordResult {
    let fen = entry.pos.fen().map_err(|err| DecodeError::Binpack(format!("unprintable position: {err:?}")))?;
    let position = Position::from_fen(&fen)?;

    let from = entry.mv.from().index() as u8;
    let to = entry.mv.to().index() as u8;

    let mv = match entry.mv.mtype() {
        MoveType::Promotion => {
            let promotion = promotion_type(entry.mv.promoted_piece().piece_type())?;
            Move::classified(from, to, Some(promotion), &position)
        }
        MoveType::Castle => Move::classified(from, castle_destination(from, to), None, &position),
        _ => Move::classified(from, to, None, &position),
    };

    let result = i8::try_from(entry.result)
        .ok()
        .and_then(GameResult::from_i8)
        .ok_or_else(|| DecodeError::Binpack(format!("invalid result {}", entry.result)))?;

    Ok(TrainingRecord { position, mv: Some(mv), score: entry.score, result, ply: entry.ply })
}
