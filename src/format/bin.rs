use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind, Read, Write},
    path::Path,
    str::FromStr,
};

use crate::{
    error::{ConvertError, DecodeError},
    record::{Colour, GameResult, Piece, PieceType, Position, TrainingRecord},
};

use super::{OpenMode, RecordResult, RecordWriter};

pub const PAYLOAD_SIZE: usize = 29;

const KING: u8 = 5;
const OPP_KING: u8 = 8 | KING;

/// Binary record revisions, differing only in trailing padding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BinLayout {
    /// 29 bytes per record.
    Packed,
    /// 32 bytes per record, as bulletformat writes them.
    #[default]
    Padded,
}

impl BinLayout {
    pub const fn stride(self) -> usize {
        match self {
            Self::Packed => PAYLOAD_SIZE,
            Self::Padded => 32,
        }
    }
}

impl FromStr for BinLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "packed" => Ok(Self::Packed),
            "padded" => Ok(Self::Padded),
            _ => Err(format!("Unknown bin layout '{s}'! Supported: 'padded', 'packed'.")),
        }
    }
}

/// A position from the side to move's point of view: when black is to move the
/// board is mirrored and colours are swapped, so "our" pieces are always colour 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChessBoard {
    occ: u64,
    pcs: [u8; 16],
    score: i16,
    result: u8,
    our_ksq: u8,
    opp_ksq: u8,
}

impl ChessBoard {
    pub fn occ(&self) -> u64 {
        self.occ
    }

    pub fn score(&self) -> i16 {
        self.score
    }

    pub fn result_idx(&self) -> usize {
        usize::from(self.result)
    }

    pub fn our_ksq(&self) -> u8 {
        self.our_ksq
    }

    /// Stored from the opponent's point of view, i.e. `square ^ 56`.
    pub fn opp_ksq(&self) -> u8 {
        self.opp_ksq
    }

    fn piece_code(&self, idx: usize) -> u8 {
        (self.pcs[idx / 2] >> (4 * (idx & 1))) & 0b1111
    }

    fn code_on(&self, sq: u8) -> Option<u8> {
        let bit = 1u64.checked_shl(u32::from(sq))?;
        if self.occ & bit == 0 {
            return None;
        }

        let idx = (self.occ & (bit - 1)).count_ones() as usize;
        Some(self.piece_code(idx))
    }

    pub fn from_record(record: &TrainingRecord) -> Result<Self, DecodeError> {
        let pos = match record.position.side_to_move() {
            Colour::White => record.position,
            Colour::Black => record.position.flipped(),
        };

        let occ = pos.occupancy();
        if occ.count_ones() > 32 {
            return Err(DecodeError::TooManyPieces(occ.count_ones()));
        }

        let our_ksq = pos.king_square(Colour::White).ok_or(DecodeError::MissingKing("side to move's"))?;
        let opp_ksq = pos.king_square(Colour::Black).ok_or(DecodeError::MissingKing("opponent's"))? ^ 56;

        let mut pcs = [0; 16];
        let mut bits = occ;
        let mut idx = 0;
        while bits > 0 {
            let sq = bits.trailing_zeros() as u8;
            if let Some(pc) = pos.piece_at(sq) {
                let code = pc.piece_type.index() as u8 | (pc.colour.index() as u8) << 3;
                pcs[idx / 2] |= code << (4 * (idx & 1));
            }

            bits &= bits - 1;
            idx += 1;
        }

        Ok(Self { occ, pcs, score: record.score, result: record.result.idx() as u8, our_ksq, opp_ksq })
    }

    /// The relative board becomes a white-to-move position without castling
    /// rights, en passant square or move.
    pub fn to_record(&self) -> TrainingRecord {
        let mut board = [None; 64];
        for (piece, square) in *self {
            let colour = if piece >> 3 == 0 { Colour::White } else { Colour::Black };
            if let Some(piece_type) = PieceType::from_index(usize::from(piece & 7)) {
                board[usize::from(square)] = Some(Piece::new(colour, piece_type));
            }
        }

        TrainingRecord {
            position: Position::from_board(board, Colour::White),
            mv: None,
            score: self.score,
            result: GameResult::from_idx(self.result).unwrap_or(GameResult::Draw),
            ply: 0,
        }
    }

    pub fn validate(&self) -> Result<(), DecodeError> {
        let count = self.occ.count_ones();
        if count > 32 {
            return Err(DecodeError::TooManyPieces(count));
        }

        for slot in 0..32 {
            let code = self.piece_code(slot);
            if slot >= count as usize {
                if code != 0 {
                    return Err(DecodeError::StrayPieceData);
                }
            } else if code & 7 > KING {
                return Err(DecodeError::UnknownPieceCode { slot, code });
            }
        }

        if self.code_on(self.our_ksq) != Some(KING) {
            return Err(DecodeError::OurKingSquare(self.our_ksq));
        }

        if self.code_on(self.opp_ksq ^ 56) != Some(OPP_KING) {
            return Err(DecodeError::OppKingSquare(self.opp_ksq));
        }

        if self.result > 2 {
            return Err(DecodeError::BadResult(self.result));
        }

        Ok(())
    }

    /// Writes the record into the first `layout.stride()` bytes of `buf`.
    pub fn write_to(&self, buf: &mut [u8], layout: BinLayout) {
        let buf = &mut buf[..layout.stride()];
        buf[0..8].copy_from_slice(&self.occ.to_le_bytes());
        buf[8..24].copy_from_slice(&self.pcs);
        buf[24..26].copy_from_slice(&self.score.to_le_bytes());
        buf[26] = self.result;
        buf[27] = self.our_ksq;
        buf[28] = self.opp_ksq;
        buf[PAYLOAD_SIZE..].fill(0);
    }

    pub fn to_bytes(&self, layout: BinLayout) -> Vec<u8> {
        let mut buf = vec![0; layout.stride()];
        self.write_to(&mut buf, layout);
        buf
    }

    /// Reads a record without checking it. Padding bytes are ignored.
    pub fn from_bytes_unchecked(bytes: &[u8], layout: BinLayout) -> Result<Self, DecodeError> {
        if bytes.len() != layout.stride() {
            return Err(DecodeError::BadLength { len: bytes.len(), stride: layout.stride() });
        }

        let mut occ = [0; 8];
        occ.copy_from_slice(&bytes[0..8]);
        let mut pcs = [0; 16];
        pcs.copy_from_slice(&bytes[8..24]);

        Ok(Self {
            occ: u64::from_le_bytes(occ),
            pcs,
            score: i16::from_le_bytes([bytes[24], bytes[25]]),
            result: bytes[26],
            our_ksq: bytes[27],
            opp_ksq: bytes[28],
        })
    }

    pub fn from_bytes(bytes: &[u8], layout: BinLayout) -> Result<Self, DecodeError> {
        let board = Self::from_bytes_unchecked(bytes, layout)?;
        board.validate()?;
        Ok(board)
    }
}

impl IntoIterator for ChessBoard {
    type Item = (u8, u8);
    type IntoIter = BoardIter;
    fn into_iter(self) -> Self::IntoIter {
        BoardIter { board: self, idx: 0 }
    }
}

pub struct BoardIter {
    board: ChessBoard,
    idx: usize,
}

impl Iterator for BoardIter {
    type Item = (u8, u8);
    fn next(&mut self) -> Option<Self::Item> {
        if self.board.occ == 0 {
            return None;
        }

        let square = self.board.occ.trailing_zeros() as u8;
        let piece = self.board.piece_code(self.idx);

        self.board.occ &= self.board.occ - 1;
        self.idx += 1;

        Some((piece, square))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BinCodec {
    layout: BinLayout,
}

impl BinCodec {
    pub fn new(layout: BinLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> BinLayout {
        self.layout
    }

    pub fn record_size(&self) -> usize {
        self.layout.stride()
    }

    pub fn encode(&self, record: &TrainingRecord) -> Result<Vec<u8>, DecodeError> {
        Ok(ChessBoard::from_record(record)?.to_bytes(self.layout))
    }

    pub fn encode_into(&self, record: &TrainingRecord, buf: &mut [u8]) -> Result<(), DecodeError> {
        ChessBoard::from_record(record)?.write_to(buf, self.layout);
        Ok(())
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<TrainingRecord, DecodeError> {
        Ok(ChessBoard::from_bytes(bytes, self.layout)?.to_record())
    }
}

pub struct BinReader<R: Read> {
    reader: R,
    codec: BinCodec,
    buf: Vec<u8>,
    done: bool,
}

impl BinReader<BufReader<File>> {
    /// Opens a bin file, refusing one whose size does not fit the layout.
    pub fn open(path: impl AsRef<Path>, layout: BinLayout) -> Result<Self, ConvertError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();

        if len % layout.stride() as u64 != 0 {
            return Err(DecodeError::Misaligned { len, stride: layout.stride() }.into());
        }

        Ok(Self::new(BufReader::new(file), layout))
    }
}

impl<R: Read> BinReader<R> {
    pub fn new(reader: R, layout: BinLayout) -> Self {
        Self { reader, codec: BinCodec::new(layout), buf: vec![0; layout.stride()], done: false }
    }

    /// Reads the next record as stored, without checking its contents.
    pub fn next_board(&mut self) -> Result<Option<ChessBoard>, ConvertError> {
        let mut filled = 0;
        while filled < self.buf.len() {
            match self.reader.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }

        match filled {
            0 => Ok(None),
            n if n < self.buf.len() => Err(DecodeError::Truncated(n).into()),
            _ => Ok(Some(ChessBoard::from_bytes_unchecked(&self.buf, self.codec.layout())?)),
        }
    }
}

impl<R: Read> Iterator for BinReader<R> {
    type Item = RecordResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let record = self.next_board().and_then(|board| match board {
            Some(board) => {
                board.validate()?;
                Ok(Some(board.to_record()))
            }
            None => Ok(None),
        });

        match record {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

pub struct BinWriter<W: Write> {
    writer: W,
    codec: BinCodec,
    buf: Vec<u8>,
}

impl BinWriter<BufWriter<File>> {
    /// Opens `path` for writing. Appending to a file whose size does not fit
    /// the layout fails before anything is written.
    pub fn create(path: impl AsRef<Path>, mode: OpenMode, layout: BinLayout) -> Result<Self, ConvertError> {
        let file = mode.open(path)?;

        if mode == OpenMode::Append {
            let len = file.metadata()?.len();
            if len % layout.stride() as u64 != 0 {
                return Err(DecodeError::Misaligned { len, stride: layout.stride() }.into());
            }
        }

        Ok(Self::new(BufWriter::new(file), layout))
    }
}

impl<W: Write> BinWriter<W> {
    pub fn new(writer: W, layout: BinLayout) -> Self {
        Self { writer, codec: BinCodec::new(layout), buf: vec![0; layout.stride()] }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordWriter for BinWriter<W> {
    fn write_record(&mut self, record: &TrainingRecord) -> Result<(), ConvertError> {
        self.codec.encode_into(record, &mut self.buf)?;
        self.writer.write_all(&self.buf)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ConvertError> {
        self.writer.flush()?;
        Ok(())
    }
}
