use std::fmt;

use crate::error::{DecodeError, ParseError};

pub type Value = i32;

pub const VALUE_ZERO: Value = 0;
pub const VALUE_MATE: Value = 32000;
pub const MAX_PLY: Value = 246;
pub const VALUE_MATE_IN_MAX_PLY: Value = VALUE_MATE - MAX_PLY;
pub const PAWN_VALUE_EG: Value = 208;

pub const fn mate_in(ply: Value) -> Value {
    VALUE_MATE - ply
}

pub const fn mated_in(ply: Value) -> Value {
    -VALUE_MATE + ply
}

pub fn is_mate_score(score: i16) -> bool {
    Value::from(score).abs() >= VALUE_MATE_IN_MAX_PLY
}

pub const WHITE_OO: u8 = 1;
pub const WHITE_OOO: u8 = 2;
pub const BLACK_OO: u8 = 4;
pub const BLACK_OOO: u8 = 8;

const PIECE_CHARS: &str = "PNBRQKpnbrqk";
const CASTLING_CHARS: [(u8, char); 4] = [(WHITE_OO, 'K'), (WHITE_OOO, 'Q'), (BLACK_OO, 'k'), (BLACK_OOO, 'q')];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Colour {
    White,
    Black,
}

impl Colour {
    pub fn flip(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceType {
    pub const ALL: [Self; 6] = [Self::Pawn, Self::Knight, Self::Bishop, Self::Rook, Self::Queen, Self::King];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn from_promotion_char(ch: char) -> Option<Self> {
        match ch {
            'n' => Some(Self::Knight),
            'b' => Some(Self::Bishop),
            'r' => Some(Self::Rook),
            'q' => Some(Self::Queen),
            _ => None,
        }
    }

    pub fn promotion_char(self) -> char {
        match self {
            Self::Pawn => 'p',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
            Self::King => 'k',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Piece {
    pub colour: Colour,
    pub piece_type: PieceType,
}

impl Piece {
    pub fn new(colour: Colour, piece_type: PieceType) -> Self {
        Self { colour, piece_type }
    }

    pub fn from_fen_char(ch: char) -> Option<Self> {
        let idx = PIECE_CHARS.chars().position(|el| el == ch)?;
        let colour = if idx < 6 { Colour::White } else { Colour::Black };
        Some(Self::new(colour, PieceType::ALL[idx % 6]))
    }

    pub fn fen_char(self) -> char {
        let idx = 6 * self.colour.index() + self.piece_type.index();
        PIECE_CHARS.as_bytes()[idx] as char
    }

    pub fn flipped(self) -> Self {
        Self::new(self.colour.flip(), self.piece_type)
    }
}

pub fn square_name(sq: u8) -> String {
    let file = (b'a' + sq % 8) as char;
    let rank = (b'1' + sq / 8) as char;
    format!("{file}{rank}")
}

pub fn parse_square(name: &str) -> Option<u8> {
    match name.as_bytes() {
        &[file @ b'a'..=b'h', rank @ b'1'..=b'8'] => Some(8 * (rank - b'1') + (file - b'a')),
        _ => None,
    }
}

/// Board state of one training position, squares indexed `a1 = 0 .. h8 = 63`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    board: [Option<Piece>; 64],
    stm: Colour,
    castling: u8,
    ep: Option<u8>,
    halfmove: u16,
    fullmove: u16,
}

impl Default for Position {
    fn default() -> Self {
        Self { board: [None; 64], stm: Colour::White, castling: 0, ep: None, halfmove: 0, fullmove: 1 }
    }
}

impl Position {
    pub const STARTPOS: &'static str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    pub fn from_board(board: [Option<Piece>; 64], stm: Colour) -> Self {
        Self { board, stm, ..Default::default() }
    }

    pub fn with_castling(mut self, castling: u8) -> Self {
        self.castling = castling & 0b1111;
        self
    }

    pub fn with_en_passant(mut self, ep: Option<u8>) -> Self {
        self.ep = ep;
        self
    }

    pub fn with_clocks(mut self, halfmove: u16, fullmove: u16) -> Self {
        self.halfmove = halfmove;
        self.fullmove = fullmove;
        self
    }

    pub fn from_fen(fen: &str) -> Result<Self, DecodeError> {
        let bad = || DecodeError::Fen(fen.to_string());

        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(bad());
        }

        let mut board = [None; 64];
        let rows: Vec<&str> = parts[0].split('/').collect();
        if rows.len() != 8 {
            return Err(bad());
        }

        for (i, row) in rows.iter().rev().enumerate() {
            let mut col = 0;
            for ch in row.chars() {
                if ('1'..='8').contains(&ch) {
                    col += ch.to_digit(10).ok_or_else(bad)? as usize;
                } else {
                    let piece = Piece::from_fen_char(ch).ok_or_else(bad)?;
                    if col >= 8 {
                        return Err(bad());
                    }
                    board[8 * i + col] = Some(piece);
                    col += 1;
                }
            }

            if col != 8 {
                return Err(bad());
            }
        }

        let stm = match parts[1] {
            "w" => Colour::White,
            "b" => Colour::Black,
            _ => return Err(bad()),
        };

        let mut castling = 0;
        if parts[2] != "-" {
            for ch in parts[2].chars() {
                let &(bit, _) = CASTLING_CHARS.iter().find(|(_, c)| *c == ch).ok_or_else(bad)?;
                castling |= bit;
            }
        }

        let ep = match parts[3] {
            "-" => None,
            sq => Some(parse_square(sq).ok_or_else(bad)?),
        };

        let halfmove = parts.get(4).map_or(Ok(0), |x| x.parse::<u16>()).map_err(|_| bad())?;
        let fullmove = parts.get(5).map_or(Ok(1), |x| x.parse::<u16>()).map_err(|_| bad())?;

        Ok(Self { board, stm, castling, ep, halfmove, fullmove })
    }

    pub fn fen(&self) -> String {
        self.to_string()
    }

    pub fn piece_at(&self, sq: u8) -> Option<Piece> {
        self.board[usize::from(sq)]
    }

    pub fn side_to_move(&self) -> Colour {
        self.stm
    }

    pub fn castling(&self) -> u8 {
        self.castling
    }

    pub fn en_passant(&self) -> Option<u8> {
        self.ep
    }

    pub fn halfmove(&self) -> u16 {
        self.halfmove
    }

    pub fn fullmove(&self) -> u16 {
        self.fullmove
    }

    pub fn occupancy(&self) -> u64 {
        self.board.iter().enumerate().filter(|(_, pc)| pc.is_some()).fold(0, |occ, (sq, _)| occ | 1 << sq)
    }

    pub fn king_square(&self, colour: Colour) -> Option<u8> {
        let king = Piece::new(colour, PieceType::King);
        self.board.iter().position(|&pc| pc == Some(king)).map(|sq| sq as u8)
    }

    /// At most 32 pieces and exactly one king per side.
    pub fn check_material(&self) -> Result<(), DecodeError> {
        let pieces = self.occupancy().count_ones();
        if pieces > 32 {
            return Err(DecodeError::TooManyPieces(pieces));
        }

        for (colour, name) in [(Colour::White, "white"), (Colour::Black, "black")] {
            let king = Piece::new(colour, PieceType::King);
            match self.board.iter().filter(|&&pc| pc == Some(king)).count() {
                0 => return Err(DecodeError::MissingKing(name)),
                1 => {}
                _ => return Err(DecodeError::IllegalPosition(self.fen())),
            }
        }

        Ok(())
    }

    /// Mirrors the board vertically and swaps colours, so the side to move
    /// becomes the other colour with an identical game state.
    pub fn flipped(&self) -> Self {
        let mut board = [None; 64];
        for (sq, pc) in self.board.iter().enumerate() {
            board[sq ^ 56] = pc.map(Piece::flipped);
        }

        Self {
            board,
            stm: self.stm.flip(),
            castling: ((self.castling & 3) << 2) | (self.castling >> 2),
            ep: self.ep.map(|sq| sq ^ 56),
            halfmove: self.halfmove,
            fullmove: self.fullmove,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.board[8 * rank + file] {
                    Some(pc) => {
                        if empty > 0 {
                            write!(f, "{empty}")?;
                            empty = 0;
                        }
                        write!(f, "{}", pc.fen_char())?;
                    }
                    None => empty += 1,
                }
            }

            if empty > 0 {
                write!(f, "{empty}")?;
            }

            if rank > 0 {
                write!(f, "/")?;
            }
        }

        let stm = match self.stm {
            Colour::White => 'w',
            Colour::Black => 'b',
        };

        write!(f, " {stm} ")?;

        if self.castling == 0 {
            write!(f, "-")?;
        } else {
            for (bit, ch) in CASTLING_CHARS {
                if self.castling & bit > 0 {
                    write!(f, "{ch}")?;
                }
            }
        }

        match self.ep {
            Some(sq) => write!(f, " {}", square_name(sq))?,
            None => write!(f, " -")?,
        }

        write!(f, " {} {}", self.halfmove, self.fullmove)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveKind {
    Normal,
    Promotion,
    Castle,
    EnPassant,
}

/// A move in UCI convention: castling is stored as the king's two-square move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Move {
    pub from: u8,
    pub to: u8,
    pub promotion: Option<PieceType>,
    pub kind: MoveKind,
}

impl Move {
    pub fn new(from: u8, to: u8, promotion: Option<PieceType>, kind: MoveKind) -> Self {
        Self { from, to, promotion, kind }
    }

    /// Parses a UCI move played from `pos`, `0000` being the absence of a move.
    pub fn from_uci(uci: &str, pos: &Position) -> Result<Option<Self>, ParseError> {
        if uci == "0000" {
            return Ok(None);
        }

        let bad = || ParseError::Move(uci.to_string());

        if !(4..=5).contains(&uci.len()) || !uci.is_ascii() {
            return Err(bad());
        }

        let from = parse_square(&uci[0..2]).ok_or_else(bad)?;
        let to = parse_square(&uci[2..4]).ok_or_else(bad)?;
        let promotion = match uci[4..].chars().next() {
            Some(ch) => Some(PieceType::from_promotion_char(ch).ok_or_else(bad)?),
            None => None,
        };

        Ok(Some(Self::classified(from, to, promotion, pos)))
    }

    pub fn classified(from: u8, to: u8, promotion: Option<PieceType>, pos: &Position) -> Self {
        let moved = pos.piece_at(from).map(|pc| pc.piece_type);
        let kind = if promotion.is_some() {
            MoveKind::Promotion
        } else if moved == Some(PieceType::King) && (from % 8).abs_diff(to % 8) == 2 {
            MoveKind::Castle
        } else if moved == Some(PieceType::Pawn) && Some(to) == pos.en_passant() && from % 8 != to % 8 {
            MoveKind::EnPassant
        } else {
            MoveKind::Normal
        };

        Self { from, to, promotion, kind }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", square_name(self.from), square_name(self.to))?;
        if let Some(pt) = self.promotion {
            write!(f, "{}", pt.promotion_char())?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameResult {
    Loss,
    Draw,
    Win,
}

impl GameResult {
    pub fn from_i8(value: i8) -> Option<Self> {
        match value {
            -1 => Some(Self::Loss),
            0 => Some(Self::Draw),
            1 => Some(Self::Win),
            _ => None,
        }
    }

    pub fn as_i8(self) -> i8 {
        self as i8 - 1
    }

    /// Index used by the binary format and result tallies: loss, draw, win.
    pub fn idx(self) -> usize {
        self as usize
    }

    pub fn from_idx(idx: u8) -> Option<Self> {
        match idx {
            0 => Some(Self::Loss),
            1 => Some(Self::Draw),
            2 => Some(Self::Win),
            _ => None,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Self::Loss => Self::Win,
            Self::Draw => Self::Draw,
            Self::Win => Self::Loss,
        }
    }
}

/// One training example. Score and result are relative to the side to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrainingRecord {
    pub position: Position,
    pub mv: Option<Move>,
    pub score: i16,
    pub result: GameResult,
    pub ply: u16,
}

impl TrainingRecord {
    pub fn is_mate_score(&self) -> bool {
        is_mate_score(self.score)
    }
}
