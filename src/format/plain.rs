//! Text records in the Stockfish "plain" layout:
//!
//! ```text
//! fen 4k3/8/8/8/8/8/4P3/4K3 w - - 0 1
//! move e2e4
//! score 34
//! ply 0
//! result 1
//! e
//! ```
//!
//! Scores may also be written as pgn-extract evaluations (`#3`, `-M4`, `0.25`)
//! and results as quoted pgn results (`"1-0"`), which are from white's point of
//! view and get converted to the side to move.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use crate::{
    error::{ConvertError, DecodeError, ParseError},
    parse::{is_like_fen, parse_game_result_from_pgn_extract, parse_score_from_pgn_extract, score_to_record},
    record::{Colour, GameResult, Move, Position, TrainingRecord},
};

use super::{OpenMode, RecordResult, RecordWriter};

pub fn parse_score_token(token: &str) -> Result<i16, ParseError> {
    match token.parse::<i16>() {
        Ok(score) => Ok(score),
        Err(_) => score_to_record(parse_score_from_pgn_extract(token)?),
    }
}

pub fn parse_result_token(token: &str, stm: Colour) -> Result<GameResult, ParseError> {
    if let Ok(value) = token.parse::<i8>() {
        return GameResult::from_i8(value).ok_or_else(|| ParseError::Result(token.to_string()));
    }

    if !token.starts_with('"') {
        return Err(ParseError::Result(token.to_string()));
    }

    let white = parse_game_result_from_pgn_extract(token);
    Ok(match stm {
        Colour::White => white,
        Colour::Black => white.flipped(),
    })
}

#[derive(Default)]
struct Block {
    start: usize,
    fen: Option<String>,
    mv: Option<String>,
    score: Option<String>,
    ply: Option<String>,
    result: Option<String>,
}

impl Block {
    fn is_empty(&self) -> bool {
        self.fen.is_none() && self.mv.is_none() && self.score.is_none() && self.ply.is_none() && self.result.is_none()
    }

    fn into_record(self) -> RecordResult {
        let start = self.start;
        let missing =
            |field: &str| DecodeError::Malformed { line: start, reason: format!("record has no '{field}' line") };

        let fen = self.fen.ok_or_else(|| missing("fen"))?;
        if !is_like_fen(&fen) {
            return Err(DecodeError::Malformed { line: start, reason: format!("'{fen}' is not a fen") }.into());
        }

        let position = Position::from_fen(&fen)?;

        let mv = match self.mv {
            Some(mv) => Move::from_uci(&mv, &position)?,
            None => None,
        };

        let score = parse_score_token(&self.score.ok_or_else(|| missing("score"))?)?;
        let result = parse_result_token(&self.result.ok_or_else(|| missing("result"))?, position.side_to_move())?;
        let ply = match self.ply {
            Some(ply) => ply.parse::<u16>().map_err(|_| ParseError::Ply(ply))?,
            None => 0,
        };

        Ok(TrainingRecord { position, mv, score, result, ply })
    }
}

/// Lazily reads `e`-terminated blocks. Bad score, result, ply or move tokens
/// come out as [`ConvertError::Parse`] for that record only; structural
/// problems end the stream with [`ConvertError::Decode`].
pub struct PlainReader<R: BufRead> {
    reader: R,
    line_no: usize,
    line: String,
    done: bool,
}

impl PlainReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> PlainReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line_no: 0, line: String::new(), done: false }
    }

    fn read_block(&mut self) -> Result<Option<Block>, ConvertError> {
        let mut block = Block::default();

        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                if block.is_empty() {
                    return Ok(None);
                }

                let reason = "unterminated record".to_string();
                return Err(DecodeError::Malformed { line: self.line_no, reason }.into());
            }

            self.line_no += 1;

            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }

            if block.is_empty() {
                block.start = self.line_no;
            }

            let (key, value) = line.split_once(' ').unwrap_or((line, ""));
            let value = Some(value.trim().to_string());

            match key {
                "fen" => block.fen = value,
                "move" => block.mv = value,
                "score" => block.score = value,
                "ply" => block.ply = value,
                "result" => block.result = value,
                "e" => return Ok(Some(block)),
                _ => {
                    let reason = format!("unknown key '{key}'");
                    return Err(DecodeError::Malformed { line: self.line_no, reason }.into());
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for PlainReader<R> {
    type Item = RecordResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let record = match self.read_block() {
            Ok(Some(block)) => block.into_record(),
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(err) => Err(err),
        };

        if let Err(ConvertError::Decode(_) | ConvertError::Io(_)) = record {
            self.done = true;
        }

        Some(record)
    }
}

pub struct PlainWriter<W: Write> {
    writer: W,
}

impl PlainWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self, ConvertError> {
        Ok(Self::new(BufWriter::new(mode.open(path)?)))
    }
}

impl<W: Write> PlainWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordWriter for PlainWriter<W> {
    fn write_record(&mut self, record: &TrainingRecord) -> Result<(), ConvertError> {
        let mv = record.mv.map_or_else(|| "0000".to_string(), |mv| mv.to_string());

        writeln!(self.writer, "fen {}", record.position)?;
        writeln!(self.writer, "move {mv}")?;
        writeln!(self.writer, "score {}", record.score)?;
        writeln!(self.writer, "ply {}", record.ply)?;
        writeln!(self.writer, "result {}", record.result.as_i8())?;
        writeln!(self.writer, "e")?;

        Ok(())
    }

    fn flush(&mut self) -> Result<(), ConvertError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{mate_in, MoveKind};

    const TEXT: &str = "\
fen rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1
move e2e4
score 34
ply 0
result 1
e
fen rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1
move e7e5
score -20
ply 1
result -1
e
";

    fn read(text: &str) -> Vec<RecordResult> {
        PlainReader::new(text.as_bytes()).collect()
    }

    #[test]
    fn reads_blocks() {
        let records: Vec<_> = read(TEXT).into_iter().map(Result::unwrap).collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].position.fen(), Position::STARTPOS);
        assert_eq!(records[0].mv.unwrap().to_string(), "e2e4");
        assert_eq!(records[0].mv.unwrap().kind, MoveKind::Normal);
        assert_eq!(records[0].score, 34);
        assert_eq!(records[0].result, GameResult::Win);
        assert_eq!(records[1].score, -20);
        assert_eq!(records[1].ply, 1);
        assert_eq!(records[1].result, GameResult::Loss);
    }

    #[test]
    fn write_then_read_text() {
        let records: Vec<_> = read(TEXT).into_iter().map(Result::unwrap).collect();

        let mut writer = PlainWriter::new(Vec::new());
        for record in &records {
            writer.write_record(record).unwrap();
        }

        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text, TEXT);
    }

    #[test]
    fn pgn_extract_tokens() {
        let text = "\
fen 4k3/8/8/8/8/8/4P3/4K3 b - - 0 1
move e8d8
score #3
result \"1-0\"
e
";
        let record = read(text).remove(0).unwrap();

        assert_eq!(i32::from(record.score), mate_in(3));
        assert_eq!(record.result, GameResult::Loss);
        assert_eq!(record.ply, 0);
    }

    #[test]
    fn bad_tokens_skip_one_record() {
        let text = TEXT.replace("score 34", "score abc");
        let records = read(&text);

        assert_eq!(records.len(), 2);
        assert!(matches!(&records[0], Err(ConvertError::Parse(ParseError::Score(s))) if s == "abc"));
        assert!(records[1].is_ok());

        assert_eq!(parse_score_token("100000"), Err(ParseError::ScoreRange(20_800_000)));
        assert!(parse_result_token("2", Colour::White).is_err());
        assert!(parse_result_token("win", Colour::White).is_err());
    }

    #[test]
    fn structural_errors_stop_reading() {
        let text = TEXT.replace("ply 0", "plies 0");
        let records = read(&text);

        assert_eq!(records.len(), 1);
        assert!(matches!(records[0], Err(ConvertError::Decode(DecodeError::Malformed { line: 4, .. }))));

        let unterminated = read("fen 4k3/8/8/8/8/8/4P3/4K3 w - - 0 1\nscore 1\nresult 0\n");
        assert!(matches!(unterminated[0], Err(ConvertError::Decode(DecodeError::Malformed { .. }))));

        let bad_fen = read("fen 4k3/8/8 w - - 0 1\nscore 1\nresult 0\ne\n");
        assert!(matches!(bad_fen[0], Err(ConvertError::Decode(DecodeError::Malformed { line: 1, .. }))));
    }
}
