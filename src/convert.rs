use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use log::{debug, error, info, warn};

use crate::{
    error::ConvertError,
    filter::{should_keep, ParserSettings},
    format::{
        BinLayout, BinReader, BinWriter, Format, OpenMode, PackedCodec, PlainReader, PlainWriter, RecordResult,
        RecordWriter, SfBinpack,
    },
    record::TrainingRecord,
    rules::BoardContext,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConvertStats {
    pub read: u64,
    pub written: u64,
    pub filtered: u64,
    pub skipped: u64,
    pub invalid: u64,
    /// Written records by result: losses, draws, wins.
    pub results: [u64; 3],
    pub limit_reached: bool,
}

/// Supported conversions. Anything missing here, such as writing binpack or
/// converting a format into itself, is rejected when the pair is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conversion {
    BinpackToPlain,
    BinpackToBin,
    PlainToBin,
    BinToPlain,
}

impl Conversion {
    pub const ALL: [Self; 4] = [Self::BinpackToPlain, Self::BinpackToBin, Self::PlainToBin, Self::BinToPlain];

    pub fn new(from: Format, to: Format) -> Result<Self, ConvertError> {
        Self::ALL
            .into_iter()
            .find(|conv| conv.source() == from && conv.destination() == to)
            .ok_or(ConvertError::UnsupportedConversion { from: Some(from), to: Some(to) })
    }

    pub fn from_paths(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<Self, ConvertError> {
        match (Format::from_path(input), Format::from_path(output)) {
            (Some(from), Some(to)) => Self::new(from, to),
            (from, to) => Err(ConvertError::UnsupportedConversion { from, to }),
        }
    }

    pub fn source(self) -> Format {
        match self {
            Self::BinpackToPlain | Self::BinpackToBin => Format::Binpack,
            Self::PlainToBin => Format::Plain,
            Self::BinToPlain => Format::Bin,
        }
    }

    pub fn destination(self) -> Format {
        match self {
            Self::BinpackToPlain | Self::BinToPlain => Format::Plain,
            Self::BinpackToBin | Self::PlainToBin => Format::Bin,
        }
    }

    pub fn converter(self, layout: BinLayout) -> Box<dyn Converter> {
        match self {
            Self::BinpackToPlain => Box::new(Pipeline { source: SfBinpack, sink: PlainSink }),
            Self::BinpackToBin => Box::new(Pipeline { source: SfBinpack, sink: BinSink(layout) }),
            Self::PlainToBin => Box::new(Pipeline { source: PlainSource, sink: BinSink(layout) }),
            Self::BinToPlain => Box::new(Pipeline { source: BinSource(layout), sink: PlainSink }),
        }
    }
}

pub trait Converter {
    fn convert(
        &self,
        input: &Path,
        output: &Path,
        mode: OpenMode,
        settings: &ParserSettings,
    ) -> Result<ConvertStats, ConvertError>;
}

pub trait RecordSource {
    type Reader: Iterator<Item = RecordResult>;

    fn open(&self, path: &Path) -> Result<Self::Reader, ConvertError>;
}

pub trait RecordSink {
    type Writer: RecordWriter;

    fn create(&self, path: &Path, mode: OpenMode) -> Result<Self::Writer, ConvertError>;
}

struct PlainSource;

impl RecordSource for PlainSource {
    type Reader = PlainReader<std::io::BufReader<std::fs::File>>;

    fn open(&self, path: &Path) -> Result<Self::Reader, ConvertError> {
        PlainReader::open(path)
    }
}

struct BinSource(BinLayout);

impl RecordSource for BinSource {
    type Reader = BinReader<std::io::BufReader<std::fs::File>>;

    fn open(&self, path: &Path) -> Result<Self::Reader, ConvertError> {
        BinReader::open(path, self.0)
    }
}

impl RecordSource for SfBinpack {
    type Reader = <SfBinpack as PackedCodec>::Reader;

    fn open(&self, path: &Path) -> Result<Self::Reader, ConvertError> {
        self.decode_stream(path)
    }
}

struct PlainSink;

impl RecordSink for PlainSink {
    type Writer = PlainWriter<std::io::BufWriter<std::fs::File>>;

    fn create(&self, path: &Path, mode: OpenMode) -> Result<Self::Writer, ConvertError> {
        PlainWriter::create(path, mode)
    }
}

struct BinSink(BinLayout);

impl RecordSink for BinSink {
    type Writer = BinWriter<std::io::BufWriter<std::fs::File>>;

    fn create(&self, path: &Path, mode: OpenMode) -> Result<Self::Writer, ConvertError> {
        BinWriter::create(path, mode, self.0)
    }
}

struct Pipeline<S, D> {
    source: S,
    sink: D,
}

impl<S: RecordSource, D: RecordSink> Converter for Pipeline<S, D> {
    fn convert(
        &self,
        input: &Path,
        output: &Path,
        mode: OpenMode,
        settings: &ParserSettings,
    ) -> Result<ConvertStats, ConvertError> {
        // the input has to open cleanly before the output gets touched
        let records = self.source.open(input)?;
        let mut writer = self.sink.create(output, mode)?;

        let stats = pump(records, &mut writer, settings);
        writer.flush()?;
        stats
    }
}

/// Every record goes through the rules engine, whatever filters are on, so
/// the same input is always counted the same way.
fn accept(record: &TrainingRecord, settings: &ParserSettings, stats: &mut ConvertStats) -> bool {
    let ctx = match BoardContext::new(&record.position) {
        Ok(ctx) => ctx,
        Err(err) => {
            debug!("{err}");
            stats.invalid += 1;
            return false;
        }
    };

    if settings.validate_moves {
        if let Some(mv) = record.mv.filter(|mv| !ctx.is_legal(mv)) {
            debug!("illegal move {mv} in {}", record.position);
            stats.invalid += 1;
            return false;
        }
    }

    let keep = should_keep(record, settings, &ctx);
    if !keep {
        stats.filtered += 1;
    }

    keep
}

/// Moves records from `records` to `writer` in order, filtering on the way.
/// Stops pulling input once the position limit is hit.
pub fn pump(
    records: impl Iterator<Item = RecordResult>,
    writer: &mut impl RecordWriter,
    settings: &ParserSettings,
) -> Result<ConvertStats, ConvertError> {
    let mut stats = ConvertStats::default();
    let limit = settings.max_pos_count.map(|max| max as u64);

    if limit == Some(0) {
        stats.limit_reached = true;
        return Ok(stats);
    }

    for record in records {
        let record = match record {
            Ok(record) => record,
            Err(ConvertError::Parse(err)) => {
                warn!("Skipping record: {err}");
                stats.skipped += 1;
                continue;
            }
            Err(err) => return Err(err),
        };

        stats.read += 1;

        if !accept(&record, settings, &mut stats) {
            continue;
        }

        writer.write_record(&record)?;
        stats.written += 1;
        stats.results[record.result.idx()] += 1;

        if limit.is_some_and(|max| stats.written >= max) {
            stats.limit_reached = true;
            break;
        }
    }

    Ok(stats)
}

/// Everything needed for one conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub mode: OpenMode,
    pub settings: ParserSettings,
    pub layout: BinLayout,
}

impl ConvertRequest {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            mode: OpenMode::Truncate,
            settings: ParserSettings::default(),
            layout: BinLayout::default(),
        }
    }

    pub fn run(&self) -> Result<ConvertStats, ConvertError> {
        if !self.input.is_file() {
            return Err(ConvertError::InputNotFound(self.input.clone()));
        }

        let conversion = Conversion::from_paths(&self.input, &self.output)?;

        info!("Converting [{}] to [{}]", self.input.display(), self.output.display());
        let timer = Instant::now();

        let stats = conversion.converter(self.layout).convert(&self.input, &self.output, self.mode, &self.settings)?;

        info!("Summary: {} Positions in {:.2} seconds", stats.written, timer.elapsed().as_secs_f32());
        info!("Wins: {}, Draws: {}, Losses: {}", stats.results[2], stats.results[1], stats.results[0]);
        info!(
            "Read: {}, Filtered: {}, Invalid: {}, Skipped: {}",
            stats.read, stats.filtered, stats.invalid, stats.skipped
        );

        if stats.limit_reached {
            info!("Stopped after reaching the position limit");
        }

        info!("Written to [{}]", self.output.display());

        Ok(stats)
    }
}

/// Runs a conversion, reporting any failure on the error log instead of
/// returning it.
pub fn run_convert(request: &ConvertRequest) -> Option<ConvertStats> {
    match request.run() {
        Ok(stats) => Some(stats),
        Err(err) => {
            error!("{err}");
            None
        }
    }
}

pub fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    mode: OpenMode,
    settings: &ParserSettings,
) -> Result<ConvertStats, ConvertError> {
    let request = ConvertRequest {
        mode,
        settings: *settings,
        ..ConvertRequest::new(input.as_ref(), output.as_ref())
    };

    request.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{DecodeError, ParseError},
        record::{GameResult, Move, Position},
    };

    #[derive(Default)]
    struct VecWriter(Vec<TrainingRecord>);

    impl RecordWriter for VecWriter {
        fn write_record(&mut self, record: &TrainingRecord) -> Result<(), ConvertError> {
            self.0.push(*record);
            Ok(())
        }

        fn flush(&mut self) -> Result<(), ConvertError> {
            Ok(())
        }
    }

    const QUIET_FEN: &str = "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1";

    fn record(score: i16) -> TrainingRecord {
        TrainingRecord {
            position: Position::from_fen(QUIET_FEN).unwrap(),
            mv: None,
            score,
            result: GameResult::Draw,
            ply: 20,
        }
    }

    #[test]
    fn conversion_matrix() {
        use Format::*;

        assert_eq!(Conversion::new(Binpack, Plain).unwrap(), Conversion::BinpackToPlain);
        assert_eq!(Conversion::new(Binpack, Bin).unwrap(), Conversion::BinpackToBin);
        assert_eq!(Conversion::new(Plain, Bin).unwrap(), Conversion::PlainToBin);
        assert_eq!(Conversion::new(Bin, Plain).unwrap(), Conversion::BinToPlain);

        for (from, to) in [(Bin, Bin), (Plain, Plain), (Binpack, Binpack), (Plain, Binpack), (Bin, Binpack)] {
            assert!(matches!(
                Conversion::new(from, to),
                Err(ConvertError::UnsupportedConversion { from: Some(f), to: Some(t) }) if f == from && t == to
            ));
        }

        assert!(matches!(
            Conversion::from_paths("a.txt", "b.bin"),
            Err(ConvertError::UnsupportedConversion { from: None, to: Some(Bin) })
        ));
    }

    #[test]
    fn filters_scores_in_order() {
        let scores = [-50, -10, 0, 10, 50, 100, 150, -150, 200, -200];
        let records = scores.map(|s| Ok(record(s)));
        let settings = ParserSettings::default().with_max_score(100);

        let mut writer = VecWriter::default();
        let stats = pump(records.into_iter(), &mut writer, &settings).unwrap();

        let written: Vec<i16> = writer.0.iter().map(|r| r.score).collect();
        assert_eq!(written, [-50, -10, 0, 10, 50, 100]);
        assert_eq!(stats.written, 6);
        assert_eq!(stats.filtered, 4);
        assert_eq!(stats.results, [0, 6, 0]);
    }

    #[test]
    fn position_limit_stops_reading() {
        let mut pulled = 0;
        let records = (0..10).map(|i| {
            pulled += 1;
            Ok(record(i))
        });

        let mut writer = VecWriter::default();
        let stats = pump(records, &mut writer, &ParserSettings::default().with_position_limit(3)).unwrap();

        assert_eq!(writer.0.iter().map(|r| r.score).collect::<Vec<_>>(), [0, 1, 2]);
        assert!(stats.limit_reached);
        assert_eq!(pulled, 3);
    }

    #[test]
    fn zero_limit_writes_nothing() {
        let mut writer = VecWriter::default();
        let stats = pump([Ok(record(0))].into_iter(), &mut writer, &ParserSettings::default().with_position_limit(0));

        assert_eq!(stats.unwrap().written, 0);
        assert!(writer.0.is_empty());
    }

    #[test]
    fn parse_errors_skip_decode_errors_abort() {
        let records = vec![
            Ok(record(1)),
            Err(ParseError::Score("abc".to_string()).into()),
            Ok(record(2)),
            Err(DecodeError::Truncated(3).into()),
            Ok(record(3)),
        ];

        let mut writer = VecWriter::default();
        let result = pump(records.into_iter(), &mut writer, &ParserSettings::default());

        assert!(matches!(result, Err(ConvertError::Decode(DecodeError::Truncated(3)))));
        assert_eq!(writer.0.iter().map(|r| r.score).collect::<Vec<_>>(), [1, 2]);
    }

    fn at(fen: &str, uci: &str, score: i16) -> TrainingRecord {
        let position = Position::from_fen(fen).unwrap();
        TrainingRecord { position, mv: Move::from_uci(uci, &position).unwrap(), ..record(score) }
    }

    fn scores(writer: &VecWriter) -> Vec<i16> {
        writer.0.iter().map(|r| r.score).collect()
    }

    #[test]
    fn rules_context_filters() {
        let records = [
            at("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1", "0000", 0),
            at("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1", "e4d5", 1),
            at("8/8/8/8/8/8/4P3/8 w - - 0 1", "0000", 2),
            record(3),
        ];

        let mut writer = VecWriter::default();
        let stats = pump(records.into_iter().map(Ok), &mut writer, &ParserSettings::default()).unwrap();
        assert_eq!(scores(&writer), [3]);
        assert_eq!((stats.filtered, stats.invalid), (2, 1));

        let mut writer = VecWriter::default();
        let stats = pump(records.into_iter().map(Ok), &mut writer, &ParserSettings::unfiltered()).unwrap();
        assert_eq!(scores(&writer), [0, 1, 3]);
        assert_eq!((stats.filtered, stats.invalid), (0, 1));
    }

    #[test]
    fn broken_positions_are_invalid_under_any_filters() {
        let records = [
            record(0),
            at("4k3/8/8/8/8/8/4P3/8 w - - 0 1", "0000", 1),
            at("4k3/8/8/8/8/8/4R3/4K3 w - - 0 1", "0000", 2),
            at("4k3/8/8/8/8/8/4P3/3KK3 w - - 0 1", "0000", 3),
            record(4),
        ];

        for settings in [ParserSettings::default(), ParserSettings::unfiltered()] {
            let mut writer = VecWriter::default();
            let stats = pump(records.into_iter().map(Ok), &mut writer, &settings).unwrap();

            assert_eq!(scores(&writer), [0, 4]);
            assert_eq!((stats.written, stats.invalid), (2, 3));
        }
    }

    #[test]
    fn move_validation() {
        let records = [at(QUIET_FEN, "e2e4", 0), at(QUIET_FEN, "e2e5", 1), at(QUIET_FEN, "0000", 2)];

        let mut writer = VecWriter::default();
        let stats = pump(records.into_iter().map(Ok), &mut writer, &ParserSettings::unfiltered()).unwrap();
        assert_eq!((stats.written, stats.invalid), (3, 0));

        let settings = ParserSettings::unfiltered().with_move_validation();
        let mut writer = VecWriter::default();
        let stats = pump(records.into_iter().map(Ok), &mut writer, &settings).unwrap();
        assert_eq!(scores(&writer), [0, 2]);
        assert_eq!(stats.invalid, 1);
    }
}
