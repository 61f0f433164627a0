pub mod bin;
pub mod binpack;
pub mod plain;

use std::{
    fmt,
    fs::{File, OpenOptions},
    io,
    path::Path,
};

use crate::{error::ConvertError, record::TrainingRecord};

pub use bin::{BinCodec, BinLayout, BinReader, BinWriter, ChessBoard};
pub use binpack::{BinpackReader, PackedCodec, SfBinpack};
pub use plain::{PlainReader, PlainWriter};

pub type RecordResult = Result<TrainingRecord, ConvertError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Plain,
    Bin,
    Binpack,
}

impl Format {
    pub const ALL: [Self; 3] = [Self::Plain, Self::Bin, Self::Binpack];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Plain => ".plain",
            Self::Bin => ".bin",
            Self::Binpack => ".binpack",
        }
    }

    /// Case-sensitive suffix match on the path's textual form.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref().to_string_lossy();
        Self::ALL.into_iter().find(|format| path.ends_with(format.extension()))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.extension()[1..])
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OpenMode {
    #[default]
    Truncate,
    Append,
}

impl OpenMode {
    pub fn open(self, path: impl AsRef<Path>) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.create(true);

        match self {
            Self::Truncate => options.write(true).truncate(true),
            Self::Append => options.append(true),
        };

        options.open(path)
    }
}

/// Destination side of a conversion: accepts records in order.
pub trait RecordWriter {
    fn write_record(&mut self, record: &TrainingRecord) -> Result<(), ConvertError>;

    fn flush(&mut self) -> Result<(), ConvertError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_extensions() {
        assert_eq!(Format::from_path("data/a.plain"), Some(Format::Plain));
        assert_eq!(Format::from_path("data/a.bin"), Some(Format::Bin));
        assert_eq!(Format::from_path("data/a.binpack"), Some(Format::Binpack));
        assert_eq!(Format::from_path("data/a.BIN"), None);
        assert_eq!(Format::from_path("data/a.bin.txt"), None);
        assert_eq!(Format::from_path("plain"), None);
    }

    #[test]
    fn display() {
        assert_eq!(Format::Binpack.to_string(), "binpack");
    }
}
