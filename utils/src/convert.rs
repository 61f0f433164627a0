use std::path::PathBuf;

use anyhow::Context;
use bullet_convert::{BinLayout, ConvertRequest, OpenMode, ParserSettings};
use structopt::StructOpt;

#[derive(StructOpt)]
pub struct ConvertOptions {
    #[structopt(required = true, short, long)]
    input: PathBuf,
    #[structopt(required = true, short, long)]
    output: PathBuf,
    /// Add to the end of the output instead of overwriting it.
    #[structopt(long)]
    append: bool,
    #[structopt(long)]
    max_score: Option<u32>,
    /// Drop wins scored below this.
    #[structopt(long, allow_hyphen_values = true)]
    win_filter_score: Option<i32>,
    /// Drop losses scored above this.
    #[structopt(long, allow_hyphen_values = true)]
    loss_filter_score: Option<i32>,
    #[structopt(long)]
    min_ply: Option<u16>,
    #[structopt(long)]
    max_positions: Option<usize>,
    #[structopt(long)]
    keep_checks: bool,
    #[structopt(long)]
    keep_captures: bool,
    /// Count records with an illegal move as invalid.
    #[structopt(long)]
    validate: bool,
    #[structopt(long, default_value = "padded")]
    bin_layout: BinLayout,
}

impl ConvertOptions {
    fn settings(&self) -> anyhow::Result<ParserSettings> {
        let mut settings = ParserSettings {
            filter_checks: !self.keep_checks,
            filter_captures: !self.keep_captures,
            min_ply: self.min_ply,
            max_pos_count: self.max_positions,
            win_filter_score: self.win_filter_score,
            loss_filter_score: self.loss_filter_score,
            validate_moves: self.validate,
            ..ParserSettings::default()
        };

        if let Some(max) = self.max_score {
            let max = i32::try_from(max).with_context(|| "Invalid number for score filtering")?;
            settings = settings.with_max_score(max);
        }

        Ok(settings)
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let request = ConvertRequest {
            input: self.input.clone(),
            output: self.output.clone(),
            mode: if self.append { OpenMode::Append } else { OpenMode::Truncate },
            settings: self.settings()?,
            layout: self.bin_layout,
        };

        request.run().with_context(|| format!("Failed to convert {}.", self.input.display()))?;

        Ok(())
    }
}
