use anyhow::Context;
use bullet_convert::{
    format::{BinLayout, BinReader},
    DecodeError,
};
use structopt::StructOpt;

use std::{path::PathBuf, time::Instant};

#[derive(StructOpt)]
pub struct ValidateOptions {
    #[structopt(required = true, short, long)]
    input: PathBuf,
    #[structopt(long, default_value = "padded")]
    bin_layout: BinLayout,
}

fn error_kind(err: &DecodeError) -> usize {
    match err {
        DecodeError::TooManyPieces(_) => 0,
        DecodeError::UnknownPieceCode { .. } => 1,
        DecodeError::StrayPieceData => 2,
        DecodeError::OurKingSquare(_) => 3,
        DecodeError::OppKingSquare(_) => 4,
        DecodeError::BadResult(_) => 5,
        _ => 6,
    }
}

impl ValidateOptions {
    pub fn run(&self) -> anyhow::Result<()> {
        let mut reader = BinReader::open(&self.input, self.bin_layout)
            .with_context(|| format!("Failed to open {}.", self.input.display()))?;

        let mut done = 0usize;
        let timer = Instant::now();
        let mut results = [0u64; 3];

        let mut invalid = [0u64; 7];
        let mut found = false;

        while let Some(board) = reader.next_board().with_context(|| "Failed to read record.")? {
            done += 1;

            match board.validate() {
                Ok(()) => results[board.result_idx()] += 1,
                Err(err) => {
                    if !found {
                        found = true;
                        log::warn!("There is at least one invalid position! Record {done}: {err}");
                    }

                    invalid[error_kind(&err)] += 1;
                }
            }

            if done % 10_000_000 == 0 {
                log::info!("Checked {done} Positions");
            }
        }

        let msgs = [
            "Too many pieces on the board",
            "Unknown piece code",
            "Piece data past occupancy",
            "Stm king square mismatch",
            "Nstm king square mismatch",
            "Invalid game result",
            "Other",
        ];

        println!();
        println!("SUMMARY:");
        println!("Checked {done} Positions in {:.2} seconds", timer.elapsed().as_secs_f32());

        let total = results.iter().sum::<u64>().max(1);
        let w = results[2] * 100 / total;
        let d = results[1] * 100 / total;
        let l = results[0] * 100 / total;
        println!("Wins: {w}%, Draws: {d}%, Losses: {l}%");

        let total_invalid = invalid.iter().sum::<u64>();
        if total_invalid > 0 {
            println!();
            println!("ERRORS:");
            for (&count, msg) in invalid.iter().zip(msgs.iter()) {
                println!("{msg: <35} : {count}");
            }
            println!("--------------------------------");
            println!("Total invalid records: {total_invalid}");
        } else {
            println!("No invalid positions!")
        }

        Ok(())
    }
}
