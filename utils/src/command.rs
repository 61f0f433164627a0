use std::io::{self, BufRead};

use bullet_convert::command::run_command;
use structopt::StructOpt;

/// Reads `convert ...` lines from stdin and runs them one after another.
#[derive(StructOpt)]
pub struct CommandOptions {}

impl CommandOptions {
    pub fn run(&self) -> anyhow::Result<()> {
        for line in io::stdin().lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            run_command(&line);
        }

        Ok(())
    }
}
