mod command;
mod convert;
mod validate;

use structopt::StructOpt;

#[derive(StructOpt)]
pub enum Options {
    Convert(convert::ConvertOptions),
    Validate(validate::ValidateOptions),
    Command(command::CommandOptions),
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Options::from_args() {
        Options::Convert(options) => options.run(),
        Options::Validate(options) => options.run(),
        Options::Command(options) => options.run(),
    }
}
