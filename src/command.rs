use std::path::PathBuf;

use crate::{
    convert::{run_convert, ConvertRequest, ConvertStats},
    error::UsageError,
    format::OpenMode,
};

/// Parses the arguments following `convert`:
/// `from_path to_path [append] [--max-score <score>]`.
pub fn parse_convert_args<S: AsRef<str>>(args: &[S]) -> Result<ConvertRequest, UsageError> {
    if !(2..=5).contains(&args.len()) {
        return Err(UsageError::InvalidArguments);
    }

    let mut request = ConvertRequest::new(PathBuf::from(args[0].as_ref()), PathBuf::from(args[1].as_ref()));
    let mut rest = args[2..].iter().map(AsRef::as_ref);

    while let Some(token) = rest.next() {
        match token {
            "append" if request.mode == OpenMode::Truncate => request.mode = OpenMode::Append,
            "--max-score" if request.settings.max_score.is_none() => {
                let value = rest.next().ok_or(UsageError::InvalidArguments)?;
                let score = value.parse::<i64>().map_err(|_| UsageError::InvalidScore(value.to_string()))?;

                if score < 0 {
                    return Err(UsageError::NegativeScore(score));
                }

                let score = i32::try_from(score).map_err(|_| UsageError::InvalidScore(value.to_string()))?;
                request.settings = request.settings.with_max_score(score);
            }
            _ => return Err(UsageError::InvalidArguments),
        }
    }

    Ok(request)
}

/// Runs one whitespace-separated command line. Only `convert` is known;
/// usage problems are logged and nothing is converted.
pub fn run_command(line: &str) -> Option<ConvertStats> {
    let tokens = line.split_whitespace().collect::<Vec<_>>();

    match tokens.split_first() {
        Some((&"convert", args)) => match parse_convert_args(args) {
            Ok(request) => run_convert(&request),
            Err(err) => {
                log::error!("{err}");
                None
            }
        },
        Some((cmd, _)) => {
            log::error!("Unknown command '{cmd}'");
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal() {
        let request = parse_convert_args(&["a.binpack", "b.plain"]).unwrap();

        assert_eq!(request.input, PathBuf::from("a.binpack"));
        assert_eq!(request.output, PathBuf::from("b.plain"));
        assert_eq!(request.mode, OpenMode::Truncate);
        assert_eq!(request.settings.max_score, None);
    }

    #[test]
    fn options_in_any_order() {
        for args in [
            vec!["a.plain", "b.bin", "append", "--max-score", "100"],
            vec!["a.plain", "b.bin", "--max-score", "100", "append"],
        ] {
            let request = parse_convert_args(&args).unwrap();
            assert_eq!(request.mode, OpenMode::Append);
            assert_eq!(request.settings.max_score, Some(100));
        }
    }

    #[test]
    fn argument_count() {
        assert_eq!(parse_convert_args(&["a.plain"]).unwrap_err(), UsageError::InvalidArguments);
        assert_eq!(
            parse_convert_args(&["a", "b", "append", "--max-score", "1", "x"]).unwrap_err(),
            UsageError::InvalidArguments
        );
    }

    #[test]
    fn bad_tokens() {
        assert_eq!(parse_convert_args(&["a", "b", "apend"]).unwrap_err(), UsageError::InvalidArguments);
        assert_eq!(parse_convert_args(&["a", "b", "append", "append"]).unwrap_err(), UsageError::InvalidArguments);
        assert_eq!(parse_convert_args(&["a", "b", "--max-score"]).unwrap_err(), UsageError::InvalidArguments);
        assert_eq!(
            parse_convert_args(&["a", "b", "--max-score", "ten"]).unwrap_err(),
            UsageError::InvalidScore("ten".to_string())
        );
        assert_eq!(parse_convert_args(&["a", "b", "--max-score", "-5"]).unwrap_err(), UsageError::NegativeScore(-5));
    }

    #[test]
    fn usage_message() {
        let msg = UsageError::InvalidArguments.to_string();
        assert!(msg.starts_with("Invalid arguments."));
        assert!(msg.contains("convert from_path to_path [append] [--max-score <score>]"));
        assert_eq!(UsageError::InvalidScore("x".into()).to_string(), "Invalid number for score filtering");
        assert_eq!(UsageError::NegativeScore(-1).to_string(), "score used for sign filtering must be positive");
    }

    #[test]
    fn unknown_command_does_nothing() {
        assert_eq!(run_command("shuffle a.bin"), None);
        assert_eq!(run_command("   "), None);
    }
}
