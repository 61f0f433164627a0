use crate::{
    error::ParseError,
    record::{mate_in, GameResult, Value, MAX_PLY, PAWN_VALUE_EG},
};

/// Parses a pgn-extract evaluation token.
///
/// ```text
/// 0.25 -->  0.25 * PawnValueEg
/// #-4  --> -mate_in(4)
/// #3   -->  mate_in(3)
/// -M4  --> -mate_in(4)
/// +M3  -->  mate_in(3)
/// ```
///
/// Mate distances must lie in `0..=MAX_PLY`. Anything else, including
/// trailing characters after a number, is an error.
pub fn parse_score_from_pgn_extract(eval: &str) -> Result<Value, ParseError> {
    let bad = || ParseError::Score(eval.to_string());

    let mate = |distance: &str| -> Result<Value, ParseError> {
        match distance.parse::<Value>() {
            Ok(n) if (0..=MAX_PLY).contains(&n) => Ok(mate_in(n)),
            _ => Err(bad()),
        }
    };

    if let Some(rest) = eval.strip_prefix('#') {
        match rest.strip_prefix('-') {
            Some(distance) => mate(distance).map(|v| -v),
            None => mate(rest),
        }
    } else if let Some(distance) = eval.strip_prefix("-M") {
        mate(distance).map(|v| -v)
    } else if let Some(distance) = eval.strip_prefix("+M") {
        mate(distance)
    } else {
        let value = eval.parse::<f64>().map_err(|_| bad())?;

        if !value.is_finite() {
            return Err(bad());
        }

        Ok((value * f64::from(PAWN_VALUE_EG)) as Value)
    }
}

/// Maps a quoted pgn-extract result to the outcome from white's point of view.
pub fn parse_game_result_from_pgn_extract(result: &str) -> GameResult {
    match result {
        "\"1-0\"" => GameResult::Win,
        "\"0-1\"" => GameResult::Loss,
        _ => GameResult::Draw,
    }
}

pub fn score_to_record(value: Value) -> Result<i16, ParseError> {
    i16::try_from(value).map_err(|_| ParseError::ScoreRange(value))
}

pub fn is_like_fen(fen: &str) -> bool {
    let count_space = fen.chars().filter(|&ch| ch == ' ').count();
    let count_slash = fen.chars().filter(|&ch| ch == '/').count();

    count_space == 5 && count_slash == 7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_scores() {
        assert_eq!(parse_score_from_pgn_extract("#3"), Ok(mate_in(3)));
        assert_eq!(parse_score_from_pgn_extract("#-4"), Ok(-mate_in(4)));
        assert_eq!(parse_score_from_pgn_extract("-M4"), Ok(-mate_in(4)));
        assert_eq!(parse_score_from_pgn_extract("+M3"), Ok(mate_in(3)));
    }

    #[test]
    fn pawn_scores() {
        assert_eq!(parse_score_from_pgn_extract("0.25"), Ok(52));
        assert_eq!(parse_score_from_pgn_extract("-1.5"), Ok(-312));
        assert_eq!(parse_score_from_pgn_extract("2"), Ok(416));
        assert_eq!(parse_score_from_pgn_extract("0.001"), Ok(0));
    }

    #[test]
    fn malformed_scores() {
        for token in ["abc", "", "0.25x", "#", "#-", "#x", "+M", "-Mfoo", "inf", "NaN"] {
            assert_eq!(parse_score_from_pgn_extract(token), Err(ParseError::Score(token.to_string())), "{token}");
        }
    }

    #[test]
    fn mate_distance_bounds() {
        assert_eq!(parse_score_from_pgn_extract("#246"), Ok(mate_in(MAX_PLY)));
        assert_eq!(parse_score_from_pgn_extract("-M0"), Ok(-mate_in(0)));

        for token in ["#--2147483648", "+M-2147483648", "#-2147483648", "#247", "-M-1", "#99999999999"] {
            assert_eq!(parse_score_from_pgn_extract(token), Err(ParseError::Score(token.to_string())), "{token}");
        }
    }

    #[test]
    fn results() {
        assert_eq!(parse_game_result_from_pgn_extract("\"1-0\"").as_i8(), 1);
        assert_eq!(parse_game_result_from_pgn_extract("\"0-1\"").as_i8(), -1);
        assert_eq!(parse_game_result_from_pgn_extract("\"1/2-1/2\"").as_i8(), 0);
        assert_eq!(parse_game_result_from_pgn_extract("1-0").as_i8(), 0);
    }

    #[test]
    fn record_range() {
        assert_eq!(score_to_record(mate_in(1)), Ok(31999));
        assert_eq!(score_to_record(100_000), Err(ParseError::ScoreRange(100_000)));
    }

    #[test]
    fn fen_shape() {
        assert!(is_like_fen(crate::record::Position::STARTPOS));
        assert!(!is_like_fen("8/8/8/8 w - - 0 1"));
        assert!(!is_like_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -"));
    }
}
