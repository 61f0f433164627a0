use crate::record::{GameResult, Move, TrainingRecord};

/// What the rules engine knows about a record's position.
pub trait PositionContext {
    fn is_in_check(&self) -> bool;

    fn is_capture(&self, mv: &Move) -> bool;
}

/// Filtering options for one conversion. A `None` threshold disables its filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParserSettings {
    pub filter_checks: bool,
    pub filter_captures: bool,
    pub max_score: Option<i32>,
    pub win_filter_score: Option<i32>,
    pub loss_filter_score: Option<i32>,
    pub min_ply: Option<u16>,
    pub max_pos_count: Option<usize>,
    /// Count records whose move is illegal in their position as invalid.
    pub validate_moves: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            filter_checks: true,
            filter_captures: true,
            max_score: None,
            win_filter_score: None,
            loss_filter_score: None,
            min_ply: None,
            max_pos_count: None,
            validate_moves: false,
        }
    }
}

impl ParserSettings {
    /// Keeps every record.
    pub fn unfiltered() -> Self {
        Self { filter_checks: false, filter_captures: false, ..Default::default() }
    }

    pub fn with_max_score(mut self, max_score: i32) -> Self {
        self.max_score = Some(max_score);
        self
    }

    pub fn with_win_filter_score(mut self, score: i32) -> Self {
        self.win_filter_score = Some(score);
        self
    }

    pub fn with_loss_filter_score(mut self, score: i32) -> Self {
        self.loss_filter_score = Some(score);
        self
    }

    pub fn with_min_ply(mut self, min_ply: u16) -> Self {
        self.min_ply = Some(min_ply);
        self
    }

    pub fn with_position_limit(mut self, max_pos_count: usize) -> Self {
        self.max_pos_count = Some(max_pos_count);
        self
    }

    pub fn with_move_validation(mut self) -> Self {
        self.validate_moves = true;
        self
    }
}

pub fn should_keep(record: &TrainingRecord, settings: &ParserSettings, ctx: &impl PositionContext) -> bool {
    let score = i32::from(record.score);

    if settings.filter_checks && ctx.is_in_check() {
        return false;
    }

    if settings.filter_captures && record.mv.is_some_and(|mv| ctx.is_capture(&mv)) {
        return false;
    }

    if settings.max_score.is_some_and(|max| score.abs() > max) {
        return false;
    }

    if record.result == GameResult::Win && settings.win_filter_score.is_some_and(|min| score < min) {
        return false;
    }

    if record.result == GameResult::Loss && settings.loss_filter_score.is_some_and(|max| score > max) {
        return false;
    }

    if settings.min_ply.is_some_and(|min| record.ply < min) {
        return false;
    }

    true
}
