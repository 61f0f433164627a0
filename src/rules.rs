use std::str::FromStr;

use chess::{Board, ChessMove, Piece as ChessPiece, ALL_SQUARES};

use crate::{
    error::DecodeError,
    filter::PositionContext,
    record::{Move, PieceType, Position},
};

/// Check, capture and legality answers from the `chess` crate's board.
pub struct BoardContext {
    board: Board,
}

impl BoardContext {
    pub fn new(position: &Position) -> Result<Self, DecodeError> {
        position.check_material()?;

        let fen = position.fen();
        let board = Board::from_str(&fen).map_err(|_| DecodeError::IllegalPosition(fen))?;
        Ok(Self { board })
    }

    pub fn is_legal(&self, mv: &Move) -> bool {
        let promotion = mv.promotion.map(|pt| match pt {
            PieceType::Pawn => ChessPiece::Pawn,
            PieceType::Knight => ChessPiece::Knight,
            PieceType::Bishop => ChessPiece::Bishop,
            PieceType::Rook => ChessPiece::Rook,
            PieceType::Queen => ChessPiece::Queen,
            PieceType::King => ChessPiece::King,
        });

        let chess_move = ChessMove::new(ALL_SQUARES[usize::from(mv.from)], ALL_SQUARES[usize::from(mv.to)], promotion);
        self.board.legal(chess_move)
    }
}

impl PositionContext for BoardContext {
    fn is_in_check(&self) -> bool {
        self.board.checkers().popcnt() > 0
    }

    fn is_capture(&self, mv: &Move) -> bool {
        let from = ALL_SQUARES[usize::from(mv.from & 63)];
        let to = ALL_SQUARES[usize::from(mv.to & 63)];

        if self.board.color_on(to) == Some(!self.board.side_to_move()) {
            return true;
        }

        // a pawn moving diagonally onto an empty square takes en passant
        self.board.piece_on(from) == Some(ChessPiece::Pawn)
            && self.board.piece_on(to).is_none()
            && mv.from % 8 != mv.to % 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::parse_square;

    fn context(fen: &str) -> BoardContext {
        BoardContext::new(&Position::from_fen(fen).unwrap()).unwrap()
    }

    fn uci(fen: &str, mv: &str) -> Move {
        Move::from_uci(mv, &Position::from_fen(fen).unwrap()).unwrap().unwrap()
    }

    #[test]
    fn checks() {
        assert!(!context(Position::STARTPOS).is_in_check());
        assert!(context("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1").is_in_check());
        assert!(context("4k3/8/8/8/1b6/8/8/4K3 w - - 0 1").is_in_check());
    }

    #[test]
    fn captures() {
        let fen = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";
        let ctx = context(fen);

        assert!(ctx.is_capture(&uci(fen, "e4d5")));
        assert!(!ctx.is_capture(&uci(fen, "e4e5")));
        assert!(!ctx.is_capture(&uci(fen, "g1f3")));

        let ep = "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3";
        assert!(context(ep).is_capture(&uci(ep, "e5f6")));
        assert!(!context(ep).is_capture(&uci(ep, "e5e6")));
    }

    #[test]
    fn legality() {
        let ctx = context(Position::STARTPOS);
        let mv = |from: &str, to: &str| {
            Move::classified(parse_square(from).unwrap(), parse_square(to).unwrap(), None, &Position::default())
        };

        assert!(ctx.is_legal(&mv("e2", "e4")));
        assert!(!ctx.is_legal(&mv("e2", "e5")));
    }

    #[test]
    fn rejects_impossible_positions() {
        let two_kings = Position::from_fen("4k3/8/8/8/8/8/8/3KK3 w - - 0 1").unwrap();
        let no_king = Position::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let opponent_in_check = Position::from_fen("4k3/8/8/8/8/8/4R3/4K3 w - - 0 1").unwrap();

        assert!(matches!(BoardContext::new(&two_kings), Err(DecodeError::IllegalPosition(_))));
        assert!(matches!(BoardContext::new(&no_king), Err(DecodeError::MissingKing("black"))));
        assert!(matches!(BoardContext::new(&opponent_in_check), Err(DecodeError::IllegalPosition(_))));
    }
}
