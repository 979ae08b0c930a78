use serde::{Deserialize, Serialize};

use awc_core::types::KanbanCard;

/// Cards for a single project, grouped by column — the shape `getBoard`
/// returns. Each group is already ordered by `position` ascending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    pub backlog: Vec<KanbanCard>,
    pub in_progress: Vec<KanbanCard>,
    pub done: Vec<KanbanCard>,
}

impl Board {
    pub fn from_cards(cards: Vec<KanbanCard>) -> Self {
        let mut board = Board::default();
        for card in cards {
            match card.column {
                awc_core::types::Column::Backlog => board.backlog.push(card),
                awc_core::types::Column::InProgress => board.in_progress.push(card),
                awc_core::types::Column::Done => board.done.push(card),
            }
        }
        board
    }
}
