//! Value types for a single round: moves, player slots, round results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A hand shown in one round.
///
/// `NoMove` is the "not submitted yet" sentinel. It is what every slot of
/// an unplayed round holds, and what a tied round is reset to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub enum Move {
    #[default]
    NoMove,
    Rock,
    Paper,
    Scissors,
}

impl Move {
    /// Returns `true` for a real hand (anything but `NoMove`).
    pub fn is_played(self) -> bool {
        !matches!(self, Self::NoMove)
    }

    /// Returns `true` if `self` wins against `other`.
    ///
    /// Rock beats Scissors, Paper beats Rock, Scissors beats Paper.
    /// `NoMove` never beats and is never beaten.
    pub fn beats(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Rock, Self::Scissors)
                | (Self::Paper, Self::Rock)
                | (Self::Scissors, Self::Paper)
        )
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMove => write!(f, "NoMove"),
            Self::Rock => write!(f, "Rock"),
            Self::Paper => write!(f, "Paper"),
            Self::Scissors => write!(f, "Scissors"),
        }
    }
}

/// Which of the two seats of a room a player occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerSlot {
    Player1,
    Player2,
}

impl PlayerSlot {
    /// Both slots, in seat order.
    pub const ALL: [PlayerSlot; 2] = [PlayerSlot::Player1, PlayerSlot::Player2];
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player1 => write!(f, "player1"),
            Self::Player2 => write!(f, "player2"),
        }
    }
}

/// The two hands of one round.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub struct RoundResult {
    pub player1_move: Move,
    pub player2_move: Move,
}

impl RoundResult {
    /// Returns the move stored for `slot`.
    pub fn get(&self, slot: PlayerSlot) -> Move {
        match slot {
            PlayerSlot::Player1 => self.player1_move,
            PlayerSlot::Player2 => self.player2_move,
        }
    }

    pub(crate) fn set(&mut self, slot: PlayerSlot, mv: Move) {
        match slot {
            PlayerSlot::Player1 => self.player1_move = mv,
            PlayerSlot::Player2 => self.player2_move = mv,
        }
    }

    /// Returns `true` once both players have shown a hand.
    pub fn is_complete(&self) -> bool {
        self.player1_move.is_played() && self.player2_move.is_played()
    }

    /// Returns the slot that won this round, if it was decisive.
    ///
    /// Incomplete rounds and ties have no winner.
    pub fn winner(&self) -> Option<PlayerSlot> {
        if self.player1_move.beats(self.player2_move) {
            Some(PlayerSlot::Player1)
        } else if self.player2_move.beats(self.player1_move) {
            Some(PlayerSlot::Player2)
        } else {
            None
        }
    }
}
