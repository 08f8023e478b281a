#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Instruction relay that thins the event stream for narration sinks.
//!
//! Core events are translated into short spoken-style [`Instruction`] values.
//! An [`InstructionFilter`] then decides which of them are worth forwarding to
//! a text-to-speech engine or network peer: an instruction must recur within a
//! sliding window before it is repeated to the user, and the same instruction
//! is never forwarded twice in a row.

use std::{collections::VecDeque, fmt};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wayfinder_core::{Direction, Event, ObstacleKind};

/// Guidance surfaced to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Step in the given direction.
    Move(Direction),
    /// An object of the given kind is adjacent.
    ObjectNearby(ObstacleKind),
    /// No path exists right now; waiting.
    Blocked,
    /// The destination has been reached.
    Arrived,
    /// The destination cannot be reached.
    Stuck,
}

impl Instruction {
    /// Translates a core event into an instruction, when it carries guidance.
    #[must_use]
    pub fn from_event(event: &Event) -> Option<Self> {
        match *event {
            Event::AgentStepped { direction, .. } => Some(Self::Move(direction)),
            Event::NeighborDetected { kind, .. } => Some(Self::ObjectNearby(kind)),
            Event::AgentBlocked { .. } => Some(Self::Blocked),
            Event::Arrived { .. } => Some(Self::Arrived),
            Event::Stuck { .. } => Some(Self::Stuck),
            _ => None,
        }
    }

    /// Terminal outcomes bypass the repeat threshold.
    #[must_use]
    pub const fn always_forward(&self) -> bool {
        matches!(self, Self::Arrived | Self::Stuck)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move(direction) => {
                let heading = match direction {
                    Direction::North => "up",
                    Direction::East => "right",
                    Direction::South => "down",
                    Direction::West => "left",
                };
                write!(f, "Move {heading}.")
            }
            Self::ObjectNearby(kind) => write!(f, "Nearby object: {}.", kind.name()),
            Self::Blocked => f.write_str("Path blocked, waiting."),
            Self::Arrived => f.write_str("Destination reached."),
            Self::Stuck => f.write_str("No path to the destination."),
        }
    }
}

/// Invalid relay thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RelayConfigError {
    /// The sliding window must hold at least one instruction.
    #[error("relay window must be at least 1")]
    EmptyWindow,
    /// The repeat threshold must lie in `1..=window`.
    #[error("min_repeats {min_repeats} must lie between 1 and the window size {window}")]
    RepeatsOutOfRange {
        /// Configured repeat threshold.
        min_repeats: usize,
        /// Configured window size.
        window: usize,
    },
}

/// Thresholds controlling instruction thinning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Number of recent instructions remembered.
    pub window: usize,
    /// Occurrences within the window required before forwarding.
    pub min_repeats: usize,
}

impl RelayConfig {
    /// Checks that the thresholds describe a usable filter.
    pub fn validate(&self) -> Result<(), RelayConfigError> {
        if self.window == 0 {
            return Err(RelayConfigError::EmptyWindow);
        }
        if self.min_repeats == 0 || self.min_repeats > self.window {
            return Err(RelayConfigError::RepeatsOutOfRange {
                min_repeats: self.min_repeats,
                window: self.window,
            });
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            window: 3,
            min_repeats: 2,
        }
    }
}

/// Sliding-window debounce over instructions.
#[derive(Clone, Debug)]
pub struct InstructionFilter {
    config: RelayConfig,
    history: VecDeque<Instruction>,
    last_forwarded: Option<Instruction>,
}

impl InstructionFilter {
    /// Creates a filter after validating the thresholds.
    pub fn new(config: RelayConfig) -> Result<Self, RelayConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            history: VecDeque::with_capacity(config.window),
            last_forwarded: None,
        })
    }

    /// Records `instruction` and returns it when it should be forwarded.
    pub fn offer(&mut self, instruction: Instruction) -> Option<Instruction> {
        self.history.push_back(instruction);
        while self.history.len() > self.config.window {
            let _ = self.history.pop_front();
        }

        let repeats = self
            .history
            .iter()
            .filter(|seen| **seen == instruction)
            .count();
        if !instruction.always_forward() && repeats < self.config.min_repeats {
            return None;
        }
        if self.last_forwarded == Some(instruction) {
            return None;
        }

        self.last_forwarded = Some(instruction);
        Some(instruction)
    }

    /// Translates and filters a batch of events, appending forwarded
    /// instructions to `out`.
    pub fn relay(&mut self, events: &[Event], out: &mut Vec<Instruction>) {
        for event in events {
            if let Some(instruction) = Instruction::from_event(event) {
                if let Some(forwarded) = self.offer(instruction) {
                    out.push(forwarded);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfinder_core::{CellCoord, MobileKind};

    fn filter(window: usize, min_repeats: usize) -> InstructionFilter {
        InstructionFilter::new(RelayConfig {
            window,
            min_repeats,
        })
        .expect("valid config")
    }

    #[test]
    fn rejects_invalid_thresholds() {
        assert_eq!(
            RelayConfig {
                window: 0,
                min_repeats: 1
            }
            .validate(),
            Err(RelayConfigError::EmptyWindow)
        );
        assert!(InstructionFilter::new(RelayConfig {
            window: 3,
            min_repeats: 4
        })
        .is_err());
        assert!(RelayConfig {
            window: 3,
            min_repeats: 0
        }
        .validate()
        .is_err());
        assert!(RelayConfig::default().validate().is_ok());
    }

    #[test]
    fn instruction_must_recur_within_window() {
        let mut filter = filter(3, 2);
        let east = Instruction::Move(Direction::East);
        let south = Instruction::Move(Direction::South);

        assert_eq!(filter.offer(east), None);
        assert_eq!(filter.offer(south), None);
        assert_eq!(filter.offer(east), Some(east));
        assert_eq!(filter.offer(east), None, "duplicate forward suppressed");
        assert_eq!(filter.offer(south), None, "south fell out of the window");
        assert_eq!(filter.offer(south), Some(south));
    }

    #[test]
    fn terminal_outcomes_bypass_threshold() {
        let mut filter = filter(3, 3);

        assert_eq!(filter.offer(Instruction::Arrived), Some(Instruction::Arrived));
        assert_eq!(filter.offer(Instruction::Arrived), None);
    }

    #[test]
    fn single_repeat_threshold_only_deduplicates() {
        let mut filter = filter(1, 1);
        let west = Instruction::Move(Direction::West);

        assert_eq!(filter.offer(west), Some(west));
        assert_eq!(filter.offer(west), None);
        assert_eq!(filter.offer(Instruction::Blocked), Some(Instruction::Blocked));
        assert_eq!(filter.offer(west), Some(west));
    }

    #[test]
    fn relays_guidance_events_only() {
        let mut filter = filter(2, 1);
        let events = [
            Event::TickStarted { tick: 0 },
            Event::AgentStepped {
                from: CellCoord::new(0, 0),
                to: CellCoord::new(0, 1),
                direction: Direction::South,
            },
            Event::NeighborDetected {
                cell: CellCoord::new(1, 1),
                kind: ObstacleKind::Mobile(MobileKind::Dog),
            },
            Event::Arrived {
                cell: CellCoord::new(0, 1),
            },
        ];
        let mut out = Vec::new();

        filter.relay(&events, &mut out);

        assert_eq!(
            out,
            vec![
                Instruction::Move(Direction::South),
                Instruction::ObjectNearby(ObstacleKind::Mobile(MobileKind::Dog)),
                Instruction::Arrived,
            ]
        );
        assert_eq!(out[0].to_string(), "Move down.");
        assert_eq!(out[1].to_string(), "Nearby object: Dog.");
    }
}
