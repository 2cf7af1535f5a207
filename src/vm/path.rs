//! This module contains the definition of [`ExecutionPath`], one divergent
//! exploration of the program, and the speculative frames it carries.

use crate::vm::state::Configuration;

/// The saved context of one mispredicted branch: everything needed to
/// return the path to the architecturally correct continuation when the
/// speculation window closes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SpeculativeFrame {
    /// The frame's identifier, unique within its path; `start` and
    /// `rollback` observations reference it.
    pub id: usize,

    /// The number of steps this frame may still execute transiently. The
    /// innermost frame's window shrinks by one per retired step, and the
    /// frame is closed once it reaches zero.
    pub remaining_window: i64,

    /// The address of the mispredicted branch.
    pub start_pc: u32,

    /// A clone of the configuration at the instant just before the branch
    /// retired. Rollback restores its registers and memory.
    pub saved: Configuration,

    /// The architecturally correct successor's program counter, where
    /// control resumes on rollback.
    pub correct_pc: u32,
}

/// One execution path: its current configuration plus the stack of
/// speculative frames it is nested under.
///
/// The stack holds frames from oldest at the bottom to newest on top; an
/// empty stack means the path is executing architecturally. Paths are
/// cloned wholesale when a branch forks, so the construct carries no logic
/// of its own beyond stack access.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionPath {
    /// The configuration the path is currently at.
    pub current: Configuration,

    /// The speculative frames the path is nested under, newest last.
    pub frames: Vec<SpeculativeFrame>,

    /// The identifier the next opened frame will receive.
    pub next_frame_id: usize,
}

impl ExecutionPath {
    /// Constructs a fresh architectural path starting at `configuration`.
    #[must_use]
    pub fn new(configuration: Configuration) -> Self {
        Self {
            current: configuration,
            frames: Vec::new(),
            next_frame_id: 0,
        }
    }

    /// Checks whether the path is currently executing speculatively.
    #[must_use]
    pub fn in_speculation(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Gets the innermost (most recently opened) frame, if any.
    #[must_use]
    pub fn innermost(&self) -> Option<&SpeculativeFrame> {
        self.frames.last()
    }

    /// Gets the innermost frame for modification, if any.
    pub fn innermost_mut(&mut self) -> Option<&mut SpeculativeFrame> {
        self.frames.last_mut()
    }

    /// Takes the next unused frame identifier for this path.
    pub fn take_frame_id(&mut self) -> usize {
        let id = self.next_frame_id;
        self.next_frame_id += 1;
        id
    }
}
