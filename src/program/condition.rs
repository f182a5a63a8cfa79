//! Condition stack shared by execution and validation

use super::instruction::CondFlags;

/// State of one if/else-if/else chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CondFrame {
    /// A branch of this chain has been taken
    pub done: bool,
    /// The chain's `else` has been consumed
    pub seen_else: bool,
    /// Instructions inside the current branch execute
    pub active: bool,
    /// The enclosing block was inactive when this chain opened
    pub parent_inactive: bool,
}

/// Explicit stack of chain frames, one per open block
#[derive(Debug, Default)]
pub(crate) struct ConditionStack {
    frames: Vec<CondFrame>,
}

impl ConditionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether actions at the current position execute. Top level is always active.
    pub fn is_active(&self) -> bool {
        self.frames.last().map_or(true, |frame| frame.active)
    }

    pub fn seen_else(&self) -> bool {
        self.frames.last().map_or(false, |frame| frame.seen_else)
    }

    pub fn mark_else(&mut self) {
        self.top_mut().seen_else = true;
    }

    /// Closes the current chain
    pub fn pop(&mut self) -> Option<CondFrame> {
        self.frames.pop()
    }

    fn top_mut(&mut self) -> &mut CondFrame {
        self.frames
            .last_mut()
            .expect("chain continuation with an empty condition stack")
    }

    /// Applies one `if`/`else if`/`or if`/`else` to the stack.
    ///
    /// `test` runs only when the branch outcome actually depends on it.
    /// Continuations require an open chain; callers check that first.
    pub fn handle(&mut self, flags: CondFlags, test: impl FnOnce() -> bool) {
        if flags.contains(CondFlags::OR) && self.top_mut().active {
            return;
        }

        if flags.is_continuation() {
            let top = self.top_mut();
            if top.done || top.parent_inactive {
                top.active = false;
                return;
            }
        } else {
            if !self.is_active() {
                self.frames.push(CondFrame {
                    parent_inactive: true,
                    ..CondFrame::default()
                });
                return;
            }
            self.frames.push(CondFrame::default());
        }

        let top = self.top_mut();
        if test() {
            top.done = true;
            top.active = true;
        } else {
            top.active = false;
        }
    }
}
