//! Per-attempt retry budget.

/// Start and confirm allowances of one supervision attempt.
///
/// Created fresh at the top of every attempt and never replenished within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RetryBudget {
    starts_left: u32,
    confirms_left: u32,
}

impl RetryBudget {
    pub(crate) fn new(start_tries: u32, check_tries: u32) -> Self {
        Self {
            starts_left: start_tries,
            confirms_left: check_tries,
        }
    }

    /// Consumes one start attempt; `false` once the budget is spent.
    pub(crate) fn try_start(&mut self) -> bool {
        match self.starts_left.checked_sub(1) {
            Some(left) => {
                self.starts_left = left;
                true
            }
            None => false,
        }
    }

    /// Records a failed confirmation; `false` when no retry is left.
    pub(crate) fn confirm_failed(&mut self) -> bool {
        self.confirms_left = self.confirms_left.saturating_sub(1);
        self.confirms_left > 0
    }
}
