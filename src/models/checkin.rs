//! Daily check-in outcome.

/// A reward granted by a successful check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reward {
    /// What was awarded, as named by the forum.
    pub kind: String,
    /// Amount awarded.
    pub amount: u64,
}

/// Successful outcomes of a daily check-in.
///
/// Failures (not logged in, unrecognized response) are reported as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckIn {
    /// Checked in now; rewards are best-effort and may be empty.
    Rewarded {
        /// Rewards recognized in the response.
        rewards: Vec<Reward>,
        /// Response message as shown by the forum.
        message: String,
    },
    /// Already checked in today.
    AlreadyCheckedIn,
}

impl CheckIn {
    /// Whether this outcome means a check-in happened just now.
    pub fn is_new(&self) -> bool {
        matches!(self, CheckIn::Rewarded { .. })
    }
}
