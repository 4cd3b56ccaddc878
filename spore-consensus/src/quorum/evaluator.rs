use spore_common::TxResult;

/// One voter of a quorum. Member 0 is always the local node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub address: String,
    /// `None` while the vote of the current round is pending.
    pub vote: Option<TxResult>,
    /// Vote of the last round that ended in a changed `Fail`.
    pub previous: Option<TxResult>,
}

impl Member {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            vote: None,
            previous: None,
        }
    }
}

/// What a quorum does after a tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pending,
    Commit,
    Abort(TxResult),
    /// Back off and lock again; `unlock` first when the round hit a lock conflict.
    Retry { unlock: bool },
}

/// Classifies a round of votes.
///
/// 1. Any pending vote: wait.
/// 2. Any vote other than Success/Fail/LockFail aborts with that code.
/// 3. Unanimous Success commits.
/// 4. A Fail round identical to the previous one is settled by strict majority.
/// 5. Otherwise retry. A changed Fail remembers this round's votes, a LockFail forgets them.
pub fn evaluate(members: &mut [Member]) -> Verdict {
    if members.iter().any(|m| m.vote.is_none()) {
        return Verdict::Pending;
    }

    let mut successes = 0;
    let mut outcome = TxResult::Success;
    for member in members.iter() {
        match member.vote {
            Some(TxResult::Success) => successes += 1,
            Some(TxResult::Fail) => {
                if outcome != TxResult::LockFail {
                    outcome = TxResult::Fail;
                }
            }
            Some(TxResult::LockFail) => outcome = TxResult::LockFail,
            Some(other) => return Verdict::Abort(other),
            None => return Verdict::Pending,
        }
    }

    match outcome {
        TxResult::Success => Verdict::Commit,
        TxResult::Fail => {
            let unchanged = members.iter().all(|m| m.vote == m.previous);
            if unchanged {
                if successes > members.len() / 2 {
                    Verdict::Commit
                } else {
                    Verdict::Abort(TxResult::Fail)
                }
            } else {
                for member in members.iter_mut() {
                    member.previous = member.vote;
                }
                Verdict::Retry { unlock: false }
            }
        }
        _ => {
            for member in members.iter_mut() {
                member.previous = None;
            }
            Verdict::Retry { unlock: true }
        }
    }
}
