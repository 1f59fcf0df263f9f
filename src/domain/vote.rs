use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteType {
    Upvote,
    Downvote,
}

impl VoteType {
    /// Case-insensitive wire form, `UPVOTE` or `DOWNVOTE`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "UPVOTE" => Some(Self::Upvote),
            "DOWNVOTE" => Some(Self::Downvote),
            _ => None,
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "upvote" => Some(Self::Upvote),
            "downvote" => Some(Self::Downvote),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Upvote => "upvote",
            Self::Downvote => "downvote",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetType {
    Post,
    Comment,
}

impl TargetType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "POST" => Some(Self::Post),
            "COMMENT" => Some(Self::Comment),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }

    /// Table holding the denormalized counters for this target kind.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Comment => "comments",
        }
    }
}

/// Counters of a target together with one user's vote on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub upvote_count: i64,
    pub downvote_count: i64,
    pub user_vote: Option<VoteType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    Create(VoteType),
    Flip(VoteType),
    Remove,
}

/// Row change and counter deltas for one vote intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTransition {
    pub action: VoteAction,
    pub upvote_delta: i64,
    pub downvote_delta: i64,
    pub resulting: Option<VoteType>,
}

impl VoteTransition {
    pub fn plan(current: Option<VoteType>, requested: VoteType) -> Self {
        use VoteType::{Downvote, Upvote};

        let (action, upvote_delta, downvote_delta) = match (current, requested) {
            (None, Upvote) => (VoteAction::Create(Upvote), 1, 0),
            (None, Downvote) => (VoteAction::Create(Downvote), 0, 1),
            (Some(Upvote), Upvote) => (VoteAction::Remove, -1, 0),
            (Some(Downvote), Downvote) => (VoteAction::Remove, 0, -1),
            (Some(Upvote), Downvote) => (VoteAction::Flip(Downvote), -1, 1),
            (Some(Downvote), Upvote) => (VoteAction::Flip(Upvote), 1, -1),
        };

        let resulting = match action {
            VoteAction::Create(vote_type) | VoteAction::Flip(vote_type) => Some(vote_type),
            VoteAction::Remove => None,
        };

        Self {
            action,
            upvote_delta,
            downvote_delta,
            resulting,
        }
    }
}

impl VoteTally {
    /// Tally as it would look after `requested` is applied. Counters are
    /// clamped at zero so a stale local view never renders negative.
    pub fn after(&self, requested: VoteType) -> Self {
        let transition = VoteTransition::plan(self.user_vote, requested);
        Self {
            upvote_count: (self.upvote_count + transition.upvote_delta).max(0),
            downvote_count: (self.downvote_count + transition.downvote_delta).max(0),
            user_vote: transition.resulting,
        }
    }
}

/// Client-side vote state: the last authoritative tally with an optional
/// pending intent laid over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimisticVote {
    confirmed: VoteTally,
    pending: Option<VoteTally>,
}

impl OptimisticVote {
    pub fn new(confirmed: VoteTally) -> Self {
        Self {
            confirmed,
            pending: None,
        }
    }

    /// Repeated intents before a response stack on top of each other.
    pub fn apply(&mut self, requested: VoteType) -> VoteTally {
        let next = self.view().after(requested);
        self.pending = Some(next);
        next
    }

    pub fn confirm(&mut self, authoritative: VoteTally) {
        self.confirmed = authoritative;
        self.pending = None;
    }

    pub fn rollback(&mut self) -> VoteTally {
        self.pending = None;
        self.confirmed
    }

    pub fn view(&self) -> VoteTally {
        self.pending.unwrap_or(self.confirmed)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
