use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("unknown poll {0}")]
    UnknownPoll(String),
    #[error("poll {poll} has no option {option}")]
    UnknownOption { poll: String, option: String },
    #[error("You have already voted in this poll!")]
    AlreadyVoted,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PollOptions {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionResult {
    pub option: String,
    pub votes: u32,
    pub percent: u32,
}

#[derive(Debug)]
struct Poll {
    options: Vec<String>,
    votes: Vec<u32>,
    voter_choice: HashMap<String, usize>,
}

#[derive(Debug, Default)]
pub struct Polls {
    polls: HashMap<String, Poll>,
}

impl Polls {
    pub fn new(defs: &[PollOptions]) -> Self {
        let polls = defs
            .iter()
            .map(|def| {
                let poll = Poll {
                    options: def.options.clone(),
                    votes: vec![0; def.options.len()],
                    voter_choice: HashMap::new(),
                };
                (def.id.clone(), poll)
            })
            .collect();
        Self { polls }
    }

    /// One vote per voter per poll.
    pub fn vote(&mut self, poll_id: &str, voter: &str, option: &str) -> Result<(), PollError> {
        let poll = self
            .polls
            .get_mut(poll_id)
            .ok_or_else(|| PollError::UnknownPoll(poll_id.to_string()))?;
        if poll.voter_choice.contains_key(voter) {
            return Err(PollError::AlreadyVoted);
        }
        let index = poll
            .options
            .iter()
            .position(|o| o == option)
            .ok_or_else(|| PollError::UnknownOption {
                poll: poll_id.to_string(),
                option: option.to_string(),
            })?;
        poll.votes[index] += 1;
        poll.voter_choice.insert(voter.to_string(), index);
        debug!(poll = poll_id, option, "vote recorded");
        Ok(())
    }

    /// Percentages rounded half up. `None` until the first vote.
    pub fn results(&self, poll_id: &str) -> Option<Vec<OptionResult>> {
        let poll = self.polls.get(poll_id)?;
        let total: u32 = poll.votes.iter().sum();
        if total == 0 {
            return None;
        }
        Some(
            poll.options
                .iter()
                .zip(&poll.votes)
                .map(|(option, &votes)| OptionResult {
                    option: option.clone(),
                    votes,
                    percent: (votes * 200 + total) / (total * 2),
                })
                .collect(),
        )
    }
}
