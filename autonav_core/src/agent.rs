use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{Action, Direction, Position};

/// Trait defining an action-selection policy for driving the environment.
///
/// `&mut self` allows a policy to maintain internal state between decisions.
pub trait Policy {
    /// Picks the next action given the agent's current pose.
    fn next_action(&mut self, position: Position, direction: Direction) -> Action;
}

/// A policy that draws uniformly among the four actions.
#[derive(Debug)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn next_action(&mut self, _position: Position, _direction: Direction) -> Action {
        Action::ALL[self.rng.random_range(0..Action::ALL.len())]
    }
}
