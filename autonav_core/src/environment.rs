use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::map::{MapError, RoomMap};
use crate::obs::{self, FrameSource, Observation, ObservationError, PngFrameSource};
use crate::render::{self, RenderError, ViewSink};
use crate::{Action, Direction, Position};

/// Represents errors surfaced by the environment API.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    Observation(#[from] ObservationError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("action code {code} is out of range (expected 0..=3)")]
    InvalidAction { code: u8 },
}

/// Outcome category of a step, reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepInfo {
    Successful,
    Blocked,
}

impl StepInfo {
    /// Scalar reward paired with this outcome: +1 on success, -1 on a
    /// blocked translation.
    pub const fn reward(self) -> f32 {
        match self {
            StepInfo::Successful => 1.0,
            StepInfo::Blocked => -1.0,
        }
    }
}

impl fmt::Display for StepInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepInfo::Successful => "successful",
            StepInfo::Blocked => "blocked",
        })
    }
}

/// Result of one environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub observation: Observation,
    pub reward: f32,
    /// Always `false`: the environment defines no terminal condition, so
    /// episode length is imposed by the caller.
    pub done: bool,
    pub info: StepInfo,
}

/// Per-episode bookkeeping counters, zeroed by every reset.
///
/// Read-only from the outside; only accepted steps advance them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    operations: u64,
    moves: u64,
    collisions: u64,
}

impl Counters {
    /// Steps taken since the last reset, regardless of action kind.
    pub fn operations(&self) -> u64 {
        self.operations
    }

    /// Translation attempts since the last reset, successful or not.
    pub fn moves(&self) -> u64 {
        self.moves
    }

    /// Translation attempts rejected because the target cell was not
    /// walkable.
    pub fn collisions(&self) -> u64 {
        self.collisions
    }
}

/// Manages the navigation environment.
///
/// Holds the walkable-cell map, the agent's pose, the episode counters and
/// the view-image collaborator. The position invariant (the agent always
/// occupies a walkable cell) is established at construction and preserved
/// by every transition.
pub struct Environment {
    resources: PathBuf,
    map: RoomMap,
    source: Box<dyn FrameSource>,
    position: Position,
    direction: Direction,
    counters: Counters,
}

impl Environment {
    /// Default start pose used by [`Environment::reset_default`].
    pub const DEFAULT_START: Position = Position::new(1, 1);

    /// Creates an environment from a resource directory, decoding views as
    /// PNG files.
    ///
    /// Scanning the map and constructing the instance are a single step, so
    /// no half-initialized environment is ever observable: on return the
    /// agent stands on the smallest walkable cell facing front with zeroed
    /// counters.
    pub fn new(resources: impl Into<PathBuf>) -> Result<Self, EnvError> {
        Self::with_source(resources, Box::new(PngFrameSource))
    }

    /// Creates an environment with a custom view-image collaborator.
    pub fn with_source(
        resources: impl Into<PathBuf>,
        source: Box<dyn FrameSource>,
    ) -> Result<Self, EnvError> {
        let resources = resources.into();
        let map = RoomMap::scan(&resources)?;
        // A successful scan never yields an empty map.
        let position = match map.first_cell() {
            Some(cell) => cell,
            None => return Err(MapError::EmptyMap { dir: resources }.into()),
        };
        Ok(Environment {
            resources,
            map,
            source,
            position,
            direction: Direction::Front,
            counters: Counters::default(),
        })
    }

    /// Places the agent at a start pose and zeroes the counters.
    ///
    /// A start position outside the walkable set is not an error: a warning
    /// is logged and the agent falls back to the smallest walkable cell.
    /// The direction is applied unconditionally. Returns the observation
    /// for the resulting pose.
    pub fn reset(
        &mut self,
        start_position: Position,
        start_direction: Direction,
    ) -> Result<Observation, EnvError> {
        if self.map.contains(start_position) {
            self.position = start_position;
        } else {
            let fallback = self.map.first_cell().unwrap_or(self.position);
            warn!(
                requested = ?start_position,
                fallback = ?fallback,
                "start position is not walkable, falling back"
            );
            self.position = fallback;
        }
        self.direction = start_direction;
        self.counters = Counters::default();
        self.observation()
    }

    /// Resets to the default start pose: cell (1, 1) facing front.
    pub fn reset_default(&mut self) -> Result<Observation, EnvError> {
        self.reset(Self::DEFAULT_START, Direction::Front)
    }

    /// Applies one action and returns the step result.
    ///
    /// Translations move one cell along the facing axis and are rejected,
    /// not clamped or wrapped, when the target is not walkable. Turns
    /// rotate the facing and always succeed. `operations` advances once per
    /// call, `moves` once per translation, `collisions` once per rejected
    /// translation.
    pub fn step(&mut self, action: Action) -> Result<Step, EnvError> {
        let info = match action {
            Action::Forward | Action::Backward => {
                self.counters.moves += 1;
                let (dx, dy) = self.direction.unit();
                let delta = action.delta();
                let candidate = self.position.offset(dx * delta, dy * delta);
                if self.map.contains(candidate) {
                    self.position = candidate;
                    StepInfo::Successful
                } else {
                    self.counters.collisions += 1;
                    StepInfo::Blocked
                }
            }
            Action::TurnLeft => {
                self.direction = self.direction.turned_left();
                StepInfo::Successful
            }
            Action::TurnRight => {
                self.direction = self.direction.turned_right();
                StepInfo::Successful
            }
        };
        self.counters.operations += 1;
        let observation = self.observation()?;
        Ok(Step {
            observation,
            reward: info.reward(),
            done: false,
            info,
        })
    }

    /// Applies one action given as a raw protocol code.
    ///
    /// The code is validated before anything else, so a rejected call leaves
    /// pose and counters untouched.
    pub fn step_index(&mut self, code: u8) -> Result<Step, EnvError> {
        let action = Action::from_index(code).ok_or(EnvError::InvalidAction { code })?;
        self.step(action)
    }

    /// The stereo observation for the current pose.
    pub fn observation(&self) -> Result<Observation, EnvError> {
        obs::load_observation(
            self.source.as_ref(),
            &self.resources,
            self.position,
            self.direction,
        )
        .map_err(EnvError::from)
    }

    /// Composes the current stereo views and hands the frame to the sink.
    ///
    /// Presentation only: pose and counters are unchanged.
    pub fn render(&self, sink: &mut dyn ViewSink) -> Result<(), EnvError> {
        let observation = self.observation()?;
        let frame = render::compose_views(&observation)?;
        sink.present(&frame);
        Ok(())
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn num_of_operations(&self) -> u64 {
        self.counters.operations
    }

    pub fn num_of_moves(&self) -> u64 {
        self.counters.moves
    }

    pub fn num_of_collisions(&self) -> u64 {
        self.counters.collisions
    }

    pub fn map(&self) -> &RoomMap {
        &self.map
    }

    pub fn resources(&self) -> &Path {
        &self.resources
    }
}
