use serde::{Deserialize, Serialize};

pub mod agent;
pub mod environment;
pub mod map;
pub mod obs;
pub mod render;

/// Represents a discrete 2D coordinate on the navigation lattice.
///
/// Coordinates are signed so that a candidate cell one step beyond the map
/// edge is representable and can be rejected against the walkable set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    /// Returns the position displaced by `(dx, dy)`.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Position {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Represents the four cardinal facing directions.
///
/// The numeric encoding matches the wire protocol of the view resources:
/// 0 front, 1 right, 2 back, 3 left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Front,
    Right,
    Back,
    Left,
}

impl Direction {
    /// All directions in index order.
    pub const ALL: [Direction; 4] = [
        Direction::Front,
        Direction::Right,
        Direction::Back,
        Direction::Left,
    ];

    /// Returns the numeric code of this direction (0..=3).
    #[inline]
    pub const fn index(self) -> u8 {
        match self {
            Direction::Front => 0,
            Direction::Right => 1,
            Direction::Back => 2,
            Direction::Left => 3,
        }
    }

    /// Decodes a numeric direction code, taken modulo 4.
    #[inline]
    pub const fn from_index(index: u8) -> Self {
        Self::ALL[(index % 4) as usize]
    }

    /// Unit vector of one forward step while facing this direction.
    ///
    /// Front advances along +x, Right along +y, Back along -x, Left along -y.
    #[inline]
    pub const fn unit(self) -> (i32, i32) {
        match self {
            Direction::Front => (1, 0),
            Direction::Right => (0, 1),
            Direction::Back => (-1, 0),
            Direction::Left => (0, -1),
        }
    }

    /// Direction after a single left turn.
    #[inline]
    pub const fn turned_left(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Direction after a single right turn.
    #[inline]
    pub const fn turned_right(self) -> Self {
        Self::from_index(self.index() + 3)
    }

    /// Uppercase label used in view resource names.
    pub const fn label(self) -> &'static str {
        match self {
            Direction::Front => "FRONT",
            Direction::Right => "RIGHT",
            Direction::Back => "BACK",
            Direction::Left => "LEFT",
        }
    }
}

/// Represents the discrete actions an agent can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
}

impl Action {
    /// All actions in protocol order.
    pub const ALL: [Action; 4] = [
        Action::Forward,
        Action::Backward,
        Action::TurnLeft,
        Action::TurnRight,
    ];

    /// Returns the protocol code of this action (0..=3).
    #[inline]
    pub const fn index(self) -> u8 {
        match self {
            Action::Forward => 0,
            Action::Backward => 1,
            Action::TurnLeft => 2,
            Action::TurnRight => 3,
        }
    }

    /// Decodes a protocol code, or `None` when it is out of range.
    #[inline]
    pub const fn from_index(code: u8) -> Option<Self> {
        match code {
            0 => Some(Action::Forward),
            1 => Some(Action::Backward),
            2 => Some(Action::TurnLeft),
            3 => Some(Action::TurnRight),
            _ => None,
        }
    }

    /// Whether this action attempts to change the agent's cell.
    #[inline]
    pub const fn is_translation(self) -> bool {
        matches!(self, Action::Forward | Action::Backward)
    }

    /// Signed step size of a translation along the facing axis.
    ///
    /// Forward is +1, backward is -1; turns have no displacement.
    #[inline]
    pub const fn delta(self) -> i32 {
        match self {
            Action::Forward => 1,
            Action::Backward => -1,
            Action::TurnLeft | Action::TurnRight => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_indices_round_trip() {
        for dir in Direction::ALL {
            assert_eq!(Direction::from_index(dir.index()), dir);
        }
        // Codes wrap modulo 4.
        assert_eq!(Direction::from_index(4), Direction::Front);
        assert_eq!(Direction::from_index(7), Direction::Left);
    }

    #[test]
    fn left_turn_cycles_through_all_directions() {
        let mut dir = Direction::Front;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(dir);
            dir = dir.turned_left();
        }
        assert_eq!(dir, Direction::Front);
        assert_eq!(seen, Direction::ALL.to_vec());
    }

    #[test]
    fn right_turn_is_inverse_of_left_turn() {
        for dir in Direction::ALL {
            assert_eq!(dir.turned_left().turned_right(), dir);
            assert_eq!(dir.turned_right().turned_left(), dir);
        }
    }

    #[test]
    fn action_codes_reject_out_of_range() {
        for action in Action::ALL {
            assert_eq!(Action::from_index(action.index()), Some(action));
        }
        assert_eq!(Action::from_index(4), None);
        assert_eq!(Action::from_index(255), None);
    }

    #[test]
    fn unit_vectors_follow_the_facing_table() {
        assert_eq!(Direction::Front.unit(), (1, 0));
        assert_eq!(Direction::Right.unit(), (0, 1));
        assert_eq!(Direction::Back.unit(), (-1, 0));
        assert_eq!(Direction::Left.unit(), (0, -1));
    }
}
