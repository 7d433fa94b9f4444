#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// One of the six axis-aligned faces of a block or section.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Direction> {
        Self::ALL.get(index).copied()
    }

    pub fn inverse(self) -> Direction {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::Down | Direction::Up => Axis::Y,
            Direction::North | Direction::South => Axis::Z,
            Direction::West | Direction::East => Axis::X,
        }
    }

    /// +1 for directions pointing along the positive axis, -1 otherwise.
    pub fn sign(self) -> i32 {
        match self {
            Direction::Up | Direction::South | Direction::East => 1,
            Direction::Down | Direction::North | Direction::West => -1,
        }
    }

    pub fn vector(self) -> [i32; 3] {
        let mut vector = [0; 3];
        vector[self.axis().index()] = self.sign();
        vector
    }

    pub fn from_axis(axis: Axis, sign: i32) -> Direction {
        match (axis, sign > 0) {
            (Axis::X, false) => Direction::West,
            (Axis::X, true) => Direction::East,
            (Axis::Y, false) => Direction::Down,
            (Axis::Y, true) => Direction::Up,
            (Axis::Z, false) => Direction::North,
            (Axis::Z, true) => Direction::South,
        }
    }
}

/// Number of ordered `(in, out)` pairs with `in != out`.
pub const DIRECTION_PAIRS: usize = 30;

/// An ordered pair of distinct faces; indexes the occlusion table.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct DirectionPair {
    pub from: Direction,
    pub to: Direction,
}

impl DirectionPair {
    /// Returns `None` when both faces are the same.
    pub fn new(from: Direction, to: Direction) -> Option<DirectionPair> {
        if from == to {
            None
        } else {
            Some(DirectionPair { from, to })
        }
    }

    pub fn index(self) -> usize {
        let to = self.to.index();
        let from = self.from.index();
        from * 5 + if to > from { to - 1 } else { to }
    }

    pub fn all() -> impl Iterator<Item = DirectionPair> {
        Direction::ALL.into_iter().flat_map(|from| {
            Direction::ALL
                .into_iter()
                .filter_map(move |to| DirectionPair::new(from, to))
        })
    }
}

/// Horizontal neighbors of a chunk column.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum HorizontalDirection {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl HorizontalDirection {
    pub const ALL: [HorizontalDirection; 8] = [
        HorizontalDirection::North,
        HorizontalDirection::NorthEast,
        HorizontalDirection::East,
        HorizontalDirection::SouthEast,
        HorizontalDirection::South,
        HorizontalDirection::SouthWest,
        HorizontalDirection::West,
        HorizontalDirection::NorthWest,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn inverse(self) -> HorizontalDirection {
        Self::ALL[(self.index() + 4) % 8]
    }

    /// Chunk offset as `(dx, dz)`.
    pub fn offset(self) -> (i32, i32) {
        match self {
            HorizontalDirection::North => (0, -1),
            HorizontalDirection::NorthEast => (1, -1),
            HorizontalDirection::East => (1, 0),
            HorizontalDirection::SouthEast => (1, 1),
            HorizontalDirection::South => (0, 1),
            HorizontalDirection::SouthWest => (-1, 1),
            HorizontalDirection::West => (-1, 0),
            HorizontalDirection::NorthWest => (-1, -1),
        }
    }

    /// The face direction for the four cardinal neighbors.
    pub fn face(self) -> Option<Direction> {
        match self {
            HorizontalDirection::North => Some(Direction::North),
            HorizontalDirection::East => Some(Direction::East),
            HorizontalDirection::South => Some(Direction::South),
            HorizontalDirection::West => Some(Direction::West),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn inverse_is_an_involution() {
        for direction in Direction::ALL {
            assert_eq!(direction.inverse().inverse(), direction);
            assert_ne!(direction.inverse(), direction);
            assert_eq!(direction.inverse().axis(), direction.axis());
        }
        for direction in HorizontalDirection::ALL {
            assert_eq!(direction.inverse().inverse(), direction);
            let (dx, dz) = direction.offset();
            assert_eq!(direction.inverse().offset(), (-dx, -dz));
        }
    }

    #[test]
    fn vectors_match_axis_and_sign() {
        for direction in Direction::ALL {
            let vector = direction.vector();
            assert_eq!(vector.iter().map(|v| v.abs()).sum::<i32>(), 1);
            assert_eq!(vector[direction.axis().index()], direction.sign());
            assert_eq!(Direction::from_axis(direction.axis(), direction.sign()), direction);
        }
    }

    #[test]
    fn pairs_cover_a_dense_index_range() {
        let indices: HashSet<usize> = DirectionPair::all().map(|pair| pair.index()).collect();
        assert_eq!(indices.len(), DIRECTION_PAIRS);
        assert!(indices.iter().all(|&i| i < DIRECTION_PAIRS));
        assert!(DirectionPair::new(Direction::Up, Direction::Up).is_none());
    }
}
