//! Autotile rules and rule-matrix rotation
//!
//! A rule is a 3x3 matrix of [`RuleCode`]s laid over a tile's neighborhood
//! (row-major, `matrix[y][x]`, center = the tile itself) plus the atlas
//! coordinate shown when every code is satisfied.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::RuleError;

/// Coordinate of a tile inside a tileset atlas, in tiles (not pixels)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct AtlasCoord {
    pub x: u32,
    pub y: u32,
}

impl AtlasCoord {
    /// Display used when no rule matches
    pub const ZERO: Self = Self::new(0, 0);

    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Offset this coordinate by whole tiles
    pub const fn offset(self, dx: u32, dy: u32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<[u32; 2]> for AtlasCoord {
    fn from([x, y]: [u32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<AtlasCoord> for [u32; 2] {
    fn from(coord: AtlasCoord) -> Self {
        [coord.x, coord.y]
    }
}

impl From<(u32, u32)> for AtlasCoord {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for AtlasCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Constraint placed on one neighbor cell by a rule matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum RuleCode {
    /// No same-group neighbor may be here
    Empty = 0,
    /// Always satisfied
    Any = 1,
    /// Always satisfied; kept apart from `Any` so hand-written forms read better
    Ignore = 2,
    /// A same-group neighbor must be here
    Required = 3,
}

impl RuleCode {
    /// Check whether this code accepts the presence (or absence) of a neighbor
    pub fn accepts(self, neighbor_present: bool) -> bool {
        match self {
            RuleCode::Any | RuleCode::Ignore => true,
            RuleCode::Empty => !neighbor_present,
            RuleCode::Required => neighbor_present,
        }
    }
}

impl TryFrom<u8> for RuleCode {
    type Error = RuleError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RuleCode::Empty),
            1 => Ok(RuleCode::Any),
            2 => Ok(RuleCode::Ignore),
            3 => Ok(RuleCode::Required),
            other => Err(RuleError::InvalidCode(other)),
        }
    }
}

impl From<RuleCode> for u8 {
    fn from(code: RuleCode) -> Self {
        code as u8
    }
}

/// 3x3 rule matrix, indexed `[y][x]`
pub type RuleMatrix = [[RuleCode; 3]; 3];

/// Neighbor presence window matching a [`RuleMatrix`], indexed `[y][x]`
pub type RuleWindow = [[bool; 3]; 3];

/// Convert a matrix of raw codes (as written in form files) into a [`RuleMatrix`]
pub fn matrix_from_codes(codes: [[u8; 3]; 3]) -> Result<RuleMatrix, RuleError> {
    let mut matrix = [[RuleCode::Any; 3]; 3];
    for (y, row) in codes.iter().enumerate() {
        for (x, code) in row.iter().enumerate() {
            matrix[y][x] = RuleCode::try_from(*code)?;
        }
    }
    Ok(matrix)
}

/// Clockwise rotation applied to a rule matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

/// Rotate a 3x3 matrix clockwise
pub fn rotate_matrix<T: Copy>(matrix: [[T; 3]; 3], rotation: Rotation) -> [[T; 3]; 3] {
    const N: usize = 3;
    let mut out = matrix;
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = match rotation {
                Rotation::Deg0 => matrix[i][j],
                Rotation::Deg90 => matrix[N - 1 - j][i],
                Rotation::Deg180 => matrix[N - 1 - i][N - 1 - j],
                Rotation::Deg270 => matrix[j][N - 1 - i],
            };
        }
    }
    out
}

/// An immutable autotile rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutotileRule {
    matrix: RuleMatrix,
    display: AtlasCoord,
}

impl AutotileRule {
    pub fn new(matrix: RuleMatrix, display: AtlasCoord) -> Self {
        Self { matrix, display }
    }

    /// Create a rule from raw 0-3 codes
    pub fn from_codes(codes: [[u8; 3]; 3], display: AtlasCoord) -> Result<Self, RuleError> {
        Ok(Self::new(matrix_from_codes(codes)?, display))
    }

    pub fn matrix(&self) -> &RuleMatrix {
        &self.matrix
    }

    /// Atlas coordinate emitted when this rule matches
    pub fn display(&self) -> AtlasCoord {
        self.display
    }

    /// Check whether every cell of the matrix accepts the given neighborhood
    pub fn matches(&self, window: &RuleWindow) -> bool {
        self.matrix.iter().zip(window.iter()).all(|(codes, present)| {
            codes
                .iter()
                .zip(present.iter())
                .all(|(code, present)| code.accepts(*present))
        })
    }

    /// A copy of this rule with its matrix rotated and a different display
    pub fn rotated(&self, rotation: Rotation, display: AtlasCoord) -> Self {
        Self::new(rotate_matrix(self.matrix, rotation), display)
    }
}

/// Build the rotational family of a base matrix.
///
/// `amount == 2` yields the 0° and 90° variants laid out vertically
/// (`(x, y)`, `(x, y + 1)`). Any other amount up to 4 walks the 2x2 block
/// clockwise: `(x, y)`, `(x + 1, y)`, `(x + 1, y + 1)`, `(x, y + 1)`.
pub fn get_rule_group(
    base: RuleMatrix,
    display: AtlasCoord,
    amount: usize,
) -> Result<Vec<AutotileRule>, RuleError> {
    if amount == 0 || amount > 4 {
        return Err(RuleError::InvalidGroupAmount(amount));
    }

    let layout: Vec<(Rotation, AtlasCoord)> = if amount == 2 {
        vec![
            (Rotation::Deg0, display),
            (Rotation::Deg90, display.offset(0, 1)),
        ]
    } else {
        let displays = [
            display,
            display.offset(1, 0),
            display.offset(1, 1),
            display.offset(0, 1),
        ];
        Rotation::ALL
            .into_iter()
            .zip(displays)
            .take(amount)
            .collect()
    };

    Ok(layout
        .into_iter()
        .map(|(rotation, display)| AutotileRule::new(rotate_matrix(base, rotation), display))
        .collect())
}
