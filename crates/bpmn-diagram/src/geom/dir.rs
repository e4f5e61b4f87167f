use crate::geom::{Axis, Side};

/// The four directions into which a diagram can be laid out.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Dir {
    /// Left to right.
    #[default]
    LTR,
    /// Right to left.
    RTL,
    /// Top to bottom.
    TTB,
    /// Bottom to top.
    BTT,
}

impl Dir {
    /// The axis this direction belongs to.
    pub const fn axis(self) -> Axis {
        match self {
            Self::LTR | Self::RTL => Axis::X,
            Self::TTB | Self::BTT => Axis::Y,
        }
    }

    /// Whether this direction points into the positive coordinate direction.
    ///
    /// The positive directions are left-to-right and top-to-bottom.
    pub const fn is_positive(self) -> bool {
        match self {
            Self::LTR | Self::TTB => true,
            Self::RTL | Self::BTT => false,
        }
    }

    /// The corresponding sign, for use in calculations.
    pub const fn sign(self) -> f64 {
        if self.is_positive() { 1.0 } else { -1.0 }
    }

    /// The side of a shape flows leave through in this direction.
    pub const fn exit_side(self) -> Side {
        match self {
            Self::LTR => Side::Right,
            Self::RTL => Side::Left,
            Self::TTB => Side::Bottom,
            Self::BTT => Side::Top,
        }
    }

    /// The side of a shape flows enter through in this direction.
    pub const fn entry_side(self) -> Side {
        self.exit_side().opposite()
    }
}
