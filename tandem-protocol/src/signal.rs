//! Signaling line semantics
//!
//! The line idles high through a pull-up. Driving it low means "I am ready
//! to transfer"; releasing it means "this phase is complete".

/// Electrical state of the signaling line, in protocol terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineLevel {
    /// Line is high (pulled up, nobody is driving it)
    Released,
    /// Line is driven low by one of the parties
    Asserted,
}

impl LineLevel {
    /// Interpret a raw pin reading
    pub const fn from_high(high: bool) -> Self {
        if high {
            LineLevel::Released
        } else {
            LineLevel::Asserted
        }
    }

    pub const fn is_asserted(self) -> bool {
        matches!(self, LineLevel::Asserted)
    }
}

/// Logical edge delivered to the transport engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineEdge {
    /// Falling edge: the peer is ready
    Asserted,
    /// Rising edge: the peer finished its phase
    Released,
}

impl LineEdge {
    /// Edge implied by a level change, if any
    pub fn between(previous: LineLevel, current: LineLevel) -> Option<Self> {
        match (previous, current) {
            (LineLevel::Released, LineLevel::Asserted) => Some(LineEdge::Asserted),
            (LineLevel::Asserted, LineLevel::Released) => Some(LineEdge::Released),
            _ => None,
        }
    }

    /// Level the line settles at after this edge
    pub const fn level(self) -> LineLevel {
        match self {
            LineEdge::Asserted => LineLevel::Asserted,
            LineEdge::Released => LineLevel::Released,
        }
    }
}
