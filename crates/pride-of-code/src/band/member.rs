use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable index of a member within its roster.
pub type MemberId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Brass,
    Woodwind,
    Percussion,
    Guard,
}

impl Section {
    /// Sections in assignment order. Earlier sections win ties when the band
    /// doesn't split evenly.
    pub const ALL: [Section; 4] = [
        Section::Brass,
        Section::Woodwind,
        Section::Percussion,
        Section::Guard,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Brass => "brass",
            Self::Woodwind => "woodwind",
            Self::Percussion => "percussion",
            Self::Guard => "guard",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Section {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.name() == name)
            .ok_or(())
    }
}

/// Direction `move_forward` advances along. North points toward `y = 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    #[default]
    North,
    East,
    South,
    West,
}

impl Facing {
    pub const ALL: [Facing; 4] = [Facing::North, Facing::East, Facing::South, Facing::West];

    pub fn name(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::East => "east",
            Self::South => "south",
            Self::West => "west",
        }
    }

    /// Unit step in field coordinates.
    pub fn delta(self) -> (f64, f64) {
        match self {
            Self::North => (0.0, -1.0),
            Self::East => (1.0, 0.0),
            Self::South => (0.0, 1.0),
            Self::West => (-1.0, 0.0),
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Facing {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Facing::ALL
            .into_iter()
            .find(|facing| facing.name() == name)
            .ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandMember {
    pub id: MemberId,
    pub x: f64,
    pub y: f64,
    pub section: Section,
    pub facing: Facing,
    /// Walk-cycle phase in `[0, 1)`. Only the presentation layer advances it.
    pub step_phase: f64,
}

impl BandMember {
    pub fn new(id: MemberId, section: Section, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            section,
            facing: Facing::default(),
            step_phase: 0.0,
        }
    }

    pub fn advance_phase(&mut self, dt: f64) {
        if dt.is_finite() {
            self.step_phase = (self.step_phase + dt * 2.0).rem_euclid(1.0);
        }
    }

    pub fn snapshot(&self) -> MemberSnapshot {
        MemberSnapshot {
            id: self.id,
            x: self.x,
            y: self.y,
            section: self.section,
            facing: self.facing,
            step_phase: self.step_phase,
        }
    }
}

/// Read-only copy of a member handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    pub id: MemberId,
    pub x: f64,
    pub y: f64,
    pub section: Section,
    pub facing: Facing,
    pub step_phase: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_names_round_trip() {
        for section in Section::ALL {
            assert_eq!(section.name().parse::<Section>(), Ok(section));
        }
        assert!("Brass".parse::<Section>().is_err());
        assert!("strings".parse::<Section>().is_err());
    }

    #[test]
    fn phase_wraps_into_unit_interval() {
        let mut member = BandMember::new(0, Section::Guard, 0.0, 0.0);
        member.advance_phase(0.3);
        assert!((member.step_phase - 0.6).abs() < 1e-9);
        member.advance_phase(0.3);
        assert!((member.step_phase - 0.2).abs() < 1e-9);
        member.advance_phase(f64::NAN);
        assert!((member.step_phase - 0.2).abs() < 1e-9);
    }

    #[test]
    fn facing_deltas_are_unit_steps() {
        for facing in Facing::ALL {
            let (dx, dy) = facing.delta();
            assert_eq!(dx.abs() + dy.abs(), 1.0);
        }
    }
}
