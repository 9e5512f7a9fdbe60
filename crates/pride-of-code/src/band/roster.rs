use super::{BandMember, Facing, MemberId, MemberSnapshot, Section};
use crate::config::FieldConfig;
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RosterError {
    #[error("band size must be between 1 and {max}, got {count}")]
    InvalidConfiguration { count: usize, max: usize },
    #[error("unknown section '{0}' (expected brass, woodwind, percussion or guard)")]
    UnknownSection(String),
}

/// Every member of the band plus the per-section partition.
///
/// The partition is derived from the member list whenever the list is
/// rebuilt and is never edited on its own, so `sections[s]` always equals the
/// ids of the members whose `section == s`.
#[derive(Debug, Clone)]
pub struct Roster {
    field: FieldConfig,
    max_size: usize,
    members: Vec<BandMember>,
    sections: BTreeMap<Section, Vec<MemberId>>,
    baseline: Vec<BandMember>,
}

impl Roster {
    pub fn new(field: FieldConfig, max_size: usize) -> Self {
        Self {
            field,
            max_size,
            members: Vec::new(),
            sections: BTreeMap::new(),
            baseline: Vec::new(),
        }
    }

    pub fn field(&self) -> &FieldConfig {
        &self.field
    }

    /// Replace all members with `count` fresh ones standing on the baseline.
    pub fn create(&mut self, count: usize) -> Result<(), RosterError> {
        if count == 0 || count > self.max_size {
            return Err(RosterError::InvalidConfiguration {
                count,
                max: self.max_size,
            });
        }
        let mut members = Vec::with_capacity(count);
        let base = count / Section::ALL.len();
        let extra = count % Section::ALL.len();
        for (index, section) in Section::ALL.into_iter().enumerate() {
            let size = base + usize::from(index < extra);
            for _ in 0..size {
                members.push(BandMember::new(members.len(), section, 0.0, 0.0));
            }
        }
        let margin = self.field.baseline_margin;
        let baseline_y = self.field.baseline_y;
        let points = line_points(count, (margin, baseline_y), (self.field.width - margin, baseline_y));
        for (member, (x, y)) in members.iter_mut().zip(points) {
            member.x = x;
            member.y = y;
        }
        debug!(count, "created roster");
        self.baseline = members.clone();
        self.members = members;
        self.rebuild_sections();
        Ok(())
    }

    /// Put every member back where the last `create` left them.
    pub fn reset(&mut self) {
        self.members = self.baseline.clone();
        self.rebuild_sections();
    }

    /// Drop all members, e.g. when the executor is reset.
    pub fn clear(&mut self) {
        self.members.clear();
        self.baseline.clear();
        self.sections.clear();
    }

    fn rebuild_sections(&mut self) {
        self.sections = Section::ALL
            .into_iter()
            .map(|section| (section, Vec::new()))
            .collect();
        for member in &self.members {
            self.sections
                .entry(member.section)
                .or_default()
                .push(member.id);
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[BandMember] {
        &self.members
    }

    pub fn member(&self, id: MemberId) -> Option<&BandMember> {
        self.members.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.members.iter().map(|member| member.id)
    }

    pub fn section(&self, section: Section) -> &[MemberId] {
        self.sections
            .get(&section)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get_section(&self, name: &str) -> Result<&[MemberId], RosterError> {
        let section = name
            .parse::<Section>()
            .map_err(|()| RosterError::UnknownSection(name.to_string()))?;
        Ok(self.section(section))
    }

    pub fn snapshots(&self) -> Vec<MemberSnapshot> {
        self.members.iter().map(BandMember::snapshot).collect()
    }

    pub fn move_to(&mut self, id: MemberId, x: f64, y: f64) {
        if !(x.is_finite() && y.is_finite()) {
            debug!(id, "ignoring non-finite move_to target");
            return;
        }
        let (x, y) = self.clamp(x, y);
        if let Some(member) = self.members.get_mut(id) {
            member.x = x;
            member.y = y;
        }
    }

    /// Step along the member's facing axis. Negative `steps` walk backwards.
    pub fn move_forward(&mut self, id: MemberId, steps: f64) {
        let Some(member) = self.members.get(id) else {
            return;
        };
        let (dx, dy) = member.facing.delta();
        let (x, y) = (member.x + dx * steps, member.y + dy * steps);
        self.move_to(id, x, y);
    }

    pub fn face(&mut self, id: MemberId, facing: Facing) {
        if let Some(member) = self.members.get_mut(id) {
            member.facing = facing;
        }
    }

    /// Member `i` of `n` lands at angle `2π·i/n` around `(cx, cy)`.
    pub fn form_circle(&mut self, ids: &[MemberId], cx: f64, cy: f64, radius: f64) {
        let count = ids.len();
        for (index, &id) in ids.iter().enumerate() {
            let angle = TAU * index as f64 / count as f64;
            self.move_to(id, cx + radius * angle.cos(), cy + radius * angle.sin());
        }
    }

    /// Spread members from `(x1, y1)` to `(x2, y2)`, both endpoints included.
    pub fn form_line(&mut self, ids: &[MemberId], x1: f64, y1: f64, x2: f64, y2: f64) {
        let points = line_points(ids.len(), (x1, y1), (x2, y2));
        for (&id, (x, y)) in ids.iter().zip(points) {
            self.move_to(id, x, y);
        }
    }

    pub fn advance_animation(&mut self, dt: f64) {
        for member in &mut self.members {
            member.advance_phase(dt);
        }
    }

    fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (x.clamp(0.0, self.field.width), y.clamp(0.0, self.field.height))
    }
}

/// Evenly spaced points on a segment. A single point sits at the midpoint.
fn line_points(count: usize, start: (f64, f64), end: (f64, f64)) -> Vec<(f64, f64)> {
    match count {
        0 => Vec::new(),
        1 => vec![((start.0 + end.0) / 2.0, (start.1 + end.1) / 2.0)],
        _ => {
            let last = (count - 1) as f64;
            (0..count)
                .map(|index| {
                    let t = index as f64 / last;
                    (
                        start.0 + (end.0 - start.0) * t,
                        start.1 + (end.1 - start.1) * t,
                    )
                })
                .collect()
        }
    }
}
