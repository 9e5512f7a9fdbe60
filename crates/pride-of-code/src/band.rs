//! The marching band: members, sections and the formation commands scripts
//! drive through the `band` controller.

mod member;
pub use member::{BandMember, Facing, MemberId, MemberSnapshot, Section};

mod roster;
pub use roster::{Roster, RosterError};
