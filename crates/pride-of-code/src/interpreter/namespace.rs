use super::Value;
use crate::band::{Roster, Section};
use indexmap::IndexMap;

/// Names bound before a script runs. Nothing else from the host is reachable.
pub const ALLOWED_NAMES: [&str; 6] = ["band", "members", "brass", "woodwind", "percussion", "guard"];

/// Global bindings of one script run, in binding order.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    bindings: IndexMap<String, Value>,
}

impl Namespace {
    /// The allow-listed bindings for `roster`: the `band` controller, every
    /// member and one list per section.
    pub fn for_roster(roster: &Roster) -> Self {
        let mut namespace = Self::default();
        namespace.set("band", Value::Band);
        namespace.set("members", Value::list(roster.ids().map(Value::Member).collect()));
        for section in Section::ALL {
            let members = roster
                .section(section)
                .iter()
                .copied()
                .map(Value::Member)
                .collect();
            namespace.set(section.name(), Value::list(members));
        }
        namespace
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        match self.bindings.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.bindings.insert(name.to_string(), value);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Names the script bound itself, on top of the allow-list.
    pub fn user_names(&self) -> impl Iterator<Item = &str> {
        self.bindings
            .keys()
            .map(String::as_str)
            .filter(|name| !ALLOWED_NAMES.contains(name))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}
