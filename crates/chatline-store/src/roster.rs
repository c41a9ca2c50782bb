//! Room membership as last reported by the channel.

use tracing::debug;

use chatline_shared::UserProfile;

/// Members currently in the room, in snapshot order.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    members: Vec<UserProfile>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the roster with a fresh snapshot, keeping the first
    /// occurrence of each client key. Returns the new member count.
    pub fn replace(&mut self, snapshot: Vec<UserProfile>) -> usize {
        let received = snapshot.len();
        let mut members: Vec<UserProfile> = Vec::with_capacity(received);
        for member in snapshot {
            if !members.iter().any(|m| m.client_key == member.client_key) {
                members.push(member);
            }
        }

        debug!(received, kept = members.len(), "Roster replaced");
        self.members = members;
        self.members.len()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, client_key: &str) -> Option<&UserProfile> {
        self.members.iter().find(|m| m.client_key == client_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserProfile> + '_ {
        self.members.iter()
    }

    pub fn to_vec(&self) -> Vec<UserProfile> {
        self.members.clone()
    }
}
