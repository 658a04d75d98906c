//! The fixed participant roster.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Address, OntimeError, Result, constants};

/// Ordered set of eligible participants, fixed at construction.
///
/// Order matters: quorum resolution scans candidates in roster order and
/// breaks ties in favour of the earlier member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Address>", into = "Vec<Address>")]
pub struct Roster {
    members: Vec<Address>,
}

impl Roster {
    /// Validate and build a roster: at least two members, no zero address,
    /// no duplicates.
    pub fn new(members: Vec<Address>) -> Result<Self> {
        if members.len() < constants::MIN_ROSTER_SIZE {
            return Err(OntimeError::InvalidRoster {
                reason: format!(
                    "need at least {} members, got {}",
                    constants::MIN_ROSTER_SIZE,
                    members.len()
                ),
            });
        }
        let mut seen = HashSet::with_capacity(members.len());
        for member in &members {
            if member.is_zero() {
                return Err(OntimeError::InvalidRoster {
                    reason: "zero address is not a valid participant".into(),
                });
            }
            if !seen.insert(*member) {
                return Err(OntimeError::InvalidRoster {
                    reason: format!("duplicate participant {member}"),
                });
            }
        }
        Ok(Self { members })
    }

    #[must_use]
    pub fn contains(&self, who: &Address) -> bool {
        self.members.contains(who)
    }

    /// Fail with `NotOnRoster` unless `who` is a member.
    pub fn ensure_member(&self, who: &Address) -> Result<()> {
        if self.contains(who) {
            Ok(())
        } else {
            Err(OntimeError::NotOnRoster(*who))
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.members.iter()
    }

    #[must_use]
    pub fn members(&self) -> &[Address] {
        &self.members
    }
}

impl TryFrom<Vec<Address>> for Roster {
    type Error = OntimeError;

    fn try_from(members: Vec<Address>) -> Result<Self> {
        Self::new(members)
    }
}

impl From<Roster> for Vec<Address> {
    fn from(roster: Roster) -> Self {
        roster.members
    }
}
