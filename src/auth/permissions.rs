// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User types and permission groups.
//!
//! ## Hierarchy
//!
//! Tiers are declared from the most exclusive to the broadest. Each tier's
//! `all` set contains its own user types plus everything the tier before it
//! admits, so a route guarded by `customer.all` is open to every user type
//! while `dev.all` is open to developers only.
//!
//! | Tier       | `all`                                   | `elevated`                 |
//! |------------|-----------------------------------------|----------------------------|
//! | `dev`      | dev                                     | -                          |
//! | `admin`    | dev, admin_super, admin                 | dev, admin_super           |
//! | `staff`    | admin tier + staff_super, staff         | admin tier + staff_super   |
//! | `customer` | everyone                                | -                          |

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The closed set of user types. Drives permission-group membership only;
/// the structural role of a user lives in [`crate::models::UserRole`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Dev,
    AdminSuper,
    Admin,
    StaffSuper,
    Staff,
    Customer,
}

impl UserType {
    pub const ALL: [UserType; 6] = [
        UserType::Dev,
        UserType::AdminSuper,
        UserType::Admin,
        UserType::StaffSuper,
        UserType::Staff,
        UserType::Customer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Dev => "dev",
            UserType::AdminSuper => "admin_super",
            UserType::Admin => "admin",
            UserType::StaffSuper => "staff_super",
            UserType::Staff => "staff",
            UserType::Customer => "customer",
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown user type: {0}")]
pub struct UnknownUserType(pub String);

impl FromStr for UserType {
    type Err = UnknownUserType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownUserType(s.to_string()))
    }
}

/// Immutable set of user types.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UserTypeSet(u8);

impl UserTypeSet {
    pub const EMPTY: UserTypeSet = UserTypeSet(0);

    pub const fn of(types: &[UserType]) -> Self {
        let mut bits = 0u8;
        let mut i = 0;
        while i < types.len() {
            bits |= types[i].bit();
            i += 1;
        }
        UserTypeSet(bits)
    }

    pub const fn contains(self, user_type: UserType) -> bool {
        self.0 & user_type.bit() != 0
    }

    pub const fn union(self, other: UserTypeSet) -> Self {
        UserTypeSet(self.0 | other.0)
    }

    pub const fn is_subset(self, other: UserTypeSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = UserType> {
        UserType::ALL.into_iter().filter(move |t| self.contains(*t))
    }
}

impl std::fmt::Debug for UserTypeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Declaration of one tier, fed to [`build_tiers`].
#[derive(Debug, Clone, Copy)]
pub struct TierSpec {
    pub members: UserTypeSet,
    /// Members of the elevated sub-tier, if the tier has one.
    pub elevated: Option<UserTypeSet>,
}

impl TierSpec {
    pub const fn new(members: &[UserType]) -> Self {
        Self {
            members: UserTypeSet::of(members),
            elevated: None,
        }
    }

    pub const fn with_elevated(members: &[UserType], elevated: &[UserType]) -> Self {
        Self {
            members: UserTypeSet::of(members),
            elevated: Some(UserTypeSet::of(elevated)),
        }
    }
}

/// A resolved tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier {
    /// Every user type admitted by this tier.
    pub all: UserTypeSet,
    /// The elevated sub-tier, when declared.
    pub elevated: Option<UserTypeSet>,
}

impl Tier {
    pub const EMPTY: Tier = Tier {
        all: UserTypeSet::EMPTY,
        elevated: None,
    };

    /// Elevated set when declared, `all` otherwise.
    pub const fn elevated_or_all(&self) -> UserTypeSet {
        match self.elevated {
            Some(set) => set,
            None => self.all,
        }
    }
}

/// Accumulate tiers ordered from the most exclusive to the broadest.
pub const fn build_tiers<const N: usize>(specs: [TierSpec; N]) -> [Tier; N] {
    let mut tiers = [Tier::EMPTY; N];
    let mut previous = UserTypeSet::EMPTY;
    let mut i = 0;
    while i < N {
        let all = previous.union(specs[i].members);
        let elevated = match specs[i].elevated {
            Some(members) => Some(previous.union(members)),
            None => None,
        };
        tiers[i] = Tier { all, elevated };
        previous = all;
        i += 1;
    }
    tiers
}

/// Named permission tiers used by route guards.
#[derive(Debug, Clone, Copy)]
pub struct AuthGroups {
    pub dev: Tier,
    pub admin: Tier,
    pub staff: Tier,
    pub customer: Tier,
    /// Every user type.
    pub all: UserTypeSet,
}

const TIERS: [Tier; 4] = build_tiers([
    TierSpec::new(&[UserType::Dev]),
    TierSpec::with_elevated(
        &[UserType::AdminSuper, UserType::Admin],
        &[UserType::AdminSuper],
    ),
    TierSpec::with_elevated(
        &[UserType::StaffSuper, UserType::Staff],
        &[UserType::StaffSuper],
    ),
    TierSpec::new(&[UserType::Customer]),
]);

pub const AUTH_GROUPS: AuthGroups = AuthGroups {
    dev: TIERS[0],
    admin: TIERS[1],
    staff: TIERS[2],
    customer: TIERS[3],
    all: UserTypeSet::of(&UserType::ALL),
};
