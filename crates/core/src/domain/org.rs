use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(SectorId);
entity_id!(UnitId);
entity_id!(PositionId);
entity_id!(DesignationId);
entity_id!(EmployeeId);
entity_id!(UserId);
entity_id!(RoleId);

/// Seniority of a position. Higher values carry more approval power.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct AuthorityLevel(u8);

/// Level assigned to positions stored without an explicit authority level: the lowest
/// authority a real position can hold.
pub const UNCONFIGURED_AUTHORITY_LEVEL: AuthorityLevel = AuthorityLevel(1);

impl AuthorityLevel {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(100);

    pub fn new(value: i64) -> Result<Self, DomainError> {
        if !(i64::from(Self::MIN.0)..=i64::from(Self::MAX.0)).contains(&value) {
            return Err(DomainError::InvalidAuthorityLevel { value });
        }
        Ok(Self(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// The threshold a superior must meet. `None` once the top of the scale is reached.
    pub fn next(self) -> Option<Self> {
        (self < Self::MAX).then(|| Self(self.0 + 1))
    }
}

impl TryFrom<i64> for AuthorityLevel {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AuthorityLevel> for i64 {
    fn from(level: AuthorityLevel) -> Self {
        i64::from(level.0)
    }
}

impl fmt::Display for AuthorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub sector_id: SectorId,
    pub parent_unit_id: Option<UnitId>,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub name: String,
    /// `None` marks a system-wide position assignable in any unit.
    pub sector_id: Option<SectorId>,
    pub authority_level: AuthorityLevel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    pub employee_id: Option<EmployeeId>,
}

/// A designation joined with the position, unit and user facts the resolver filters on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignationRecord {
    pub id: DesignationId,
    pub employee_id: EmployeeId,
    pub user_id: Option<UserId>,
    pub unit_id: Option<UnitId>,
    pub unit_sector_id: Option<SectorId>,
    pub unit_active: bool,
    pub position_id: PositionId,
    pub position_sector_id: Option<SectorId>,
    pub authority_level: AuthorityLevel,
    pub is_primary: bool,
    pub is_active: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl DesignationRecord {
    pub fn is_current(&self, as_of: NaiveDate) -> bool {
        self.is_active
            && self.start_date <= as_of
            && self.end_date.map_or(true, |end_date| end_date >= as_of)
    }

    pub fn is_system_wide(&self) -> bool {
        self.position_sector_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        AuthorityLevel, DesignationId, DesignationRecord, EmployeeId, PositionId, UnitId,
        UNCONFIGURED_AUTHORITY_LEVEL,
    };
    use crate::errors::DomainError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn authority_level_rejects_values_outside_scale() {
        assert_eq!(
            AuthorityLevel::new(101),
            Err(DomainError::InvalidAuthorityLevel { value: 101 })
        );
        assert_eq!(AuthorityLevel::new(-1), Err(DomainError::InvalidAuthorityLevel { value: -1 }));
        assert_eq!(AuthorityLevel::new(100).map(AuthorityLevel::value), Ok(100));
    }

    #[test]
    fn next_level_stops_at_top_of_scale() {
        let fifty = AuthorityLevel::new(50).expect("valid level");
        assert_eq!(fifty.next().map(AuthorityLevel::value), Some(51));
        assert_eq!(AuthorityLevel::MAX.next(), None);
        assert!(UNCONFIGURED_AUTHORITY_LEVEL > AuthorityLevel::MIN);
    }

    #[test]
    fn authority_level_deserializes_with_range_check() {
        let level: AuthorityLevel = serde_json::from_str("85").expect("in range");
        assert_eq!(level.value(), 85);
        assert!(serde_json::from_str::<AuthorityLevel>("250").is_err());
    }

    #[test]
    fn designation_is_current_within_window() {
        let record = DesignationRecord {
            id: DesignationId(1),
            employee_id: EmployeeId(1),
            user_id: None,
            unit_id: Some(UnitId(1)),
            unit_sector_id: None,
            unit_active: true,
            position_id: PositionId(1),
            position_sector_id: None,
            authority_level: AuthorityLevel::MIN,
            is_primary: true,
            is_active: true,
            start_date: date(2024, 1, 1),
            end_date: Some(date(2024, 12, 31)),
        };

        assert!(record.is_current(date(2024, 6, 1)));
        assert!(record.is_current(date(2024, 12, 31)));
        assert!(!record.is_current(date(2023, 12, 31)));
        assert!(!record.is_current(date(2025, 1, 1)));

        let inactive = DesignationRecord { is_active: false, ..record };
        assert!(!inactive.is_current(date(2024, 6, 1)));
    }
}
