use crate::error::Error;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct AcademicYearId(pub i64);

impl fmt::Display for AcademicYearId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYear {
    pub id: AcademicYearId,
    pub name: String,
    pub slug: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub is_current: bool,
}

impl AcademicYear {
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() || self.slug.trim().is_empty() {
            return Err(Error::Validation(
                "academic year name and slug cannot be empty".into(),
            ));
        }
        if self.start > self.end {
            return Err(Error::Validation(format!(
                "academic year {} starts ({}) after it ends ({})",
                self.name, self.start, self.end
            )));
        }
        Ok(())
    }
}

impl fmt::Display for AcademicYear {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}..{}]", self.name, self.start, self.end)
    }
}

/// Partial update of an academic year. Fields left to `None` keep
/// their stored value.
#[derive(Clone, Debug, Default)]
pub struct AcademicYearUpdate {
    pub id: Option<AcademicYearId>,
    pub is_current: Option<bool>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl AcademicYearUpdate {
    pub fn apply_to(&self, year: &AcademicYear) -> Result<AcademicYear, Error> {
        let updated = AcademicYear {
            id: year.id,
            name: self.name.clone().unwrap_or_else(|| year.name.clone()),
            slug: self.slug.clone().unwrap_or_else(|| year.slug.clone()),
            start: self.start.unwrap_or(year.start),
            end: self.end.unwrap_or(year.end),
            is_current: self.is_current.unwrap_or(year.is_current),
        };
        updated.validate()?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn year() -> AcademicYear {
        AcademicYear {
            id: AcademicYearId(1),
            name: "2025-2026".into(),
            slug: "2025-26".into(),
            start: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            is_current: false,
        }
    }

    #[test]
    fn update_keeps_missing_fields() {
        let update = AcademicYearUpdate {
            is_current: Some(true),
            name: Some("2025/2026".into()),
            ..Default::default()
        };
        let updated = update.apply_to(&year()).unwrap();
        assert_eq!(updated.name, "2025/2026");
        assert_eq!(updated.slug, "2025-26");
        assert!(updated.is_current);
        assert_eq!(updated.start, year().start);
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let update = AcademicYearUpdate {
            start: NaiveDate::from_ymd_opt(2026, 9, 1),
            ..Default::default()
        };
        assert!(matches!(
            update.apply_to(&year()),
            Err(Error::Validation(_))
        ));
    }
}
