use crate::model::{CAPACITY, FacultyId, FacultyMember};
use serde::Serialize;

/// Load of a faculty member as persisted when it was read.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct FacultyLoad {
    pub member: FacultyId,
    pub load: usize,
    pub eligible: bool,
}

impl FacultyLoad {
    pub fn new(member: FacultyId, load: usize) -> Self {
        Self {
            member,
            load,
            eligible: load < CAPACITY,
        }
    }
}

/// Compute the load of every faculty member, keeping the input order.
pub fn calculate(faculty: &[FacultyMember]) -> Vec<FacultyLoad> {
    faculty
        .iter()
        .map(|f| FacultyLoad::new(f.id, f.load()))
        .collect()
}

pub fn eligible(loads: &[FacultyLoad]) -> Vec<FacultyLoad> {
    loads.iter().filter(|l| l.eligible).copied().collect()
}
