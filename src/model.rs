pub use self::academic_year::{AcademicYear, AcademicYearId, AcademicYearUpdate};
pub use self::faculty::{CAPACITY, FacultyId, FacultyMember};
pub use self::group::{GroupId, ProjectGroup, StudentId, StudentProfile};
pub use self::principal::{Principal, Role};
pub use self::project::{Project, ProjectId, ProjectStatus};

mod academic_year;
mod faculty;
mod group;
mod principal;
mod project;
