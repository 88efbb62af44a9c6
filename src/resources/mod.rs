pub mod course;
pub mod student;
pub mod test;

pub use course::Courses;
pub use student::Students;
pub use test::Tests;
