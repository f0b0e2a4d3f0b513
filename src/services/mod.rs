pub mod dates;
pub mod report;
pub mod search;
