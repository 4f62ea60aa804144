pub mod csv;
pub mod json;

pub use csv::{branch_file_name, write_branch, write_branch_file};
pub use json::{write_summary, write_summary_file, FlightReport, FlightSummary, Scenario};
