use std::io::{self, Write};
use std::path::Path;

use crate::sim::{FlightDataBranch, FlightDataType};

/// Write a branch's time series as CSV.
///
/// One column per recorded data type, labelled with its unit. Missing
/// values are written as `NaN`; the final row's time step is always `NaN`.
pub fn write_branch<W: Write>(writer: &mut W, branch: &FlightDataBranch) -> io::Result<()> {
    let types: Vec<FlightDataType> = branch.types().collect();
    let columns: Vec<&[f64]> = types.iter().filter_map(|&ty| branch.get(ty)).collect();

    let header: Vec<&str> = types.iter().map(|ty| ty.label()).collect();
    writeln!(writer, "{}", header.join(","))?;

    for row in 0..branch.len() {
        let cells: Vec<String> = columns.iter().map(|c| format!("{:.6}", c[row])).collect();
        writeln!(writer, "{}", cells.join(","))?;
    }

    Ok(())
}

/// Write a branch to a CSV file at the given path.
pub fn write_branch_file(path: impl AsRef<Path>, branch: &FlightDataBranch) -> io::Result<()> {
    let mut file = io::BufWriter::new(std::fs::File::create(path)?);
    write_branch(&mut file, branch)?;
    file.flush()
}

/// File name for a branch's CSV: the branch name, lowercased, with spaces
/// replaced.
pub fn branch_file_name(branch: &FlightDataBranch) -> String {
    let stem: String = branch
        .name()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{stem}.csv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::DataRecord;

    #[test]
    fn csv_output_has_header_and_rows() {
        let mut branch = FlightDataBranch::new("Sustainer");
        branch
            .push_record(DataRecord::from([
                (FlightDataType::Time, 0.0),
                (FlightDataType::TimeStep, 0.01),
                (FlightDataType::Altitude, 0.0),
            ]))
            .unwrap();
        branch
            .push_record(DataRecord::from([
                (FlightDataType::Time, 0.01),
                (FlightDataType::TimeStep, f64::NAN),
                (FlightDataType::Altitude, 0.25),
            ]))
            .unwrap();

        let mut buf = Vec::new();
        write_branch(&mut buf, &branch).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "time_s,time_step_s,altitude_m");
        assert_eq!(lines.len(), 3); // header + 2 data rows
        assert!(lines[1].starts_with("0.000000,"));
        assert!(lines[2].contains("NaN"));
    }

    #[test]
    fn file_names_are_sanitised() {
        let branch = FlightDataBranch::new("Upper Stage 2");
        assert_eq!(branch_file_name(&branch), "upper_stage_2.csv");
    }
}
