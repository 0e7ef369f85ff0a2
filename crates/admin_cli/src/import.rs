//! Member sheets exported from spreadsheets.
//!
//! Columns: `full_name,national_id,phone,joined_on`. Every column is
//! optional and cells are read as text: blanks become missing values and an
//! unreadable date is dropped with a warning. Whether a row is acceptable is
//! left to the engine, which reports rejected rows by position.

use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use engine::NewMemberCmd;
use serde::Deserialize;

use crate::error::ResultAdmin;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MemberRow {
    full_name: String,
    national_id: String,
    phone: String,
    joined_on: String,
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

impl MemberRow {
    fn into_cmd(self, line: usize) -> NewMemberCmd {
        let joined_on = non_blank(self.joined_on).and_then(|raw| {
            let date = parse_date(&raw);
            if date.is_none() {
                tracing::warn!("line {line}: ignoring unreadable joined_on {raw:?}");
            }
            date
        });

        NewMemberCmd {
            full_name: non_blank(self.full_name),
            national_id: non_blank(self.national_id),
            phone: non_blank(self.phone),
            joined_on,
        }
    }
}

/// Reads member rows, in file order.
pub fn read_members<R: Read>(reader: R) -> ResultAdmin<Vec<NewMemberCmd>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, record) in rdr.deserialize::<MemberRow>().enumerate() {
        // +2: one for the header, one for 1-based lines
        rows.push(record?.into_cmd(index + 2));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blanks_and_missing_columns_become_none() {
        let sheet = "full_name,phone\nAlice Uwase,0788000000\n ,\n";
        let rows = read_members(sheet.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].full_name.as_deref(), Some("Alice Uwase"));
        assert_eq!(rows[0].phone.as_deref(), Some("0788000000"));
        assert_eq!(rows[0].national_id, None);
        assert_eq!(rows[1].full_name, None);
    }

    #[test]
    fn dates_in_common_layouts() {
        let sheet = "full_name,joined_on\nA,2026-03-01\nB,01/03/2026\nC,March\n";
        let rows = read_members(sheet.as_bytes()).unwrap();

        let march = NaiveDate::from_ymd_opt(2026, 3, 1);
        assert_eq!(rows[0].joined_on, march);
        assert_eq!(rows[1].joined_on, march);
        assert_eq!(rows[2].joined_on, None);
        assert_eq!(rows[2].full_name.as_deref(), Some("C"));
    }

    #[test]
    fn short_rows_are_accepted() {
        let sheet = "full_name,national_id,phone,joined_on\nBob Habimana\n";
        let rows = read_members(sheet.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].full_name.as_deref(), Some("Bob Habimana"));
    }
}
