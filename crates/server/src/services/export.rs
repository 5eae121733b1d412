//! Spreadsheet export of the client list.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use thiserror::Error;

use super::storage::sanitize_file_name;
use crate::db::ClientFilter;
use crate::models::Client;

/// MIME type of the generated workbook.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SHEET_NAME: &str = "Clients";
const MAX_COLUMN_WIDTH: usize = 50;

const HEADERS: [&str; 17] = [
    "Name",
    "Category",
    "Status",
    "Address",
    "Street",
    "City",
    "State",
    "Postcode",
    "Country",
    "Phone",
    "Email",
    "Website",
    "Latitude",
    "Longitude",
    "Data Source",
    "Created At",
    "Updated At",
];

/// Errors that can occur while building the workbook.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("Too many rows for one sheet: {0}")]
    TooManyRows(usize),
}

enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    fn width(&self) -> usize {
        match self {
            Self::Text(s) => s.chars().count(),
            Self::Number(n) => n.to_string().len(),
        }
    }
}

fn text(value: Option<&str>) -> Cell {
    Cell::Text(value.unwrap_or_default().to_string())
}

fn timestamp(value: DateTime<Utc>) -> Cell {
    Cell::Text(value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn row_cells(client: &Client) -> [Cell; 17] {
    [
        Cell::Text(client.name.clone()),
        text(client.category.as_deref()),
        Cell::Text(client.status.as_str().to_string()),
        Cell::Text(client.address.clone()),
        text(client.street.as_deref()),
        text(client.city.as_deref()),
        text(client.state.as_deref()),
        text(client.postcode.as_deref()),
        text(client.country.as_deref()),
        text(client.phone.as_deref()),
        text(client.email.as_deref()),
        text(client.website.as_deref()),
        Cell::Number(client.latitude),
        Cell::Number(client.longitude),
        text(client.datasource.as_deref()),
        timestamp(client.created_at),
        timestamp(client.updated_at),
    ]
}

/// Render clients as an `.xlsx` workbook with a single `Clients` sheet.
///
/// # Errors
///
/// Returns `ExportError` if the workbook cannot be written.
pub fn clients_workbook(clients: &[Client]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.chars().count()).collect();

    for (col, header) in (0_u16..).zip(HEADERS) {
        sheet.write_string_with_format(0, col, header, &bold)?;
    }

    for (index, client) in clients.iter().enumerate() {
        let row = u32::try_from(index + 1).map_err(|_| ExportError::TooManyRows(clients.len()))?;
        for ((col, cell), width) in (0_u16..).zip(row_cells(client)).zip(widths.iter_mut()) {
            *width = (*width).max(cell.width());
            match cell {
                Cell::Text(value) => sheet.write_string(row, col, value)?,
                Cell::Number(value) => sheet.write_number(row, col, value)?,
            };
        }
    }

    for (col, width) in (0_u16..).zip(widths) {
        let width = (width + 2).min(MAX_COLUMN_WIDTH);
        sheet.set_column_width(col, f64::from(u32::try_from(width).unwrap_or(50)))?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Download name: `clients[_category-X][_status-Y][_city-Z]_YYYY-MM-DD.xlsx`.
#[must_use]
pub fn export_filename(filter: &ClientFilter, today: DateTime<Utc>) -> String {
    let mut name = String::from("clients");
    if let Some(category) = &filter.category {
        name.push_str(&format!("_category-{}", sanitize_file_name(category)));
    }
    if let Some(status) = filter.status {
        name.push_str(&format!("_status-{status}"));
    }
    if let Some(city) = &filter.city {
        name.push_str(&format!("_city-{}", sanitize_file_name(city)));
    }
    format!("{name}_{}.xlsx", today.format("%Y-%m-%d"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use calamine::{Data, Reader, open_workbook_auto_from_rs};
    use chrono::TimeZone;
    use clients_finder_core::ClientStatus;

    use super::*;
    use crate::models::client::tests::sample_client;

    fn read_back(bytes: Vec<u8>) -> calamine::Range<Data> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec![SHEET_NAME.to_string()]);
        workbook.worksheet_range(SHEET_NAME).unwrap()
    }

    #[test]
    fn test_workbook_rows() {
        let mut second = sample_client();
        second.name = "Pokhara Fitness Club".to_string();
        second.status = ClientStatus::Lead;
        second.email = Some("hello@pokharafitness.com".to_string());

        let range = read_back(clients_workbook(&[sample_client(), second]).unwrap());

        assert_eq!(range.height(), 3);
        assert_eq!(range.width(), 17);
        assert_eq!(
            range.get_value((0, 0)),
            Some(&Data::String("Name".to_string()))
        );
        assert_eq!(
            range.get_value((0, 16)),
            Some(&Data::String("Updated At".to_string()))
        );
        assert_eq!(
            range.get_value((1, 0)),
            Some(&Data::String("Himalayan Java".to_string()))
        );
        assert_eq!(
            range.get_value((2, 2)),
            Some(&Data::String("LEAD".to_string()))
        );
        assert_eq!(
            range.get_value((2, 10)),
            Some(&Data::String("hello@pokharafitness.com".to_string()))
        );
        assert_eq!(range.get_value((1, 12)), Some(&Data::Float(27.7154)));
    }

    #[test]
    fn test_empty_export_keeps_header() {
        let range = read_back(clients_workbook(&[]).unwrap());
        assert_eq!(range.height(), 1);
        assert_eq!(range.width(), 17);
    }

    #[test]
    fn test_export_filename() {
        let day = Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 0).unwrap();
        assert_eq!(
            export_filename(&ClientFilter::default(), day),
            "clients_2025-03-09.xlsx"
        );

        let filter = ClientFilter {
            status: Some(ClientStatus::Pending),
            category: Some("catering.restaurant".to_string()),
            city: Some("Kathmandu".to_string()),
            ..ClientFilter::default()
        };
        assert_eq!(
            export_filename(&filter, day),
            "clients_category-catering.restaurant_status-PENDING_city-Kathmandu_2025-03-09.xlsx"
        );
    }
}
