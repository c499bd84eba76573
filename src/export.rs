//! Spreadsheet export of scraped listings.
//!
//! USD prices are written as live `=raw*rate` formulas so the conversion can be
//! recomputed inside the spreadsheet.

use crate::models::ListingRecord;
use crate::scrapers::types::SearchParams;
use chrono::NaiveDate;
use rust_xlsxwriter::{Color, Format, FormatUnderline, Formula, Url, Workbook, XlsxError};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const SHEET_NAME: &str = "Resultados";
pub const HEADERS: [&str; 7] = [
    "Título",
    "Precio (ARS)",
    "Vendedor",
    "Modelo",
    "Kilómetros",
    "Ubicación",
    "Link",
];
pub const LINK_LABEL: &str = "LINK a MeLi";
pub const AVERAGE_LABEL: &str = "PRECIO PROMEDIO";

const CURRENCY_FORMAT: &str = "\"$\"#,##0";
const USD_FILL: u32 = 0xFFC7CE;
const LINK_COLOR: u32 = 0x0000FF;
const COLUMN_PADDING: usize = 2;
const MAX_URL_LEN: usize = 2079;

/// Content of a price cell
#[derive(Debug, Clone, PartialEq)]
pub enum PriceCell {
    /// `=raw*rate` for USD listings
    Formula(String),
    Amount(u64),
}

impl PriceCell {
    pub fn for_listing(listing: &ListingRecord, rate: f64) -> Self {
        if listing.is_usd {
            PriceCell::Formula(format!("={}*{}", listing.raw_price, formula_number(rate)))
        } else {
            PriceCell::Amount(listing.raw_price)
        }
    }

    fn text(&self) -> String {
        match self {
            PriceCell::Formula(formula) => formula.clone(),
            PriceCell::Amount(amount) => amount.to_string(),
        }
    }
}

/// Rate as it appears in a formula, always with a decimal point (`1155.0`)
fn formula_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Average over the price column, rows 2 through the last data row
pub fn average_formula(listing_count: usize) -> String {
    format!("=AVERAGE(B2:B{})", listing_count + 1)
}

fn is_web_url(link: &str) -> bool {
    (link.starts_with("http://") || link.starts_with("https://")) && link.len() <= MAX_URL_LEN
}

/// Widest text per column (header and summary row included) plus padding
pub fn column_widths(listings: &[ListingRecord], rate: f64) -> [f64; 7] {
    let mut widths = HEADERS.map(|h| h.chars().count());

    let mut fit = |cells: [String; 7]| {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    };

    for listing in listings {
        fit([
            listing.title.clone(),
            PriceCell::for_listing(listing, rate).text(),
            listing.seller.clone(),
            listing.model.clone(),
            listing.km.to_string(),
            listing.location.clone(),
            LINK_LABEL.to_string(),
        ]);
    }
    fit([
        AVERAGE_LABEL.to_string(),
        average_formula(listings.len()),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
    ]);

    widths.map(|w| (w + COLUMN_PADDING) as f64)
}

/// Render the listings into an `.xlsx` workbook
pub fn write_workbook(listings: &[ListingRecord], rate: f64) -> Result<Vec<u8>, XlsxError> {
    let header_format = Format::new().set_bold();
    let currency_format = Format::new().set_num_format(CURRENCY_FORMAT);
    let usd_format = Format::new()
        .set_num_format(CURRENCY_FORMAT)
        .set_background_color(Color::RGB(USD_FILL));
    let link_format = Format::new()
        .set_font_color(Color::RGB(LINK_COLOR))
        .set_underline(FormatUnderline::Single);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, title) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header_format)?;
    }

    for (idx, listing) in listings.iter().enumerate() {
        let row = idx as u32 + 1;

        worksheet.write_string(row, 0, &listing.title)?;
        match PriceCell::for_listing(listing, rate) {
            PriceCell::Formula(formula) => {
                worksheet.write_formula_with_format(row, 1, Formula::new(formula), &usd_format)?
            }
            PriceCell::Amount(amount) => {
                worksheet.write_number_with_format(row, 1, amount as f64, &currency_format)?
            }
        };
        worksheet.write_string(row, 2, &listing.seller)?;
        worksheet.write_string(row, 3, &listing.model)?;
        worksheet.write_number(row, 4, listing.km as f64)?;
        worksheet.write_string(row, 5, &listing.location)?;

        if is_web_url(&listing.link) {
            let url = Url::new(listing.link.as_str()).set_text(LINK_LABEL);
            worksheet.write_url_with_format(row, 6, url, &link_format)?;
        } else {
            worksheet.write_string_with_format(row, 6, LINK_LABEL, &link_format)?;
        }
    }

    let summary_row = listings.len() as u32 + 1;
    worksheet.write_string(summary_row, 0, AVERAGE_LABEL)?;
    worksheet.write_formula_with_format(
        summary_row,
        1,
        Formula::new(average_formula(listings.len())),
        &currency_format,
    )?;

    worksheet.autofilter(0, 0, summary_row, (HEADERS.len() - 1) as u16)?;

    for (col, width) in column_widths(listings, rate).into_iter().enumerate() {
        worksheet.set_column_width(col as u16, width)?;
    }

    workbook.save_to_buffer()
}

/// Download name, e.g. `Corolla-2023-19-10-2026.xlsx`
pub fn export_filename(params: &SearchParams, date: NaiveDate) -> String {
    format!(
        "{}-{}-{}.xlsx",
        params.version,
        params.year,
        date.format("%d-%m-%Y")
    )
}
