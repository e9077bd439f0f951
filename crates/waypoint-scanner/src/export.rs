//! Flat review rows for spreadsheet export.
//!
//! Each (place, review) pair becomes one row with the place fields repeated.
//! Filtering happens before this point; every review passed in is written.

use crate::error::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use waypoint_core::Place;

/// One exported row. Field order is the column order of the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub name: String,
    pub url: String,
    pub page: u32,
    pub rating: Option<u32>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub day: Option<u32>,
    pub month: Option<String>,
    pub year: Option<i32>,
    pub mode: &'static str,
    #[serde(rename = "placeId")]
    pub place_id: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Flatten places into rows, place order then review order.
#[must_use]
pub fn rows(places: &[Place]) -> Vec<ExportRow> {
    places
        .iter()
        .flat_map(|place| {
            place.reviews.iter().map(move |review| {
                let meta = &review.metadata;
                ExportRow {
                    name: place.name.clone(),
                    url: place.url.clone(),
                    page: place.page,
                    rating: meta.rating,
                    title: meta.title.clone(),
                    text: meta.text.clone(),
                    day: meta.day,
                    month: meta.month.as_ref().map(ToString::to_string),
                    year: meta.year,
                    mode: place.mode.as_str(),
                    place_id: place.place_id.clone(),
                    lat: place.coordinates.map(|c| c.lat),
                    lng: place.coordinates.map(|c| c.lng),
                }
            })
        })
        .collect()
}

/// Write rows with a header line to any writer; returns the row count.
pub fn write_rows<W: Write>(writer: W, rows: &[ExportRow]) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        // serde only emits the header alongside the first record
        csv.write_record(HEADER)?;
    }
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(rows.len())
}

/// Export places to a CSV file, replacing any existing file.
pub fn write_csv(path: &Path, places: &[Place]) -> Result<usize> {
    let file = BufWriter::new(File::create(path)?);
    let written = write_rows(file, &rows(places))?;
    tracing::info!(rows = written, path = %path.display(), "exported reviews");
    Ok(written)
}

const HEADER: [&str; 13] = [
    "name", "url", "page", "rating", "title", "text", "day", "month", "year", "mode", "placeId",
    "lat", "lng",
];
