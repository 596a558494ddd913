//! Parsers for the MovieLens 100K data files.
//!
//! - `u.item`: pipe-separated, ISO-8859-1 encoded; `movieId|title|...`
//! - `u.data`: tab-separated; `userId itemId rating timestamp`
//!
//! The per-line parsers are pure so they can be tested without touching the
//! filesystem.

use crate::error::{DatasetError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read a file with ISO-8859-1 (Latin-1) encoding.
///
/// The MovieLens dataset predates UTF-8 adoption; each byte maps directly to
/// the Unicode code point of the same value.
fn read_lines_latin1(path: &Path) -> Result<Vec<String>> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let content: String = bytes.iter().map(|&b| b as char).collect();
    Ok(content.lines().map(|s| s.to_string()).collect())
}

/// Parse one `u.item` line into `(item_id, title)`
pub(crate) fn parse_item_line(line: &str, line_no: usize) -> Result<(u32, String)> {
    let mut parts = line.split('|');

    let id = parts
        .next()
        .ok_or_else(|| item_error(line_no, "Missing item id"))?
        .parse::<u32>()
        .map_err(|e| item_error(line_no, &format!("Invalid item id: {e}")))?;
    let title = parts
        .next()
        .ok_or_else(|| item_error(line_no, "Missing title"))?
        .to_string();
    Ok((id, title))
}

/// Parse one `u.data` line into `(user_id, item_id, rating)`
pub(crate) fn parse_rating_line(line: &str, line_no: usize) -> Result<(u32, u32, f32)> {
    let mut parts = line.split('\t');

    let user_id = next_field(&mut parts, line_no, "user id")?
        .parse::<u32>()
        .map_err(|e| rating_error(line_no, &format!("Invalid user id: {e}")))?;
    let item_id = next_field(&mut parts, line_no, "item id")?
        .parse::<u32>()
        .map_err(|e| rating_error(line_no, &format!("Invalid item id: {e}")))?;
    let rating = next_field(&mut parts, line_no, "rating")?
        .parse::<f32>()
        .map_err(|e| rating_error(line_no, &format!("Invalid rating: {e}")))?;

    // Trailing timestamp field is ignored
    Ok((user_id, item_id, rating))
}

fn next_field<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    line_no: usize,
    name: &str,
) -> Result<&'a str> {
    parts
        .next()
        .ok_or_else(|| rating_error(line_no, &format!("Missing {name}")))
}

fn item_error(line: usize, reason: &str) -> DatasetError {
    DatasetError::Parse {
        file: "u.item".to_string(),
        line,
        reason: reason.to_string(),
    }
}

fn rating_error(line: usize, reason: &str) -> DatasetError {
    DatasetError::Parse {
        file: "u.data".to_string(),
        line,
        reason: reason.to_string(),
    }
}

/// Parse `u.item` into an item-id-to-title map
pub fn parse_items(path: &Path) -> Result<HashMap<u32, String>> {
    let lines = read_lines_latin1(path)?;
    let mut items = HashMap::new();

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let (id, title) = parse_item_line(trimmed, idx + 1)?;
        items.insert(id, title);
    }
    Ok(items)
}

/// Parse `u.data` into raw `(user_id, item_id, rating)` rows
pub fn parse_ratings(path: &Path) -> Result<Vec<(u32, u32, f32)>> {
    let lines = read_lines_latin1(path)?;
    let mut ratings = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        ratings.push(parse_rating_line(trimmed, idx + 1)?);
    }
    Ok(ratings)
}
