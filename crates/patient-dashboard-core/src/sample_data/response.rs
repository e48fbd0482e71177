//! Parsing of demographic service responses.

use super::SampleDataResult;

/// Parse a response body holding a JSON array of strings.
pub fn parse_string_list(body: &str) -> SampleDataResult<Vec<String>> {
    let values: Vec<String> = serde_json::from_str(body.trim())?;
    Ok(values)
}
