//! Seed URL loading (spec.md §4.8 step 1, "load seed URLs via external
//! reader"). Grounded in `original_source/src/mpi_coordinator.py`'s
//! `_load_seed_urls`: one URL per line, blank lines skipped, each line
//! normalized and silently dropped if it doesn't survive normalization.

use std::path::Path;

use crate::canonical::normalize;
use url::Url;

pub fn load_seed_urls(path: &Path) -> std::io::Result<Vec<Url>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(parse_seed_urls(&contents))
}

pub fn parse_seed_urls(contents: &str) -> Vec<Url> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| normalize(line, None))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blank_lines_and_normalizes() {
        let input = "https://Example.com/\n\n   \nhttps://example.com/foo/\nnot a url\n";
        let urls = parse_seed_urls(input);
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].as_str(), "https://example.com/");
        assert_eq!(urls[1].as_str(), "https://example.com/foo");
    }
}
