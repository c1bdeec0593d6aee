// Copyright (c) 2022 Jason White
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

//! Parses the precomputed package dependency-edge file.
//!
//! The grammar is deliberately tiny:
//!
//! ```text
//! # comments allowed
//! NAME:VERSION:PARENT1 PARENT2 ...
//! NAME:VERSION:
//! NAME::
//! ```
//!
//! Fields are split on the first two colons only, so parent names themselves
//! may not contain colons but everything else about the line is free-form.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::EdgeFileError;

/// A single parsed line of the edge file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub name: String,
    pub version: String,
    pub parents: Vec<String>,
}

/// Parses the edge file at `path`, returning the records in file order.
pub fn parse<P: AsRef<Path>>(path: P) -> Result<Vec<Edge>, EdgeFileError> {
    let path = path.as_ref();

    let file = fs::File::open(path).map_err(|cause| EdgeFileError::Open {
        path: path.to_path_buf(),
        cause,
    })?;

    let reader = BufReader::new(file);
    let mut edges = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|cause| EdgeFileError::Open {
            path: path.to_path_buf(),
            cause,
        })?;

        let text = line.trim_end();

        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        edges.push(parse_line(path, i + 1, text)?);
    }

    Ok(edges)
}

fn parse_line(path: &Path, line_no: usize, text: &str) -> Result<Edge, EdgeFileError> {
    let malformed = || EdgeFileError::Malformed {
        path: path.to_path_buf(),
        line: line_no,
        text: text.to_string(),
    };

    let mut parts = text.splitn(3, ':');

    let name = parts.next().ok_or_else(malformed)?.trim();
    let version = parts.next().ok_or_else(malformed)?.trim();
    let parents_field = parts.next().unwrap_or("");

    if name.is_empty() {
        return Err(malformed());
    }

    let parents = parents_field
        .split_ascii_whitespace()
        .map(|s| s.to_string())
        .collect();

    Ok(Edge {
        name: name.to_string(),
        version: version.to_string(),
        parents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_basic_lines() {
        let f = write_tmp(
            "# a comment\n\
             A::\n\
             B:1.2.3:A\n\
             C::A B\n",
        );

        let edges = parse(f.path()).unwrap();

        assert_eq!(
            edges,
            vec![
                Edge {
                    name: "A".into(),
                    version: "".into(),
                    parents: vec![],
                },
                Edge {
                    name: "B".into(),
                    version: "1.2.3".into(),
                    parents: vec!["A".into()],
                },
                Edge {
                    name: "C".into(),
                    version: "".into(),
                    parents: vec!["A".into(), "B".into()],
                },
            ]
        );
    }

    #[test]
    fn skips_blank_lines() {
        let f = write_tmp("A::\n\n\nB::A\n");
        let edges = parse(f.path()).unwrap();
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn trims_whitespace_in_name_and_version() {
        let f = write_tmp(" A : 1.0 : \n");
        let edges = parse(f.path()).unwrap();
        assert_eq!(edges[0].name, "A");
        assert_eq!(edges[0].version, "1.0");
        assert!(edges[0].parents.is_empty());
    }

    #[test]
    fn splits_parents_on_whitespace_runs() {
        let f = write_tmp("C::A   B\tD\n");
        let edges = parse(f.path()).unwrap();
        assert_eq!(edges[0].parents, vec!["A", "B", "D"]);
    }

    #[test]
    fn empty_name_is_malformed() {
        let f = write_tmp(":1.0:A\n");
        let err = parse(f.path()).unwrap_err();
        assert!(matches!(err, EdgeFileError::Malformed { .. }));
    }

    #[test]
    fn missing_file_errors() {
        let err = parse("/nonexistent/path/to/edges").unwrap_err();
        assert!(matches!(err, EdgeFileError::Open { .. }));
    }
}
