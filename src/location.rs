//! Source locations and file ranges.
//!
//! A [`FileRange`] tracks a span of byte offsets into a named source buffer;
//! ranges concatenate to the minimal span covering both. A [`Location`] is a
//! resolved (line, column) pair, lazily derivable from a range plus the
//! source text.

use std::rc::Rc;

/// A byte-offset span into a single source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRange {
    pub filename: Rc<str>,
    pub start: usize,
    pub stop: usize,
}

impl FileRange {
    pub fn new(filename: Rc<str>, start: usize, stop: usize) -> Self {
        Self {
            filename,
            start,
            stop,
        }
    }

    /// Concatenates two ranges into the smallest range covering both.
    pub fn join(&self, other: &FileRange) -> FileRange {
        FileRange {
            filename: self.filename.clone(),
            start: self.start.min(other.start),
            stop: self.stop.max(other.stop),
        }
    }

    /// Resolves this range's start offset to a 1-based (line, column) pair
    /// against the given source text.
    pub fn line_column(&self, source: &str) -> (usize, usize) {
        let mut line = 1usize;
        let mut column = 1usize;
        for (offset, ch) in source.char_indices() {
            if offset >= self.start {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        (line, column)
    }
}

impl std::ops::Add for &FileRange {
    type Output = FileRange;
    fn add(self, rhs: &FileRange) -> FileRange {
        self.join(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_takes_min_start_max_stop() {
        let name: Rc<str> = Rc::from("x.mq");
        let a = FileRange::new(name.clone(), 3, 7);
        let b = FileRange::new(name, 1, 5);
        let joined = a.join(&b);
        assert_eq!(joined.start, 1);
        assert_eq!(joined.stop, 7);
    }

    #[test]
    fn line_column_tracks_newlines() {
        let name: Rc<str> = Rc::from("x.mq");
        let source = "abc\ndef";
        let r = FileRange::new(name, 5, 6);
        assert_eq!(r.line_column(source), (2, 2));
    }
}
