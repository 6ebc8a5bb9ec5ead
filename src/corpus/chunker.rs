//! Recursive character text splitter
//!
//! Splits on the coarsest separator present (paragraph, line, word, char),
//! recursing into pieces that are still too long, then merges neighbouring
//! pieces back up to `chunk_size` characters with `chunk_overlap` characters
//! of shared context between consecutive chunks.

use std::collections::VecDeque;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl RecursiveSplitter {
    /// Overlap is clamped below `chunk_size`; a zero size is treated as 1
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            let trimmed = text.trim();
            return if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_string()]
            };
        }
        self.split_with(text, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len() - 1);
        let separator = separators[position];
        let finer = &separators[position + 1..];

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<String> = Vec::new();

        for piece in pieces {
            if char_len(&piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, separator));
                fitting.clear();
            }

            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_with(&piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, separator));
        }

        chunks
    }

    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        let emit = |current: &VecDeque<&str>, chunks: &mut Vec<String>| {
            let joined = current.iter().copied().collect::<Vec<_>>().join(separator);
            let trimmed = joined.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
        };

        for piece in pieces {
            let len = char_len(piece);
            let joiner = if current.is_empty() { 0 } else { sep_len };

            if total + len + joiner > self.chunk_size {
                if !current.is_empty() {
                    emit(&current, &mut chunks);

                    // Keep a tail of the previous chunk as overlap
                    while total > self.chunk_overlap
                        || (total > 0
                            && total + len + if current.is_empty() { 0 } else { sep_len }
                                > self.chunk_size)
                    {
                        let Some(front) = current.pop_front() else {
                            break;
                        };
                        total -= char_len(front) + if current.is_empty() { 0 } else { sep_len };
                    }
                    if current.is_empty() {
                        total = 0;
                    }
                }
            }

            let joiner = if current.is_empty() { 0 } else { sep_len };
            current.push_back(piece);
            total += len + joiner;
        }

        if !current.is_empty() {
            emit(&current, &mut chunks);
        }

        chunks
    }
}
