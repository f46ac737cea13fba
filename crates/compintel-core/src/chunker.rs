//! Fixed-window character chunking with overlap.
//!
//! Windows are `chunk_size` characters long and advance by
//! `chunk_size - overlap`, so consecutive chunks share exactly `overlap`
//! characters. A trailing window shorter than `min_chunk_length` is folded
//! into the previous chunk instead of being emitted (or lost).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::Chunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
    pub min_chunk_length: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 512, overlap: 64, min_chunk_length: 50 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be greater than 0".to_string()));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        if self.min_chunk_length > self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "min_chunk_length ({}) must not exceed chunk_size ({})",
                self.min_chunk_length, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Splits `text` into ordered, overlapping chunks covering all of it.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        // Byte offset of every char boundary, plus the end of the string.
        let boundaries: Vec<usize> = text.char_indices().map(|(b, _)| b).chain(std::iter::once(text.len())).collect();
        let n = boundaries.len() - 1;
        if n == 0 {
            return Vec::new();
        }

        let ChunkingConfig { chunk_size, overlap, min_chunk_length } = self.config;
        let step = chunk_size - overlap;
        let mut windows: Vec<(usize, usize)> = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + chunk_size).min(n);
            windows.push((start, end));
            if end == n {
                break;
            }
            start += step;
        }

        if windows.len() > 1 {
            if let Some(&(tail_start, tail_end)) = windows.last() {
                if tail_end - tail_start < min_chunk_length {
                    windows.pop();
                    if let Some(prev) = windows.last_mut() {
                        debug!(tail_chars = tail_end - tail_start, "merging short trailing chunk into previous");
                        prev.1 = tail_end;
                    }
                }
            }
        }

        let total = windows.len();
        windows
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| Chunk {
                text: text[boundaries[start]..boundaries[end]].to_string(),
                start,
                end,
                index,
                total,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(chunk_size: usize, overlap: usize, min_chunk_length: usize) -> Chunker {
        Chunker::new(ChunkingConfig { chunk_size, overlap, min_chunk_length }).expect("valid config")
    }

    /// Drops each chunk's overlap with its predecessor and concatenates.
    fn reassemble(chunks: &[Chunk]) -> String {
        let mut out = String::new();
        let mut covered: usize = 0;
        for chunk in chunks {
            let skip = covered.saturating_sub(chunk.start);
            out.extend(chunk.text.chars().skip(skip));
            covered = chunk.end;
        }
        out
    }

    fn sample(len: usize) -> String {
        "Vulnerability scanning with risk-based prioritization. "
            .chars()
            .cycle()
            .take(len)
            .collect()
    }

    #[test]
    fn reassembly_is_lossless() {
        let c = chunker(100, 20, 50);
        for len in [0, 1, 49, 99, 100, 101, 150, 179, 180, 181, 230, 1000, 1037] {
            let text = sample(len);
            assert_eq!(reassemble(&c.chunk(&text)), text, "len {len}");
        }
    }

    #[test]
    fn consecutive_chunks_share_exactly_overlap_chars() {
        let c = chunker(100, 20, 10);
        let chunks = c.chunk(&sample(400));
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end - pair[1].start, 20);
            let tail: String = pair[0].text.chars().skip(80).collect();
            let head: String = pair[1].text.chars().take(20).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn short_tail_is_merged_not_dropped() {
        let c = chunker(100, 20, 50);
        // Windows: [0,100), [80,180), [160,190) -> tail of 30 chars merges.
        let text = sample(190);
        let chunks = c.chunk(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].start, 80);
        assert_eq!(chunks[1].end, 190);
        assert!(chunks.iter().all(|ch| ch.total == 2));
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn no_chunk_shorter_than_minimum_unless_only_chunk() {
        let c = chunker(120, 30, 50);
        for len in 1..600 {
            let chunks = c.chunk(&sample(len));
            if chunks.len() == 1 {
                continue;
            }
            assert!(chunks.iter().all(|ch| ch.char_len() >= 50), "len {len}");
        }
        let only = c.chunk(&sample(12));
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].char_len(), 12);
    }

    #[test]
    fn offsets_are_characters_not_bytes() {
        let c = chunker(4, 1, 1);
        let text = "é漢字🙂ab";
        let chunks = c.chunk(text);
        assert_eq!(chunks[0].text, "é漢字🙂");
        assert_eq!(chunks[1].text, "🙂ab");
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn deterministic_and_indexed() {
        let c = chunker(64, 8, 20);
        let text = sample(500);
        let a = c.chunk(&text);
        let b = c.chunk(&text);
        assert_eq!(a, b);
        for (i, ch) in a.iter().enumerate() {
            assert_eq!(ch.index, i);
            assert_eq!(ch.total, a.len());
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let bad = [
            ChunkingConfig { chunk_size: 0, overlap: 0, min_chunk_length: 0 },
            ChunkingConfig { chunk_size: 64, overlap: 64, min_chunk_length: 10 },
            ChunkingConfig { chunk_size: 64, overlap: 8, min_chunk_length: 65 },
        ];
        for config in bad {
            assert!(Chunker::new(config).is_err(), "{config:?}");
        }
    }
}
