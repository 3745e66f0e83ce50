use crate::codec::RenderError;
use crate::mutator::Corruption;
use crate::span::{RemovedRange, original_spans};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable record of one variant: which bytes were removed and whether
/// the result could still be displayed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub original_filename: String,
    /// `None` for corruptions driven by a caller-supplied generator.
    pub seed: Option<u64>,
    /// Ranges as applied, each relative to the buffer left by its predecessors.
    pub chunks: Vec<RemovedRange>,
    /// The same removals expressed against the untouched input.
    pub original_spans: Vec<Vec<RemovedRange>>,
    pub output_len: usize,
    /// Hex MD5 of the corrupted container, useful for spotting duplicate variants.
    pub output_md5: String,
    pub error: Option<String>,
}

impl Report {
    /// Builds the report for `corruption`.
    ///
    /// # Arguments
    /// * `original_filename`: Name of the source the corruption was made from.
    /// * `input_len`: Length of the buffer before corruption, used to map the
    ///   removed ranges back onto it.
    /// * `corruption`: The pass being described. Its seed, if any, is copied.
    /// * `error`: The render failure, when the output could not be displayed.
    pub fn new(
        original_filename: &str,
        input_len: usize,
        corruption: &Corruption,
        error: Option<&RenderError>,
    ) -> Self {
        Report {
            original_filename: original_filename.to_string(),
            seed: corruption.seed,
            chunks: corruption.removed.clone(),
            original_spans: original_spans(input_len, &corruption.removed),
            output_len: corruption.bytes.len(),
            output_md5: format!("{:x}", md5::compute(&corruption.bytes)),
            error: error.map(ToString::to_string),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Original filename: {}", self.original_filename)?;
        match self.seed {
            Some(seed) => writeln!(f, "Seed: {seed}")?,
            None => writeln!(f, "Seed: unseeded")?,
        }
        write!(f, "Chunks removed: {}", self.chunks.len())?;
        for (idx, chunk) in self.chunks.iter().enumerate() {
            write!(
                f,
                "\nChunk {}: start={}, end={}, length={}",
                idx + 1,
                chunk.start,
                chunk.end,
                chunk.len()
            )?;
        }
        if let Some(error) = &self.error {
            write!(f, "\nError opening TIFF or generating PNG: {error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_corruption() -> Corruption {
        Corruption {
            seed: Some(7),
            bytes: vec![1, 2, 3],
            removed: vec![RemovedRange::new(10, 30), RemovedRange::new(12, 20)],
        }
    }

    #[test]
    fn text_report_lists_chunks_in_order() {
        let report = Report::new("portrait.jpg", 100, &sample_corruption(), None);
        assert_eq!(
            report.to_string(),
            "Original filename: portrait.jpg\n\
             Seed: 7\n\
             Chunks removed: 2\n\
             Chunk 1: start=10, end=30, length=20\n\
             Chunk 2: start=12, end=20, length=8"
        );
        assert!(!report.is_failure());
    }

    #[test]
    fn failed_render_appends_error_line() {
        let error = RenderError::Decode("bad strip offset".to_string());
        let report = Report::new("a.tiff", 100, &sample_corruption(), Some(&error));
        assert!(report.is_failure());
        let text = report.to_string();
        assert!(
            text.ends_with(
                "Error opening TIFF or generating PNG: Failed to decode corrupted container: bad strip offset"
            ),
            "Unexpected report text: {text}"
        );
        // The ranges are still present alongside the error.
        assert!(text.contains("Chunk 2: start=12, end=20, length=8"));
    }

    #[test]
    fn empty_corruption_reports_zero_chunks() {
        let corruption = Corruption {
            seed: Some(0),
            bytes: vec![0; 50],
            removed: vec![],
        };
        let report = Report::new("tiny.tiff", 50, &corruption, None);
        assert_eq!(
            report.to_string(),
            "Original filename: tiny.tiff\nSeed: 0\nChunks removed: 0"
        );
    }

    #[test]
    fn unseeded_corruption_is_reported_as_such() {
        let corruption = Corruption {
            seed: None,
            ..sample_corruption()
        };
        let report = Report::new("a.tiff", 100, &corruption, None);
        assert_eq!(report.seed, None);
        assert!(
            report
                .to_string()
                .starts_with("Original filename: a.tiff\nSeed: unseeded\nChunks removed: 2")
        );
        let parsed: Report = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(parsed.seed, None);
    }

    #[test]
    fn json_report_carries_digest_and_original_spans() {
        let report = Report::new("a.tiff", 100, &sample_corruption(), None);
        let json = report.to_json().unwrap();
        let parsed: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
        assert_eq!(parsed.output_md5, format!("{:x}", md5::compute([1u8, 2, 3])));
        assert_eq!(parsed.output_len, 3);
        // Second chunk [12, 20) sits behind the first cut, at original 32..40.
        assert_eq!(parsed.original_spans[1], vec![RemovedRange::new(32, 40)]);
    }
}
