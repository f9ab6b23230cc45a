//! Drop-surface screening: type and count validation of a dropped batch.
//!
//! Rejected files never become slots; they surface as batch-level messages
//! the owner can display above the drop zone. Screening rules:
//! - a file whose MIME type is not accepted is rejected individually;
//! - a batch whose accepted files exceed the remaining capacity is rejected
//!   wholesale (zero slots created), matching the one-shot nature of a drop.

use ustr::Ustr;

/// A raw file handed over by the platform's drag-and-drop or file picker.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// A file the drop surface refused, with one or more reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub filename: String,
    pub reasons: Vec<String>,
}

impl RejectedFile {
    fn new(filename: String, reason: String) -> Self {
        Self {
            filename,
            reasons: vec![reason],
        }
    }

    /// Human-readable message: `<filename>: <reason1> & <reason2>`.
    pub fn message(&self) -> String {
        format!("{}: {}", self.filename, self.reasons.join(" & "))
    }
}

/// Result of screening one dropped batch.
#[derive(Debug, Default)]
pub struct DropOutcome {
    pub accepted: Vec<CandidateFile>,
    pub rejected: Vec<RejectedFile>,
}

impl DropOutcome {
    pub fn rejection_messages(&self) -> Vec<String> {
        self.rejected.iter().map(RejectedFile::message).collect()
    }
}

fn type_reason(accepted_types: &[Ustr]) -> String {
    let list = accepted_types
        .iter()
        .map(Ustr::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!("File type must be one of {list}")
}

/// Screen a dropped batch against the accepted MIME types and the number of
/// slots still available.
pub fn screen(
    candidates: Vec<CandidateFile>,
    accepted_types: &[Ustr],
    capacity: usize,
) -> DropOutcome {
    let mut outcome = DropOutcome::default();

    for candidate in candidates {
        let type_ok = accepted_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&candidate.mime_type));
        if type_ok {
            outcome.accepted.push(candidate);
        } else {
            outcome.rejected.push(RejectedFile::new(
                candidate.filename,
                type_reason(accepted_types),
            ));
        }
    }

    if outcome.accepted.len() > capacity {
        // Over-capacity drops do not partially apply.
        for candidate in outcome.accepted.drain(..) {
            outcome
                .rejected
                .push(RejectedFile::new(candidate.filename, "Too many files".to_owned()));
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ACCEPTED_TYPES;

    fn accepted_types() -> Vec<Ustr> {
        DEFAULT_ACCEPTED_TYPES.iter().copied().map(Ustr::from).collect()
    }

    fn file(name: &str, mime: &str) -> CandidateFile {
        CandidateFile {
            filename: name.to_owned(),
            mime_type: mime.to_owned(),
            bytes: b"bytes".to_vec(),
        }
    }

    #[test]
    fn accepts_supported_image_types() {
        let outcome = screen(
            vec![file("a.png", "image/png"), file("b.jpg", "image/jpeg")],
            &accepted_types(),
            5,
        );
        assert_eq!(outcome.accepted.len(), 2);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn rejects_unsupported_type_with_message() {
        let outcome = screen(vec![file("doc.pdf", "application/pdf")], &accepted_types(), 5);
        assert!(outcome.accepted.is_empty());
        assert_eq!(
            outcome.rejection_messages(),
            vec![
                "doc.pdf: File type must be one of image/jpeg, image/png, image/tiff, image/gif"
                    .to_owned()
            ]
        );
    }

    #[test]
    fn mime_match_is_case_insensitive() {
        let outcome = screen(vec![file("a.png", "Image/PNG")], &accepted_types(), 1);
        assert_eq!(outcome.accepted.len(), 1);
    }

    #[test]
    fn over_capacity_rejects_the_whole_batch() {
        let outcome = screen(
            vec![
                file("a.png", "image/png"),
                file("b.png", "image/png"),
                file("c.png", "image/png"),
            ],
            &accepted_types(),
            2,
        );
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.rejected.len(), 3);
        assert!(
            outcome
                .rejection_messages()
                .iter()
                .all(|m| m.ends_with("Too many files"))
        );
    }

    #[test]
    fn wrong_type_and_over_capacity_both_reported() {
        let outcome = screen(
            vec![
                file("doc.pdf", "application/pdf"),
                file("a.png", "image/png"),
                file("b.png", "image/png"),
            ],
            &accepted_types(),
            1,
        );
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.rejected.len(), 3);
    }

    #[test]
    fn multiple_reasons_join_with_ampersand() {
        let rejected = RejectedFile {
            filename: "x.bmp".to_owned(),
            reasons: vec!["wrong type".to_owned(), "Too many files".to_owned()],
        };
        assert_eq!(rejected.message(), "x.bmp: wrong type & Too many files");
    }
}
