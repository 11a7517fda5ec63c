//! Foundational low-level utilities shared across logincmd crates.
//!
//! Provides unix-millisecond time readers plus atomic JSON document and
//! JSONL journal writers used by the settings store and the run-loop outbox.

pub mod json_io;
pub mod time_utils;

pub use json_io::{append_jsonl_line, write_json_document_atomic};
pub use time_utils::{unix_now_ms, unix_now_seconds};

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;

    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Sample {
        label: String,
        count: u32,
    }

    #[test]
    fn unit_unix_now_ms_agrees_with_seconds_reader() {
        let seconds = unix_now_seconds();
        let millis = unix_now_ms();
        let millis_as_seconds = millis / 1_000;
        assert!(millis_as_seconds >= seconds);
        assert!(millis_as_seconds <= seconds.saturating_add(1));
    }

    #[test]
    fn functional_write_json_document_atomic_emits_pretty_payload_with_newline() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested/sample.json");
        let sample = Sample {
            label: "hello".to_string(),
            count: 3,
        };
        write_json_document_atomic(&path, &sample).expect("write document");
        let contents = read_to_string(&path).expect("read document");
        assert!(contents.ends_with('\n'));
        assert!(contents.contains("\"label\": \"hello\""));
    }

    #[test]
    fn functional_append_jsonl_line_accumulates_records() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("outbox.jsonl");
        append_jsonl_line(&path, &Sample {
            label: "first".to_string(),
            count: 1,
        })
        .expect("append first");
        append_jsonl_line(&path, &Sample {
            label: "second".to_string(),
            count: 2,
        })
        .expect("append second");
        let contents = read_to_string(&path).expect("read journal");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("first"));
        assert!(lines[1].contains("second"));
    }
}
