//! Seams to the external OCR and annotation collaborators.
//!
//! Both ship as adapters around an operator-configured command: the image path
//! (or page text on stdin) goes in, a JSON object comes out on stdout.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::warn;

use crate::model::{Annotation, RawExtraction};

pub trait PageTranscriber {
    fn transcribe(&mut self, image: &Path) -> Result<RawExtraction>;
}

pub trait PageAnnotator {
    fn analyze(&mut self, text: &str) -> Result<Annotation>;
}

/// Any transcriber failure becomes an empty extraction; the image stays a gap.
pub fn transcribe_or_empty(transcriber: &mut dyn PageTranscriber, image: &Path) -> RawExtraction {
    match transcriber.transcribe(image) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(image = %image.display(), error = %err, "transcription failed; treating page as empty");
            RawExtraction::default()
        }
    }
}

pub fn analyze_or_default(annotator: &mut dyn PageAnnotator, text: &str) -> Annotation {
    match annotator.analyze(text) {
        Ok(annotation) => annotation,
        Err(err) => {
            warn!(error = %err, "annotation failed; treating page as unflagged");
            Annotation::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandTranscriber {
    program: String,
    args: Vec<String>,
}

impl CommandTranscriber {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl PageTranscriber for CommandTranscriber {
    fn transcribe(&mut self, image: &Path) -> Result<RawExtraction> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(image)
            .output()
            .with_context(|| format!("failed to execute {} for {}", self.program, image.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} returned non-zero exit status for {}: {}",
                self.program,
                image.display(),
                stderr.trim()
            );
        }

        parse_raw_extraction(&output.stdout)
            .with_context(|| format!("unusable transcription for {}", image.display()))
    }
}

#[derive(Debug, Clone)]
pub struct CommandAnnotator {
    program: String,
    args: Vec<String>,
}

impl CommandAnnotator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl PageAnnotator for CommandAnnotator {
    fn analyze(&mut self, text: &str) -> Result<Annotation> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to execute {}", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .with_context(|| format!("failed to send page text to {}", self.program))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for {}", self.program))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} returned non-zero exit status: {}", self.program, stderr.trim());
        }

        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("{} returned invalid annotation json", self.program))
    }
}

/// Minimal shape check over the collaborator's JSON. Empty output is an empty page.
pub fn parse_raw_extraction(raw: &[u8]) -> Result<RawExtraction> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(RawExtraction::default());
    }

    let value: Value = serde_json::from_slice(raw).context("transcription is not valid json")?;
    let Some(object) = value.as_object() else {
        bail!("transcription is not a json object");
    };

    let content = match object.get("content") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => bail!("transcription content is not a string: {other}"),
    };

    Ok(RawExtraction {
        content,
        page_number: object.get("page_number").and_then(page_number_from_value),
    })
}

fn page_number_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.fract() == 0.0)
                .map(|float| float as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl PageTranscriber for Failing {
        fn transcribe(&mut self, _image: &Path) -> Result<RawExtraction> {
            bail!("connection reset")
        }
    }

    impl PageAnnotator for Failing {
        fn analyze(&mut self, _text: &str) -> Result<Annotation> {
            bail!("quota exceeded")
        }
    }

    #[test]
    fn parses_content_and_lenient_page_numbers() {
        let raw = parse_raw_extraction(br#"{"content": "hello world", "page_number": 12}"#).unwrap();
        assert_eq!(raw.content.as_deref(), Some("hello world"));
        assert_eq!(raw.page_number, Some(12));

        let raw = parse_raw_extraction(br#"{"content": null, "page_number": "7"}"#).unwrap();
        assert_eq!(raw.content, None);
        assert_eq!(raw.page_number, Some(7));

        let raw = parse_raw_extraction(br#"{"content": "x", "page_number": "vii"}"#).unwrap();
        assert_eq!(raw.page_number, None);

        let raw = parse_raw_extraction(br#"{"content": "x", "page_number": 3.0}"#).unwrap();
        assert_eq!(raw.page_number, Some(3));
    }

    #[test]
    fn empty_output_is_an_empty_page() {
        assert_eq!(parse_raw_extraction(b"  \n").unwrap(), RawExtraction::default());
    }

    #[test]
    fn non_json_output_is_an_error() {
        assert!(parse_raw_extraction(b"Sorry, I cannot read this").is_err());
        assert!(parse_raw_extraction(b"[1, 2]").is_err());
    }

    #[test]
    fn failures_degrade_to_empty_results() {
        let raw = transcribe_or_empty(&mut Failing, Path::new("IMG_0001.jpg"));
        assert_eq!(raw, RawExtraction::default());

        let annotation = analyze_or_default(&mut Failing, "text");
        assert!(!annotation.flag);
        assert!(annotation.findings.is_empty());
    }

    #[test]
    fn annotation_accepts_sensation_field_names() {
        let annotation: Annotation = serde_json::from_str(
            r#"{"sensations_found": true, "sensations": [{"name": "shivering", "quote": "I shook"}]}"#,
        )
        .unwrap();
        assert!(annotation.flag);
        assert_eq!(annotation.findings.len(), 1);
    }

    #[test]
    fn missing_program_is_a_transcription_error() {
        let mut transcriber = CommandTranscriber::new("pageledger-no-such-ocr-tool", Vec::new());
        assert!(transcriber.transcribe(Path::new("IMG_0001.jpg")).is_err());
    }
}
