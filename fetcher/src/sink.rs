use crate::model::{ImportRecord, PageResult};
use async_trait::async_trait;
use fetcher_core::Result;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};

#[async_trait]
pub trait Sink: Send {
    /// Append every record of `page`, returning the number of lines written.
    async fn write_page(&mut self, page: &PageResult) -> Result<usize>;
}

/// Appends one line per import record to a plain text file. The file is
/// not opened (or created) until the first record arrives.
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: None,
        }
    }

    async fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .await?;

                info!(path = %self.path.display(), "Appending import logs");
                BufWriter::new(file)
            }
        };

        Ok(self.writer.insert(writer))
    }
}

#[async_trait]
impl Sink for FileSink {
    #[instrument(skip(self, page), fields(page = page.page_number))]
    async fn write_page(&mut self, page: &PageResult) -> Result<usize> {
        if page.records.is_empty() {
            return Ok(0);
        }

        let writer = self.writer().await?;
        for record in &page.records {
            let mut line = format_record(record);
            line.push('\n');
            writer.write_all(line.as_bytes()).await?;
        }
        // A page is durable before the next one is handed over
        writer.flush().await?;

        debug!(lines = page.records.len(), "Page written");
        Ok(page.records.len())
    }
}

pub fn format_record(record: &ImportRecord) -> String {
    format!(
        "[INFO] ID: {} TIME: {}\tSTATUS: {}\tBATCHES: {}\tERRORS: {}",
        record.id,
        record.created_at,
        record.workflow_state,
        format_list(&record.batch_identifiers),
        format_list(&record.processing_errors),
    )
}

/// Renders a list the way existing log readers expect: `['a', "b's"]`.
fn format_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| quote(item)).collect();
    format!("[{}]", quoted.join(", "))
}

// Double quotes only when the text has a single quote and no double quote;
// otherwise single quotes with `'` escaped.
fn quote(text: &str) -> String {
    let delimiter = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push(delimiter);
    for ch in text.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c == delimiter => {
                quoted.push('\\');
                quoted.push(c);
            }
            c if c.is_control() && (c as u32) < 0x100 => {
                quoted.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => quoted.push(c),
        }
    }
    quoted.push(delimiter);
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record(id: u64) -> ImportRecord {
        ImportRecord {
            id,
            created_at: "2024-05-06T07:08:09Z".to_string(),
            workflow_state: "imported".to_string(),
            batch_identifiers: Vec::new(),
            processing_errors: Vec::new(),
        }
    }

    #[test]
    fn formats_record_with_empty_lists() {
        assert_eq!(
            format_record(&record(42)),
            "[INFO] ID: 42 TIME: 2024-05-06T07:08:09Z\tSTATUS: imported\tBATCHES: []\tERRORS: []"
        );
    }

    #[test]
    fn formats_record_with_lists() {
        let mut rec = record(7);
        rec.workflow_state = "failed_with_messages".to_string();
        rec.batch_identifiers = vec!["fall-2024".to_string(), "users".to_string()];
        rec.processing_errors = vec!["users.csv: missing user_id".to_string()];

        assert_eq!(
            format_record(&rec),
            "[INFO] ID: 7 TIME: 2024-05-06T07:08:09Z\tSTATUS: failed_with_messages\t\
             BATCHES: ['fall-2024', 'users']\tERRORS: ['users.csv: missing user_id']"
        );
    }

    #[test]
    fn quotes_apostrophes_like_existing_logs() {
        let mut rec = record(3);
        rec.processing_errors = vec!["Couldn't find user".to_string()];
        assert!(format_record(&rec).ends_with("ERRORS: [\"Couldn't find user\"]"));
    }

    #[test]
    fn escapes_backslashes_and_mixed_quotes() {
        assert_eq!(quote(r"C:\imports\users.csv"), r"'C:\\imports\\users.csv'");
        assert_eq!(quote(r#"it's "quoted""#), r#"'it\'s "quoted"'"#);
        assert_eq!(quote("plain"), "'plain'");
        assert_eq!(quote("line one\nline two"), r"'line one\nline two'");
        assert_eq!(
            format_list(&["a".to_string(), "b's".to_string()]),
            r#"['a', "b's"]"#
        );
    }

    #[tokio::test]
    async fn file_sink_appends_to_existing_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs.log");
        std::fs::write(&path, "previous run\n").unwrap();

        let mut sink = FileSink::new(&path);
        let written = sink
            .write_page(&PageResult {
                page_number: 1,
                records: vec![record(1), record(2)],
            })
            .await
            .unwrap();
        assert_eq!(written, 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "previous run");
        assert!(lines[1].starts_with("[INFO] ID: 1 "));
        assert!(lines[2].starts_with("[INFO] ID: 2 "));
    }

    #[tokio::test]
    async fn empty_page_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs.log");

        let mut sink = FileSink::new(&path);
        let written = sink
            .write_page(&PageResult {
                page_number: 9,
                records: Vec::new(),
            })
            .await
            .unwrap();

        assert_eq!(written, 0);
        assert!(!path.exists());
    }

    #[test]
    fn file_is_not_created_before_first_record() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs.log");

        let _sink = FileSink::new(&path);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn write_fails_for_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("logs.log");

        let mut sink = FileSink::new(&path);
        let result = sink
            .write_page(&PageResult {
                page_number: 1,
                records: vec![record(1)],
            })
            .await;
        assert!(result.is_err());
    }
}
