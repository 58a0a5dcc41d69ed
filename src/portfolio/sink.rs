use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeaders {
    pub content_type: String,
    pub content_disposition: String,
    pub file_name: String,
}

impl DocumentHeaders {
    pub fn pdf_attachment(file_name: String) -> Self {
        Self {
            content_type: PDF_CONTENT_TYPE.to_string(),
            content_disposition: format!("attachment; filename=\"{}\"", file_name),
            file_name,
        }
    }
}

/// `Jane Q Doe` becomes `Jane_Q_Doe_Portfolio.pdf`.
pub fn portfolio_file_name(display_name: &str) -> String {
    let cleaned: String = display_name
        .chars()
        .filter(|c| !matches!(c, '"' | '/' | '\\' | ';'))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let stem = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    if stem.is_empty() {
        "Student_Portfolio.pdf".to_string()
    } else {
        format!("{}_Portfolio.pdf", stem)
    }
}

/// Destination for a finished document. `begin` is only called once the whole
/// document has been produced; `abort` discards anything already written.
pub trait DocumentSink {
    fn begin(&mut self, headers: &DocumentHeaders) -> io::Result<()>;
    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()>;
    fn finish(&mut self) -> io::Result<()>;
    fn abort(&mut self, reason: &str);
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    pub headers: Option<DocumentHeaders>,
    pub body: Vec<u8>,
    pub finished: bool,
    pub aborted: Option<String>,
}

#[cfg(test)]
impl DocumentSink for MemorySink {
    fn begin(&mut self, headers: &DocumentHeaders) -> io::Result<()> {
        self.headers = Some(headers.clone());
        self.body.clear();
        Ok(())
    }

    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.body.extend_from_slice(chunk);
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        Ok(())
    }

    fn abort(&mut self, reason: &str) {
        self.body.clear();
        self.aborted = Some(reason.to_string());
    }
}

/// Writes to `<target>.partial` and renames into place on `finish`.
#[derive(Debug)]
pub struct FileSink {
    target: PathBuf,
    partial: PathBuf,
    file: Option<File>,
}

impl FileSink {
    pub fn new(target: &Path) -> Self {
        let mut partial = target.as_os_str().to_owned();
        partial.push(".partial");
        Self {
            target: target.to_path_buf(),
            partial: PathBuf::from(partial),
            file: None,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl DocumentSink for FileSink {
    fn begin(&mut self, headers: &DocumentHeaders) -> io::Result<()> {
        tracing::debug!(path = %self.target.to_string_lossy(), file_name = %headers.file_name, "writing document");
        if let Some(parent) = self.target.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.file = Some(File::create(&self.partial)?);
        Ok(())
    }

    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()> {
        match self.file.as_mut() {
            Some(f) => f.write_all(chunk),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "write_body called before begin",
            )),
        }
    }

    fn finish(&mut self) -> io::Result<()> {
        let Some(mut f) = self.file.take() else {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "finish called before begin",
            ));
        };
        f.flush()?;
        f.sync_all()?;
        drop(f);
        std::fs::rename(&self.partial, &self.target)
    }

    fn abort(&mut self, reason: &str) {
        tracing::warn!(path = %self.target.to_string_lossy(), reason, "discarding partial document");
        self.file = None;
        let _ = std::fs::remove_file(&self.partial);
    }
}
