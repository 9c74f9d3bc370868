//! Test inputs for the `needle-upload` benchmarks.
//!
//! Bodies are generated rather than read from disk so the sizes can be tuned.

/// The boundary used by every generated body.
pub const BOUNDARY: &str = "bencher-7MA4YWxkTrZu0gW";

#[derive(Debug, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    file: TestFile,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, file: TestFile) -> Self {
        Self { name, group, file }
    }

    pub fn small(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Small, file)
    }

    pub fn normal(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Normal, file)
    }

    pub fn large(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Large, file)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }

    pub fn file_name(&self) -> &'static str {
        self.file().file_name
    }

    /// The multipart body uploading this case's file.
    pub fn body(&self) -> Vec<u8> {
        self.file.multipart_body()
    }

    /// The `Content-Type` header value matching [`Self::body`].
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }
}

/// A file to upload, optionally preceded by an unnamed form field.
#[derive(Debug, Clone)]
pub struct TestFile {
    file_name: &'static str,
    content: Vec<u8>,
    leading_field: bool,
}

impl TestFile {
    pub fn new(file_name: &'static str, content: Vec<u8>) -> Self {
        Self { file_name, content, leading_field: false }
    }

    /// Repeated log lines, highly compressible.
    pub fn text(file_name: &'static str, size: usize) -> Self {
        let line = b"2026-10-19T08:00:00Z INFO volume 3 heartbeat ok, 1024 needles, 0 deleted\n";
        Self::new(file_name, line.iter().copied().cycle().take(size).collect())
    }

    /// Pseudo random bytes that gzip can't shrink.
    pub fn binary(file_name: &'static str, size: usize) -> Self {
        let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
        let content = (0..size)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                state.to_le_bytes()[0]
            })
            .collect();
        Self::new(file_name, content)
    }

    /// Puts an unnamed form field before the file part.
    pub fn with_leading_field(mut self) -> Self {
        self.leading_field = true;
        self
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }

    fn multipart_body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.content.len() + 512);
        if self.leading_field {
            body.extend_from_slice(format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"comment\"\r\n\r\nuploaded by bencher\r\n").as_bytes());
        }
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\r\n", self.file_name).as_bytes(),
        );
        body.extend_from_slice(&self.content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}
