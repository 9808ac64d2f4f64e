/// Splits a byte stream into text lines as chunks arrive.
///
/// Handles lines split across chunks and strips the `\r` a PTY adds.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode(&raw[..raw.len() - 1]));
        }
        lines
    }

    /// Returns the trailing partial line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(decode(&raw))
    }
}

fn decode(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_complete_lines() {
        let mut s = LineSplitter::new();
        assert_eq!(s.push(b"one\ntwo\n"), vec!["one", "two"]);
        assert_eq!(s.finish(), None);
    }

    #[test]
    fn joins_lines_across_chunks() {
        let mut s = LineSplitter::new();
        assert!(s.push(b"Buil").is_empty());
        assert_eq!(s.push(b"ding web\nSta"), vec!["Building web"]);
        assert_eq!(s.finish().as_deref(), Some("Sta"));
    }

    #[test]
    fn strips_carriage_returns() {
        let mut s = LineSplitter::new();
        assert_eq!(s.push(b"a\r\nb\r\n"), vec!["a", "b"]);
    }

    #[test]
    fn keeps_empty_lines() {
        let mut s = LineSplitter::new();
        assert_eq!(s.push(b"\n\nx\n"), vec!["", "", "x"]);
    }
}
