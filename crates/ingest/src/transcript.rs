use std::path::{Path, PathBuf};

/// Raw subtitle text for one call. Passed verbatim into prompts.
#[derive(Debug, Clone)]
pub struct Transcript {
    path: PathBuf,
    text: String,
}

impl Transcript {
    pub fn new(path: PathBuf, text: String) -> Self {
        Self { path, text }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of SRT cues: blank-line separated blocks whose first line is an index.
    pub fn cue_count(&self) -> usize {
        self.text
            .replace("\r\n", "\n")
            .split("\n\n")
            .filter_map(|block| block.lines().find(|l| !l.trim().is_empty()))
            .filter(|first| first.trim().parse::<u64>().is_ok())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_count() {
        let srt = "1\n00:00:01,000 --> 00:00:03,000\nHi there.\n\n\
                   2\n00:00:03,500 --> 00:00:05,000\nLet me share my screen.\n\n\
                   3\n00:00:05,500 --> 00:00:08,000\nThis is the spreadsheet.\n";
        let transcript = Transcript::new(PathBuf::from("call.srt"), srt.to_string());
        assert_eq!(transcript.cue_count(), 3);
    }

    #[test]
    fn test_cue_count_crlf_and_plain_text() {
        let srt = "1\r\n00:00:01,000 --> 00:00:02,000\r\nA\r\n\r\n2\r\n00:00:02,000 --> 00:00:03,000\r\nB\r\n";
        let transcript = Transcript::new(PathBuf::from("call.srt"), srt.to_string());
        assert_eq!(transcript.cue_count(), 2);

        let plain = Transcript::new(PathBuf::from("notes.txt"), "just some notes".to_string());
        assert_eq!(plain.cue_count(), 0);
    }
}
