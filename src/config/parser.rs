use std::path::Path;

use anyhow::Context as _;

use crate::config::ast::{ClockTime, InputSpec, SourceRef, TimeToken};
use crate::foundation::core::{FrameNumber, MediaKind, normalize_millis};
use crate::foundation::error::{SpliceError, SpliceResult};

/// Parse configuration text into input specs, in file order.
///
/// ```text
/// # intro slide, then the talk
/// [f:slides.pdf:0] 00:00:00 00:00:05
/// [a:talk.wav:v:talk.mov] 00:01:00 00:31:00
/// [f:^:last] 0 3
/// ```
#[tracing::instrument(level = "debug", skip(src))]
pub fn parse_config(src: &str) -> SpliceResult<Vec<InputSpec>> {
    let mut p = Parser { src, pos: 0 };
    let specs = p.parse_config()?;
    tracing::debug!(count = specs.len(), "parsed input specs");
    Ok(specs)
}

/// Read and parse a configuration file.
pub fn parse_config_file(path: &Path) -> SpliceResult<Vec<InputSpec>> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("read configuration '{}'", path.display()))?;
    parse_config(&src)
}

struct Head {
    kind: MediaKind,
    filename: Option<SourceRef>,
    index: Option<FrameNumber>,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + ahead).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn error(&self, msg: impl Into<String>) -> SpliceError {
        SpliceError::syntax_at(self.src, self.pos, msg)
    }

    /// Skip whitespace and `#` comments.
    fn skip_blank(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.bump();
            } else if c == b'#' {
                while self.peek().is_some_and(|c| c != b'\n') {
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn consume(&mut self, c: u8) -> bool {
        self.skip_blank();
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: u8) -> SpliceResult<()> {
        if self.consume(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c as char)))
        }
    }

    fn parse_config(&mut self) -> SpliceResult<Vec<InputSpec>> {
        let mut out = Vec::new();
        loop {
            self.skip_blank();
            match self.peek() {
                None => return Ok(out),
                Some(b'[') => out.extend(self.parse_segmentspec()?),
                Some(_) => return Err(self.error("expected '[' to start a segment spec")),
            }
        }
    }

    fn parse_segmentspec(&mut self) -> SpliceResult<Vec<InputSpec>> {
        self.expect(b'[')?;
        let mut heads = vec![self.parse_inputspec()?];
        while self.consume(b':') {
            heads.push(self.parse_inputspec()?);
        }
        self.expect(b']')?;
        let times = self.parse_timespecs()?;

        Ok(heads
            .into_iter()
            .map(|h| InputSpec {
                kind: h.kind,
                filename: h.filename,
                index: h.index,
                times: times.clone(),
            })
            .collect())
    }

    fn parse_inputspec(&mut self) -> SpliceResult<Head> {
        let kind = self.parse_kind()?;
        let mut head = Head {
            kind,
            filename: None,
            index: None,
        };

        // Filename field; may be empty (`[a::1]`).
        if !self.consume(b':') {
            return Ok(head);
        }
        self.skip_blank();
        head.filename = if kind == MediaKind::Frame && self.peek() == Some(b'^') {
            self.bump();
            Some(SourceRef::PreviousSegment)
        } else {
            self.parse_filename().map(SourceRef::File)
        };

        // Index field. A ':' not followed by an index separates the next inputspec.
        let before_colon = self.pos;
        if !self.consume(b':') {
            return Ok(head);
        }
        self.skip_blank();
        if self.at_index(kind) {
            head.index = Some(self.parse_index(kind)?);
        } else {
            self.pos = before_colon;
        }
        Ok(head)
    }

    fn parse_kind(&mut self) -> SpliceResult<MediaKind> {
        self.skip_blank();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "a" | "audio" => Ok(MediaKind::Audio),
            "v" | "video" => Ok(MediaKind::Video),
            "f" | "frame" => Ok(MediaKind::Frame),
            "" => Err(self.error("expected an input kind (a, audio, v, video, f, frame)")),
            other => {
                let msg = format!("unknown input kind '{other}'");
                self.pos = start;
                Err(self.error(msg))
            }
        }
    }

    fn at_index(&self, kind: MediaKind) -> bool {
        match self.peek() {
            Some(c) if c.is_ascii_digit() => true,
            Some(b'-') => true,
            Some(b'l') => kind == MediaKind::Frame && self.at_word("last"),
            _ => false,
        }
    }

    fn at_word(&self, word: &str) -> bool {
        self.src[self.pos..].starts_with(word)
            && !self
                .peek_at(word.len())
                .is_some_and(|c| c.is_ascii_alphanumeric())
    }

    fn parse_index(&mut self, kind: MediaKind) -> SpliceResult<FrameNumber> {
        let start = self.pos;
        if kind == MediaKind::Frame {
            if self.at_word("last") {
                self.pos += "last".len();
                return Ok(FrameNumber::Last);
            }
            if self.src[self.pos..].starts_with("-1")
                && !self.peek_at(2).is_some_and(|c| c.is_ascii_digit())
            {
                self.pos += 2;
                return Ok(FrameNumber::Last);
            }
        }
        if self.peek() == Some(b'-') {
            return Err(self.error(match kind {
                MediaKind::Frame => "negative frame index (only -1 is allowed)",
                MediaKind::Audio | MediaKind::Video => "stream index must be non-negative",
            }));
        }
        let digits = self.take_digits();
        let n: u32 = digits.parse().map_err(|_| {
            SpliceError::syntax_at(self.src, start, format!("index '{digits}' is out of range"))
        })?;
        Ok(FrameNumber::Index(n))
    }

    fn take_digits(&mut self) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        &src[start..self.pos]
    }

    /// `[A-Za-z0-9_./][-A-Za-z0-9_./ ]*`, trailing blanks dropped. `None` when absent.
    fn parse_filename(&mut self) -> Option<String> {
        let first_ok = |c: u8| c.is_ascii_alphanumeric() || matches!(c, b'_' | b'.' | b'/');
        let rest_ok = |c: u8| first_ok(c) || matches!(c, b'-' | b' ' | b'\t');

        let start = self.pos;
        if !self.peek().is_some_and(first_ok) {
            return None;
        }
        while self.peek().is_some_and(rest_ok) {
            self.bump();
        }
        Some(self.src[start..self.pos].trim_end().to_owned())
    }

    fn parse_timespecs(&mut self) -> SpliceResult<Vec<TimeToken>> {
        let mut times = Vec::new();

        self.skip_blank();
        if self.peek() == Some(b'@') {
            self.bump();
            let filename = self.parse_duration_filename()?;
            times.push(TimeToken::Timestamp(ClockTime::ZERO));
            times.push(TimeToken::DurationReference { filename });
            return Ok(times);
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            times.push(TimeToken::Timestamp(self.parse_timestamp()?));
            self.skip_blank();
            if self.peek() == Some(b'@') {
                if times.len() != 1 {
                    return Err(
                        self.error("a duration reference may only follow a single timestamp")
                    );
                }
                self.bump();
                let filename = self.parse_duration_filename()?;
                times.push(TimeToken::DurationReference { filename });
                break;
            }
        }
        Ok(times)
    }

    fn parse_duration_filename(&mut self) -> SpliceResult<String> {
        self.skip_blank();
        self.parse_filename()
            .ok_or_else(|| self.error("expected a filename after '@'"))
    }

    /// `[hh:][mm:]ss[.ms]`
    fn parse_timestamp(&mut self) -> SpliceResult<ClockTime> {
        let start = self.pos;
        let mut fields = Vec::with_capacity(3);
        loop {
            let digits = self.take_digits();
            if digits.is_empty() {
                return Err(self.error("expected digits in timestamp"));
            }
            let v: u64 = digits.parse().map_err(|_| {
                SpliceError::syntax_at(self.src, start, "timestamp field is out of range")
            })?;
            fields.push(v);
            if self.peek() == Some(b':') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                if fields.len() == 3 {
                    return Err(self.error("timestamp has more than three fields"));
                }
                self.bump();
            } else {
                break;
            }
        }

        let mut millis = 0;
        if self.peek() == Some(b'.') {
            self.bump();
            let digits = self.take_digits();
            if digits.is_empty() {
                return Err(self.error("expected digits after '.' in timestamp"));
            }
            millis = normalize_millis(digits);
        }

        if self
            .peek()
            .is_some_and(|c| !c.is_ascii_whitespace() && !matches!(c, b'#' | b'[' | b'@'))
        {
            return Err(SpliceError::syntax_at(
                self.src,
                start,
                "malformed timestamp (expected [hh:][mm:]ss[.ms])",
            ));
        }

        let (hours, minutes, seconds) = match fields.as_slice() {
            [s] => (0, 0, *s),
            [m, s] => (0, *m, *s),
            [h, m, s] => (*h, *m, *s),
            _ => return Err(self.error("timestamp has more than three fields")),
        };
        let clock = ClockTime {
            hours,
            minutes,
            seconds,
            millis,
        };
        if clock.to_timecode().is_err() {
            return Err(SpliceError::syntax_at(
                self.src,
                start,
                "timestamp is out of range",
            ));
        }
        Ok(clock)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/parser.rs"]
mod tests;
