//! Tokenizer for connectionless command text.
//!
//! Incoming out-of-band datagrams are ASCII command lines. The first token
//! names the event; the handler pulls the remaining arguments through the
//! same parser.

pub struct TokenParser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> TokenParser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.text[self.pos..]
    }

    /// Next whitespace-delimited token. Double quotes group a token with
    /// embedded spaces. With `crossline` false the scan stops at the end of
    /// the current line.
    pub fn get_token(&mut self, crossline: bool) -> &'a str {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() && (bytes[self.pos] as char).is_ascii_whitespace() {
            if bytes[self.pos] == b'\n' && !crossline {
                return "";
            }
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return "";
        }

        if bytes[self.pos] == b'"' {
            self.pos += 1;
            let start = self.pos;
            while self.pos < bytes.len() && bytes[self.pos] != b'"' && bytes[self.pos] != b'\n' {
                self.pos += 1;
            }
            let token = &self.text[start..self.pos];
            if self.pos < bytes.len() && bytes[self.pos] == b'"' {
                self.pos += 1;
            }
            return token;
        }

        let start = self.pos;
        while self.pos < bytes.len() && !(bytes[self.pos] as char).is_ascii_whitespace() {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    /// Rest of the current line, without the trailing newline.
    pub fn get_line(&mut self, crossline: bool) -> &'a str {
        if crossline {
            let bytes = self.text.as_bytes();
            while self.pos < bytes.len() && (bytes[self.pos] as char).is_ascii_whitespace() {
                self.pos += 1;
            }
        }
        let rest = self.remaining();
        match rest.find('\n') {
            Some(n) => {
                let line = &rest[..n];
                self.pos += n + 1;
                line.strip_suffix('\r').unwrap_or(line)
            }
            None => {
                self.pos = self.text.len();
                rest
            }
        }
    }

    /// Next token as an integer; non-numeric tokens read as 0.
    pub fn get_integer(&mut self, crossline: bool) -> i32 {
        crate::info::parse_integer_prefix(self.get_token(crossline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_and_integers() {
        let mut p = TokenParser::new("challengeResponse 12345 extra");
        assert_eq!(p.get_token(true), "challengeResponse");
        assert_eq!(p.get_integer(false), 12345);
        assert_eq!(p.get_token(false), "extra");
        assert_eq!(p.get_token(true), "");
    }

    #[test]
    fn quoted_token_keeps_spaces() {
        let mut p = TokenParser::new("connect \"\\name\\player one\" tail");
        assert_eq!(p.get_token(true), "connect");
        assert_eq!(p.get_token(true), "\\name\\player one");
        assert_eq!(p.get_token(true), "tail");
    }

    #[test]
    fn line_stops_at_newline() {
        let mut p = TokenParser::new("droperror\nServer is full.\nnext");
        assert_eq!(p.get_token(true), "droperror");
        assert_eq!(p.get_line(true), "Server is full.");
        assert_eq!(p.get_token(true), "next");
    }

    #[test]
    fn crossline_false_does_not_leave_line() {
        let mut p = TokenParser::new("first\nsecond");
        assert_eq!(p.get_token(false), "first");
        assert_eq!(p.get_token(false), "");
    }

    #[test]
    fn non_numeric_integer_reads_zero() {
        let mut p = TokenParser::new("abc");
        assert_eq!(p.get_integer(true), 0);
    }
}
