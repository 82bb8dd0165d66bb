//! Backslash-delimited key/value payloads.
//!
//! The connect request and the status/info queries carry their parameters as
//! a single `\key\value\key\value` string.

/// Builder for an outgoing info string.
#[derive(Debug, Default, Clone)]
pub struct Info {
    payload: String,
}

impl Info {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `\key\value`. Keys are not deduplicated; the reader takes the
    /// first match, so set each key once.
    pub fn set_value_for_key(&mut self, key: &str, value: &str) {
        self.payload.push('\\');
        self.payload.push_str(key);
        self.payload.push('\\');
        self.payload.push_str(value);
    }

    pub fn get_string(&self) -> &str {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Zero-copy reader over a received info string.
#[derive(Debug, Clone, Copy)]
pub struct ReadOnlyInfo<'a> {
    payload: &'a str,
}

impl<'a> ReadOnlyInfo<'a> {
    pub fn new(payload: &'a str) -> Self {
        Self { payload }
    }

    /// First value stored under `key`, if any.
    pub fn value_for_key(&self, key: &str) -> Option<&'a str> {
        let mut fields = self.payload.split('\\');
        // leading backslash produces an empty first field
        fields.next();
        while let Some(k) = fields.next() {
            let v = fields.next().unwrap_or("");
            if k == key {
                return Some(v);
            }
        }
        None
    }

    /// Integer value under `key`; missing or non-numeric values read as 0.
    /// Parsing stops at the first non-digit, so "2.40" reads as 2.
    pub fn int_value_for_key(&self, key: &str) -> i32 {
        self.value_for_key(key).map_or(0, parse_integer_prefix)
    }
}

pub(crate) fn parse_integer_prefix(s: &str) -> i32 {
    let s = s.trim_start();
    let (neg, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().unwrap_or(0);
    let value = if neg { -value } else { value };
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_backslash_payload() {
        let mut info = Info::new();
        info.set_value_for_key("challenge", "12345");
        info.set_value_for_key("name", "player one");
        assert_eq!(info.get_string(), "\\challenge\\12345\\name\\player one");
        assert_eq!(info.len(), info.get_string().len());
    }

    #[test]
    fn reads_values_back() {
        let info = ReadOnlyInfo::new("\\protocol\\17\\gamever\\2.40\\sv_maxclients\\32");
        assert_eq!(info.value_for_key("gamever"), Some("2.40"));
        assert_eq!(info.int_value_for_key("protocol"), 17);
        assert_eq!(info.int_value_for_key("sv_maxclients"), 32);
        assert_eq!(info.value_for_key("missing"), None);
        assert_eq!(info.int_value_for_key("gamever"), 2);
        assert_eq!(info.int_value_for_key("missing"), 0);
    }

    #[test]
    fn empty_info() {
        let info = Info::new();
        assert!(info.is_empty());
        let read = ReadOnlyInfo::new("");
        assert_eq!(read.value_for_key("anything"), None);
        assert_eq!(read.int_value_for_key("anything"), 0);
    }
}
