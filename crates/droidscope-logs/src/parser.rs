use droidscope_types::LogRecord;

/// `date time pid tid level message`
const FIELD_COUNT: usize = 6;

/// Parser for `logcat -v threadtime` lines.
///
/// Lines that start with one of the skip prefixes are treated as banners
/// (`--------- beginning of main`) and dropped.
#[derive(Clone, Debug)]
pub struct LogParser {
    skip_prefixes: Vec<String>,
}

impl LogParser {
    /// Create a parser with the given banner prefixes (empty prefixes are ignored)
    pub fn new<I, S>(skip_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip_prefixes: skip_prefixes
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    pub fn skip_prefixes(&self) -> &[String] {
        &self.skip_prefixes
    }

    /// Parse a decoded line, or `None` if it is not a log record
    pub fn parse(&self, line: &str) -> Option<LogRecord> {
        if line.is_empty() {
            return None;
        }

        if self.skip_prefixes.iter().any(|p| line.starts_with(p.as_str())) {
            return None;
        }

        // Short lines are malformed output, not a reason to fail
        let fields = split_fields(line, FIELD_COUNT);
        let [date, time, pid, tid, level, message] = fields.as_slice() else {
            return None;
        };

        Some(LogRecord::new(*date, *time, *pid, *tid, *level, *message))
    }
}

impl Default for LogParser {
    fn default() -> Self {
        Self::new(["-"])
    }
}

/// Split on whitespace runs into at most `max` fields; the last field keeps
/// its internal whitespace
fn split_fields(line: &str, max: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(max);
    let mut rest = line.trim_start();

    while !rest.is_empty() {
        if fields.len() + 1 == max {
            fields.push(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                fields.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }

    fields
}
