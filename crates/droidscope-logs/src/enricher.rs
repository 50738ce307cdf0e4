use droidscope_types::LogRecord;

use crate::PidTable;

/// Attach the process name currently known for the record's pid.
///
/// A pid the table has not seen yet (or one whose process already exited)
/// leaves the name empty; it is not filled in later.
pub fn enrich(record: LogRecord, table: &PidTable) -> LogRecord {
    let name = table.name_for(&record.pid);
    record.with_process_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pid: &str) -> LogRecord {
        LogRecord::new("10-16", "09:41:02.117", pid, "1", "I", "Tag: hello")
    }

    #[test]
    fn test_known_pid_gets_name() {
        let table = PidTable::new();
        table
            .refresh_from("USER PID NAME\nu0_a1 1234 com.example.app\n")
            .unwrap();

        let enriched = enrich(record("1234"), &table);
        assert_eq!(enriched.process_name.as_deref(), Some("com.example.app"));
        assert_eq!(enriched.message, "Tag: hello");
    }

    #[test]
    fn test_unknown_pid_has_no_name() {
        let table = PidTable::new();
        table
            .refresh_from("USER PID NAME\nu0_a1 1234 com.example.app\n")
            .unwrap();

        assert!(enrich(record("999"), &table).process_name.is_none());
        assert!(enrich(record("1234"), &PidTable::new()).process_name.is_none());
    }
}
