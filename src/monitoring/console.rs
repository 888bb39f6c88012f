//! Interactive commands read from the terminal while the monitor runs
//!
//! Lines are read on a plain OS thread and forwarded over a channel. A blocked
//! read on that thread never keeps the async runtime from shutting down.

use crate::client::TableName;
use std::io::BufRead;
use std::thread;
use tokio::sync::mpsc;
use tracing::debug;

/// One parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Empty line: refresh now
    Refresh,
    /// `dataset <id>`
    SaveDataset(String),
    /// `page <telemetry|access> <n>`
    Page(TableName, usize),
    /// `notify <on|off>`
    Notifications(bool),
}

impl ConsoleCommand {
    /// Parse a console line; the error is a message for the user
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (None, ..) => Ok(ConsoleCommand::Refresh),
            (Some("dataset"), Some(id), None, _) => {
                Ok(ConsoleCommand::SaveDataset(id.to_string()))
            }
            (Some("page"), Some(table), Some(page), None) => {
                let table = match table {
                    "telemetry" => TableName::Telemetry,
                    "access" => TableName::Access,
                    other => return Err(format!("Unknown table '{other}'")),
                };
                page.parse::<usize>()
                    .map(|page| ConsoleCommand::Page(table, page))
                    .map_err(|_| format!("Invalid page number '{page}'"))
            }
            (Some("notify"), Some("on"), None, _) => Ok(ConsoleCommand::Notifications(true)),
            (Some("notify"), Some("off"), None, _) => Ok(ConsoleCommand::Notifications(false)),
            _ => Err(format!("Unknown command: {}", line.trim())),
        }
    }
}

/// Forward lines from `reader` over a channel, reading on a dedicated thread.
///
/// The thread ends at EOF, on a read error, or once the receiver is gone and
/// the next line arrives.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);

    thread::spawn(move || {
        for line in reader.lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
        debug!("Console reader finished");
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor, Read};
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    /// Reader that blocks until its sender is dropped
    struct Stalled(std_mpsc::Receiver<()>);

    impl Read for Stalled {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ConsoleCommand::parse(""), Ok(ConsoleCommand::Refresh));
        assert_eq!(ConsoleCommand::parse("   "), Ok(ConsoleCommand::Refresh));
        assert_eq!(
            ConsoleCommand::parse("dataset  abc123 "),
            Ok(ConsoleCommand::SaveDataset("abc123".to_string()))
        );
        assert_eq!(
            ConsoleCommand::parse("page access 3"),
            Ok(ConsoleCommand::Page(TableName::Access, 3))
        );
        assert_eq!(
            ConsoleCommand::parse("notify off"),
            Ok(ConsoleCommand::Notifications(false))
        );
    }

    #[test]
    fn test_parse_rejects_malformed_commands() {
        assert!(ConsoleCommand::parse("page racks 2").is_err());
        assert!(ConsoleCommand::parse("page telemetry two").is_err());
        assert!(ConsoleCommand::parse("notify maybe").is_err());
        assert!(ConsoleCommand::parse("dataset a b").is_err());
        assert!(ConsoleCommand::parse("quit").is_err());
    }

    #[tokio::test]
    async fn test_lines_are_forwarded_in_order() {
        let mut lines = spawn_line_reader(Cursor::new("\ndataset x\n"));
        assert_eq!(lines.recv().await.as_deref(), Some(""));
        assert_eq!(lines.recv().await.as_deref(), Some("dataset x"));
        assert_eq!(lines.recv().await, None);
    }

    #[test]
    fn test_blocked_reader_does_not_hold_up_runtime_shutdown() {
        let (hold_open, stalled) = std_mpsc::channel::<()>();
        let (done_tx, done_rx) = std_mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                let mut lines = spawn_line_reader(BufReader::new(Stalled(stalled)));
                let waited = tokio::time::timeout(Duration::from_millis(50), lines.recv()).await;
                assert!(waited.is_err());
            });
            drop(runtime);
            let _ = done_tx.send(());
        });

        assert!(
            done_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
            "runtime shutdown waited on a blocked console read"
        );
        drop(hold_open);
    }
}
