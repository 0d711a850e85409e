//! Line-oriented transport for MCP JSON-RPC communication.
//!
//! MCP uses newline-delimited JSON over stdin/stdout. One line is fully
//! handled before the next is read.

use std::io::{self, BufRead, Write};

use crate::protocol::JsonRpcResponse;
use crate::server::{Dispatcher, Outcome};

/// Transport for reading/writing JSON-RPC messages.
pub struct StdioTransport {
    reader: Box<dyn BufRead + Send>,
    writer: Box<dyn Write + Send>,
}

impl StdioTransport {
    /// Create a transport using stdin/stdout.
    pub fn stdio() -> Self {
        Self {
            reader: Box::new(io::BufReader::new(io::stdin())),
            writer: Box::new(io::stdout()),
        }
    }

    /// Create a transport with custom reader/writer.
    pub fn new(reader: Box<dyn BufRead + Send>, writer: Box<dyn Write + Send>) -> Self {
        Self { reader, writer }
    }

    /// Read one line of raw bytes without its terminator. `None` at EOF.
    ///
    /// Bytes are not checked for UTF-8 here; malformed input is answered by
    /// the dispatcher with a parse error.
    pub fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        if self.reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }

        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Write a JSON-RPC response as one line and flush.
    pub fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        let json = serde_json::to_string(response).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Serialization error: {}", e))
        })?;

        tracing::debug!("Sending: {}", json);

        writeln!(self.writer, "{}", json)?;
        self.writer.flush()
    }

    /// Dispatch every non-empty line until EOF.
    ///
    /// Returns the first read or write error; the loop stops there.
    pub async fn serve(&mut self, dispatcher: &Dispatcher) -> io::Result<()> {
        tracing::info!("Serving MCP over stdio");

        while let Some(line) = self.read_line()? {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            tracing::debug!("Received: {}", String::from_utf8_lossy(&line));

            match dispatcher.handle_raw(&line).await {
                Outcome::Respond(response) => {
                    if let Err(e) = self.write_response(&response) {
                        tracing::error!("Failed to write response: {}", e);
                        return Err(e);
                    }
                }
                Outcome::Suppressed { .. } => {}
            }
        }

        tracing::info!("EOF received, shutting down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RequestId;
    use crate::test_support::{dispatcher, MockTracker};
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn transport(input: &str) -> (StdioTransport, Arc<Mutex<Vec<u8>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let transport = StdioTransport::new(
            Box::new(Cursor::new(input.to_string())),
            Box::new(SharedWriter(buffer.clone())),
        );
        (transport, buffer)
    }

    #[test]
    fn test_read_line() {
        let (mut transport, _) = transport("first\r\n\nlast");

        assert_eq!(transport.read_line().unwrap().as_deref(), Some(&b"first"[..]));
        assert_eq!(transport.read_line().unwrap().as_deref(), Some(&b""[..]));
        assert_eq!(transport.read_line().unwrap().as_deref(), Some(&b"last"[..]));
        assert_eq!(transport.read_line().unwrap(), None);
    }

    #[test]
    fn test_read_line_keeps_invalid_utf8() {
        let mut transport = StdioTransport::new(
            Box::new(Cursor::new(b"a\xffb\r\n".to_vec())),
            Box::new(io::sink()),
        );

        assert_eq!(transport.read_line().unwrap(), Some(b"a\xffb".to_vec()));
        assert_eq!(transport.read_line().unwrap(), None);
    }

    #[test]
    fn test_write_response() {
        let (mut transport, buffer) = transport("");

        let resp = JsonRpcResponse::success(RequestId::from(1), serde_json::json!({"ok": true}));
        transport.write_response(&resp).unwrap();

        let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert_eq!(output, "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"ok\":true}}\n");
    }

    #[tokio::test]
    async fn test_serve_skips_blank_lines_and_notifications() {
        let input = "\n   \n{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n";
        let (mut transport, buffer) = transport(input);

        transport
            .serve(&dispatcher(MockTracker::new()))
            .await
            .unwrap();

        assert!(buffer.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_serve_answers_parse_errors() {
        let (mut transport, buffer) = transport("not json\n");

        transport
            .serve(&dispatcher(MockTracker::new()))
            .await
            .unwrap();

        let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        let resp: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(resp["id"], serde_json::Value::Null);
        assert_eq!(resp["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_serve_continues_after_invalid_utf8() {
        let mut input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"x\xff\"}\n".to_vec();
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n");
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let mut transport = StdioTransport::new(
            Box::new(Cursor::new(input)),
            Box::new(SharedWriter(buffer.clone())),
        );

        transport
            .serve(&dispatcher(MockTracker::new()))
            .await
            .unwrap();

        let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], serde_json::Value::Null);
        assert_eq!(lines[0]["error"]["code"], -32700);
        assert_eq!(lines[1]["id"], 2);
        assert!(lines[1]["result"]["tools"].is_array());
    }

    #[tokio::test]
    async fn test_serve_stops_on_write_failure() {
        let input = "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n";
        let mut transport = StdioTransport::new(
            Box::new(Cursor::new(input.to_string())),
            Box::new(BrokenWriter),
        );

        let err = transport
            .serve(&dispatcher(MockTracker::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
