//! One-shot RPC handler.
//!
//! Reads a single JSON request envelope from stdin, dispatches it, and writes
//! the response body to stdout:
//!
//!   measure-manager rpc < request.json

use std::io::{self, BufRead, Read, Write};

use mm_protocol::{RpcError, RpcRequest, RpcResponse};

use crate::dispatcher::RequestDispatcher;

/// Stdin/stdout front end for the dispatcher.
pub struct RpcHandler {
    dispatcher: RequestDispatcher,
}

impl RpcHandler {
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Run the RPC handler, reading from stdin and writing to stdout.
    pub fn run(&self) -> io::Result<()> {
        self.run_with_io(&mut io::stdin().lock(), &mut io::stdout().lock())
    }

    /// Run the RPC handler with custom I/O (for testing).
    pub fn run_with_io<R: BufRead, W: Write>(&self, reader: &mut R, writer: &mut W) -> io::Result<()> {
        let response = match self.read_request(reader) {
            Ok(request) => self.dispatcher.dispatch(&request),
            Err(e) => RpcResponse::error(e),
        };
        self.write_response(writer, &response)
    }

    fn read_request<R: BufRead>(&self, reader: &mut R) -> Result<RpcRequest, RpcError> {
        let mut input = String::new();
        reader
            .read_to_string(&mut input)
            .map_err(|e| RpcError::invalid_request(format!("failed to read request: {}", e)))?;

        serde_json::from_str(&input)
            .map_err(|e| RpcError::invalid_request(format!("invalid JSON: {}", e)))
    }

    fn write_response<W: Write>(&self, writer: &mut W, response: &RpcResponse) -> io::Result<()> {
        let json = serde_json::to_string(response)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{}", json)?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheCoordinator;
    use crate::collab::{Collaborators, ExtractorConfig};
    use mm_protocol::ErrorCode;
    use std::io::Cursor;

    fn create_handler() -> RpcHandler {
        RpcHandler::new(RequestDispatcher::new(CacheCoordinator::new(
            Collaborators::standard(&ExtractorConfig::default()),
        )))
    }

    fn run(input: &str) -> RpcResponse {
        let mut reader = Cursor::new(input.to_string());
        let mut output = Vec::new();
        create_handler().run_with_io(&mut reader, &mut output).unwrap();
        serde_json::from_slice(&output).unwrap()
    }

    #[test]
    fn test_internal_state_request() {
        let response = run(r#"{"op":"internal_state"}"#);
        assert!(response.is_ok());
        assert!(response.payload().unwrap()["osms"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json() {
        let response = run("not valid json\n");
        assert_eq!(response.as_error().unwrap().code, Some(ErrorCode::InvalidRequest));
    }

    #[test]
    fn test_multiline_request() {
        let response = run("{\n  \"op\": \"load_osm\",\n  \"payload\": {\"osm_path\": \"/no/such/model.osm\"}\n}\n");
        assert_eq!(response.payload().unwrap()["result"], false);
    }

    #[test]
    fn test_missing_measure_reports_code() {
        let response = run(r#"{"op":"compute_arguments","payload":{"measure_dir":"/no/such/measure"}}"#);
        let err = response.as_error().unwrap();
        assert_eq!(err.code, Some(ErrorCode::MeasureNotFound));
        assert!(err.backtrace.starts_with('['));
    }
}
