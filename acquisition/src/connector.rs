use crate::http_gateway::HttpGatewayConnector;
use bridge_core::{SourceConnector, SourceKind};
use errors::SourceError;
use std::sync::Arc;
use std::time::Duration;

/// Build the connector for `kind`.
///
/// Only the HTTP gateway is implemented; the native OPC kinds are refused
/// here rather than failing on first read.
pub fn create_connector(
    kind: SourceKind,
    request_timeout: Duration,
) -> Result<Arc<dyn SourceConnector>, SourceError> {
    match kind {
        SourceKind::HttpGateway => Ok(Arc::new(HttpGatewayConnector::new(request_timeout)?)),
        SourceKind::OpcDa | SourceKind::OpcUa => Err(SourceError::Unsupported {
            kind: kind.to_string(),
        }),
    }
}
