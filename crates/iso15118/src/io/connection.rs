//! Transport task
//!
//! Runs one session over a byte stream (TCP or TLS in production, an
//! in-memory duplex in tests). A reader task splits the stream into V2GTP
//! frames and forwards them over a channel; the session loop selects between
//! incoming frames and the controller's own wake-ups, then sends whatever
//! response the active state composed.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Instrument};

use super::v2gtp::{V2gtpHeader, V2GTP_HEADER_LENGTH};
use crate::d20::state::StateId;
use crate::d20::SessionController;
use crate::error::{Iso15118Error, Iso15118Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Frames announcing a larger payload are rejected
    #[serde(default = "default_max_payload_length")]
    pub max_payload_length: u32,
    /// Payload bytes reserved for one response
    #[serde(default = "default_output_capacity")]
    pub output_capacity: usize,
}

fn default_max_payload_length() -> u32 {
    8192
}

fn default_output_capacity() -> usize {
    8192
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_payload_length: default_max_payload_length(),
            output_capacity: default_output_capacity(),
        }
    }
}

/// How a served session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: String,
    pub final_state: StateId,
    /// False when the EV dropped the connection mid-session
    pub stopped: bool,
}

type Frame = (V2gtpHeader, Bytes);

async fn read_frame<R>(reader: &mut R, max_payload_length: u32) -> Iso15118Result<Option<Frame>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; V2GTP_HEADER_LENGTH];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let header = V2gtpHeader::decode(&header, max_payload_length)?;
    let mut payload = vec![0u8; header.payload_length as usize];
    reader.read_exact(&mut payload).await?;
    Ok(Some((header, Bytes::from(payload))))
}

async fn receive_frames<R>(mut reader: R, max_payload_length: u32, tx: mpsc::Sender<Iso15118Result<Frame>>)
where
    R: AsyncRead + Unpin,
{
    loop {
        match read_frame(&mut reader, max_payload_length).await {
            Ok(Some(frame)) => {
                if tx.send(Ok(frame)).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
        }
    }
}

/// Serve one session until it stops or the EV disconnects
pub async fn serve_session<R, W>(
    reader: R,
    mut writer: W,
    mut controller: SessionController,
    config: ConnectionConfig,
) -> Iso15118Result<SessionSummary>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let span = controller.context().log.span().clone();
    let (tx, mut frames) = mpsc::channel(4);
    let receiver = tokio::spawn(
        receive_frames(reader, config.max_payload_length, tx).instrument(span.clone()),
    );

    let result = run(&mut controller, &mut frames, &mut writer)
        .instrument(span)
        .await;
    receiver.abort();

    let summary = SessionSummary {
        session_id: controller.context().session.id_hex(),
        final_state: controller.state_id(),
        stopped: controller.is_stopped(),
    };
    match result {
        Ok(()) => {
            info!(
                session_id = %summary.session_id,
                state = %summary.final_state,
                stopped = summary.stopped,
                "Session finished"
            );
            Ok(summary)
        }
        Err(e) => {
            warn!(session_id = %summary.session_id, error = %e, "Session aborted");
            Err(e)
        }
    }
}

async fn run<W>(
    controller: &mut SessionController,
    frames: &mut mpsc::Receiver<Iso15118Result<Frame>>,
    writer: &mut W,
) -> Iso15118Result<()>
where
    W: AsyncWrite + Unpin,
{
    let codec = controller.message_exchange().codec().clone();

    while !controller.is_stopped() {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(Ok((header, payload))) => {
                    debug!(payload_type = ?header.payload_type, length = payload.len(), "Frame received");
                    let request = codec.decode_request(header.payload_type, &payload)?;
                    controller.handle_request(request, payload.len())?;
                }
                Some(Err(e)) => return Err(e),
                None => {
                    info!(state = %controller.state_id(), "EV closed the connection");
                    return Ok(());
                }
            },
            wake = controller.wait() => controller.handle(wake),
        }

        send_pending(controller, writer).await?;
        if let Some(e) = controller.take_error() {
            return Err(e.into());
        }
    }

    Ok(())
}

async fn send_pending<W>(controller: &SessionController, writer: &mut W) -> Iso15118Result<()>
where
    W: AsyncWrite + Unpin,
{
    let exchange = controller.message_exchange();
    let Some(pending) = exchange.check_and_clear_response() else {
        return Ok(());
    };

    let frame = exchange.output().frame(pending.payload_type, pending.size);
    writer.write_all(&frame).await.map_err(Iso15118Error::from)?;
    writer.flush().await?;
    debug!(msg_type = %pending.message_type, size = pending.size, "Response sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::d20::{channel, MessageExchange, SessionConfig};
    use crate::io::{v2gtp, PayloadType, StreamOutputView, V2gtpError};
    use crate::message::{
        AppProtocol, AppProtocolResponseCode, JsonCodec, MessageCodec, Request, Response,
        ResponseCode, SessionStopRequest, SupportedAppProtocolRequest, ISO15118_20_DC_NAMESPACE,
    };
    use crate::session::Callbacks;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tokio::io::{duplex, DuplexStream};

    fn controller() -> SessionController {
        let (_tx, queue) = channel();
        let exchange = Arc::new(MessageExchange::new(StreamOutputView::new(8192)));
        SessionController::new(exchange, Arc::new(SessionConfig::default()), Callbacks::default(), queue)
    }

    async fn send(ev: &mut DuplexStream, request: Request) {
        let payload = JsonCodec.encode_request(&request).unwrap();
        ev.write_all(&v2gtp::frame(request.payload_type(), &payload)).await.unwrap();
    }

    async fn receive(ev: &mut DuplexStream) -> Response {
        let mut header = [0u8; V2GTP_HEADER_LENGTH];
        ev.read_exact(&mut header).await.unwrap();
        let header = V2gtpHeader::decode(&header, 8192).unwrap();
        let mut payload = vec![0u8; header.payload_length as usize];
        ev.read_exact(&mut payload).await.unwrap();
        JsonCodec.decode_response(header.payload_type, &payload).unwrap()
    }

    #[tokio::test]
    async fn test_handshake_then_sequence_error_ends_session() {
        let (mut ev, evse) = duplex(16 * 1024);
        let (reader, writer) = tokio::io::split(evse);
        let task = tokio::spawn(serve_session(reader, writer, controller(), ConnectionConfig::default()));

        send(
            &mut ev,
            SupportedAppProtocolRequest {
                app_protocol: vec![AppProtocol {
                    protocol_namespace: ISO15118_20_DC_NAMESPACE.into(),
                    version_number_major: 1,
                    version_number_minor: 0,
                    schema_id: 1,
                    priority: 1,
                }],
            }
            .into(),
        )
        .await;
        match receive(&mut ev).await {
            Response::SupportedAppProtocol(res) => {
                assert_eq!(res.response_code, AppProtocolResponseCode::OkSuccessfulNegotiation)
            }
            other => panic!("unexpected response {:?}", other),
        }

        // SessionStopReq does not belong to SessionSetup
        send(&mut ev, SessionStopRequest::default().into()).await;
        let res = receive(&mut ev).await;
        assert_eq!(res.response_code(), Some(ResponseCode::FailedSequenceError));

        let summary = task.await.unwrap().unwrap();
        assert!(summary.stopped);
        assert_eq!(summary.final_state, StateId::SessionStop);
    }

    #[tokio::test]
    async fn test_ev_disconnect_ends_session() {
        let (ev, evse) = duplex(1024);
        let (reader, writer) = tokio::io::split(evse);
        drop(ev);

        let summary = serve_session(reader, writer, controller(), ConnectionConfig::default())
            .await
            .unwrap();
        assert!(!summary.stopped);
        assert_eq!(summary.final_state, StateId::SupportedAppProtocol);
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (mut ev, evse) = duplex(1024);
        let (reader, writer) = tokio::io::split(evse);
        let config = ConnectionConfig {
            max_payload_length: 16,
            ..Default::default()
        };

        ev.write_all(&V2gtpHeader::new(PayloadType::Part20Main, 17).encode())
            .await
            .unwrap();

        let err = serve_session(reader, writer, controller(), config).await.unwrap_err();
        assert!(matches!(
            err,
            Iso15118Error::V2gtp(V2gtpError::PayloadTooLarge { length: 17, max: 16 })
        ));
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_rejected() {
        let (mut ev, evse) = duplex(1024);
        let (reader, writer) = tokio::io::split(evse);

        ev.write_all(&v2gtp::frame(PayloadType::Part20Main, b"not json"))
            .await
            .unwrap();

        let err = serve_session(reader, writer, controller(), ConnectionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Iso15118Error::Codec(_)));
    }
}
