use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::time::Duration;

use driving_shared::protocol::{ClientMsg, ServerMsg, PROTOCOL_VERSION};
use driving_shared::ControlInputs;

#[derive(Debug, Clone)]
pub enum NetEvent {
    Connected,
    Disconnected,
    Message(ServerMsg),
    ProtocolMismatch { server: u32, client: u32 },
    /// Connecting failed; the connection keeps retrying with backoff.
    Failed(String),
}

type CmdSender = tokio::sync::mpsc::UnboundedSender<ClientMsg>;

/// WebSocket link to the session server, serviced by a background thread.
/// The frame loop drains events with `poll_events` once per frame.
pub struct ServerConnection {
    event_rx: Mutex<Receiver<NetEvent>>,
    cmd_tx: CmdSender,
}

impl ServerConnection {
    pub fn new(url: String) -> Self {
        let (event_tx, event_rx) = mpsc::channel::<NetEvent>();
        let cmd_tx = spawn_network_thread(url, event_tx);
        Self {
            event_rx: Mutex::new(event_rx),
            cmd_tx,
        }
    }

    pub fn poll_events(&self) -> Vec<NetEvent> {
        let mut out = Vec::new();
        if let Ok(rx) = self.event_rx.lock() {
            while let Ok(evt) = rx.try_recv() {
                out.push(evt);
            }
        }
        out
    }

    pub fn send_inputs(&self, inputs: ControlInputs) {
        self.send(ClientMsg::SetInputs { inputs });
    }

    fn send(&self, msg: ClientMsg) {
        let _ = self.cmd_tx.send(msg);
    }
}

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_millis(1000);
const MAX_RECONNECT_DELAY: Duration = Duration::from_millis(30_000);

fn spawn_network_thread(url: String, event_tx: Sender<NetEvent>) -> CmdSender {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    let (cmd_tx, mut cmd_rx) = tokio::sync::mpsc::unbounded_channel::<ClientMsg>();

    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_io()
            .enable_time()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                let _ = event_tx.send(NetEvent::Failed(format!("network runtime: {}", e)));
                return;
            }
        };

        rt.block_on(async move {
            let mut reconnect_delay = INITIAL_RECONNECT_DELAY;

            loop {
                let (ws_stream, _) = match tokio_tungstenite::connect_async(url.as_str()).await {
                    Ok(x) => x,
                    Err(e) => {
                        tracing::debug!("connect to {} failed: {}", url, e);
                        let _ = event_tx.send(NetEvent::Failed(e.to_string()));
                        tokio::time::sleep(reconnect_delay).await;
                        reconnect_delay = reconnect_delay.mul_f32(1.5).min(MAX_RECONNECT_DELAY);
                        continue;
                    }
                };

                reconnect_delay = INITIAL_RECONNECT_DELAY;
                let _ = event_tx.send(NetEvent::Connected);

                // Inputs queued while offline belong to a previous session.
                while cmd_rx.try_recv().is_ok() {}

                let (mut write, mut read) = ws_stream.split();

                loop {
                    tokio::select! {
                        biased;

                        Some(cmd) = cmd_rx.recv() => {
                            if let Ok(text) = serde_json::to_string(&cmd) {
                                if write.send(Message::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                        }

                        msg = read.next() => {
                            match msg {
                                Some(Ok(Message::Text(txt))) => {
                                    match serde_json::from_str::<ServerMsg>(&txt) {
                                        Ok(ServerMsg::Welcome(w)) if w.protocol_version != PROTOCOL_VERSION => {
                                            let _ = event_tx.send(NetEvent::ProtocolMismatch {
                                                server: w.protocol_version,
                                                client: PROTOCOL_VERSION,
                                            });
                                            let _ = write.close().await;
                                            break;
                                        }
                                        Ok(server_msg) => {
                                            let _ = event_tx.send(NetEvent::Message(server_msg));
                                        }
                                        Err(e) => {
                                            tracing::warn!("unreadable server message: {}", e);
                                        }
                                    }
                                }
                                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                                Some(Ok(_)) => {}
                            }
                        }
                    }
                }

                let _ = event_tx.send(NetEvent::Disconnected);
                tokio::time::sleep(reconnect_delay).await;
                reconnect_delay = reconnect_delay.mul_f32(1.5).min(MAX_RECONNECT_DELAY);
            }
        });
    });

    cmd_tx
}
