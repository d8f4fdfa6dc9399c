/*
 * Copyright © 2025, United States Government, as represented by the Administrator of 
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License"); 
 * you may not use this file except in compliance with the License. You may obtain a copy 
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use std::{fmt, sync::{Arc, atomic::{AtomicBool, Ordering}}, time::Duration};
use futures::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream, runtime::Handle, select, sync::{mpsc, watch}, task::AbortHandle,
    time::{interval_at, sleep, Instant}
};
use tokio_tungstenite::{
    connect_async, MaybeTlsStream, WebSocketStream,
    tungstenite::{client::IntoClientRequest, protocol::Message}
};
use tracing::{debug,info,warn};
use crate::{
    TransitContext, config::TransitConfig, errors::{connector_error, Result}
};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// the lifecycle of our feed connection:
/// `Disconnected → Connecting → Connected → (Closed|Errored) → Reconnecting → Connecting ..`
/// `Disconnected` is only re-entered on teardown
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
    Errored,
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "{:?}", self)
    }
}

/// how long a terminated connection task gets to send its close frame before it is aborted
const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// the connection state watch channel. Once terminated it stays `Disconnected`, no matter what a still running
/// connection task tries to publish
struct StatePublisher {
    tx: watch::Sender<ConnectionState>,
    terminated: AtomicBool,
}

impl StatePublisher {
    fn new ()->Self {
        let (tx, _) = watch::channel( ConnectionState::Disconnected);
        StatePublisher { tx, terminated: AtomicBool::new(false) }
    }

    fn publish (&self, new_state: ConnectionState) {
        // the closure runs under the channel lock, i.e. it can't interleave with terminate()
        self.tx.send_if_modified( |state| {
            if self.terminated.load( Ordering::Acquire) {
                false
            } else {
                *state = new_state;
                true
            }
        });
    }

    fn terminate (&self) {
        self.terminated.store( true, Ordering::Release);
        self.tx.send_replace( ConnectionState::Disconnected);
    }

    fn get (&self)->ConnectionState { *self.tx.borrow() }
}

/// how a connected session ended
enum SessionEnd {
    Closed,     // by server
    Errored,    // read or write failure
    Terminated, // command queue closed - nominal termination, no reconnect
}

/// the websocket connection to the trajectory feed. This owns a single task that (re-)connects, subscribes,
/// sends keepalive pings and hands inbound frames to the [`crate::feed::FeedProcessor`]. The keepalive timer and the
/// reconnect delay are both part of this task, i.e. terminating the connection cancels all of them
pub struct LiveConnection {
    cmd_tx: Option<mpsc::Sender<String>>, // dropping it makes the task close the websocket and terminate
    state: Arc<StatePublisher>,
    task: Option<AbortHandle>,
}

impl LiveConnection {
    /// spawn the connection task. This only fails if the config is not usable (e.g. an invalid websocket URI) or
    /// if we are not called from within an async runtime. Everything else is retried
    pub fn start (config: Arc<TransitConfig>, ctx: Arc<TransitContext>)->Result<Self> {
        config.check()?;
        config.ws_uri.as_str().into_client_request()?;
        let rt = Handle::try_current().map_err( |e| connector_error( format!("no async runtime: {e}")))?;

        let (cmd_tx, cmd_rx) = mpsc::channel::<String>(16);
        let state = Arc::new( StatePublisher::new());

        let jh = rt.spawn( connection_loop( config, ctx, cmd_rx, state.clone()));

        Ok( LiveConnection { cmd_tx: Some(cmd_tx), state, task: Some(jh.abort_handle()) } )
    }

    /// queue commands for the server. Commands queued while we are not connected are discarded on
    /// (re-)connect since we send the current subscription anyways
    pub fn send_cmds (&self, cmds: Vec<String>) {
        if let Some(cmd_tx) = &self.cmd_tx {
            for cmd in cmds {
                if let Err(e) = cmd_tx.try_send( cmd) {
                    warn!("failed to queue websocket command: {e}");
                }
            }
        }
    }

    /// graceful shutdown: send a close frame if we are connected and end the connection task without
    /// reconnecting. Use `subscribe_state()` to wait for `Disconnected`
    pub fn close (&mut self) {
        self.cmd_tx = None;
    }

    pub fn state (&self)->ConnectionState { self.state.get() }

    pub fn subscribe_state (&self)->watch::Receiver<ConnectionState> { self.state.tx.subscribe() }

    pub fn is_running (&self)->bool { self.task.is_some() }

    /// cancel the connection task, including pending reconnects and keepalive pings. The state is
    /// `Disconnected` when this returns. A connected task still gets `CLOSE_GRACE` to send its close frame
    /// before it is aborted
    pub fn terminate (&mut self) {
        self.cmd_tx = None;
        if let Some(task) = self.task.take() {
            self.state.terminate();
            match Handle::try_current() {
                Ok(rt) => {
                    rt.spawn( async move {
                        sleep( CLOSE_GRACE).await;
                        task.abort();
                    });
                }
                Err(_) => task.abort()
            }
            info!("feed connection terminated");
        }
    }
}

impl Drop for LiveConnection {
    fn drop (&mut self) {
        self.terminate()
    }
}

async fn connection_loop (config: Arc<TransitConfig>, ctx: Arc<TransitContext>,
                          mut cmd_rx: mpsc::Receiver<String>, state: Arc<StatePublisher>)
{
    loop {
        state.publish( ConnectionState::Connecting);

        match connect_async( config.ws_uri.as_str()).await {
            Ok((ws,_)) => {
                info!("connected to {}", config.ws_uri);
                state.publish( ConnectionState::Connected);

                match run_session( &config, &ctx, ws, &mut cmd_rx).await {
                    SessionEnd::Closed => {
                        warn!("server closed websocket, reconnecting in {:?}", config.reconnect_delay);
                        state.publish( ConnectionState::Closed);
                    }
                    SessionEnd::Errored => {
                        state.publish( ConnectionState::Errored);
                    }
                    SessionEnd::Terminated => {
                        state.publish( ConnectionState::Disconnected);
                        return
                    }
                }
            }
            Err(e) => {
                warn!("websocket connect to {} failed: {e}", config.ws_uri);
                state.publish( ConnectionState::Errored);
            }
        }

        state.publish( ConnectionState::Reconnecting);
        let reconnect_delay = sleep( config.reconnect_delay);
        tokio::pin!(reconnect_delay);
        loop {
            select! {
                _ = &mut reconnect_delay => break,
                maybe_cmd = cmd_rx.recv() => {
                    if maybe_cmd.is_none() { // closed while waiting - no point reconnecting
                        state.publish( ConnectionState::Disconnected);
                        return
                    } // otherwise discard, superseded by the subscription we send after reconnecting
                }
            }
        }
    }
}

async fn run_session (config: &TransitConfig, ctx: &TransitContext, ws: WsStream, cmd_rx: &mut mpsc::Receiver<String>)->SessionEnd {
    let (mut ws_write, mut ws_read) = ws.split();

    // drop whatever was queued while we were not connected and (re-)establish the current subscription
    while cmd_rx.try_recv().is_ok() {}

    let cmds = ctx.subscription_cmds();
    if let Some(cmds) = cmds {
        for cmd in cmds {
            debug!("subscribing: {cmd}");
            if let Err(e) = ws_write.send( Message::text(cmd)).await {
                warn!("failed to send subscription: {e}");
                return SessionEnd::Errored
            }
        }
    }

    let ping_interval = config.ping_interval;
    let mut ping_timer = interval_at( Instant::now() + ping_interval, ping_interval);

    loop {
        select! { // all awaited futures have to be cancellation safe
            maybe_msg = ws_read.next() => { // in: feed messages
                match maybe_msg {
                    Some(Ok(Message::Text(txt))) => { ctx.process_frame( txt.as_str()); }
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::Closed,
                    Some(Ok(_)) => {} // binary, ping and pong frames are not part of the feed protocol
                    Some(Err(e)) => {
                        warn!("reconnecting after failed websocket read: {e}");
                        return SessionEnd::Errored
                    }
                }
            }

            maybe_cmd = cmd_rx.recv() => { // out: (re-)subscriptions
                match maybe_cmd {
                    Some(cmd) => {
                        debug!("sending: {cmd}");
                        if let Err(e) = ws_write.send( Message::text(cmd)).await {
                            warn!("failed to write to websocket: {e}");
                            return SessionEnd::Errored
                        }
                    }
                    None => {
                        let _ = ws_write.send( Message::Close(None)).await;
                        return SessionEnd::Terminated
                    }
                }
            }

            _ = ping_timer.tick() => { // keepalive
                if let Err(e) = ws_write.send( Message::text( config.ping_payload.clone())).await {
                    warn!("failed to send keepalive: {e}");
                    return SessionEnd::Errored
                }
            }
        }
    }
}
