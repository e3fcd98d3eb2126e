//! Server lifecycle: boot from the store, task spawning, shutdown.

use crate::db::Database;
use crate::handlers::session;
use crate::network::{receiver, retransmit};
use crate::state::{Channel, ChannelPrivilege, PrivilegeOwner, Registration, ServerState};
use anyhow::Context as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

/// One running virtual server: its socket, its state and its two tasks.
pub struct Server {
    pub socket: Arc<UdpSocket>,
    pub state: Mutex<ServerState>,
    pub db: Database,
    shutdown: broadcast::Sender<()>,
}

impl Server {
    /// Bind the UDP socket and wrap the state. A failed bind is fatal for
    /// the whole process.
    pub async fn bind(state: ServerState, db: Database) -> anyhow::Result<Arc<Server>> {
        let port = state.port;
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("binding UDP port {port}"))?;
        info!(server = state.id, port, "server socket bound");
        let (shutdown, _) = broadcast::channel(1);
        Ok(Arc::new(Server {
            socket: Arc::new(socket),
            state: Mutex::new(state),
            db,
            shutdown,
        }))
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    /// Spawn the receiver and the retransmitter.
    pub fn start(self: &Arc<Self>) {
        let receiver_server = Arc::clone(self);
        tokio::spawn(async move { receiver::run(receiver_server).await });
        let retransmit_server = Arc::clone(self);
        tokio::spawn(async move { retransmit::run(retransmit_server).await });
    }

    /// Graceful stop: tell every player the server is stopping, let the
    /// retransmitter drain the leaving queues, then cancel both tasks.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock().await;
            session::notify_server_stopping(&mut state);
            let ids: Vec<u32> = state.players.keys().copied().collect();
            for id in ids {
                state.remove_player(id);
            }
        }

        // Bounded drain: the retransmitter keeps pushing the final
        // datagrams until every leaving player is gone or we give up.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
        loop {
            {
                let state = self.state.lock().await;
                if state.leaving.is_empty() {
                    break;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                warn!("leaving players did not drain before the deadline");
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let _ = self.shutdown.send(());
        info!("server stopped");
    }
}

/// Load every active server from the store and bring its arena up:
/// channels, subchannels, registrations, the privilege matrix and the
/// per-channel privilege records.
pub async fn boot(db: &Database) -> anyhow::Result<Vec<Arc<Server>>> {
    let rows = db.servers().load_active().await.context("loading servers")?;
    if rows.is_empty() {
        anyhow::bail!("no active server in the database");
    }

    let mut servers = Vec::with_capacity(rows.len());
    for row in rows {
        let mut state = ServerState::new(
            row.id,
            row.name,
            row.password,
            row.welcome,
            row.port,
            row.codec_mask,
        );

        for ch in db.channels().load_roots(row.id).await? {
            let mut channel = Channel::new(
                ch.name,
                ch.topic,
                ch.description,
                ch.flags,
                ch.codec,
                ch.sort_order,
                ch.max_users,
            );
            channel.db_id = ch.id;
            state.add_channel(channel);
        }
        for ch in db.channels().load_subchannels(row.id).await? {
            let Some(parent) = state
                .channel_by_db_id(ch.parent_db_id as u32)
                .map(|p| p.id)
            else {
                warn!(parent = ch.parent_db_id, "subchannel parent does not exist");
                continue;
            };
            let mut channel = Channel::new(
                ch.name,
                ch.topic,
                ch.description,
                0,
                ch.codec,
                ch.sort_order,
                ch.max_users,
            );
            channel.db_id = ch.id;
            let child = state.add_channel(channel);
            if !state.add_subchannel(parent, child) {
                state.destroy_channel(child);
            }
        }
        // A server without stored channels still needs somewhere to put
        // arriving players.
        state.default_channel_id();

        for reg in db.registrations().load(row.id).await? {
            state.add_registration(Registration {
                db_id: reg.id,
                name: reg.name,
                password_hash: reg.password_hash,
                global_flags: if reg.serveradmin {
                    crate::state::global_flags::SERVERADMIN
                } else {
                    0
                },
            });
        }

        state.privileges = db.privileges().load_matrix(row.id).await?;

        let registered: Vec<(u32, u32)> = state
            .channels
            .values()
            .filter(|c| c.is_registered() && c.db_id != 0)
            .map(|c| (c.id, c.db_id))
            .collect();
        for (channel_id, channel_db_id) in registered {
            for (registration_id, flags) in
                db.privileges().load_channel_records(channel_db_id).await?
            {
                if !state.registrations.contains_key(&registration_id) {
                    warn!(
                        registration = registration_id,
                        "privilege record for unknown registration"
                    );
                    continue;
                }
                if let Some(channel) = state.channel_mut(channel_id) {
                    channel.privileges.push(ChannelPrivilege {
                        owner: PrivilegeOwner::Registration(registration_id),
                        flags,
                    });
                }
            }
        }

        info!(
            server = state.id,
            channels = state.channels.len(),
            registrations = state.registrations.len(),
            "server loaded"
        );
        servers.push(Server::bind(state, db.clone()).await?);
    }
    Ok(servers)
}
