//! Server network layer: UDP relay and room broadcast loop

use crate::client_manager::ClientManager;
use crate::game::GameRooms;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{ClientId, Packet, PROTOCOL_VERSION, RECV_BUFFER_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: ClientId },
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    /// Resolved to addresses by the sender task. Unknown ids are skipped.
    SendToClients {
        packet: Packet,
        client_ids: Vec<ClientId>,
    },
}

pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    rooms: GameRooms,
    rng: StdRng,
    tick_duration: Duration,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
        max_clients: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            rooms: GameRooms::new(),
            rng: StdRng::from_entropy(),
            tick_duration,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.socket.local_addr()
    }

    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; RECV_BUFFER_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match deserialize::<Packet>(&buffer[0..len]) {
                        Ok(packet) => {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(_) => warn!("Failed to deserialize packet from {}", addr),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::SendToClients { packet, client_ids } => {
                        let addrs: Vec<(ClientId, SocketAddr)> = {
                            let clients = clients.read().await;
                            client_ids
                                .iter()
                                .filter_map(|id| clients.addr_of(*id).map(|addr| (*id, addr)))
                                .collect()
                        };

                        for (client_id, addr) in addrs {
                            if let Err(e) = send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients = clients.write().await;
                    clients.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn send_to_clients(&self, packet: Packet, client_ids: Vec<ClientId>) {
        if let Err(e) = self
            .game_tx
            .send(GameMessage::SendToClients { packet, client_ids })
        {
            error!("Failed to queue room broadcast: {}", e);
        }
    }

    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        let client_id = {
            let mut clients = self.clients.write().await;
            clients.touch(addr)
        };

        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    warn!("Rejecting {}: unsupported version", addr);
                    self.send_packet(
                        Packet::Disconnected {
                            reason: format!("Unsupported client version {}", client_version),
                        },
                        addr,
                    );
                    return;
                }

                if let Some(existing_id) = client_id {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    self.clients.write().await.remove_client(&existing_id);
                    self.rooms.remove_client(existing_id);
                }

                let new_id = self.clients.write().await.add_client(addr);
                let response = match new_id {
                    Some(client_id) => Packet::Connected { client_id },
                    None => Packet::Disconnected {
                        reason: "Server full".to_string(),
                    },
                };
                self.send_packet(response, addr);
            }

            Packet::Disconnect => {
                if let Some(client_id) = client_id {
                    self.clients.write().await.remove_client(&client_id);
                    self.rooms.remove_client(client_id);
                }
            }

            Packet::Heartbeat => {}

            Packet::CreateGame | Packet::JoinGame { .. } | Packet::PlayerMove { .. } => {
                let Some(client_id) = client_id else {
                    warn!("Packet from unconnected address {}", addr);
                    return;
                };
                self.handle_game_packet(client_id, packet, addr);
            }

            other => {
                warn!("Unexpected packet type from client at {}: {:?}", addr, other);
            }
        }
    }

    fn handle_game_packet(&mut self, client_id: ClientId, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::CreateGame => {
                let game_id = self.rooms.create_game(&mut self.rng, client_id);
                self.send_packet(Packet::GameCreated { game_id }, addr);
            }
            Packet::JoinGame { game_id } => {
                self.rooms.join_game(client_id, &game_id);
            }
            Packet::PlayerMove { pacman } => {
                self.rooms.apply_move(client_id, pacman);
            }
            _ => {}
        }
    }

    /// Sends the current player set of every changed room to its members.
    fn broadcast_dirty_rooms(&mut self) {
        for (game_id, players) in self.rooms.take_dirty() {
            debug!("Broadcasting game {} ({} players)", game_id, players.len());
            let client_ids = players.keys().copied().collect();
            self.send_to_clients(Packet::UpdateGame { players }, client_ids);
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick: u64 = 0;

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            self.rooms.remove_client(client_id);
                        },
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    tick += 1;
                    self.broadcast_dirty_rooms();

                    if tick % 600 == 0 && !self.rooms.is_empty() {
                        let client_count = self.clients.read().await.len();
                        debug!("Tick {}: {} clients in {} games", tick, client_count, self.rooms.len());
                    }
                },
            }
        }

        Ok(())
    }
}

async fn send_packet_impl(
    socket: &UdpSocket,
    packet: &Packet,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = serialize(packet)?;
    socket.send_to(&data, addr).await?;
    Ok(())
}
