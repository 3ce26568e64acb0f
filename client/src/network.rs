//! Transport bridge between the frame loop and the UDP connection
//!
//! The socket lives in a task on a tokio runtime. The frame loop talks to it
//! through two unbounded channels and never blocks: outbound packets are
//! queued fire-and-forget, inbound packets are drained once per frame.

use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, PROTOCOL_VERSION, RECV_BUFFER_SIZE};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

pub struct TransportBridge {
    outbound: mpsc::UnboundedSender<Packet>,
    inbound: mpsc::UnboundedReceiver<Packet>,
    task: Option<JoinHandle<()>>,
}

/// The far side of a bridge, driven by a socket task or by tests.
pub struct TransportEnd {
    pub outbound: mpsc::UnboundedReceiver<Packet>,
    pub inbound: mpsc::UnboundedSender<Packet>,
}

impl TransportBridge {
    /// Creates a bridge and the end that services it.
    pub fn pair() -> (TransportBridge, TransportEnd) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        (
            TransportBridge {
                outbound: out_tx,
                inbound: in_rx,
                task: None,
            },
            TransportEnd {
                outbound: out_rx,
                inbound: in_tx,
            },
        )
    }

    /// Connects to `server_addr` over UDP on the given runtime.
    pub fn connect_udp(
        server_addr: &str,
        fake_ping_ms: u64,
        runtime: &tokio::runtime::Handle,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let server_addr: SocketAddr = server_addr.parse()?;
        let (mut bridge, end) = Self::pair();

        bridge.task = Some(runtime.spawn(async move {
            if let Err(e) = run_udp(server_addr, fake_ping_ms, end).await {
                error!("Transport stopped: {}", e);
            }
        }));

        Ok(bridge)
    }

    pub fn send(&self, packet: Packet) {
        if self.outbound.send(packet).is_err() {
            warn!("Transport is closed, dropping outbound packet");
        }
    }

    /// Hands over the socket task, if this bridge owns one. It finishes
    /// once `Disconnect` has been sent.
    pub fn take_task(&mut self) -> Option<JoinHandle<()>> {
        self.task.take()
    }

    /// Drains every packet that has arrived since the last call.
    pub fn poll(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(packet) = self.inbound.try_recv() {
            packets.push(packet);
        }
        packets
    }
}

async fn send_packet(
    socket: &UdpSocket,
    packet: &Packet,
    server_addr: SocketAddr,
    fake_ping_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    if fake_ping_ms > 0 {
        sleep(Duration::from_millis(fake_ping_ms / 2)).await;
    }

    let data = serialize(packet)?;
    socket.send_to(&data, server_addr).await?;
    Ok(())
}

async fn run_udp(
    server_addr: SocketAddr,
    fake_ping_ms: u64,
    mut end: TransportEnd,
) -> Result<(), Box<dyn std::error::Error>> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Connecting to {}...", server_addr);

    send_packet(
        &socket,
        &Packet::Connect {
            client_version: PROTOCOL_VERSION,
        },
        server_addr,
        fake_ping_ms,
    )
    .await?;

    let mut heartbeat = interval(HEARTBEAT_INTERVAL);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut buffer = [0u8; RECV_BUFFER_SIZE];

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buffer) => {
                match result {
                    Ok((len, addr)) => {
                        if addr != server_addr {
                            warn!("Ignoring datagram from unknown peer {}", addr);
                            continue;
                        }
                        if fake_ping_ms > 0 {
                            sleep(Duration::from_millis(fake_ping_ms / 2)).await;
                        }

                        match deserialize::<Packet>(&buffer[0..len]) {
                            Ok(packet) => {
                                if end.inbound.send(packet).is_err() {
                                    debug!("Frame loop is gone, closing transport");
                                    break;
                                }
                            }
                            Err(e) => warn!("Dropping malformed packet: {}", e),
                        }
                    }
                    Err(e) => error!("Error receiving packet: {}", e),
                }
            },

            packet = end.outbound.recv() => {
                let Some(packet) = packet else {
                    break;
                };
                let disconnecting = matches!(packet, Packet::Disconnect);
                if let Err(e) = send_packet(&socket, &packet, server_addr, fake_ping_ms).await {
                    error!("Error sending packet: {}", e);
                }
                if disconnecting {
                    break;
                }
            },

            _ = heartbeat.tick() => {
                if let Err(e) = send_packet(&socket, &Packet::Heartbeat, server_addr, 0).await {
                    error!("Error sending heartbeat: {}", e);
                }
            },
        }
    }

    info!("Transport closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Player;

    #[test]
    fn test_outbound_packets_reach_the_far_end() {
        let (bridge, mut end) = TransportBridge::pair();

        bridge.send(Packet::CreateGame);
        bridge.send(Packet::JoinGame {
            game_id: "K3J9QZ".to_string(),
        });
        bridge.send(Packet::PlayerMove {
            pacman: Player::new(1.0, 2.0),
        });

        assert_eq!(end.outbound.try_recv().unwrap(), Packet::CreateGame);
        assert_eq!(
            end.outbound.try_recv().unwrap(),
            Packet::JoinGame {
                game_id: "K3J9QZ".to_string()
            }
        );
        assert_eq!(
            end.outbound.try_recv().unwrap(),
            Packet::PlayerMove {
                pacman: Player::new(1.0, 2.0)
            }
        );
    }

    #[test]
    fn test_poll_drains_without_blocking() {
        let (mut bridge, end) = TransportBridge::pair();
        assert!(bridge.poll().is_empty());

        end.inbound.send(Packet::Connected { client_id: 4 }).unwrap();
        end.inbound
            .send(Packet::GameCreated {
                game_id: "K3J9QZ".to_string(),
            })
            .unwrap();

        let packets = bridge.poll();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0], Packet::Connected { client_id: 4 });
        assert!(bridge.poll().is_empty());
    }

    #[test]
    fn test_send_after_close_is_silent() {
        let (bridge, end) = TransportBridge::pair();
        drop(end);
        bridge.send(Packet::CreateGame);
    }

    #[test]
    fn test_connect_rejects_bad_address() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        assert!(TransportBridge::connect_udp("not an address", 0, runtime.handle()).is_err());
    }

    #[test]
    fn test_paired_bridge_has_no_task() {
        let (mut bridge, _end) = TransportBridge::pair();
        assert!(bridge.take_task().is_none());
    }

    #[tokio::test]
    async fn test_disconnect_reaches_server_and_ends_task() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();

        let mut bridge = TransportBridge::connect_udp(
            &server_addr.to_string(),
            0,
            &tokio::runtime::Handle::current(),
        )
        .unwrap();
        let task = bridge.take_task().unwrap();
        assert!(bridge.take_task().is_none());

        bridge.send(Packet::Disconnect);

        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        let mut seen_disconnect = false;
        for _ in 0..3 {
            let (len, _) = tokio::time::timeout(
                Duration::from_secs(2),
                server.recv_from(&mut buffer),
            )
            .await
            .unwrap()
            .unwrap();
            if deserialize::<Packet>(&buffer[..len]).unwrap() == Packet::Disconnect {
                seen_disconnect = true;
                break;
            }
        }
        assert!(seen_disconnect);

        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_udp_transport_connects_and_forwards() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();

        let mut bridge = TransportBridge::connect_udp(
            &server_addr.to_string(),
            0,
            &tokio::runtime::Handle::current(),
        )
        .unwrap();

        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        let (len, client_addr) = tokio::time::timeout(
            Duration::from_secs(2),
            server.recv_from(&mut buffer),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(
            deserialize::<Packet>(&buffer[..len]).unwrap(),
            Packet::Connect {
                client_version: PROTOCOL_VERSION
            }
        );

        let reply = serialize(&Packet::Connected { client_id: 9 }).unwrap();
        server.send_to(&reply, client_addr).await.unwrap();

        let mut received = Vec::new();
        for _ in 0..100 {
            received = bridge.poll();
            if !received.is_empty() {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(received, vec![Packet::Connected { client_id: 9 }]);
    }
}
