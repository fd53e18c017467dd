use super::TriggerEmitter;
use anyhow::{Context, Result};
use rosc::{OscMessage, OscPacket, OscType};
use std::net::{SocketAddr, UdpSocket};

/// Sends each cue as a single OSC message over UDP
pub struct OscEmitter {
    socket: UdpSocket,
    target: SocketAddr,
}

impl OscEmitter {
    pub fn new(target: SocketAddr) -> Result<Self> {
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind).context("Failed to bind OSC socket")?;

        tracing::info!("Sending show-control cues to {}", target);

        Ok(Self { socket, target })
    }
}

fn encode_message(address: &str, payload: i32) -> Result<Vec<u8>, rosc::OscError> {
    rosc::encoder::encode(&OscPacket::Message(OscMessage {
        addr: address.to_string(),
        args: vec![OscType::Int(payload)],
    }))
}

impl TriggerEmitter for OscEmitter {
    fn emit(&mut self, event: &str, payload: i32) {
        let packet = match encode_message(event, payload) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!("Dropping cue {}: {:?}", event, e);
                return;
            }
        };

        match self.socket.send_to(&packet, self.target) {
            Ok(_) => tracing::debug!("Cue {} {} -> {}", event, payload, self.target),
            Err(e) => tracing::warn!("Dropping cue {}: {}", event, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cue_arrives_as_osc_message() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut emitter = OscEmitter::new(receiver.local_addr().unwrap()).unwrap();

        emitter.emit("/sequences/Seq 2/play", 1);

        let mut buf = [0u8; 512];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&buf[..len]).unwrap();
        match packet {
            OscPacket::Message(msg) => {
                assert_eq!(msg.addr, "/sequences/Seq 2/play");
                assert_eq!(msg.args, vec![OscType::Int(1)]);
            }
            OscPacket::Bundle(_) => panic!("expected a message"),
        }
    }

    #[test]
    fn unreachable_target_is_not_an_error() {
        // nothing listens here; emit must neither panic nor block
        let mut emitter = OscEmitter::new("127.0.0.1:9".parse().unwrap()).unwrap();
        emitter.emit("/sequences/Seq 1/play", 1);
        emitter.emit("/sequences/Seq 1/play", 1);
    }
}
