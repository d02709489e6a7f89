#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use env_logger::Env;
    use log::{debug, info};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use crate::chord::identifier::hash_identifier;
    use crate::chord::peer::PeerAddress;
    use crate::client::RingClient;
    use crate::config::PeerConfig;
    use crate::RingPeer;

    fn init_logging() {
        let _ = env_logger::Builder::from_env(Env::default().default_filter_or("debug")).try_init();
    }

    fn loopback_config(port: u16) -> PeerConfig {
        PeerConfig {
            host: "localhost".to_owned(),
            port,
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }

    /// Method to easily create independent peers for testing purposes
    async fn start_peers(amount: u16, port_start: u16) -> Vec<RingPeer> {
        let mut peers = Vec::new();
        for port in port_start..port_start + amount {
            peers.push(RingPeer::new(&loopback_config(port)).await.unwrap());
        }
        peers
    }

    /// Sends a shutdown signal to all peers in the list, and then awaits the termination of all servers
    async fn stop_peers(peers: Vec<RingPeer>) {
        for peer in peers.iter() {
            peer.initiate_shutdown();
        }
        for peer in peers {
            peer.await_termination().await.unwrap();
        }
    }

    async fn client_for(peer: &RingPeer) -> RingClient {
        RingClient::connect("127.0.0.1", peer.api_address().port())
            .await
            .unwrap()
    }

    /// Single peer, one client storing and retrieving over the wire
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_store_retrieve_scenario() {
        init_logging();
        let peers = start_peers(1, 47000).await;
        let mut client = client_for(&peers[0]).await;

        assert_eq!(
            client.store("report.pdf").await.unwrap(),
            "File stored successfully."
        );
        assert_eq!(
            client.retrieve("report.pdf").await.unwrap(),
            "File found: report.pdf"
        );
        assert_eq!(
            client.retrieve("missing.pdf").await.unwrap(),
            "File not found."
        );

        client.exit().await.unwrap();
        stop_peers(peers).await;
    }

    /// A fresh peer is its own successor and predecessor
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_display_fresh_peer() {
        init_logging();
        let peers = start_peers(1, 47001).await;
        let mut client = client_for(&peers[0]).await;

        let id = hash_identifier("localhost:47001");
        assert_eq!(
            client.display().await.unwrap(),
            format!("PeerID: {}, Successor: {}, Predecessor: {}", id, id, id)
        );

        client.exit().await.unwrap();
        stop_peers(peers).await;
    }

    /// Unknown and malformed requests are answered, and the connection stays usable
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_unknown_command() {
        init_logging();
        let peers = start_peers(1, 47002).await;
        let mut client = client_for(&peers[0]).await;

        assert_eq!(client.send("HELLO").await.unwrap(), "Unknown command.");
        assert_eq!(client.send("STORE").await.unwrap(), "Unknown command.");
        assert_eq!(
            client.send("CONNECT nowhere").await.unwrap(),
            "Unknown command."
        );
        assert_eq!(
            client.store("a.txt").await.unwrap(),
            "File stored successfully."
        );

        client.exit().await.unwrap();
        stop_peers(peers).await;
    }

    /// `EXIT` closes the connection without a reply and leaves the ring untouched
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_exit_closes_connection() {
        init_logging();
        let peers = start_peers(1, 47003).await;

        let mut stream = TcpStream::connect(peers[0].api_address()).await.unwrap();
        stream
            .write_all(b"STORE a.txt\nEXIT\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert_eq!(response, "File stored successfully.\n");

        // a new connection still sees the stored file
        let mut client = client_for(&peers[0]).await;
        assert_eq!(
            client.retrieve("a.txt").await.unwrap(),
            "File found: a.txt"
        );

        client.exit().await.unwrap();
        stop_peers(peers).await;
    }

    /// `CONNECT` splices the new member in before the receiving peer
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_connect() {
        init_logging();
        let peers = start_peers(1, 47004).await;
        let mut client = client_for(&peers[0]).await;

        let joined = PeerAddress::new("localhost", 47100);
        assert_eq!(client.connect_peer(&joined).await.unwrap(), "OK");

        let id = hash_identifier("localhost:47004");
        let joined_id = joined.identifier();
        assert_eq!(
            client.display().await.unwrap(),
            format!(
                "PeerID: {}, Successor: {}, Predecessor: {}",
                id, joined_id, joined_id
            )
        );

        // connecting a known address again does not grow the ring
        assert_eq!(client.connect_peer(&joined).await.unwrap(), "OK");
        assert_eq!(peers[0].chord().member_count(), 2);

        client.exit().await.unwrap();
        stop_peers(peers).await;
    }

    /// Several clients store and retrieve concurrently on a ring with several members
    ///
    /// Every client must find every file, regardless of which member is responsible for it
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_hammer_store_retrieve() {
        init_logging();
        let peers = start_peers(1, 47005).await;
        {
            let mut client = client_for(&peers[0]).await;
            for port in 47200..47210 {
                let address = PeerAddress::new("localhost", port);
                assert_eq!(client.connect_peer(&address).await.unwrap(), "OK");
            }
            client.exit().await.unwrap();
        }
        assert_eq!(peers[0].chord().member_count(), 11);

        let port = peers[0].api_address().port();
        let writers: Vec<_> = (0..8)
            .map(|worker| {
                tokio::spawn(async move {
                    let mut client = RingClient::connect("127.0.0.1", port).await.unwrap();
                    for i in 0..32 {
                        let filename = format!("file-{}-{}.txt", worker, i);
                        assert_eq!(
                            client.store(&filename).await.unwrap(),
                            "File stored successfully."
                        );
                    }
                    client.exit().await.unwrap();
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        info!("All files stored, checking");
        peers[0].chord().print_chord();
        let mut client = client_for(&peers[0]).await;
        for worker in 0..8 {
            for i in 0..32 {
                let filename = format!("file-{}-{}.txt", worker, i);
                assert_eq!(
                    client.retrieve(&filename).await.unwrap(),
                    format!("File found: {}", filename)
                );
            }
        }

        let stored: usize = peers[0]
            .chord()
            .members()
            .iter()
            .map(|peer| {
                debug!("{} holds {} files", peer.address(), peer.file_count());
                peer.file_count()
            })
            .sum();
        assert_eq!(stored, 8 * 32);

        client.exit().await.unwrap();
        stop_peers(peers).await;
    }

    /// Independent peers keep independent rings
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_independent_peers() {
        init_logging();
        let peers = start_peers(2, 47006).await;
        let mut first = client_for(&peers[0]).await;
        let mut second = client_for(&peers[1]).await;

        first.store("only-here.txt").await.unwrap();
        assert_eq!(
            second.retrieve("only-here.txt").await.unwrap(),
            "File not found."
        );

        first.exit().await.unwrap();
        second.exit().await.unwrap();
        stop_peers(peers).await;
    }

    /// Binding an occupied port fails instead of panicking
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_bind_failure() {
        init_logging();
        let peers = start_peers(1, 47008).await;
        assert!(RingPeer::new(&loopback_config(47008)).await.is_err());
        stop_peers(peers).await;
    }

    /// Port 0 binds an ephemeral port, and the peer reports the bound one
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_ephemeral_port() {
        init_logging();
        let peers = vec![RingPeer::new(&loopback_config(0)).await.unwrap()];
        assert_ne!(peers[0].api_address().port(), 0);

        let mut client = client_for(&peers[0]).await;
        assert_eq!(
            client.store("a.txt").await.unwrap(),
            "File stored successfully."
        );

        client.exit().await.unwrap();
        stop_peers(peers).await;
    }

    /// After shutdown no new connections are accepted
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_shutdown() {
        init_logging();
        let peers = start_peers(1, 47009).await;
        let address = peers[0].api_address();
        stop_peers(peers).await;
        assert!(TcpStream::connect(address).await.is_err());
    }
}
