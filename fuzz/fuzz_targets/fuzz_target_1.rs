#![no_main]

use libfuzzer_sys::fuzz_target;
use socket_load::config::ClientConfig;
use socket_load::handshake::connect_async_with_config;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use url::Url;

// Feeds arbitrary bytes to the client as the server's handshake response
fuzz_target!(|data: &[u8]| {
    let runtime = Runtime::new().unwrap();

    let response = Vec::from(data);
    runtime.block_on(async move {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(&response).await;
            }
        });

        let url = Url::parse(&format!("ws://{}/ws", addr)).unwrap();
        let config = ClientConfig {
            handshake_timeout: Duration::from_secs(1),
            ..ClientConfig::default()
        };

        if let Err(err) = connect_async_with_config(&url, &config).await {
            println!("{:?}", err);
        }
    });
});
