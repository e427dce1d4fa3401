#![allow(dead_code)]

use std::time::Duration;

use duplex_rpc_peer::testing::MemoryChannel;
use duplex_rpc_peer::{open, serve, CallProxy, ConnectionState, EngineConfig, Router};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("duplex_rpc_peer=debug")
        .with_test_writer()
        .try_init();
}

/// A client engine wired to a server engine over an in-memory pipe.
pub fn pair(client_router: Router, server_router: Router) -> (CallProxy, CallProxy) {
    pair_with(client_router, server_router, EngineConfig::default())
}

pub fn pair_with(
    client_router: Router,
    server_router: Router,
    client_config: EngineConfig,
) -> (CallProxy, CallProxy) {
    let (near, far) = MemoryChannel::pair();
    let server = serve(server_router, EngineConfig::default()).accept(far);
    let client = open(near, client_config.with_router(client_router));
    (client, server)
}

pub async fn wait_for_state(proxy: &CallProxy, state: ConnectionState) {
    for _ in 0..500 {
        if proxy.state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("engine never reached {}, still {}", state, proxy.state());
}
