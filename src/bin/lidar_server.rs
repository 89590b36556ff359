//! Ingest/fan-out server entry point.
//!
//! Usage: `lidar-server [lidar_port] [data_port] [status_port]`
//! Defaults: lidar port 8000, data port 8001, status port 8002. No other
//! flags or environment variables are part of the contract.

use lidar_hub::ingest_server::{run_ingest_server, ServerAddrs};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let lidar_port = args.get(1).map(|s| s.as_str()).unwrap_or("8000");
    let data_port = args.get(2).map(|s| s.as_str()).unwrap_or("8001");
    let status_port = args.get(3).map(|s| s.as_str()).unwrap_or("8002");

    let addrs = ServerAddrs {
        lidar_addr: format!("0.0.0.0:{lidar_port}"),
        data_addr: format!("0.0.0.0:{data_port}"),
        status_addr: format!("0.0.0.0:{status_port}"),
    };

    log::info!(
        "listening: sensor on {}, data on {}, status on {}",
        addrs.lidar_addr, addrs.data_addr, addrs.status_addr
    );

    if let Err(e) = run_ingest_server(addrs) {
        log::error!("server exited: {e}");
        std::process::exit(1);
    }
}
