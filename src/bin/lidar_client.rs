//! Sensor-side ingest client entry point.
//!
//! Usage: `lidar-client <server_ip> <server_port> <sensor_driver_cmd...>`
//! The remaining arguments are the sensor driver's argv, run as a
//! subprocess and re-spawned whenever the connection is retried.

use lidar_hub::ingest_client::run_ingest_client;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: {} <server_ip> <server_port> <sensor_driver_cmd...>", args.first().map(String::as_str).unwrap_or("lidar-client"));
        std::process::exit(2);
    }

    let server_addr = format!("{}:{}", args[1], args[2]);
    let sensor_cmd = args[3..].to_vec();

    log::info!("connecting to {server_addr}, driving sensor command {sensor_cmd:?}");
    run_ingest_client(&server_addr, &sensor_cmd);
}
