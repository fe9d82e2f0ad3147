use std::process;

use kierki::{config::ServerConfig, server::Server};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    let config: ServerConfig = match ServerConfig::from_args(&args) {
        Ok(config) => config,
        Err(err) => fail(err),
    };
    let server: Server = match Server::bind(config) {
        Ok(server) => server,
        Err(err) => fail(err),
    };
    if let Err(err) = server.run().await {
        fail(err);
    }
}

fn fail(err: kierki::errors::Error) -> ! {
    eprintln!("ERROR: {err}");
    process::exit(1);
}
