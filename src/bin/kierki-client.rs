use std::process;

use kierki::{client, config::ClientConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    let config: ClientConfig = match ClientConfig::from_args(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("ERROR: {err}");
            process::exit(1);
        }
    };
    match client::run(config).await {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("ERROR: {err}");
            process::exit(1);
        }
    }
}
