use lockwebsock::{ClientConfig, Endpoint};
use log::*;
use rand::distr::Alphanumeric;
use rand::{rng, Rng};

fn handle_connection(url: &str) {
    // A buffer smaller than the message forces `send` to fragment across
    // CONTINUATION frames (spec §4.5).
    let config = ClientConfig {
        buffer_size: 64,
        ..ClientConfig::default()
    };
    let mut endpoint = Endpoint::new(config);

    match endpoint.connect(url, "/") {
        Ok(()) => {
            let random_string = generate_random_string();
            info!("Sending random string: {random_string}");
            if endpoint.send(&random_string).is_err() {
                error!("Error occurred when sending data in chunks");
            }

            endpoint.close(1000).unwrap();
        }
        Err(err) => error!("Error when performing handshake: {err}"),
    }
}

fn main() {
    env_logger::init();
    handle_connection("ws://127.0.0.1:9002");
}

fn generate_random_string() -> String {
    rng().sample_iter(&Alphanumeric).take(300).map(char::from).collect()
}
