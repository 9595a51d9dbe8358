use lockwebsock::{ClientConfig, Endpoint};
use log::*;
use rand::distr::Alphanumeric;
use rand::{rng, Rng};
use std::thread;
use std::time::Duration;

fn handle_connection(url: &str) {
    let mut endpoint = Endpoint::new(ClientConfig::default());
    if let Err(err) = endpoint.connect(url, "/") {
        error!("Error when performing handshake: {err}");
        return;
    }

    endpoint.set_receive_function(|ptr, len, _capacity| {
        let payload = unsafe { std::slice::from_raw_parts(ptr, len) };
        info!("Received message: {}", String::from_utf8_lossy(payload));
    });

    let mut counter = 0;
    let mut next_send = std::time::Instant::now();

    loop {
        if !endpoint.is_open() {
            break;
        }
        if let Err(err) = endpoint.receive() {
            error!("Received error from the stream: {err}");
            break;
        }

        if std::time::Instant::now() >= next_send {
            let random_string = generate_random_string();
            if endpoint.send(&random_string).is_err() {
                eprintln!("Failed to send message");
                break;
            }
            counter += 1;
            next_send = std::time::Instant::now() + Duration::from_secs(5);
        }

        if counter >= 3 {
            if endpoint.close(1000).is_err() {
                error!("Error occurred when closing connection");
            }
            break;
        }

        thread::sleep(Duration::from_millis(50));
    }
}

fn main() {
    env_logger::init();
    handle_connection("wss://localhost:9002");
}

fn generate_random_string() -> String {
    rng().sample_iter(&Alphanumeric).take(30).map(char::from).collect()
}
