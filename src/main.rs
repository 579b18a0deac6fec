#[tokio::main]
async fn main() {
    if let Err(err) = slidevoice_lib::run().await {
        eprintln!("slidevoice failed: {err}");
        std::process::exit(1);
    }
}
