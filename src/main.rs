#[tokio::main]
async fn main() {
    if let Err(e) = turnero::run().await {
        eprintln!("turnero: {e}");
        std::process::exit(1);
    }
}
