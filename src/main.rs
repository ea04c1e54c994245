#[tokio::main]
async fn main() {
    if let Err(e) = pharmstock_lib::run().await {
        eprintln!("pharmstock: {e}");
        std::process::exit(1);
    }
}
