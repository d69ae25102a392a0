#[tokio::main]
async fn main() {
    if let Err(err) = tutor_cli::run().await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
