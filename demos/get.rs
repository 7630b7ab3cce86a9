#[tokio::main]
async fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .init();
    dotenvy::dotenv().ok();

    // Put your key in ZIPTAX_API_KEY (or a .env file)
    let api_key =
        std::env::var("ZIPTAX_API_KEY").unwrap_or_else(|_| "your_api_key_here".to_string());
    // Irvine Spectrum
    let address = "200 Spectrum Center Dr, Irvine, CA 92618";

    match ziptax::fetch_sales_tax(address, &api_key).await {
        Ok(info) => match info.summary() {
            Ok(summary) => println!("{}", summary),
            Err(e) => eprintln!("Error fetching sales tax: {}", e),
        },
        Err(e) => eprintln!("Error fetching sales tax: {}", e),
    }
}
