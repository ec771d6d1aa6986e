use rfp_autofill::{cli, ui};
use std::process;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    if let Err(e) = cli::main().await {
        rfp_autofill::log_error!("{e:#}");
        ui::print_error(&format!("Error: {e:#}"));
        process::exit(1);
    }
}
