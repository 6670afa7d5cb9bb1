#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use clap::Parser;
use tenantdex_http::serve;

#[derive(Parser)]
#[command(name = "tenantdex", version, about = "Multi-tenant full-text search server")]
struct Cli {
    /// Directory holding one index per tenant
    #[arg(long, env = "TENANTDEX_DATA_DIR", default_value = "./indexes")]
    data_dir: String,
    #[arg(long, env = "TENANTDEX_BIND_ADDR", default_value = "127.0.0.1:8080")]
    bind_addr: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env values must be visible to clap's `env` fallbacks.
    tenantdex_http::load_dotenv();
    let cli = Cli::parse();

    std::env::set_var("TENANTDEX_DATA_DIR", &cli.data_dir);
    std::env::set_var("TENANTDEX_BIND_ADDR", &cli.bind_addr);
    serve().await
}
