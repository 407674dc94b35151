use std::io::BufRead;

use lucy::ai::{anthropic, keyring};
use lucy::config::LucyConfig;

#[tokio::main]
async fn main() {
    match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => {
            if let Err(e) = journal.with_syslog_identifier("lucy-key".to_string()).install() {
                eprintln!("Failed to install journal logger: {}", e);
            }
            log::set_max_level(log::LevelFilter::Info);
        }
        Err(e) => eprintln!("Journal unavailable: {}", e),
    }

    let config = LucyConfig::load(&LucyConfig::default_path());

    println!("=== Lucy API key setup ===\n");
    println!("Paste your Anthropic API key and press Enter:");

    let mut key = String::new();
    if let Err(e) = std::io::stdin().lock().read_line(&mut key) {
        println!("  Failed to read key: {}", e);
        std::process::exit(1);
    }
    let key = key.trim();
    if key.is_empty() {
        println!("  No key given, nothing stored.");
        std::process::exit(1);
    }

    println!("\n--- Testing against {} ---", config.model);
    match anthropic::test_api_key(key, &config.model).await {
        Ok(msg) => println!("  {}", msg),
        Err(e) => {
            println!("  {}", e);
            std::process::exit(1);
        }
    }

    match keyring::store_api_key(key).await {
        Ok(()) => {
            log::info!("API key stored in keyring");
            println!("  Stored in the system keyring.");
        }
        Err(e) => {
            println!("  {}", e);
            std::process::exit(1);
        }
    }
}
