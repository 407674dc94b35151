mod application;
mod components;
mod message;
mod pages;

use lucy::config;

use application::{Flags, LaunchMode, Lucy};
use config::LucyConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = LucyConfig::default_path();
    let config = LucyConfig::load(&config_path);

    // Set up logging to the systemd user journal (`journalctl --user -t lucy -f`).
    // Wrapper filters: lucy crate at info/debug (per config), everything else at warn.
    {
        struct FilteredJournal {
            inner: systemd_journal_logger::JournalLog,
        }

        impl log::Log for FilteredJournal {
            fn enabled(&self, metadata: &log::Metadata) -> bool {
                let target = metadata.target();
                if target.starts_with("lucy") || target.starts_with("application") || target.starts_with("pages") || target.starts_with("components") {
                    let max = if lucy::debug_logging() { log::LevelFilter::Debug } else { log::LevelFilter::Info };
                    metadata.level() <= max
                } else {
                    metadata.level() <= log::LevelFilter::Warn
                }
            }
            fn log(&self, record: &log::Record) {
                if self.enabled(record.metadata()) {
                    self.inner.log(record);
                }
            }
            fn flush(&self) {
                self.inner.flush();
            }
        }

        lucy::set_debug_logging(config.debug_logging);

        match systemd_journal_logger::JournalLog::new() {
            Ok(journal) => {
                let journal = journal.with_syslog_identifier("lucy".to_string());
                log::set_boxed_logger(Box::new(FilteredJournal { inner: journal }))?;
                // Global max must be Debug so lucy debug logs can pass through when toggled
                log::set_max_level(log::LevelFilter::Debug);
            }
            Err(e) => eprintln!("Journal unavailable, running without logs: {}", e),
        }
    }

    // Parse CLI flags
    let launch_mode = {
        let args: Vec<String> = std::env::args().collect();
        LaunchMode {
            voice: !args.iter().any(|a| a == "--no-voice"),
            summary: !args.iter().any(|a| a == "--no-summary"),
        }
    };

    log::info!("Starting Lucy (config: {})", config_path.display());

    let flags = Flags { config, config_path, launch_mode };
    Lucy::init(flags).await.run().await;

    Ok(())
}
