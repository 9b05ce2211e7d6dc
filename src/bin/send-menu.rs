/// Broadcast today's menus to Slack once and exit.
/// Meant for an external scheduler (e.g. cron: 0 9 * * 1-5 /app/send-menu)
/// when the API's built-in daily broadcast is disabled.
///
/// Usage: send-menu [--dry-run] [--strict]
///   --dry-run : print the summary instead of sending it
///   --strict  : exit with an error status when the broadcast fails

use clap::Parser;

use daily_menu_api::{
    config::Config,
    db,
    services::{daily_summary, date_window::local_now, menu::MenuService, menu_scheduler},
};

#[derive(Parser)]
#[command(name = "send-menu", about = "Send today's menu summary to Slack")]
struct Args {
    /// Print the message without contacting Slack
    #[arg(long)]
    dry_run: bool,

    /// Fail the process when the broadcast does not go through
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;

    if args.dry_run {
        let now = local_now();
        let menus = MenuService::list_for_day(&pool, now.date()).await?;
        println!("{}", daily_summary::compose(&menus, now, &config.site_domain));
        return Ok(());
    }

    tracing::info!("Sending today's menu to #{}", config.slack_channel);
    let outcome = menu_scheduler::broadcast(&pool, &config).await;
    menu_scheduler::log_outcome(&config.slack_channel, &outcome);

    match outcome {
        Err(e) if args.strict => Err(e.into()),
        _ => Ok(()),
    }
}
