use std::sync::Arc;

use casekeeper::config::BotConfig;
use casekeeper::handlers::Handler;
use casekeeper::moderation::{
    GuildStateStore, ModerationService, SerenityGateway, TimeoutGateway, YamlBackend,
};
use casekeeper::{BOT_NAME, Data, Error, commands, logging};
use poise::serenity_prelude::{ClientBuilder, GatewayIntents, Http};
use tracing::{error, info};

/// Messages kept per channel so deletes and edits can be logged
const MESSAGE_CACHE_SIZE: usize = 500;

/// Main function to run the bot
async fn async_main() -> Result<(), Error> {
    // A missing .env file is fine, the environment may already be set
    dotenvy::dotenv().ok();
    logging::init()?;

    let config = BotConfig::from_env()?;

    let http = Arc::new(Http::new(&config.discord_token));
    let bot_user = http.get_current_user().await?;
    let serenity_gateway = Arc::new(SerenityGateway::new(Arc::clone(&http), bot_user.tag()));
    let gateway = Arc::new(TimeoutGateway::new(serenity_gateway, config.gateway_timeout));

    let backend = Arc::new(YamlBackend::new(config.guilds_dir()));
    let store = GuildStateStore::open(backend).await?;
    info!(
        guilds = store.guild_count(),
        data_dir = %config.data_dir.display(),
        "Loaded moderation state"
    );

    let service = ModerationService::new(store, gateway, config.service_settings());
    let scheduler = service
        .scheduler(config.scheduler_interval, config.gateway_timeout)
        .start();

    let data = Data::new(service.clone(), config.clone());

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.command_prefix.clone()),
                ..Default::default()
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_start(ctx).await;
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_end(ctx).await;
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    commands::on_error(error).await;
                })
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                logging::log_console(format!("{BOT_NAME}: registering commands"));
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        })
        .build();

    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::MESSAGE_CONTENT;

    let mut cache_settings = serenity::cache::Settings::default();
    cache_settings.max_messages = MESSAGE_CACHE_SIZE;

    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .cache_settings(cache_settings)
        .event_handler(Handler::new(service))
        .framework(framework)
        .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {e}");
            return;
        }
        info!("Shutdown requested");
        shard_manager.shutdown_all().await;
    });

    info!("Starting bot...");
    let result = client.start().await;

    // Let an in-flight reversal cycle finish before exiting
    scheduler.shutdown().await;
    result?;

    info!("Bot stopped");
    Ok(())
}

fn main() {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Failed to start runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(async_main()) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
